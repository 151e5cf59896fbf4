//! Request body extraction.

use axum::{
    async_trait,
    body::Bytes,
    extract::{FromRequest, FromRequestParts, Path, Request},
    http::request::Parts,
};
use serde::de::DeserializeOwned;

use crate::error::ApiError;
use crate::todos;

/// The `:id` path segment parsed as a todo id.
///
/// Undecodable segments and non-integer ids both reject with a JSON 400.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TodoId(pub i64);

#[async_trait]
impl<S> FromRequestParts<S> for TodoId
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Path(raw) = Path::<String>::from_request_parts(parts, state)
            .await
            .map_err(|rejection| ApiError::Validation(rejection.body_text()))?;

        Ok(TodoId(todos::parse_id(&raw)?))
    }
}

/// JSON body that treats an empty payload as `T::default()`.
///
/// The content type is not checked. Oversized bodies are rejected with the
/// status of the body-limit rejection (413); malformed JSON with 400.
#[derive(Debug, Clone, Default)]
pub struct JsonBody<T>(pub T);

#[async_trait]
impl<T, S> FromRequest<S> for JsonBody<T>
where
    T: DeserializeOwned + Default,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let bytes = Bytes::from_request(req, state)
            .await
            .map_err(|rejection| ApiError::InvalidBody {
                status: rejection.status(),
                message: rejection.body_text(),
            })?;

        decode(&bytes).map(JsonBody)
    }
}

fn decode<T>(bytes: &[u8]) -> Result<T, ApiError>
where
    T: DeserializeOwned + Default,
{
    if bytes.iter().all(u8::is_ascii_whitespace) {
        return Ok(T::default());
    }

    serde_json::from_slice(bytes).map_err(|err| ApiError::InvalidBody {
        status: axum::http::StatusCode::BAD_REQUEST,
        message: format!("Invalid JSON body: {err}"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::todos::{CreateTodoRequest, UpdateTodoRequest};
    use axum::body::{to_bytes, Body};
    use axum::http::{Request, StatusCode};
    use axum::routing::get;
    use axum::Router;
    use tower::ServiceExt;

    async fn echo_id(TodoId(id): TodoId) -> String {
        id.to_string()
    }

    async fn get_id(uri: &str) -> (StatusCode, String) {
        let app = Router::new().route("/todos/:id", get(echo_id));
        let response = app
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, String::from_utf8(bytes.to_vec()).unwrap())
    }

    #[tokio::test]
    async fn todo_id_parses_integers() {
        assert_eq!(get_id("/todos/42").await, (StatusCode::OK, "42".to_string()));
    }

    #[tokio::test]
    async fn undecodable_id_is_json_400() {
        let (status, body) = get_id("/todos/%FF").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let json: serde_json::Value = serde_json::from_str(&body).unwrap();
        assert!(json["error"].is_string());
    }

    #[tokio::test]
    async fn non_integer_id_is_json_400() {
        let (status, body) = get_id("/todos/abc").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body, r#"{"error":"Invalid todo id: abc"}"#);
    }

    #[test]
    fn empty_body_is_default() {
        let parsed: CreateTodoRequest = decode(b"").unwrap();
        assert_eq!(parsed, CreateTodoRequest::default());

        let parsed: CreateTodoRequest = decode(b" \n").unwrap();
        assert_eq!(parsed, CreateTodoRequest::default());
    }

    #[test]
    fn unknown_fields_are_ignored() {
        let parsed: UpdateTodoRequest = decode(br#"{"completed":true,"priority":3}"#).unwrap();
        assert_eq!(parsed.completed, Some(true));
        assert_eq!(parsed.title, None);
    }

    #[test]
    fn malformed_json_is_400() {
        let err = decode::<CreateTodoRequest>(b"{title:").unwrap_err();
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn wrong_field_type_is_400() {
        let err = decode::<UpdateTodoRequest>(br#"{"completed":"yes"}"#).unwrap_err();
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
    }
}

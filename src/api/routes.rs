//! HTTP API route definitions.

use axum::{
    extract::DefaultBodyLimit,
    http::Method,
    middleware::from_fn_with_state,
    routing::{get, MethodRouter},
    Router,
};
use tower_http::{
    catch_panic::CatchPanicLayer,
    cors::{Any, CorsLayer},
    trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer},
    LatencyUnit,
};
use tracing::Level;

use super::handlers::{
    create_todo, delete_todo, get_todo, health, list_todos, metrics, not_found, update_todo, AppState,
};
use super::middleware::{panic_response, track_metrics};

/// Create the API router with the full middleware pipeline.
pub fn create_router(state: AppState) -> Router {
    with_pipeline(routes(), &state).with_state(state)
}

/// Declared routes. A method mismatch on a declared path falls through to 404.
fn routes() -> Router<AppState> {
    Router::new()
        // Health and metrics
        .route("/health", unmatched_method(get(health)))
        .route("/metrics", unmatched_method(get(metrics)))
        // Todos
        .route("/api/todos", unmatched_method(get(list_todos).post(create_todo)))
        .route(
            "/api/todos/:id",
            unmatched_method(get(get_todo).put(update_todo).delete(delete_todo)),
        )
        .fallback(not_found)
}

fn unmatched_method(router: MethodRouter<AppState>) -> MethodRouter<AppState> {
    router.fallback(not_found)
}

/// Wrap routes in the cross-cutting layers.
///
/// Outermost first: CORS, access log, body limit, instrumentation, panic
/// boundary, then the dispatcher.
pub(crate) fn with_pipeline(routes: Router<AppState>, state: &AppState) -> Router<AppState> {
    routes
        .layer(CatchPanicLayer::custom(panic_response))
        .layer(from_fn_with_state(state.metrics.clone(), track_metrics))
        .layer(DefaultBodyLimit::max(state.body_limit_bytes))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(
                    DefaultOnResponse::new()
                        .level(Level::INFO)
                        .latency_unit(LatencyUnit::Millis),
                ),
        )
        .layer(cors_layer())
}

fn cors_layer() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([
            Method::GET,
            Method::HEAD,
            Method::PUT,
            Method::PATCH,
            Method::POST,
            Method::DELETE,
        ])
        .allow_headers(Any)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::MetricsRegistry;
    use axum::body::{to_bytes, Body};
    use axum::http::{header, Request, StatusCode};
    use std::sync::Arc;
    use tower::ServiceExt;

    fn state() -> AppState {
        AppState::new("test", Arc::new(MetricsRegistry::for_http().unwrap()))
    }

    async fn explode() -> &'static str {
        panic!("secret detail")
    }

    async fn body_string(response: axum::response::Response) -> String {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[tokio::test]
    async fn health_endpoint_returns_ok() {
        let app = create_router(state());

        let response = app
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn matched_routes_are_labelled_by_pattern() {
        let state = state();
        let app = create_router(state.clone());

        let response = app
            .oneshot(Request::builder().uri("/api/todos/42").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let text = state.metrics.export();
        assert!(text.contains(
            r#"http_requests_total{method="GET",route="/api/todos/:id",status_code="200"} 1"#
        ));
        assert!(text.contains(
            r#"http_request_duration_seconds_count{method="GET",route="/api/todos/:id",status_code="200"} 1"#
        ));
    }

    #[tokio::test]
    async fn unmatched_paths_are_labelled_by_raw_path() {
        let state = state();
        let app = create_router(state.clone());

        let response = app
            .oneshot(Request::builder().uri("/bogus/7").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let text = state.metrics.export();
        assert!(text.contains(
            r#"http_requests_total{method="GET",route="/bogus/7",status_code="404"} 1"#
        ));
    }

    #[tokio::test]
    async fn method_mismatch_is_404_with_raw_path() {
        let state = state();
        let app = create_router(state.clone());

        let response = app
            .oneshot(
                Request::builder()
                    .method("PATCH")
                    .uri("/api/todos/5")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(body_string(response).await, r#"{"error":"Not Found"}"#);

        let text = state.metrics.export();
        assert!(text.contains(
            r#"http_requests_total{method="PATCH",route="/api/todos/5",status_code="404"} 1"#
        ));
    }

    #[tokio::test]
    async fn handler_panic_becomes_generic_500_and_is_counted() {
        let state = state();
        let routes = Router::new().route("/explode", get(explode));
        let app = with_pipeline(routes, &state).with_state(state.clone());

        let response = app
            .oneshot(Request::builder().uri("/explode").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let body = body_string(response).await;
        assert_eq!(body, r#"{"error":"Internal Server Error"}"#);
        assert!(!body.contains("secret"));

        let text = state.metrics.export();
        assert!(text.contains(
            r#"http_requests_total{method="GET",route="/explode",status_code="500"} 1"#
        ));
    }

    #[tokio::test]
    async fn oversized_body_is_rejected() {
        let state = state().with_body_limit(16);
        let app = create_router(state);

        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/api/todos")
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(format!(r#"{{"title":"{}"}}"#, "x".repeat(64))))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
    }

    #[tokio::test]
    async fn cors_headers_are_added() {
        let app = create_router(state());

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/api/todos")
                    .header(header::ORIGIN, "https://example.com")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(
            response.headers().get(header::ACCESS_CONTROL_ALLOW_ORIGIN).unwrap(),
            "*"
        );
    }

    #[tokio::test]
    async fn preflight_is_not_counted() {
        let state = state();
        let app = create_router(state.clone());

        let response = app
            .oneshot(
                Request::builder()
                    .method("OPTIONS")
                    .uri("/api/todos")
                    .header(header::ORIGIN, "https://example.com")
                    .header(header::ACCESS_CONTROL_REQUEST_METHOD, "POST")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert!(response.status().is_success());
        assert!(!state.metrics.export().contains("http_requests_total{"));
    }
}

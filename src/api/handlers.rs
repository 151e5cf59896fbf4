//! HTTP API handlers.

use std::fmt;
use std::sync::Arc;

use axum::{
    extract::State,
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use chrono::{SecondsFormat, Utc};
use serde::Serialize;

use super::extract::{JsonBody, TodoId};
use super::middleware::UnmatchedRoute;
use crate::error::ApiError;
use crate::metrics::{MetricsRegistry, EXPOSITION_CONTENT_TYPE};
use crate::todos::{self, CreateTodoRequest, DeleteTodoResponse, IdGenerator, RandomIds, Todo, UpdateTodoRequest};

/// Application state shared with handlers.
#[derive(Clone)]
pub struct AppState {
    /// Environment name reported by `/health`.
    pub environment: Arc<str>,
    /// Request metrics.
    pub metrics: Arc<MetricsRegistry>,
    /// Id source for created todos.
    pub ids: Arc<dyn IdGenerator>,
    /// Maximum request body size in bytes.
    pub body_limit_bytes: usize,
}

impl AppState {
    /// Default request body limit (100 KiB).
    pub const DEFAULT_BODY_LIMIT: usize = 100 * 1024;

    /// Create new app state with random todo ids.
    pub fn new(environment: impl Into<Arc<str>>, metrics: Arc<MetricsRegistry>) -> Self {
        Self {
            environment: environment.into(),
            metrics,
            ids: Arc::new(RandomIds),
            body_limit_bytes: Self::DEFAULT_BODY_LIMIT,
        }
    }

    /// Replace the id source.
    pub fn with_id_generator(mut self, ids: impl IdGenerator) -> Self {
        self.ids = Arc::new(ids);
        self
    }

    /// Replace the request body limit.
    pub fn with_body_limit(mut self, bytes: usize) -> Self {
        self.body_limit_bytes = bytes;
        self
    }
}

impl fmt::Debug for AppState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AppState")
            .field("environment", &self.environment)
            .field("metrics", &self.metrics)
            .field("body_limit_bytes", &self.body_limit_bytes)
            .finish_non_exhaustive()
    }
}

/// Health check response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// Always "healthy".
    pub status: &'static str,
    /// Configured environment name.
    pub environment: String,
    /// Current time, RFC 3339 with milliseconds.
    pub timestamp: String,
}

/// Health check handler - always returns 200.
pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        environment: state.environment.to_string(),
        timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
    })
}

/// Prometheus scrape handler.
pub async fn metrics(State(state): State<AppState>) -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, EXPOSITION_CONTENT_TYPE)],
        state.metrics.export(),
    )
}

/// Fallback for anything the router did not match.
pub async fn not_found() -> Response {
    let mut response = ApiError::NotFound.into_response();
    response.extensions_mut().insert(UnmatchedRoute);
    response
}

/// `GET /api/todos`
pub async fn list_todos() -> Json<Vec<Todo>> {
    Json(todos::list())
}

/// `POST /api/todos`
pub async fn create_todo(
    State(state): State<AppState>,
    JsonBody(request): JsonBody<CreateTodoRequest>,
) -> Result<(StatusCode, Json<Todo>), ApiError> {
    let todo = todos::create(request, state.ids.as_ref())?;
    Ok((StatusCode::CREATED, Json(todo)))
}

/// `GET /api/todos/:id`
pub async fn get_todo(TodoId(id): TodoId) -> Json<Todo> {
    Json(todos::get(id))
}

/// `PUT /api/todos/:id`
pub async fn update_todo(
    TodoId(id): TodoId,
    JsonBody(request): JsonBody<UpdateTodoRequest>,
) -> Json<Todo> {
    Json(todos::update(id, request))
}

/// `DELETE /api/todos/:id`
pub async fn delete_todo(TodoId(id): TodoId) -> Json<DeleteTodoResponse> {
    Json(todos::delete(id))
}

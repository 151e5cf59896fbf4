//! Request instrumentation and failure boundary.

use std::any::Any;
use std::sync::Arc;

use axum::{
    extract::{MatchedPath, Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};
use tracing::warn;

use crate::error::ApiError;
use crate::metrics::{MetricsRegistry, RequestTimer};

/// Response extension set by the 404 fallback.
///
/// Requests carrying it are labelled with their raw path even when the path
/// matched a declared route under another method.
#[derive(Debug, Clone, Copy)]
pub struct UnmatchedRoute;

/// Times every request and records it on the request instruments.
///
/// Labelled with the declared route pattern when one matched, otherwise with
/// the raw request path.
pub async fn track_metrics(
    State(metrics): State<Arc<MetricsRegistry>>,
    req: Request,
    next: Next,
) -> Response {
    let timer = RequestTimer::start();
    let method = req.method().clone();
    let path = req.uri().path().to_owned();
    let matched = req
        .extensions()
        .get::<MatchedPath>()
        .map(|p| p.as_str().to_owned());

    let response = next.run(req).await;

    let route = match matched {
        Some(pattern) if response.extensions().get::<UnmatchedRoute>().is_none() => pattern,
        _ => path,
    };

    if let Err(err) = metrics.record_http_request(
        method.as_str(),
        &route,
        response.status().as_u16(),
        timer.elapsed(),
    ) {
        warn!(error = %err, %route, "failed to record request metrics");
    }

    response
}

/// Turns a handler panic into the generic 500 response.
pub fn panic_response(panic: Box<dyn Any + Send + 'static>) -> Response {
    let detail = if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else if let Some(s) = panic.downcast_ref::<&str>() {
        s.to_string()
    } else {
        "unknown panic payload".to_string()
    };

    ApiError::Internal(detail).into_response()
}

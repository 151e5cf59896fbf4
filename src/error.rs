//! Unified error types for the todo API.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;
use tracing::error;

use crate::metrics::InstrumentKind;

/// Startup and process-level errors.
#[derive(Error, Debug)]
pub enum ServiceError {
    /// Configuration loading error.
    #[error("configuration error: {0}")]
    Config(#[from] envy::Error),

    /// Configuration loaded but failed validation.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// Metrics registry setup error.
    #[error("metrics error: {0}")]
    Metrics(#[from] MetricsError),

    /// IO error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Metrics registry errors.
#[derive(Error, Debug)]
pub enum MetricsError {
    /// An instrument with this name was already registered.
    #[error("metric {0} is already registered")]
    DuplicateMetricName(String),

    /// No instrument with this name was registered.
    #[error("metric {0} is not registered")]
    UnknownMetric(String),

    /// The instrument exists but is of another kind.
    #[error("metric {name} is a {actual}, not a {expected}")]
    KindMismatch {
        /// Metric name.
        name: String,
        /// Kind the caller asked for.
        expected: InstrumentKind,
        /// Kind the metric was registered with.
        actual: InstrumentKind,
    },

    /// Supplied labels do not match the declared label names.
    #[error("metric {name} expects labels {expected:?}, got {actual:?}")]
    LabelMismatch {
        /// Metric name.
        name: String,
        /// Declared label names.
        expected: Vec<String>,
        /// Label names supplied by the caller.
        actual: Vec<String>,
    },

    /// The Prometheus exporter rejected the configuration.
    #[error("exporter error: {0}")]
    Exporter(#[from] metrics_exporter_prometheus::BuildError),
}

/// Todo domain errors.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TodoError {
    /// `title` was missing or empty on create.
    #[error("Title is required")]
    TitleRequired,

    /// Path id did not parse as an integer.
    #[error("Invalid todo id: {0}")]
    InvalidId(String),
}

/// Errors surfaced to HTTP callers.
///
/// Every variant renders as `{ "error": "<message>" }`. `Internal` keeps its
/// detail server-side and only ever sends the generic message.
#[derive(Error, Debug)]
pub enum ApiError {
    /// Request failed a field check.
    #[error("{0}")]
    Validation(String),

    /// Request body could not be read or decoded.
    #[error("{message}")]
    InvalidBody {
        /// Status to respond with (400 or 413).
        status: StatusCode,
        /// Client-facing reason.
        message: String,
    },

    /// No route matched.
    #[error("Not Found")]
    NotFound,

    /// Unhandled failure; detail is logged, never returned.
    #[error("Internal Server Error")]
    Internal(String),
}

impl ApiError {
    /// HTTP status for this error.
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::InvalidBody { status, .. } => *status,
            Self::NotFound => StatusCode::NOT_FOUND,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<TodoError> for ApiError {
    fn from(err: TodoError) -> Self {
        Self::Validation(err.to_string())
    }
}

/// JSON error body.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    /// Client-facing message.
    pub error: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if let Self::Internal(detail) = &self {
            error!(%detail, "unhandled request failure");
        }

        let body = ErrorBody {
            error: self.to_string(),
        };
        (self.status(), Json(body)).into_response()
    }
}

/// Convenient Result type alias.
pub type Result<T> = std::result::Result<T, ServiceError>;

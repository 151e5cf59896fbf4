//! Mock todo HTTP API instrumented with Prometheus request metrics.
//!
//! Every request passes through the same pipeline:
//!
//! ```text
//! CORS -> access log -> body limit -> metrics timer -> panic boundary -> router
//!                                                                        |
//!            /health  /metrics  /api/todos[/:id]  (anything else -> 404) <
//! ```
//!
//! The metrics timer records one histogram observation and one counter
//! increment per completed request, labelled `(method, route, status_code)`.
//!
//! # Modules
//!
//! - [`config`]: Configuration loading from environment
//! - [`error`]: Unified error types
//! - [`metrics`]: Metrics registry and Prometheus exposition
//! - [`todos`]: Todo model and stateless operations
//! - [`api`]: Router, handlers, and middleware
//! - [`utils`]: Utility functions

pub mod api;
pub mod config;
pub mod error;
pub mod metrics;
pub mod todos;
pub mod utils;

pub use config::Config;
pub use error::{ServiceError, Result};

//! HTTP API: routing, handlers, and the request pipeline.

pub mod extract;
pub mod handlers;
pub mod middleware;
pub mod routes;

pub use handlers::AppState;
pub use routes::create_router;

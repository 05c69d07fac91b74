//! HTTP API
//!
//! Router, handlers and authentication middleware.

pub mod middleware;
pub mod routes;

pub use routes::{create_router, AppState};

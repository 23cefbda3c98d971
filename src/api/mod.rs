//! # HTTP control API.
//!
//! A thin JSON boundary over the [`Registry`]: each route maps to exactly one
//! registry operation and translates its outcome into a status code.
//!
//! ```text
//! GET  /api/servers              → registry.status()      200 {running, configured}
//! GET  /api/servers/{name}       → registry.info(name)    200 ServerInfo | 404
//! POST /api/servers/{name}/start → registry.start(name)   200 {message} | 404 | 500
//! POST /api/servers/{name}/stop  → registry.stop(name)    200 {message} | 500
//! POST /api/servers/start-all    → registry.start_all()   200 {message} | 500
//! POST /api/servers/stop-all     → registry.stop_all()    200 {message} | 500
//! ```
//!
//! The literal `start-all` / `stop-all` segments take precedence over `{name}`.
//! Cross-origin requests are allowed, so browser dashboards on any origin can
//! drive the API.

mod error;
mod handlers;

use std::sync::Arc;

use axum::Router;
use axum::routing::{get, post};
use tower_http::cors::CorsLayer;

use crate::core::Registry;

pub use error::ApiError;

/// Builds the control API router over `registry`.
pub fn router(registry: Arc<Registry>) -> Router {
    Router::new()
        .route("/api/servers", get(handlers::status))
        .route("/api/servers/start-all", post(handlers::start_all))
        .route("/api/servers/stop-all", post(handlers::stop_all))
        .route("/api/servers/{name}", get(handlers::info))
        .route("/api/servers/{name}/start", post(handlers::start))
        .route("/api/servers/{name}/stop", post(handlers::stop))
        .layer(CorsLayer::permissive())
        .with_state(registry)
}

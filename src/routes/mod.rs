//! HTTP routes for the DITA PDF server

pub mod binaries;
pub mod health;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use tower_http::trace::TraceLayer;

use crate::state::AppState;

/// Build the application router
pub fn router(state: AppState) -> Router {
    let body_limit = state.config().server.max_upload_bytes;

    Router::new()
        .route("/health", get(health::health_check))
        .route("/binaries", post(binaries::create_binary))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

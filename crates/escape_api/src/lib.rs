//! Escape Room Status API
//!
//! Read-only HTTP view of the latest state committed by the dispatcher.
//! Sessions are controlled over MQTT only.

mod session;
mod station;

use std::sync::Arc;

use axum::{Router, routing::get};
use escape_core::ServerState;
use tokio::sync::watch;
use tower_http::trace::TraceLayer;

/// Latest committed server state, as published by the dispatcher.
pub type Snapshots = watch::Receiver<Arc<ServerState>>;

/// Health check endpoint
pub async fn health_check() -> &'static str {
    "OK"
}

/// Create the application router with all endpoints
pub fn create_app(snapshots: Snapshots) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/session", get(session::get_session))
        .route("/station/config", get(station::get_station_config))
        .route("/station/status", get(station::get_station_status))
        .layer(TraceLayer::new_for_http())
        .with_state(snapshots)
}

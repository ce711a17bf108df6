use axum::extract::State;
use axum::{routing::get, Json, Router};
use serde::Serialize;

use crate::state::AppState;

/// Health check response payload.
#[derive(Serialize)]
pub struct HealthResponse {
    /// `ok`, or `degraded` once the control loop has stopped.
    pub status: &'static str,
    /// Crate version from Cargo.toml.
    pub version: &'static str,
    /// Configured worker count.
    pub workers: usize,
    /// Open WebSocket connections.
    pub connections: usize,
}

/// GET /health -- returns service and worker pool health.
async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let pool_running = !state.pool.is_closed();

    Json(HealthResponse {
        status: if pool_running { "ok" } else { "degraded" },
        version: env!("CARGO_PKG_VERSION"),
        workers: state.config.devices.len(),
        connections: state.ws_manager.connection_count().await,
    })
}

pub fn router() -> Router<AppState> {
    Router::new().route("/health", get(health_check))
}

//! Health check handlers.

use std::sync::Arc;

use axum::extract::State;
use axum::Json;
use serde::Serialize;

use crate::state::AppState;

/// Health check response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// Service status: "ok" or "degraded".
    pub status: String,
    /// Service name.
    pub service: String,
    /// Service version.
    pub version: String,
    /// Availability gate verdict: whether durable storage answers.
    pub storage_healthy: bool,
}

/// Health check endpoint.
///
/// Reports liveness plus the availability gate's verdict on the balance
/// store. A degraded verdict means paid operations are being rejected
/// (fail-closed); the process itself is still up.
pub async fn health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    let storage_healthy = match state.store.check_health() {
        Ok(()) => true,
        Err(e) => {
            tracing::warn!(error = %e, "Storage health check failed");
            false
        }
    };

    Json(HealthResponse {
        status: if storage_healthy { "ok" } else { "degraded" }.to_string(),
        service: "creditgate".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        storage_healthy,
    })
}

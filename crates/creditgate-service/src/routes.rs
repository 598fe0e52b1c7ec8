//! Router configuration.
//!
//! This module sets up the Axum router with all routes and middleware.

use std::sync::Arc;
use std::time::Duration;

use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use crate::handlers::{credits, health, reservations};
use crate::state::AppState;

/// Create the service router with all routes and middleware.
///
/// # Routes
///
/// ## Public
/// - `GET /health` - Liveness plus storage availability
///
/// ## Reservations (service API key auth)
/// - `POST /v1/reservations` - Reserve credits for a paid operation
/// - `POST /v1/reservations/commit` - Finalize a reservation as spent
/// - `POST /v1/reservations/release` - Cancel a reservation and refund
///
/// ## Credits (service API key auth)
/// - `GET /v1/balance` - Get an owner's balance
/// - `POST /v1/credits/add` - Fund an owner's balance
/// - `GET /v1/holds` - List an owner's holds (audit)
pub fn create_router(state: AppState) -> Router {
    // Extract config values before moving state
    let cors_origins = state.config.cors_origins.clone();
    let max_body_bytes = state.config.max_body_bytes;
    let request_timeout_seconds = state.config.request_timeout_seconds;

    let cors = build_cors_layer(&cors_origins);

    let state = Arc::new(state);

    Router::new()
        // Health (public)
        .route("/health", get(health::health))
        // Reservations
        .route("/v1/reservations", post(reservations::reserve))
        .route("/v1/reservations/commit", post(reservations::commit))
        .route("/v1/reservations/release", post(reservations::release))
        // Credits
        .route("/v1/balance", get(credits::get_balance))
        .route("/v1/credits/add", post(credits::add_credits))
        .route("/v1/holds", get(credits::list_holds))
        // Middleware
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .layer(RequestBodyLimitLayer::new(max_body_bytes))
        .layer(TimeoutLayer::new(Duration::from_secs(
            request_timeout_seconds,
        )))
        .with_state(state)
}

/// Build the CORS layer from configured origins.
fn build_cors_layer(origins: &[String]) -> CorsLayer {
    if origins.iter().any(|o| o == "*") {
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any)
    } else {
        let origins: Vec<_> = origins.iter().filter_map(|o| o.parse().ok()).collect();

        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods(Any)
            .allow_headers(Any)
    }
}

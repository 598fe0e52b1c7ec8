//! HTTP API service for the creditgate reservation ledger.
//!
//! The service is the caller adapter in front of the reservation engine: it
//! authenticates callers, enforces the idempotency-key requirement, runs the
//! availability gate before reservations (fail-closed), and schedules the
//! expiry reaper.

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod auth;
pub mod config;
pub mod error;
pub mod handlers;
pub mod reaper;
pub mod routes;
pub mod state;

pub use config::ServiceConfig;
pub use error::ApiError;
pub use routes::create_router;
pub use state::AppState;

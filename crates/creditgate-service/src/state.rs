//! Application state.

use std::sync::Arc;

use creditgate_store::Store;

use crate::config::ServiceConfig;

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    /// The storage backend. Trait object so tests can inject doubles
    /// (e.g. an unreachable store for fail-closed behavior).
    pub store: Arc<dyn Store>,

    /// Service configuration.
    pub config: ServiceConfig,
}

impl AppState {
    /// Create a new application state.
    #[must_use]
    pub fn new(store: Arc<dyn Store>, config: ServiceConfig) -> Self {
        if config.service_api_key.is_none() {
            tracing::warn!("SERVICE_API_KEY not configured - all API requests will be rejected");
        }

        Self { store, config }
    }
}

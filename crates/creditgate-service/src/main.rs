//! Creditgate Service - HTTP API for the credit reservation ledger
//!
//! This is the main entry point for the creditgate service.

use std::sync::Arc;
use std::time::Duration;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use creditgate_service::{create_router, reaper, AppState, ServiceConfig};
use creditgate_store::RocksStore;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,creditgate=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting Creditgate Service");

    // Load configuration from environment
    let config = ServiceConfig::from_env();

    tracing::info!(
        listen_addr = %config.listen_addr,
        data_dir = %config.data_dir,
        default_ttl_seconds = %config.default_ttl_seconds,
        reaper_interval_seconds = %config.reaper_interval_seconds,
        "Service configuration loaded"
    );

    // Initialize RocksDB store
    tracing::info!(path = %config.data_dir, "Opening RocksDB store");
    let store: Arc<dyn creditgate_store::Store> = Arc::new(RocksStore::open(&config.data_dir)?);

    // Schedule the expiry reaper
    reaper::spawn(
        Arc::clone(&store),
        Duration::from_secs(config.reaper_interval_seconds),
    );

    // Build app state and router
    let state = AppState::new(store, config.clone());
    let app = create_router(state);
    tracing::info!("Router configured with all API endpoints");

    // Start HTTP server
    tracing::info!(listen_addr = %config.listen_addr, "Starting HTTP server");
    let listener = tokio::net::TcpListener::bind(&config.listen_addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

//! Common test utilities for creditgate integration tests.

#![allow(dead_code)] // Some utilities are used by different test files

use std::sync::Arc;

use axum::Router;
use axum_test::TestServer;
use tempfile::TempDir;

use creditgate_core::OwnerId;
use creditgate_service::{create_router, AppState, ServiceConfig};
use creditgate_store::{RocksStore, Store};

/// Test harness containing everything needed for integration tests.
pub struct TestHarness {
    /// The test server for making HTTP requests.
    pub server: TestServer,
    /// Temporary directory for the database (kept alive for test duration).
    pub _temp_dir: Option<TempDir>,
    /// A test owner ID for requests.
    pub test_owner_id: OwnerId,
    /// The service API key for authenticated requests.
    pub service_api_key: String,
}

impl TestHarness {
    /// Create a new test harness with a fresh RocksDB-backed store.
    pub fn new() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let store = RocksStore::open(temp_dir.path()).expect("Failed to open store");

        Self::build(Arc::new(store), Some(temp_dir))
    }

    /// Create a harness around an injected store (e.g. a failure double).
    pub fn with_store(store: Arc<dyn Store>) -> Self {
        Self::build(store, None)
    }

    fn build(store: Arc<dyn Store>, temp_dir: Option<TempDir>) -> Self {
        let service_api_key = "test-service-key".to_string();

        let config = ServiceConfig {
            listen_addr: "127.0.0.1:0".into(),
            data_dir: temp_dir
                .as_ref()
                .map_or_else(|| "/tmp/unused".into(), |d| d.path().to_string_lossy().to_string()),
            service_api_key: Some(service_api_key.clone()),
            ..ServiceConfig::default()
        };

        let state = AppState::new(store, config);
        let router: Router = create_router(state);

        let server = TestServer::new(router).expect("Failed to create test server");
        let test_owner_id = OwnerId::generate();

        Self {
            server,
            _temp_dir: temp_dir,
            test_owner_id,
            service_api_key,
        }
    }

    /// Fund the test owner's balance through the API.
    pub async fn fund(&self, owner_id: OwnerId, amount_cents: i64) {
        self.server
            .post("/v1/credits/add")
            .add_header("x-api-key", self.service_api_key.clone())
            .json(&serde_json::json!({
                "owner_id": owner_id.to_string(),
                "amount_cents": amount_cents,
                "description": "test funding"
            }))
            .await
            .assert_status_ok();
    }

    /// Get the test owner's balance through the API.
    pub async fn balance_of(&self, owner_id: OwnerId) -> i64 {
        let response = self
            .server
            .get(&format!("/v1/balance?owner_id={owner_id}"))
            .add_header("x-api-key", self.service_api_key.clone())
            .await;

        response.assert_status_ok();
        let body: serde_json::Value = response.json();
        body["balance_cents"].as_i64().unwrap()
    }
}

impl Default for TestHarness {
    fn default() -> Self {
        Self::new()
    }
}

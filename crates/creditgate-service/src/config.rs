//! Service configuration.

use creditgate_core::DEFAULT_HOLD_TTL_SECONDS;

/// Service configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    /// Address to listen on (default: "0.0.0.0:8080").
    pub listen_addr: String,

    /// Path to `RocksDB` data directory (default: "/data/creditgate").
    pub data_dir: String,

    /// Service API key for service-to-service auth.
    pub service_api_key: Option<String>,

    /// Default hold TTL in seconds when the caller supplies none
    /// (default: 900, i.e. 15 minutes).
    pub default_ttl_seconds: i64,

    /// Maximum hold TTL a caller may request, in seconds (default: 86400).
    pub max_ttl_seconds: i64,

    /// How often the expiry reaper sweeps, in seconds (default: 300).
    pub reaper_interval_seconds: u64,

    /// CORS allowed origins.
    pub cors_origins: Vec<String>,

    /// Maximum request body size in bytes.
    pub max_body_bytes: usize,

    /// Request timeout in seconds.
    pub request_timeout_seconds: u64,
}

impl ServiceConfig {
    /// Load configuration from environment variables.
    #[must_use]
    pub fn from_env() -> Self {
        Self {
            listen_addr: std::env::var("LISTEN_ADDR").unwrap_or_else(|_| "0.0.0.0:8080".into()),
            data_dir: std::env::var("DATA_DIR").unwrap_or_else(|_| "/data/creditgate".into()),
            service_api_key: std::env::var("SERVICE_API_KEY").ok(),
            default_ttl_seconds: std::env::var("DEFAULT_TTL_SECONDS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(DEFAULT_HOLD_TTL_SECONDS),
            max_ttl_seconds: std::env::var("MAX_TTL_SECONDS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(24 * 60 * 60),
            reaper_interval_seconds: std::env::var("REAPER_INTERVAL_SECONDS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(5 * 60),
            cors_origins: std::env::var("CORS_ORIGINS")
                .unwrap_or_else(|_| "*".into())
                .split(',')
                .map(|s| s.trim().to_string())
                .collect(),
            max_body_bytes: std::env::var("MAX_BODY_BYTES")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(1024 * 1024), // 1MB
            request_timeout_seconds: std::env::var("REQUEST_TIMEOUT_SECONDS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(30),
        }
    }
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            listen_addr: "0.0.0.0:8080".into(),
            data_dir: "/data/creditgate".into(),
            service_api_key: None,
            default_ttl_seconds: DEFAULT_HOLD_TTL_SECONDS,
            max_ttl_seconds: 24 * 60 * 60,
            reaper_interval_seconds: 5 * 60,
            cors_origins: vec!["*".into()],
            max_body_bytes: 1024 * 1024,
            request_timeout_seconds: 30,
        }
    }
}

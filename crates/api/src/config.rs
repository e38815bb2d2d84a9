use vitals_core::sample::DEFAULT_MAX_BATCH_SAMPLES;

use crate::auth::jwt::JwtConfig;

/// Default raw-sample retention in days.
pub const DEFAULT_RETENTION_DAYS: i64 = 30;

/// Where accepted samples are persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageBackend {
    /// PostgreSQL via `DATABASE_URL`.
    Postgres,
    /// Process memory; for local development only.
    Memory,
}

impl StorageBackend {
    fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "postgres" | "postgresql" => Some(StorageBackend::Postgres),
            "memory" => Some(StorageBackend::Memory),
            _ => None,
        }
    }
}

/// Server configuration loaded from environment variables.
///
/// All fields have sensible defaults suitable for local development.
/// In production, override via environment variables.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind address (default: `0.0.0.0`).
    pub host: String,
    /// Bind port (default: `3000`).
    pub port: u16,
    /// Allowed CORS origins, parsed from comma-separated `CORS_ORIGINS` env var.
    pub cors_origins: Vec<String>,
    /// HTTP request timeout in seconds (default: `30`).
    pub request_timeout_secs: u64,
    /// Largest batch the ingestion endpoint accepts (default: `100`).
    pub max_batch_size: usize,
    /// Persistence backend (default: `postgres`).
    pub storage: StorageBackend,
    /// Raw sample retention in days (default: `30`).
    pub retention_days: i64,
    /// JWT verification settings for the status endpoint.
    pub jwt: JwtConfig,
}

impl ServerConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                | Default                    |
    /// |------------------------|----------------------------|
    /// | `HOST`                 | `0.0.0.0`                  |
    /// | `PORT`                 | `3000`                     |
    /// | `CORS_ORIGINS`         | `http://localhost:8080`    |
    /// | `REQUEST_TIMEOUT_SECS` | `30`                       |
    /// | `MAX_BATCH_SIZE`       | `100`                      |
    /// | `STORAGE`              | `postgres`                 |
    /// | `CWV_RETENTION_DAYS`   | `30`                       |
    pub fn from_env() -> Self {
        let host = std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".into());

        let port: u16 = std::env::var("PORT")
            .unwrap_or_else(|_| "3000".into())
            .parse()
            .expect("PORT must be a valid u16");

        let cors_origins: Vec<String> = std::env::var("CORS_ORIGINS")
            .unwrap_or_else(|_| "http://localhost:8080".into())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let request_timeout_secs: u64 = std::env::var("REQUEST_TIMEOUT_SECS")
            .unwrap_or_else(|_| "30".into())
            .parse()
            .expect("REQUEST_TIMEOUT_SECS must be a valid u64");

        let max_batch_size: usize = std::env::var("MAX_BATCH_SIZE")
            .map(|v| v.parse().expect("MAX_BATCH_SIZE must be a valid usize"))
            .unwrap_or(DEFAULT_MAX_BATCH_SAMPLES);
        assert!(max_batch_size > 0, "MAX_BATCH_SIZE must be positive");

        let storage = std::env::var("STORAGE")
            .map(|v| StorageBackend::parse(&v).expect("STORAGE must be 'postgres' or 'memory'"))
            .unwrap_or(StorageBackend::Postgres);

        let retention_days: i64 = std::env::var("CWV_RETENTION_DAYS")
            .map(|v| v.parse().expect("CWV_RETENTION_DAYS must be a valid i64"))
            .unwrap_or(DEFAULT_RETENTION_DAYS);

        let jwt = JwtConfig::from_env();

        Self {
            host,
            port,
            cors_origins,
            request_timeout_secs,
            max_batch_size,
            storage,
            retention_days,
            jwt,
        }
    }
}

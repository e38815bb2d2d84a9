//! Collector options and the host-page configuration they derive from.

use std::time::Duration;

use serde::Deserialize;

/// Samples per batch before an immediate delivery.
pub const DEFAULT_BATCH_SIZE: usize = 10;

/// Periodic flush interval in milliseconds.
pub const DEFAULT_FLUSH_INTERVAL_MS: u64 = 5000;

/// Errors raised while reading collector configuration from the environment.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{0} environment variable is required")]
    Missing(&'static str),

    #[error("{var} has an invalid value '{value}'")]
    Invalid { var: &'static str, value: String },
}

/// Options a [`Collector`](crate::Collector) is configured with.
#[derive(Debug, Clone, PartialEq)]
pub struct CollectorConfig {
    /// Ingestion endpoint, e.g. `https://example.com/api/v1/cwv`.
    pub endpoint: String,
    pub page_id: String,
    pub site_id: String,
    /// Always at least 1.
    pub batch_size: usize,
    pub flush_interval: Duration,
}

impl CollectorConfig {
    pub fn new(
        endpoint: impl Into<String>,
        page_id: impl Into<String>,
        site_id: impl Into<String>,
    ) -> Self {
        Self {
            endpoint: endpoint.into(),
            page_id: page_id.into(),
            site_id: site_id.into(),
            batch_size: DEFAULT_BATCH_SIZE,
            flush_interval: Duration::from_millis(DEFAULT_FLUSH_INTERVAL_MS),
        }
    }

    /// A zero batch size is raised to 1.
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    /// A zero interval is raised to 1 ms.
    pub fn with_flush_interval(mut self, interval: Duration) -> Self {
        self.flush_interval = interval.max(Duration::from_millis(1));
        self
    }

    /// Read batching options from the environment on top of a host config.
    ///
    /// | Env Var                 | Default |
    /// |-------------------------|---------|
    /// | `CWV_BATCH_SIZE`        | `10`    |
    /// | `CWV_FLUSH_INTERVAL_MS` | `5000`  |
    ///
    /// Returns `Ok(None)` when the host has monitoring disabled.
    pub fn from_env() -> Result<Option<Self>, ConfigError> {
        let Some(config) = HostConfig::from_env()?.into_collector_config() else {
            return Ok(None);
        };

        let batch_size = parse_var("CWV_BATCH_SIZE", DEFAULT_BATCH_SIZE)?;
        let interval_ms = parse_var("CWV_FLUSH_INTERVAL_MS", DEFAULT_FLUSH_INTERVAL_MS)?;

        Ok(Some(
            config
                .with_batch_size(batch_size)
                .with_flush_interval(Duration::from_millis(interval_ms)),
        ))
    }
}

/// Configuration handed to the page by the host CMS.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HostConfig {
    pub endpoint: String,
    pub page_id: String,
    pub site_id: String,
    #[serde(default)]
    pub cwv_monitoring: bool,
}

impl HostConfig {
    /// | Env Var          | Required | Default |
    /// |------------------|----------|---------|
    /// | `CWV_ENDPOINT`   | yes      | --      |
    /// | `CWV_PAGE_ID`    | yes      | --      |
    /// | `CWV_SITE_ID`    | yes      | --      |
    /// | `CWV_MONITORING` | no       | `true`  |
    pub fn from_env() -> Result<Self, ConfigError> {
        let cwv_monitoring = match std::env::var("CWV_MONITORING") {
            Ok(v) => parse_flag(&v).ok_or(ConfigError::Invalid {
                var: "CWV_MONITORING",
                value: v,
            })?,
            Err(_) => true,
        };

        Ok(Self {
            endpoint: required_var("CWV_ENDPOINT")?,
            page_id: required_var("CWV_PAGE_ID")?,
            site_id: required_var("CWV_SITE_ID")?,
            cwv_monitoring,
        })
    }

    /// Collector options with default batching, or `None` when monitoring is
    /// switched off for this page.
    pub fn into_collector_config(self) -> Option<CollectorConfig> {
        if !self.cwv_monitoring {
            return None;
        }
        Some(CollectorConfig::new(self.endpoint, self.page_id, self.site_id))
    }
}

fn required_var(var: &'static str) -> Result<String, ConfigError> {
    std::env::var(var)
        .ok()
        .filter(|v| !v.trim().is_empty())
        .ok_or(ConfigError::Missing(var))
}

fn parse_var<T: std::str::FromStr>(var: &'static str, default: T) -> Result<T, ConfigError> {
    match std::env::var(var) {
        Ok(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid { var, value }),
        Err(_) => Ok(default),
    }
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

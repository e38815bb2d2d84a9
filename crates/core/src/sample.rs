//! Metric samples and the batch envelope exchanged between the collector
//! and the ingestion endpoint.
//!
//! Field names follow the browser-side JSON convention (camelCase).

use serde::{Deserialize, Deserializer, Serialize};

use crate::error::CoreError;
use crate::types::EpochMillis;
use crate::vitals::{round2, Rating, VitalName};

/// Viewport widths below this are `mobile`.
pub const MOBILE_MAX_WIDTH: u32 = 768;
/// Viewport widths below this (and at least [`MOBILE_MAX_WIDTH`]) are `tablet`.
pub const TABLET_MAX_WIDTH: u32 = 1024;

/// Default upper bound on samples accepted in one batch.
pub const DEFAULT_MAX_BATCH_SAMPLES: usize = 100;

const MAX_URL_LEN: usize = 2048;
const MAX_METRIC_ID_LEN: usize = 128;
const MAX_SCOPE_ID_LEN: usize = 64;

/// Device bucket derived from the viewport width.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeviceType {
    Mobile,
    Tablet,
    Desktop,
}

impl DeviceType {
    pub fn from_viewport_width(width: u32) -> Self {
        if width < MOBILE_MAX_WIDTH {
            DeviceType::Mobile
        } else if width < TABLET_MAX_WIDTH {
            DeviceType::Tablet
        } else {
            DeviceType::Desktop
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            DeviceType::Mobile => "mobile",
            DeviceType::Tablet => "tablet",
            DeviceType::Desktop => "desktop",
        }
    }
}

/// How the page was entered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NavigationType {
    Navigate,
    Reload,
    BackForward,
    Prerender,
    #[default]
    #[serde(other)]
    Unknown,
}

impl NavigationType {
    pub fn as_str(&self) -> &'static str {
        match self {
            NavigationType::Navigate => "navigate",
            NavigationType::Reload => "reload",
            NavigationType::BackForward => "back_forward",
            NavigationType::Prerender => "prerender",
            NavigationType::Unknown => "unknown",
        }
    }

    /// Parse a navigation type label, mapping anything unrecognized to `Unknown`.
    pub fn from_label(label: &str) -> Self {
        match label {
            "navigate" => NavigationType::Navigate,
            "reload" => NavigationType::Reload,
            "back_forward" | "back-forward" => NavigationType::BackForward,
            "prerender" => NavigationType::Prerender,
            _ => NavigationType::Unknown,
        }
    }
}

/// Network Information API snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NetworkInfo {
    /// `slow-2g`, `2g`, `3g` or `4g`.
    pub effective_type: Option<String>,
    /// Downlink estimate in Mbit/s.
    pub downlink: Option<f64>,
    /// Round-trip-time estimate in ms.
    pub rtt: Option<f64>,
    #[serde(default)]
    pub save_data: bool,
}

/// Connection descriptor: a network snapshot, or an opaque label
/// (normally `"unknown"`) when the capability is missing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ConnectionType {
    Network(NetworkInfo),
    Label(String),
}

impl ConnectionType {
    pub fn unknown() -> Self {
        ConnectionType::Label("unknown".to_string())
    }

    pub fn network(&self) -> Option<&NetworkInfo> {
        match self {
            ConnectionType::Network(info) => Some(info),
            ConnectionType::Label(_) => None,
        }
    }
}

impl Default for ConnectionType {
    fn default() -> Self {
        ConnectionType::unknown()
    }
}

/// One observed performance measurement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricSample {
    pub name: VitalName,
    pub value: f64,
    pub rating: Rating,
    #[serde(default)]
    pub delta: f64,
    /// Unique per metric instance within a page load.
    pub id: String,
    #[serde(deserialize_with = "string_or_number")]
    pub page_id: String,
    #[serde(default, deserialize_with = "string_or_number")]
    pub site_id: String,
    pub device_type: DeviceType,
    #[serde(default)]
    pub connection_type: ConnectionType,
    pub timestamp: EpochMillis,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub navigation_type: NavigationType,
}

impl MetricSample {
    /// Check the invariants an untrusted sample must satisfy.
    pub fn validate(&self) -> Result<(), CoreError> {
        if !self.value.is_finite() || !self.delta.is_finite() {
            return Err(CoreError::Validation(format!(
                "{} value and delta must be finite numbers",
                self.name
            )));
        }
        if self.value < 0.0 {
            return Err(CoreError::Validation(format!(
                "{} value must be non-negative",
                self.name
            )));
        }
        if self.id.trim().is_empty() || self.id.len() > MAX_METRIC_ID_LEN {
            return Err(CoreError::Validation(format!(
                "id must be 1-{MAX_METRIC_ID_LEN} characters"
            )));
        }
        if self.page_id.trim().is_empty() || self.page_id.len() > MAX_SCOPE_ID_LEN {
            return Err(CoreError::Validation(format!(
                "pageId must be 1-{MAX_SCOPE_ID_LEN} characters"
            )));
        }
        if self.site_id.len() > MAX_SCOPE_ID_LEN {
            return Err(CoreError::Validation(format!(
                "siteId must be at most {MAX_SCOPE_ID_LEN} characters"
            )));
        }
        if self.url.len() > MAX_URL_LEN {
            return Err(CoreError::Validation(format!(
                "url must be at most {MAX_URL_LEN} characters"
            )));
        }
        Ok(())
    }

    /// Apply capture-time rounding. Idempotent.
    pub fn normalize(&mut self) {
        self.value = round2(self.value);
        self.delta = round2(self.delta);
    }
}

/// Width/height pair in CSS pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Dimensions {
    #[serde(default)]
    pub width: u32,
    #[serde(default)]
    pub height: u32,
}

/// Client metadata shared by every sample in a batch.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchMeta {
    #[serde(default)]
    pub user_agent: String,
    #[serde(default)]
    pub viewport: Dimensions,
    #[serde(default)]
    pub screen: Dimensions,
}

/// The unit of network transfer and of backend validation.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Batch {
    #[serde(default, deserialize_with = "null_as_default")]
    pub metrics: Vec<MetricSample>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub meta: BatchMeta,
}

impl Batch {
    /// All-or-nothing validation of an incoming batch.
    pub fn validate(&self, max_samples: usize) -> Result<(), CoreError> {
        if self.metrics.is_empty() {
            return Err(CoreError::Validation("No metrics provided".into()));
        }
        if self.metrics.len() > max_samples {
            return Err(CoreError::Validation(format!(
                "Batch exceeds the maximum of {max_samples} metrics"
            )));
        }
        for (idx, sample) in self.metrics.iter().enumerate() {
            sample.validate().map_err(|e| match e {
                CoreError::Validation(msg) => {
                    CoreError::Validation(format!("metrics[{idx}]: {msg}"))
                }
                other => other,
            })?;
        }
        Ok(())
    }

    /// Round every sample's value and delta to two decimals.
    pub fn normalize(&mut self) {
        self.metrics.iter_mut().for_each(MetricSample::normalize);
    }
}

/// Accept either a JSON string or a JSON number and normalize to a string.
///
/// Host pages commonly emit numeric post/site ids.
fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Str(String),
        Int(i64),
        Float(f64),
    }

    Ok(match Raw::deserialize(deserializer)? {
        Raw::Str(s) => s,
        Raw::Int(n) => n.to_string(),
        Raw::Float(f) => f.to_string(),
    })
}

/// Treat an explicit JSON `null` like a missing field.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

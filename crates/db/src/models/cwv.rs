//! Core Web Vitals rows: raw samples and per-page aggregates.

use serde::Serialize;
use sqlx::types::Json;
use sqlx::FromRow;
use vitals_core::aggregate::{RatingDistribution, VitalAggregate};
use vitals_core::sample::ConnectionType;
use vitals_core::types::Timestamp;
use vitals_core::vitals::{Rating, VitalName};

use crate::store::StoreError;

// ---------------------------------------------------------------------------
// Raw samples (append-only)
// ---------------------------------------------------------------------------

/// A persisted metric sample together with its batch metadata.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct CwvSampleRow {
    pub id: i64,
    pub page_id: String,
    pub site_id: String,
    pub vital: String,
    pub value: f64,
    pub rating: String,
    pub delta: f64,
    pub metric_id: String,
    pub device_type: String,
    pub connection: Json<ConnectionType>,
    pub navigation_type: String,
    pub url: String,
    pub client_timestamp_ms: i64,
    pub user_agent: String,
    pub viewport_width: i32,
    pub viewport_height: i32,
    pub screen_width: i32,
    pub screen_height: i32,
    pub received_at: Timestamp,
}

// ---------------------------------------------------------------------------
// Aggregates
// ---------------------------------------------------------------------------

/// One `(page_id, vital)` aggregate row.
#[derive(Debug, Clone, FromRow)]
pub struct CwvAggregateRow {
    pub page_id: String,
    pub vital: String,
    pub sample_count: i64,
    pub value_sum: f64,
    pub min_value: f64,
    pub max_value: f64,
    pub good_count: i64,
    pub needs_improvement_count: i64,
    pub poor_count: i64,
    pub latest_value: f64,
    pub latest_rating: String,
    pub latest_timestamp_ms: i64,
    pub updated_at: Timestamp,
}

impl CwvAggregateRow {
    /// Convert into the domain aggregate, rejecting unknown enum labels.
    pub fn into_aggregate(self) -> Result<(VitalName, VitalAggregate), StoreError> {
        let vital: VitalName = self.vital.parse().map_err(StoreError::Corrupt)?;
        let latest_rating: Rating = self.latest_rating.parse().map_err(StoreError::Corrupt)?;

        Ok((
            vital,
            VitalAggregate {
                sample_count: to_count(self.sample_count),
                value_sum: self.value_sum,
                min_value: self.min_value,
                max_value: self.max_value,
                distribution: RatingDistribution {
                    good: to_count(self.good_count),
                    needs_improvement: to_count(self.needs_improvement_count),
                    poor: to_count(self.poor_count),
                },
                latest_value: self.latest_value,
                latest_rating,
                latest_timestamp: self.latest_timestamp_ms,
            },
        ))
    }
}

/// Counters are stored as BIGINT; negative values never occur.
fn to_count(v: i64) -> u64 {
    u64::try_from(v).unwrap_or(0)
}

/// Clamp a `u64` counter into a BIGINT bind value.
pub(crate) fn to_bigint(v: u64) -> i64 {
    i64::try_from(v).unwrap_or(i64::MAX)
}

//! Repository for the `cwv_page_aggregates` table.
//!
//! Rows are upserted additively so concurrent batches for the same page
//! commute.

use sqlx::{PgConnection, PgPool};
use vitals_core::aggregate::VitalAggregate;
use vitals_core::vitals::VitalName;

use crate::models::cwv::{to_bigint, CwvAggregateRow};

const COLUMNS: &str = "\
    page_id, vital, sample_count, value_sum, min_value, max_value, \
    good_count, needs_improvement_count, poor_count, \
    latest_value, latest_rating, latest_timestamp_ms, updated_at";

/// Provides query operations for page aggregates.
pub struct CwvAggregateRepo;

impl CwvAggregateRepo {
    /// Merge a partial aggregate into the stored row for `(page_id, vital)`.
    ///
    /// The latest-value columns follow the greater `(timestamp, value)` pair,
    /// matching [`VitalAggregate::merge`].
    pub async fn upsert(
        conn: &mut PgConnection,
        page_id: &str,
        vital: VitalName,
        agg: &VitalAggregate,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            "INSERT INTO cwv_page_aggregates \
                (page_id, vital, sample_count, value_sum, min_value, max_value, \
                 good_count, needs_improvement_count, poor_count, \
                 latest_value, latest_rating, latest_timestamp_ms) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12) \
             ON CONFLICT (page_id, vital) DO UPDATE SET \
                sample_count = cwv_page_aggregates.sample_count + EXCLUDED.sample_count, \
                value_sum = cwv_page_aggregates.value_sum + EXCLUDED.value_sum, \
                min_value = \
                    LEAST(cwv_page_aggregates.min_value, EXCLUDED.min_value), \
                max_value = \
                    GREATEST(cwv_page_aggregates.max_value, EXCLUDED.max_value), \
                good_count = cwv_page_aggregates.good_count + EXCLUDED.good_count, \
                needs_improvement_count = \
                    cwv_page_aggregates.needs_improvement_count \
                    + EXCLUDED.needs_improvement_count, \
                poor_count = cwv_page_aggregates.poor_count + EXCLUDED.poor_count, \
                latest_value = CASE \
                    WHEN (EXCLUDED.latest_timestamp_ms, EXCLUDED.latest_value) \
                       > (cwv_page_aggregates.latest_timestamp_ms, \
                          cwv_page_aggregates.latest_value) \
                    THEN EXCLUDED.latest_value ELSE cwv_page_aggregates.latest_value END, \
                latest_rating = CASE \
                    WHEN (EXCLUDED.latest_timestamp_ms, EXCLUDED.latest_value) \
                       > (cwv_page_aggregates.latest_timestamp_ms, \
                          cwv_page_aggregates.latest_value) \
                    THEN EXCLUDED.latest_rating ELSE cwv_page_aggregates.latest_rating END, \
                latest_timestamp_ms = \
                    GREATEST(cwv_page_aggregates.latest_timestamp_ms, \
                             EXCLUDED.latest_timestamp_ms), \
                updated_at = NOW()",
        )
        .bind(page_id)
        .bind(vital.as_str())
        .bind(to_bigint(agg.sample_count))
        .bind(agg.value_sum)
        .bind(agg.min_value)
        .bind(agg.max_value)
        .bind(to_bigint(agg.distribution.good))
        .bind(to_bigint(agg.distribution.needs_improvement))
        .bind(to_bigint(agg.distribution.poor))
        .bind(agg.latest_value)
        .bind(agg.latest_rating.as_str())
        .bind(agg.latest_timestamp)
        .execute(&mut *conn)
        .await?;
        Ok(())
    }

    /// All aggregate rows for a page, ordered by vital.
    pub async fn list_for_page(
        pool: &PgPool,
        page_id: &str,
    ) -> Result<Vec<CwvAggregateRow>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM cwv_page_aggregates \
             WHERE page_id = $1 \
             ORDER BY vital"
        );
        sqlx::query_as::<_, CwvAggregateRow>(&query)
            .bind(page_id)
            .fetch_all(pool)
            .await
    }
}

//! Repository for the `cwv_samples` table (append-only time-series).

use sqlx::types::Json;
use sqlx::{PgConnection, PgPool};
use vitals_core::sample::Batch;
use vitals_core::types::Timestamp;

use crate::models::cwv::CwvSampleRow;

/// Column list for `cwv_samples` SELECT queries (includes `id` and `received_at`).
const COLUMNS: &str = "\
    id, page_id, site_id, vital, value, rating, delta, metric_id, \
    device_type, connection, navigation_type, url, client_timestamp_ms, \
    user_agent, viewport_width, viewport_height, screen_width, screen_height, \
    received_at";

/// Column list for `cwv_samples` INSERT statements.
///
/// Excludes the generated `id` and `received_at` columns.
const INSERT_COLUMNS: &str = "\
    page_id, site_id, vital, value, rating, delta, metric_id, \
    device_type, connection, navigation_type, url, client_timestamp_ms, \
    user_agent, viewport_width, viewport_height, screen_width, screen_height";

const INSERT_COLUMN_COUNT: usize = 17;

/// Provides query operations for raw CWV samples.
pub struct CwvSampleRepo;

impl CwvSampleRepo {
    /// Insert every sample of a batch with a single multi-row INSERT.
    ///
    /// Returns the number of rows written.
    pub async fn insert_batch(conn: &mut PgConnection, batch: &Batch) -> Result<u64, sqlx::Error> {
        if batch.metrics.is_empty() {
            return Ok(0);
        }

        let mut query = format!("INSERT INTO cwv_samples ({INSERT_COLUMNS}) VALUES ");

        let mut param_idx = 1usize;
        for (i, _) in batch.metrics.iter().enumerate() {
            if i > 0 {
                query.push_str(", ");
            }
            query.push('(');
            for j in 0..INSERT_COLUMN_COUNT {
                if j > 0 {
                    query.push_str(", ");
                }
                query.push('$');
                query.push_str(&param_idx.to_string());
                param_idx += 1;
            }
            query.push(')');
        }

        let meta = &batch.meta;
        let mut q = sqlx::query(&query);
        for s in &batch.metrics {
            q = q
                .bind(&s.page_id)
                .bind(&s.site_id)
                .bind(s.name.as_str())
                .bind(s.value)
                .bind(s.rating.as_str())
                .bind(s.delta)
                .bind(&s.id)
                .bind(s.device_type.as_str())
                .bind(Json(&s.connection_type))
                .bind(s.navigation_type.as_str())
                .bind(&s.url)
                .bind(s.timestamp)
                .bind(&meta.user_agent)
                .bind(to_int(meta.viewport.width))
                .bind(to_int(meta.viewport.height))
                .bind(to_int(meta.screen.width))
                .bind(to_int(meta.screen.height));
        }

        let result = q.execute(&mut *conn).await?;
        Ok(result.rows_affected())
    }

    /// Most recent samples for a page, newest first.
    pub async fn list_for_page(
        pool: &PgPool,
        page_id: &str,
        limit: i64,
    ) -> Result<Vec<CwvSampleRow>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM cwv_samples \
             WHERE page_id = $1 \
             ORDER BY received_at DESC, id DESC \
             LIMIT $2"
        );
        sqlx::query_as::<_, CwvSampleRow>(&query)
            .bind(page_id)
            .bind(limit)
            .fetch_all(pool)
            .await
    }

    /// Delete samples received before the cutoff.
    ///
    /// Returns the number of rows deleted.
    pub async fn delete_older_than(pool: &PgPool, cutoff: Timestamp) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("DELETE FROM cwv_samples WHERE received_at < $1")
            .bind(cutoff)
            .execute(pool)
            .await?;
        Ok(result.rows_affected())
    }
}

fn to_int(v: u32) -> i32 {
    i32::try_from(v).unwrap_or(i32::MAX)
}

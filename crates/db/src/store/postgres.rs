use async_trait::async_trait;
use vitals_core::aggregate::{fold_batch, PageCwvStatus};
use vitals_core::sample::Batch;
use vitals_core::types::Timestamp;

use super::{CwvStore, StoreError};
use crate::repositories::{CwvAggregateRepo, CwvSampleRepo};
use crate::DbPool;

/// [`CwvStore`] backed by PostgreSQL.
#[derive(Clone)]
pub struct PgCwvStore {
    pool: DbPool,
}

impl PgCwvStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CwvStore for PgCwvStore {
    async fn record_batch(&self, batch: &Batch) -> Result<u64, StoreError> {
        let mut tx = self.pool.begin().await?;

        let inserted = CwvSampleRepo::insert_batch(&mut tx, batch).await?;

        // BTreeMap order keeps row-lock acquisition consistent across
        // concurrent batches touching the same pages.
        for ((page_id, vital), agg) in fold_batch(batch) {
            CwvAggregateRepo::upsert(&mut tx, &page_id, vital, &agg).await?;
        }

        tx.commit().await?;

        tracing::debug!(inserted, "CWV batch committed");
        Ok(inserted)
    }

    async fn page_status(&self, page_id: &str) -> Result<Option<PageCwvStatus>, StoreError> {
        let rows = CwvAggregateRepo::list_for_page(&self.pool, page_id).await?;
        if rows.is_empty() {
            return Ok(None);
        }

        let aggregates = rows
            .into_iter()
            .map(|row| row.into_aggregate())
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Some(PageCwvStatus::from_aggregates(
            page_id,
            aggregates.iter().map(|(name, agg)| (*name, agg)),
        )))
    }

    async fn purge_samples_older_than(&self, cutoff: Timestamp) -> Result<u64, StoreError> {
        Ok(CwvSampleRepo::delete_older_than(&self.pool, cutoff).await?)
    }

    async fn health_check(&self) -> Result<(), StoreError> {
        Ok(crate::health_check(&self.pool).await?)
    }
}

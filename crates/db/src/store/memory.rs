use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;
use vitals_core::aggregate::{fold_batch, PageCwvStatus, VitalAggregate};
use vitals_core::sample::{Batch, BatchMeta, MetricSample};
use vitals_core::types::Timestamp;
use vitals_core::vitals::VitalName;

use super::{CwvStore, StoreError};

/// A raw sample as held by [`MemoryCwvStore`].
#[derive(Debug, Clone)]
pub struct StoredSample {
    pub sample: MetricSample,
    pub meta: BatchMeta,
    pub received_at: Timestamp,
}

#[derive(Default)]
struct Inner {
    samples: Vec<StoredSample>,
    aggregates: HashMap<String, BTreeMap<VitalName, VitalAggregate>>,
}

/// In-process [`CwvStore`]. Contents are lost on restart.
#[derive(Default)]
pub struct MemoryCwvStore {
    inner: RwLock<Inner>,
}

impl MemoryCwvStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the stored raw samples for a page, oldest first.
    pub async fn samples_for_page(&self, page_id: &str) -> Vec<StoredSample> {
        let inner = self.inner.read().await;
        inner
            .samples
            .iter()
            .filter(|s| s.sample.page_id == page_id)
            .cloned()
            .collect()
    }

    pub async fn sample_count(&self) -> usize {
        self.inner.read().await.samples.len()
    }

    /// Insert a raw sample with an explicit receive time (retention tests).
    pub async fn insert_raw(&self, stored: StoredSample) {
        self.inner.write().await.samples.push(stored);
    }
}

#[async_trait]
impl CwvStore for MemoryCwvStore {
    async fn record_batch(&self, batch: &Batch) -> Result<u64, StoreError> {
        let received_at = Utc::now();
        let folded = fold_batch(batch);

        // Single write guard: the batch lands as one unit.
        let mut inner = self.inner.write().await;
        inner
            .samples
            .extend(batch.metrics.iter().map(|sample| StoredSample {
                sample: sample.clone(),
                meta: batch.meta.clone(),
                received_at,
            }));

        for ((page_id, vital), agg) in folded {
            inner
                .aggregates
                .entry(page_id)
                .or_default()
                .entry(vital)
                .and_modify(|existing| existing.merge(&agg))
                .or_insert(agg);
        }

        Ok(batch.metrics.len() as u64)
    }

    async fn page_status(&self, page_id: &str) -> Result<Option<PageCwvStatus>, StoreError> {
        let inner = self.inner.read().await;
        Ok(inner.aggregates.get(page_id).map(|vitals| {
            PageCwvStatus::from_aggregates(page_id, vitals.iter().map(|(name, agg)| (*name, agg)))
        }))
    }

    async fn purge_samples_older_than(&self, cutoff: Timestamp) -> Result<u64, StoreError> {
        let mut inner = self.inner.write().await;
        let before = inner.samples.len();
        inner.samples.retain(|s| s.received_at >= cutoff);
        Ok((before - inner.samples.len()) as u64)
    }

    async fn health_check(&self) -> Result<(), StoreError> {
        Ok(())
    }
}

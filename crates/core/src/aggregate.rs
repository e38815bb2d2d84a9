//! Write-time aggregation of metric samples into per-page status.
//!
//! Every accepted batch is folded into one [`VitalAggregate`] per
//! `(page, vital)`. Merging is commutative and associative, so batches may
//! arrive in any order and reading a page's status never touches raw
//! samples.

use std::cmp::Ordering;
use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::sample::{Batch, MetricSample};
use crate::types::EpochMillis;
use crate::vitals::{round2, Rating, VitalName};

/// Share of `good` samples required for a vital to rate `good` overall.
const GOOD_SHARE_REQUIRED: f64 = 0.75;
/// Share of `poor` samples above which a vital rates `poor` overall.
const POOR_SHARE_LIMIT: f64 = 0.25;

/// Count of samples per rating bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RatingDistribution {
    pub good: u64,
    pub needs_improvement: u64,
    pub poor: u64,
}

impl RatingDistribution {
    pub fn record(&mut self, rating: Rating) {
        match rating {
            Rating::Good => self.good += 1,
            Rating::NeedsImprovement => self.needs_improvement += 1,
            Rating::Poor => self.poor += 1,
        }
    }

    pub fn total(&self) -> u64 {
        self.good + self.needs_improvement + self.poor
    }

    pub fn merge(&mut self, other: &RatingDistribution) {
        self.good += other.good;
        self.needs_improvement += other.needs_improvement;
        self.poor += other.poor;
    }

    /// The bucket containing the 75th percentile sample.
    ///
    /// Buckets are ordered good < needs-improvement < poor, so p75 lands in
    /// `good` iff at least 75% are good and in `poor` iff more than 25% are
    /// poor.
    pub fn p75_rating(&self) -> Option<Rating> {
        let total = self.total();
        if total == 0 {
            return None;
        }
        let total = total as f64;
        if self.good as f64 / total >= GOOD_SHARE_REQUIRED {
            Some(Rating::Good)
        } else if self.poor as f64 / total > POOR_SHARE_LIMIT {
            Some(Rating::Poor)
        } else {
            Some(Rating::NeedsImprovement)
        }
    }
}

/// Accumulated state for one vital on one page.
#[derive(Debug, Clone, PartialEq)]
pub struct VitalAggregate {
    pub sample_count: u64,
    pub value_sum: f64,
    pub min_value: f64,
    pub max_value: f64,
    pub distribution: RatingDistribution,
    pub latest_value: f64,
    pub latest_rating: Rating,
    pub latest_timestamp: EpochMillis,
}

impl VitalAggregate {
    pub fn from_sample(sample: &MetricSample) -> Self {
        let mut distribution = RatingDistribution::default();
        distribution.record(sample.rating);
        Self {
            sample_count: 1,
            value_sum: sample.value,
            min_value: sample.value,
            max_value: sample.value,
            distribution,
            latest_value: sample.value,
            latest_rating: sample.rating,
            latest_timestamp: sample.timestamp,
        }
    }

    pub fn absorb(&mut self, sample: &MetricSample) {
        self.merge(&VitalAggregate::from_sample(sample));
    }

    pub fn merge(&mut self, other: &VitalAggregate) {
        self.sample_count += other.sample_count;
        self.value_sum += other.value_sum;
        self.min_value = self.min_value.min(other.min_value);
        self.max_value = self.max_value.max(other.max_value);
        self.distribution.merge(&other.distribution);

        let newer = other
            .latest_timestamp
            .cmp(&self.latest_timestamp)
            .then_with(|| other.latest_value.total_cmp(&self.latest_value));
        if newer == Ordering::Greater {
            self.latest_value = other.latest_value;
            self.latest_rating = other.latest_rating;
            self.latest_timestamp = other.latest_timestamp;
        }
    }

    pub fn mean(&self) -> f64 {
        if self.sample_count == 0 {
            return 0.0;
        }
        round2(self.value_sum / self.sample_count as f64)
    }

    /// Overall classification from the rating distribution.
    pub fn rating(&self) -> Rating {
        self.distribution
            .p75_rating()
            .unwrap_or(self.latest_rating)
    }
}

/// Serialized per-vital view returned by the status endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VitalStatus {
    pub sample_count: u64,
    pub mean: f64,
    pub min: f64,
    pub max: f64,
    pub latest_value: f64,
    pub latest_rating: Rating,
    pub latest_timestamp: EpochMillis,
    pub distribution: RatingDistribution,
    pub rating: Rating,
}

impl From<&VitalAggregate> for VitalStatus {
    fn from(agg: &VitalAggregate) -> Self {
        Self {
            sample_count: agg.sample_count,
            mean: agg.mean(),
            min: agg.min_value,
            max: agg.max_value,
            latest_value: agg.latest_value,
            latest_rating: agg.latest_rating,
            latest_timestamp: agg.latest_timestamp,
            distribution: agg.distribution,
            rating: agg.rating(),
        }
    }
}

/// Aggregated CWV status for one page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageCwvStatus {
    pub page_id: String,
    pub vitals: BTreeMap<VitalName, VitalStatus>,
    /// Worst per-vital rating; `None` when the page has no data.
    pub overall: Option<Rating>,
    pub sample_count: u64,
}

impl PageCwvStatus {
    /// Status for a page that has never reported.
    pub fn empty(page_id: impl Into<String>) -> Self {
        Self {
            page_id: page_id.into(),
            vitals: BTreeMap::new(),
            overall: None,
            sample_count: 0,
        }
    }

    pub fn from_aggregates<'a, I>(page_id: impl Into<String>, aggregates: I) -> Self
    where
        I: IntoIterator<Item = (VitalName, &'a VitalAggregate)>,
    {
        let vitals: BTreeMap<VitalName, VitalStatus> = aggregates
            .into_iter()
            .map(|(name, agg)| (name, VitalStatus::from(agg)))
            .collect();
        let overall = vitals.values().map(|v| v.rating).max();
        let sample_count = vitals.values().map(|v| v.sample_count).sum();
        Self {
            page_id: page_id.into(),
            vitals,
            overall,
            sample_count,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.vitals.is_empty()
    }
}

/// Key of one aggregate row.
pub type AggregateKey = (String, VitalName);

/// Fold a batch into per-`(page, vital)` aggregates.
///
/// Every report is counted, including repeated reports of one metric
/// instance, so the result does not depend on where batches were cut.
pub fn fold_batch(batch: &Batch) -> BTreeMap<AggregateKey, VitalAggregate> {
    let mut out: BTreeMap<AggregateKey, VitalAggregate> = BTreeMap::new();
    for sample in &batch.metrics {
        out.entry((sample.page_id.clone(), sample.name))
            .and_modify(|agg| agg.absorb(sample))
            .or_insert_with(|| VitalAggregate::from_sample(sample));
    }
    out
}

//! Storage abstraction used by the ingestion service.
//!
//! [`PgCwvStore`] is the production implementation; [`MemoryCwvStore`]
//! backs tests and `STORAGE=memory` local runs.

mod memory;
mod postgres;

use async_trait::async_trait;
use vitals_core::aggregate::PageCwvStatus;
use vitals_core::sample::Batch;
use vitals_core::types::Timestamp;

pub use memory::{MemoryCwvStore, StoredSample};
pub use postgres::PgCwvStore;

/// Errors raised by a [`CwvStore`].
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[source] sqlx::Error),

    /// A stored row holds a value the domain model does not recognise.
    #[error("Corrupt row: {0}")]
    Corrupt(String),

    /// The backing database cannot be reached right now.
    #[error("Store unavailable: {0}")]
    Unavailable(String),
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::Io(_) => {
                StoreError::Unavailable(err.to_string())
            }
            other => StoreError::Database(other),
        }
    }
}

/// Persistence for raw samples and write-time page aggregates.
#[async_trait]
pub trait CwvStore: Send + Sync {
    /// Persist every sample of a validated batch and fold it into the page
    /// aggregates as one atomic unit.
    ///
    /// Returns the number of samples persisted. On error nothing is written.
    async fn record_batch(&self, batch: &Batch) -> Result<u64, StoreError>;

    /// Aggregated status for a page, or `None` if it has never reported.
    async fn page_status(&self, page_id: &str) -> Result<Option<PageCwvStatus>, StoreError>;

    /// Delete raw samples received before `cutoff`. Aggregates are kept.
    async fn purge_samples_older_than(&self, cutoff: Timestamp) -> Result<u64, StoreError>;

    async fn health_check(&self) -> Result<(), StoreError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn connection_failures_map_to_unavailable() {
        assert!(matches!(
            StoreError::from(sqlx::Error::PoolTimedOut),
            StoreError::Unavailable(_)
        ));
        assert!(matches!(
            StoreError::from(sqlx::Error::PoolClosed),
            StoreError::Unavailable(_)
        ));
        let refused = std::io::Error::new(std::io::ErrorKind::ConnectionRefused, "refused");
        assert!(matches!(
            StoreError::from(sqlx::Error::Io(refused)),
            StoreError::Unavailable(_)
        ));
    }

    #[test]
    fn query_failures_stay_database_errors() {
        assert!(matches!(
            StoreError::from(sqlx::Error::RowNotFound),
            StoreError::Database(sqlx::Error::RowNotFound)
        ));
    }
}

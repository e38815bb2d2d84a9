//! Periodic cleanup of old raw CWV samples.
//!
//! Deletes raw samples older than the configured retention period. Page
//! aggregates are never touched, so status keeps reflecting every sample
//! ever accepted.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio_util::sync::CancellationToken;
use vitals_db::CwvStore;

/// How often the cleanup job runs.
pub const CLEANUP_INTERVAL: Duration = Duration::from_secs(3600);

/// Run the sample retention loop until `cancel` is triggered.
///
/// A non-positive `retention_days` disables purging; the task returns
/// immediately.
pub async fn run(store: Arc<dyn CwvStore>, retention_days: i64, cancel: CancellationToken) {
    if retention_days <= 0 {
        tracing::info!(retention_days, "Sample retention disabled");
        return;
    }

    tracing::info!(
        retention_days,
        interval_secs = CLEANUP_INTERVAL.as_secs(),
        "Sample retention job started"
    );

    let mut interval = tokio::time::interval(CLEANUP_INTERVAL);

    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                tracing::info!("Sample retention job stopping");
                break;
            }
            _ = interval.tick() => {
                let cutoff = Utc::now() - chrono::Duration::days(retention_days);
                match store.purge_samples_older_than(cutoff).await {
                    Ok(deleted) if deleted > 0 => {
                        tracing::info!(deleted, "Sample retention: purged old rows");
                    }
                    Ok(_) => tracing::debug!("Sample retention: no rows to purge"),
                    Err(e) => {
                        tracing::error!(error = %e, "Sample retention: cleanup failed");
                    }
                }
            }
        }
    }
}

//! Batching and flushing of CWV samples.
//!
//! [`Collector`] owns the pending batch. Samples are appended by
//! [`on_metric`](Collector::on_metric); a batch leaves the collector in
//! exactly one critical section, either when it reaches the configured size
//! or when [`flush`](Collector::flush) runs from the ticker or a lifecycle
//! event. Delivery happens outside the lock.
//!
//! [`CollectorSession::run`] drives everything from one `tokio::select!`
//! loop.

use std::sync::Arc;

use chrono::Utc;
use tokio::sync::{mpsc, Mutex};
use tokio::time::{Instant, MissedTickBehavior};
use vitals_core::sample::{Batch, MetricSample};
use vitals_core::vitals::{round2, Rating};

use crate::config::CollectorConfig;
use crate::environment::PageEnvironment;
use crate::lifecycle::LifecycleEvent;
use crate::source::{Observation, VitalsSource};
use crate::transport::Transport;

/// Observable collector phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CollectorState {
    /// Configured, nothing observed yet.
    Idle,
    /// Collecting samples into the pending batch.
    Accumulating,
    /// At least one claimed batch is being delivered.
    Flushing,
}

/// Result of one delivery attempt, for diagnostics only.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlushOutcome {
    /// Nothing pending; no network call was made.
    Empty,
    /// `n` samples queued as a beacon.
    Beacon(usize),
    /// `n` samples delivered by keepalive POST after the beacon was refused.
    Keepalive(usize),
    /// `n` samples dropped after a failed delivery.
    Failed(usize),
}

#[derive(Default)]
struct Pending {
    samples: Vec<MetricSample>,
    in_flight: usize,
    observed: bool,
}

impl Pending {
    /// Take the whole batch and mark it in flight.
    fn claim(&mut self) -> Vec<MetricSample> {
        self.in_flight += 1;
        std::mem::take(&mut self.samples)
    }
}

pub struct Collector {
    config: CollectorConfig,
    environment: PageEnvironment,
    transport: Arc<dyn Transport>,
    pending: Mutex<Pending>,
}

/// Set up collection for a page.
///
/// Returns `None` and logs a warning when the observation capability is
/// unavailable; the page then carries on without monitoring.
pub fn configure<S: VitalsSource>(
    config: CollectorConfig,
    environment: PageEnvironment,
    source: S,
    transport: Arc<dyn Transport>,
) -> Option<CollectorSession> {
    if !source.is_available() {
        tracing::warn!(
            page_id = %config.page_id,
            "Metrics observation unavailable -- CWV will not be collected"
        );
        return None;
    }

    tracing::info!(
        page_id = %config.page_id,
        site_id = %config.site_id,
        endpoint = %config.endpoint,
        batch_size = config.batch_size,
        flush_interval_ms = config.flush_interval.as_millis() as u64,
        "CWV collector configured"
    );

    let collector = Arc::new(Collector {
        config,
        environment,
        transport,
        pending: Mutex::new(Pending::default()),
    });

    Some(CollectorSession {
        collector,
        observations: source.subscribe(),
    })
}

impl Collector {
    pub async fn state(&self) -> CollectorState {
        let pending = self.pending.lock().await;
        if pending.in_flight > 0 {
            CollectorState::Flushing
        } else if pending.observed {
            CollectorState::Accumulating
        } else {
            CollectorState::Idle
        }
    }

    /// Number of samples waiting for the next flush.
    pub async fn pending_len(&self) -> usize {
        self.pending.lock().await.samples.len()
    }

    /// Record one observation. Delivers immediately once the batch is full.
    ///
    /// Observations that would fail server-side validation are dropped so
    /// they cannot poison the rest of the batch.
    pub async fn on_metric(&self, observation: Observation) {
        let sample = self.to_sample(observation);
        if let Err(e) = sample.validate() {
            tracing::warn!(error = %e, metric_id = %sample.id, "Dropping invalid observation");
            return;
        }

        let claimed = {
            let mut pending = self.pending.lock().await;
            pending.observed = true;
            pending.samples.push(sample);
            (pending.samples.len() >= self.config.batch_size).then(|| pending.claim())
        };

        if let Some(samples) = claimed {
            let outcome = self.deliver(samples).await;
            self.release().await;
            tracing::debug!(?outcome, "Full batch flushed");
        }
    }

    /// Claim the pending batch and make one delivery attempt.
    pub async fn flush(&self) -> FlushOutcome {
        let samples = {
            let mut pending = self.pending.lock().await;
            if pending.samples.is_empty() {
                return FlushOutcome::Empty;
            }
            pending.claim()
        };

        let outcome = self.deliver(samples).await;
        self.release().await;
        outcome
    }

    async fn release(&self) {
        let mut pending = self.pending.lock().await;
        pending.in_flight = pending.in_flight.saturating_sub(1);
    }

    fn to_sample(&self, observation: Observation) -> MetricSample {
        let value = round2(observation.value);
        let env = &self.environment;
        MetricSample {
            name: observation.name,
            value,
            rating: observation
                .rating
                .unwrap_or_else(|| Rating::classify(observation.name, value)),
            delta: round2(observation.delta.unwrap_or(observation.value)),
            id: observation.id,
            page_id: self.config.page_id.clone(),
            site_id: self.config.site_id.clone(),
            device_type: env.device_type(),
            connection_type: env.connection.clone(),
            timestamp: Utc::now().timestamp_millis(),
            url: env.url.clone(),
            navigation_type: env.navigation_type,
        }
    }

    /// Beacon first, keepalive second. Failures are logged, never returned.
    async fn deliver(&self, samples: Vec<MetricSample>) -> FlushOutcome {
        let count = samples.len();
        let batch = Batch {
            metrics: samples,
            meta: self.environment.meta(),
        };

        let body = match serde_json::to_string(&batch) {
            Ok(body) => body,
            Err(e) => {
                tracing::warn!(error = %e, samples = count, "Failed to serialize CWV batch");
                return FlushOutcome::Failed(count);
            }
        };

        let endpoint = self.config.endpoint.as_str();
        if self.transport.send_beacon(endpoint, &body) {
            tracing::debug!(samples = count, "CWV batch queued as beacon");
            return FlushOutcome::Beacon(count);
        }

        match self.transport.send_keepalive(endpoint, &body).await {
            Ok(()) => {
                tracing::debug!(samples = count, "CWV batch sent with keepalive");
                FlushOutcome::Keepalive(count)
            }
            Err(e) => {
                tracing::warn!(error = %e, samples = count, "CWV batch delivery failed, dropped");
                FlushOutcome::Failed(count)
            }
        }
    }
}

/// A configured collector together with its observation subscription.
pub struct CollectorSession {
    collector: Arc<Collector>,
    observations: mpsc::Receiver<Observation>,
}

impl CollectorSession {
    /// Shared handle for flushing or inspecting the collector while it runs.
    pub fn collector(&self) -> Arc<Collector> {
        Arc::clone(&self.collector)
    }

    /// Drive the collector until [`LifecycleEvent::Unload`] arrives or the
    /// lifecycle channel closes. A final flush always runs first.
    pub async fn run(self, mut lifecycle: mpsc::Receiver<LifecycleEvent>) {
        let Self {
            collector,
            mut observations,
        } = self;

        let period = collector.config.flush_interval;
        let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut observing = true;

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    let outcome = collector.flush().await;
                    if outcome != FlushOutcome::Empty {
                        tracing::debug!(?outcome, "Periodic flush");
                    }
                }
                obs = observations.recv(), if observing => match obs {
                    Some(obs) => collector.on_metric(obs).await,
                    None => {
                        tracing::debug!("Observation stream ended");
                        observing = false;
                    }
                },
                event = lifecycle.recv() => {
                    // Observations already handed over belong to this page.
                    while let Ok(obs) = observations.try_recv() {
                        collector.on_metric(obs).await;
                    }
                    let outcome = collector.flush().await;

                    match event {
                        Some(event) => {
                            tracing::debug!(?event, ?outcome, "Lifecycle flush");
                            if event.is_terminal() {
                                break;
                            }
                        }
                        None => {
                            tracing::debug!(?outcome, "Lifecycle channel closed");
                            break;
                        }
                    }
                }
            }
        }

        tracing::info!(page_id = %collector.config.page_id, "CWV collector stopped");
    }
}

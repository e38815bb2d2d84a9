//! Observation sources feeding the collector.
//!
//! A [`VitalsSource`] is the metrics-observation capability of the page. It
//! may be unavailable, in which case the collector stays inert.

use serde::{Deserialize, Serialize};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use vitals_core::vitals::{Rating, VitalName};

use crate::lifecycle::{LifecycleEvent, PageLifecycle};

const OBSERVATION_CHANNEL_CAPACITY: usize = 256;

/// One metric report as emitted by the observation capability.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    pub name: VitalName,
    pub value: f64,
    /// Classified from the value when absent.
    #[serde(default)]
    pub rating: Option<Rating>,
    /// Defaults to `value` for the first report of an instance.
    #[serde(default)]
    pub delta: Option<f64>,
    pub id: String,
}

impl Observation {
    pub fn new(name: VitalName, value: f64, id: impl Into<String>) -> Self {
        Self {
            name,
            value,
            rating: None,
            delta: None,
            id: id.into(),
        }
    }
}

/// The metrics-observation capability.
pub trait VitalsSource {
    /// Whether observations can be produced at all in this context.
    fn is_available(&self) -> bool;

    /// Start observing. The channel closes when the source is exhausted.
    fn subscribe(self) -> mpsc::Receiver<Observation>;
}

// ---------------------------------------------------------------------------
// Channel source
// ---------------------------------------------------------------------------

/// Source backed by an in-process channel, for embedding hosts and tests.
pub struct ChannelSource {
    rx: mpsc::Receiver<Observation>,
}

impl ChannelSource {
    pub fn new() -> (mpsc::Sender<Observation>, Self) {
        let (tx, rx) = mpsc::channel(OBSERVATION_CHANNEL_CAPACITY);
        (tx, Self { rx })
    }
}

impl VitalsSource for ChannelSource {
    fn is_available(&self) -> bool {
        true
    }

    fn subscribe(self) -> mpsc::Receiver<Observation> {
        self.rx
    }
}

// ---------------------------------------------------------------------------
// Stdin source
// ---------------------------------------------------------------------------

/// Reads newline-delimited JSON observations from standard input.
///
/// Unparseable lines are logged and skipped. End of input is reported as
/// [`LifecycleEvent::Unload`] after every parsed observation has been handed
/// over.
pub struct StdinSource {
    lifecycle: PageLifecycle,
}

impl StdinSource {
    pub fn new(lifecycle: PageLifecycle) -> Self {
        Self { lifecycle }
    }
}

impl VitalsSource for StdinSource {
    fn is_available(&self) -> bool {
        tokio::runtime::Handle::try_current().is_ok()
    }

    fn subscribe(self) -> mpsc::Receiver<Observation> {
        let (tx, rx) = mpsc::channel(OBSERVATION_CHANNEL_CAPACITY);
        let lifecycle = self.lifecycle;

        tokio::spawn(async move {
            let mut lines = BufReader::new(tokio::io::stdin()).lines();
            loop {
                match lines.next_line().await {
                    Ok(Some(line)) => {
                        let line = line.trim();
                        if line.is_empty() {
                            continue;
                        }
                        match serde_json::from_str::<Observation>(line) {
                            Ok(obs) => {
                                if tx.send(obs).await.is_err() {
                                    return;
                                }
                            }
                            Err(e) => {
                                tracing::warn!(
                                    error = %e,
                                    raw = %line,
                                    "Skipping malformed observation"
                                );
                            }
                        }
                    }
                    Ok(None) => {
                        tracing::info!("Observation input closed");
                        break;
                    }
                    Err(e) => {
                        tracing::error!(error = %e, "Failed to read observation input");
                        break;
                    }
                }
            }
            lifecycle.notify(LifecycleEvent::Unload).await;
        });

        rx
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn observation_parses_minimal_line() {
        let obs: Observation =
            serde_json::from_str(r#"{"name":"LCP","value":1234.5,"id":"v4-1"}"#).unwrap();
        assert_eq!(obs, Observation::new(VitalName::Lcp, 1234.5, "v4-1"));
    }

    #[test]
    fn observation_parses_full_line() {
        let obs: Observation = serde_json::from_str(
            r#"{"name":"CLS","value":0.3,"rating":"poor","delta":0.1,"id":"v4-2"}"#,
        )
        .unwrap();
        assert_eq!(obs.rating, Some(Rating::Poor));
        assert_eq!(obs.delta, Some(0.1));
    }
}

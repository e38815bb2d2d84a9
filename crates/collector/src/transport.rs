//! Delivery of serialized batches to the ingestion endpoint.
//!
//! Two modes mirror what a page can do while it is being torn down:
//!
//! - **beacon** -- queue the body and return at once; the send outlives the
//!   caller. Refusal is not an error, it just means "not queued".
//! - **keepalive** -- an awaited POST used when the beacon is refused.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use tokio_util::task::TaskTracker;

/// Largest body the beacon path will queue.
pub const MAX_BEACON_BYTES: usize = 64 * 1024;

/// HTTP request timeout for a single delivery attempt.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

// ---------------------------------------------------------------------------
// Error
// ---------------------------------------------------------------------------

/// Error type for keepalive delivery failures.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// The underlying HTTP request failed (network, DNS, timeout, etc.).
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The endpoint returned a non-2xx status code.
    #[error("Endpoint returned HTTP {0}")]
    HttpStatus(u16),
}

// ---------------------------------------------------------------------------
// Transport
// ---------------------------------------------------------------------------

#[async_trait]
pub trait Transport: Send + Sync {
    /// Queue `body` for fire-and-forget delivery. Returns whether it was
    /// queued.
    fn send_beacon(&self, endpoint: &str, body: &str) -> bool;

    /// POST `body` as JSON and wait for the response.
    async fn send_keepalive(&self, endpoint: &str, body: &str) -> Result<(), TransportError>;
}

// ---------------------------------------------------------------------------
// HttpTransport
// ---------------------------------------------------------------------------

/// [`Transport`] over `reqwest`.
///
/// Beacons run as tracked tasks on the current tokio runtime so the daemon
/// can [`drain`](Self::drain) them before exiting.
#[derive(Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
    beacons: TaskTracker,
}

impl HttpTransport {
    pub fn new() -> Result<Self, TransportError> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()?;
        Ok(Self {
            client,
            beacons: TaskTracker::new(),
        })
    }

    /// Wait up to `timeout` for queued beacons to finish.
    pub async fn drain(&self, timeout: Duration) {
        self.beacons.close();
        let pending = self.beacons.len();
        if tokio::time::timeout(timeout, self.beacons.wait()).await.is_err() {
            tracing::warn!(pending, "Beacons still in flight at shutdown");
        }
    }
}

#[async_trait]
impl Transport for HttpTransport {
    fn send_beacon(&self, endpoint: &str, body: &str) -> bool {
        if body.len() > MAX_BEACON_BYTES {
            tracing::debug!(bytes = body.len(), "Body exceeds beacon limit");
            return false;
        }
        if self.beacons.is_closed() {
            return false;
        }
        let Ok(handle) = tokio::runtime::Handle::try_current() else {
            return false;
        };

        let request = self
            .client
            .post(endpoint)
            .header(CONTENT_TYPE, "text/plain;charset=UTF-8")
            .body(body.to_owned());
        let endpoint = endpoint.to_owned();

        self.beacons.spawn_on(
            async move {
                match request.send().await {
                    Ok(resp) if !resp.status().is_success() => {
                        tracing::warn!(
                            endpoint = %endpoint,
                            status = resp.status().as_u16(),
                            "Beacon rejected by endpoint"
                        );
                    }
                    Ok(_) => {}
                    Err(e) => {
                        tracing::warn!(endpoint = %endpoint, error = %e, "Beacon delivery failed");
                    }
                }
            },
            &handle,
        );
        true
    }

    async fn send_keepalive(&self, endpoint: &str, body: &str) -> Result<(), TransportError> {
        let response = self
            .client
            .post(endpoint)
            .header(CONTENT_TYPE, "application/json")
            .body(body.to_owned())
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            Ok(())
        } else {
            Err(TransportError::HttpStatus(status.as_u16()))
        }
    }
}

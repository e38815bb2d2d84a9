//! Page lifecycle notifications that force a flush.

use tokio::sync::mpsc;

const LIFECYCLE_CHANNEL_CAPACITY: usize = 16;

/// A page lifecycle transition that forces a flush.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleEvent {
    /// Page became hidden (tab switch, minimize).
    Hidden,
    /// Page is being torn down.
    Unload,
    /// Page is being frozen by the host.
    Freeze,
}

impl LifecycleEvent {
    /// Whether the collector stops after handling this event.
    pub fn is_terminal(self) -> bool {
        matches!(self, LifecycleEvent::Unload)
    }
}

/// Sending half of the lifecycle subscription. Cheap to clone.
#[derive(Debug, Clone)]
pub struct PageLifecycle {
    tx: mpsc::Sender<LifecycleEvent>,
}

impl PageLifecycle {
    /// Create a lifecycle handle and the receiver a collector session runs on.
    pub fn channel() -> (Self, mpsc::Receiver<LifecycleEvent>) {
        let (tx, rx) = mpsc::channel(LIFECYCLE_CHANNEL_CAPACITY);
        (Self { tx }, rx)
    }

    /// Deliver an event. Returns `false` once the collector has stopped.
    pub async fn notify(&self, event: LifecycleEvent) -> bool {
        self.tx.send(event).await.is_ok()
    }
}

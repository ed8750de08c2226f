//! Broadcast of signal changes

use rules_core::SignalChange;
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::trace;

/// Default channel capacity for change subscriptions
const DEFAULT_CHANNEL_CAPACITY: usize = 1024;

/// Fan-out of [`SignalChange`] notifications to every subscriber
pub struct SignalBus {
    sender: broadcast::Sender<SignalChange>,
}

impl SignalBus {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CHANNEL_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SignalChange> {
        self.sender.subscribe()
    }

    /// Publish a change to all current subscribers
    pub fn publish(&self, change: SignalChange) {
        trace!(signal = %change.signal, new = %change.new, "Publishing signal change");
        // No receivers is fine: nothing is watching yet
        let _ = self.sender.send(change);
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for SignalBus {
    fn default() -> Self {
        Self::new()
    }
}

/// Thread-safe wrapper for SignalBus
pub type SharedSignalBus = Arc<SignalBus>;

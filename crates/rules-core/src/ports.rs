//! Capabilities the rules consume from the host

use std::fmt;
use std::time::Duration;

use crate::{SignalId, SignalValue};

/// Read access to the host's current signal values
pub trait SignalSource: Send + Sync {
    /// Current value of a signal; signals the host does not know read as
    /// [`SignalValue::Unavailable`]
    fn get_signal_value(&self, id: &SignalId) -> SignalValue;
}

/// Handle of a scheduled timer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimerId(u64);

impl TimerId {
    pub fn new(raw: u64) -> Self {
        Self(raw)
    }

    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for TimerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "timer#{}", self.0)
    }
}

/// Cancellable one-shot and repeating timers
///
/// Firings are delivered back to whoever scheduled them through the
/// runtime's event loop, never concurrently with other deliveries.
pub trait Scheduler: Send + Sync {
    fn schedule_once(&self, delay: Duration) -> TimerId;

    fn schedule_every(&self, interval: Duration) -> TimerId;

    /// Cancel a pending timer; returns false if it already fired or was
    /// never scheduled
    fn cancel(&self, timer: TimerId) -> bool;
}

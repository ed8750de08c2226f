//! Current signal values

use dashmap::DashMap;
use rules_core::{Clock, Signal, SignalChange, SignalId, SignalSource, SignalValue};
use std::sync::Arc;
use tracing::{debug, instrument};

use crate::SignalBus;

/// The signal store tracks the latest value of every signal
///
/// Every write publishes a [`SignalChange`] on the bus, including writes that
/// repeat the current value; consumers decide whether a repeat matters.
pub struct SignalStore {
    signals: DashMap<SignalId, Signal>,
    bus: Arc<SignalBus>,
    clock: Arc<dyn Clock>,
}

impl SignalStore {
    pub fn new(bus: Arc<SignalBus>, clock: Arc<dyn Clock>) -> Self {
        Self {
            signals: DashMap::new(),
            bus,
            clock,
        }
    }

    /// Write a signal value and publish the change
    #[instrument(skip(self, value), fields(signal = %id))]
    pub fn set(&self, id: SignalId, value: impl Into<SignalValue>) -> Signal {
        let value = value.into();
        let now = self.clock.now();

        let old = self.signals.get(&id).map(|s| s.clone());
        let signal = match &old {
            Some(existing) => existing.with_update(value, now),
            None => Signal::new(id.clone(), value, now),
        };

        debug!(
            value = %signal.value,
            changed = old.as_ref().map(|s| s.value != signal.value).unwrap_or(true),
            "Setting signal value"
        );

        self.signals.insert(id.clone(), signal.clone());

        self.bus.publish(SignalChange {
            signal: id,
            old: old.map(|s| s.value),
            new: signal.value.clone(),
            time: now,
        });

        signal
    }

    pub fn get(&self, id: &SignalId) -> Option<Signal> {
        self.signals.get(id).map(|s| s.clone())
    }

    pub fn len(&self) -> usize {
        self.signals.len()
    }

    pub fn is_empty(&self) -> bool {
        self.signals.is_empty()
    }
}

impl SignalSource for SignalStore {
    fn get_signal_value(&self, id: &SignalId) -> SignalValue {
        self.signals
            .get(id)
            .map(|s| s.value.clone())
            .unwrap_or(SignalValue::Unavailable)
    }
}

/// Thread-safe wrapper for SignalStore
pub type SharedSignalStore = Arc<SignalStore>;

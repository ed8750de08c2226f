//! The trait every rule implements

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rules_core::{RuleError, RuleResult, Scheduler, SignalChange, SignalId, SignalSource, TimerId};
use tracing::{debug, warn};

/// What a monitor can reach while handling one event
pub struct MonitorContext<'a> {
    pub signals: &'a dyn SignalSource,
    /// Timers armed here are delivered back to the same monitor
    pub timers: &'a dyn Scheduler,
    pub now: DateTime<Utc>,
}

/// A reactive rule driven by signal changes and its own timers
///
/// The runtime delivers events one at a time, so implementations keep their
/// state in plain fields.
#[async_trait]
pub trait Monitor: Send {
    fn name(&self) -> &str;

    /// Signals whose changes are delivered to [`Monitor::on_signal_changed`]
    fn watched_signals(&self) -> Vec<SignalId>;

    /// Called once before any other event; arms the initial timers
    async fn start(&mut self, ctx: &MonitorContext<'_>) -> RuleResult<()>;

    async fn on_signal_changed(
        &mut self,
        change: &SignalChange,
        ctx: &MonitorContext<'_>,
    ) -> RuleResult<()>;

    async fn on_timer(&mut self, timer: TimerId, ctx: &MonitorContext<'_>) -> RuleResult<()>;
}

/// Log a rule error at the level its kind deserves
pub fn report(monitor: &str, error: &RuleError) {
    if error.is_expected() {
        debug!(monitor, %error, "Evaluation skipped");
    } else {
        warn!(monitor, %error, "Evaluation failed");
    }
}

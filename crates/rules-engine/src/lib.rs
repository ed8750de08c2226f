//! Home rules engine
//!
//! This crate provides the monitors and the loop that drives them:
//! - [`evaluator`]: pure threshold, slack and staleness decisions
//! - [`ActionDispatcher`]: stop/resume control of the EV charger
//! - [`PhaseCurrentAlert`], [`ChargeController`], [`SensorWatch`]: the rules
//! - [`Runtime`]: serial delivery of signal changes and timer firings
//!
//! Monitors only see the host through the ports in `rules-core`, so they run
//! the same against the in-process host and against test fakes.

pub mod evaluator;

mod dispatcher;
mod monitor;
mod monitors;
mod runtime;
mod setup;
mod timers;

pub use dispatcher::{ActionDispatcher, ActionState};
pub use monitor::{report, Monitor, MonitorContext};
pub use monitors::{ChargeController, Phase, PhaseCurrentAlert, SensorWatch};
pub use runtime::Runtime;
pub use setup::build_monitors;
pub use timers::{OwnerId, ScopedScheduler, TimerQueue};

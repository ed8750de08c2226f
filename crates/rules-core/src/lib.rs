//! Core types for home rules
//!
//! This crate provides the types shared by every other crate in the
//! workspace: the signal model (SignalId, SignalValue, Signal, SignalChange),
//! references to host services, the ports the rules depend on, the clock
//! abstraction, and the rule error taxonomy.

mod clock;
mod error;
mod ports;
mod service;
mod signal;

pub use clock::{Clock, MockClock, SystemClock};
pub use error::{RuleError, RuleResult};
pub use ports::{Scheduler, SignalSource, TimerId};
pub use service::{ServiceCaller, ServiceError, ServiceRef, ServiceRefError};
pub use signal::{Signal, SignalChange, SignalId, SignalIdError, SignalValue};

/// State value the host reports before a signal was ever read
pub const STATE_UNKNOWN: &str = "unknown";

/// State value the host reports when a device stopped responding
pub const STATE_UNAVAILABLE: &str = "unavailable";

/// State of a switch-like device that is running
pub const STATE_ON: &str = "on";

/// State of a switch-like device that is stopped
pub const STATE_OFF: &str = "off";

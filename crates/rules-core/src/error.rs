//! Error taxonomy shared by all monitors

use thiserror::Error;

use crate::{ServiceRef, SignalId};

/// Result type for monitor operations
pub type RuleResult<T> = Result<T, RuleError>;

/// Errors a monitor can report for one evaluation
///
/// None of these stop the event loop. They are logged by the runtime and
/// scoped to the monitor (or signal) that produced them.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum RuleError {
    /// The signal reads `unknown`/`unavailable` or is not numeric; decisions
    /// depending on it are skipped for this cycle
    #[error("signal {signal} is unavailable")]
    SignalUnavailable { signal: SignalId },

    /// A required parameter is missing or malformed; the affected monitor
    /// does not start
    #[error("invalid configuration for '{key}': {reason}")]
    InvalidConfiguration { key: String, reason: String },

    /// A control call was rejected; state is left unchanged
    #[error("control action {service} failed: {reason}")]
    ActionInvocationFailed { service: ServiceRef, reason: String },

    /// The message could not be delivered; throttle state is left unchanged
    #[error("notification send failed: {reason}")]
    NotificationSendFailed { reason: String },
}

impl RuleError {
    /// Errors that are part of normal operation and only worth a debug log
    pub fn is_expected(&self) -> bool {
        matches!(self, Self::SignalUnavailable { .. })
    }
}

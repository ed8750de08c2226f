//! Stop/resume control of one resource
//!
//! The dispatcher owns the `Idle`/`Suppressed` state of a controlled
//! resource (the EV charger). It calls the stop service at most once per
//! suppression episode and steps back to `Idle` without any call when it
//! sees the resource being operated by someone else.

use rules_core::{RuleError, RuleResult, ServiceCaller, ServiceRef, SignalValue};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionState {
    /// No action of ours is in effect
    Idle,
    /// We stopped the resource and have not seen it changed externally
    Suppressed,
}

impl fmt::Display for ActionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Idle => f.write_str("idle"),
            Self::Suppressed => f.write_str("suppressed"),
        }
    }
}

pub struct ActionDispatcher {
    caller: Arc<dyn ServiceCaller>,
    stop: ServiceRef,
    resume: ServiceRef,
    params: serde_json::Value,
    state: ActionState,
    /// Set by a successful stop until the resource reports `off` once
    awaiting_off: bool,
}

impl ActionDispatcher {
    pub fn new(
        caller: Arc<dyn ServiceCaller>,
        stop: ServiceRef,
        resume: ServiceRef,
        params: serde_json::Value,
    ) -> Self {
        Self {
            caller,
            stop,
            resume,
            params,
            state: ActionState::Idle,
            awaiting_off: false,
        }
    }

    pub fn state(&self) -> ActionState {
        self.state
    }

    /// Call the stop service and enter `Suppressed`
    ///
    /// Returns `Ok(false)` without calling anything when already suppressed.
    pub async fn suppress(&mut self) -> RuleResult<bool> {
        if self.state == ActionState::Suppressed {
            debug!(service = %self.stop, "Already suppressed, not stopping again");
            return Ok(false);
        }

        self.invoke(&self.stop).await?;
        self.state = ActionState::Suppressed;
        self.awaiting_off = true;
        info!(service = %self.stop, "Resource suppressed");
        Ok(true)
    }

    /// Call the resume service and return to `Idle`
    ///
    /// Returns `Ok(false)` without calling anything when idle.
    pub async fn release(&mut self) -> RuleResult<bool> {
        if self.state == ActionState::Idle {
            return Ok(false);
        }

        self.invoke(&self.resume).await?;
        self.state = ActionState::Idle;
        self.awaiting_off = false;
        info!(service = %self.resume, "Resource released");
        Ok(true)
    }

    /// Track an on/off change of the controlled resource
    ///
    /// Returns true when the change cleared the suppression.
    pub fn observe_resource(&mut self, old: Option<&SignalValue>, new: &SignalValue) -> bool {
        if self.state != ActionState::Suppressed {
            return false;
        }
        if !(new.is_on() || new.is_off()) {
            return false;
        }
        if old.is_some_and(|old| old == new) {
            return false;
        }

        if self.awaiting_off && new.is_off() {
            debug!("Resource turned off after our stop");
            self.awaiting_off = false;
            return false;
        }

        info!(new = %new, "Resource changed externally, clearing suppression");
        self.state = ActionState::Idle;
        self.awaiting_off = false;
        true
    }

    async fn invoke(&self, service: &ServiceRef) -> RuleResult<()> {
        self.caller
            .call_service(service, self.params.clone())
            .await
            .map_err(|e| {
                warn!(service = %service, error = %e, "Control action failed");
                RuleError::ActionInvocationFailed {
                    service: service.clone(),
                    reason: e.to_string(),
                }
            })
    }
}

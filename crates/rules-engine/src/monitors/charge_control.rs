use async_trait::async_trait;
use rules_config::ChargeControlConfig;
use rules_core::{RuleError, RuleResult, ServiceCaller, SignalChange, SignalId, SignalValue, TimerId};
use rules_notify::{AlertKind, ThrottleKey, ThrottledNotifier};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

use super::{amps, send_failed, service_notifier, Phase};
use crate::dispatcher::{ActionDispatcher, ActionState};
use crate::evaluator::{can_resume, min_slack, overload, SlackStatus};
use crate::monitor::{report, Monitor, MonitorContext};

const THROTTLE_SUBJECT: &str = "charge_control";

/// Stops EV charging on phase overload and resumes it once every phase has
/// enough headroom again
pub struct ChargeController {
    phases: Vec<Phase>,
    charging_sensor: SignalId,
    dispatcher: ActionDispatcher,
    notifier: ThrottledNotifier,
    required_slack: f64,
    resume_check_interval: Duration,
    poll: Option<TimerId>,
}

impl ChargeController {
    pub fn new(
        phases: Vec<Phase>,
        charging_sensor: SignalId,
        dispatcher: ActionDispatcher,
        notifier: ThrottledNotifier,
        required_slack: f64,
        resume_check_interval: Duration,
    ) -> Self {
        Self {
            phases,
            charging_sensor,
            dispatcher,
            notifier,
            required_slack,
            resume_check_interval,
            poll: None,
        }
    }

    pub fn from_config(config: &ChargeControlConfig, caller: Arc<dyn ServiceCaller>) -> Self {
        let phases = config
            .phases
            .iter()
            .map(|phase| Phase::from_config(phase, config.overload_margin))
            .collect();
        let params = match &config.device_id {
            Some(device_id) => json!({ "device_id": device_id }),
            None => json!({}),
        };
        let dispatcher = ActionDispatcher::new(
            caller.clone(),
            config.stop_service.clone(),
            config.start_service.clone(),
            params,
        );
        let notifier = service_notifier(
            caller,
            config.notification_service.clone(),
            config.notification_interval,
        );
        Self::new(
            phases,
            config.charging_sensor.clone(),
            dispatcher,
            notifier,
            config.required_slack,
            config.resume_check_interval,
        )
    }

    pub fn state(&self) -> ActionState {
        self.dispatcher.state()
    }

    fn key(kind: AlertKind) -> ThrottleKey {
        ThrottleKey::new(THROTTLE_SUBJECT, kind)
    }

    /// Stop charging if `value` overloads the phase at `index`
    ///
    /// Returns true when charging was stopped.
    async fn check_overload(
        &mut self,
        index: usize,
        value: &SignalValue,
        ctx: &MonitorContext<'_>,
    ) -> RuleResult<bool> {
        if self.dispatcher.state() != ActionState::Idle {
            return Ok(false);
        }

        let phase = &self.phases[index];
        if value.as_number().is_none() {
            return Err(RuleError::SignalUnavailable {
                signal: phase.signal.clone(),
            });
        }
        let Some(excess) = overload(value, &phase.threshold) else {
            return Ok(false);
        };

        if !ctx.signals.get_signal_value(&self.charging_sensor).is_on() {
            debug!(phase = %phase.label, excess, "Phase overloaded but not charging");
            return Ok(false);
        }

        let current = phase.threshold.limit + excess;
        let message = format!(
            "🔌 Charging stopped: {} current reached {:.1}A (threshold: {}A + {}A). \
             Charging will resume when load decreases.",
            phase.label,
            current,
            amps(phase.threshold.limit),
            amps(phase.threshold.overload_margin)
        );
        info!(phase = %phase.label, current, "Phase overloaded, stopping charging");

        if !self.dispatcher.suppress().await? {
            return Ok(false);
        }
        self.notifier
            .notify(Self::key(AlertKind::ChargeStopped), &message, ctx.now)
            .await
            .map_err(send_failed)?;
        Ok(true)
    }

    async fn check_all_overloads(&mut self, ctx: &MonitorContext<'_>) {
        for index in 0..self.phases.len() {
            let value = ctx.signals.get_signal_value(&self.phases[index].signal);
            match self.check_overload(index, &value, ctx).await {
                Ok(true) => break,
                Ok(false) => {}
                Err(e) => report(self.name(), &e),
            }
        }
    }

    async fn check_resume(&mut self, ctx: &MonitorContext<'_>) -> RuleResult<()> {
        if ctx.signals.get_signal_value(&self.charging_sensor).is_on() {
            debug!("Charger already on, skipping resume check");
            return Ok(());
        }

        let values: Vec<SignalValue> = self
            .phases
            .iter()
            .map(|p| ctx.signals.get_signal_value(&p.signal))
            .collect();
        let status = min_slack(values.iter().zip(self.phases.iter().map(|p| &p.threshold)));

        let available = match status {
            SlackStatus::Available(available) => available,
            SlackStatus::Unavailable => {
                let signal = self
                    .phases
                    .iter()
                    .zip(&values)
                    .find(|(_, value)| value.as_number().is_none())
                    .map(|(phase, _)| phase.signal.clone())
                    .unwrap_or_else(|| self.charging_sensor.clone());
                return Err(RuleError::SignalUnavailable { signal });
            }
        };

        if !can_resume(status, self.required_slack) {
            debug!(available, required = self.required_slack, "Not enough headroom to resume");
            return Ok(());
        }

        if self.dispatcher.release().await? {
            let message = format!(
                "⚡ Charging resumed: Available current is now {:.1}A (minimum required: {}A).",
                available,
                amps(self.required_slack)
            );
            info!(available, "Headroom restored, resuming charging");
            self.notifier
                .notify(Self::key(AlertKind::ChargeResumed), &message, ctx.now)
                .await
                .map_err(send_failed)?;
        }
        Ok(())
    }
}

#[async_trait]
impl Monitor for ChargeController {
    fn name(&self) -> &str {
        "charge_control"
    }

    fn watched_signals(&self) -> Vec<SignalId> {
        let mut signals: Vec<SignalId> = self.phases.iter().map(|p| p.signal.clone()).collect();
        signals.push(self.charging_sensor.clone());
        signals
    }

    async fn start(&mut self, ctx: &MonitorContext<'_>) -> RuleResult<()> {
        self.poll = Some(ctx.timers.schedule_every(self.resume_check_interval));
        Ok(())
    }

    async fn on_signal_changed(
        &mut self,
        change: &SignalChange,
        ctx: &MonitorContext<'_>,
    ) -> RuleResult<()> {
        if change.signal == self.charging_sensor {
            self.dispatcher.observe_resource(change.old.as_ref(), &change.new);
            return Ok(());
        }

        match self.phases.iter().position(|p| p.signal == change.signal) {
            Some(index) => self.check_overload(index, &change.new, ctx).await.map(|_| ()),
            None => Ok(()),
        }
    }

    async fn on_timer(&mut self, timer: TimerId, ctx: &MonitorContext<'_>) -> RuleResult<()> {
        if self.poll != Some(timer) {
            debug!(%timer, "Ignoring unknown timer");
            return Ok(());
        }

        match self.dispatcher.state() {
            ActionState::Idle => {
                self.check_all_overloads(ctx).await;
                Ok(())
            }
            ActionState::Suppressed => self.check_resume(ctx).await,
        }
    }
}

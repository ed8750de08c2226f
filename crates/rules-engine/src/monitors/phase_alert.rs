use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rules_config::PhaseAlertConfig;
use rules_core::{RuleError, RuleResult, ServiceCaller, SignalChange, SignalId, SignalValue, TimerId};
use rules_notify::{AlertKind, ThrottleKey, ThrottledNotifier};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

use super::{amps, send_failed, service_notifier, Phase};
use crate::evaluator::{evaluate, ThresholdStatus};
use crate::monitor::{report, Monitor, MonitorContext};

/// Notifies whenever a phase current is at or above its limit
///
/// Reacts to every phase change and also polls all phases every
/// `check_interval`. Notifications are throttled per phase.
pub struct PhaseCurrentAlert {
    phases: Vec<Phase>,
    notifier: ThrottledNotifier,
    check_interval: Duration,
    poll: Option<TimerId>,
}

impl PhaseCurrentAlert {
    pub fn new(phases: Vec<Phase>, notifier: ThrottledNotifier, check_interval: Duration) -> Self {
        Self {
            phases,
            notifier,
            check_interval,
            poll: None,
        }
    }

    pub fn from_config(config: &PhaseAlertConfig, caller: Arc<dyn ServiceCaller>) -> Self {
        let phases = config
            .phases
            .iter()
            .map(|phase| Phase::from_config(phase, 0.0))
            .collect();
        let notifier = service_notifier(
            caller,
            config.notification_service.clone(),
            config.notification_interval,
        );
        Self::new(phases, notifier, config.check_interval)
    }

    async fn check_phase(
        &mut self,
        index: usize,
        value: &SignalValue,
        now: DateTime<Utc>,
    ) -> RuleResult<()> {
        let phase = &self.phases[index];
        match evaluate(value, &phase.threshold) {
            ThresholdStatus::Below => Ok(()),
            ThresholdStatus::Unavailable => Err(RuleError::SignalUnavailable {
                signal: phase.signal.clone(),
            }),
            ThresholdStatus::Exceeded => {
                let current = value.as_number().unwrap_or_default();
                let message = format!(
                    "⚠️ High Current Alert: {} is at {:.1}A (threshold: {}A). \
                     Please reduce load to avoid tripping the breaker.",
                    phase.label,
                    current,
                    amps(phase.threshold.limit)
                );
                let key = ThrottleKey::new(phase.signal.as_str(), AlertKind::ThresholdExceeded);
                info!(phase = %phase.label, current, limit = phase.threshold.limit, "Phase current over limit");
                self.notifier
                    .notify(key, &message, now)
                    .await
                    .map(|_| ())
                    .map_err(send_failed)
            }
        }
    }

    async fn check_all(&mut self, ctx: &MonitorContext<'_>) {
        for index in 0..self.phases.len() {
            let value = ctx.signals.get_signal_value(&self.phases[index].signal);
            if let Err(e) = self.check_phase(index, &value, ctx.now).await {
                report(self.name(), &e);
            }
        }
    }
}

#[async_trait]
impl Monitor for PhaseCurrentAlert {
    fn name(&self) -> &str {
        "phase_current_alert"
    }

    fn watched_signals(&self) -> Vec<SignalId> {
        self.phases.iter().map(|p| p.signal.clone()).collect()
    }

    async fn start(&mut self, ctx: &MonitorContext<'_>) -> RuleResult<()> {
        self.poll = Some(ctx.timers.schedule_every(self.check_interval));
        self.check_all(ctx).await;
        Ok(())
    }

    async fn on_signal_changed(
        &mut self,
        change: &SignalChange,
        ctx: &MonitorContext<'_>,
    ) -> RuleResult<()> {
        match self.phases.iter().position(|p| p.signal == change.signal) {
            Some(index) => self.check_phase(index, &change.new, ctx.now).await,
            None => Ok(()),
        }
    }

    async fn on_timer(&mut self, timer: TimerId, ctx: &MonitorContext<'_>) -> RuleResult<()> {
        if self.poll != Some(timer) {
            debug!(%timer, "Ignoring unknown timer");
            return Ok(());
        }
        self.check_all(ctx).await;
        Ok(())
    }
}

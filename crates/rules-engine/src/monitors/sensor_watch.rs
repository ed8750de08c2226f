use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rules_config::SensorWatchConfig;
use rules_core::{RuleResult, ServiceCaller, SignalChange, SignalId, SignalValue, TimerId};
use rules_notify::{escape_markdown_v2, Messenger, ServiceMessenger};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

use super::{minutes, send_failed};
use crate::evaluator::{check_staleness, Staleness};
use crate::monitor::{Monitor, MonitorContext};

/// Value and time of the last observed real change
#[derive(Debug, Clone)]
struct Snapshot {
    value: SignalValue,
    taken: DateTime<Utc>,
}

/// Alerts when one sensor stops changing or stays unavailable
///
/// The same-value check repeats every `check_interval` for as long as the
/// value stays the same. The unavailability alert fires once per outage,
/// after the grace period. The timers already pace both alerts, so messages
/// go straight to the messenger without a throttle.
pub struct SensorWatch {
    name: String,
    sensor: SignalId,
    friendly_name: String,
    check_interval: Duration,
    same_value_check_enabled: bool,
    grace_period: Duration,
    messenger: Arc<dyn Messenger>,
    snapshot: Option<Snapshot>,
    stale_timer: Option<TimerId>,
    unavailable_timer: Option<TimerId>,
}

impl SensorWatch {
    pub fn new(config: &SensorWatchConfig, messenger: Arc<dyn Messenger>) -> Self {
        Self {
            name: format!("sensor_watch:{}", config.sensor),
            sensor: config.sensor.clone(),
            friendly_name: config.friendly_name.clone(),
            check_interval: config.check_interval,
            same_value_check_enabled: config.same_value_check_enabled,
            grace_period: config.unavailability_grace_period,
            messenger,
            snapshot: None,
            stale_timer: None,
            unavailable_timer: None,
        }
    }

    pub fn from_config(config: &SensorWatchConfig, caller: Arc<dyn ServiceCaller>) -> Self {
        let messenger = ServiceMessenger::new(caller, config.notification_service.clone());
        Self::new(config, Arc::new(messenger))
    }

    async fn send(&self, message: &str) -> RuleResult<()> {
        self.messenger
            .send_message(&escape_markdown_v2(message))
            .await
            .map_err(send_failed)
    }

    fn restart_same_value_check(&mut self, value: SignalValue, ctx: &MonitorContext<'_>) {
        if !self.same_value_check_enabled {
            return;
        }
        if let Some(timer) = self.stale_timer.take() {
            ctx.timers.cancel(timer);
        }
        self.snapshot = Some(Snapshot {
            value,
            taken: ctx.now,
        });
        self.stale_timer = Some(ctx.timers.schedule_once(self.check_interval));
    }

    fn arm_unavailability(&mut self, ctx: &MonitorContext<'_>) {
        if self.unavailable_timer.is_none() {
            debug!(sensor = %self.sensor, "Sensor unavailable, starting grace period");
            self.unavailable_timer = Some(ctx.timers.schedule_once(self.grace_period));
        }
    }

    async fn same_value_check(&mut self, ctx: &MonitorContext<'_>) -> RuleResult<()> {
        let current = ctx.signals.get_signal_value(&self.sensor);
        let Some(snapshot) = self.snapshot.clone() else {
            self.restart_same_value_check(current, ctx);
            return Ok(());
        };

        let elapsed = (ctx.now - snapshot.taken).to_std().unwrap_or_default();
        let outcome = check_staleness(&current, &snapshot.value, elapsed, self.check_interval);
        self.stale_timer = Some(ctx.timers.schedule_once(self.check_interval));

        match outcome {
            Staleness::Stale => {
                let message = format!(
                    "{} sensor value has not changed for {} minutes.",
                    self.friendly_name,
                    minutes(self.check_interval)
                );
                info!(sensor = %self.sensor, value = %current, "Sensor value unchanged");
                self.send(&message).await
            }
            Staleness::Changed => {
                self.snapshot = Some(Snapshot {
                    value: current,
                    taken: ctx.now,
                });
                Ok(())
            }
            Staleness::Unavailable | Staleness::Pending => Ok(()),
        }
    }

    async fn unavailability_check(&mut self, ctx: &MonitorContext<'_>) -> RuleResult<()> {
        self.unavailable_timer = None;
        if !ctx.signals.get_signal_value(&self.sensor).is_unavailable() {
            return Ok(());
        }

        let message = format!(
            "{} sensor is unavailable for {} minutes.",
            self.friendly_name,
            minutes(self.grace_period)
        );
        info!(sensor = %self.sensor, "Sensor unavailable past grace period");
        self.send(&message).await
    }
}

#[async_trait]
impl Monitor for SensorWatch {
    fn name(&self) -> &str {
        &self.name
    }

    fn watched_signals(&self) -> Vec<SignalId> {
        vec![self.sensor.clone()]
    }

    async fn start(&mut self, ctx: &MonitorContext<'_>) -> RuleResult<()> {
        let current = ctx.signals.get_signal_value(&self.sensor);
        if current.is_unavailable() {
            self.arm_unavailability(ctx);
        }
        self.restart_same_value_check(current, ctx);
        Ok(())
    }

    async fn on_signal_changed(
        &mut self,
        change: &SignalChange,
        ctx: &MonitorContext<'_>,
    ) -> RuleResult<()> {
        if change.signal != self.sensor {
            return Ok(());
        }

        if change.new.is_unavailable() {
            self.arm_unavailability(ctx);
            return Ok(());
        }

        if let Some(timer) = self.unavailable_timer.take() {
            debug!(sensor = %self.sensor, "Sensor available again");
            ctx.timers.cancel(timer);
        }
        self.restart_same_value_check(change.new.clone(), ctx);
        Ok(())
    }

    async fn on_timer(&mut self, timer: TimerId, ctx: &MonitorContext<'_>) -> RuleResult<()> {
        if self.stale_timer == Some(timer) {
            self.same_value_check(ctx).await
        } else if self.unavailable_timer == Some(timer) {
            self.unavailability_check(ctx).await
        } else {
            debug!(%timer, "Ignoring unknown timer");
            Ok(())
        }
    }
}

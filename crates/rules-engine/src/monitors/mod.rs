//! Concrete monitors

mod charge_control;
mod phase_alert;
mod sensor_watch;

pub use charge_control::ChargeController;
pub use phase_alert::PhaseCurrentAlert;
pub use sensor_watch::SensorWatch;

use crate::evaluator::ThresholdConfig;
use rules_config::PhaseConfig;
use rules_core::{RuleError, ServiceCaller, ServiceRef, SignalId};
use rules_notify::{NotifyError, ServiceMessenger, ThrottledNotifier};
use std::sync::Arc;
use std::time::Duration;

/// One mains phase as a monitor sees it
#[derive(Debug, Clone, PartialEq)]
pub struct Phase {
    pub label: String,
    pub signal: SignalId,
    pub threshold: ThresholdConfig,
}

impl Phase {
    pub fn new(label: impl Into<String>, signal: SignalId, threshold: ThresholdConfig) -> Self {
        Self {
            label: label.into(),
            signal,
            threshold,
        }
    }

    pub(crate) fn from_config(config: &PhaseConfig, overload_margin: f64) -> Self {
        Self::new(
            config.name.clone(),
            config.sensor.clone(),
            ThresholdConfig {
                limit: config.limit,
                overload_margin,
            },
        )
    }
}

pub(crate) fn service_notifier(
    caller: Arc<dyn ServiceCaller>,
    service: ServiceRef,
    min_interval: Duration,
) -> ThrottledNotifier {
    ThrottledNotifier::new(Arc::new(ServiceMessenger::new(caller, service)), min_interval)
}

pub(crate) fn send_failed(error: NotifyError) -> RuleError {
    RuleError::NotificationSendFailed {
        reason: error.to_string(),
    }
}

pub(crate) fn minutes(interval: Duration) -> u64 {
    interval.as_secs() / 60
}

/// Amps as shown in messages: whole numbers keep one decimal (`16.0`)
pub(crate) fn amps(value: f64) -> String {
    if value.is_finite() && value.fract() == 0.0 {
        format!("{value:.1}")
    } else {
        format!("{value}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_amps_formatting() {
        assert_eq!(amps(16.0), "16.0");
        assert_eq!(amps(4.0), "4.0");
        assert_eq!(amps(6.5), "6.5");
        assert_eq!(amps(0.25), "0.25");
    }

    #[test]
    fn test_minutes_rounds_down() {
        assert_eq!(minutes(Duration::from_secs(1800)), 30);
        assert_eq!(minutes(Duration::from_secs(90)), 1);
    }
}

//! Building monitors from a loaded configuration

use rules_config::RulesConfig;
use rules_core::ServiceCaller;
use std::sync::Arc;
use tracing::info;

use crate::monitor::Monitor;
use crate::monitors::{minutes, ChargeController, PhaseCurrentAlert, SensorWatch};

/// Create one monitor per configured section (and per watched sensor)
pub fn build_monitors(config: &RulesConfig, caller: Arc<dyn ServiceCaller>) -> Vec<Box<dyn Monitor>> {
    let mut monitors: Vec<Box<dyn Monitor>> = Vec::new();

    if let Some(alert) = &config.phase_alert {
        for phase in &alert.phases {
            info!(phase = %phase.name, sensor = %phase.sensor, limit = phase.limit, "Phase current threshold");
        }
        monitors.push(Box::new(PhaseCurrentAlert::from_config(alert, caller.clone())));
    }

    if let Some(charge) = &config.charge_control {
        info!(
            charging_sensor = %charge.charging_sensor,
            overload_margin = charge.overload_margin,
            required_slack = charge.required_slack,
            "Charge control configured"
        );
        monitors.push(Box::new(ChargeController::from_config(charge, caller.clone())));
    }

    for sensor in &config.sensor_watch {
        info!(
            sensor = %sensor.sensor,
            check_interval_minutes = minutes(sensor.check_interval),
            same_value_check = sensor.same_value_check_enabled,
            "Watching sensor"
        );
        monitors.push(Box::new(SensorWatch::from_config(sensor, caller.clone())));
    }

    monitors
}

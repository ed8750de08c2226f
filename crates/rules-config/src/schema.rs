//! Validated configuration types and the raw YAML shapes they come from

use rules_core::{ServiceRef, SignalId};
use serde::Deserialize;
use std::time::Duration;

/// Notify target used when a section does not name one
pub const DEFAULT_NOTIFICATION_SERVICE: &str = "notify/mobile_app";

/// Notify target for sensor watch alerts when neither the section nor the
/// document names one
pub const DEFAULT_SENSOR_WATCH_NOTIFICATION_SERVICE: &str = "notify/soulphone";

/// Minimum seconds between two notifications for the same condition
pub const DEFAULT_NOTIFICATION_INTERVAL_SECS: u64 = 60;

/// Amps above the limit a phase may reach before charging is stopped
pub const DEFAULT_OVERLOAD_MARGIN: f64 = 4.0;

/// Amps of headroom every phase needs before charging resumes
pub const DEFAULT_REQUIRED_SLACK: f64 = 6.0;

/// Seconds between resume checks of the charge controller
pub const DEFAULT_RESUME_CHECK_INTERVAL_SECS: u64 = 60;

/// Seconds a watched sensor may keep the same value (6 hours)
pub const DEFAULT_CHECK_INTERVAL_SECS: u64 = 6 * 60 * 60;

/// Seconds a watched sensor may stay unavailable before an alert (30 minutes)
pub const DEFAULT_UNAVAILABILITY_GRACE_SECS: u64 = 30 * 60;

/// One monitored mains phase
#[derive(Debug, Clone, PartialEq)]
pub struct PhaseConfig {
    /// Label used in messages (e.g., "L1")
    pub name: String,
    pub sensor: SignalId,
    /// Current limit in amps
    pub limit: f64,
}

/// Phase current alert settings
#[derive(Debug, Clone, PartialEq)]
pub struct PhaseAlertConfig {
    pub phases: Vec<PhaseConfig>,
    pub notification_service: ServiceRef,
    pub notification_interval: Duration,
    /// Poll period; defaults to the notification interval
    pub check_interval: Duration,
}

/// EV charge controller settings
#[derive(Debug, Clone, PartialEq)]
pub struct ChargeControlConfig {
    pub phases: Vec<PhaseConfig>,
    /// Sensor reporting `on` while the car is charging
    pub charging_sensor: SignalId,
    /// Passed as `device_id` to both control services when set
    pub device_id: Option<String>,
    pub stop_service: ServiceRef,
    pub start_service: ServiceRef,
    pub overload_margin: f64,
    pub required_slack: f64,
    pub resume_check_interval: Duration,
    pub notification_service: ServiceRef,
    pub notification_interval: Duration,
}

/// Settings for one watched sensor
#[derive(Debug, Clone, PartialEq)]
pub struct SensorWatchConfig {
    pub sensor: SignalId,
    pub friendly_name: String,
    pub check_interval: Duration,
    pub same_value_check_enabled: bool,
    pub unavailability_grace_period: Duration,
    pub notification_service: ServiceRef,
}

/// Everything that validated
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RulesConfig {
    pub phase_alert: Option<PhaseAlertConfig>,
    pub charge_control: Option<ChargeControlConfig>,
    pub sensor_watch: Vec<SensorWatchConfig>,
}

impl RulesConfig {
    /// Every host service the configured monitors will call, deduplicated
    pub fn services(&self) -> Vec<ServiceRef> {
        let mut services = Vec::new();
        if let Some(alert) = &self.phase_alert {
            services.push(alert.notification_service.clone());
        }
        if let Some(charge) = &self.charge_control {
            services.push(charge.stop_service.clone());
            services.push(charge.start_service.clone());
            services.push(charge.notification_service.clone());
        }
        services.extend(self.sensor_watch.iter().map(|s| s.notification_service.clone()));

        let mut unique: Vec<ServiceRef> = Vec::new();
        for service in services {
            if !unique.contains(&service) {
                unique.push(service);
            }
        }
        unique
    }

    pub fn is_empty(&self) -> bool {
        self.phase_alert.is_none() && self.charge_control.is_none() && self.sensor_watch.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Raw YAML shapes
// ---------------------------------------------------------------------------

#[derive(Debug, Default, Deserialize)]
pub(crate) struct RawDocument {
    #[serde(default)]
    pub notification_service: Option<String>,
    #[serde(default, alias = "min_notification_interval")]
    pub notification_interval: Option<u64>,
    #[serde(default)]
    pub phases: Option<serde_yaml::Value>,
    #[serde(default)]
    pub phase_current_alert: Option<serde_yaml::Value>,
    #[serde(default)]
    pub charge_control: Option<serde_yaml::Value>,
    #[serde(default)]
    pub sensor_watch: Option<serde_yaml::Value>,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct RawPhase {
    pub name: Option<String>,
    pub sensor: Option<String>,
    pub limit: Option<f64>,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct RawPhaseAlert {
    pub notification_service: Option<String>,
    #[serde(alias = "min_notification_interval")]
    pub notification_interval: Option<u64>,
    pub check_interval: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct RawChargeControl {
    pub charging_sensor: Option<String>,
    pub device_id: Option<String>,
    pub stop_charge_service: Option<String>,
    pub start_charge_service: Option<String>,
    #[serde(alias = "overload_threshold")]
    pub overload_margin: Option<f64>,
    #[serde(alias = "min_available_current")]
    pub required_slack: Option<f64>,
    pub resume_check_interval: Option<u64>,
    pub notification_service: Option<String>,
    #[serde(alias = "min_notification_interval")]
    pub notification_interval: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct RawSensorWatch {
    pub notification_service: Option<String>,
    #[serde(default)]
    pub sensors: serde_yaml::Mapping,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct RawSensor {
    pub friendly_name: Option<String>,
    #[serde(alias = "staleness_check_interval")]
    pub check_interval: Option<u64>,
    #[serde(alias = "same_val_check_enabled")]
    pub same_value_check_enabled: Option<bool>,
    pub unavailability_grace_period: Option<u64>,
}

/// Phases used when the document has no `phases` list
pub(crate) fn default_phases() -> Vec<(&'static str, &'static str, f64)> {
    vec![
        ("L1", "sensor.pillanatnyi_aramerosseg_l1", 16.0),
        ("L2", "sensor.pillanatnyi_aramerosseg_l2", 16.0),
        ("L3", "sensor.pillanatnyi_aramerosseg_l3", 32.0),
    ]
}

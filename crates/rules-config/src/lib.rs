//! YAML configuration for home rules
//!
//! One YAML document configures every monitor:
//!
//! ```yaml
//! notification_service: notify/mobile_app
//! phases:
//!   - { name: L1, sensor: sensor.pillanatnyi_aramerosseg_l1, limit: 16 }
//!   - { name: L2, sensor: sensor.pillanatnyi_aramerosseg_l2, limit: 16 }
//!   - { name: L3, sensor: sensor.pillanatnyi_aramerosseg_l3, limit: 32 }
//! phase_current_alert: {}
//! charge_control:
//!   charging_sensor: binary_sensor.ev_charging
//!   stop_charge_service: easee/pause
//!   start_charge_service: easee/resume
//! sensor_watch:
//!   notification_service: notify/soulphone
//!   sensors:
//!     sensor.agard_water_level:
//!       friendly_name: Agárd water level
//! ```
//!
//! Sections are validated independently. A broken section (or a broken
//! sensor entry) is reported in [`LoadedConfig::problems`] and left out,
//! while everything else still loads.
//!
//! # Example
//!
//! ```ignore
//! use rules_config::load_file;
//!
//! let loaded = load_file("home_rules.yaml")?;
//! for problem in &loaded.problems {
//!     tracing::error!(%problem, "Monitor not started");
//! }
//! ```

mod error;
mod loader;
mod schema;

pub use error::{ConfigError, ConfigResult};
pub use loader::{load_file, load_str, LoadedConfig};
pub use schema::{
    ChargeControlConfig, PhaseAlertConfig, PhaseConfig, RulesConfig, SensorWatchConfig,
    DEFAULT_CHECK_INTERVAL_SECS, DEFAULT_NOTIFICATION_INTERVAL_SECS, DEFAULT_NOTIFICATION_SERVICE,
    DEFAULT_OVERLOAD_MARGIN, DEFAULT_REQUIRED_SLACK, DEFAULT_RESUME_CHECK_INTERVAL_SECS,
    DEFAULT_SENSOR_WATCH_NOTIFICATION_SERVICE, DEFAULT_UNAVAILABILITY_GRACE_SECS,
};

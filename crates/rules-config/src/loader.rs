//! Parsing and validation of the rules document

use rules_core::{ServiceRef, SignalId};
use serde::de::DeserializeOwned;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, warn};

use crate::error::{ConfigError, ConfigResult};
use crate::schema::{
    default_phases, ChargeControlConfig, PhaseAlertConfig, PhaseConfig, RawChargeControl,
    RawDocument, RawPhase, RawPhaseAlert, RawSensor, RawSensorWatch, RulesConfig,
    SensorWatchConfig, DEFAULT_CHECK_INTERVAL_SECS, DEFAULT_NOTIFICATION_INTERVAL_SECS,
    DEFAULT_NOTIFICATION_SERVICE, DEFAULT_OVERLOAD_MARGIN, DEFAULT_REQUIRED_SLACK,
    DEFAULT_RESUME_CHECK_INTERVAL_SECS, DEFAULT_SENSOR_WATCH_NOTIFICATION_SERVICE,
    DEFAULT_UNAVAILABILITY_GRACE_SECS,
};

/// Result of loading a document: what validated, and what did not
#[derive(Debug, Default)]
pub struct LoadedConfig {
    pub config: RulesConfig,
    /// One entry per section or sensor that was left out
    pub problems: Vec<ConfigError>,
}

/// Load and validate a YAML file
///
/// Only unreadable files and malformed YAML fail the whole load; invalid
/// sections end up in [`LoadedConfig::problems`].
pub fn load_file(path: impl AsRef<Path>) -> ConfigResult<LoadedConfig> {
    let path = path.as_ref();
    debug!("Loading rules configuration: {:?}", path);

    let content = fs::read_to_string(path).map_err(|e| ConfigError::ReadFile {
        path: path.to_path_buf(),
        source: e,
    })?;
    parse(&content, path)
}

/// Load and validate YAML from a string
pub fn load_str(content: &str) -> ConfigResult<LoadedConfig> {
    parse(content, Path::new("<string>"))
}

fn parse(content: &str, source_path: &Path) -> ConfigResult<LoadedConfig> {
    let doc: RawDocument = if content.trim().is_empty() {
        RawDocument::default()
    } else {
        serde_yaml::from_str(content).map_err(|e| ConfigError::ParseYaml {
            path: PathBuf::from(source_path),
            source: e,
        })?
    };
    Ok(build(doc))
}

/// Document-wide fallbacks for the per-section notification settings
struct Defaults {
    notification_service: Option<String>,
    notification_interval: Option<u64>,
}

impl Defaults {
    /// Section value, then document value, then `fallback`
    fn service(&self, key: &str, own: Option<String>, fallback: &str) -> ConfigResult<ServiceRef> {
        let raw = own
            .or_else(|| self.notification_service.clone())
            .unwrap_or_else(|| fallback.to_string());
        service(key, Some(raw))
    }

    fn interval(&self, key: &str, own: Option<u64>) -> ConfigResult<Duration> {
        interval(
            key,
            own.or(self.notification_interval),
            DEFAULT_NOTIFICATION_INTERVAL_SECS,
        )
    }
}

fn build(doc: RawDocument) -> LoadedConfig {
    let mut loaded = LoadedConfig::default();
    let defaults = Defaults {
        notification_service: doc.notification_service,
        notification_interval: doc.notification_interval,
    };

    let needs_phases = doc.phase_current_alert.is_some() || doc.charge_control.is_some();
    let phases = if needs_phases {
        match phases(doc.phases) {
            Ok(phases) => Some(phases),
            Err(e) => {
                warn!(error = %e, "Phase configuration invalid, phase monitors disabled");
                loaded.problems.push(e);
                None
            }
        }
    } else {
        None
    };

    if let (Some(section), Some(phases)) = (doc.phase_current_alert, &phases) {
        match phase_alert(section, phases, &defaults) {
            Ok(config) => loaded.config.phase_alert = Some(config),
            Err(e) => loaded.problems.push(e),
        }
    }

    if let (Some(section), Some(phases)) = (doc.charge_control, &phases) {
        match charge_control(section, phases, &defaults) {
            Ok(config) => loaded.config.charge_control = Some(config),
            Err(e) => loaded.problems.push(e),
        }
    }

    if let Some(section) = doc.sensor_watch {
        sensor_watch(section, &defaults, &mut loaded);
    }

    loaded
}

fn section<T: DeserializeOwned + Default>(key: &str, value: serde_yaml::Value) -> ConfigResult<T> {
    if value.is_null() {
        return Ok(T::default());
    }
    serde_yaml::from_value(value).map_err(|e| ConfigError::invalid(key, e))
}

fn phases(value: Option<serde_yaml::Value>) -> ConfigResult<Vec<PhaseConfig>> {
    let Some(value) = value else {
        return default_phases()
            .into_iter()
            .map(|(name, sensor, limit)| {
                Ok(PhaseConfig {
                    name: name.to_string(),
                    sensor: signal("phases", Some(sensor.to_string()))?,
                    limit,
                })
            })
            .collect();
    };

    let raw: Vec<RawPhase> =
        serde_yaml::from_value(value).map_err(|e| ConfigError::invalid("phases", e))?;
    if raw.is_empty() {
        return Err(ConfigError::invalid("phases", "at least one phase is required"));
    }

    raw.into_iter()
        .enumerate()
        .map(|(i, phase)| {
            let key = format!("phases[{i}]");
            let limit = phase.limit.ok_or_else(|| ConfigError::MissingValue {
                key: format!("{key}.limit"),
            })?;
            Ok(PhaseConfig {
                name: phase.name.unwrap_or_else(|| format!("L{}", i + 1)),
                sensor: signal(&format!("{key}.sensor"), phase.sensor)?,
                limit: amps(&format!("{key}.limit"), Some(limit), 0.0)?,
            })
        })
        .collect()
}

fn phase_alert(
    value: serde_yaml::Value,
    phases: &[PhaseConfig],
    defaults: &Defaults,
) -> ConfigResult<PhaseAlertConfig> {
    let raw: RawPhaseAlert = section("phase_current_alert", value)?;
    let notification_interval = defaults.interval(
        "phase_current_alert.notification_interval",
        raw.notification_interval,
    )?;
    let check_interval = match raw.check_interval {
        Some(secs) => interval("phase_current_alert.check_interval", Some(secs), 0)?,
        None => notification_interval,
    };

    Ok(PhaseAlertConfig {
        phases: phases.to_vec(),
        notification_service: defaults.service(
            "phase_current_alert.notification_service",
            raw.notification_service,
            DEFAULT_NOTIFICATION_SERVICE,
        )?,
        notification_interval,
        check_interval,
    })
}

fn charge_control(
    value: serde_yaml::Value,
    phases: &[PhaseConfig],
    defaults: &Defaults,
) -> ConfigResult<ChargeControlConfig> {
    let raw: RawChargeControl = section("charge_control", value)?;

    Ok(ChargeControlConfig {
        phases: phases.to_vec(),
        charging_sensor: signal("charge_control.charging_sensor", raw.charging_sensor)?,
        device_id: raw.device_id,
        stop_service: service("charge_control.stop_charge_service", raw.stop_charge_service)?,
        start_service: service("charge_control.start_charge_service", raw.start_charge_service)?,
        overload_margin: amps(
            "charge_control.overload_margin",
            raw.overload_margin,
            DEFAULT_OVERLOAD_MARGIN,
        )?,
        required_slack: amps(
            "charge_control.required_slack",
            raw.required_slack,
            DEFAULT_REQUIRED_SLACK,
        )?,
        resume_check_interval: interval(
            "charge_control.resume_check_interval",
            raw.resume_check_interval,
            DEFAULT_RESUME_CHECK_INTERVAL_SECS,
        )?,
        notification_service: defaults.service(
            "charge_control.notification_service",
            raw.notification_service,
            DEFAULT_NOTIFICATION_SERVICE,
        )?,
        notification_interval: defaults.interval(
            "charge_control.notification_interval",
            raw.notification_interval,
        )?,
    })
}

fn sensor_watch(value: serde_yaml::Value, defaults: &Defaults, loaded: &mut LoadedConfig) {
    let raw: RawSensorWatch = match section("sensor_watch", value) {
        Ok(raw) => raw,
        Err(e) => {
            loaded.problems.push(e);
            return;
        }
    };

    let shared = defaults.service(
        "sensor_watch.notification_service",
        raw.notification_service,
        DEFAULT_SENSOR_WATCH_NOTIFICATION_SERVICE,
    );
    let notification_service = match shared {
        Ok(service) => service,
        Err(e) => {
            loaded.problems.push(e);
            return;
        }
    };

    for (key, value) in raw.sensors {
        let Some(entity) = key.as_str().map(str::to_string) else {
            loaded
                .problems
                .push(ConfigError::invalid("sensor_watch.sensors", "sensor keys must be strings"));
            continue;
        };
        match sensor(&entity, value, notification_service.clone()) {
            Ok(config) => loaded.config.sensor_watch.push(config),
            Err(e) => loaded.problems.push(e),
        }
    }
}

fn sensor(
    entity: &str,
    value: serde_yaml::Value,
    notification_service: ServiceRef,
) -> ConfigResult<SensorWatchConfig> {
    let key = format!("sensor_watch.sensors.{entity}");
    let raw: RawSensor = section(&key, value)?;

    Ok(SensorWatchConfig {
        sensor: signal(&key, Some(entity.to_string()))?,
        friendly_name: raw.friendly_name.unwrap_or_else(|| entity.to_string()),
        check_interval: interval(
            &format!("{key}.check_interval"),
            raw.check_interval,
            DEFAULT_CHECK_INTERVAL_SECS,
        )?,
        same_value_check_enabled: raw.same_value_check_enabled.unwrap_or(true),
        unavailability_grace_period: interval(
            &format!("{key}.unavailability_grace_period"),
            raw.unavailability_grace_period,
            DEFAULT_UNAVAILABILITY_GRACE_SECS,
        )?,
        notification_service,
    })
}

fn signal(key: &str, raw: Option<String>) -> ConfigResult<SignalId> {
    let raw = raw.ok_or_else(|| ConfigError::MissingValue { key: key.to_string() })?;
    raw.parse().map_err(|e| ConfigError::invalid(key, e))
}

fn service(key: &str, raw: Option<String>) -> ConfigResult<ServiceRef> {
    let raw = raw.ok_or_else(|| ConfigError::MissingValue { key: key.to_string() })?;
    raw.parse().map_err(|e| ConfigError::invalid(key, e))
}

fn interval(key: &str, secs: Option<u64>, fallback: u64) -> ConfigResult<Duration> {
    match secs.unwrap_or(fallback) {
        0 => Err(ConfigError::invalid(key, "interval must be at least one second")),
        secs => Ok(Duration::from_secs(secs)),
    }
}

fn amps(key: &str, value: Option<f64>, fallback: f64) -> ConfigResult<f64> {
    let value = value.unwrap_or(fallback);
    if !value.is_finite() || value < 0.0 {
        return Err(ConfigError::invalid(key, format!("{value} is not a non-negative number")));
    }
    Ok(value)
}

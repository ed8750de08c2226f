//! Loading full rules documents from files and strings

use rules_config::{load_file, load_str, ConfigError};
use rules_core::RuleError;
use std::io::Write;
use std::time::Duration;

const FULL: &str = r#"
notification_service: notify/mobile_app
phases:
  - { name: L1, sensor: sensor.pillanatnyi_aramerosseg_l1, limit: 16 }
  - { name: L2, sensor: sensor.pillanatnyi_aramerosseg_l2, limit: 16 }
  - { name: L3, sensor: sensor.pillanatnyi_aramerosseg_l3, limit: 32 }
phase_current_alert:
  notification_interval: 120
charge_control:
  charging_sensor: binary_sensor.ev_charging
  device_id: charger-1
  stop_charge_service: easee/pause
  start_charge_service: easee/resume
  overload_threshold: 3
  min_available_current: 8
sensor_watch:
  notification_service: notify/soulphone
  sensors:
    sensor.agard_water_level:
      friendly_name: Agárd water level
      check_interval: 3600
    sensor.agard_water_temperature:
      same_val_check_enabled: false
"#;

#[test]
fn test_full_document() {
    let loaded = load_str(FULL).unwrap();
    assert!(loaded.problems.is_empty(), "{:?}", loaded.problems);

    let alert = loaded.config.phase_alert.as_ref().unwrap();
    assert_eq!(alert.phases.len(), 3);
    assert_eq!(alert.notification_interval, Duration::from_secs(120));
    assert_eq!(alert.check_interval, Duration::from_secs(120));
    assert_eq!(alert.notification_service.to_string(), "notify/mobile_app");

    let charge = loaded.config.charge_control.as_ref().unwrap();
    assert_eq!(charge.device_id.as_deref(), Some("charger-1"));
    assert_eq!(charge.overload_margin, 3.0);
    assert_eq!(charge.required_slack, 8.0);
    assert_eq!(charge.resume_check_interval, Duration::from_secs(60));
    assert_eq!(charge.stop_service.to_string(), "easee/pause");

    let sensors = &loaded.config.sensor_watch;
    assert_eq!(sensors.len(), 2);
    assert_eq!(sensors[0].friendly_name, "Agárd water level");
    assert_eq!(sensors[0].check_interval, Duration::from_secs(3600));
    assert_eq!(sensors[0].unavailability_grace_period, Duration::from_secs(1800));
    assert!(sensors[0].same_value_check_enabled);
    assert_eq!(sensors[1].friendly_name, "sensor.agard_water_temperature");
    assert_eq!(sensors[1].check_interval, Duration::from_secs(6 * 60 * 60));
    assert!(!sensors[1].same_value_check_enabled);
    assert_eq!(sensors[1].notification_service.to_string(), "notify/soulphone");

    let services: Vec<String> = loaded
        .config
        .services()
        .iter()
        .map(ToString::to_string)
        .collect();
    assert_eq!(
        services,
        vec!["notify/mobile_app", "easee/pause", "easee/resume", "notify/soulphone"]
    );
}

#[test]
fn test_invalid_section_does_not_block_others() {
    let yaml = r#"
phase_current_alert: {}
charge_control:
  charging_sensor: binary_sensor.ev_charging
  stop_charge_service: easee.pause
  start_charge_service: easee/resume
sensor_watch:
  sensors:
    sensor.ok: {}
    not_an_entity: {}
"#;
    let loaded = load_str(yaml).unwrap();

    assert!(loaded.config.phase_alert.is_some());
    assert!(loaded.config.charge_control.is_none());
    assert_eq!(loaded.config.sensor_watch.len(), 1);
    assert_eq!(loaded.config.sensor_watch[0].sensor.as_str(), "sensor.ok");

    let keys: Vec<_> = loaded.problems.iter().filter_map(|p| p.key()).collect();
    assert_eq!(
        keys,
        vec!["charge_control.stop_charge_service", "sensor_watch.sensors.not_an_entity"]
    );
}

#[test]
fn test_missing_required_value_maps_to_invalid_configuration() {
    let loaded = load_str("charge_control:\n  stop_charge_service: a/b\n").unwrap();
    assert!(loaded.config.charge_control.is_none());
    assert_eq!(loaded.problems.len(), 1);

    let err = loaded.problems.into_iter().next().unwrap();
    assert!(matches!(err, ConfigError::MissingValue { .. }));
    assert_eq!(
        RuleError::from(err),
        RuleError::InvalidConfiguration {
            key: "charge_control.charging_sensor".into(),
            reason: "missing required value".into(),
        }
    );
}

#[test]
fn test_null_sensor_entry_uses_defaults() {
    let loaded = load_str("sensor_watch:\n  sensors:\n    sensor.boiler:\n").unwrap();
    assert!(loaded.problems.is_empty());
    let sensor = &loaded.config.sensor_watch[0];
    assert_eq!(sensor.friendly_name, "sensor.boiler");
    assert_eq!(sensor.notification_service.to_string(), "notify/soulphone");
}

#[test]
fn test_sensor_watch_service_precedence() {
    let yaml = r#"
notification_service: notify/house
phase_current_alert: {}
sensor_watch:
  sensors:
    sensor.boiler: {}
"#;
    let loaded = load_str(yaml).unwrap();
    assert!(loaded.problems.is_empty(), "{:?}", loaded.problems);
    assert_eq!(
        loaded.config.sensor_watch[0].notification_service.to_string(),
        "notify/house"
    );
    assert_eq!(
        loaded.config.phase_alert.unwrap().notification_service.to_string(),
        "notify/house"
    );

    let yaml = r#"
phase_current_alert: {}
sensor_watch:
  sensors:
    sensor.boiler: {}
"#;
    let loaded = load_str(yaml).unwrap();
    assert_eq!(
        loaded.config.sensor_watch[0].notification_service.to_string(),
        "notify/soulphone"
    );
    assert_eq!(
        loaded.config.phase_alert.unwrap().notification_service.to_string(),
        "notify/mobile_app"
    );
}

#[test]
fn test_legacy_key_names() {
    let yaml = r#"
min_notification_interval: 90
phase_current_alert:
  min_notification_interval: 300
charge_control:
  charging_sensor: binary_sensor.ev_charging
  stop_charge_service: easee/pause
  start_charge_service: easee/resume
sensor_watch:
  sensors:
    sensor.boiler:
      staleness_check_interval: 7200
"#;
    let loaded = load_str(yaml).unwrap();
    assert!(loaded.problems.is_empty(), "{:?}", loaded.problems);

    let alert = loaded.config.phase_alert.as_ref().unwrap();
    assert_eq!(alert.notification_interval, Duration::from_secs(300));
    let charge = loaded.config.charge_control.as_ref().unwrap();
    assert_eq!(charge.notification_interval, Duration::from_secs(90));
    assert_eq!(
        loaded.config.sensor_watch[0].check_interval,
        Duration::from_secs(7200)
    );
}

#[test]
fn test_empty_document_configures_nothing() {
    let loaded = load_str("").unwrap();
    assert!(loaded.config.is_empty());
    assert!(loaded.problems.is_empty());
}

#[test]
fn test_malformed_yaml_fails_whole_load() {
    let err = load_str("phases: [unclosed").unwrap_err();
    assert!(matches!(err, ConfigError::ParseYaml { .. }));
}

#[test]
fn test_load_from_file() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(FULL.as_bytes()).unwrap();

    let loaded = load_file(file.path()).unwrap();
    assert!(loaded.config.charge_control.is_some());
}

#[test]
fn test_missing_file() {
    let dir = tempfile::tempdir().unwrap();
    let err = load_file(dir.path().join("nope.yaml")).unwrap_err();
    assert!(matches!(err, ConfigError::ReadFile { .. }));
}

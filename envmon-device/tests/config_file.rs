//! Configuration loading from disk

use std::io::Write;

use envmon_device::{ConfigError, ConfigOverrides, DeviceConfig};
use tempfile::NamedTempFile;

fn write_config(text: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(text.as_bytes()).unwrap();
    file.flush().unwrap();
    file
}

#[test]
fn file_then_overrides() {
    let file = write_config(
        r#"{
            "device_id": "basic_001",
            "broker_host": "broker.lan",
            "sample_interval_ms": 10000,
            "status_interval_ms": 0,
            "topics": {
                "sensor_data": "lab/basic_001/data",
                "status": "lab/basic_001/status",
                "command": "lab/basic_001/cmd"
            }
        }"#,
    );

    let mut config = DeviceConfig::load(file.path()).unwrap();
    config.apply(ConfigOverrides {
        broker_port: Some(1884),
        ..ConfigOverrides::default()
    });
    config.validate().unwrap();

    let mqtt = config.mqtt_config().unwrap();
    assert_eq!(mqtt.broker_host, "broker.lan");
    assert_eq!(mqtt.broker_port, 1884);
    assert_eq!(mqtt.topics.sensor_data, "lab/basic_001/data");

    let settings = config.loop_settings();
    assert_eq!(settings.sample_interval_ms, 10_000);
    assert_eq!(settings.status_interval_ms, 0);
}

#[test]
fn missing_file_reports_path() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("absent.json");

    let err = DeviceConfig::load(&path).unwrap_err();
    assert!(matches!(err, ConfigError::Io { .. }));
    assert!(err.to_string().contains("absent.json"));
}

#[test]
fn malformed_file_is_a_parse_error() {
    let file = write_config("{ device_id: ");
    assert!(matches!(
        DeviceConfig::load(file.path()),
        Err(ConfigError::Parse(_))
    ));
}

#[test]
fn invalid_values_fail_validation() {
    let file = write_config(r#"{"sample_interval_ms": 50, "loop_delay_ms": 100}"#);
    let config = DeviceConfig::load(file.path()).unwrap();
    assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
}

#[test]
fn no_file_means_defaults() {
    let config = DeviceConfig::load_or_default(None).unwrap();
    assert_eq!(config, DeviceConfig::default());
}

//! Environment Monitor Device
//!
//! Ties the sensor emulator and the MQTT client together into the device's
//! main loop.
//!
//! ```text
//! DeviceConfig ──▶ SampleLoop ──read()──▶ SensorSource
//!                      │
//!                      ├──publish()──▶ MqttClient ──▶ Transport
//!                      └──emit()─────▶ EventSink
//! ```
//!
//! The `envmon` binary loads a [`DeviceConfig`], prints the device banner,
//! connects (continuing offline when the broker is unreachable) and runs the
//! loop until stopped.

pub mod config;
pub mod sample_loop;

pub use config::{ConfigError, ConfigOverrides, DeviceConfig};
pub use sample_loop::{LoopSettings, LoopSummary, SampleLoop, StopToken, TickOutcome};

use envmon_core::constants::device::FEATURE_SET;
use log::info;

/// Log the startup banner for `config`
pub fn log_device_info(config: &DeviceConfig) {
    info!("=== IoT Environment Monitor ===");
    info!("Device ID: {}", config.device_id);
    info!("Firmware: {} ({})", config.firmware_version, FEATURE_SET);
    info!("Sample Interval: {} ms", config.sample_interval_ms);
    if config.dry_run {
        info!("MQTT Broker: none (dry run)");
    } else {
        info!("MQTT Broker: {}:{}", config.broker_host, config.broker_port);
    }
    info!("===============================");
}

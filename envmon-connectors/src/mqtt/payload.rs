//! JSON payloads published by the device
//!
//! Sensor data is sent compact, with short keys:
//!
//! ```text
//! {"device_id":"env_monitor_basic_001","temp":23.5,"hum":65.2,"air":45.1,"ts":1234567890}
//! ```
//!
//! `temp`, `hum` and `air` are rounded to two decimal places and written as
//! JSON numbers in their shortest form, so trailing zeros are dropped
//! (`20.0`, `23.5`, not `20.00`, `23.50`). Compare values, not text. The
//! sequence number is not part of the payload.

use envmon_core::{DeviceError, DeviceResult, DeviceStatus, SensorReading};
use serde::{Deserialize, Serialize};

/// Wire form of one reading
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SensorPayload<'a> {
    pub device_id: &'a str,
    pub temp: f64,
    pub hum: f64,
    pub air: f64,
    pub ts: u32,
}

impl<'a> SensorPayload<'a> {
    pub fn new(device_id: &'a str, reading: &SensorReading) -> Self {
        Self {
            device_id,
            temp: round2(reading.temperature),
            hum: round2(reading.humidity),
            air: round2(reading.air_quality),
            ts: reading.timestamp,
        }
    }
}

/// Round to two decimal places
pub fn round2(value: f32) -> f64 {
    (f64::from(value) * 100.0).round() / 100.0
}

pub fn encode_reading(device_id: &str, reading: &SensorReading) -> DeviceResult<Vec<u8>> {
    serde_json::to_vec(&SensorPayload::new(device_id, reading))
        .map_err(|e| DeviceError::Generic(format!("payload encoding failed: {}", e)))
}

pub fn encode_status(status: &DeviceStatus) -> DeviceResult<Vec<u8>> {
    serde_json::to_vec(status)
        .map_err(|e| DeviceError::Generic(format!("status encoding failed: {}", e)))
}

//! Connection state and device status report

use core::fmt;
use serde::{Deserialize, Serialize};

/// MQTT connection state
///
/// ```text
/// Disconnected ──connect()──▶ Connecting ──ok──▶ Connected
///      ▲                          │                 │
///      │                          └──fail──▶ Error ◀┘ (hard drop)
///      └──────────── disconnect() from any state ───┘
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConnectionState {
    /// Initial state, no session
    #[default]
    Disconnected,
    /// Handshake in progress
    Connecting,
    /// Session established, publishes allowed
    Connected,
    /// Last connect failed or the link dropped
    Error,
}

impl ConnectionState {
    /// Lowercase name for logs
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Disconnected => "disconnected",
            Self::Connecting => "connecting",
            Self::Connected => "connected",
            Self::Error => "error",
        }
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Snapshot of device health, published on the status topic
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceStatus {
    /// Device identifier
    pub device_id: String,
    /// Firmware version string
    pub firmware_version: String,
    /// Milliseconds since the loop started
    pub uptime_ms: u64,
    /// Readings taken so far
    pub data_count: u64,
    /// Wireless signal strength, 0–100
    pub wifi_strength: u8,
    /// Whether the MQTT session was up when the snapshot was taken
    pub mqtt_connected: bool,
}

impl DeviceStatus {
    /// Build a status snapshot; `wifi_strength` is clamped to 100
    pub fn new(
        device_id: impl Into<String>,
        firmware_version: impl Into<String>,
        uptime_ms: u64,
        data_count: u64,
        wifi_strength: u8,
        mqtt_connected: bool,
    ) -> Self {
        Self {
            device_id: device_id.into(),
            firmware_version: firmware_version.into(),
            uptime_ms,
            data_count,
            wifi_strength: wifi_strength.min(100),
            mqtt_connected,
        }
    }
}

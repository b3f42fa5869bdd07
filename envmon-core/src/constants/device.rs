//! Device Identity and Broker Defaults
//!
//! Values a freshly flashed device reports before any configuration file
//! overrides them.

/// Default device identifier.
pub const DEFAULT_DEVICE_ID: &str = "env_monitor_basic_001";

/// Firmware version reported in status messages.
pub const DEFAULT_FIRMWARE_VERSION: &str = "1.0.0";

/// Feature set label shown in the startup banner.
pub const FEATURE_SET: &str = "basic-loop";

/// Prefix prepended to the device id to build the MQTT client id.
pub const CLIENT_ID_PREFIX: &str = "env_monitor_";

/// Default broker host.
pub const DEFAULT_BROKER_HOST: &str = "localhost";

/// Default broker port (plain MQTT, no TLS).
pub const DEFAULT_BROKER_PORT: u16 = 1883;

/// MQTT keepalive interval (seconds).
pub const DEFAULT_KEEPALIVE_SECS: u16 = 60;

/// MQTT QoS level: 1 = at least once.
pub const DEFAULT_QOS: u8 = 1;

/// Placeholder substituted with the device id in topic templates.
pub const DEVICE_ID_PLACEHOLDER: &str = "{device_id}";

/// Sensor data topic template.
pub const SENSOR_DATA_TOPIC: &str = "devices/{device_id}/sensor_data";

/// Device status topic template.
pub const STATUS_TOPIC: &str = "devices/{device_id}/status";

/// Inbound command topic template. Reserved, nothing subscribes yet.
pub const COMMAND_TOPIC: &str = "devices/{device_id}/command";

/// Expand a topic template for one device.
pub fn device_topic(template: &str, device_id: &str) -> String {
    template.replace(DEVICE_ID_PLACEHOLDER, device_id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn expands_topic_templates() {
        assert_eq!(
            device_topic(SENSOR_DATA_TOPIC, "basic_001"),
            "devices/basic_001/sensor_data"
        );
        assert_eq!(device_topic(STATUS_TOPIC, "x"), "devices/x/status");
        assert_eq!(device_topic("fixed/topic", "x"), "fixed/topic");
    }
}

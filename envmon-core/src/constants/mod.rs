//! Constants for the Environment Monitor
//!
//! Centralized defaults used by the device, the transport and the loop.
//! Anything here can be overridden at startup through the device
//! configuration; nothing changes them at runtime.
//!
//! ## Organization
//!
//! - **Device**: identity, broker address, topic templates
//! - **Time**: sampling cadence, timeouts, retry limits

/// Device identity, broker defaults and MQTT topic templates.
pub mod device;

/// Sampling intervals, timeouts and retry limits.
pub mod time;

// Re-export commonly used constants for convenience
pub use device::{
    device_topic, COMMAND_TOPIC, DEFAULT_BROKER_HOST, DEFAULT_BROKER_PORT, DEFAULT_DEVICE_ID,
    DEFAULT_FIRMWARE_VERSION, DEFAULT_KEEPALIVE_SECS, DEFAULT_QOS, SENSOR_DATA_TOPIC,
    STATUS_TOPIC,
};

pub use time::{
    DEFAULT_LOOP_DELAY_MS, DEFAULT_MAX_RETRY_COUNT, DEFAULT_SAMPLE_INTERVAL_MS,
    DEFAULT_STATUS_INTERVAL_MS, DEFAULT_WATCHDOG_TIMEOUT_MS, MS_PER_SECOND,
};

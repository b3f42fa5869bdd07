use std::time::Duration;

use envmon_core::constants::{
    device::CLIENT_ID_PREFIX, device_topic, COMMAND_TOPIC, DEFAULT_BROKER_HOST,
    DEFAULT_BROKER_PORT, DEFAULT_KEEPALIVE_SECS, DEFAULT_QOS, DEFAULT_WATCHDOG_TIMEOUT_MS,
    SENSOR_DATA_TOPIC, STATUS_TOPIC,
};
use serde::{Deserialize, Serialize};

use crate::TransportError;

/// MQTT delivery guarantee
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum QoS {
    /// Fire and forget
    AtMostOnce = 0,
    /// Acknowledged delivery, may duplicate
    AtLeastOnce = 1,
    /// Four-way handshake, no duplicates
    ExactlyOnce = 2,
}

impl TryFrom<u8> for QoS {
    type Error = TransportError;

    fn try_from(level: u8) -> Result<Self, Self::Error> {
        match level {
            0 => Ok(QoS::AtMostOnce),
            1 => Ok(QoS::AtLeastOnce),
            2 => Ok(QoS::ExactlyOnce),
            other => Err(TransportError::Config(format!("invalid QoS level {}", other))),
        }
    }
}

impl From<QoS> for u8 {
    fn from(qos: QoS) -> Self {
        qos as u8
    }
}

/// Logical channel names for one device
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Topics {
    pub sensor_data: String,
    pub status: String,
    /// Inbound; reserved
    pub command: String,
}

impl Topics {
    /// `devices/{device_id}/...` topics
    pub fn for_device(device_id: &str) -> Self {
        Self {
            sensor_data: device_topic(SENSOR_DATA_TOPIC, device_id),
            status: device_topic(STATUS_TOPIC, device_id),
            command: device_topic(COMMAND_TOPIC, device_id),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MqttConfig {
    pub device_id: String,
    pub client_id: String,
    pub broker_host: String,
    pub broker_port: u16,
    pub keep_alive_secs: u16,
    pub qos: QoS,
    /// Bound on connect, send and disconnect
    pub operation_timeout_ms: u64,
    pub topics: Topics,
}

impl MqttConfig {
    /// Defaults for `device_id`: local broker, client id `env_monitor_{device_id}`
    pub fn for_device(device_id: &str) -> Self {
        Self {
            device_id: device_id.to_string(),
            client_id: format!("{}{}", CLIENT_ID_PREFIX, device_id),
            broker_host: DEFAULT_BROKER_HOST.to_string(),
            broker_port: DEFAULT_BROKER_PORT,
            keep_alive_secs: DEFAULT_KEEPALIVE_SECS,
            qos: QoS::try_from(DEFAULT_QOS).unwrap_or(QoS::AtLeastOnce),
            operation_timeout_ms: DEFAULT_WATCHDOG_TIMEOUT_MS,
            topics: Topics::for_device(device_id),
        }
    }

    pub fn with_broker(mut self, host: impl Into<String>, port: u16) -> Self {
        self.broker_host = host.into();
        self.broker_port = port;
        self
    }

    pub fn with_client_id(mut self, client_id: impl Into<String>) -> Self {
        self.client_id = client_id.into();
        self
    }

    pub fn with_keep_alive(mut self, secs: u16) -> Self {
        self.keep_alive_secs = secs;
        self
    }

    pub fn with_qos(mut self, qos: QoS) -> Self {
        self.qos = qos;
        self
    }

    pub fn with_operation_timeout(mut self, ms: u64) -> Self {
        self.operation_timeout_ms = ms;
        self
    }

    pub fn with_topics(mut self, topics: Topics) -> Self {
        self.topics = topics;
        self
    }

    pub fn operation_timeout(&self) -> Duration {
        Duration::from_millis(self.operation_timeout_ms)
    }

    /// Reject settings no broker would accept
    pub fn validate(&self) -> Result<(), TransportError> {
        if self.broker_host.trim().is_empty() {
            return Err(TransportError::Config("broker host is empty".into()));
        }
        if self.broker_port == 0 {
            return Err(TransportError::Config("broker port is 0".into()));
        }
        if self.client_id.is_empty() {
            return Err(TransportError::Config("client id is empty".into()));
        }
        if self.operation_timeout_ms == 0 {
            return Err(TransportError::Config("operation timeout is 0".into()));
        }
        for topic in [&self.topics.sensor_data, &self.topics.status] {
            if topic.is_empty() || topic.contains(|c: char| c == '+' || c == '#') {
                return Err(TransportError::Config(format!(
                    "invalid publish topic '{}'",
                    topic
                )));
            }
        }
        Ok(())
    }
}

//! Transport Connectors for Edge-to-Broker Communication
//!
//! ## Overview
//!
//! This crate sits between the sample loop and the network. It owns the
//! MQTT connection state machine and reaches the broker through a
//! [`Transport`], a single capability with one job: get a payload onto a
//! topic, or say why it could not.
//!
//! ```text
//! SampleLoop ──publish(reading)──▶ MqttClient ──send(topic, bytes)──▶ Transport
//!                                   │ state machine                  ├── RumqttTransport (rumqttc)
//!                                   │ JSON payloads                  └── MockTransport (tests)
//!                                   └ last error / stats
//! ```
//!
//! ## Transport Contract
//!
//! - `connect` performs the handshake and returns once the broker accepted
//!   the session, bounded by the configured operation timeout
//! - `send` hands one payload to the broker; a transient failure leaves the
//!   session usable, a hard failure is reported as
//!   [`TransportError::Disconnected`]
//! - `poll` is called on every loop tick: cheap, non-blocking, and limited to
//!   connection bookkeeping (keepalive pings, noticing a broker-side drop)
//! - `disconnect` tears the session down; calling it twice is fine
//!
//! The core never assumes how bytes reach the broker. A native client
//! library, a raw socket, or a recording mock all satisfy the same trait.
//!
//! ## Example Usage
//!
//! ```rust
//! use envmon_connectors::{mock::MockTransport, MqttClient, MqttConfig};
//! use envmon_core::SensorReading;
//!
//! let transport = MockTransport::new();
//! let mut mqtt = MqttClient::new(MqttConfig::for_device("sensor_001"), transport.clone());
//!
//! mqtt.connect()?;
//! mqtt.publish(&SensorReading::default())?;
//!
//! assert_eq!(transport.sent()[0].topic, "devices/sensor_001/sensor_data");
//! # Ok::<(), envmon_core::DeviceError>(())
//! ```

pub mod mock;
pub mod mqtt;

#[cfg(feature = "mqtt")]
pub mod rumqtt;

// Re-export common types
pub use mqtt::{MqttClient, MqttConfig, QoS, Topics, NO_ERROR};

#[cfg(feature = "mqtt")]
pub use rumqtt::RumqttTransport;

use envmon_core::DeviceError;
use thiserror::Error;

/// Common transport errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    #[error("Not connected")]
    NotConnected,

    #[error("Timeout")]
    Timeout,

    #[error("Connection lost: {0}")]
    Disconnected(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Protocol error: {0}")]
    Protocol(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl TransportError {
    /// The session is gone and must be re-established
    pub fn is_hard_disconnect(&self) -> bool {
        matches!(self, Self::NotConnected | Self::Disconnected(_))
    }
}

impl From<TransportError> for DeviceError {
    fn from(err: TransportError) -> Self {
        match err {
            TransportError::NotConnected => DeviceError::not_connected(),
            TransportError::Protocol(msg) => DeviceError::Mqtt(msg),
            TransportError::Timeout => DeviceError::Network("operation timed out".into()),
            TransportError::Disconnected(msg) => {
                DeviceError::Network(format!("connection lost: {}", msg))
            }
            TransportError::Network(msg) => DeviceError::Network(msg),
            TransportError::Config(msg) => DeviceError::Generic(msg),
        }
    }
}

/// Capability that moves payloads to a broker
pub trait Transport {
    /// Establish a session with the broker
    fn connect(&mut self) -> Result<(), TransportError>;

    /// Tear the session down
    fn disconnect(&mut self) -> Result<(), TransportError>;

    /// Send one payload
    fn send(&mut self, topic: &str, payload: &[u8]) -> Result<(), TransportError>;

    /// Background processing; must not block
    fn poll(&mut self) -> Result<(), TransportError>;
}

impl<T: Transport + ?Sized> Transport for Box<T> {
    fn connect(&mut self) -> Result<(), TransportError> {
        (**self).connect()
    }

    fn disconnect(&mut self) -> Result<(), TransportError> {
        (**self).disconnect()
    }

    fn send(&mut self, topic: &str, payload: &[u8]) -> Result<(), TransportError> {
        (**self).send(topic, payload)
    }

    fn poll(&mut self) -> Result<(), TransportError> {
        (**self).poll()
    }
}

/// Connection statistics common to all transports
#[derive(Debug, Default, Clone)]
pub struct ConnectionStats {
    /// Total messages sent successfully
    pub messages_sent: u64,
    /// Total messages failed to send
    pub messages_failed: u64,
    /// Total bytes sent
    pub bytes_sent: u64,
    /// Number of successful connects after the first
    pub reconnections: u32,
    /// Last error message
    pub last_error: Option<String>,
}

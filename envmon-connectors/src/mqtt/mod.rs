//! MQTT client for the environment monitor
//!
//! Owns the connection state machine and gates every publish on it. The
//! actual bytes go through whichever [`Transport`] the client was built
//! with.
//!
//! Publish never reconnects on its own: when the client is not connected it
//! fails immediately with an MQTT error and leaves the state alone. Deciding
//! when to reconnect belongs to the caller.

mod config;
pub mod payload;

pub use config::{MqttConfig, QoS, Topics};

use envmon_core::{ConnectionState, DeviceError, DeviceResult, DeviceStatus, SensorReading};
use log::{debug, info, warn};

use crate::{ConnectionStats, Transport};

/// Returned by [`MqttClient::last_error`] when nothing has failed yet
pub const NO_ERROR: &str = "No error";

/// Connection state machine plus publish gating
pub struct MqttClient<T> {
    config: MqttConfig,
    transport: T,
    state: ConnectionState,
    stats: ConnectionStats,
    connected_once: bool,
}

impl<T: Transport> MqttClient<T> {
    /// New client in the `Disconnected` state
    pub fn new(config: MqttConfig, transport: T) -> Self {
        Self {
            config,
            transport,
            state: ConnectionState::Disconnected,
            stats: ConnectionStats::default(),
            connected_once: false,
        }
    }

    /// Reset to `Disconnected` and forget the last error
    pub fn init(&mut self) -> DeviceResult<()> {
        debug!("[MQTT] Initializing client {}", self.config.client_id);
        self.state = ConnectionState::Disconnected;
        self.stats.last_error = None;
        Ok(())
    }

    /// Establish a session.
    ///
    /// From `Disconnected` or `Error`: `Connecting`, then `Connected` on
    /// success or `Error` on failure. Already connected is a no-op.
    pub fn connect(&mut self) -> DeviceResult<()> {
        if self.state == ConnectionState::Connected {
            return Ok(());
        }

        info!(
            "[MQTT] Connecting to {}:{} as {}",
            self.config.broker_host, self.config.broker_port, self.config.client_id
        );
        self.state = ConnectionState::Connecting;

        match self.transport.connect() {
            Ok(()) => {
                self.state = ConnectionState::Connected;
                if self.connected_once {
                    self.stats.reconnections += 1;
                }
                self.connected_once = true;
                info!("[MQTT] Connected");
                Ok(())
            }
            Err(e) => {
                self.state = ConnectionState::Error;
                let err = DeviceError::from(e);
                self.record(&err);
                Err(err)
            }
        }
    }

    /// Tear down the session. Always ends `Disconnected`; idempotent.
    pub fn disconnect(&mut self) {
        if self.state != ConnectionState::Disconnected {
            if let Err(e) = self.transport.disconnect() {
                debug!("[MQTT] Ignoring error during disconnect: {}", e);
            }
            info!("[MQTT] Disconnected");
        }
        self.state = ConnectionState::Disconnected;
    }

    pub fn is_connected(&self) -> bool {
        self.state == ConnectionState::Connected
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    /// Publish a reading on the sensor data topic
    pub fn publish(&mut self, reading: &SensorReading) -> DeviceResult<()> {
        self.ensure_connected()?;
        let payload = payload::encode_reading(&self.config.device_id, reading)?;
        let topic = self.config.topics.sensor_data.clone();
        self.send(&topic, &payload)
    }

    /// Publish a status snapshot on the status topic
    pub fn publish_status(&mut self, status: &DeviceStatus) -> DeviceResult<()> {
        self.ensure_connected()?;
        let payload = payload::encode_status(status)?;
        let topic = self.config.topics.status.clone();
        self.send(&topic, &payload)
    }

    /// Per-tick background processing. Cheap and non-blocking; does nothing
    /// unless connected.
    pub fn poll(&mut self) -> DeviceResult<()> {
        if !self.is_connected() {
            return Ok(());
        }

        match self.transport.poll() {
            Ok(()) => Ok(()),
            Err(e) => {
                if e.is_hard_disconnect() {
                    warn!("[MQTT] Broker connection lost: {}", e);
                    self.state = ConnectionState::Error;
                }
                let err = DeviceError::from(e);
                self.record(&err);
                Err(err)
            }
        }
    }

    /// Description of the most recent failure, or [`NO_ERROR`]
    pub fn last_error(&self) -> &str {
        self.stats.last_error.as_deref().unwrap_or(NO_ERROR)
    }

    pub fn stats(&self) -> &ConnectionStats {
        &self.stats
    }

    pub fn config(&self) -> &MqttConfig {
        &self.config
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    fn ensure_connected(&mut self) -> DeviceResult<()> {
        if self.is_connected() {
            return Ok(());
        }
        let err = DeviceError::not_connected();
        // Keep the failure that took the link down
        if self.stats.last_error.is_none() {
            self.record(&err);
        }
        Err(err)
    }

    fn send(&mut self, topic: &str, payload: &[u8]) -> DeviceResult<()> {
        match self.transport.send(topic, payload) {
            Ok(()) => {
                self.stats.messages_sent += 1;
                self.stats.bytes_sent += payload.len() as u64;
                Ok(())
            }
            Err(e) => {
                self.stats.messages_failed += 1;
                // A single failed send keeps the session unless the link is gone
                if e.is_hard_disconnect() {
                    self.state = ConnectionState::Error;
                }
                let err = DeviceError::from(e);
                self.record(&err);
                Err(err)
            }
        }
    }

    fn record(&mut self, err: &DeviceError) {
        self.stats.last_error = Some(err.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockTransport;
    use crate::TransportError;

    fn client() -> (MqttClient<MockTransport>, MockTransport) {
        let transport = MockTransport::new();
        let client = MqttClient::new(MqttConfig::for_device("basic_001"), transport.clone());
        (client, transport)
    }

    fn reading(sequence: u16) -> SensorReading {
        SensorReading {
            temperature: 23.5,
            humidity: 65.2,
            air_quality: 45.1,
            timestamp: 1_234_567_890,
            sequence,
        }
    }

    #[test]
    fn starts_disconnected_without_error() {
        let (mut mqtt, _) = client();
        mqtt.init().unwrap();
        assert_eq!(mqtt.state(), ConnectionState::Disconnected);
        assert!(!mqtt.is_connected());
        assert_eq!(mqtt.last_error(), NO_ERROR);
    }

    #[test]
    fn publish_while_disconnected_fails_fast() {
        let (mut mqtt, transport) = client();

        let err = mqtt.publish(&reading(0)).unwrap_err();
        assert!(err.is_mqtt());
        assert_eq!(mqtt.state(), ConnectionState::Disconnected);
        assert!(transport.sent().is_empty());
        assert_eq!(mqtt.last_error(), "MQTT error: not connected");
    }

    #[test]
    fn connect_moves_to_connected() {
        let (mut mqtt, transport) = client();
        mqtt.connect().unwrap();
        assert!(mqtt.is_connected());
        assert_eq!(transport.connect_calls(), 1);

        // Second connect is a no-op
        mqtt.connect().unwrap();
        assert_eq!(transport.connect_calls(), 1);
    }

    #[test]
    fn failed_connect_moves_to_error_and_recovers() {
        let (mut mqtt, transport) = client();
        transport.fail_next_connect(TransportError::Network("connection refused".into()));

        let err = mqtt.connect().unwrap_err();
        assert!(matches!(err, DeviceError::Network(_)));
        assert_eq!(mqtt.state(), ConnectionState::Error);
        assert_eq!(mqtt.last_error(), "Network error: connection refused");

        mqtt.connect().unwrap();
        assert_eq!(mqtt.state(), ConnectionState::Connected);
        assert_eq!(mqtt.stats().reconnections, 0);
    }

    #[test]
    fn disconnect_is_idempotent() {
        let (mut mqtt, transport) = client();
        mqtt.connect().unwrap();

        mqtt.disconnect();
        assert_eq!(mqtt.state(), ConnectionState::Disconnected);
        mqtt.disconnect();
        assert_eq!(mqtt.state(), ConnectionState::Disconnected);
        assert_eq!(transport.disconnect_calls(), 1);
    }

    #[test]
    fn disconnect_clears_error_state() {
        let (mut mqtt, transport) = client();
        transport.fail_next_connect(TransportError::Timeout);
        let _ = mqtt.connect();
        assert_eq!(mqtt.state(), ConnectionState::Error);

        mqtt.disconnect();
        assert_eq!(mqtt.state(), ConnectionState::Disconnected);
    }

    #[test]
    fn publishes_to_sensor_topic() {
        let (mut mqtt, transport) = client();
        mqtt.connect().unwrap();
        mqtt.publish(&reading(1)).unwrap();

        let sent = transport.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].topic, "devices/basic_001/sensor_data");
        let json = sent[0].json();
        assert_eq!(json["temp"].as_f64(), Some(23.5));
        assert_eq!(mqtt.stats().messages_sent, 1);
        assert_eq!(mqtt.stats().bytes_sent, sent[0].payload.len() as u64);
    }

    #[test]
    fn transient_send_failure_keeps_connection() {
        let (mut mqtt, transport) = client();
        mqtt.connect().unwrap();
        transport.fail_next_send(TransportError::Timeout);

        assert!(mqtt.publish(&reading(1)).is_err());
        assert!(mqtt.is_connected());
        assert_eq!(mqtt.stats().messages_failed, 1);

        mqtt.publish(&reading(2)).unwrap();
        assert_eq!(transport.sent().len(), 1);
    }

    #[test]
    fn hard_send_failure_moves_to_error() {
        let (mut mqtt, transport) = client();
        mqtt.connect().unwrap();
        transport.fail_next_send(TransportError::Disconnected("broken pipe".into()));

        assert!(mqtt.publish(&reading(1)).is_err());
        assert_eq!(mqtt.state(), ConnectionState::Error);
        assert!(mqtt.last_error().contains("broken pipe"));
    }

    #[test]
    fn gated_publish_keeps_earlier_cause() {
        let (mut mqtt, transport) = client();
        mqtt.connect().unwrap();
        transport.fail_next_send(TransportError::Disconnected("broken pipe".into()));
        assert!(mqtt.publish(&reading(1)).is_err());

        for sequence in 2..5 {
            assert!(mqtt.publish(&reading(sequence)).unwrap_err().is_mqtt());
        }
        assert_eq!(mqtt.last_error(), "Network error: connection lost: broken pipe");

        mqtt.init().unwrap();
        assert!(mqtt.publish(&reading(5)).is_err());
        assert_eq!(mqtt.last_error(), "MQTT error: not connected");
    }

    #[test]
    fn poll_detects_broker_drop() {
        let (mut mqtt, transport) = client();
        mqtt.poll().unwrap();
        assert_eq!(transport.poll_calls(), 0);

        mqtt.connect().unwrap();
        mqtt.poll().unwrap();
        transport.drop_on_next_poll("keepalive timeout");
        assert!(mqtt.poll().is_err());
        assert_eq!(mqtt.state(), ConnectionState::Error);
        assert_eq!(transport.poll_calls(), 2);
    }

    #[test]
    fn status_goes_to_status_topic() {
        let (mut mqtt, transport) = client();
        let status = DeviceStatus::new("basic_001", "1.0.0", 1_000, 3, 85, true);
        assert!(mqtt.publish_status(&status).unwrap_err().is_mqtt());

        mqtt.connect().unwrap();
        mqtt.publish_status(&status).unwrap();
        assert_eq!(transport.sent()[0].topic, "devices/basic_001/status");
        assert_eq!(transport.sent()[0].json()["data_count"].as_u64(), Some(3));
    }

    #[test]
    fn reconnections_are_counted() {
        let (mut mqtt, _) = client();
        mqtt.connect().unwrap();
        mqtt.disconnect();
        mqtt.connect().unwrap();
        assert_eq!(mqtt.stats().reconnections, 1);
    }
}

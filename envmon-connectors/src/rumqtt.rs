//! rumqttc-backed transport
//!
//! Uses the synchronous `rumqttc::Client`. The client only queues requests;
//! nothing reaches the socket until its `Connection` is polled. Every
//! blocking step here therefore drives the connection itself, bounded by the
//! configured operation timeout:
//!
//! - `connect`: build a session, poll until CONNACK
//! - `send`: queue the publish, poll until it has been written out
//! - `poll`: drain whatever is ready without waiting (keepalive, acks)
//! - `disconnect`: queue DISCONNECT, poll until written, drop the session
//!
//! No TLS. Plain TCP to `broker_host:broker_port`.

use std::time::{Duration, Instant};

use log::{debug, trace};
use rumqttc::{
    Client, ConnectReturnCode, Connection, Event, MqttOptions, Outgoing, Packet,
    RecvTimeoutError, TryRecvError,
};

use crate::mqtt::{MqttConfig, QoS};
use crate::{Transport, TransportError};

/// Request queue depth between client and connection
const REQUEST_CAPACITY: usize = 16;

/// Events drained per `poll` call at most
const MAX_EVENTS_PER_POLL: usize = 32;

struct Session {
    client: Client,
    connection: Connection,
}

pub struct RumqttTransport {
    config: MqttConfig,
    session: Option<Session>,
}

impl RumqttTransport {
    pub fn new(config: MqttConfig) -> Result<Self, TransportError> {
        config.validate()?;
        Ok(Self {
            config,
            session: None,
        })
    }

    fn options(&self) -> MqttOptions {
        let mut options = MqttOptions::new(
            self.config.client_id.clone(),
            self.config.broker_host.clone(),
            self.config.broker_port,
        );
        options
            .set_keep_alive(Duration::from_secs(u64::from(self.config.keep_alive_secs.max(1))))
            .set_clean_session(true);
        options
    }

    /// Poll the connection until `done` accepts an event or the deadline passes
    fn drive_until<F>(&mut self, mut done: F) -> Result<(), TransportError>
    where
        F: FnMut(&Event) -> Result<bool, TransportError>,
    {
        let deadline = Instant::now() + self.config.operation_timeout();
        let session = self.session.as_mut().ok_or(TransportError::NotConnected)?;

        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return Err(TransportError::Timeout);
            }

            match session.connection.recv_timeout(remaining) {
                Ok(Ok(event)) => {
                    trace!("[MQTT] event {:?}", event);
                    if done(&event)? {
                        return Ok(());
                    }
                }
                Ok(Err(e)) => {
                    self.session = None;
                    return Err(TransportError::Disconnected(e.to_string()));
                }
                Err(RecvTimeoutError::Timeout) => return Err(TransportError::Timeout),
                Err(RecvTimeoutError::Disconnected) => {
                    self.session = None;
                    return Err(TransportError::Disconnected("event loop closed".into()));
                }
            }
        }
    }
}

impl From<QoS> for rumqttc::QoS {
    fn from(qos: QoS) -> Self {
        match qos {
            QoS::AtMostOnce => rumqttc::QoS::AtMostOnce,
            QoS::AtLeastOnce => rumqttc::QoS::AtLeastOnce,
            QoS::ExactlyOnce => rumqttc::QoS::ExactlyOnce,
        }
    }
}

impl Transport for RumqttTransport {
    fn connect(&mut self) -> Result<(), TransportError> {
        // A stale session would reconnect on its own when polled; start clean
        self.session = None;

        let (client, connection) = Client::new(self.options(), REQUEST_CAPACITY);
        self.session = Some(Session { client, connection });

        let result = self.drive_until(|event| match event {
            Event::Incoming(Packet::ConnAck(ack)) => match ack.code {
                ConnectReturnCode::Success => Ok(true),
                code => Err(TransportError::Protocol(format!(
                    "broker refused connection: {:?}",
                    code
                ))),
            },
            _ => Ok(false),
        });

        match result {
            Ok(()) => Ok(()),
            // The session never came up: nothing to keep
            Err(TransportError::Disconnected(msg)) => {
                self.session = None;
                Err(TransportError::Network(msg))
            }
            Err(e) => {
                self.session = None;
                Err(e)
            }
        }
    }

    fn disconnect(&mut self) -> Result<(), TransportError> {
        let Some(session) = self.session.as_mut() else {
            return Ok(());
        };

        let queued = session.client.try_disconnect();
        let result = match queued {
            Ok(()) => self.drive_until(|event| {
                Ok(matches!(event, Event::Outgoing(Outgoing::Disconnect)))
            }),
            Err(e) => Err(TransportError::Network(e.to_string())),
        };
        self.session = None;

        match result {
            // Broker closing the socket after DISCONNECT is the expected outcome
            Ok(()) | Err(TransportError::Disconnected(_)) => Ok(()),
            Err(e) => Err(e),
        }
    }

    fn send(&mut self, topic: &str, payload: &[u8]) -> Result<(), TransportError> {
        let qos = rumqttc::QoS::from(self.config.qos);
        let session = self.session.as_mut().ok_or(TransportError::NotConnected)?;

        session
            .client
            .try_publish(topic, qos, false, payload.to_vec())
            .map_err(|e| TransportError::Network(e.to_string()))?;

        self.drive_until(|event| Ok(matches!(event, Event::Outgoing(Outgoing::Publish(_)))))?;
        debug!("[MQTT] {} bytes written to {}", payload.len(), topic);
        Ok(())
    }

    fn poll(&mut self) -> Result<(), TransportError> {
        let Some(session) = self.session.as_mut() else {
            return Err(TransportError::NotConnected);
        };

        for _ in 0..MAX_EVENTS_PER_POLL {
            match session.connection.try_recv() {
                Ok(Ok(event)) => trace!("[MQTT] event {:?}", event),
                Ok(Err(e)) => {
                    self.session = None;
                    return Err(TransportError::Disconnected(e.to_string()));
                }
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    self.session = None;
                    return Err(TransportError::Disconnected("event loop closed".into()));
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_invalid_config() {
        let config = MqttConfig::for_device("d").with_broker("", 1883);
        assert!(matches!(
            RumqttTransport::new(config),
            Err(TransportError::Config(_))
        ));
    }

    #[test]
    fn send_without_session_is_not_connected() {
        let mut transport = RumqttTransport::new(MqttConfig::for_device("d")).unwrap();
        assert_eq!(transport.send("t", b"x"), Err(TransportError::NotConnected));
        assert_eq!(transport.poll(), Err(TransportError::NotConnected));
        assert_eq!(transport.disconnect(), Ok(()));
    }

    #[test]
    fn unreachable_broker_fails_within_timeout() {
        // Port 1 on loopback: refused immediately on any sane host
        let config = MqttConfig::for_device("d")
            .with_broker("127.0.0.1", 1)
            .with_operation_timeout(2_000);
        let mut transport = RumqttTransport::new(config).unwrap();

        let started = Instant::now();
        let err = transport.connect().unwrap_err();
        assert!(matches!(
            err,
            TransportError::Network(_) | TransportError::Timeout
        ));
        assert!(started.elapsed() < Duration::from_secs(5));
        assert_eq!(transport.send("t", b"x"), Err(TransportError::NotConnected));
    }
}

//! In-memory transport
//!
//! Connects instantly and records every payload instead of sending it.
//! Failures can be scripted per operation. Clones share state, so a test
//! keeps one handle while the client owns another.
//!
//! Also backs the device's dry-run mode, where nothing leaves the process.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use serde_json::Value;

use crate::{Transport, TransportError};

/// One recorded publish
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentMessage {
    pub topic: String,
    pub payload: Vec<u8>,
}

impl SentMessage {
    pub fn payload_str(&self) -> &str {
        std::str::from_utf8(&self.payload).unwrap_or("")
    }

    /// Payload parsed as JSON, `Null` if it is not JSON
    pub fn json(&self) -> Value {
        serde_json::from_slice(&self.payload).unwrap_or(Value::Null)
    }
}

#[derive(Debug, Default)]
struct MockState {
    link_up: bool,
    sent: Vec<SentMessage>,
    connect_failures: VecDeque<TransportError>,
    send_failures: VecDeque<TransportError>,
    poll_failures: VecDeque<TransportError>,
    connect_calls: u32,
    disconnect_calls: u32,
    poll_calls: u32,
}

#[derive(Debug, Clone, Default)]
pub struct MockTransport {
    state: Arc<Mutex<MockState>>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Make the next `connect` fail with `err`
    pub fn fail_next_connect(&self, err: TransportError) {
        self.lock().connect_failures.push_back(err);
    }

    /// Make the next `send` fail with `err`
    pub fn fail_next_send(&self, err: TransportError) {
        self.lock().send_failures.push_back(err);
    }

    /// Make the next `poll` report a broker-side disconnect
    pub fn drop_on_next_poll(&self, reason: &str) {
        self.lock()
            .poll_failures
            .push_back(TransportError::Disconnected(reason.to_string()));
    }

    pub fn sent(&self) -> Vec<SentMessage> {
        self.lock().sent.clone()
    }

    pub fn sent_to(&self, topic: &str) -> Vec<SentMessage> {
        self.lock()
            .sent
            .iter()
            .filter(|m| m.topic == topic)
            .cloned()
            .collect()
    }

    pub fn is_link_up(&self) -> bool {
        self.lock().link_up
    }

    pub fn connect_calls(&self) -> u32 {
        self.lock().connect_calls
    }

    pub fn disconnect_calls(&self) -> u32 {
        self.lock().disconnect_calls
    }

    pub fn poll_calls(&self) -> u32 {
        self.lock().poll_calls
    }
}

impl Transport for MockTransport {
    fn connect(&mut self) -> Result<(), TransportError> {
        let mut state = self.lock();
        state.connect_calls += 1;
        if let Some(err) = state.connect_failures.pop_front() {
            state.link_up = false;
            return Err(err);
        }
        state.link_up = true;
        Ok(())
    }

    fn disconnect(&mut self) -> Result<(), TransportError> {
        let mut state = self.lock();
        state.disconnect_calls += 1;
        state.link_up = false;
        Ok(())
    }

    fn send(&mut self, topic: &str, payload: &[u8]) -> Result<(), TransportError> {
        let mut state = self.lock();
        if !state.link_up {
            return Err(TransportError::NotConnected);
        }
        if let Some(err) = state.send_failures.pop_front() {
            if err.is_hard_disconnect() {
                state.link_up = false;
            }
            return Err(err);
        }
        state.sent.push(SentMessage {
            topic: topic.to_string(),
            payload: payload.to_vec(),
        });
        Ok(())
    }

    fn poll(&mut self) -> Result<(), TransportError> {
        let mut state = self.lock();
        state.poll_calls += 1;
        if let Some(err) = state.poll_failures.pop_front() {
            state.link_up = false;
            return Err(err);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn records_sends_only_while_linked() {
        let mut transport = MockTransport::new();
        assert_eq!(
            transport.send("t", b"x"),
            Err(TransportError::NotConnected)
        );

        transport.connect().unwrap();
        transport.send("t", b"{\"a\":1}").unwrap();

        let sent = transport.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].payload_str(), "{\"a\":1}");
        assert_eq!(sent[0].json()["a"].as_u64(), Some(1));
    }

    #[test]
    fn scripted_failures_are_consumed_once() {
        let mut transport = MockTransport::new();
        transport.fail_next_connect(TransportError::Timeout);

        assert_eq!(transport.connect(), Err(TransportError::Timeout));
        assert!(transport.connect().is_ok());
        assert_eq!(transport.connect_calls(), 2);
    }

    #[test]
    fn clones_share_state() {
        let handle = MockTransport::new();
        let mut owned = handle.clone();
        owned.connect().unwrap();
        assert!(handle.is_link_up());
    }
}

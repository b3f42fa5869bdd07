//! Device Events for Observability
//!
//! ## Overview
//!
//! The sample loop never prints. Every notable step is described as a
//! [`DeviceEvent`] and handed to an [`EventSink`] the host injected. This
//! keeps control flow free of formatting code and lets tests assert on what
//! happened instead of parsing captured text.
//!
//! ## Event Flow
//!
//! One loop tick that takes a sample produces, in order:
//!
//! 1. `Sampled` with the reading
//! 2. Either `Published` / `PublishFailed` (online) or `Offline` followed by
//!    `Reconnected` / `ReconnectFailed`
//! 3. Optionally `StatusPublished` / `StatusFailed`
//!
//! `ConnectionDropped` can appear at any point when polling notices the
//! broker went away or too many publishes failed in a row.
//!
//! ## Sinks
//!
//! - [`LogSink`]: forwards to the `log` facade (production)
//! - [`RecordingSink`]: keeps every event in memory (tests)

use log::{debug, info, warn};

use crate::errors::DeviceError;
use crate::sensor::SensorReading;

/// Something the device did that a host may want to observe
#[derive(Debug, Clone, PartialEq)]
pub enum DeviceEvent {
    /// A reading was taken
    Sampled(SensorReading),
    /// Reading delivered to the transport
    Published {
        /// Sequence of the published reading
        sequence: u16,
        /// Topic it was sent on
        topic: String,
    },
    /// Publish failed on a live connection
    PublishFailed {
        /// Sequence of the lost reading
        sequence: u16,
        /// Why it failed
        error: DeviceError,
    },
    /// Client was offline; reading was not sent
    Offline {
        /// Sequence of the skipped reading
        sequence: u16,
        /// The gating error returned by the publish attempt
        error: DeviceError,
    },
    /// Reconnect attempt succeeded
    Reconnected,
    /// Reconnect attempt failed
    ReconnectFailed {
        /// Why it failed
        error: DeviceError,
    },
    /// Device status delivered
    StatusPublished {
        /// Topic it was sent on
        topic: String,
    },
    /// Device status could not be delivered
    StatusFailed {
        /// Why it failed
        error: DeviceError,
    },
    /// Connection torn down by the device or the broker
    ConnectionDropped {
        /// What triggered the drop
        reason: String,
    },
    /// The loop exited
    Stopped {
        /// Readings taken over the whole run
        samples: u64,
    },
}

impl DeviceEvent {
    /// Short name for filtering and metrics
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Sampled(_) => "sampled",
            Self::Published { .. } => "published",
            Self::PublishFailed { .. } => "publish_failed",
            Self::Offline { .. } => "offline",
            Self::Reconnected => "reconnected",
            Self::ReconnectFailed { .. } => "reconnect_failed",
            Self::StatusPublished { .. } => "status_published",
            Self::StatusFailed { .. } => "status_failed",
            Self::ConnectionDropped { .. } => "connection_dropped",
            Self::Stopped { .. } => "stopped",
        }
    }
}

/// Receiver of device events
pub trait EventSink {
    /// Handle one event. Must not block.
    fn emit(&mut self, event: DeviceEvent);
}

/// Forwards events to the `log` facade
#[derive(Debug, Clone, Copy, Default)]
pub struct LogSink;

impl EventSink for LogSink {
    fn emit(&mut self, event: DeviceEvent) {
        match event {
            DeviceEvent::Sampled(r) => info!(
                "[SENSOR] seq={} T: {:.2}°C, H: {:.2}%, AQ: {:.2}",
                r.sequence, r.temperature, r.humidity, r.air_quality
            ),
            DeviceEvent::Published { sequence, topic } => {
                debug!("[MQTT] seq={} published to {}", sequence, topic)
            }
            DeviceEvent::PublishFailed { sequence, error } => {
                warn!("[MQTT] seq={} publish failed ({}): {}", sequence, error.kind(), error)
            }
            DeviceEvent::Offline { sequence, .. } => {
                warn!("[MQTT] Offline - seq={} not sent", sequence)
            }
            DeviceEvent::Reconnected => info!("[MQTT] Reconnected successfully"),
            DeviceEvent::ReconnectFailed { error } => {
                warn!("[MQTT] Reconnect failed: {}", error)
            }
            DeviceEvent::StatusPublished { topic } => {
                debug!("[MQTT] status published to {}", topic)
            }
            DeviceEvent::StatusFailed { error } => warn!("[MQTT] status publish failed: {}", error),
            DeviceEvent::ConnectionDropped { reason } => {
                warn!("[MQTT] Connection dropped: {}", reason)
            }
            DeviceEvent::Stopped { samples } => info!("Loop stopped after {} samples", samples),
        }
    }
}

/// Keeps every event in memory
#[derive(Debug, Clone, Default)]
pub struct RecordingSink {
    events: Vec<DeviceEvent>,
}

impl RecordingSink {
    /// Empty recorder
    pub fn new() -> Self {
        Self::default()
    }

    /// Everything recorded so far, oldest first
    pub fn events(&self) -> &[DeviceEvent] {
        &self.events
    }

    /// Names of recorded events, oldest first
    pub fn names(&self) -> Vec<&'static str> {
        self.events.iter().map(DeviceEvent::name).collect()
    }

    /// Drain the recorded events
    pub fn take(&mut self) -> Vec<DeviceEvent> {
        std::mem::take(&mut self.events)
    }
}

impl EventSink for RecordingSink {
    fn emit(&mut self, event: DeviceEvent) {
        self.events.push(event);
    }
}

impl<S: EventSink + ?Sized> EventSink for &mut S {
    fn emit(&mut self, event: DeviceEvent) {
        (**self).emit(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recording_sink_keeps_order() {
        let mut sink = RecordingSink::new();
        sink.emit(DeviceEvent::Reconnected);
        sink.emit(DeviceEvent::Stopped { samples: 3 });

        assert_eq!(sink.names(), vec!["reconnected", "stopped"]);
        assert_eq!(sink.take().len(), 2);
        assert!(sink.events().is_empty());
    }

    #[test]
    fn log_sink_accepts_every_event() {
        let mut sink = LogSink;
        sink.emit(DeviceEvent::Sampled(SensorReading::default()));
        sink.emit(DeviceEvent::Offline {
            sequence: 0,
            error: DeviceError::not_connected(),
        });
    }
}

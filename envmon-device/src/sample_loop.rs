//! Fixed-interval sample and publish loop
//!
//! ## Tick
//!
//! Every call to [`SampleLoop::tick`]:
//!
//! 1. Lets the MQTT client do its background work (`poll`)
//! 2. If a full sample interval has passed since the last reading, takes
//!    one reading and then
//!    - connected: publishes it; a failure is reported and the loop moves on
//!    - not connected: the publish is refused, the reading is reported as
//!      offline, and `connect()` is tried exactly once
//! 3. Publishes a status snapshot when the status interval has passed
//!
//! The sampling cadence does not depend on the publish outcome: the last
//! sample time is updated whether or not the reading reached the broker.
//! The very first tick samples immediately.
//!
//! ## Running
//!
//! [`SampleLoop::run`] ticks and then pauses for the loop delay, which is
//! much shorter than the sample interval, until the [`StopToken`] fires or
//! the configured sample limit is reached. Time and pauses both come from
//! the injected clock, so tests drive the loop with a virtual clock.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use envmon_connectors::{MqttClient, Transport};
use envmon_core::constants::{
    DEFAULT_DEVICE_ID, DEFAULT_FIRMWARE_VERSION, DEFAULT_LOOP_DELAY_MS, DEFAULT_MAX_RETRY_COUNT,
    DEFAULT_SAMPLE_INTERVAL_MS, DEFAULT_STATUS_INTERVAL_MS,
};
use envmon_core::time::elapsed_ms;
use envmon_core::{Delay, DeviceEvent, DeviceStatus, EventSink, SensorSource, TimeSource, Timestamp};
use log::debug;

use crate::config::DEFAULT_WIFI_STRENGTH;

/// Loop cadence and status content
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoopSettings {
    pub device_id: String,
    pub firmware_version: String,
    pub sample_interval_ms: u64,
    pub loop_delay_ms: u32,
    /// 0 disables status publishing
    pub status_interval_ms: u64,
    /// 0 never drops the session
    pub max_retry_count: u32,
    pub wifi_strength: u8,
    pub max_samples: Option<u64>,
}

impl Default for LoopSettings {
    fn default() -> Self {
        Self {
            device_id: DEFAULT_DEVICE_ID.to_string(),
            firmware_version: DEFAULT_FIRMWARE_VERSION.to_string(),
            sample_interval_ms: DEFAULT_SAMPLE_INTERVAL_MS,
            loop_delay_ms: DEFAULT_LOOP_DELAY_MS,
            status_interval_ms: DEFAULT_STATUS_INTERVAL_MS,
            max_retry_count: DEFAULT_MAX_RETRY_COUNT,
            wifi_strength: DEFAULT_WIFI_STRENGTH,
            max_samples: None,
        }
    }
}

/// External cancellation for [`SampleLoop::run`]
///
/// Clones share one flag; stopping any clone stops them all.
#[derive(Debug, Clone, Default)]
pub struct StopToken {
    stopped: Arc<AtomicBool>,
}

impl StopToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stop(&self) {
        self.stopped.store(true, Ordering::SeqCst);
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::SeqCst)
    }
}

/// What one tick did with the sample interval
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// Interval not yet elapsed
    Idle,
    Published { sequence: u16 },
    PublishFailed { sequence: u16 },
    /// Not connected; the reading was dropped and one reconnect tried
    Offline { sequence: u16, reconnected: bool },
}

impl TickOutcome {
    pub fn sampled(&self) -> bool {
        !matches!(self, TickOutcome::Idle)
    }
}

/// Totals for one run of the loop
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoopSummary {
    pub samples: u64,
    pub published: u64,
    pub publish_failures: u64,
    pub offline: u64,
    pub reconnects: u64,
    pub status_published: u64,
    pub connection_drops: u64,
}

pub struct SampleLoop<S, T, C, E> {
    sensor: S,
    mqtt: MqttClient<T>,
    clock: C,
    sink: E,
    settings: LoopSettings,
    started_at: Timestamp,
    last_sample_time: Option<Timestamp>,
    last_status_time: Timestamp,
    consecutive_failures: u32,
    summary: LoopSummary,
}

impl<S, T, C, E> SampleLoop<S, T, C, E>
where
    S: SensorSource,
    T: Transport,
    C: TimeSource + Delay,
    E: EventSink,
{
    pub fn new(sensor: S, mqtt: MqttClient<T>, clock: C, sink: E, settings: LoopSettings) -> Self {
        let started_at = clock.now();
        Self {
            sensor,
            mqtt,
            clock,
            sink,
            settings,
            started_at,
            last_sample_time: None,
            last_status_time: started_at,
            consecutive_failures: 0,
            summary: LoopSummary::default(),
        }
    }

    /// One iteration without the trailing pause
    pub fn tick(&mut self) -> TickOutcome {
        self.poll_connection();

        let now = self.clock.now();
        let due = match self.last_sample_time {
            None => true,
            Some(last) => elapsed_ms(last, now) >= self.settings.sample_interval_ms,
        };

        let outcome = if due {
            let outcome = self.sample();
            self.last_sample_time = Some(now);
            outcome
        } else {
            TickOutcome::Idle
        };

        self.maybe_publish_status(now);
        outcome
    }

    /// Tick until stopped or the sample limit is reached
    pub fn run(&mut self, stop: &StopToken) -> LoopSummary {
        debug!(
            "Loop running: interval {} ms, delay {} ms, clock precision {} ms",
            self.settings.sample_interval_ms,
            self.settings.loop_delay_ms,
            self.clock.precision_ms()
        );

        while !stop.is_stopped() && !self.limit_reached() {
            self.tick();
            if self.limit_reached() {
                break;
            }
            self.clock.delay_ms(self.settings.loop_delay_ms);
        }

        self.sink.emit(DeviceEvent::Stopped {
            samples: self.summary.samples,
        });
        self.summary
    }

    /// Close the broker session
    pub fn shutdown(&mut self) {
        self.mqtt.disconnect();
    }

    pub fn summary(&self) -> LoopSummary {
        self.summary
    }

    pub fn settings(&self) -> &LoopSettings {
        &self.settings
    }

    pub fn mqtt(&self) -> &MqttClient<T> {
        &self.mqtt
    }

    pub fn mqtt_mut(&mut self) -> &mut MqttClient<T> {
        &mut self.mqtt
    }

    pub fn sensor(&self) -> &S {
        &self.sensor
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    pub fn sink(&self) -> &E {
        &self.sink
    }

    pub fn sink_mut(&mut self) -> &mut E {
        &mut self.sink
    }

    fn limit_reached(&self) -> bool {
        self.settings
            .max_samples
            .map_or(false, |max| self.summary.samples >= max)
    }

    fn poll_connection(&mut self) {
        let was_connected = self.mqtt.is_connected();
        if let Err(e) = self.mqtt.poll() {
            if was_connected && !self.mqtt.is_connected() {
                self.summary.connection_drops += 1;
                self.sink.emit(DeviceEvent::ConnectionDropped {
                    reason: e.to_string(),
                });
            } else {
                debug!("[MQTT] poll: {}", e);
            }
        }
    }

    fn sample(&mut self) -> TickOutcome {
        let reading = self.sensor.read();
        let sequence = reading.sequence;
        self.summary.samples += 1;
        self.sink.emit(DeviceEvent::Sampled(reading));

        let was_connected = self.mqtt.is_connected();
        match self.mqtt.publish(&reading) {
            Ok(()) => {
                self.consecutive_failures = 0;
                self.summary.published += 1;
                self.sink.emit(DeviceEvent::Published {
                    sequence,
                    topic: self.mqtt.config().topics.sensor_data.clone(),
                });
                TickOutcome::Published { sequence }
            }
            Err(error) if was_connected => {
                self.summary.publish_failures += 1;
                self.sink.emit(DeviceEvent::PublishFailed { sequence, error });
                self.note_publish_failure();
                TickOutcome::PublishFailed { sequence }
            }
            Err(error) => {
                // Refused by the client while offline: report and try once to come back
                self.summary.offline += 1;
                self.sink.emit(DeviceEvent::Offline { sequence, error });
                let reconnected = self.reconnect();
                TickOutcome::Offline {
                    sequence,
                    reconnected,
                }
            }
        }
    }

    fn reconnect(&mut self) -> bool {
        match self.mqtt.connect() {
            Ok(()) => {
                self.consecutive_failures = 0;
                self.summary.reconnects += 1;
                self.sink.emit(DeviceEvent::Reconnected);
                true
            }
            Err(error) => {
                self.sink.emit(DeviceEvent::ReconnectFailed { error });
                false
            }
        }
    }

    fn note_publish_failure(&mut self) {
        self.consecutive_failures += 1;
        let limit = self.settings.max_retry_count;

        if limit > 0 && self.consecutive_failures >= limit && self.mqtt.is_connected() {
            let reason = format!("{} consecutive publish failures", self.consecutive_failures);
            self.mqtt.disconnect();
            self.consecutive_failures = 0;
            self.summary.connection_drops += 1;
            self.sink.emit(DeviceEvent::ConnectionDropped { reason });
        }
    }

    fn maybe_publish_status(&mut self, now: Timestamp) {
        let interval = self.settings.status_interval_ms;
        if interval == 0 || elapsed_ms(self.last_status_time, now) < interval {
            return;
        }
        self.last_status_time = now;

        if !self.mqtt.is_connected() {
            debug!("[MQTT] Offline - status not sent");
            return;
        }

        let status = DeviceStatus::new(
            self.settings.device_id.clone(),
            self.settings.firmware_version.clone(),
            elapsed_ms(self.started_at, now),
            self.summary.samples,
            self.settings.wifi_strength,
            true,
        );
        match self.mqtt.publish_status(&status) {
            Ok(()) => {
                self.summary.status_published += 1;
                self.sink.emit(DeviceEvent::StatusPublished {
                    topic: self.mqtt.config().topics.status.clone(),
                });
            }
            Err(error) => self.sink.emit(DeviceEvent::StatusFailed { error }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use envmon_connectors::mock::MockTransport;
    use envmon_connectors::{MqttConfig, TransportError};
    use envmon_core::{ConnectionState, MockTimeSource, RecordingSink, SensorEmulator};
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    type TestLoop = SampleLoop<
        SensorEmulator<StdRng, MockTimeSource>,
        MockTransport,
        MockTimeSource,
        RecordingSink,
    >;

    fn settings() -> LoopSettings {
        LoopSettings {
            device_id: "basic_001".into(),
            sample_interval_ms: 1_000,
            loop_delay_ms: 100,
            status_interval_ms: 0,
            ..LoopSettings::default()
        }
    }

    fn build(settings: LoopSettings) -> (TestLoop, MockTransport, MockTimeSource) {
        let clock = MockTimeSource::new(1_700_000_000_000);
        let transport = MockTransport::new();
        let sensor = SensorEmulator::with_parts(StdRng::seed_from_u64(7), clock.clone());
        let mqtt = MqttClient::new(MqttConfig::for_device("basic_001"), transport.clone());
        let sample_loop =
            SampleLoop::new(sensor, mqtt, clock.clone(), RecordingSink::new(), settings);
        (sample_loop, transport, clock)
    }

    #[test]
    fn first_tick_samples_then_waits_for_interval() {
        let (mut sample_loop, _, clock) = build(settings());
        assert!(sample_loop.tick().sampled());
        assert_eq!(sample_loop.tick(), TickOutcome::Idle);

        clock.advance(999);
        assert_eq!(sample_loop.tick(), TickOutcome::Idle);
        clock.advance(1);
        assert!(sample_loop.tick().sampled());
        assert_eq!(sample_loop.summary().samples, 2);
    }

    #[test]
    fn offline_tick_reconnects_once() {
        let (mut sample_loop, transport, _) = build(settings());

        let outcome = sample_loop.tick();
        assert_eq!(
            outcome,
            TickOutcome::Offline {
                sequence: 0,
                reconnected: true
            }
        );
        assert_eq!(transport.connect_calls(), 1);
        assert!(transport.sent().is_empty());
        assert_eq!(
            sample_loop.sink().names(),
            vec!["sampled", "offline", "reconnected"]
        );
    }

    #[test]
    fn failed_reconnect_is_not_fatal() {
        let (mut sample_loop, transport, clock) = build(settings());
        transport.fail_next_connect(TransportError::Network("refused".into()));

        let outcome = sample_loop.tick();
        assert_eq!(
            outcome,
            TickOutcome::Offline {
                sequence: 0,
                reconnected: false
            }
        );
        assert_eq!(sample_loop.mqtt().state(), ConnectionState::Error);

        clock.advance(1_000);
        assert_eq!(
            sample_loop.tick(),
            TickOutcome::Offline {
                sequence: 1,
                reconnected: true
            }
        );
    }

    #[test]
    fn cadence_ignores_publish_failures() {
        let (mut sample_loop, transport, clock) = build(settings());
        sample_loop.tick();

        clock.advance(1_000);
        transport.fail_next_send(TransportError::Timeout);
        assert_eq!(
            sample_loop.tick(),
            TickOutcome::PublishFailed { sequence: 1 }
        );

        // Next reading is still a full interval away
        clock.advance(500);
        assert_eq!(sample_loop.tick(), TickOutcome::Idle);
        clock.advance(500);
        assert_eq!(sample_loop.tick(), TickOutcome::Published { sequence: 2 });
    }

    #[test]
    fn retry_limit_drops_connection() {
        let (mut sample_loop, transport, clock) = build(LoopSettings {
            max_retry_count: 2,
            ..settings()
        });
        sample_loop.tick();

        for _ in 0..2 {
            clock.advance(1_000);
            transport.fail_next_send(TransportError::Timeout);
            sample_loop.tick();
        }

        assert_eq!(sample_loop.mqtt().state(), ConnectionState::Disconnected);
        assert_eq!(sample_loop.summary().connection_drops, 1);
        assert_eq!(sample_loop.sink().names().last(), Some(&"connection_dropped"));

        clock.advance(1_000);
        assert_eq!(
            sample_loop.tick(),
            TickOutcome::Offline {
                sequence: 3,
                reconnected: true
            }
        );
    }

    #[test]
    fn broker_drop_is_reported_from_poll() {
        let (mut sample_loop, transport, _) = build(settings());
        sample_loop.tick();
        assert!(sample_loop.mqtt().is_connected());

        transport.drop_on_next_poll("keepalive timeout");
        assert_eq!(sample_loop.tick(), TickOutcome::Idle);
        assert_eq!(sample_loop.mqtt().state(), ConnectionState::Error);
        assert!(matches!(
            sample_loop.sink().events().last(),
            Some(DeviceEvent::ConnectionDropped { reason }) if reason.contains("keepalive")
        ));
    }

    #[test]
    fn run_honours_sample_limit() {
        let (mut sample_loop, _, clock) = build(LoopSettings {
            max_samples: Some(5),
            ..settings()
        });
        let start = clock.now();

        let summary = sample_loop.run(&StopToken::new());
        assert_eq!(summary.samples, 5);
        assert_eq!(summary.offline, 1);
        assert_eq!(summary.published, 4);
        // Four full intervals between five samples, no trailing pause
        assert_eq!(clock.now() - start, 4_000);
        assert_eq!(sample_loop.sink().names().last(), Some(&"stopped"));
    }

    #[test]
    fn stopped_token_prevents_any_tick() {
        let (mut sample_loop, transport, _) = build(settings());
        let stop = StopToken::new();
        stop.clone().stop();

        let summary = sample_loop.run(&stop);
        assert_eq!(summary.samples, 0);
        assert_eq!(transport.connect_calls(), 0);
    }

    #[test]
    fn shutdown_disconnects() {
        let (mut sample_loop, transport, _) = build(settings());
        sample_loop.tick();
        sample_loop.shutdown();
        assert!(!transport.is_link_up());
        assert_eq!(sample_loop.mqtt().state(), ConnectionState::Disconnected);
    }
}

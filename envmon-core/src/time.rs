//! Time management for the device
//!
//! Provides clock abstraction to handle different time sources:
//! - Wall clock (reading timestamps, RNG seeding)
//! - Monotonic clock (sample interval scheduling)
//! - Virtual clock (tests; delays advance time instead of sleeping)
//!
//! Scheduling never sleeps directly. The loop asks a [`Delay`] for a pause,
//! so swapping in [`MockTimeSource`] makes a run of the loop instantaneous
//! and fully deterministic.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::constants::MS_PER_SECOND;

/// Timestamp in milliseconds since epoch (or since start for monotonic sources)
pub type Timestamp = u64;

/// Source of time for the system
pub trait TimeSource {
    /// Get current timestamp in milliseconds
    fn now(&self) -> Timestamp;

    /// Check if this source provides wall clock time (vs monotonic)
    fn is_wall_clock(&self) -> bool;

    /// Get precision in milliseconds
    fn precision_ms(&self) -> u32;

    /// Current time in whole seconds, truncated to 32 bits
    fn now_seconds(&self) -> u32 {
        (self.now() / MS_PER_SECOND) as u32
    }
}

/// Blocking pause between loop iterations
pub trait Delay {
    /// Pause for `ms` milliseconds
    fn delay_ms(&mut self, ms: u32);
}

/// Monotonic time source
///
/// Starts at 0 when created, always increases. Sleeps with the OS scheduler.
#[derive(Debug, Clone)]
pub struct MonotonicTime {
    start: Instant,
}

impl MonotonicTime {
    /// Start counting from now
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
        }
    }
}

impl Default for MonotonicTime {
    fn default() -> Self {
        Self::new()
    }
}

impl TimeSource for MonotonicTime {
    fn now(&self) -> Timestamp {
        self.start.elapsed().as_millis() as Timestamp
    }

    fn is_wall_clock(&self) -> bool {
        false
    }

    fn precision_ms(&self) -> u32 {
        1
    }
}

impl Delay for MonotonicTime {
    fn delay_ms(&mut self, ms: u32) {
        std::thread::sleep(Duration::from_millis(u64::from(ms)));
    }
}

/// System wall clock (milliseconds since the Unix epoch)
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemTime;

impl TimeSource for SystemTime {
    fn now(&self) -> Timestamp {
        use std::time::{SystemTime as StdSystemTime, UNIX_EPOCH};

        StdSystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_millis() as Timestamp
    }

    fn is_wall_clock(&self) -> bool {
        true
    }

    fn precision_ms(&self) -> u32 {
        1
    }
}

/// Controllable time source for testing
///
/// Clones share the same underlying counter, so a test can keep one handle
/// and hand another to the code under test. `delay_ms` advances the clock.
#[derive(Debug, Clone, Default)]
pub struct MockTimeSource {
    millis: Arc<AtomicU64>,
}

impl MockTimeSource {
    /// Start at `timestamp` milliseconds
    pub fn new(timestamp: Timestamp) -> Self {
        Self {
            millis: Arc::new(AtomicU64::new(timestamp)),
        }
    }

    /// Jump to an absolute time
    pub fn set(&self, timestamp: Timestamp) {
        self.millis.store(timestamp, Ordering::SeqCst);
    }

    /// Move time forward
    pub fn advance(&self, ms: u64) {
        self.millis.fetch_add(ms, Ordering::SeqCst);
    }
}

impl TimeSource for MockTimeSource {
    fn now(&self) -> Timestamp {
        self.millis.load(Ordering::SeqCst)
    }

    fn is_wall_clock(&self) -> bool {
        false
    }

    fn precision_ms(&self) -> u32 {
        1
    }
}

impl Delay for MockTimeSource {
    fn delay_ms(&mut self, ms: u32) {
        self.advance(u64::from(ms));
    }
}

/// Milliseconds elapsed between two timestamps, zero if the clock went backwards
pub fn elapsed_ms(earlier: Timestamp, later: Timestamp) -> u64 {
    later.saturating_sub(earlier)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mock_time_advances() {
        let time = MockTimeSource::new(1000);
        assert_eq!(time.now(), 1000);

        time.advance(500);
        assert_eq!(time.now(), 1500);
    }

    #[test]
    fn mock_clones_share_state() {
        let time = MockTimeSource::new(0);
        let mut handle = time.clone();

        handle.delay_ms(250);
        assert_eq!(time.now(), 250);

        time.set(10_000);
        assert_eq!(handle.now(), 10_000);
        assert_eq!(handle.now_seconds(), 10);
    }

    #[test]
    fn system_time_is_after_2020() {
        let now = SystemTime.now_seconds();
        assert!(now > 1_577_836_800);
        assert!(SystemTime.is_wall_clock());
    }

    #[test]
    fn elapsed_saturates() {
        assert_eq!(elapsed_ms(1000, 1500), 500);
        assert_eq!(elapsed_ms(1500, 1000), 0);
    }
}

//! Core data model and sensor emulation for the environment monitor
//!
//! Produces synthetic environmental readings for a device that has no real
//! sensor attached, and defines the types the publish side consumes.
//!
//! Key constraints:
//! - Readings stay inside plausible, bounded ranges
//! - Every reading carries a 16-bit sequence number for loss detection
//! - No I/O in the read path; reading never fails
//!
//! ```no_run
//! use envmon_core::{SensorEmulator, SensorSource};
//!
//! let mut sensor = SensorEmulator::init().unwrap();
//!
//! let reading = sensor.read();
//! assert_eq!(reading.sequence, 0);
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod constants;
pub mod errors;
pub mod events;
pub mod sensor;
pub mod sequence;
pub mod status;
pub mod time;

// Public API
pub use errors::{DeviceError, DeviceResult};
pub use events::{DeviceEvent, EventSink, LogSink, RecordingSink};
pub use sensor::{
    MeasurementRange, RegionProfile, SensorEmulator, SensorReading, SensorSource,
    REGION_PROFILES,
};
pub use sequence::{SequenceGap, SequenceTracker};
pub use status::{ConnectionState, DeviceStatus};
pub use time::{Delay, MockTimeSource, MonotonicTime, SystemTime, TimeSource, Timestamp};

/// Crate version, reported in device status messages by default
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn version_exists() {
        assert!(!VERSION.is_empty());
    }
}

//! Sensor readings and the emulated sensor
//!
//! ## Reading Model
//!
//! A reading bundles the three environmental measurements the device
//! reports with the time it was taken and a sequence number:
//!
//! ```text
//! SensorReading
//! ├── temperature  °C
//! ├── humidity     % RH
//! ├── air_quality  unitless score (higher is cleaner)
//! ├── timestamp    seconds since epoch
//! └── sequence     u16, +1 per reading, wraps 65535 → 0
//! ```
//!
//! The sequence number lets a receiver spot dropped or reordered messages
//! without any acknowledgement channel back to the device. See
//! [`crate::sequence`] for the receiving side.
//!
//! ## Emulation
//!
//! There is no physical sensor. [`SensorEmulator`] draws values from one of
//! eight climatic [`RegionProfile`]s per reading so the data stays plausible.

mod emulator;
mod region;

pub use emulator::SensorEmulator;
pub use region::{global_bounds, MeasurementRange, RegionProfile, REGION_PROFILES};

use serde::{Deserialize, Serialize};

/// One environmental sample. Immutable once produced.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SensorReading {
    /// Air temperature (°C)
    pub temperature: f32,
    /// Relative humidity (%)
    pub humidity: f32,
    /// Air quality score
    pub air_quality: f32,
    /// Seconds since the Unix epoch
    pub timestamp: u32,
    /// Per-reading counter for loss detection
    pub sequence: u16,
}

impl Default for SensorReading {
    fn default() -> Self {
        Self {
            temperature: 0.0,
            humidity: 0.0,
            air_quality: 0.0,
            timestamp: 0,
            sequence: 0,
        }
    }
}

/// Anything that produces readings on demand
pub trait SensorSource {
    /// Take one reading. Never fails for emulated sensors.
    fn read(&mut self) -> SensorReading;
}

//! Region-based sensor emulator

use log::debug;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use super::region::{MeasurementRange, RegionProfile, REGION_PROFILES};
use super::{SensorReading, SensorSource};
use crate::errors::{DeviceError, DeviceResult};
use crate::time::{SystemTime, TimeSource};

/// Synthetic environmental sensor
///
/// Each reading picks one region uniformly at random and draws all three
/// values from that region's closed ranges, so a single reading never mixes
/// climates. The sequence counter starts at 0 and wraps at 65536.
pub struct SensorEmulator<R = StdRng, C = SystemTime> {
    rng: R,
    clock: C,
    sequence: u16,
}

impl SensorEmulator<StdRng, SystemTime> {
    /// Create the emulator, seeding randomness from the wall clock.
    ///
    /// Always succeeds today; returns a result so a hardware-backed sensor
    /// can fail initialization behind the same call.
    pub fn init() -> DeviceResult<Self> {
        let seed = SystemTime.now();
        debug!("Sensor emulator initialized (seed {})", seed);
        Ok(Self::with_parts(StdRng::seed_from_u64(seed), SystemTime))
    }
}

impl<R: Rng, C: TimeSource> SensorEmulator<R, C> {
    /// Build from an explicit random source and clock
    pub fn with_parts(rng: R, clock: C) -> Self {
        Self {
            rng,
            clock,
            sequence: 0,
        }
    }

    /// Start the sequence counter at `sequence` instead of 0
    pub fn starting_at(mut self, sequence: u16) -> Self {
        self.sequence = sequence;
        self
    }

    /// Sequence number the next reading will carry
    pub fn next_sequence(&self) -> u16 {
        self.sequence
    }

    /// Take a reading and report which region it was drawn from
    pub fn read_with_region(&mut self) -> (SensorReading, &'static RegionProfile) {
        let region = &REGION_PROFILES[self.rng.gen_range(0..REGION_PROFILES.len())];

        let reading = SensorReading {
            temperature: draw(&mut self.rng, &region.temperature),
            humidity: draw(&mut self.rng, &region.humidity),
            air_quality: draw(&mut self.rng, &region.air_quality),
            timestamp: self.clock.now_seconds(),
            sequence: self.sequence,
        };
        self.sequence = self.sequence.wrapping_add(1);

        debug!(
            "[{}] T: {:.1}°C, H: {:.1}%, AQ: {:.1}, seq {}",
            region.label,
            reading.temperature,
            reading.humidity,
            reading.air_quality,
            reading.sequence
        );

        (reading, region)
    }

    /// Write a reading into caller-provided storage.
    ///
    /// Fails with `InvalidArgument` when no target is given; the counter does
    /// not advance in that case.
    pub fn read_into(&mut self, target: Option<&mut SensorReading>) -> DeviceResult<()> {
        let target = target.ok_or(DeviceError::InvalidArgument("missing output reading"))?;
        *target = self.read_with_region().0;
        Ok(())
    }

    /// Temperature of a fresh reading. Consumes a sequence number.
    pub fn temperature(&mut self) -> f32 {
        self.read().temperature
    }

    /// Humidity of a fresh reading. Consumes a sequence number.
    pub fn humidity(&mut self) -> f32 {
        self.read().humidity
    }

    /// Air quality of a fresh reading. Consumes a sequence number.
    pub fn air_quality(&mut self) -> f32 {
        self.read().air_quality
    }
}

impl<R: Rng, C: TimeSource> SensorSource for SensorEmulator<R, C> {
    fn read(&mut self) -> SensorReading {
        self.read_with_region().0
    }
}

fn draw<R: Rng>(rng: &mut R, range: &MeasurementRange) -> f32 {
    rng.gen_range(range.min..=range.max)
}

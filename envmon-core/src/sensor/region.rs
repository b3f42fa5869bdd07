//! Climatic region profiles
//!
//! Each profile describes autumn/winter conditions for one broad region:
//! the temperature, humidity and air quality a sensor there would plausibly
//! report. The table is fixed at compile time and never mutated.
//!
//! Ranges overlap on purpose between neighbouring regions; a reading can
//! match several profiles, but it is always generated from exactly one.

use serde::Serialize;

/// Closed interval `[min, max]`
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct MeasurementRange {
    /// Lower bound, inclusive
    pub min: f32,
    /// Upper bound, inclusive
    pub max: f32,
}

impl MeasurementRange {
    /// Create a range. `min` must not exceed `max`.
    pub const fn new(min: f32, max: f32) -> Self {
        Self { min, max }
    }

    /// True if `value` lies inside the closed interval
    pub fn contains(&self, value: f32) -> bool {
        value >= self.min && value <= self.max
    }

    /// Smallest range covering both
    pub fn union(&self, other: &Self) -> Self {
        Self {
            min: self.min.min(other.min),
            max: self.max.max(other.max),
        }
    }
}

/// Plausible measurement ranges for one climatic zone
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RegionProfile {
    /// Human-readable region name
    pub label: &'static str,
    /// Temperature range (°C)
    pub temperature: MeasurementRange,
    /// Relative humidity range (%)
    pub humidity: MeasurementRange,
    /// Air quality score range
    pub air_quality: MeasurementRange,
}

impl RegionProfile {
    /// True if all three values fall inside this profile's ranges
    pub fn contains(&self, temperature: f32, humidity: f32, air_quality: f32) -> bool {
        self.temperature.contains(temperature)
            && self.humidity.contains(humidity)
            && self.air_quality.contains(air_quality)
    }
}

const fn profile(
    label: &'static str,
    temperature: (f32, f32),
    humidity: (f32, f32),
    air_quality: (f32, f32),
) -> RegionProfile {
    RegionProfile {
        label,
        temperature: MeasurementRange::new(temperature.0, temperature.1),
        humidity: MeasurementRange::new(humidity.0, humidity.1),
        air_quality: MeasurementRange::new(air_quality.0, air_quality.1),
    }
}

/// The eight fixed region profiles
pub static REGION_PROFILES: [RegionProfile; 8] = [
    // Warm and humid
    profile("south-coast", (18.0, 30.0), (70.0, 100.0), (65.0, 100.0)),
    // Mild and moist
    profile("east-lowlands", (12.0, 25.0), (65.0, 100.0), (70.0, 100.0)),
    // Dry and cool
    profile("north-plain", (5.0, 20.0), (30.0, 70.0), (60.0, 100.0)),
    // Cold and dry
    profile("northeast", (-15.0, 10.0), (25.0, 60.0), (80.0, 100.0)),
    // Dry, windy
    profile("northwest", (0.0, 20.0), (20.0, 50.0), (75.0, 100.0)),
    // Large day/night swing
    profile("far-west-basin", (-5.0, 25.0), (15.0, 50.0), (85.0, 100.0)),
    // Cold, strong sun
    profile("high-plateau", (-10.0, 15.0), (25.0, 55.0), (90.0, 100.0)),
    // Humid, foggy
    profile("southwest-basin", (8.0, 20.0), (75.0, 100.0), (55.0, 100.0)),
];

/// Envelope of every profile: `(temperature, humidity, air_quality)`
pub fn global_bounds() -> (MeasurementRange, MeasurementRange, MeasurementRange) {
    let first = &REGION_PROFILES[0];
    REGION_PROFILES.iter().skip(1).fold(
        (first.temperature, first.humidity, first.air_quality),
        |(t, h, a), p| {
            (
                t.union(&p.temperature),
                h.union(&p.humidity),
                a.union(&p.air_quality),
            )
        },
    )
}

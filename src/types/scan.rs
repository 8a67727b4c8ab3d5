//! Scan types
//!
//! A [`Scan`] is one decoded sweep of the sensor's 270° field of view:
//! ordered distance samples plus angular metadata. Scans are immutable after
//! decode and may be read concurrently without copying.

use serde::{Deserialize, Serialize};
use std::sync::OnceLock;
use std::time::Instant;

/// Angle of sample index 0, degrees
pub const SWEEP_START_DEG: f64 = -135.0;

/// Full sweep width, degrees
pub const SWEEP_RANGE_DEG: f64 = 270.0;

/// A single distance measurement
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    /// Distance in meters. The device reports 0 for out-of-range or faulted
    /// returns; that marker is preserved here, not coerced.
    pub distance_m: f64,
    /// Step count from the -135° edge of the sweep
    pub angle_index: u16,
}

impl Sample {
    /// Whether this sample carries a usable distance
    pub fn is_valid(&self) -> bool {
        self.distance_m.is_finite() && self.distance_m > 0.0
    }
}

/// One decoded sweep
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scan {
    /// Samples ordered by angle, -135° first
    pub samples: Vec<Sample>,
    /// Angular step between adjacent samples, degrees
    pub angular_resolution_deg: f64,
    /// Capture-local monotonic timestamp, microseconds since process start
    pub timestamp_us: u64,
}

impl Scan {
    /// Number of samples
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// Check if the scan is empty
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Angle of the sample at `index`, degrees
    pub fn angle_deg(&self, index: usize) -> f64 {
        SWEEP_START_DEG + index as f64 * self.angular_resolution_deg
    }

    /// Valid samples as Cartesian points, sensor at the origin
    pub fn cartesian(&self) -> Vec<(f64, f64)> {
        self.samples
            .iter()
            .enumerate()
            .filter(|(_, s)| s.is_valid())
            .map(|(i, s)| {
                let angle = self.angle_deg(i).to_radians();
                (s.distance_m * angle.cos(), s.distance_m * angle.sin())
            })
            .collect()
    }
}

/// Monotonic timestamp in microseconds since the first call in this process
pub fn monotonic_us() -> u64 {
    static EPOCH: OnceLock<Instant> = OnceLock::new();
    EPOCH.get_or_init(Instant::now).elapsed().as_micros() as u64
}

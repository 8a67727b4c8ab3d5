//! Obstacle-zone classification
//!
//! [`Classifier::classify`] is a pure function of one scan: identical input
//! always yields identical output. Thresholds are injected at construction
//! and immutable for the classifier's lifetime.

use super::scan::Scan;
use serde::{Deserialize, Serialize};

/// Overall proximity zone for a whole scan, four tiers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OverallZone {
    Clear,
    Caution,
    Warning,
    Danger,
}

/// Per-sample zone, two tiers plus the invalid marker
///
/// Coarser than [`OverallZone`] on purpose: the per-sample scheme matches
/// the observed device-side coloring and is kept as-is rather than unified
/// with the four-tier overall scheme.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SampleZone {
    Safe,
    Caution,
    Danger,
    /// Out-of-range or faulted return, excluded from the nearest-distance
    /// minimum
    Invalid,
}

/// Zone distance thresholds in meters
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ZoneThresholds {
    pub danger_m: f64,
    pub warning_m: f64,
    pub caution_m: f64,
}

impl Default for ZoneThresholds {
    fn default() -> Self {
        Self {
            danger_m: 0.5,
            warning_m: 1.0,
            caution_m: 2.0,
        }
    }
}

/// Classification derived from one scan
#[derive(Debug, Clone, PartialEq)]
pub struct ZoneClassification {
    /// Distance of the nearest valid return, `f64::INFINITY` when the scan
    /// held none
    pub nearest_m: f64,
    pub overall: OverallZone,
    /// Aligned index-for-index with the scan's samples
    pub per_sample: Vec<SampleZone>,
}

/// Proximity classifier with fixed thresholds
pub struct Classifier {
    thresholds: ZoneThresholds,
}

impl Classifier {
    pub fn new(thresholds: ZoneThresholds) -> Self {
        Self { thresholds }
    }

    pub fn thresholds(&self) -> ZoneThresholds {
        self.thresholds
    }

    /// Classify one scan
    ///
    /// Zone boundaries are strict less-than: a return exactly at a threshold
    /// falls into the farther zone. An empty or all-invalid scan is `Clear`
    /// with an infinite nearest distance, never an error.
    pub fn classify(&self, scan: &Scan) -> ZoneClassification {
        let t = self.thresholds;
        let mut nearest = f64::INFINITY;
        let mut per_sample = Vec::with_capacity(scan.len());

        for sample in &scan.samples {
            if !sample.is_valid() {
                per_sample.push(SampleZone::Invalid);
                continue;
            }
            let d = sample.distance_m;
            if d < nearest {
                nearest = d;
            }
            per_sample.push(if d < t.warning_m {
                SampleZone::Danger
            } else if d < t.caution_m {
                SampleZone::Caution
            } else {
                SampleZone::Safe
            });
        }

        let overall = if nearest < t.danger_m {
            OverallZone::Danger
        } else if nearest < t.warning_m {
            OverallZone::Warning
        } else if nearest < t.caution_m {
            OverallZone::Caution
        } else {
            OverallZone::Clear
        };

        ZoneClassification {
            nearest_m: nearest,
            overall,
            per_sample,
        }
    }
}

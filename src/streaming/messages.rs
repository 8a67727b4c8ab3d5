//! Stream message types
//!
//! Everything crossing the server/client boundary is a [`StreamMessage`]
//! variant. The enum tag doubles as the format version: a payload that does
//! not decode as a known variant is rejected instead of being interpreted,
//! and new revisions get new variants so server and client can evolve
//! independently. No generic object serialization crosses this boundary.

use crate::types::{OverallZone, Sample, SampleZone, Scan, ZoneClassification};
use serde::{Deserialize, Serialize};

/// Version-tagged stream message
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub enum StreamMessage {
    /// Classified scan, revision 1
    ScanV1(ScanFrame),
}

/// One classified scan as delivered to consumers
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ScanFrame {
    /// Monotonically increasing capture sequence number, assigned by the
    /// server; consumers use gaps to detect dropped frames
    pub sequence: u64,
    /// Capture-local monotonic timestamp, microseconds
    pub timestamp_us: u64,
    /// Angular step between samples, degrees
    pub angular_resolution_deg: f64,
    /// Distance samples ordered by angle
    pub samples: Vec<Sample>,
    /// Nearest valid return; `None` when the scan held no valid sample
    /// (in-process sentinel is `f64::INFINITY`, which JSON cannot carry)
    pub nearest_m: Option<f64>,
    pub overall: OverallZone,
    /// Aligned index-for-index with `samples`
    pub sample_zones: Vec<SampleZone>,
}

impl ScanFrame {
    /// Build a frame from a scan and its classification
    pub fn new(sequence: u64, scan: &Scan, zones: &ZoneClassification) -> Self {
        Self {
            sequence,
            timestamp_us: scan.timestamp_us,
            angular_resolution_deg: scan.angular_resolution_deg,
            samples: scan.samples.clone(),
            nearest_m: zones.nearest_m.is_finite().then_some(zones.nearest_m),
            overall: zones.overall,
            sample_zones: zones.per_sample.clone(),
        }
    }

    /// Nearest distance with the infinity sentinel restored
    pub fn nearest_distance(&self) -> f64 {
        self.nearest_m.unwrap_or(f64::INFINITY)
    }
}

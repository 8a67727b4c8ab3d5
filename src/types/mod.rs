//! Core data types: scans and proximity zones

mod scan;
mod zone;

pub use scan::{monotonic_us, Sample, Scan, SWEEP_RANGE_DEG, SWEEP_START_DEG};
pub use zone::{Classifier, OverallZone, SampleZone, ZoneClassification, ZoneThresholds};

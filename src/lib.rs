//! DrishtiIO - streaming pipeline for SICK TiM laser rangefinders
//!
//! This library brings a TiM-series sensor into its continuous-output state,
//! extracts complete STX/ETX telegrams from the raw byte stream, decodes them
//! into distance scans, classifies each scan by proximity, and publishes the
//! classified scans to remote consumers over a length-prefixed TCP stream.
//!
//! Data flow:
//!
//! ```text
//! Transport -> TelegramFramer -> ScanDecoder -> Classifier -> ScanServer
//!                                                                 |
//!                                                    TCP (length-prefixed)
//!                                                                 |
//!                                                            ScanClient
//! ```
//!
//! CLI entry points, rendering and device discovery live outside this crate
//! and consume it through [`ScanServer`], [`ScanClient`] and the
//! [`transport::Transport`] trait.

pub mod config;
pub mod error;
pub mod protocol;
pub mod streaming;
pub mod transport;
pub mod types;

// Re-export commonly used types
pub use config::AppConfig;
pub use error::{Error, Result};
pub use protocol::{
    AngularResolution, HandshakeController, ScanDecoder, SensorSession, SessionState,
    TelegramFramer,
};
pub use streaming::{ScanClient, ScanFrame, ScanServer, StreamMessage, WireFormat};
pub use types::{
    Classifier, OverallZone, Sample, SampleZone, Scan, ZoneClassification, ZoneThresholds,
};

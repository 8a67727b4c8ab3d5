//! Configuration for the DrishtiIO pipeline
//!
//! Loads configuration from a TOML file. Zone thresholds and the sensor
//! link parameters are process-wide configuration injected at construction;
//! nothing here is global mutable state.

use crate::error::{Error, Result};
use crate::protocol::AngularResolution;
use crate::streaming::WireFormat;
use crate::types::ZoneThresholds;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;

/// Top-level application configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AppConfig {
    pub sensor: SensorConfig,
    pub zones: ZoneConfig,
    pub streaming: StreamingConfig,
    pub logging: LoggingConfig,
}

/// Sensor link and protocol configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SensorConfig {
    /// Link mode: "serial" or "tcp"
    pub mode: String,
    /// Serial port path (serial mode)
    pub serial_port: String,
    /// Serial baud rate
    pub baud_rate: u32,
    /// Sensor or tunnel endpoint (tcp mode), e.g. "168.254.15.1:2112"
    pub tcp_address: String,
    /// Angular resolution in degrees: 0.33, 0.5 or 1.0
    pub angular_resolution: f64,
    /// Bounded wait for each handshake acknowledgement
    pub handshake_timeout_ms: u64,
    /// Transport read timeout
    pub read_timeout_ms: u64,
    /// Framer accumulator ceiling
    pub framer_max_buffer_bytes: usize,
}

impl SensorConfig {
    /// Resolve the configured resolution against the supported table
    pub fn resolution(&self) -> Result<AngularResolution> {
        AngularResolution::from_degrees(self.angular_resolution).ok_or_else(|| {
            Error::InvalidParameter(format!(
                "angular_resolution {} (supported: 0.33, 0.5, 1.0)",
                self.angular_resolution
            ))
        })
    }

    pub fn handshake_timeout(&self) -> Duration {
        Duration::from_millis(self.handshake_timeout_ms)
    }

    pub fn read_timeout(&self) -> Duration {
        Duration::from_millis(self.read_timeout_ms)
    }
}

/// Zone threshold configuration, meters
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ZoneConfig {
    pub danger_m: f64,
    pub warning_m: f64,
    pub caution_m: f64,
}

impl ZoneConfig {
    pub fn thresholds(&self) -> ZoneThresholds {
        ZoneThresholds {
            danger_m: self.danger_m,
            warning_m: self.warning_m,
            caution_m: self.caution_m,
        }
    }
}

/// Consumer streaming configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StreamingConfig {
    /// TCP bind address for consumer connections
    ///
    /// Examples:
    /// - `0.0.0.0:5600` - All interfaces
    /// - `127.0.0.1:5600` - Localhost only
    pub bind_address: String,
    /// Wire format: "postcard" or "json"
    pub wire_format: String,
    /// A consumer whose send stalls past this is disconnected
    pub consumer_send_timeout_ms: u64,
    /// Scans buffered per consumer before it counts as stalled
    pub consumer_queue_scans: usize,
}

impl StreamingConfig {
    pub fn format(&self) -> Result<WireFormat> {
        WireFormat::from_name(&self.wire_format).ok_or_else(|| {
            Error::InvalidParameter(format!(
                "wire_format {:?} (supported: postcard, json)",
                self.wire_format
            ))
        })
    }

    pub fn consumer_send_timeout(&self) -> Duration {
        Duration::from_millis(self.consumer_send_timeout_ms)
    }
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,
    /// Log output (stdout, stderr, or file path)
    pub output: String,
}

impl AppConfig {
    /// Load configuration from TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        let config: AppConfig = toml::from_str(&contents)?;
        Ok(config)
    }

    /// Save configuration to TOML file
    pub fn to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let contents = toml::to_string_pretty(self)?;
        fs::write(path, contents)?;
        Ok(())
    }

    /// Default configuration for a TiM561 on its USB link
    ///
    /// Suitable for testing and development; deployments should use a TOML
    /// configuration file.
    pub fn tim561_defaults() -> Self {
        Self {
            sensor: SensorConfig {
                mode: "serial".to_string(),
                serial_port: "/dev/ttyACM0".to_string(),
                baud_rate: 115_200,
                tcp_address: "168.254.15.1:2112".to_string(),
                angular_resolution: 1.0,
                handshake_timeout_ms: 1000,
                read_timeout_ms: 2000,
                framer_max_buffer_bytes: 64 * 1024,
            },
            zones: ZoneConfig {
                danger_m: 0.5,
                warning_m: 1.0,
                caution_m: 2.0,
            },
            streaming: StreamingConfig {
                bind_address: "0.0.0.0:5600".to_string(),
                wire_format: "postcard".to_string(),
                consumer_send_timeout_ms: 200,
                consumer_queue_scans: 16,
            },
            logging: LoggingConfig {
                level: "info".to_string(),
                output: "stdout".to_string(),
            },
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self::tim561_defaults()
    }
}

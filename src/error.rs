//! Error types for DrishtiIO

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

/// DrishtiIO error types
///
/// Errors that invalidate the sensor session (`Transport`, `Handshake`) are
/// surfaced to the caller, which owns the retry policy. `Framing` and
/// `Decode` are local to a single read or telegram and the capture loop
/// absorbs them. `Consumer` never propagates beyond the connection it
/// belongs to.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Serial port error
    #[error("Serial port error: {0}")]
    Serial(#[from] serialport::Error),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Link-level failure, fatal to the session
    #[error("Transport error: {0}")]
    Transport(String),

    /// Telegram framing failure, recoverable by resetting the accumulator
    #[error("Framing error: {0}")]
    Framing(String),

    /// Login or configuration failure during session establishment
    #[error("Handshake error: {0}")]
    Handshake(String),

    /// Single malformed telegram, dropped without producing a scan
    #[error("Decode error: {0}")]
    Decode(String),

    /// Slow or broken downstream consumer
    #[error("Consumer error: {0}")]
    Consumer(String),

    /// Wire format encode/decode failure
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Configuration file parse error
    #[error("Configuration error: {0}")]
    Config(#[from] toml::de::Error),

    /// Configuration file write error
    #[error("Configuration write error: {0}")]
    ConfigWrite(#[from] toml::ser::Error),

    /// Invalid parameter
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    /// A worker thread panicked
    #[error("Thread panicked")]
    ThreadPanic,
}

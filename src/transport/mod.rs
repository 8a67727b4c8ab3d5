//! Transport layer for I/O abstraction
//!
//! A transport moves raw bytes to and from the sensor with no knowledge of
//! telegram boundaries: a single read may return part of a telegram, several
//! telegrams back to back, or nothing at all. Framing is the job of
//! [`crate::protocol::TelegramFramer`].

use crate::error::Result;

mod mock;
mod serial;
mod tcp;

pub use mock::MockTransport;
pub use serial::SerialTransport;
pub use tcp::TcpTransport;

/// Transport trait for sensor communication
///
/// Reads are blocking up to the timeout configured at construction; timeout
/// expiry returns `Ok(0)`, not an error. A hard link failure (disconnect,
/// write error) returns an error and invalidates the session.
pub trait Transport: Send {
    /// Read available bytes into `buffer`, returning the number read.
    ///
    /// Returns `Ok(0)` when the read timeout expires with nothing received.
    fn read(&mut self, buffer: &mut [u8]) -> Result<usize>;

    /// Write data, returning the number of bytes accepted
    fn write(&mut self, data: &[u8]) -> Result<usize>;

    /// Flush any pending writes (blocking until complete)
    fn flush(&mut self) -> Result<()>;

    /// Check how many bytes are ready to read, if the link can tell
    fn available(&mut self) -> Result<usize> {
        Ok(0) // Default implementation
    }

    /// Write all of `data`, looping over short writes
    fn write_all(&mut self, data: &[u8]) -> Result<()> {
        let mut written = 0;
        while written < data.len() {
            written += self.write(&data[written..])?;
        }
        Ok(())
    }
}

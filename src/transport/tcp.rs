//! TCP transport implementation
//!
//! Covers the sensor's native Ethernet port as well as any reliable byte
//! pipe that ends in a socket, such as a forwarded port over an SSH tunnel.
//! The tunnel itself is established by the environment; this transport only
//! assumes a connected stream.

use super::Transport;
use crate::error::{Error, Result};
use std::io::{Read, Write};
use std::net::{TcpStream, ToSocketAddrs};
use std::time::Duration;

/// TCP transport for the sensor's Ethernet link or a local tunnel endpoint
pub struct TcpTransport {
    stream: TcpStream,
}

impl TcpTransport {
    /// Connect to the sensor (or tunnel endpoint)
    ///
    /// # Arguments
    /// * `addr` - e.g. "168.254.15.1:2112" or "127.0.0.1:2112" for a tunnel
    /// * `read_timeout` - Per-read blocking window; expiry reads as 0 bytes
    pub fn connect<A: ToSocketAddrs>(addr: A, read_timeout: Duration) -> Result<Self> {
        let stream = TcpStream::connect(addr)?;
        stream.set_read_timeout(Some(read_timeout))?;
        stream.set_nodelay(true)?;

        if let Ok(peer) = stream.peer_addr() {
            log::info!("Connected to sensor at {}", peer);
        }

        Ok(TcpTransport { stream })
    }
}

impl Transport for TcpTransport {
    fn read(&mut self, buffer: &mut [u8]) -> Result<usize> {
        match self.stream.read(buffer) {
            // A zero-length read on TCP means the peer closed the connection,
            // which is fatal to the session, unlike a quiet timeout.
            Ok(0) => Err(Error::Transport("sensor closed the connection".into())),
            Ok(n) => Ok(n),
            Err(e)
                if e.kind() == std::io::ErrorKind::TimedOut
                    || e.kind() == std::io::ErrorKind::WouldBlock =>
            {
                Ok(0)
            }
            Err(e) => Err(e.into()),
        }
    }

    fn write(&mut self, data: &[u8]) -> Result<usize> {
        Ok(self.stream.write(data)?)
    }

    fn flush(&mut self) -> Result<()> {
        self.stream.flush()?;
        Ok(())
    }
}

//! Scan stream client
//!
//! Connects to a [`super::ScanServer`], reads length-prefixed messages
//! (looping on partial reads until each payload is complete), and yields
//! classified scans as a lazy sequence. A sequence ends when the server
//! closes the connection; a fresh connection starts a fresh sequence with a
//! reset expectation on the capture sequence number.

use crate::error::{Error, Result};
use crate::streaming::messages::{ScanFrame, StreamMessage};
use crate::streaming::wire::{Serializer, WireFormat, FRAME_HEADER_LEN, MAX_FRAME_BYTES};
use std::io::Read;
use std::net::{TcpStream, ToSocketAddrs};
use std::time::Duration;

/// Consumer-side connection to the scan stream
pub struct ScanClient {
    stream: TcpStream,
    serializer: Serializer,
    /// Reusable payload buffer (avoids an allocation per frame)
    read_buffer: Vec<u8>,
    next_sequence: Option<u64>,
    dropped: u64,
}

impl ScanClient {
    /// Connect to a scan server
    pub fn connect<A: ToSocketAddrs>(addr: A, format: WireFormat) -> Result<Self> {
        let stream = TcpStream::connect(addr)?;
        stream.set_nodelay(true)?;
        if let Ok(peer) = stream.peer_addr() {
            log::info!("Connected to scan stream at {}", peer);
        }
        Ok(Self {
            stream,
            serializer: Serializer::new(format),
            read_buffer: Vec::with_capacity(8192),
            next_sequence: None,
            dropped: 0,
        })
    }

    /// Bound how long a read may block; `None` blocks indefinitely
    pub fn set_read_timeout(&mut self, timeout: Option<Duration>) -> Result<()> {
        self.stream.set_read_timeout(timeout)?;
        Ok(())
    }

    /// Receive the next classified scan
    ///
    /// Returns `Ok(None)` when the server closes the stream cleanly (EOF at
    /// a frame boundary). Frames dropped by the server show up as sequence
    /// gaps and are tallied in [`dropped`](Self::dropped).
    pub fn recv(&mut self) -> Result<Option<ScanFrame>> {
        let mut header = [0u8; FRAME_HEADER_LEN];
        match self.stream.read_exact(&mut header) {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
                log::info!("Scan stream closed by server");
                return Ok(None);
            }
            Err(e) => return Err(Error::Io(e)),
        }

        let len = u32::from_be_bytes(header) as usize;
        if len > MAX_FRAME_BYTES {
            // An absurd length means a corrupt or hostile stream; close
            // rather than allocate for it.
            return Err(Error::Framing(format!(
                "frame of {} bytes exceeds ceiling",
                len
            )));
        }

        self.read_buffer.clear();
        self.read_buffer.resize(len, 0);
        self.stream.read_exact(&mut self.read_buffer)?;

        let frame = match self.serializer.deserialize(&self.read_buffer)? {
            StreamMessage::ScanV1(frame) => frame,
        };

        if let Some(expected) = self.next_sequence {
            if frame.sequence > expected {
                let missed = frame.sequence - expected;
                self.dropped += missed;
                log::warn!(
                    "Missed {} frame(s): expected sequence {}, got {}",
                    missed,
                    expected,
                    frame.sequence
                );
            }
        }
        self.next_sequence = Some(frame.sequence + 1);

        Ok(Some(frame))
    }

    /// Frames known to have been missed on this connection
    pub fn dropped(&self) -> u64 {
        self.dropped
    }

    /// Lazy iterator over incoming frames
    ///
    /// Ends on clean EOF; errors are yielded and the caller decides whether
    /// to keep pulling.
    pub fn frames(&mut self) -> Frames<'_> {
        Frames { client: self }
    }
}

/// Iterator over a client's incoming frames
pub struct Frames<'a> {
    client: &'a mut ScanClient,
}

impl Iterator for Frames<'_> {
    type Item = Result<ScanFrame>;

    fn next(&mut self) -> Option<Self::Item> {
        match self.client.recv() {
            Ok(Some(frame)) => Some(Ok(frame)),
            Ok(None) => None,
            Err(e) => Some(Err(e)),
        }
    }
}

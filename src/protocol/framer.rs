//! Telegram framing
//!
//! The transport has no message boundaries: one read may carry a fragment of
//! a telegram, several telegrams, or line noise. The framer owns a growable
//! byte accumulator, discards anything ahead of the first start delimiter,
//! and emits only complete STX..ETX spans with the delimiters stripped.
//! Per-read parsing without this buffer would corrupt frames split across
//! reads or merge adjacent frames into one malformed parse.

use super::commands::{ETX, STX};
use crate::error::{Error, Result};

/// Default accumulator ceiling, roughly 10x the largest scan telegram
pub const DEFAULT_MAX_BUFFER: usize = 64 * 1024;

/// Buffered extractor of complete telegrams from a raw byte stream
pub struct TelegramFramer {
    buf: Vec<u8>,
    max_buffer: usize,
}

impl TelegramFramer {
    /// Create a framer with the given accumulator ceiling in bytes
    pub fn new(max_buffer: usize) -> Self {
        Self {
            buf: Vec::with_capacity(4096),
            max_buffer,
        }
    }

    /// Append freshly read bytes to the accumulator
    ///
    /// Noise ahead of the first start delimiter is dropped immediately. If
    /// the accumulator outgrows the ceiling with no end delimiter in sight
    /// (a runaway stream), the buffer is reset and a framing error returned;
    /// the transport itself stays usable.
    pub fn push(&mut self, bytes: &[u8]) -> Result<()> {
        self.buf.extend_from_slice(bytes);
        self.discard_leading_noise();

        if self.buf.len() > self.max_buffer && !self.buf.contains(&ETX) {
            let buffered = self.buf.len();
            self.buf.clear();
            return Err(Error::Framing(format!(
                "oversized telegram: {} bytes buffered without end delimiter",
                buffered
            )));
        }
        Ok(())
    }

    /// Pop the earliest complete telegram, delimiters stripped
    ///
    /// Call repeatedly after each `push`; a single read may complete zero,
    /// one or many telegrams.
    pub fn next(&mut self) -> Option<Vec<u8>> {
        self.discard_leading_noise();
        if self.buf.first() != Some(&STX) {
            return None;
        }
        let end = self.buf.iter().position(|&b| b == ETX)?;
        let telegram = self.buf[1..end].to_vec();
        self.buf.drain(..=end);
        Some(telegram)
    }

    /// Drop all buffered bytes
    pub fn reset(&mut self) {
        self.buf.clear();
    }

    /// Bytes currently buffered (incomplete telegram tail)
    pub fn buffered(&self) -> usize {
        self.buf.len()
    }

    fn discard_leading_noise(&mut self) {
        match self.buf.iter().position(|&b| b == STX) {
            Some(0) => {}
            Some(i) => {
                self.buf.drain(..i);
            }
            None => self.buf.clear(),
        }
    }
}

impl Default for TelegramFramer {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_BUFFER)
    }
}

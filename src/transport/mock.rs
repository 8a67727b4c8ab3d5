//! Mock transport for testing
//!
//! Reads are scripted as discrete chunks so tests can reproduce the
//! arbitrary chunking a real link delivers: one `read` returns at most one
//! scripted chunk, and an empty script reads as a timeout (0 bytes).

use super::Transport;
use crate::error::Result;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

/// Mock transport for unit testing
///
/// Clones share the same buffers, so a test can keep a handle for injecting
/// reads while the component under test owns another.
#[derive(Clone)]
pub struct MockTransport {
    inner: Arc<Mutex<MockTransportInner>>,
}

struct MockTransportInner {
    read_chunks: VecDeque<Vec<u8>>,
    write_buffer: Vec<u8>,
}

impl MockTransport {
    /// Create a new mock transport
    pub fn new() -> Self {
        MockTransport {
            inner: Arc::new(Mutex::new(MockTransportInner {
                read_chunks: VecDeque::new(),
                write_buffer: Vec::new(),
            })),
        }
    }

    /// Queue one chunk to be returned by a single future read
    pub fn push_read(&self, chunk: &[u8]) {
        let mut inner = self.inner.lock().unwrap();
        inner.read_chunks.push_back(chunk.to_vec());
    }

    /// Queue a byte sequence split into fixed-size read chunks
    pub fn push_read_chunked(&self, data: &[u8], chunk_size: usize) {
        let mut inner = self.inner.lock().unwrap();
        for chunk in data.chunks(chunk_size.max(1)) {
            inner.read_chunks.push_back(chunk.to_vec());
        }
    }

    /// Get all written data
    pub fn written(&self) -> Vec<u8> {
        let inner = self.inner.lock().unwrap();
        inner.write_buffer.clone()
    }

    /// Clear written data
    pub fn clear_written(&self) {
        let mut inner = self.inner.lock().unwrap();
        inner.write_buffer.clear();
    }
}

impl Transport for MockTransport {
    fn read(&mut self, buffer: &mut [u8]) -> Result<usize> {
        let mut inner = self.inner.lock().unwrap();
        let Some(mut chunk) = inner.read_chunks.pop_front() else {
            return Ok(0); // scripted silence reads as a timeout
        };

        let n = chunk.len().min(buffer.len());
        buffer[..n].copy_from_slice(&chunk[..n]);
        if n < chunk.len() {
            chunk.drain(..n);
            inner.read_chunks.push_front(chunk);
        }
        Ok(n)
    }

    fn write(&mut self, data: &[u8]) -> Result<usize> {
        let mut inner = self.inner.lock().unwrap();
        inner.write_buffer.extend_from_slice(data);
        Ok(data.len())
    }

    fn flush(&mut self) -> Result<()> {
        Ok(())
    }

    fn available(&mut self) -> Result<usize> {
        let inner = self.inner.lock().unwrap();
        Ok(inner.read_chunks.iter().map(Vec::len).sum())
    }
}

impl Default for MockTransport {
    fn default() -> Self {
        Self::new()
    }
}

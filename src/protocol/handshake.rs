//! Handshake state machine and streaming session
//!
//! Login, configuration and stream start run as a linear state machine:
//!
//! ```text
//! Disconnected -> LoggingIn -> Configuring -> Streaming
//! ```
//!
//! The first two transitions each wait for an acknowledgement telegram; the
//! stream-start command is fire-and-forget and the first scan telegram
//! confirms it. The device needs settling time between commands, so a fixed
//! minimum gap is enforced between consecutive sends. No retries happen
//! here: a failed handshake surfaces to the caller, which owns backoff and
//! reconnection policy.

use super::commands::{self, AngularResolution};
use super::decoder::ScanDecoder;
use super::framer::TelegramFramer;
use crate::error::{Error, Result};
use crate::transport::Transport;
use crate::types::Scan;
use std::time::{Duration, Instant};

/// Minimum gap between consecutive command sends. The device drops commands
/// sent faster than this; it is a protocol constant, not a tunable.
const COMMAND_GAP: Duration = Duration::from_millis(300);

/// Read buffer size per transport read
const READ_CHUNK: usize = 8192;

/// Idle sleep while waiting on a quiet link
const POLL_SLEEP: Duration = Duration::from_millis(1);

/// Handshake/stream state of one sensor connection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Disconnected,
    LoggingIn,
    Configuring,
    Streaming,
}

/// Drives the login/configure/start sequence over a transport
pub struct HandshakeController<T: Transport> {
    transport: T,
    framer: TelegramFramer,
    resolution: AngularResolution,
    timeout: Duration,
    state: SessionState,
    last_command_at: Option<Instant>,
}

impl<T: Transport> HandshakeController<T> {
    /// Create a controller in the `Disconnected` state
    ///
    /// # Arguments
    /// * `timeout` - Bounded wait for each acknowledgement
    /// * `max_buffer` - Framer accumulator ceiling in bytes
    pub fn new(
        transport: T,
        resolution: AngularResolution,
        timeout: Duration,
        max_buffer: usize,
    ) -> Self {
        Self {
            transport,
            framer: TelegramFramer::new(max_buffer),
            resolution,
            timeout,
            state: SessionState::Disconnected,
            last_command_at: None,
        }
    }

    /// Current handshake state
    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Run the handshake to the `Streaming` state
    ///
    /// On any failure the state reverts to `Disconnected` and the error is
    /// returned; nothing further is sent.
    pub fn establish(&mut self) -> Result<()> {
        match self.run_sequence() {
            Ok(()) => Ok(()),
            Err(e) => {
                self.state = SessionState::Disconnected;
                Err(e)
            }
        }
    }

    /// Consume the controller, yielding the streaming session
    ///
    /// Fails unless [`establish`](Self::establish) completed.
    pub fn into_session(self) -> Result<SensorSession<T>> {
        if self.state != SessionState::Streaming {
            return Err(Error::Handshake(format!(
                "session not established (state {:?})",
                self.state
            )));
        }
        Ok(SensorSession {
            transport: self.transport,
            framer: self.framer,
            decoder: ScanDecoder::new(self.resolution),
        })
    }

    fn run_sequence(&mut self) -> Result<()> {
        self.state = SessionState::LoggingIn;
        self.send_command(&commands::login_command())?;
        let params = self.wait_for_ack("SetAccessMode")?;
        if params.first().map(String::as_str) != Some("1") {
            return Err(Error::Handshake(format!(
                "access mode login refused: {:?}",
                params
            )));
        }
        log::debug!("Logged in as authorized client");

        self.state = SessionState::Configuring;
        self.send_command(&commands::scan_config_command(self.resolution))?;
        let params = self.wait_for_ack("mLMPsetscancfg")?;
        if let Some(code) = params.first() {
            if code != "0" {
                return Err(Error::Handshake(format!(
                    "scan configuration rejected with code {}",
                    code
                )));
            }
        }
        log::debug!(
            "Scan configuration accepted ({:.2}° resolution)",
            self.resolution.degrees()
        );

        // No acknowledgement for the stream enable; the first scan telegram
        // confirms it.
        self.send_command(&commands::start_scan_command())?;
        self.state = SessionState::Streaming;
        log::info!(
            "Sensor streaming at {:.2}° resolution ({} samples per sweep)",
            self.resolution.degrees(),
            self.resolution.expected_samples()
        );
        Ok(())
    }

    fn send_command(&mut self, telegram: &[u8]) -> Result<()> {
        if let Some(last) = self.last_command_at {
            let elapsed = last.elapsed();
            if elapsed < COMMAND_GAP {
                std::thread::sleep(COMMAND_GAP - elapsed);
            }
        }
        self.transport.write_all(telegram)?;
        self.transport.flush()?;
        self.last_command_at = Some(Instant::now());
        Ok(())
    }

    /// Wait for an `sAN <command> ...` reply, returning its parameter tokens
    fn wait_for_ack(&mut self, command: &str) -> Result<Vec<String>> {
        let deadline = Instant::now() + self.timeout;
        let mut chunk = [0u8; READ_CHUNK];

        loop {
            while let Some(telegram) = self.framer.next() {
                match parse_ack(&telegram, command) {
                    Some(params) => return Ok(params),
                    None => {
                        log::debug!(
                            "Ignoring unrelated telegram during handshake ({} bytes)",
                            telegram.len()
                        );
                    }
                }
            }

            if Instant::now() >= deadline {
                return Err(Error::Handshake(format!(
                    "{}: no acknowledgement within {:?}",
                    command, self.timeout
                )));
            }

            match self.transport.read(&mut chunk)? {
                0 => std::thread::sleep(POLL_SLEEP),
                n => self.framer.push(&chunk[..n])?,
            }
        }
    }
}

/// Parse an acknowledgement telegram for `command`, returning its parameters
fn parse_ack(telegram: &[u8], command: &str) -> Option<Vec<String>> {
    let text = std::str::from_utf8(telegram).ok()?;
    let mut tokens = text.split_ascii_whitespace();
    if tokens.next()? != "sAN" {
        return None;
    }
    if tokens.next()? != command {
        return None;
    }
    Some(tokens.map(str::to_string).collect())
}

/// A sensor connection in the `Streaming` state
///
/// Owns the transport and framer; read by exactly one capture loop. The
/// session ends when the transport fails or the session value is dropped.
pub struct SensorSession<T: Transport> {
    transport: T,
    framer: TelegramFramer,
    decoder: ScanDecoder,
}

impl<T: Transport> SensorSession<T> {
    /// Read the next scan, waiting up to `timeout`
    ///
    /// Returns `Ok(None)` when the link stays quiet past the timeout.
    /// Non-scan telegrams (late acknowledgements) are skipped silently.
    /// `Decode` and `Framing` errors refer to a single telegram or buffer
    /// reset; the session remains usable and the caller may simply continue.
    /// Transport errors are fatal to the session.
    pub fn read_scan(&mut self, timeout: Duration) -> Result<Option<Scan>> {
        let deadline = Instant::now() + timeout;
        let mut chunk = [0u8; READ_CHUNK];

        loop {
            while let Some(telegram) = self.framer.next() {
                if !ScanDecoder::is_scan_telegram(&telegram) {
                    log::debug!("Skipping non-scan telegram during streaming");
                    continue;
                }
                return self.decoder.decode(&telegram).map(Some);
            }

            if Instant::now() >= deadline {
                return Ok(None);
            }

            match self.transport.read(&mut chunk)? {
                0 => std::thread::sleep(POLL_SLEEP),
                n => self.framer.push(&chunk[..n])?,
            }
        }
    }
}

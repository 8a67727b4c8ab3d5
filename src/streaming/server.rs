//! Scan stream server
//!
//! Owns one sensor session end to end: a dedicated capture thread runs the
//! handshake, then loops transport read -> framer -> decoder -> classifier,
//! encodes each classified scan once, and fans the shared bytes out to every
//! connected consumer. An accept thread owns the listener, and every
//! consumer gets its own bounded queue plus sender thread, so a stalled
//! consumer is disconnected instead of ever back-pressuring the capture
//! loop or its neighbors.

use crate::config::AppConfig;
use crate::error::{Error, Result};
use crate::protocol::HandshakeController;
use crate::streaming::messages::{ScanFrame, StreamMessage};
use crate::streaming::wire::{self, Serializer};
use crate::transport::Transport;
use crate::types::Classifier;
use crossbeam_queue::ArrayQueue;
use std::io::Write;
use std::net::{Shutdown, SocketAddr, TcpListener, TcpStream};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::Duration;

/// Idle sleep for polling loops
const POLL_SLEEP: Duration = Duration::from_millis(1);

/// Accept-loop sleep when no connection is pending
const ACCEPT_SLEEP: Duration = Duration::from_millis(10);

/// One connected consumer as seen by the capture thread
struct ConsumerHandle {
    addr: SocketAddr,
    queue: Arc<ArrayQueue<Arc<Vec<u8>>>>,
    alive: Arc<AtomicBool>,
}

type ConsumerRegistry = Arc<Mutex<Vec<ConsumerHandle>>>;

/// Streaming server for classified scans
///
/// The sensor pipeline runs whether or not any consumer is attached.
/// Session-fatal errors (handshake failure, transport loss) end the capture
/// thread and surface from [`join`](Self::join); reconnection policy belongs
/// to the caller.
pub struct ScanServer {
    consumers: ConsumerRegistry,
    shutdown: Arc<AtomicBool>,
    local_addr: SocketAddr,
    accept_thread: Option<JoinHandle<()>>,
    capture_thread: Option<JoinHandle<Result<()>>>,
}

impl ScanServer {
    /// Start the server: bind the consumer listener, then bring up the
    /// sensor on its own capture thread
    pub fn start<T: Transport + 'static>(transport: T, config: &AppConfig) -> Result<Self> {
        let resolution = config.sensor.resolution()?;
        let serializer = Serializer::new(config.streaming.format()?);

        let listener = TcpListener::bind(&config.streaming.bind_address)?;
        listener.set_nonblocking(true)?;
        let local_addr = listener.local_addr()?;
        log::info!("Scan stream listening on {}", local_addr);

        let consumers: ConsumerRegistry = Arc::new(Mutex::new(Vec::new()));
        let shutdown = Arc::new(AtomicBool::new(false));

        let accept_thread = {
            let consumers = Arc::clone(&consumers);
            let shutdown = Arc::clone(&shutdown);
            let send_timeout = config.streaming.consumer_send_timeout();
            let queue_scans = config.streaming.consumer_queue_scans.max(1);
            thread::Builder::new()
                .name("consumer-accept".to_string())
                .spawn(move || {
                    accept_loop(listener, consumers, shutdown, send_timeout, queue_scans);
                })
                .map_err(|e| Error::Consumer(format!("failed to spawn accept thread: {}", e)))?
        };

        let capture_thread = {
            let consumers = Arc::clone(&consumers);
            let shutdown = Arc::clone(&shutdown);
            let classifier = Classifier::new(config.zones.thresholds());
            let handshake_timeout = config.sensor.handshake_timeout();
            let read_timeout = config.sensor.read_timeout();
            let max_buffer = config.sensor.framer_max_buffer_bytes;
            thread::Builder::new()
                .name("scan-capture".to_string())
                .spawn(move || {
                    let result = capture_loop(
                        transport,
                        resolution,
                        handshake_timeout,
                        read_timeout,
                        max_buffer,
                        classifier,
                        serializer,
                        consumers,
                        Arc::clone(&shutdown),
                    );
                    if let Err(ref e) = result {
                        log::error!("Capture loop ended: {}", e);
                    }
                    // Capture ending means no more frames; wake everything up.
                    shutdown.store(true, Ordering::Relaxed);
                    result
                })
                .map_err(|e| Error::Transport(format!("failed to spawn capture thread: {}", e)))?
        };

        Ok(Self {
            consumers,
            shutdown,
            local_addr,
            accept_thread: Some(accept_thread),
            capture_thread: Some(capture_thread),
        })
    }

    /// Address the consumer listener is bound to
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Number of currently connected consumers
    pub fn consumer_count(&self) -> usize {
        let mut list = self
            .consumers
            .lock()
            .unwrap_or_else(|e| e.into_inner());
        list.retain(|c| c.alive.load(Ordering::Relaxed));
        list.len()
    }

    /// Whether the capture thread is still running
    pub fn is_running(&self) -> bool {
        !self.shutdown.load(Ordering::Relaxed)
    }

    /// Request shutdown; threads unblock within their bounded timeouts
    pub fn stop(&self) {
        self.shutdown.store(true, Ordering::Relaxed);
    }

    /// Block until the capture thread ends, returning its session-fatal
    /// error if it had one
    pub fn join(mut self) -> Result<()> {
        match self.capture_thread.take() {
            Some(handle) => handle.join().map_err(|_| Error::ThreadPanic)?,
            None => Ok(()),
        }
    }
}

impl Drop for ScanServer {
    fn drop(&mut self) {
        self.stop();
        if let Some(handle) = self.accept_thread.take() {
            let _ = handle.join();
        }
        if let Some(handle) = self.capture_thread.take() {
            let _ = handle.join();
        }
    }
}

/// Accept consumers and give each one a queue plus sender thread
fn accept_loop(
    listener: TcpListener,
    consumers: ConsumerRegistry,
    shutdown: Arc<AtomicBool>,
    send_timeout: Duration,
    queue_scans: usize,
) {
    while !shutdown.load(Ordering::Relaxed) {
        match listener.accept() {
            Ok((stream, addr)) => {
                match register_consumer(stream, addr, &shutdown, send_timeout, queue_scans) {
                    Ok(handle) => {
                        log::info!("Consumer connected: {}", addr);
                        let mut list = consumers.lock().unwrap_or_else(|e| e.into_inner());
                        list.push(handle);
                    }
                    Err(e) => log::warn!("Rejecting consumer {}: {}", addr, e),
                }
            }
            Err(ref e) if e.kind() == std::io::ErrorKind::WouldBlock => {
                thread::sleep(ACCEPT_SLEEP);
            }
            Err(e) => {
                log::error!("Error accepting consumer connection: {}", e);
            }
        }
    }
    log::info!("Consumer accept thread exiting");
}

fn register_consumer(
    stream: TcpStream,
    addr: SocketAddr,
    shutdown: &Arc<AtomicBool>,
    send_timeout: Duration,
    queue_scans: usize,
) -> Result<ConsumerHandle> {
    stream.set_nonblocking(false)?;
    stream.set_nodelay(true)?;
    // A send stalling past this bound marks the consumer as too slow.
    stream.set_write_timeout(Some(send_timeout))?;

    let queue: Arc<ArrayQueue<Arc<Vec<u8>>>> = Arc::new(ArrayQueue::new(queue_scans));
    let alive = Arc::new(AtomicBool::new(true));

    {
        let queue = Arc::clone(&queue);
        let alive = Arc::clone(&alive);
        let shutdown = Arc::clone(shutdown);
        thread::Builder::new()
            .name(format!("consumer-send-{}", addr))
            .spawn(move || consumer_send_loop(stream, addr, queue, alive, shutdown))
            .map_err(|e| Error::Consumer(format!("failed to spawn sender: {}", e)))?;
    }

    Ok(ConsumerHandle { addr, queue, alive })
}

/// Per-consumer sender: drains the queue into the socket
///
/// Runs until the consumer disconnects, a send stalls past the write
/// timeout, or the server shuts down. The thread owns the stream; nothing
/// else ever writes to it.
fn consumer_send_loop(
    mut stream: TcpStream,
    addr: SocketAddr,
    queue: Arc<ArrayQueue<Arc<Vec<u8>>>>,
    alive: Arc<AtomicBool>,
    shutdown: Arc<AtomicBool>,
) {
    loop {
        if !alive.load(Ordering::Relaxed) {
            break;
        }
        match queue.pop() {
            Some(frame) => {
                if let Err(e) = stream.write_all(&frame) {
                    log::debug!("Consumer {} send failed: {}", addr, e);
                    alive.store(false, Ordering::Relaxed);
                    break;
                }
            }
            None => {
                if shutdown.load(Ordering::Relaxed) {
                    break;
                }
                thread::sleep(POLL_SLEEP);
            }
        }
    }
    alive.store(false, Ordering::Relaxed);
    let _ = stream.shutdown(Shutdown::Both);
    log::info!("Consumer sender for {} exiting", addr);
}

/// Sensor capture loop: handshake, then read/decode/classify/publish
#[allow(clippy::too_many_arguments)]
fn capture_loop<T: Transport>(
    transport: T,
    resolution: crate::protocol::AngularResolution,
    handshake_timeout: Duration,
    read_timeout: Duration,
    max_buffer: usize,
    classifier: Classifier,
    serializer: Serializer,
    consumers: ConsumerRegistry,
    shutdown: Arc<AtomicBool>,
) -> Result<()> {
    let mut controller =
        HandshakeController::new(transport, resolution, handshake_timeout, max_buffer);
    controller.establish()?;
    let mut session = controller.into_session()?;

    let mut sequence: u64 = 0;
    let mut decode_errors: u64 = 0;

    while !shutdown.load(Ordering::Relaxed) {
        let scan = match session.read_scan(read_timeout) {
            Ok(Some(scan)) => scan,
            Ok(None) => {
                log::warn!("No scan within {:?}", read_timeout);
                continue;
            }
            Err(Error::Decode(e)) => {
                decode_errors += 1;
                log::warn!("Dropped malformed telegram: {}", e);
                continue;
            }
            Err(Error::Framing(e)) => {
                // The framer already reset its accumulator.
                log::warn!("Framing recovered: {}", e);
                continue;
            }
            Err(e) => return Err(e),
        };

        let zones = classifier.classify(&scan);
        let frame = ScanFrame::new(sequence, &scan, &zones);
        sequence += 1;

        let payload = match serializer.serialize(&StreamMessage::ScanV1(frame)) {
            Ok(p) => p,
            Err(e) => {
                log::error!("Failed to serialize scan: {}", e);
                continue;
            }
        };
        let framed = Arc::new(wire::frame(&payload)?);
        fan_out(&consumers, &framed);

        if sequence % 100 == 0 {
            log::debug!(
                "Published {} scans ({} decode errors, {} consumers)",
                sequence,
                decode_errors,
                consumers.lock().unwrap_or_else(|e| e.into_inner()).len()
            );
        }
    }

    log::info!(
        "Capture loop stopping after {} scans ({} decode errors)",
        sequence,
        decode_errors
    );
    Ok(())
}

/// Offer one encoded frame to every live consumer
///
/// A consumer whose queue is full has stalled past its bounded buffer and
/// is disconnected here; its sender thread notices through the alive flag.
fn fan_out(consumers: &ConsumerRegistry, frame: &Arc<Vec<u8>>) {
    let mut list = consumers.lock().unwrap_or_else(|e| e.into_inner());
    list.retain(|consumer| {
        if !consumer.alive.load(Ordering::Relaxed) {
            log::info!("Consumer {} disconnected", consumer.addr);
            return false;
        }
        if consumer.queue.push(Arc::clone(frame)).is_err() {
            log::warn!(
                "Consumer {} cannot keep up ({} frames queued), disconnecting",
                consumer.addr,
                consumer.queue.len()
            );
            consumer.alive.store(false, Ordering::Relaxed);
            return false;
        }
        true
    });
}

//! Serial transport and the background ingestion loop.
//!
//! A scanner writes one JSON object per line. The loop reads those lines on a
//! dedicated thread and forwards parsed records over a bounded channel; it
//! never touches the registry itself.

use crate::reading::ReadingPayload;
use log::{debug, info, warn};
use std::io::{self, Read};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::mpsc;

/// Baud rate of the scanner's UART.
pub const BAUD_RATE: u32 = 9600;

/// How long a single read may block before reporting a timeout.
pub const READ_TIMEOUT: Duration = Duration::from_secs(1);

/// Pause between loop iterations.
pub const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Channel buffer size for ingestion events.
pub const EVENT_CHANNEL_BUFFER_SIZE: usize = 100;

/// Longest line buffered before it is handed on without a terminator.
pub const MAX_LINE_LENGTH: usize = 4096;

/// Transport-level failures.
#[derive(Error, Debug)]
pub enum ScanError {
    /// The port could not be opened; scanning never started
    #[error("failed to open serial port '{port}': {reason}")]
    Open { port: String, reason: String },
    /// Reading from an open port failed; the scan was stopped
    #[error("serial read failed: {0}")]
    Read(#[from] io::Error),
    /// The reader thread could not be started
    #[error("failed to start reader thread: {0}")]
    Thread(io::Error),
}

/// Messages from the ingestion loop to the thread that owns the registry.
#[derive(Debug)]
pub enum IngestEvent {
    /// A parsed record, not yet validated against the registry
    Record(ReadingPayload),
    /// The loop has exited and its transport is closed. `None` means it was cancelled.
    Stopped(Option<ScanError>),
}

/// A line-oriented byte stream. Dropping it closes the underlying device.
pub trait LineSource: Send {
    /// Read one line including its terminator.
    ///
    /// Returns `Ok(None)` if no complete line arrived within the read timeout.
    fn read_line(&mut self) -> io::Result<Option<Vec<u8>>>;
}

/// Opens line sources by port name.
///
/// Abstracted so the controller can be driven without serial hardware.
pub trait Transport: Send + Sync {
    fn open(&self, port: &str) -> Result<Box<dyn LineSource>, ScanError>;
}

/// Serial port transport backed by the `serialport` crate.
#[derive(Debug, Clone, Copy)]
pub struct SerialTransport {
    pub baud_rate: u32,
    pub read_timeout: Duration,
}

impl Default for SerialTransport {
    fn default() -> Self {
        SerialTransport {
            baud_rate: BAUD_RATE,
            read_timeout: READ_TIMEOUT,
        }
    }
}

impl Transport for SerialTransport {
    fn open(&self, port: &str) -> Result<Box<dyn LineSource>, ScanError> {
        let port = port.trim();
        if port.is_empty() {
            return Err(ScanError::Open {
                port: port.to_string(),
                reason: "no port given".to_string(),
            });
        }

        debug!("opening {} at {} baud", port, self.baud_rate);
        let serial = serialport::new(port, self.baud_rate)
            .timeout(self.read_timeout)
            .open()
            .map_err(|e| ScanError::Open {
                port: port.to_string(),
                reason: e.to_string(),
            })?;
        info!("opened serial port {}", port);

        Ok(Box::new(SerialLineSource::new(serial)))
    }
}

/// Splits a byte stream into lines, keeping partial input across read timeouts.
pub struct SerialLineSource<R> {
    reader: R,
    pending: Vec<u8>,
}

impl<R: Read + Send> SerialLineSource<R> {
    pub fn new(reader: R) -> Self {
        SerialLineSource {
            reader,
            pending: Vec::new(),
        }
    }

    fn take_line(&mut self) -> Option<Vec<u8>> {
        match self.pending.iter().position(|&b| b == b'\n') {
            Some(end) => {
                let rest = self.pending.split_off(end + 1);
                Some(std::mem::replace(&mut self.pending, rest))
            }
            None if self.pending.len() >= MAX_LINE_LENGTH => Some(std::mem::take(&mut self.pending)),
            None => None,
        }
    }
}

impl<R: Read + Send> LineSource for SerialLineSource<R> {
    fn read_line(&mut self) -> io::Result<Option<Vec<u8>>> {
        let mut chunk = [0u8; 256];
        loop {
            if let Some(line) = self.take_line() {
                return Ok(Some(line));
            }
            match self.reader.read(&mut chunk) {
                Ok(0) => {
                    return Err(io::Error::new(
                        io::ErrorKind::UnexpectedEof,
                        "device disconnected",
                    ));
                }
                Ok(n) => self.pending.extend_from_slice(&chunk[..n]),
                Err(e) if e.kind() == io::ErrorKind::TimedOut => return Ok(None),
                Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
                Err(e) => return Err(e),
            }
        }
    }
}

/// Handle to a running ingestion loop.
#[derive(Debug)]
pub struct IngestHandle {
    cancel: Arc<AtomicBool>,
    thread: thread::JoinHandle<()>,
}

impl IngestHandle {
    /// Ask the loop to stop at its next iteration boundary.
    pub fn cancel(&self) {
        self.cancel.store(true, Ordering::SeqCst);
    }

    /// A clone of the cancellation flag, for use from other threads.
    pub fn cancel_flag(&self) -> Arc<AtomicBool> {
        self.cancel.clone()
    }

    /// Wait for the loop thread to exit.
    pub fn join(self) {
        if self.thread.join().is_err() {
            warn!("ingestion thread panicked");
        }
    }
}

/// Start the ingestion loop on its own thread.
///
/// The loop owns `source` and drops it on exit, whatever the reason.
pub fn spawn(
    source: Box<dyn LineSource>,
    events: mpsc::Sender<IngestEvent>,
    poll_interval: Duration,
) -> io::Result<IngestHandle> {
    let cancel = Arc::new(AtomicBool::new(false));
    let thread = thread::Builder::new().name("ingest".to_string()).spawn({
        let cancel = cancel.clone();
        move || run(source, &events, &cancel, poll_interval)
    })?;
    Ok(IngestHandle { cancel, thread })
}

/// Read lines until cancelled or until the transport fails.
///
/// Always ends by sending [`IngestEvent::Stopped`] (unless the receiver is gone).
pub fn run(
    mut source: Box<dyn LineSource>,
    events: &mpsc::Sender<IngestEvent>,
    cancel: &AtomicBool,
    poll_interval: Duration,
) {
    let outcome = loop {
        if cancel.load(Ordering::SeqCst) {
            debug!("ingestion cancelled");
            break None;
        }

        match source.read_line() {
            Ok(Some(bytes)) => match ReadingPayload::from_bytes(&bytes) {
                Ok(Some(payload)) => {
                    if events.blocking_send(IngestEvent::Record(payload)).is_err() {
                        debug!("event receiver dropped, stopping ingestion");
                        return;
                    }
                }
                Ok(None) => {}
                Err(e) => warn!(
                    "invalid data received ({}): {}",
                    e,
                    String::from_utf8_lossy(&bytes).trim()
                ),
            },
            Ok(None) => {}
            Err(e) => break Some(ScanError::Read(e)),
        }

        thread::sleep(poll_interval);
    };

    // Close the port before announcing the stop
    drop(source);
    let _ = events.blocking_send(IngestEvent::Stopped(outcome));
}

//! Scan session state owned by the UI thread.
//!
//! The controller is the only writer of the [`DeviceRegistry`]. The ingestion
//! loop hands it events over a bounded channel and the owner drains them with
//! [`Controller::pump`] (non-blocking, for event loops) or
//! [`Controller::next_update`] (blocking, for the console runner).

use crate::ingest::{
    self, EVENT_CHANNEL_BUFFER_SIZE, IngestEvent, IngestHandle, POLL_INTERVAL, ScanError,
    SerialTransport, Transport,
};
use crate::reading::{Reading, ReadingPayload, RecordError};
use crate::registry::DeviceRegistry;
use log::{debug, error, info, warn};
use std::io;
use std::sync::Arc;
use std::sync::atomic::AtomicBool;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TryRecvError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanState {
    Idle,
    Scanning,
}

/// Result of applying one ingestion event.
#[derive(Debug)]
pub enum Update {
    /// The reading was added to the history and the device entry updated
    Recorded(Reading),
    /// The record was dropped
    Rejected(RecordError),
    /// The session ended; `None` if it was stopped on request
    Stopped(Option<ScanError>),
}

struct Session {
    port: String,
    handle: IngestHandle,
    events: mpsc::Receiver<IngestEvent>,
}

/// Application state: the registry plus at most one scan session.
pub struct Controller<T: Transport = SerialTransport> {
    transport: T,
    registry: DeviceRegistry,
    session: Option<Session>,
    /// Loop of a stopped session that may still be closing its port
    stopping: Option<IngestHandle>,
    poll_interval: Duration,
}

impl<T: Transport> Controller<T> {
    pub fn new(transport: T) -> Self {
        Self::with_poll_interval(transport, POLL_INTERVAL)
    }

    pub fn with_poll_interval(transport: T, poll_interval: Duration) -> Self {
        Controller {
            transport,
            registry: DeviceRegistry::new(),
            session: None,
            stopping: None,
            poll_interval,
        }
    }

    pub fn state(&self) -> ScanState {
        if self.session.is_some() {
            ScanState::Scanning
        } else {
            ScanState::Idle
        }
    }

    pub fn is_scanning(&self) -> bool {
        self.state() == ScanState::Scanning
    }

    /// Port of the running session.
    pub fn port(&self) -> Option<&str> {
        self.session.as_ref().map(|s| s.port.as_str())
    }

    pub fn registry(&self) -> &DeviceRegistry {
        &self.registry
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Cancellation flag of the running session, for stopping it from another thread.
    pub fn cancel_flag(&self) -> Option<Arc<AtomicBool>> {
        self.session.as_ref().map(|s| s.handle.cancel_flag())
    }

    /// Open `port` and start the ingestion loop.
    ///
    /// Does nothing if a scan is already running. On error the controller stays idle.
    pub fn start(&mut self, port: &str) -> Result<(), ScanError> {
        if let Some(session) = &self.session {
            debug!("already scanning {}, ignoring start", session.port);
            return Ok(());
        }

        // The previous loop must have released the port before it is reopened
        self.reap();

        let source = self.transport.open(port)?;
        let (tx, rx) = mpsc::channel(EVENT_CHANNEL_BUFFER_SIZE);
        let handle = ingest::spawn(source, tx, self.poll_interval).map_err(ScanError::Thread)?;

        info!("scanning {}", port);
        self.session = Some(Session {
            port: port.to_string(),
            handle,
            events: rx,
        });
        Ok(())
    }

    /// Stop the running scan, if any.
    ///
    /// Records already queued are applied first. The loop exits at its next
    /// iteration boundary and closes the port.
    ///
    /// Returns the transport error if the loop had already failed.
    pub fn stop(&mut self) -> Option<ScanError> {
        let mut session = self.session.take()?;
        session.handle.cancel();

        let mut failure = None;
        while let Ok(event) = session.events.try_recv() {
            match event {
                IngestEvent::Record(payload) => {
                    let _ = self.record(payload);
                }
                IngestEvent::Stopped(Some(e)) => {
                    error!("scan of {} stopped: {}", session.port, e);
                    failure = Some(e);
                }
                IngestEvent::Stopped(None) => {}
            }
        }
        info!("stopped scanning {}", session.port);
        self.stopping = Some(session.handle);
        failure
    }

    /// Start if idle, stop if scanning. Returns the new state.
    pub fn toggle(&mut self, port: &str) -> Result<ScanState, ScanError> {
        if self.is_scanning() {
            self.stop();
        } else {
            self.start(port)?;
        }
        Ok(self.state())
    }

    /// Apply every event that is ready, in arrival order, without blocking.
    pub fn pump(&mut self) -> Vec<Update> {
        let mut updates = Vec::new();
        while let Some(event) = self.try_next() {
            updates.push(self.apply(event));
        }
        updates
    }

    /// Block until the next event arrives and apply it.
    ///
    /// Returns `None` when idle.
    pub fn next_update(&mut self) -> Option<Update> {
        let session = self.session.as_mut()?;
        let event = session
            .events
            .blocking_recv()
            .unwrap_or_else(|| IngestEvent::Stopped(Some(vanished())));
        Some(self.apply(event))
    }

    fn try_next(&mut self) -> Option<IngestEvent> {
        let session = self.session.as_mut()?;
        match session.events.try_recv() {
            Ok(event) => Some(event),
            Err(TryRecvError::Empty) => None,
            Err(TryRecvError::Disconnected) => Some(IngestEvent::Stopped(Some(vanished()))),
        }
    }

    fn apply(&mut self, event: IngestEvent) -> Update {
        match event {
            IngestEvent::Record(payload) => match self.record(payload) {
                Ok(reading) => Update::Recorded(reading),
                Err(e) => Update::Rejected(e),
            },
            IngestEvent::Stopped(reason) => {
                if let Some(session) = self.session.take() {
                    match &reason {
                        Some(e) => error!("scan of {} stopped: {}", session.port, e),
                        None => info!("scan of {} finished", session.port),
                    }
                    session.handle.join();
                }
                Update::Stopped(reason)
            }
        }
    }

    fn record(&mut self, payload: ReadingPayload) -> Result<Reading, RecordError> {
        match self.registry.record(payload) {
            Ok(reading) => {
                debug!(
                    "{} ({}) rssi {} {}",
                    reading.address, reading.name, reading.rssi, reading.proximity
                );
                Ok(reading.clone())
            }
            Err(e) => {
                warn!("dropping record: {}", e);
                Err(e)
            }
        }
    }

    fn reap(&mut self) {
        if let Some(handle) = self.stopping.take() {
            handle.join();
        }
    }
}

impl<T: Transport> Drop for Controller<T> {
    fn drop(&mut self) {
        self.stop();
        self.reap();
    }
}

fn vanished() -> ScanError {
    ScanError::Read(io::Error::other("reader thread exited unexpectedly"))
}

use crate::ingest::{LineSource, ScanError, Transport};
use crate::reading::ReadingPayload;
use chrono::{DateTime, Duration, Local, TimeZone};
use std::collections::VecDeque;
use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

/// A stable device address for unit tests.
pub const TEST_ADDRESS: &str = "AA:BB:CC:DD:EE:FF";

/// A fixed local time, `offset_secs` after 2024-01-15 10:30:00.
pub fn test_time(offset_secs: i64) -> DateTime<Local> {
    Local
        .with_ymd_and_hms(2024, 1, 15, 10, 30, 0)
        .single()
        .unwrap()
        + Duration::seconds(offset_secs)
}

/// Build a payload from optional parts.
pub fn payload(name: Option<&str>, address: Option<&str>, rssi: Option<i32>) -> ReadingPayload {
    ReadingPayload {
        name: name.map(str::to_string),
        address: address.map(str::to_string),
        rssi,
    }
}

/// One scripted result of [`LineSource::read_line`].
#[derive(Debug)]
pub enum Step {
    Line(Vec<u8>),
    Timeout,
    Fail(io::ErrorKind),
}

impl Step {
    /// A newline-terminated line.
    pub fn line(text: &str) -> Step {
        Step::Line(format!("{text}\n").into_bytes())
    }
}

/// A line source that replays a script, then either disconnects or idles.
pub struct ScriptedSource {
    steps: VecDeque<Step>,
    idle_when_done: bool,
    closed: Arc<AtomicBool>,
}

impl ScriptedSource {
    /// Replays `steps`, then reports a disconnect. The flag is set once the source is dropped.
    pub fn new(steps: Vec<Step>) -> (Self, Arc<AtomicBool>) {
        Self::build(steps, false)
    }

    /// Replays `steps`, then times out forever.
    pub fn idle(steps: Vec<Step>) -> (Self, Arc<AtomicBool>) {
        Self::build(steps, true)
    }

    fn build(steps: Vec<Step>, idle_when_done: bool) -> (Self, Arc<AtomicBool>) {
        let closed = Arc::new(AtomicBool::new(false));
        let source = ScriptedSource {
            steps: steps.into(),
            idle_when_done,
            closed: closed.clone(),
        };
        (source, closed)
    }
}

impl LineSource for ScriptedSource {
    fn read_line(&mut self) -> io::Result<Option<Vec<u8>>> {
        match self.steps.pop_front() {
            Some(Step::Line(bytes)) => Ok(Some(bytes)),
            Some(Step::Timeout) => Ok(None),
            Some(Step::Fail(kind)) => Err(io::Error::new(kind, "scripted failure")),
            None if self.idle_when_done => {
                std::thread::sleep(std::time::Duration::from_millis(5));
                Ok(None)
            }
            None => Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                "device disconnected",
            )),
        }
    }
}

impl Drop for ScriptedSource {
    fn drop(&mut self) {
        self.closed.store(true, Ordering::SeqCst);
    }
}

/// A transport handing out prepared sources, one per `open`.
///
/// Opening fails once the prepared sources run out.
#[derive(Default)]
pub struct ScriptedTransport {
    sources: Mutex<VecDeque<ScriptedSource>>,
    opened: Mutex<Vec<String>>,
}

impl ScriptedTransport {
    pub fn new(sources: Vec<ScriptedSource>) -> Self {
        ScriptedTransport {
            sources: Mutex::new(sources.into()),
            opened: Mutex::new(Vec::new()),
        }
    }

    /// Ports successfully opened so far.
    pub fn opened(&self) -> Vec<String> {
        self.opened.lock().unwrap().clone()
    }
}

impl Transport for ScriptedTransport {
    fn open(&self, port: &str) -> Result<Box<dyn LineSource>, ScanError> {
        let source = self
            .sources
            .lock()
            .unwrap()
            .pop_front()
            .ok_or_else(|| ScanError::Open {
                port: port.to_string(),
                reason: "no such device".to_string(),
            })?;
        self.opened.lock().unwrap().push(port.to_string());
        Ok(Box::new(source))
    }
}

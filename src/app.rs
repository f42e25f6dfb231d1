//! Command-line options and the console runner.
//!
//! Kept apart from `main` so a whole scan session can be driven in tests with
//! a scripted transport and in-memory output streams.

use crate::controller::{Controller, Update};
use crate::export::{ExportError, export_to_path};
use crate::ingest::{ScanError, Transport};
use crate::output::OutputFormat;
use clap::Parser;
use log::{error, warn};
use std::io;
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::AtomicBool;
use thiserror::Error;

/// Port offered when none is given.
#[cfg(windows)]
pub const DEFAULT_PORT: &str = "COM3";
#[cfg(not(windows))]
pub const DEFAULT_PORT: &str = "/dev/ttyUSB0";

#[derive(Parser, Debug, Clone)]
#[command(author, about, version)]
pub struct Options {
    /// Serial port the scanner is attached to, e.g. COM3 or /dev/ttyUSB0
    #[arg(short, long, default_value = DEFAULT_PORT)]
    pub port: String,

    /// Print readings to stdout instead of opening a window.
    /// Scanning starts immediately and runs until the device disconnects or Ctrl-C.
    #[arg(long)]
    pub headless: bool,

    /// Line format for console output
    #[arg(long, default_value_t, value_enum)]
    pub format: OutputFormat,

    /// Write the reading history as CSV to this file when a console scan ends
    #[arg(long, value_name = "PATH")]
    pub export: Option<PathBuf>,

    /// Verbose output: debug logging, and rejected records printed to stderr
    #[arg(short = 'v', long = "verbose")]
    pub verbose: bool,
}

/// Errors returned by the runners.
#[derive(Error, Debug)]
pub enum RunError {
    #[error(transparent)]
    Scan(#[from] ScanError),
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error("export failed: {0}")]
    Export(#[from] ExportError),
    #[error("failed to start user interface: {0}")]
    Gui(String),
}

/// Scan `options.port` and write one line per reading to `out` until the session ends.
///
/// `on_start` receives the session's cancellation flag once the port is open;
/// setting it ends the scan cleanly. Rejected records go to `err` when verbose.
/// If `options.export` is set the history is written there before returning.
/// A transport failure is returned as [`RunError::Scan`] after the export. A
/// failed write to `out` or `err` stops the scan and is returned as
/// [`RunError::Io`], also after the export.
pub fn run_with_io<T: Transport>(
    options: &Options,
    controller: &mut Controller<T>,
    on_start: impl FnOnce(Arc<AtomicBool>),
    out: &mut dyn Write,
    err: &mut dyn Write,
) -> Result<(), RunError> {
    let formatter = options.format.formatter();

    controller.start(&options.port)?;
    if let Some(flag) = controller.cancel_flag() {
        on_start(flag);
    }

    let mut failure: Option<RunError> = None;
    while let Some(update) = controller.next_update() {
        let written = match update {
            Update::Recorded(reading) => writeln!(out, "{}", formatter.format(&reading)),
            Update::Rejected(e) if options.verbose => writeln!(err, "rejected record: {e}"),
            Update::Rejected(_) => Ok(()),
            Update::Stopped(reason) => {
                failure = reason.map(RunError::from);
                Ok(())
            }
        };
        if let Err(e) = written {
            error!("failed to write output, stopping scan: {}", e);
            controller.stop();
            failure = Some(e.into());
            break;
        }
    }
    let flushed = out.flush();

    // The history is exported even if the scan or the output failed
    if let Some(path) = &options.export {
        match export_to_path(controller.registry().history(), path) {
            Ok(_) => {}
            Err(ExportError::NoData) => warn!("no readings, {} not written", path.display()),
            Err(e) => return Err(e.into()),
        }
    }

    match failure {
        Some(e) => Err(e),
        None => Ok(flushed?),
    }
}

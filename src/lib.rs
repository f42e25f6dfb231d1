//! `rssi-scanner` library.
//!
//! The binary (`src/main.rs`) is responsible for CLI parsing, logging setup and
//! process exit codes. Scan state lives in [`crate::controller`], which can be
//! driven deterministically with an injected [`Transport`].

pub mod app;
pub mod controller;
pub mod export;
#[cfg(feature = "gui")]
pub mod gui;
pub mod ingest;
pub mod output;
pub mod proximity;
pub mod reading;
pub mod registry;

#[cfg(test)]
mod test_utils;

// Re-export commonly used types at the crate root
pub use controller::{Controller, ScanState, Update};
pub use export::{CsvRecord, ExportError, default_file_name, export_to_path, write_csv};
pub use ingest::{LineSource, ScanError, SerialTransport, Transport};
pub use output::{OutputFormat, OutputFormatter};
pub use proximity::Proximity;
pub use reading::{Reading, ReadingPayload, RecordError};
pub use registry::DeviceRegistry;

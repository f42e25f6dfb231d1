//! CSV export of the reading history.

use crate::proximity::Proximity;
use crate::reading::{Reading, TIMESTAMP_FORMAT};
use chrono::{DateTime, Local};
use log::info;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{self, Write};
use std::path::Path;
use thiserror::Error;

/// Column names, in file order.
pub const CSV_HEADER: [&str; 5] = ["timestamp", "name", "address", "rssi", "proximity"];

#[derive(Error, Debug)]
pub enum ExportError {
    /// The history is empty; nothing was written
    #[error("no device data available to export")]
    NoData,
    #[error("{0}")]
    Io(#[from] io::Error),
    #[error("{0}")]
    Csv(#[from] csv::Error),
}

/// One exported CSV row. Field order defines the header.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CsvRecord {
    pub timestamp: String,
    pub name: String,
    pub address: String,
    pub rssi: i32,
    pub proximity: Proximity,
}

impl From<&Reading> for CsvRecord {
    fn from(reading: &Reading) -> Self {
        CsvRecord {
            timestamp: reading.last_seen(),
            name: reading.name.clone(),
            address: reading.address.clone(),
            rssi: reading.rssi,
            proximity: reading.proximity,
        }
    }
}

/// Suggested file name for an export started at `now`.
///
/// # Example
/// ```
/// use chrono::{Local, TimeZone};
/// use rssi_scanner::export::default_file_name;
///
/// let now = Local.with_ymd_and_hms(2024, 3, 9, 14, 5, 7).unwrap();
/// assert_eq!(default_file_name(now), "bluetooth_scan_20240309_140507.csv");
/// ```
pub fn default_file_name(now: DateTime<Local>) -> String {
    format!("bluetooth_scan_{}.csv", now.format("%Y%m%d_%H%M%S"))
}

/// Write `history` as CSV, header first. Returns the number of data rows.
pub fn write_csv<W: Write>(history: &[Reading], writer: W) -> Result<usize, ExportError> {
    if history.is_empty() {
        return Err(ExportError::NoData);
    }

    let mut writer = csv::Writer::from_writer(writer);
    for reading in history {
        writer.serialize(CsvRecord::from(reading))?;
    }
    writer.flush()?;
    Ok(history.len())
}

/// Write `history` to a new file at `path`.
///
/// An empty history is reported as [`ExportError::NoData`] before the file is created.
pub fn export_to_path(history: &[Reading], path: &Path) -> Result<usize, ExportError> {
    if history.is_empty() {
        return Err(ExportError::NoData);
    }

    let file = File::create(path)?;
    let rows = write_csv(history, file)?;
    info!("exported {} readings to {}", rows, path.display());
    Ok(rows)
}

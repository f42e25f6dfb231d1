//! Latest reading per device plus the session's full reading history.

use crate::reading::{Reading, ReadingPayload, RecordError, UNKNOWN_NAME};
use chrono::{DateTime, Local};
use std::collections::HashMap;

/// In-memory device state for one session.
///
/// `snapshot()` holds at most one entry per address, always the latest reading
/// for it, in the order devices were first seen. `history()` holds every
/// accepted reading in arrival order and is never pruned.
#[derive(Debug, Default)]
pub struct DeviceRegistry {
    devices: Vec<Reading>,
    index: HashMap<String, usize>,
    history: Vec<Reading>,
}

impl DeviceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a payload stamped with the current local time.
    ///
    /// Payloads without an address are rejected and leave the registry untouched.
    pub fn record(&mut self, payload: ReadingPayload) -> Result<&Reading, RecordError> {
        self.record_at(payload, Local::now())
    }

    /// Record a payload with an explicit timestamp.
    pub fn record_at(
        &mut self,
        payload: ReadingPayload,
        timestamp: DateTime<Local>,
    ) -> Result<&Reading, RecordError> {
        let address = match payload.address {
            Some(address) if !address.is_empty() => address,
            _ => return Err(RecordError::MissingAddress),
        };
        let name = payload.name.unwrap_or_else(|| UNKNOWN_NAME.to_string());
        let reading = Reading::new(name, address, payload.rssi.unwrap_or(0), timestamp);

        self.history.push(reading.clone());

        let slot = match self.index.get(&reading.address) {
            Some(&slot) => {
                self.devices[slot] = reading;
                slot
            }
            None => {
                let slot = self.devices.len();
                self.index.insert(reading.address.clone(), slot);
                self.devices.push(reading);
                slot
            }
        };
        Ok(&self.devices[slot])
    }

    /// Latest reading of every device, in first-seen order.
    pub fn snapshot(&self) -> &[Reading] {
        &self.devices
    }

    /// Every recorded reading, in arrival order.
    pub fn history(&self) -> &[Reading] {
        &self.history
    }

    pub fn get(&self, address: &str) -> Option<&Reading> {
        self.index.get(address).map(|&slot| &self.devices[slot])
    }

    /// Number of distinct devices.
    pub fn len(&self) -> usize {
        self.devices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.devices.is_empty()
    }
}

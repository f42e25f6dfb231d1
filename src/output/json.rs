//! JSON lines output.

use crate::output::OutputFormatter;
use crate::reading::Reading;
use log::error;

/// Formats each reading as a compact JSON object.
#[derive(Debug, Default, Clone, Copy)]
pub struct JsonFormatter;

impl OutputFormatter for JsonFormatter {
    fn format(&self, reading: &Reading) -> String {
        serde_json::to_string(reading).unwrap_or_else(|e| {
            error!("failed to serialize reading for {}: {}", reading.address, e);
            String::new()
        })
    }
}

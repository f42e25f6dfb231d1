//! Human-readable line output.

use crate::output::OutputFormatter;
use crate::reading::Reading;

/// Formats readings as `<last seen> <address> <rssi> dBm <proximity> <name>`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TextFormatter;

impl OutputFormatter for TextFormatter {
    fn format(&self, reading: &Reading) -> String {
        format!(
            "{} {} {:>4} dBm {:<10} {}",
            reading.last_seen(),
            reading.address,
            reading.rssi,
            reading.proximity,
            reading.name
        )
    }
}

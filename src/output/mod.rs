//! Output formatters for readings printed in console mode.
//!
//! This module provides a trait for rendering a reading as a single line and
//! implementations for plain text and JSON lines.

pub mod json;
pub mod text;

use crate::reading::Reading;

/// Trait for formatting readings into output lines.
pub trait OutputFormatter: Send + Sync {
    /// Format a reading. The result must not contain a newline.
    fn format(&self, reading: &Reading) -> String;
}

/// Line formats selectable on the command line.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    /// Aligned, human-readable columns
    #[default]
    Text,
    /// One JSON object per line
    Json,
}

impl OutputFormat {
    pub fn formatter(self) -> Box<dyn OutputFormatter> {
        match self {
            OutputFormat::Text => Box::new(text::TextFormatter),
            OutputFormat::Json => Box::new(json::JsonFormatter),
        }
    }
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OutputFormat::Text => write!(f, "text"),
            OutputFormat::Json => write!(f, "json"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{TEST_ADDRESS, test_time};

    #[test]
    fn test_formatter_selection() {
        let reading = Reading::new("Tile".into(), TEST_ADDRESS.into(), -45, test_time(0));
        assert!(OutputFormat::Json.formatter().format(&reading).starts_with('{'));
        assert!(OutputFormat::Text.formatter().format(&reading).starts_with("2024-01-15"));
    }

    #[test]
    fn test_output_format_display() {
        assert_eq!(OutputFormat::Text.to_string(), "text");
        assert_eq!(OutputFormat::Json.to_string(), "json");
        assert_eq!(OutputFormat::default(), OutputFormat::Text);
    }
}

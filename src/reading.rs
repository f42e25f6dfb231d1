//! Device readings and the JSON records they are built from.

use crate::proximity::Proximity;
use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// Timestamp format used in the table and in exported CSV files.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Name used for devices that do not report one.
pub const UNKNOWN_NAME: &str = "Unknown";

/// Errors for records that cannot be turned into a [`Reading`].
///
/// None of these are fatal: the offending record is dropped and scanning continues.
#[derive(Error, Debug)]
pub enum RecordError {
    #[error("line is not valid UTF-8")]
    Encoding,
    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("record is not a JSON object")]
    NotAnObject,
    #[error("invalid rssi: {0}")]
    Rssi(String),
    #[error("record has no address")]
    MissingAddress,
}

/// One record as reported by the scanner, before defaults are applied.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReadingPayload {
    pub name: Option<String>,
    pub address: Option<String>,
    pub rssi: Option<i32>,
}

#[derive(Deserialize)]
struct RawPayload {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    address: Option<String>,
    #[serde(default)]
    rssi: Value,
}

impl ReadingPayload {
    /// Parse one line of scanner output.
    ///
    /// The line must be a JSON object. Unknown fields are ignored. `rssi` may be
    /// an integer, a float (truncated toward zero) or a numeric string.
    ///
    /// # Example
    /// ```
    /// use rssi_scanner::ReadingPayload;
    ///
    /// let payload =
    ///     ReadingPayload::from_line(r#"{"name":"Tile","address":"AA:BB:CC:DD:EE:FF","rssi":-45}"#)
    ///         .unwrap();
    /// assert_eq!(payload.address.as_deref(), Some("AA:BB:CC:DD:EE:FF"));
    /// assert_eq!(payload.rssi, Some(-45));
    /// ```
    pub fn from_line(line: &str) -> Result<Self, RecordError> {
        let value: Value = serde_json::from_str(line)?;
        if !value.is_object() {
            return Err(RecordError::NotAnObject);
        }
        let raw: RawPayload = serde_json::from_value(value)?;

        Ok(ReadingPayload {
            name: raw.name,
            address: raw.address,
            rssi: parse_rssi(&raw.rssi)?,
        })
    }

    /// Parse raw bytes read from the transport.
    ///
    /// Returns `Ok(None)` for blank lines.
    pub fn from_bytes(bytes: &[u8]) -> Result<Option<Self>, RecordError> {
        let line = std::str::from_utf8(bytes).map_err(|_| RecordError::Encoding)?;
        let line = line.trim();
        if line.is_empty() {
            return Ok(None);
        }
        Self::from_line(line).map(Some)
    }
}

fn parse_rssi(value: &Value) -> Result<Option<i32>, RecordError> {
    match value {
        Value::Null => Ok(None),
        Value::Number(number) => {
            if let Some(int) = number.as_i64() {
                i32::try_from(int)
                    .map(Some)
                    .map_err(|_| RecordError::Rssi(format!("{int} is out of range")))
            } else {
                match number.as_f64() {
                    Some(float)
                        if float.is_finite()
                            && float.trunc() >= f64::from(i32::MIN)
                            && float.trunc() <= f64::from(i32::MAX) =>
                    {
                        Ok(Some(float.trunc() as i32))
                    }
                    _ => Err(RecordError::Rssi(format!("{number} is out of range"))),
                }
            }
        }
        Value::String(text) => text
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| RecordError::Rssi(format!("'{text}' is not an integer"))),
        other => Err(RecordError::Rssi(format!("unexpected value {other}"))),
    }
}

/// A single observation of a device. Never modified after creation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Reading {
    pub name: String,
    pub address: String,
    /// Signal strength in dBm
    pub rssi: i32,
    pub proximity: Proximity,
    pub timestamp: DateTime<Local>,
}

impl Reading {
    pub fn new(name: String, address: String, rssi: i32, timestamp: DateTime<Local>) -> Self {
        Reading {
            name,
            address,
            rssi,
            proximity: Proximity::from_rssi(rssi),
            timestamp,
        }
    }

    /// The timestamp rendered with [`TIMESTAMP_FORMAT`].
    pub fn last_seen(&self) -> String {
        self.timestamp.format(TIMESTAMP_FORMAT).to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{TEST_ADDRESS, test_time};

    #[test]
    fn test_from_line_full_record() {
        let payload =
            ReadingPayload::from_line(r#"{"name":"Tile","address":"AA:BB:CC:DD:EE:FF","rssi":-45}"#)
                .unwrap();
        assert_eq!(
            payload,
            ReadingPayload {
                name: Some("Tile".to_string()),
                address: Some(TEST_ADDRESS.to_string()),
                rssi: Some(-45),
            }
        );
    }

    #[test]
    fn test_from_line_optional_fields() {
        let payload = ReadingPayload::from_line(r#"{"address":"AA:BB:CC:DD:EE:FF"}"#).unwrap();
        assert_eq!(payload.name, None);
        assert_eq!(payload.rssi, None);

        let payload =
            ReadingPayload::from_line(r#"{"address":"AA:BB:CC:DD:EE:FF","name":null,"rssi":null}"#)
                .unwrap();
        assert_eq!(payload.name, None);
        assert_eq!(payload.rssi, None);
    }

    #[test]
    fn test_from_line_ignores_unknown_fields() {
        let payload = ReadingPayload::from_line(
            r#"{"address":"AA:BB:CC:DD:EE:FF","rssi":-60,"tx_power":4,"extra":{"a":1}}"#,
        )
        .unwrap();
        assert_eq!(payload.rssi, Some(-60));
    }

    #[test]
    fn test_from_line_missing_address_is_parsed() {
        // Rejected later by the registry, not by the parser
        let payload = ReadingPayload::from_line(r#"{"name":"Tile","rssi":-45}"#).unwrap();
        assert_eq!(payload.address, None);
    }

    #[test]
    fn test_rssi_integer_like_values() {
        let parse = |rssi: &str| {
            ReadingPayload::from_line(&format!(r#"{{"address":"A","rssi":{rssi}}}"#))
                .map(|p| p.rssi)
        };
        assert_eq!(parse("-45").unwrap(), Some(-45));
        assert_eq!(parse("\"-45\"").unwrap(), Some(-45));
        assert_eq!(parse("\" -45 \"").unwrap(), Some(-45));
        assert_eq!(parse("-45.7").unwrap(), Some(-45));
        assert_eq!(parse("0").unwrap(), Some(0));
    }

    #[test]
    fn test_rssi_invalid_values() {
        let parse = |rssi: &str| {
            ReadingPayload::from_line(&format!(r#"{{"address":"A","rssi":{rssi}}}"#))
        };
        assert!(matches!(parse("\"strong\""), Err(RecordError::Rssi(_))));
        assert!(matches!(parse("true"), Err(RecordError::Rssi(_))));
        assert!(matches!(parse("[-45]"), Err(RecordError::Rssi(_))));
        assert!(matches!(parse("9999999999"), Err(RecordError::Rssi(_))));
        assert!(matches!(parse("1e300"), Err(RecordError::Rssi(_))));
    }

    #[test]
    fn test_from_line_malformed() {
        assert!(matches!(
            ReadingPayload::from_line("not-json"),
            Err(RecordError::Json(_))
        ));
        assert!(matches!(
            ReadingPayload::from_line(r#"{"address":"#),
            Err(RecordError::Json(_))
        ));
        assert!(matches!(
            ReadingPayload::from_line(r#"["Tile","AA:BB:CC:DD:EE:FF",-45]"#),
            Err(RecordError::NotAnObject)
        ));
        assert!(matches!(
            ReadingPayload::from_line(r#"{"address":42}"#),
            Err(RecordError::Json(_))
        ));
    }

    #[test]
    fn test_from_bytes() {
        assert!(ReadingPayload::from_bytes(b"  \r\n").unwrap().is_none());
        let payload = ReadingPayload::from_bytes(b"{\"address\":\"A\"}\r\n")
            .unwrap()
            .unwrap();
        assert_eq!(payload.address.as_deref(), Some("A"));
        assert!(matches!(
            ReadingPayload::from_bytes(&[0xff, 0xfe, b'\n']),
            Err(RecordError::Encoding)
        ));
    }

    #[test]
    fn test_reading_new_classifies() {
        let reading = Reading::new("Tile".into(), TEST_ADDRESS.into(), -80, test_time(0));
        assert_eq!(reading.proximity, Proximity::Far);
        assert_eq!(reading.last_seen(), "2024-01-15 10:30:00");
    }

    #[test]
    fn test_record_error_display() {
        assert_eq!(RecordError::MissingAddress.to_string(), "record has no address");
        assert_eq!(
            RecordError::Rssi("'x' is not an integer".into()).to_string(),
            "invalid rssi: 'x' is not an integer"
        );
    }
}

//! Coarse proximity buckets derived from RSSI.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Readings at or above this RSSI (dBm) are considered very close.
pub const VERY_CLOSE_MIN_RSSI: i32 = -50;

/// Readings at or above this RSSI (dBm), but below [`VERY_CLOSE_MIN_RSSI`], are close.
pub const CLOSE_MIN_RSSI: i32 = -70;

/// Distance category of a device, as estimated from its signal strength.
///
/// The serialized form is the human-readable label, so the same strings appear
/// in the table, in exported CSV files and in JSON output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Proximity {
    #[serde(rename = "Very Close")]
    VeryClose,
    #[serde(rename = "Close")]
    Close,
    #[serde(rename = "Far")]
    Far,
}

impl Proximity {
    /// Classify an RSSI value in dBm.
    ///
    /// # Example
    /// ```
    /// use rssi_scanner::Proximity;
    ///
    /// assert_eq!(Proximity::from_rssi(-45), Proximity::VeryClose);
    /// assert_eq!(Proximity::from_rssi(-60), Proximity::Close);
    /// assert_eq!(Proximity::from_rssi(-90), Proximity::Far);
    /// ```
    pub fn from_rssi(rssi: i32) -> Self {
        if rssi >= VERY_CLOSE_MIN_RSSI {
            Proximity::VeryClose
        } else if rssi >= CLOSE_MIN_RSSI {
            Proximity::Close
        } else {
            Proximity::Far
        }
    }

    /// The label shown to users.
    pub fn label(&self) -> &'static str {
        match self {
            Proximity::VeryClose => "Very Close",
            Proximity::Close => "Close",
            Proximity::Far => "Far",
        }
    }
}

impl fmt::Display for Proximity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.label())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_boundaries() {
        assert_eq!(Proximity::from_rssi(-50), Proximity::VeryClose);
        assert_eq!(Proximity::from_rssi(-51), Proximity::Close);
        assert_eq!(Proximity::from_rssi(-70), Proximity::Close);
        assert_eq!(Proximity::from_rssi(-71), Proximity::Far);
    }

    #[test]
    fn test_ranges() {
        for rssi in -50..=20 {
            assert_eq!(Proximity::from_rssi(rssi), Proximity::VeryClose, "rssi {rssi}");
        }
        for rssi in -70..-50 {
            assert_eq!(Proximity::from_rssi(rssi), Proximity::Close, "rssi {rssi}");
        }
        for rssi in -127..-70 {
            assert_eq!(Proximity::from_rssi(rssi), Proximity::Far, "rssi {rssi}");
        }
    }

    #[test]
    fn test_extremes() {
        assert_eq!(Proximity::from_rssi(i32::MAX), Proximity::VeryClose);
        assert_eq!(Proximity::from_rssi(0), Proximity::VeryClose);
        assert_eq!(Proximity::from_rssi(i32::MIN), Proximity::Far);
    }

    #[test]
    fn test_display() {
        assert_eq!(Proximity::VeryClose.to_string(), "Very Close");
        assert_eq!(Proximity::Close.to_string(), "Close");
        assert_eq!(Proximity::Far.to_string(), "Far");
    }

    #[test]
    fn test_serde_uses_labels() {
        assert_eq!(
            serde_json::to_string(&Proximity::VeryClose).unwrap(),
            "\"Very Close\""
        );
        let far: Proximity = serde_json::from_str("\"Far\"").unwrap();
        assert_eq!(far, Proximity::Far);
    }
}

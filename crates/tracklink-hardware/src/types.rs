//! Common types shared across hardware device implementations.
//!
//! This module defines the values peripherals hand to the orchestration
//! layer: device metadata, a GPS fix snapshot and the radio link status.

use serde::{Deserialize, Serialize};

/// Device information.
///
/// Contains metadata about a peripheral, logged once at startup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceInfo {
    /// Device name.
    pub name: String,

    /// Device model identifier.
    pub model: String,

    /// Firmware version (if available).
    pub firmware_version: Option<String>,
}

impl DeviceInfo {
    /// Create new device information with required fields.
    pub fn new(name: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            model: model.into(),
            firmware_version: None,
        }
    }

    /// Set the firmware version.
    pub fn with_firmware_version(mut self, firmware_version: impl Into<String>) -> Self {
        self.firmware_version = Some(firmware_version.into());
        self
    }
}

/// Snapshot of the GPS receiver state.
///
/// A fix is only reportable when `valid` is set and the quality indicators
/// (`hdop`, `satellites`) pass the configured limits; that check lives in the
/// telemetry scheduler, not here.
///
/// # Examples
///
/// ```
/// use tracklink_hardware::types::LocationFix;
///
/// let fix = LocationFix::new(41.0082, 28.9784)
///     .with_motion(42.5, 180.0)
///     .with_quality(1.2, 9);
///
/// assert!(fix.valid);
/// assert_eq!(fix.satellites, 9);
/// assert!(!LocationFix::invalid().valid);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LocationFix {
    /// Whether the receiver currently has a position fix.
    pub valid: bool,

    /// Latitude in decimal degrees.
    pub latitude: f64,

    /// Longitude in decimal degrees.
    pub longitude: f64,

    /// Ground speed in km/h.
    pub speed_kmph: f32,

    /// Course over ground in degrees.
    pub heading_deg: f32,

    /// Horizontal dilution of precision; lower is better.
    pub hdop: f32,

    /// Satellites used in the fix.
    pub satellites: u8,
}

impl LocationFix {
    /// A valid fix at the given position, stationary, with unknown quality.
    ///
    /// Quality defaults to the worst values so a fix without
    /// [`with_quality`](Self::with_quality) never passes the telemetry gate.
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            valid: true,
            latitude,
            longitude,
            speed_kmph: 0.0,
            heading_deg: 0.0,
            hdop: f32::MAX,
            satellites: 0,
        }
    }

    /// The receiver has no fix.
    pub fn invalid() -> Self {
        Self {
            valid: false,
            ..Self::new(0.0, 0.0)
        }
    }

    pub fn with_motion(mut self, speed_kmph: f32, heading_deg: f32) -> Self {
        self.speed_kmph = speed_kmph;
        self.heading_deg = heading_deg;
        self
    }

    pub fn with_quality(mut self, hdop: f32, satellites: u8) -> Self {
        self.hdop = hdop;
        self.satellites = satellites;
        self
    }
}

impl Default for LocationFix {
    fn default() -> Self {
        Self::invalid()
    }
}

/// Status reported by the radio.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LinkStatus {
    /// Radio is idle, no association requested.
    Idle,

    /// Association in progress.
    Connecting,

    /// Link is up.
    Connected,

    /// The radio reported an explicit association failure.
    ConnectFailed,

    /// Link was lost or dropped.
    Disconnected,
}

impl LinkStatus {
    pub fn is_connected(self) -> bool {
        matches!(self, LinkStatus::Connected)
    }
}

impl std::fmt::Display for LinkStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Idle => write!(f, "Idle"),
            Self::Connecting => write!(f, "Connecting"),
            Self::Connected => write!(f, "Connected"),
            Self::ConnectFailed => write!(f, "ConnectFailed"),
            Self::Disconnected => write!(f, "Disconnected"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_device_info_builder() {
        let info = DeviceInfo::new("DFPlayer", "Serial MP3").with_firmware_version("v1.0");

        assert_eq!(info.name, "DFPlayer");
        assert_eq!(info.model, "Serial MP3");
        assert_eq!(info.firmware_version, Some("v1.0".to_string()));
    }

    #[test]
    fn test_fix_without_quality_is_worst_case() {
        let fix = LocationFix::new(1.0, 2.0);
        assert!(fix.valid);
        assert_eq!(fix.satellites, 0);
        assert_eq!(fix.hdop, f32::MAX);
    }

    #[test]
    fn test_invalid_fix_default() {
        assert_eq!(LocationFix::default(), LocationFix::invalid());
    }

    #[test]
    fn test_link_status() {
        assert!(LinkStatus::Connected.is_connected());
        assert!(!LinkStatus::Connecting.is_connected());
        assert!(!LinkStatus::ConnectFailed.is_connected());
        assert_eq!(LinkStatus::ConnectFailed.to_string(), "ConnectFailed");
    }
}

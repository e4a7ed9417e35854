use crate::{
    Result,
    constants::{
        MAX_DEVICE_ID_LENGTH, MAX_UID_BYTES, MIN_UID_BYTES, RSSI_EXCELLENT_DBM, RSSI_FAIR_DBM,
        RSSI_GOOD_DBM, RSSI_WEAK_DBM,
    },
    error::Error,
};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Proximity card identifier.
///
/// Stored as upper-case hexadecimal, two digits per byte, which is the form
/// the backend keys drivers by.
///
/// # Examples
///
/// ```
/// use tracklink_core::CardUid;
///
/// let uid = CardUid::new(" 12ab34cd ").unwrap();
/// assert_eq!(uid.as_str(), "12AB34CD");
///
/// let uid = CardUid::from_bytes(&[0x04, 0xAB, 0x0C, 0xEF]).unwrap();
/// assert_eq!(uid.to_string(), "04AB0CEF");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct CardUid(String);

impl CardUid {
    pub fn new(uid: &str) -> Result<Self> {
        // Normalize: trim and uppercase
        let uid = uid.trim().to_uppercase();

        if !uid.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(Error::InvalidCardFormat(format!(
                "Card UID must be hexadecimal, got {uid:?}"
            )));
        }

        if uid.len() % 2 != 0 {
            return Err(Error::InvalidCardFormat(format!(
                "Card UID must have two digits per byte, got {} digits",
                uid.len()
            )));
        }

        let bytes = uid.len() / 2;
        if !(MIN_UID_BYTES..=MAX_UID_BYTES).contains(&bytes) {
            return Err(Error::InvalidCardFormat(format!(
                "Card UID must be {MIN_UID_BYTES}-{MAX_UID_BYTES} bytes, got {bytes}"
            )));
        }

        Ok(CardUid(uid))
    }

    /// Build a UID from the raw bytes returned by a reader.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let hex: String = bytes.iter().map(|b| format!("{b:02X}")).collect();
        CardUid::new(&hex)
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Number of bytes in the UID.
    #[must_use]
    pub fn byte_len(&self) -> usize {
        self.0.len() / 2
    }
}

impl fmt::Display for CardUid {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for CardUid {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        CardUid::new(s)
    }
}

impl TryFrom<String> for CardUid {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        CardUid::new(&value)
    }
}

impl From<CardUid> for String {
    fn from(uid: CardUid) -> Self {
        uid.0
    }
}

/// Identifier of this vehicle unit as known by the backend.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct DeviceId(String);

impl DeviceId {
    pub fn new(id: &str) -> Result<Self> {
        let id = id.trim();

        if id.is_empty() {
            return Err(Error::InvalidDeviceId("Device ID cannot be empty".into()));
        }

        if id.len() > MAX_DEVICE_ID_LENGTH {
            return Err(Error::InvalidDeviceId(format!(
                "Device ID must be at most {MAX_DEVICE_ID_LENGTH} chars, got {}",
                id.len()
            )));
        }

        if !id.is_ascii() || id.chars().any(|c| c.is_ascii_whitespace()) {
            return Err(Error::InvalidDeviceId(format!(
                "Device ID must be ASCII without whitespace, got {id:?}"
            )));
        }

        Ok(DeviceId(id.to_string()))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DeviceId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl TryFrom<String> for DeviceId {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        DeviceId::new(&value)
    }
}

impl From<DeviceId> for String {
    fn from(id: DeviceId) -> Self {
        id.0
    }
}

/// Signal quality bucket derived from RSSI.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SignalQuality {
    VeryWeak,
    Weak,
    Fair,
    Good,
    Excellent,
}

impl SignalQuality {
    /// Classify a received signal strength in dBm.
    ///
    /// # Examples
    ///
    /// ```
    /// use tracklink_core::SignalQuality;
    ///
    /// assert_eq!(SignalQuality::from_rssi(-45), SignalQuality::Excellent);
    /// assert_eq!(SignalQuality::from_rssi(-50), SignalQuality::Good);
    /// assert_eq!(SignalQuality::from_rssi(-95), SignalQuality::VeryWeak);
    /// ```
    #[must_use]
    pub fn from_rssi(rssi_dbm: i32) -> Self {
        if rssi_dbm > RSSI_EXCELLENT_DBM {
            SignalQuality::Excellent
        } else if rssi_dbm > RSSI_GOOD_DBM {
            SignalQuality::Good
        } else if rssi_dbm > RSSI_FAIR_DBM {
            SignalQuality::Fair
        } else if rssi_dbm > RSSI_WEAK_DBM {
            SignalQuality::Weak
        } else {
            SignalQuality::VeryWeak
        }
    }
}

impl fmt::Display for SignalQuality {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            SignalQuality::Excellent => write!(f, "Excellent"),
            SignalQuality::Good => write!(f, "Good"),
            SignalQuality::Fair => write!(f, "Fair"),
            SignalQuality::Weak => write!(f, "Weak"),
            SignalQuality::VeryWeak => write!(f, "Very Weak"),
        }
    }
}

/// Track number on the audio module's storage card.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TrackId(u16);

impl TrackId {
    #[must_use]
    pub const fn new(number: u16) -> Self {
        TrackId(number)
    }

    #[must_use]
    pub fn number(self) -> u16 {
        self.0
    }
}

impl fmt::Display for TrackId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

//! Wire payloads exchanged with the backend.
//!
//! # Request
//!
//! Every exchange posts one JSON document. Authorization requests and
//! periodic telemetry use the same shape; a request carrying `rfidCardId`
//! asks the backend about that card.
//!
//! ```text
//! {
//!   "deviceId": "ESP32-001",
//!   "latitude": 41.0082, "longitude": 28.9784,
//!   "speed": 42.5, "heading": 180.0, "accuracy": 1.2,
//!   "rfidCardId": "12AB34CD",
//!   "timestamp": "2026-03-01T08:15:00Z"
//! }
//! ```
//!
//! The position fields are omitted as a group when no valid fix is available.
//!
//! # Response
//!
//! ```text
//! {
//!   "message": "Driver authorized",
//!   "data": {
//!     "driverAuthorized": true,
//!     "sessionId": "sess-9f2",
//!     "driver": { "firstName": "Ana", "lastName": "Kaya" }
//!   }
//! }
//! ```

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize, Serializer};
use tracklink_core::{CardUid, DeviceId};

use crate::error::HttpClientError;

/// Position block of a report.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ReportPosition {
    pub latitude: f64,
    pub longitude: f64,

    /// Ground speed in km/h.
    pub speed: f32,

    /// Course over ground in degrees.
    pub heading: f32,

    /// HDOP of the fix.
    pub accuracy: f32,
}

/// Outbound request body.
///
/// # Examples
///
/// ```
/// use chrono::{TimeZone, Utc};
/// use tracklink_core::{CardUid, DeviceId};
/// use tracklink_network::DeviceReport;
///
/// let report = DeviceReport::new(
///     DeviceId::new("ESP32-001").unwrap(),
///     Utc.with_ymd_and_hms(2026, 3, 1, 8, 15, 0).unwrap(),
/// )
/// .with_card(CardUid::new("12AB34CD").unwrap());
///
/// let json = serde_json::to_value(&report).unwrap();
/// assert_eq!(json["rfidCardId"], "12AB34CD");
/// assert_eq!(json["timestamp"], "2026-03-01T08:15:00Z");
/// assert!(json.get("latitude").is_none());
/// ```
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceReport {
    pub device_id: DeviceId,

    #[serde(flatten)]
    pub position: Option<ReportPosition>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub rfid_card_id: Option<CardUid>,

    #[serde(serialize_with = "rfc3339_utc")]
    pub timestamp: DateTime<Utc>,
}

impl DeviceReport {
    pub fn new(device_id: DeviceId, timestamp: DateTime<Utc>) -> Self {
        Self {
            device_id,
            position: None,
            rfid_card_id: None,
            timestamp,
        }
    }

    pub fn with_position(mut self, position: ReportPosition) -> Self {
        self.position = Some(position);
        self
    }

    pub fn with_card(mut self, uid: CardUid) -> Self {
        self.rfid_card_id = Some(uid);
        self
    }

    /// Whether the report names a card for the backend to check.
    pub fn carries_card(&self) -> bool {
        self.rfid_card_id.is_some()
    }
}

fn rfc3339_utc<S: Serializer>(
    timestamp: &DateTime<Utc>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&timestamp.to_rfc3339_opts(SecondsFormat::Secs, true))
}

/// Authorization decision carried in a response's `data` block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Authorization {
    pub authorized: bool,
    pub session_id: String,

    /// `"<firstName> <lastName>"`, trimmed; `None` without a `driver` block.
    pub driver_name: Option<String>,
}

/// Decoded response of one exchange.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct AuthResponse {
    pub message: String,
    pub authorization: Option<Authorization>,
}

impl AuthResponse {
    /// A response without a `data` block.
    pub fn acknowledged(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            authorization: None,
        }
    }

    pub fn authorized(session_id: impl Into<String>, driver_name: impl Into<String>) -> Self {
        Self {
            message: "Driver authorized".into(),
            authorization: Some(Authorization {
                authorized: true,
                session_id: session_id.into(),
                driver_name: Some(driver_name.into()),
            }),
        }
    }

    pub fn denied() -> Self {
        Self {
            message: "Driver not authorized".into(),
            authorization: Some(Authorization {
                authorized: false,
                session_id: String::new(),
                driver_name: None,
            }),
        }
    }

    /// Decode a response body.
    ///
    /// # Errors
    ///
    /// Returns [`HttpClientError::Decode`] if the body is not a JSON object
    /// of the expected shape.
    pub fn decode(body: &[u8]) -> Result<Self, HttpClientError> {
        let wire: WireResponse = serde_json::from_slice(body)?;

        let authorization = wire.data.map(|data| Authorization {
            authorized: data.driver_authorized.unwrap_or_default(),
            session_id: data.session_id.unwrap_or_default(),
            driver_name: data
                .driver
                .map(|d| {
                    let first = d.first_name.unwrap_or_default();
                    let last = d.last_name.unwrap_or_default();
                    format!("{first} {last}").trim().to_string()
                })
                .filter(|name| !name.is_empty()),
        });

        Ok(Self {
            message: wire.message.unwrap_or_default(),
            authorization,
        })
    }
}

// Every field may be absent or an explicit `null`; both read as empty.
#[derive(Debug, Deserialize)]
struct WireResponse {
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    data: Option<WireData>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireData {
    #[serde(default)]
    driver_authorized: Option<bool>,
    #[serde(default)]
    session_id: Option<String>,
    #[serde(default)]
    driver: Option<WireDriver>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireDriver {
    #[serde(default)]
    first_name: Option<String>,
    #[serde(default)]
    last_name: Option<String>,
}

//! Default values for the device configuration.
//!
//! Every timing, threshold and track number the orchestration layer uses has
//! a default here. The values are the factory settings of the vehicle unit;
//! all of them can be overridden through [`DeviceConfig`](crate::DeviceConfig)
//! without rebuilding the firmware.
//!
//! # Usage
//!
//! ```
//! use tracklink_core::constants::*;
//! use std::time::Duration;
//!
//! let interval = Duration::from_millis(DEFAULT_SEND_INTERVAL_MS);
//! assert_eq!(interval.as_secs(), 5);
//!
//! // 12 hours of session validity
//! assert_eq!(DEFAULT_SESSION_TIMEOUT_MS, 12 * 60 * 60 * 1000);
//! ```

// ============================================================================
// Device Identity
// ============================================================================

/// Device identifier reported in every outbound request.
pub const DEFAULT_DEVICE_ID: &str = "ESP32-001";

/// Backend endpoint receiving telemetry and authorization requests.
pub const DEFAULT_SERVER_URL: &str = "http://127.0.0.1:9041/api/device/gps-data";

/// Maximum length of a device identifier.
pub const MAX_DEVICE_ID_LENGTH: usize = 64;

/// Period of the control loop.
///
/// Each tick polls the peripherals once and feeds the watchdog once, so this
/// must stay far below [`DEFAULT_WATCHDOG_TIMEOUT_MS`].
pub const DEFAULT_TICK_PERIOD_MS: u64 = 100;

// ============================================================================
// Card Sessions
// ============================================================================

/// Window in which repeat reads of the same card are suppressed.
pub const DEFAULT_CARD_DEBOUNCE_MS: u64 = 1_000;

/// Validity of an authorized driver session (12 hours).
pub const DEFAULT_SESSION_TIMEOUT_MS: u64 = 43_200_000;

/// Cooldown after the backend denies a card (6 hours).
pub const DEFAULT_UNAUTHORIZED_COOLDOWN_MS: u64 = 21_600_000;

/// Cooldown after an authorization request fails (transport or decode).
///
/// Kept short so a card can be retried promptly once the link recovers.
pub const DEFAULT_FAILURE_COOLDOWN_MS: u64 = 5_000;

/// Time a session may stay in `PendingAuth` without a response.
pub const DEFAULT_AUTH_RESPONSE_TIMEOUT_MS: u64 = 15_000;

/// Minimum card UID length in bytes (ISO 14443).
pub const MIN_UID_BYTES: usize = 4;

/// Maximum card UID length in bytes (ISO 14443).
pub const MAX_UID_BYTES: usize = 10;

// ============================================================================
// Wireless Link
// ============================================================================

/// Bound on a single connect attempt.
pub const DEFAULT_CONNECT_TIMEOUT_MS: u64 = 10_000;

/// Connect attempts performed by one reconnect cycle.
pub const DEFAULT_MAX_RECONNECT_ATTEMPTS: u32 = 5;

/// Base delay of the exponential backoff between reconnect attempts.
///
/// The pause after failed attempt `i` is `base * 2^i`.
pub const DEFAULT_BACKOFF_BASE_MS: u64 = 3_000;

/// Minimum time between the last attempt and a new reconnect cycle.
pub const DEFAULT_RECONNECT_COOLDOWN_MS: u64 = 10_000;

/// Connect attempts allowed per outage before the supervisor stops retrying.
///
/// The counter only resets on a successful connect.
pub const DEFAULT_RECONNECT_ATTEMPT_CEILING: u32 = 25;

/// Signal level below which a weak-link warning is logged.
pub const DEFAULT_RSSI_ALERT_THRESHOLD_DBM: i32 = -75;

/// Signal above this level is classified as excellent.
pub const RSSI_EXCELLENT_DBM: i32 = -50;

/// Signal above this level is classified as good.
pub const RSSI_GOOD_DBM: i32 = -60;

/// Signal above this level is classified as fair.
pub const RSSI_FAIR_DBM: i32 = -70;

/// Signal above this level is classified as weak; anything lower is very weak.
pub const RSSI_WEAK_DBM: i32 = -80;

// ============================================================================
// Telemetry
// ============================================================================

/// Interval between telemetry reports.
pub const DEFAULT_SEND_INTERVAL_MS: u64 = 5_000;

/// Minimum number of satellites for a reportable fix.
pub const DEFAULT_MIN_SATELLITES: u8 = 4;

/// Maximum HDOP for a reportable fix.
pub const DEFAULT_MAX_HDOP: f32 = 5.0;

/// Bound on one request/response exchange with the backend.
pub const DEFAULT_REQUEST_TIMEOUT_MS: u64 = 5_000;

// ============================================================================
// Audio Feedback
// ============================================================================

/// Track played when a card is presented.
pub const TRACK_ENTRY: u16 = 1;

/// Track played when a card is denied or revoked.
pub const TRACK_UNAUTHORIZED: u16 = 2;

/// Track played when an authorization request fails.
pub const TRACK_ERROR: u16 = 3;

/// Track played when a reconnect cycle is exhausted.
pub const TRACK_LINK_FAILURE: u16 = 3;

/// Track played when a driver is authorized.
pub const TRACK_AUTHORIZED: u16 = 4;

/// Startup volume of the audio module.
pub const DEFAULT_AUDIO_VOLUME: u8 = 24;

/// Highest volume level the audio module accepts.
pub const MAX_AUDIO_VOLUME: u8 = 30;

// ============================================================================
// Watchdog
// ============================================================================

/// Hardware watchdog timeout.
pub const DEFAULT_WATCHDOG_TIMEOUT_MS: u64 = 10_000;

/// Fraction of the watchdog timeout after which a late feed is logged.
pub const WATCHDOG_WARN_RATIO: f64 = 0.8;

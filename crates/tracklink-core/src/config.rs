//! Device configuration.
//!
//! A single immutable [`DeviceConfig`] value is loaded once at startup and
//! handed to each component at construction; nothing reads settings from
//! global state. Every field has a default from [`constants`](crate::constants),
//! so a configuration file only needs the keys it changes:
//!
//! ```toml
//! [device]
//! device_id = "TRUCK-17"
//!
//! [network]
//! server_url = "http://10.0.0.5:9041/api/device/gps-data"
//!
//! [telemetry]
//! send_interval_ms = 10000
//! max_hdop = 3.5
//! ```
//!
//! Loading order: defaults, then the TOML file, then environment overrides
//! (`TRACKLINK_DEVICE_ID`, `TRACKLINK_SERVER_URL`), then [`DeviceConfig::validate`].

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::constants::*;
use crate::error::{Error, Result};
use crate::types::{DeviceId, TrackId};

/// Environment variable overriding [`DeviceSection::device_id`].
pub const ENV_DEVICE_ID: &str = "TRACKLINK_DEVICE_ID";

/// Environment variable overriding [`NetworkConfig::server_url`].
pub const ENV_SERVER_URL: &str = "TRACKLINK_SERVER_URL";

/// Complete configuration of one vehicle unit.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeviceConfig {
    pub device: DeviceSection,
    pub network: NetworkConfig,
    pub session: SessionConfig,
    pub link: LinkConfig,
    pub telemetry: TelemetryConfig,
    pub audio: AudioConfig,
    pub watchdog: WatchdogConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeviceSection {
    pub device_id: String,
    pub tick_period_ms: u64,
}

impl Default for DeviceSection {
    fn default() -> Self {
        Self {
            device_id: DEFAULT_DEVICE_ID.to_string(),
            tick_period_ms: DEFAULT_TICK_PERIOD_MS,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkConfig {
    pub server_url: String,
    pub request_timeout_ms: u64,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            server_url: DEFAULT_SERVER_URL.to_string(),
            request_timeout_ms: DEFAULT_REQUEST_TIMEOUT_MS,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    pub card_debounce_ms: u64,
    pub session_timeout_ms: u64,
    pub unauthorized_cooldown_ms: u64,
    pub failure_cooldown_ms: u64,
    pub auth_response_timeout_ms: u64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            card_debounce_ms: DEFAULT_CARD_DEBOUNCE_MS,
            session_timeout_ms: DEFAULT_SESSION_TIMEOUT_MS,
            unauthorized_cooldown_ms: DEFAULT_UNAUTHORIZED_COOLDOWN_MS,
            failure_cooldown_ms: DEFAULT_FAILURE_COOLDOWN_MS,
            auth_response_timeout_ms: DEFAULT_AUTH_RESPONSE_TIMEOUT_MS,
        }
    }
}

impl SessionConfig {
    pub fn card_debounce(&self) -> Duration {
        Duration::from_millis(self.card_debounce_ms)
    }

    pub fn session_timeout(&self) -> Duration {
        Duration::from_millis(self.session_timeout_ms)
    }

    pub fn unauthorized_cooldown(&self) -> Duration {
        Duration::from_millis(self.unauthorized_cooldown_ms)
    }

    pub fn failure_cooldown(&self) -> Duration {
        Duration::from_millis(self.failure_cooldown_ms)
    }

    pub fn auth_response_timeout(&self) -> Duration {
        Duration::from_millis(self.auth_response_timeout_ms)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LinkConfig {
    pub connect_timeout_ms: u64,
    pub max_reconnect_attempts: u32,
    pub backoff_base_ms: u64,
    pub reconnect_cooldown_ms: u64,
    pub reconnect_attempt_ceiling: u32,
    pub rssi_alert_threshold_dbm: i32,
}

impl Default for LinkConfig {
    fn default() -> Self {
        Self {
            connect_timeout_ms: DEFAULT_CONNECT_TIMEOUT_MS,
            max_reconnect_attempts: DEFAULT_MAX_RECONNECT_ATTEMPTS,
            backoff_base_ms: DEFAULT_BACKOFF_BASE_MS,
            reconnect_cooldown_ms: DEFAULT_RECONNECT_COOLDOWN_MS,
            reconnect_attempt_ceiling: DEFAULT_RECONNECT_ATTEMPT_CEILING,
            rssi_alert_threshold_dbm: DEFAULT_RSSI_ALERT_THRESHOLD_DBM,
        }
    }
}

impl LinkConfig {
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    pub fn backoff_base(&self) -> Duration {
        Duration::from_millis(self.backoff_base_ms)
    }

    pub fn reconnect_cooldown(&self) -> Duration {
        Duration::from_millis(self.reconnect_cooldown_ms)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TelemetryConfig {
    pub send_interval_ms: u64,
    pub min_satellites: u8,
    pub max_hdop: f32,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            send_interval_ms: DEFAULT_SEND_INTERVAL_MS,
            min_satellites: DEFAULT_MIN_SATELLITES,
            max_hdop: DEFAULT_MAX_HDOP,
        }
    }
}

impl TelemetryConfig {
    pub fn send_interval(&self) -> Duration {
        Duration::from_millis(self.send_interval_ms)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AudioConfig {
    pub volume: u8,
    pub tracks: TrackSet,
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            volume: DEFAULT_AUDIO_VOLUME,
            tracks: TrackSet::default(),
        }
    }
}

/// Track numbers for each feedback event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackSet {
    pub entry: TrackId,
    pub unauthorized: TrackId,
    pub authorized: TrackId,
    pub error: TrackId,
    pub link_failure: TrackId,
}

impl Default for TrackSet {
    fn default() -> Self {
        Self {
            entry: TrackId::new(TRACK_ENTRY),
            unauthorized: TrackId::new(TRACK_UNAUTHORIZED),
            authorized: TrackId::new(TRACK_AUTHORIZED),
            error: TrackId::new(TRACK_ERROR),
            link_failure: TrackId::new(TRACK_LINK_FAILURE),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WatchdogConfig {
    pub timeout_ms: u64,
}

impl Default for WatchdogConfig {
    fn default() -> Self {
        Self {
            timeout_ms: DEFAULT_WATCHDOG_TIMEOUT_MS,
        }
    }
}

impl WatchdogConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

impl DeviceConfig {
    /// Load a configuration file, apply process environment overrides and
    /// validate the result.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Io`] if the file cannot be read and [`Error::Config`]
    /// if it is not valid TOML or fails validation.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let config = Self::from_file(path)?.with_env_overrides(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    /// Parse a configuration file without applying overrides or validating.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        debug!(path = %path.display(), "Reading configuration file");
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Parse configuration from a TOML document.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| Error::Config(e.to_string()))
    }

    /// Apply overrides looked up through `lookup` (normally `std::env::var`).
    ///
    /// Empty values are ignored.
    #[must_use]
    pub fn with_env_overrides<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(device_id) = lookup(ENV_DEVICE_ID).filter(|v| !v.trim().is_empty()) {
            info!(%device_id, "Device ID overridden from environment");
            self.device.device_id = device_id;
        }

        if let Some(server_url) = lookup(ENV_SERVER_URL).filter(|v| !v.trim().is_empty()) {
            info!(%server_url, "Server URL overridden from environment");
            self.network.server_url = server_url;
        }

        self
    }

    /// Parsed device identifier.
    pub fn device_id(&self) -> Result<DeviceId> {
        DeviceId::new(&self.device.device_id)
    }

    pub fn tick_period(&self) -> Duration {
        Duration::from_millis(self.device.tick_period_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.network.request_timeout_ms)
    }

    /// Check cross-field constraints.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] describing the first violated constraint.
    pub fn validate(&self) -> Result<()> {
        self.device_id()
            .map_err(|e| Error::Config(format!("device.device_id: {e}")))?;

        let url = self.network.server_url.trim();
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            return Err(Error::Config(format!(
                "network.server_url must be an http(s) URL, got {url:?}"
            )));
        }

        require_positive("device.tick_period_ms", self.device.tick_period_ms)?;
        require_positive("network.request_timeout_ms", self.network.request_timeout_ms)?;
        require_positive("session.session_timeout_ms", self.session.session_timeout_ms)?;
        require_positive(
            "session.unauthorized_cooldown_ms",
            self.session.unauthorized_cooldown_ms,
        )?;
        require_positive("session.failure_cooldown_ms", self.session.failure_cooldown_ms)?;
        require_positive(
            "session.auth_response_timeout_ms",
            self.session.auth_response_timeout_ms,
        )?;
        require_positive("link.connect_timeout_ms", self.link.connect_timeout_ms)?;
        require_positive("telemetry.send_interval_ms", self.telemetry.send_interval_ms)?;
        require_positive("watchdog.timeout_ms", self.watchdog.timeout_ms)?;

        if self.link.max_reconnect_attempts == 0 {
            return Err(Error::Config(
                "link.max_reconnect_attempts must be at least 1".into(),
            ));
        }

        if self.link.reconnect_attempt_ceiling < self.link.max_reconnect_attempts {
            return Err(Error::Config(format!(
                "link.reconnect_attempt_ceiling ({}) must be >= link.max_reconnect_attempts ({})",
                self.link.reconnect_attempt_ceiling, self.link.max_reconnect_attempts
            )));
        }

        if !self.telemetry.max_hdop.is_finite() || self.telemetry.max_hdop <= 0.0 {
            return Err(Error::Config(format!(
                "telemetry.max_hdop must be a positive number, got {}",
                self.telemetry.max_hdop
            )));
        }

        if self.audio.volume > MAX_AUDIO_VOLUME {
            return Err(Error::Config(format!(
                "audio.volume must be 0-{MAX_AUDIO_VOLUME}, got {}",
                self.audio.volume
            )));
        }

        // Blocking calls have to finish inside one watchdog period.
        if self.network.request_timeout_ms >= self.watchdog.timeout_ms {
            return Err(Error::Config(format!(
                "network.request_timeout_ms ({}) must be below watchdog.timeout_ms ({})",
                self.network.request_timeout_ms, self.watchdog.timeout_ms
            )));
        }

        if self.device.tick_period_ms >= self.watchdog.timeout_ms {
            return Err(Error::Config(format!(
                "device.tick_period_ms ({}) must be below watchdog.timeout_ms ({})",
                self.device.tick_period_ms, self.watchdog.timeout_ms
            )));
        }

        Ok(())
    }
}

fn require_positive(key: &str, value: u64) -> Result<()> {
    if value == 0 {
        return Err(Error::Config(format!("{key} must be greater than zero")));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults_match_factory_settings() {
        let config = DeviceConfig::default();

        assert_eq!(config.telemetry.send_interval(), Duration::from_millis(5_000));
        assert_eq!(config.session.card_debounce(), Duration::from_millis(1_000));
        assert_eq!(config.session.session_timeout(), Duration::from_secs(12 * 3600));
        assert_eq!(
            config.session.unauthorized_cooldown(),
            Duration::from_secs(6 * 3600)
        );
        assert_eq!(config.link.max_reconnect_attempts, 5);
        assert_eq!(config.link.rssi_alert_threshold_dbm, -75);
        assert_eq!(config.telemetry.min_satellites, 4);
        assert_eq!(config.telemetry.max_hdop, 5.0);
        assert_eq!(config.audio.tracks.entry.number(), 1);
        assert_eq!(config.audio.tracks.unauthorized.number(), 2);
        assert_eq!(config.audio.tracks.error.number(), 3);
        assert_eq!(config.audio.tracks.authorized.number(), 4);
        assert_eq!(config.audio.tracks.link_failure.number(), 3);

        config.validate().unwrap();
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = DeviceConfig::from_toml_str(
            r#"
            [device]
            device_id = "TRUCK-17"

            [telemetry]
            send_interval_ms = 10000
            max_hdop = 3.5

            [audio.tracks]
            authorized = 7
            "#,
        )
        .unwrap();

        assert_eq!(config.device.device_id, "TRUCK-17");
        assert_eq!(config.telemetry.send_interval_ms, 10_000);
        assert_eq!(config.telemetry.max_hdop, 3.5);
        assert_eq!(config.telemetry.min_satellites, DEFAULT_MIN_SATELLITES);
        assert_eq!(config.audio.tracks.authorized.number(), 7);
        assert_eq!(config.audio.tracks.entry.number(), TRACK_ENTRY);
        assert_eq!(config.network.server_url, DEFAULT_SERVER_URL);
    }

    #[test]
    fn test_invalid_toml_is_config_error() {
        let result = DeviceConfig::from_toml_str("[telemetry]\nsend_interval_ms = \"soon\"");
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[test]
    fn test_env_overrides() {
        let config = DeviceConfig::default().with_env_overrides(|key| match key {
            ENV_DEVICE_ID => Some("TRUCK-99".to_string()),
            ENV_SERVER_URL => Some("  ".to_string()),
            _ => None,
        });

        assert_eq!(config.device.device_id, "TRUCK-99");
        assert_eq!(config.network.server_url, DEFAULT_SERVER_URL);
    }

    #[test]
    fn test_validate_rejects_request_timeout_beyond_watchdog() {
        let mut config = DeviceConfig::default();
        config.network.request_timeout_ms = config.watchdog.timeout_ms;

        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("watchdog.timeout_ms"));
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut config = DeviceConfig::default();
        config.device.device_id = "bad id".into();
        assert!(config.validate().is_err());

        let mut config = DeviceConfig::default();
        config.network.server_url = "ftp://example.com".into();
        assert!(config.validate().is_err());

        let mut config = DeviceConfig::default();
        config.telemetry.max_hdop = f32::NAN;
        assert!(config.validate().is_err());

        let mut config = DeviceConfig::default();
        config.audio.volume = 31;
        assert!(config.validate().is_err());

        let mut config = DeviceConfig::default();
        config.link.max_reconnect_attempts = 0;
        assert!(config.validate().is_err());

        let mut config = DeviceConfig::default();
        config.link.reconnect_attempt_ceiling = 2;
        assert!(config.validate().is_err());

        let mut config = DeviceConfig::default();
        config.telemetry.send_interval_ms = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "[network]\nserver_url = \"https://fleet.example.com/api/device/gps-data\""
        )
        .unwrap();

        let config = DeviceConfig::from_file(file.path()).unwrap();
        assert_eq!(
            config.network.server_url,
            "https://fleet.example.com/api/device/gps-data"
        );
        config.validate().unwrap();
    }

    #[test]
    fn test_from_missing_file_is_io_error() {
        let result = DeviceConfig::from_file("/nonexistent/tracklink.toml");
        assert!(matches!(result, Err(Error::Io(_))));
    }

    #[test]
    fn test_sample_config_matches_defaults() {
        let path = concat!(env!("CARGO_MANIFEST_DIR"), "/../../config/tracklink.toml");
        let config = DeviceConfig::from_file(path).unwrap();
        assert_eq!(config, DeviceConfig::default());
    }
}

//! HTTP client for the tracking backend.
//!
//! # Architecture
//!
//! ```text
//! Device
//!     │
//!     ├─> SessionController ── authorization request ─┐
//!     │                                                │
//!     └─> TelemetryScheduler ── periodic report ──────┤
//!                                                      │
//!                                   HttpAuthClient ───(HTTP POST, JSON)───> Backend
//! ```
//!
//! # Design Principles
//!
//! - **No automatic retry**: the session's cooldown is the retry policy
//! - **Bounded**: the whole exchange (connect, send, read body) runs under one
//!   timeout that stays below the watchdog timeout
//! - **Status first**: a non-2xx status is a transport failure whatever the
//!   body says; only 2xx bodies are decoded
//!
//! # Example Usage
//!
//! ```no_run
//! use std::time::Duration;
//! use chrono::Utc;
//! use tracklink_core::{CardUid, DeviceId};
//! use tracklink_network::{AuthTransport, DeviceReport, HttpAuthClient, HttpAuthClientConfig};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let mut client = HttpAuthClient::new(HttpAuthClientConfig {
//!     server_url: "http://192.168.1.20:9041/api/device/gps-data".into(),
//!     timeout: Duration::from_millis(5000),
//! })?;
//!
//! let report = DeviceReport::new(DeviceId::new("ESP32-001")?, Utc::now())
//!     .with_card(CardUid::new("12AB34CD")?);
//! let response = client.exchange(&report).await?;
//! println!("{}", response.message);
//! # Ok(())
//! # }
//! ```

use std::time::Duration;

use tracing::{debug, trace, warn};
use tracklink_core::constants::{DEFAULT_REQUEST_TIMEOUT_MS, DEFAULT_SERVER_URL};

use crate::error::HttpClientError;
use crate::payload::{AuthResponse, DeviceReport};
use crate::transport::AuthTransport;

/// Configuration for the HTTP client.
#[derive(Debug, Clone)]
pub struct HttpAuthClientConfig {
    /// Endpoint every report is posted to.
    pub server_url: String,

    /// Bound on one whole exchange.
    pub timeout: Duration,
}

impl Default for HttpAuthClientConfig {
    fn default() -> Self {
        Self {
            server_url: DEFAULT_SERVER_URL.to_string(),
            timeout: Duration::from_millis(DEFAULT_REQUEST_TIMEOUT_MS),
        }
    }
}

impl From<&tracklink_core::DeviceConfig> for HttpAuthClientConfig {
    fn from(config: &tracklink_core::DeviceConfig) -> Self {
        Self {
            server_url: config.network.server_url.clone(),
            timeout: config.request_timeout(),
        }
    }
}

/// HTTP client posting [`DeviceReport`]s.
#[derive(Debug, Clone)]
pub struct HttpAuthClient {
    client: reqwest::Client,
    server_url: String,
    timeout: Duration,
}

impl HttpAuthClient {
    /// Build a client.
    ///
    /// # Errors
    ///
    /// Returns [`HttpClientError::Config`] if the TLS backend cannot be
    /// initialized.
    pub fn new(config: HttpAuthClientConfig) -> Result<Self, HttpClientError> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .connect_timeout(config.timeout)
            .build()
            .map_err(|e| HttpClientError::Config(e.to_string()))?;

        debug!(url = %config.server_url, timeout_ms = config.timeout.as_millis() as u64, "Created backend client");

        Ok(Self {
            client,
            server_url: config.server_url,
            timeout: config.timeout,
        })
    }

    pub fn server_url(&self) -> &str {
        &self.server_url
    }

    /// Post one report and decode the answer.
    ///
    /// # Errors
    ///
    /// - [`HttpClientError::Timeout`] if the exchange exceeds the timeout
    /// - [`HttpClientError::Request`] if the backend is unreachable
    /// - [`HttpClientError::Status`] for a status outside `[200, 300)`
    /// - [`HttpClientError::Decode`] for a malformed 2xx body
    pub async fn post(&self, report: &DeviceReport) -> Result<AuthResponse, HttpClientError> {
        trace!(
            device_id = %report.device_id,
            card = ?report.rfid_card_id.as_ref().map(|uid| uid.as_str()),
            has_position = report.position.is_some(),
            "Posting report"
        );

        match tokio::time::timeout(self.timeout, self.round_trip(report)).await {
            Ok(result) => result,
            Err(_) => {
                warn!("Request timeout after {}ms", self.timeout.as_millis());
                Err(HttpClientError::Timeout(self.timeout.as_millis() as u64))
            }
        }
    }

    async fn round_trip(&self, report: &DeviceReport) -> Result<AuthResponse, HttpClientError> {
        let response = self
            .client
            .post(self.server_url.as_str())
            .json(report)
            .send()
            .await?;

        let status = response.status();
        let body = response.bytes().await?;

        if !status.is_success() {
            warn!(
                status = status.as_u16(),
                body = %String::from_utf8_lossy(&body),
                "Backend rejected report"
            );
            return Err(HttpClientError::Status {
                status: status.as_u16(),
            });
        }

        let decoded = AuthResponse::decode(&body);
        match &decoded {
            Ok(response) => trace!(message = %response.message, "Received response"),
            Err(e) => warn!(error = %e, "Failed to decode response"),
        }
        decoded
    }
}

impl AuthTransport for HttpAuthClient {
    async fn exchange(&mut self, report: &DeviceReport) -> tracklink_core::Result<AuthResponse> {
        Ok(self.post(report).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = HttpAuthClientConfig::default();
        assert_eq!(config.server_url, DEFAULT_SERVER_URL);
        assert_eq!(config.timeout, Duration::from_millis(5000));
    }

    #[test]
    fn test_config_from_device_config() {
        let mut device = tracklink_core::DeviceConfig::default();
        device.network.server_url = "https://fleet.example.com/api/device/gps-data".into();
        device.network.request_timeout_ms = 2500;

        let config = HttpAuthClientConfig::from(&device);
        assert_eq!(config.server_url, "https://fleet.example.com/api/device/gps-data");
        assert_eq!(config.timeout, Duration::from_millis(2500));
    }

    #[test]
    fn test_new_client() {
        let client = HttpAuthClient::new(HttpAuthClientConfig::default()).unwrap();
        assert_eq!(client.server_url(), DEFAULT_SERVER_URL);
    }
}

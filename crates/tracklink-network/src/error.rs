//! Errors raised by the backend HTTP client.

use thiserror::Error;

/// Errors that can occur while exchanging a report with the backend.
#[derive(Debug, Error)]
pub enum HttpClientError {
    /// The whole exchange did not finish in time.
    #[error("Request timeout after {0}ms")]
    Timeout(u64),

    /// The request could not be sent or the response body not read.
    #[error("Request failed: {0}")]
    Request(String),

    /// The backend answered with a status outside `[200, 300)`.
    #[error("Unexpected HTTP status {status}")]
    Status { status: u16 },

    /// The response body is not the expected JSON document.
    #[error("Malformed response body: {0}")]
    Decode(String),

    /// The HTTP client could not be built.
    #[error("Client configuration error: {0}")]
    Config(String),
}

impl From<reqwest::Error> for HttpClientError {
    fn from(error: reqwest::Error) -> Self {
        HttpClientError::Request(error.to_string())
    }
}

impl From<serde_json::Error> for HttpClientError {
    fn from(error: serde_json::Error) -> Self {
        HttpClientError::Decode(error.to_string())
    }
}

impl From<HttpClientError> for tracklink_core::Error {
    fn from(error: HttpClientError) -> Self {
        match error {
            HttpClientError::Decode(_) => tracklink_core::Error::DecodeFailure(error.to_string()),
            HttpClientError::Config(_) => tracklink_core::Error::Config(error.to_string()),
            HttpClientError::Timeout(_)
            | HttpClientError::Request(_)
            | HttpClientError::Status { .. } => {
                tracklink_core::Error::TransportFailure(error.to_string())
            }
        }
    }
}

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    // Link errors
    #[error("Connectivity failure: {0}")]
    ConnectivityFailure(String),

    #[error("Transport failure: {0}")]
    TransportFailure(String),

    #[error("Decode failure: {0}")]
    DecodeFailure(String),

    // Peripheral errors
    #[error("Card reader fault: {0}")]
    ReaderFault(String),

    // Validation errors
    #[error("Invalid card format: {0}")]
    InvalidCardFormat(String),

    #[error("Invalid device id: {0}")]
    InvalidDeviceId(String),

    #[error("Invalid state transition from {from} to {to}")]
    InvalidStateTransition { from: String, to: String },

    // IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),
}

impl Error {
    /// Returns `true` for failures of a request/response exchange with the
    /// backend (unreachable, non-2xx status or malformed body).
    ///
    /// Other errors out of an exchange, such as a bad server URL, are local
    /// faults.
    #[must_use]
    pub fn is_request_failure(&self) -> bool {
        matches!(self, Error::TransportFailure(_) | Error::DecodeFailure(_))
    }
}

pub type Result<T> = std::result::Result<T, Error>;

//! Peripheral error type.
//!
//! Every peripheral driver reports through [`HardwareError`]. The controller
//! turns a card reader failure into a core [`ReaderFault`] and logs audio or
//! watchdog failures without stopping the loop.
//!
//! [`ReaderFault`]: tracklink_core::Error::ReaderFault

/// Result type alias for peripheral operations.
pub type Result<T> = std::result::Result<T, HardwareError>;

/// Failure of a peripheral driver.
#[derive(Debug, thiserror::Error)]
pub enum HardwareError {
    /// The peripheral went away (closed port, dropped channel).
    #[error("{device} disconnected")]
    Disconnected { device: String },

    /// Polled before `begin()` succeeded.
    #[error("{device} used before initialization")]
    NotInitialized { device: String },

    /// `begin()` could not bring the peripheral up.
    #[error("Initialization failed: {message}")]
    InitializationFailed { message: String },

    /// A command could not be delivered to the peripheral.
    #[error("Peripheral not responding: {message}")]
    Communication { message: String },

    /// The peripheral sent something that is not a valid value.
    #[error("Invalid data: {message}")]
    InvalidData { message: String },

    /// The card reader reported a failed read.
    #[error("Card read failed: {message}")]
    CardRead { message: String },

    #[error("Serial I/O: {0}")]
    Io(#[from] std::io::Error),
}

impl HardwareError {
    pub fn disconnected(device: impl Into<String>) -> Self {
        Self::Disconnected {
            device: device.into(),
        }
    }

    pub fn not_initialized(device: impl Into<String>) -> Self {
        Self::NotInitialized {
            device: device.into(),
        }
    }

    pub fn initialization_failed(message: impl Into<String>) -> Self {
        Self::InitializationFailed {
            message: message.into(),
        }
    }

    pub fn communication(message: impl Into<String>) -> Self {
        Self::Communication {
            message: message.into(),
        }
    }

    pub fn invalid_data(message: impl Into<String>) -> Self {
        Self::InvalidData {
            message: message.into(),
        }
    }

    pub fn card_read(message: impl Into<String>) -> Self {
        Self::CardRead {
            message: message.into(),
        }
    }
}

impl From<HardwareError> for tracklink_core::Error {
    fn from(error: HardwareError) -> Self {
        match error {
            HardwareError::Io(e) => tracklink_core::Error::Io(e),
            other => tracklink_core::Error::ReaderFault(other.to_string()),
        }
    }
}

//! Enum wrappers for hardware device dispatch.
//!
//! Native `async fn` in traits is not object-safe, so we cannot hold a
//! `Box<dyn CardReader>`. The binary picks a concrete device at startup and
//! wraps it in one of these enums; the controller stays generic over the
//! trait and is monomorphized once per wrapper.
//!
//! Only the card reader and audio player have a hardware implementation
//! (behind the `hardware-serial` feature); the other collaborators are used
//! through their concrete types.
//!
//! # Examples
//!
//! ```
//! use std::time::Duration;
//! use tracklink_hardware::devices::AnyCardReader;
//! use tracklink_hardware::mock::MockCardReader;
//!
//! let (reader, _handle) = MockCardReader::new(Duration::from_millis(1000));
//! let reader = AnyCardReader::Mock(reader);
//! ```

use std::time::Instant;

use tracklink_core::{CardUid, TrackId};

#[cfg(feature = "hardware-serial")]
use crate::serial::{SerialAudioPlayer, SerialCardReader};
use crate::{
    Result,
    mock::{MockAudioPlayer, MockCardReader},
    traits::{AudioPlayer, CardReader},
    types::DeviceInfo,
};

/// Enum wrapper for card reader dispatch.
#[derive(Debug)]
#[non_exhaustive]
pub enum AnyCardReader {
    /// Mock reader for development and testing.
    Mock(MockCardReader),

    /// Card reader bridge on a serial port.
    #[cfg(feature = "hardware-serial")]
    Serial(SerialCardReader),
}

impl CardReader for AnyCardReader {
    async fn begin(&mut self) -> Result<()> {
        match self {
            Self::Mock(device) => device.begin().await,
            #[cfg(feature = "hardware-serial")]
            Self::Serial(device) => device.begin().await,
        }
    }

    async fn poll_card(&mut self, now: Instant) -> Result<Option<CardUid>> {
        match self {
            Self::Mock(device) => device.poll_card(now).await,
            #[cfg(feature = "hardware-serial")]
            Self::Serial(device) => device.poll_card(now).await,
        }
    }

    fn is_healthy(&self) -> bool {
        match self {
            Self::Mock(device) => device.is_healthy(),
            #[cfg(feature = "hardware-serial")]
            Self::Serial(device) => device.is_healthy(),
        }
    }

    fn info(&self) -> DeviceInfo {
        match self {
            Self::Mock(device) => device.info(),
            #[cfg(feature = "hardware-serial")]
            Self::Serial(device) => device.info(),
        }
    }
}

/// Enum wrapper for audio player dispatch.
#[derive(Debug)]
#[non_exhaustive]
pub enum AnyAudioPlayer {
    /// Mock player recording commands.
    Mock(MockAudioPlayer),

    /// MP3 module on a serial port.
    #[cfg(feature = "hardware-serial")]
    Serial(SerialAudioPlayer),
}

impl AudioPlayer for AnyAudioPlayer {
    async fn set_volume(&mut self, level: u8) -> Result<()> {
        match self {
            Self::Mock(device) => device.set_volume(level).await,
            #[cfg(feature = "hardware-serial")]
            Self::Serial(device) => device.set_volume(level).await,
        }
    }

    async fn play_track(&mut self, track: TrackId) -> Result<()> {
        match self {
            Self::Mock(device) => device.play_track(track).await,
            #[cfg(feature = "hardware-serial")]
            Self::Serial(device) => device.play_track(track).await,
        }
    }

    fn info(&self) -> DeviceInfo {
        match self {
            Self::Mock(device) => device.info(),
            #[cfg(feature = "hardware-serial")]
            Self::Serial(device) => device.info(),
        }
    }
}

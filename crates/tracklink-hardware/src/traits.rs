//! Hardware device trait definitions.
//!
//! This module defines the capability interfaces between the orchestration
//! layer and the peripherals of the vehicle unit: card reader, GPS receiver,
//! audio module, radio link and watchdog. Each has a mock implementation in
//! [`mock`](crate::mock) so the control loop can be driven without hardware.
//!
//! All traits use native `async fn` methods (Rust 1.90 + Edition 2024 RPITIT),
//! eliminating the need for the `async_trait` macro.
//!
//! # Polling contract
//!
//! The control loop is single-threaded and cooperative. Every method here must
//! return promptly: "nothing happened" is `Ok(None)` or a status value, never a
//! wait. The one exchange allowed to take time, the backend request, lives in
//! `tracklink-network` and is bounded by a timeout there.

#![allow(async_fn_in_trait)]

use std::time::Instant;

use tracklink_core::{CardUid, TrackId};

use crate::error::Result;
use crate::types::{DeviceInfo, LinkStatus, LocationFix};

/// Proximity card reader.
///
/// Yields a UID once per presentation. Implementations debounce: the same
/// UID read again within the debounce window is suppressed (see
/// [`UidDebouncer`](crate::debounce::UidDebouncer)).
///
/// # Object Safety and Dynamic Dispatch
///
/// This trait is NOT object-safe because `async fn` methods return
/// `impl Future`. Use generic type parameters, or the enum wrapper
/// [`AnyCardReader`](crate::devices::AnyCardReader) when the concrete reader
/// is chosen at runtime.
///
/// # Examples
///
/// ```
/// use std::time::{Duration, Instant};
/// use tracklink_hardware::mock::MockCardReader;
/// use tracklink_hardware::traits::CardReader;
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() -> tracklink_hardware::Result<()> {
/// let (mut reader, handle) = MockCardReader::new(Duration::from_millis(1000));
/// reader.begin().await?;
///
/// handle.present("12AB34CD")?;
/// let uid = reader.poll_card(Instant::now()).await?;
/// assert_eq!(uid.unwrap().as_str(), "12AB34CD");
/// # Ok(())
/// # }
/// ```
pub trait CardReader: Send + Sync {
    /// Initialize the reader.
    ///
    /// # Errors
    ///
    /// Returns an error if the reader does not respond. Callers treat this as
    /// a reader fault and disable card-triggered authorization.
    async fn begin(&mut self) -> Result<()>;

    /// Poll for a newly presented card.
    ///
    /// Returns `Ok(None)` when no new card is present or the read was
    /// suppressed by the debounce window. `now` is the control loop's clock.
    ///
    /// # Errors
    ///
    /// Returns an error if the reader is not initialized or the read fails.
    async fn poll_card(&mut self, now: Instant) -> Result<Option<CardUid>>;

    /// Whether the reader initialized and is usable.
    fn is_healthy(&self) -> bool;

    /// Reader metadata for startup logs.
    fn info(&self) -> DeviceInfo;
}

/// GPS receiver.
///
/// Sentence decoding happens below this interface; the orchestration layer
/// only sees the latest decoded [`LocationFix`].
pub trait LocationSource: Send + Sync {
    /// Return the current fix.
    ///
    /// A receiver without a fix returns `Ok` with `valid == false`; errors
    /// are reserved for a receiver that cannot be read at all.
    async fn read_fix(&mut self) -> Result<LocationFix>;
}

/// Audio module playing numbered tracks.
///
/// Commands are fire-and-forget: implementations write the command and
/// return without waiting for playback.
pub trait AudioPlayer: Send + Sync {
    /// Set the playback volume (0-30, implementations clamp).
    async fn set_volume(&mut self, level: u8) -> Result<()>;

    /// Start playing a track.
    async fn play_track(&mut self, track: TrackId) -> Result<()>;

    /// Module metadata for startup logs.
    fn info(&self) -> DeviceInfo;
}

/// Wireless radio.
///
/// The supervisor drives association through [`begin`](Self::begin) and
/// observes progress through [`status`](Self::status); a radio never blocks
/// waiting for the access point.
pub trait LinkDriver: Send + Sync {
    /// Start (or restart) an association attempt.
    async fn begin(&mut self) -> Result<()>;

    /// Current link status.
    async fn status(&mut self) -> Result<LinkStatus>;

    /// Received signal strength in dBm while connected.
    async fn rssi(&self) -> Option<i32>;

    /// Drop the link and power the radio down.
    async fn disconnect(&mut self) -> Result<()>;
}

/// Hardware watchdog.
///
/// Programming the timer is the implementation's business; the control loop
/// only feeds it once per tick.
pub trait Watchdog: Send + Sync {
    /// Reset the watchdog timer.
    async fn feed(&mut self) -> Result<()>;
}

//! Peripheral abstraction layer for the tracklink vehicle unit.
//!
//! This crate provides trait-based abstractions for the peripherals the
//! orchestration layer talks to: the proximity card reader, the GPS receiver,
//! the audio module, the wireless radio and the hardware watchdog. The traits
//! allow easy substitution between mock implementations (for development and
//! testing) and real hardware drivers.
//!
//! # Design Philosophy
//!
//! - **Async-first**: all I/O uses native `async fn` in traits (Rust 1.90 +
//!   Edition 2024 RPITIT).
//! - **Non-blocking**: every call returns promptly; the control loop owns all
//!   timing and passes its clock in where a device needs it.
//! - **Thread-safe**: all traits require `Send + Sync` for use with Tokio.
//! - **Error-aware**: all operations return [`Result<T>`] with a
//!   [`HardwareError`] describing the failure.
//!
//! # Device Traits
//!
//! ```no_run
//! use std::time::Instant;
//! use tracklink_hardware::traits::{AudioPlayer, CardReader};
//! use tracklink_hardware::Result;
//! use tracklink_core::TrackId;
//!
//! async fn beep_on_card<R: CardReader, A: AudioPlayer>(reader: &mut R, audio: &mut A) -> Result<()> {
//!     if let Some(uid) = reader.poll_card(Instant::now()).await? {
//!         println!("card {uid}");
//!         audio.play_track(TrackId::new(1)).await?;
//!     }
//!     Ok(())
//! }
//! ```
//!
//! # Mock Implementations
//!
//! Every trait has a mock in [`mock`] that comes with a control handle. The
//! serial card reader bridge and MP3 module live in `serial` behind the
//! `hardware-serial` feature.

pub mod audio_frame;
pub mod debounce;
pub mod devices;
pub mod error;
pub mod mock;
#[cfg(feature = "hardware-serial")]
pub mod serial;
pub mod traits;
pub mod types;

// Re-export commonly used types for convenience
pub use debounce::UidDebouncer;
pub use devices::{AnyAudioPlayer, AnyCardReader};
pub use error::{HardwareError, Result};
pub use traits::{AudioPlayer, CardReader, LinkDriver, LocationSource, Watchdog};
pub use types::{DeviceInfo, LinkStatus, LocationFix};

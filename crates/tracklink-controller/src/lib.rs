//! Orchestration layer of the tracklink vehicle unit.
//!
//! Each controller owns one concern and takes the current time as an
//! argument, so tests drive them with explicit instants:
//!
//! - [`session`]: driver sessions from card reads and backend answers
//! - [`connectivity`]: radio link supervision with bounded retries
//! - [`telemetry`]: fixed-interval position reports gated on fix quality
//! - [`feedback`]: audio tracks for session and link events
//! - [`watchdog`]: watchdog feeding
//!
//! [`Device`] wires them to the peripherals and runs one tick at a time.
//!
//! # Example
//!
//! ```
//! use std::time::{Duration, Instant};
//! use tracklink_controller::{Device, Peripherals};
//! use tracklink_core::DeviceConfig;
//! use tracklink_hardware::mock::{
//!     MockAudioPlayer, MockCardReader, MockLink, MockLocationSource, MockWatchdog,
//! };
//! use tracklink_network::MockTransport;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> tracklink_core::Result<()> {
//! let config = DeviceConfig::default();
//! let (reader, _cards) = MockCardReader::new(config.session.card_debounce());
//! let (location, _gps) = MockLocationSource::new();
//! let (link, _radio) = MockLink::new();
//! let (transport, _backend) = MockTransport::new();
//! let (audio, speaker) = MockAudioPlayer::new();
//! let (watchdog, _wdt) = MockWatchdog::new();
//!
//! let mut device = Device::new(
//!     &config,
//!     Peripherals { reader, location, link, transport, audio, watchdog },
//! )?;
//!
//! let t0 = Instant::now();
//! device.start(t0).await;
//! device.tick(t0 + Duration::from_millis(100)).await;
//!
//! assert_eq!(speaker.volume(), Some(24));
//! # Ok(())
//! # }
//! ```

pub mod connectivity;
pub mod device;
pub mod feedback;
pub mod session;
pub mod telemetry;
pub mod watchdog;

pub use connectivity::{ConnectionEvent, ConnectionState, ConnectivitySupervisor, LinkState};
pub use device::{Device, DeviceStats, Peripherals, TickReport};
pub use feedback::FeedbackDispatcher;
pub use session::{Session, SessionController, SessionState, SessionTransition, TransitionCause};
pub use telemetry::{SkipReason, TelemetryDecision, TelemetrySample, TelemetryScheduler};
pub use watchdog::WatchdogFeeder;

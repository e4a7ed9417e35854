//! Shared harness for device scenario tests.
//!
//! [`Harness`] builds a [`Device`] from mock peripherals and keeps every
//! control handle, so a scenario can present cards, move the vehicle, drop
//! the radio and inspect what the backend and the speaker received.
//!
//! Time is explicit: the harness keeps its own clock and advances it in
//! tick-period steps (`run_for`) or in one jump (`jump`).

#![allow(dead_code)]

use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};

use tracklink_controller::{Device, Peripherals, TickReport};
use tracklink_core::{CardUid, DeviceConfig};
use tracklink_hardware::{LinkStatus, LocationFix};
use tracklink_hardware::mock::{
    MockAudioHandle, MockAudioPlayer, MockCardReader, MockCardReaderHandle, MockLink,
    MockLinkHandle, MockLocationHandle, MockLocationSource, MockWatchdog, MockWatchdogHandle,
};
use tracklink_network::{AuthResponse, MockTransport, MockTransportHandle};

pub const ANA_CARD: &str = "12AB34CD";
pub const DENIED_CARD: &str = "DEADBEEF";

pub type MockDevice = Device<
    MockCardReader,
    MockLocationSource,
    MockLink,
    MockTransport,
    MockAudioPlayer,
    MockWatchdog,
>;

/// One tick and the instant it ran at.
pub type Tick = (Instant, TickReport);

pub struct Harness {
    pub device: MockDevice,
    pub cards: MockCardReaderHandle,
    pub gps: MockLocationHandle,
    pub radio: MockLinkHandle,
    pub backend: MockTransportHandle,
    pub speaker: MockAudioHandle,
    pub wdt: MockWatchdogHandle,
    pub config: DeviceConfig,
    pub t0: Instant,
    pub now: Instant,
}

impl Harness {
    pub fn new(config: DeviceConfig) -> Self {
        let (reader, cards) = MockCardReader::new(config.session.card_debounce());
        Self::with_reader(config, reader, cards)
    }

    pub fn with_reader(
        config: DeviceConfig,
        reader: MockCardReader,
        cards: MockCardReaderHandle,
    ) -> Self {
        let (location, gps) = MockLocationSource::new();
        let (link, radio) = MockLink::new();
        let (transport, backend) = MockTransport::new();
        let (audio, speaker) = MockAudioPlayer::new();
        let (watchdog, wdt) = MockWatchdog::new();

        let device = Device::new(
            &config,
            Peripherals {
                reader,
                location,
                link,
                transport,
                audio,
                watchdog,
            },
        )
        .unwrap();

        let t0 = Instant::now();
        Self {
            device,
            cards,
            gps,
            radio,
            backend,
            speaker,
            wdt,
            config,
            t0,
            now: t0,
        }
    }

    /// Replace the wall clock stamped onto reports.
    pub fn with_clock(mut self, clock: fn() -> DateTime<Utc>) -> Self {
        self.device = self.device.with_clock(clock);
        self
    }

    /// Start the device with a radio that associates on the first try and
    /// run the tick that observes the link coming up.
    pub async fn start_connected(&mut self) {
        self.radio.script([LinkStatus::Connected]);
        self.device.start(self.now).await;
        self.tick().await;
        assert!(self.device.link().is_connected());
    }

    /// Start the device with a radio that never associates.
    pub async fn start_offline(&mut self) {
        self.device.start(self.now).await;
    }

    pub fn tick_period(&self) -> Duration {
        self.config.tick_period()
    }

    /// Advance one tick period and run a tick.
    pub async fn tick(&mut self) -> TickReport {
        self.now += self.tick_period();
        self.device.tick(self.now).await
    }

    /// Tick every period until `duration` has passed.
    pub async fn run_for(&mut self, duration: Duration) -> Vec<Tick> {
        let end = self.now + duration;
        let mut ticks = Vec::new();
        while self.now < end {
            let report = self.tick().await;
            ticks.push((self.now, report));
        }
        ticks
    }

    /// Run a single tick `duration` from now.
    pub async fn jump(&mut self, duration: Duration) -> TickReport {
        self.now += duration;
        self.device.tick(self.now).await
    }

    pub fn since_start(&self, at: Instant) -> Duration {
        at - self.t0
    }

    pub fn present(&self, uid: &str) {
        self.cards.present(uid).unwrap();
    }

    pub fn good_fix(&self) {
        self.gps.set_fix(
            LocationFix::new(41.0082, 28.9784)
                .with_motion(42.5, 180.0)
                .with_quality(1.2, 9),
        );
    }

    /// Backend that knows Ana Kaya, denies everyone else and acknowledges
    /// plain telemetry.
    pub fn fleet_backend(&self) {
        self.backend.respond_with(|report| {
            Ok(match &report.rfid_card_id {
                Some(uid) if uid.as_str() == ANA_CARD => {
                    AuthResponse::authorized("session-ana", "Ana Kaya")
                }
                Some(_) => AuthResponse::denied(),
                None => AuthResponse::acknowledged("Location saved"),
            })
        });
    }
}

pub fn uid(s: &str) -> CardUid {
    CardUid::new(s).unwrap()
}

pub fn ms(millis: u64) -> Duration {
    Duration::from_millis(millis)
}

/// Instants (relative to start) at which telemetry was released.
pub fn telemetry_sends(harness: &Harness, ticks: &[Tick]) -> Vec<Duration> {
    ticks
        .iter()
        .filter(|(_, report)| {
            matches!(
                report.telemetry,
                Some(tracklink_controller::TelemetryDecision::Send(_))
            )
        })
        .map(|(at, _)| harness.since_start(*at))
        .collect()
}

//! The vehicle unit control loop.
//!
//! [`Device`] owns every peripheral and every controller and runs them in a
//! fixed order once per tick. It is single-threaded: the loop task calls
//! [`Device::tick`] with the current time and nothing else touches the
//! session, the link or the audio module.
//!
//! # Tick order
//!
//! ```text
//! ┌─────────────┐   ┌───────────────┐   ┌──────────────┐   ┌─────────────┐
//! │ card reader │──►│ session tick  │──►│ link tick /  │──►│ auth request│
//! │ + GPS poll  │   │ (timeouts)    │   │ reconnect    │   │ (link up)   │
//! └─────────────┘   └───────────────┘   └──────────────┘   └──────┬──────┘
//!                                                                 │
//!        ┌──────────┐   ┌───────────┐   ┌───────────────┐         │
//!        │ watchdog │◄──│ feedback  │◄──│ telemetry     │◄────────┘
//!        └──────────┘   └───────────┘   └───────────────┘
//! ```
//!
//! Only the backend exchange awaits real I/O, and the transport bounds it by
//! the request timeout, which configuration keeps below the watchdog timeout.

use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use tracing::{debug, error, info, warn};
use tracklink_core::{CardUid, DeviceConfig, DeviceId, Result};
use tracklink_hardware::{
    AudioPlayer, CardReader, LinkDriver, LocationFix, LocationSource, Watchdog,
};
use tracklink_network::{AuthResponse, AuthTransport, DeviceReport, ReportPosition};

use crate::connectivity::{ConnectionEvent, ConnectivitySupervisor};
use crate::feedback::FeedbackDispatcher;
use crate::session::{SessionController, SessionTransition};
use crate::telemetry::{TelemetryDecision, TelemetrySample, TelemetryScheduler};
use crate::watchdog::WatchdogFeeder;

/// The collaborators a [`Device`] is built from.
#[derive(Debug)]
pub struct Peripherals<R, G, L, T, A, W> {
    pub reader: R,
    pub location: G,
    pub link: L,
    pub transport: T,
    pub audio: A,
    pub watchdog: W,
}

/// What one tick did.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TickReport {
    pub transitions: Vec<SessionTransition>,
    pub connection: Vec<ConnectionEvent>,
    pub telemetry: Option<TelemetryDecision>,
}

impl TickReport {
    pub fn is_quiet(&self) -> bool {
        self.transitions.is_empty()
            && self.connection.is_empty()
            && matches!(self.telemetry, None | Some(TelemetryDecision::NotDue))
    }
}

/// Counters for status logs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DeviceStats {
    pub ticks: u64,
    pub auth_requests: u64,
    pub reports_sent: u64,
    pub reports_failed: u64,
    pub reader_faults: u64,
}

/// One vehicle unit.
#[derive(Debug)]
pub struct Device<R, G, L, T, A, W> {
    device_id: DeviceId,
    reader: R,
    location: G,
    transport: T,
    reader_enabled: bool,
    last_fix: LocationFix,
    connect_timeout: Duration,
    sessions: SessionController,
    link: ConnectivitySupervisor<L>,
    telemetry: TelemetryScheduler,
    feedback: FeedbackDispatcher<A>,
    watchdog: WatchdogFeeder<W>,
    clock: fn() -> DateTime<Utc>,
    stats: DeviceStats,
}

impl<R, G, L, T, A, W> Device<R, G, L, T, A, W>
where
    R: CardReader,
    G: LocationSource,
    L: LinkDriver,
    T: AuthTransport,
    A: AudioPlayer,
    W: Watchdog,
{
    /// Build a device from a validated configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the configured device id is invalid.
    pub fn new(
        config: &DeviceConfig,
        peripherals: Peripherals<R, G, L, T, A, W>,
    ) -> Result<Self> {
        let Peripherals {
            reader,
            location,
            link,
            transport,
            audio,
            watchdog,
        } = peripherals;

        Ok(Self {
            device_id: config.device_id()?,
            reader,
            location,
            transport,
            reader_enabled: true,
            last_fix: LocationFix::invalid(),
            connect_timeout: config.link.connect_timeout(),
            sessions: SessionController::new(&config.session),
            link: ConnectivitySupervisor::new(link, &config.link),
            telemetry: TelemetryScheduler::new(&config.telemetry),
            feedback: FeedbackDispatcher::new(audio, &config.audio),
            watchdog: WatchdogFeeder::new(watchdog, &config.watchdog),
            clock: Utc::now,
            stats: DeviceStats::default(),
        })
    }

    /// Replace the wall clock used for report timestamps.
    #[must_use]
    pub fn with_clock(mut self, clock: fn() -> DateTime<Utc>) -> Self {
        self.clock = clock;
        self
    }

    pub fn device_id(&self) -> &DeviceId {
        &self.device_id
    }

    pub fn sessions(&self) -> &SessionController {
        &self.sessions
    }

    pub fn link(&self) -> &ConnectivitySupervisor<L> {
        &self.link
    }

    pub fn telemetry(&self) -> &TelemetryScheduler {
        &self.telemetry
    }

    pub fn feedback(&self) -> &FeedbackDispatcher<A> {
        &self.feedback
    }

    pub fn watchdog(&self) -> &WatchdogFeeder<W> {
        &self.watchdog
    }

    /// Whether card reads can start authorization.
    pub fn reader_enabled(&self) -> bool {
        self.reader_enabled
    }

    pub fn last_fix(&self) -> &LocationFix {
        &self.last_fix
    }

    pub fn stats(&self) -> DeviceStats {
        self.stats
    }

    /// Bring up the peripherals.
    ///
    /// A card reader that fails to initialize disables card-triggered
    /// authorization; telemetry keeps running.
    pub async fn start(&mut self, now: Instant) {
        info!(device_id = %self.device_id, "Starting vehicle unit");

        match self.reader.begin().await {
            Ok(()) => {
                let info = self.reader.info();
                info!(name = %info.name, model = %info.model, "Card reader ready");
            }
            Err(e) => {
                self.reader_enabled = false;
                self.stats.reader_faults += 1;
                let fault = tracklink_core::Error::from(e);
                error!(error = %fault, "Card reader unavailable, card authorization disabled");
            }
        }

        self.feedback.begin().await;
        self.link.connect(self.connect_timeout, now).await;
        self.telemetry.start(now);
        self.watchdog.feed(now).await;
    }

    /// Run one control loop iteration.
    pub async fn tick(&mut self, now: Instant) -> TickReport {
        self.stats.ticks += 1;
        let mut report = TickReport::default();

        if let Some(uid) = self.poll_card(now).await {
            report.transitions.extend(self.sessions.on_card(uid, now));
        }
        self.poll_location().await;
        report.transitions.extend(self.sessions.tick(now));

        report.connection = self.link.tick(now).await;
        if self.link.should_reconnect(now) {
            let policy = *self.link.policy();
            self.link
                .reconnect(policy.max_attempts, policy.backoff_base, now)
                .await;
        }

        if self.link.is_connected()
            && let Some(uid) = self.sessions.take_auth_request()
        {
            let result = self.request_authorization(&uid).await;
            report
                .transitions
                .extend(self.sessions.on_auth_result(&uid, result, now));
        }

        let decision = self
            .telemetry
            .poll(now, self.link.is_connected(), &self.last_fix);
        if let TelemetryDecision::Send(sample) = decision {
            report
                .transitions
                .extend(self.send_telemetry(sample.position(), now).await);
        }
        report.telemetry = Some(decision);

        for transition in &report.transitions {
            self.feedback.on_transition(transition).await;
        }
        for event in &report.connection {
            self.feedback.on_connection_event(event).await;
        }

        self.watchdog.feed(now).await;
        report
    }

    /// Drop the link before exiting.
    pub async fn shutdown(&mut self) {
        info!(
            ticks = self.stats.ticks,
            reports_sent = self.stats.reports_sent,
            "Shutting down vehicle unit"
        );
        self.link.disconnect().await;
    }

    async fn poll_card(&mut self, now: Instant) -> Option<CardUid> {
        if !self.reader_enabled || !self.reader.is_healthy() {
            return None;
        }

        match self.reader.poll_card(now).await {
            Ok(uid) => uid,
            Err(e) => {
                self.stats.reader_faults += 1;
                let fault = tracklink_core::Error::from(e);
                warn!(error = %fault, "Card read failed");
                None
            }
        }
    }

    async fn poll_location(&mut self) {
        self.last_fix = match self.location.read_fix().await {
            Ok(fix) => fix,
            Err(e) => {
                debug!(error = %e, "Location fix unavailable");
                LocationFix::invalid()
            }
        };
    }

    async fn request_authorization(&mut self, uid: &CardUid) -> Result<AuthResponse> {
        self.stats.auth_requests += 1;

        let mut request =
            DeviceReport::new(self.device_id.clone(), (self.clock)()).with_card(uid.clone());
        // Without a fix the request carries no position at all.
        if self.last_fix.valid {
            request = request.with_position(TelemetrySample::from_fix(&self.last_fix).position());
        }

        info!(
            card = %uid,
            with_position = request.position.is_some(),
            "Sending authorization request"
        );
        self.transport.exchange(&request).await
    }

    async fn send_telemetry(
        &mut self,
        position: ReportPosition,
        now: Instant,
    ) -> Option<SessionTransition> {
        let card = self.sessions.active_card().cloned();
        let mut report =
            DeviceReport::new(self.device_id.clone(), (self.clock)()).with_position(position);
        if let Some(uid) = &card {
            report = report.with_card(uid.clone());
        }

        match self.transport.exchange(&report).await {
            Ok(response) => {
                self.stats.reports_sent += 1;
                debug!(
                    latitude = position.latitude,
                    longitude = position.longitude,
                    message = %response.message,
                    "Telemetry delivered"
                );
                let uid = card?;
                self.sessions.on_telemetry_response(&uid, &response, now)
            }
            Err(e) => {
                self.stats.reports_failed += 1;
                warn!(error = %e, "Telemetry report dropped");
                None
            }
        }
    }
}

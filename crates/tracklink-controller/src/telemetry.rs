//! Periodic position reporting.
//!
//! The scheduler decides when a report is due and whether the current fix
//! may be sent. Firings sit on a grid anchored at [`start`]: `start + k·interval`.
//! A tick that arrives late fires once and the next firing is the first grid
//! point after it, so an outage never produces a burst of catch-up reports.
//!
//! [`start`]: TelemetryScheduler::start

use std::fmt;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use tracing::debug;
use tracklink_core::config::TelemetryConfig;
use tracklink_hardware::LocationFix;
use tracklink_network::ReportPosition;

/// Why a due report was not sent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    LinkDown,
    NoFix,
    TooFewSatellites,
    /// HDOP above the limit, or not a finite number.
    HdopTooHigh,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::LinkDown => write!(f, "link down"),
            Self::NoFix => write!(f, "no fix"),
            Self::TooFewSatellites => write!(f, "too few satellites"),
            Self::HdopTooHigh => write!(f, "HDOP too high"),
        }
    }
}

/// Position data of one report.
///
/// The sample has no wall-clock timestamp of its own. [`Device`] stamps the
/// outgoing [`DeviceReport`] from its injected clock when it sends the
/// sample; scheduling runs on `Instant` only.
///
/// [`Device`]: crate::device::Device
/// [`DeviceReport`]: tracklink_network::DeviceReport
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TelemetrySample {
    pub latitude: f64,
    pub longitude: f64,
    pub speed_kmph: f32,
    pub heading_deg: f32,
    pub hdop: f32,
}

impl TelemetrySample {
    pub fn from_fix(fix: &LocationFix) -> Self {
        Self {
            latitude: fix.latitude,
            longitude: fix.longitude,
            speed_kmph: fix.speed_kmph,
            heading_deg: fix.heading_deg,
            hdop: fix.hdop,
        }
    }

    /// Wire form of the sample.
    pub fn position(&self) -> ReportPosition {
        ReportPosition {
            latitude: self.latitude,
            longitude: self.longitude,
            speed: self.speed_kmph,
            heading: self.heading_deg,
            accuracy: self.hdop,
        }
    }
}

/// Outcome of [`TelemetryScheduler::poll`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TelemetryDecision {
    NotDue,
    Skipped(SkipReason),
    Send(TelemetrySample),
}

/// Fix quality limits for a reportable position.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FixGate {
    pub min_satellites: u8,
    pub max_hdop: f32,
}

impl FixGate {
    /// First reason the report must be skipped, if any.
    pub fn check(&self, link_up: bool, fix: &LocationFix) -> Option<SkipReason> {
        if !link_up {
            Some(SkipReason::LinkDown)
        } else if !fix.valid {
            Some(SkipReason::NoFix)
        } else if fix.satellites < self.min_satellites {
            Some(SkipReason::TooFewSatellites)
        } else if !fix.hdop.is_finite() || fix.hdop > self.max_hdop {
            Some(SkipReason::HdopTooHigh)
        } else {
            None
        }
    }
}

/// Fixed-interval report scheduler.
#[derive(Debug, Clone)]
pub struct TelemetryScheduler {
    interval: Duration,
    gate: FixGate,
    anchor: Option<Instant>,
    next_due: Option<Instant>,
    sent: u64,
    skipped: u64,
}

impl TelemetryScheduler {
    pub fn new(config: &TelemetryConfig) -> Self {
        Self::with_gate(
            config.send_interval(),
            FixGate {
                min_satellites: config.min_satellites,
                max_hdop: config.max_hdop,
            },
        )
    }

    pub fn with_gate(interval: Duration, gate: FixGate) -> Self {
        Self {
            interval,
            gate,
            anchor: None,
            next_due: None,
            sent: 0,
            skipped: 0,
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn gate(&self) -> &FixGate {
        &self.gate
    }

    pub fn next_due(&self) -> Option<Instant> {
        self.next_due
    }

    /// Reports released for sending.
    pub fn sent_count(&self) -> u64 {
        self.sent
    }

    /// Due firings that were skipped.
    pub fn skipped_count(&self) -> u64 {
        self.skipped
    }

    /// Anchor the interval grid; the first firing is one interval later.
    pub fn start(&mut self, now: Instant) {
        self.anchor = Some(now);
        self.next_due = Some(now + self.interval);
        debug!(interval_ms = self.interval.as_millis() as u64, "Telemetry scheduler started");
    }

    /// Decide whether a report goes out at `now`.
    ///
    /// Polling a scheduler that was never started anchors it at `now`.
    pub fn poll(&mut self, now: Instant, link_up: bool, fix: &LocationFix) -> TelemetryDecision {
        let (Some(anchor), Some(due)) = (self.anchor, self.next_due) else {
            self.start(now);
            return TelemetryDecision::NotDue;
        };

        if now < due {
            return TelemetryDecision::NotDue;
        }

        self.next_due = Some(self.boundary_after(anchor, now));

        match self.gate.check(link_up, fix) {
            Some(reason) => {
                self.skipped += 1;
                debug!(%reason, satellites = fix.satellites, hdop = fix.hdop, "Telemetry skipped");
                TelemetryDecision::Skipped(reason)
            }
            None => {
                self.sent += 1;
                TelemetryDecision::Send(TelemetrySample::from_fix(fix))
            }
        }
    }

    /// First grid point strictly after `now`.
    fn boundary_after(&self, anchor: Instant, now: Instant) -> Instant {
        let step = self.interval.as_nanos().max(1);
        let periods = now.saturating_duration_since(anchor).as_nanos() / step + 1;
        let offset = u64::try_from(step.saturating_mul(periods)).unwrap_or(u64::MAX);
        anchor + Duration::from_nanos(offset)
    }
}

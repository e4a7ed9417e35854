//! Radio link supervision.
//!
//! The supervisor keeps the wireless link up with bounded retries. Nothing
//! here waits: `connect` and `reconnect` only record an operation with its
//! deadlines, and each [`tick`](ConnectivitySupervisor::tick) polls the radio
//! and advances that record.
//!
//! # Operations
//!
//! - `connect(timeout)`: one bounded attempt. An explicit association failure
//!   reported by the radio restarts the attempt at once instead of waiting out
//!   the rest of the timeout.
//! - `reconnect(max_attempts, base_delay)`: up to `max_attempts` attempts;
//!   after failed attempt *i* (0-indexed) the supervisor pauses
//!   `base_delay · 2^i` before continuing, and reports failure after the pause
//!   that follows the last attempt.
//!
//! A link that comes up by itself is observed by `tick` and counts as a
//! successful connect; that is the only other way the attempt counter resets.
//!
//! ```text
//! reconnect(3, 2s), every attempt times out:
//!
//!   attempt 0 ──fail── 2s ── attempt 1 ──fail── 4s ── attempt 2 ──fail── 8s ── ConnectFailed
//! ```

use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use tracklink_core::{Error, SignalQuality, config::LinkConfig};
use tracklink_hardware::{LinkDriver, LinkStatus};

/// Link state as seen by the rest of the device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LinkState {
    Disconnected,
    Connecting,
    Connected,
}

impl std::fmt::Display for LinkState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Disconnected => write!(f, "Disconnected"),
            Self::Connecting => write!(f, "Connecting"),
            Self::Connected => write!(f, "Connected"),
        }
    }
}

/// Snapshot of the link, mutated only by the supervisor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConnectionState {
    pub status: LinkState,

    /// Attempts since the last successful connect.
    pub attempt_count: u32,

    pub last_attempt_at: Option<Instant>,

    /// Last RSSI sample in dBm, while connected.
    pub rssi: Option<i32>,
}

impl ConnectionState {
    pub fn signal_quality(&self) -> Option<SignalQuality> {
        self.rssi.map(SignalQuality::from_rssi)
    }
}

impl Default for ConnectionState {
    fn default() -> Self {
        Self {
            status: LinkState::Disconnected,
            attempt_count: 0,
            last_attempt_at: None,
            rssi: None,
        }
    }
}

/// Things the supervisor observed during a tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionEvent {
    /// The link is up.
    Connected,

    /// One bounded attempt timed out. `retry_in` is the pause before the
    /// next step of a reconnect.
    AttemptFailed {
        attempt: u32,
        retry_in: Option<Duration>,
    },

    /// A `connect` or `reconnect` operation gave up.
    ConnectFailed { attempts: u32 },

    /// An established link went down.
    LinkLost,

    /// RSSI dropped below the alert threshold.
    SignalLow { rssi: i32 },
}

/// Retry limits, taken from [`LinkConfig`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LinkPolicy {
    pub connect_timeout: Duration,
    pub max_attempts: u32,
    pub backoff_base: Duration,
    pub reconnect_cooldown: Duration,
    pub attempt_ceiling: u32,
    pub rssi_alert_threshold: i32,
}

impl From<&LinkConfig> for LinkPolicy {
    fn from(config: &LinkConfig) -> Self {
        Self {
            connect_timeout: config.connect_timeout(),
            max_attempts: config.max_reconnect_attempts,
            backoff_base: config.backoff_base(),
            reconnect_cooldown: config.reconnect_cooldown(),
            attempt_ceiling: config.reconnect_attempt_ceiling,
            rssi_alert_threshold: config.rssi_alert_threshold_dbm,
        }
    }
}

/// Pause after failed attempt `attempt` (0-indexed): `base · 2^attempt`.
///
/// # Examples
///
/// ```
/// use std::time::Duration;
/// use tracklink_controller::connectivity::backoff_delay;
///
/// let base = Duration::from_millis(2000);
/// let delays: Vec<_> = (0..3).map(|i| backoff_delay(base, i).as_millis()).collect();
/// assert_eq!(delays, vec![2000, 4000, 8000]);
/// ```
pub fn backoff_delay(base: Duration, attempt: u32) -> Duration {
    base.saturating_mul(2u32.saturating_pow(attempt))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Plan {
    Single,
    Retry {
        max_attempts: u32,
        base_delay: Duration,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Operation {
    Idle,
    Attempting {
        deadline: Instant,
        timeout: Duration,
        attempt: u32,
        plan: Plan,
    },
    BackingOff {
        resume_at: Instant,
        attempt: u32,
        plan: Plan,
    },
}

/// Keeps the radio link alive.
#[derive(Debug)]
pub struct ConnectivitySupervisor<L> {
    driver: L,
    policy: LinkPolicy,
    state: ConnectionState,
    operation: Operation,
    rssi_alerted: bool,
    last_failure: Option<Error>,
}

impl<L: LinkDriver> ConnectivitySupervisor<L> {
    pub fn new(driver: L, config: &LinkConfig) -> Self {
        Self::with_policy(driver, LinkPolicy::from(config))
    }

    pub fn with_policy(driver: L, policy: LinkPolicy) -> Self {
        Self {
            driver,
            policy,
            state: ConnectionState::default(),
            operation: Operation::Idle,
            rssi_alerted: false,
            last_failure: None,
        }
    }

    pub fn state(&self) -> &ConnectionState {
        &self.state
    }

    pub fn policy(&self) -> &LinkPolicy {
        &self.policy
    }

    pub fn is_connected(&self) -> bool {
        self.state.status == LinkState::Connected
    }

    /// Whether a `connect` or `reconnect` is in progress.
    pub fn is_busy(&self) -> bool {
        self.operation != Operation::Idle
    }

    pub fn driver(&self) -> &L {
        &self.driver
    }

    /// Why the last `connect` or `reconnect` gave up; cleared on connect.
    pub fn last_failure(&self) -> Option<&Error> {
        self.last_failure.as_ref()
    }

    /// Start one bounded connect attempt.
    ///
    /// Ignored while connected or while another operation runs.
    pub async fn connect(&mut self, timeout: Duration, now: Instant) {
        if self.is_connected() || self.is_busy() {
            debug!(status = %self.state.status, "Connect ignored");
            return;
        }

        info!(timeout_ms = timeout.as_millis() as u64, "Connecting");
        self.begin_attempt(0, Plan::Single, timeout, now).await;
    }

    /// Start a bounded reconnect sequence.
    ///
    /// Ignored while connected, while another operation runs, or with zero
    /// attempts.
    pub async fn reconnect(&mut self, max_attempts: u32, base_delay: Duration, now: Instant) {
        if self.is_connected() || self.is_busy() || max_attempts == 0 {
            debug!(status = %self.state.status, max_attempts, "Reconnect ignored");
            return;
        }

        info!(
            max_attempts,
            base_delay_ms = base_delay.as_millis() as u64,
            attempt_count = self.state.attempt_count,
            "Reconnecting"
        );
        let plan = Plan::Retry {
            max_attempts,
            base_delay,
        };
        self.begin_attempt(0, plan, self.policy.connect_timeout, now)
            .await;
    }

    /// Guard for starting a reconnect.
    ///
    /// True only when the link is down with no operation in progress, more
    /// than the reconnect cooldown has passed since the last attempt, and the
    /// attempt counter is below the ceiling.
    pub fn should_reconnect(&self, now: Instant) -> bool {
        if self.is_connected() || self.is_busy() {
            return false;
        }
        if self.state.attempt_count >= self.policy.attempt_ceiling {
            return false;
        }

        self.state
            .last_attempt_at
            .is_none_or(|at| now.saturating_duration_since(at) > self.policy.reconnect_cooldown)
    }

    /// Poll the radio and advance the current operation.
    pub async fn tick(&mut self, now: Instant) -> Vec<ConnectionEvent> {
        let link = match self.driver.status().await {
            Ok(status) => status,
            Err(e) => {
                warn!(error = %e, "Failed to read link status");
                LinkStatus::Disconnected
            }
        };

        let mut events = Vec::new();

        match self.operation {
            Operation::Attempting {
                deadline,
                timeout,
                attempt,
                plan,
            } => {
                if link.is_connected() {
                    self.on_connected(&mut events);
                } else if now >= deadline {
                    self.on_attempt_failed(attempt, plan, timeout, now, &mut events);
                } else if link == LinkStatus::ConnectFailed {
                    debug!(attempt, "Association failed, restarting attempt");
                    if let Err(e) = self.driver.begin().await {
                        warn!(error = %e, "Failed to restart association");
                    }
                    self.operation = Operation::Attempting {
                        deadline,
                        timeout,
                        attempt,
                        plan,
                    };
                }
            }
            Operation::BackingOff {
                resume_at,
                attempt,
                plan,
            } => {
                if link.is_connected() {
                    self.on_connected(&mut events);
                } else if now >= resume_at {
                    self.resume(attempt, plan, now, &mut events).await;
                }
            }
            Operation::Idle => match (self.state.status, link.is_connected()) {
                (LinkState::Connected, false) => {
                    warn!(%link, "Link lost");
                    self.state.status = LinkState::Disconnected;
                    self.state.rssi = None;
                    events.push(ConnectionEvent::LinkLost);
                }
                (LinkState::Disconnected | LinkState::Connecting, true) => {
                    self.on_connected(&mut events);
                }
                _ => {}
            },
        }

        if self.is_connected() {
            self.sample_rssi(&mut events).await;
        }

        events
    }

    /// Drop the link and cancel any operation.
    pub async fn disconnect(&mut self) {
        if let Err(e) = self.driver.disconnect().await {
            warn!(error = %e, "Failed to disconnect radio");
        }
        self.operation = Operation::Idle;
        self.state.status = LinkState::Disconnected;
        self.state.rssi = None;
        info!("Link disconnected");
    }

    async fn begin_attempt(&mut self, attempt: u32, plan: Plan, timeout: Duration, now: Instant) {
        if let Err(e) = self.driver.begin().await {
            warn!(error = %e, attempt, "Failed to start association");
        }

        self.state.status = LinkState::Connecting;
        self.state.attempt_count = self.state.attempt_count.saturating_add(1);
        self.state.last_attempt_at = Some(now);
        self.operation = Operation::Attempting {
            deadline: now + timeout,
            timeout,
            attempt,
            plan,
        };
        debug!(attempt, attempt_count = self.state.attempt_count, "Association attempt started");
    }

    async fn resume(
        &mut self,
        attempt: u32,
        plan: Plan,
        now: Instant,
        events: &mut Vec<ConnectionEvent>,
    ) {
        let Plan::Retry { max_attempts, .. } = plan else {
            self.operation = Operation::Idle;
            return;
        };

        let next = attempt + 1;
        if next < max_attempts {
            self.begin_attempt(next, plan, self.policy.connect_timeout, now)
                .await;
        } else {
            let failure = Error::ConnectivityFailure(format!(
                "no link after {max_attempts} reconnect attempts"
            ));
            warn!(error = %failure, "Reconnect attempts exhausted");
            self.last_failure = Some(failure);
            self.operation = Operation::Idle;
            self.state.status = LinkState::Disconnected;
            events.push(ConnectionEvent::ConnectFailed {
                attempts: max_attempts,
            });
        }
    }

    fn on_attempt_failed(
        &mut self,
        attempt: u32,
        plan: Plan,
        timeout: Duration,
        now: Instant,
        events: &mut Vec<ConnectionEvent>,
    ) {
        self.state.status = LinkState::Disconnected;

        match plan {
            Plan::Single => {
                let failure = Error::ConnectivityFailure(format!(
                    "no link within {}ms",
                    timeout.as_millis()
                ));
                warn!(error = %failure, "Connect attempt timed out");
                self.last_failure = Some(failure);
                self.operation = Operation::Idle;
                events.push(ConnectionEvent::AttemptFailed {
                    attempt,
                    retry_in: None,
                });
                events.push(ConnectionEvent::ConnectFailed { attempts: 1 });
            }
            Plan::Retry { base_delay, .. } => {
                let delay = backoff_delay(base_delay, attempt);
                warn!(
                    attempt,
                    retry_in_ms = delay.as_millis() as u64,
                    "Reconnect attempt timed out"
                );
                self.operation = Operation::BackingOff {
                    resume_at: now + delay,
                    attempt,
                    plan,
                };
                events.push(ConnectionEvent::AttemptFailed {
                    attempt,
                    retry_in: Some(delay),
                });
            }
        }
    }

    fn on_connected(&mut self, events: &mut Vec<ConnectionEvent>) {
        info!(attempts = self.state.attempt_count, "Link connected");
        self.state.status = LinkState::Connected;
        self.state.attempt_count = 0;
        self.operation = Operation::Idle;
        self.rssi_alerted = false;
        self.last_failure = None;
        events.push(ConnectionEvent::Connected);
    }

    async fn sample_rssi(&mut self, events: &mut Vec<ConnectionEvent>) {
        self.state.rssi = self.driver.rssi().await;
        let Some(rssi) = self.state.rssi else {
            return;
        };

        if rssi < self.policy.rssi_alert_threshold {
            if !self.rssi_alerted {
                warn!(
                    rssi,
                    quality = %SignalQuality::from_rssi(rssi),
                    threshold = self.policy.rssi_alert_threshold,
                    "Weak signal"
                );
                self.rssi_alerted = true;
                events.push(ConnectionEvent::SignalLow { rssi });
            }
        } else {
            self.rssi_alerted = false;
        }
    }
}

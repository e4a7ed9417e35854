//! Watchdog feeding with late-feed detection.

use std::time::{Duration, Instant};

use tracing::warn;
use tracklink_core::{config::WatchdogConfig, constants::WATCHDOG_WARN_RATIO};
use tracklink_hardware::Watchdog;

/// Feeds the hardware watchdog once per control loop iteration.
#[derive(Debug)]
pub struct WatchdogFeeder<W> {
    watchdog: W,
    timeout: Duration,
    warn_after: Duration,
    last_feed: Option<Instant>,
    feeds: u64,
    late_feeds: u64,
}

impl<W: Watchdog> WatchdogFeeder<W> {
    pub fn new(watchdog: W, config: &WatchdogConfig) -> Self {
        let timeout = config.timeout();
        Self {
            watchdog,
            timeout,
            warn_after: timeout.mul_f64(WATCHDOG_WARN_RATIO),
            last_feed: None,
            feeds: 0,
            late_feeds: 0,
        }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn last_feed(&self) -> Option<Instant> {
        self.last_feed
    }

    pub fn feed_count(&self) -> u64 {
        self.feeds
    }

    /// Feeds that came later than the warning threshold.
    pub fn late_feed_count(&self) -> u64 {
        self.late_feeds
    }

    pub async fn feed(&mut self, now: Instant) {
        if let Some(last) = self.last_feed {
            let gap = now.saturating_duration_since(last);
            if gap > self.warn_after {
                self.late_feeds += 1;
                warn!(
                    gap_ms = gap.as_millis() as u64,
                    timeout_ms = self.timeout.as_millis() as u64,
                    "Watchdog fed late"
                );
            }
        }

        if let Err(e) = self.watchdog.feed().await {
            warn!(error = %e, "Failed to feed watchdog");
        }

        self.feeds += 1;
        self.last_feed = Some(now);
    }
}

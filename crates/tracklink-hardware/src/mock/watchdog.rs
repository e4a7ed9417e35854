//! Mock hardware watchdog.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::{Result, traits::Watchdog};

/// Mock watchdog that counts feeds.
#[derive(Debug)]
pub struct MockWatchdog {
    feeds: Arc<AtomicU64>,
}

impl MockWatchdog {
    pub fn new() -> (Self, MockWatchdogHandle) {
        let feeds = Arc::new(AtomicU64::new(0));
        (
            Self {
                feeds: Arc::clone(&feeds),
            },
            MockWatchdogHandle { feeds },
        )
    }
}

impl Watchdog for MockWatchdog {
    async fn feed(&mut self) -> Result<()> {
        self.feeds.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct MockWatchdogHandle {
    feeds: Arc<AtomicU64>,
}

impl MockWatchdogHandle {
    pub fn feed_count(&self) -> u64 {
        self.feeds.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_counts_feeds() {
        let (mut watchdog, handle) = MockWatchdog::new();

        watchdog.feed().await.unwrap();
        watchdog.feed().await.unwrap();

        assert_eq!(handle.feed_count(), 2);
    }
}

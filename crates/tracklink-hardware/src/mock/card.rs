//! Mock card reader implementation for testing and development.
//!
//! This module provides a simulated proximity card reader that can be
//! controlled programmatically for testing without requiring physical
//! hardware. Presented cards pass through the same
//! [`UidDebouncer`](crate::debounce::UidDebouncer) a real reader uses.

use std::time::{Duration, Instant};

use tokio::sync::mpsc;
use tracing::{debug, warn};
use tracklink_core::CardUid;

use crate::{
    HardwareError, Result,
    debounce::UidDebouncer,
    traits::CardReader,
    types::DeviceInfo,
};

/// Capacity of the presentation queue between handle and reader.
const EVENT_QUEUE_CAPACITY: usize = 32;

/// Mock card reader for testing and development.
///
/// Each [`poll_card`](CardReader::poll_card) consumes at most one queued
/// event, like a real reader that reports one card per scan.
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
/// let now = Instant::now();
/// handle.present("12AB34CD")?;
/// handle.present("12AB34CD")?;
///
/// assert!(reader.poll_card(now).await?.is_some());
/// // Same card inside the debounce window.
/// assert!(reader.poll_card(now).await?.is_none());
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct MockCardReader {
    /// Channel receiver for card events
    event_rx: mpsc::Receiver<CardEvent>,

    /// Debounce filter applied to every presentation
    debouncer: UidDebouncer,

    /// Device name
    name: String,

    /// Whether `begin()` succeeded
    initialized: bool,

    /// Make `begin()` fail, simulating an unwired reader
    fail_init: bool,
}

impl MockCardReader {
    /// Create a new mock reader with the given debounce window.
    ///
    /// Returns a tuple of (MockCardReader, MockCardReaderHandle) where the
    /// handle can be used to simulate card presentations.
    pub fn new(debounce_window: Duration) -> (Self, MockCardReaderHandle) {
        Self::with_name("Mock Card Reader", debounce_window)
    }

    /// Create a new mock reader with a custom name.
    pub fn with_name(
        name: impl Into<String>,
        debounce_window: Duration,
    ) -> (Self, MockCardReaderHandle) {
        let (event_tx, event_rx) = mpsc::channel(EVENT_QUEUE_CAPACITY);

        let reader = Self {
            event_rx,
            debouncer: UidDebouncer::new(debounce_window),
            name: name.into(),
            initialized: false,
            fail_init: false,
        };

        (reader, MockCardReaderHandle { event_tx })
    }

    /// Make `begin()` fail.
    pub fn with_init_failure(mut self) -> Self {
        self.fail_init = true;
        self
    }
}

impl CardReader for MockCardReader {
    async fn begin(&mut self) -> Result<()> {
        if self.fail_init {
            warn!(reader = %self.name, "Mock card reader configured to fail initialization");
            return Err(HardwareError::initialization_failed(format!(
                "{} did not respond",
                self.name
            )));
        }

        self.initialized = true;
        debug!(reader = %self.name, "Mock card reader initialized");
        Ok(())
    }

    async fn poll_card(&mut self, now: Instant) -> Result<Option<CardUid>> {
        if !self.initialized {
            return Err(HardwareError::not_initialized(&self.name));
        }

        match self.event_rx.try_recv() {
            Ok(CardEvent::Presented(uid)) => Ok(self.debouncer.accept(uid, now)),
            Ok(CardEvent::Fault(message)) => Err(HardwareError::card_read(message)),
            // A dropped handle means no more cards will ever be presented.
            Err(mpsc::error::TryRecvError::Empty | mpsc::error::TryRecvError::Disconnected) => {
                Ok(None)
            }
        }
    }

    fn is_healthy(&self) -> bool {
        self.initialized
    }

    fn info(&self) -> DeviceInfo {
        DeviceInfo::new(self.name.clone(), "Mock ISO14443A")
    }
}

/// Internal event type for mock card reader.
#[derive(Debug, Clone)]
enum CardEvent {
    Presented(CardUid),
    Fault(String),
}

/// Handle for controlling a mock card reader.
#[derive(Debug, Clone)]
pub struct MockCardReaderHandle {
    /// Channel sender for card events
    event_tx: mpsc::Sender<CardEvent>,
}

impl MockCardReaderHandle {
    /// Present a card to the reader.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - `uid` is not a valid card UID
    /// - the presentation queue is full or the reader has been dropped
    pub fn present(&self, uid: &str) -> Result<()> {
        let uid = CardUid::new(uid).map_err(|e| HardwareError::invalid_data(e.to_string()))?;
        self.send(CardEvent::Presented(uid))
    }

    /// Present an already-validated card UID.
    pub fn present_uid(&self, uid: CardUid) -> Result<()> {
        self.send(CardEvent::Presented(uid))
    }

    /// Make the next poll fail with a read error.
    pub fn inject_fault(&self, message: impl Into<String>) -> Result<()> {
        self.send(CardEvent::Fault(message.into()))
    }

    fn send(&self, event: CardEvent) -> Result<()> {
        self.event_tx.try_send(event).map_err(|e| match e {
            mpsc::error::TrySendError::Full(_) => {
                HardwareError::communication("card event queue full")
            }
            mpsc::error::TrySendError::Closed(_) => {
                HardwareError::disconnected("card event channel closed")
            }
        })
    }
}

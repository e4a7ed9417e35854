//! Card read debouncing.
//!
//! A card resting near the antenna is detected again and again. Readers
//! suppress a repeat of the last UID while it falls inside the debounce
//! window; a different UID always passes.

use std::time::{Duration, Instant};

use tracklink_core::CardUid;

/// Suppresses repeat reads of the same UID within a fixed window.
///
/// # Examples
///
/// ```
/// use std::time::{Duration, Instant};
/// use tracklink_core::CardUid;
/// use tracklink_hardware::debounce::UidDebouncer;
///
/// let mut debouncer = UidDebouncer::new(Duration::from_millis(1000));
/// let uid = CardUid::new("12AB34CD").unwrap();
/// let t0 = Instant::now();
///
/// assert!(debouncer.accept(uid.clone(), t0).is_some());
/// assert!(debouncer.accept(uid.clone(), t0 + Duration::from_millis(500)).is_none());
/// assert!(debouncer.accept(uid, t0 + Duration::from_millis(1000)).is_some());
/// ```
#[derive(Debug, Clone)]
pub struct UidDebouncer {
    window: Duration,
    last: Option<(CardUid, Instant)>,
}

impl UidDebouncer {
    pub fn new(window: Duration) -> Self {
        Self { window, last: None }
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    /// Filter one raw read.
    ///
    /// A suppressed read does not extend the window: the window is measured
    /// from the last accepted read.
    pub fn accept(&mut self, uid: CardUid, now: Instant) -> Option<CardUid> {
        if let Some((last_uid, last_at)) = &self.last
            && *last_uid == uid
            && now.saturating_duration_since(*last_at) < self.window
        {
            return None;
        }

        self.last = Some((uid.clone(), now));
        Some(uid)
    }

    /// Forget the last accepted read.
    pub fn reset(&mut self) {
        self.last = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn uid(s: &str) -> CardUid {
        CardUid::new(s).unwrap()
    }

    #[test]
    fn test_repeat_within_window_is_suppressed() {
        let mut debouncer = UidDebouncer::new(Duration::from_millis(1000));
        let t0 = Instant::now();

        assert!(debouncer.accept(uid("12AB34CD"), t0).is_some());
        assert!(
            debouncer
                .accept(uid("12AB34CD"), t0 + Duration::from_millis(999))
                .is_none()
        );
    }

    #[test]
    fn test_suppressed_read_does_not_extend_window() {
        let mut debouncer = UidDebouncer::new(Duration::from_millis(1000));
        let t0 = Instant::now();

        debouncer.accept(uid("12AB34CD"), t0);
        debouncer.accept(uid("12AB34CD"), t0 + Duration::from_millis(900));

        assert!(
            debouncer
                .accept(uid("12AB34CD"), t0 + Duration::from_millis(1000))
                .is_some()
        );
    }

    #[test]
    fn test_different_uid_always_passes() {
        let mut debouncer = UidDebouncer::new(Duration::from_millis(1000));
        let t0 = Instant::now();

        assert!(debouncer.accept(uid("12AB34CD"), t0).is_some());
        assert!(
            debouncer
                .accept(uid("DEADBEEF"), t0 + Duration::from_millis(10))
                .is_some()
        );
        // Back to the first card: it is no longer the last read.
        assert!(
            debouncer
                .accept(uid("12AB34CD"), t0 + Duration::from_millis(20))
                .is_some()
        );
    }

    #[test]
    fn test_reset() {
        let mut debouncer = UidDebouncer::new(Duration::from_millis(1000));
        let t0 = Instant::now();

        debouncer.accept(uid("12AB34CD"), t0);
        debouncer.reset();
        assert!(debouncer.accept(uid("12AB34CD"), t0).is_some());
    }
}

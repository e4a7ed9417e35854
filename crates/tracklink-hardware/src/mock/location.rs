//! Mock GPS receiver.

use tokio::sync::watch;

use crate::{Result, traits::LocationSource, types::LocationFix};

/// Mock location source backed by a watch channel.
///
/// Reads always return the latest fix published through the handle; the
/// receiver starts without a fix.
///
/// # Examples
///
/// ```
/// use tracklink_hardware::mock::MockLocationSource;
/// use tracklink_hardware::traits::LocationSource;
/// use tracklink_hardware::types::LocationFix;
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() -> tracklink_hardware::Result<()> {
/// let (mut gps, handle) = MockLocationSource::new();
/// assert!(!gps.read_fix().await?.valid);
///
/// handle.set_fix(LocationFix::new(41.0082, 28.9784).with_quality(1.1, 8));
/// assert!(gps.read_fix().await?.valid);
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct MockLocationSource {
    fix_rx: watch::Receiver<LocationFix>,
}

impl MockLocationSource {
    pub fn new() -> (Self, MockLocationHandle) {
        let (fix_tx, fix_rx) = watch::channel(LocationFix::invalid());
        (Self { fix_rx }, MockLocationHandle { fix_tx })
    }
}

impl LocationSource for MockLocationSource {
    async fn read_fix(&mut self) -> Result<LocationFix> {
        Ok(*self.fix_rx.borrow())
    }
}

/// Handle for moving a mock location source.
#[derive(Debug, Clone)]
pub struct MockLocationHandle {
    fix_tx: watch::Sender<LocationFix>,
}

impl MockLocationHandle {
    /// Publish a new fix.
    pub fn set_fix(&self, fix: LocationFix) {
        self.fix_tx.send_replace(fix);
    }

    /// Drop the fix, as when the vehicle enters a tunnel.
    pub fn lose_fix(&self) {
        self.fix_tx.send_replace(LocationFix::invalid());
    }

    /// The fix currently published.
    pub fn current(&self) -> LocationFix {
        *self.fix_tx.borrow()
    }
}

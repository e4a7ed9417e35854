//! Mock wireless radio.
//!
//! The radio is scripted from the handle: each call to
//! [`begin`](LinkDriver::begin) takes the next scripted outcome, or stays
//! `Connecting` when the script is empty. Tests move the link between states
//! with [`MockLinkHandle::set_status`] to simulate an access point coming and
//! going.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tracing::debug;

use crate::{Result, traits::LinkDriver, types::LinkStatus};

#[derive(Debug)]
struct LinkState {
    status: LinkStatus,
    rssi: i32,
    script: VecDeque<LinkStatus>,
    begin_count: u32,
    disconnect_count: u32,
}

fn lock(state: &Mutex<LinkState>) -> MutexGuard<'_, LinkState> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Mock radio link.
///
/// # Examples
///
/// ```
/// use tracklink_hardware::mock::MockLink;
/// use tracklink_hardware::traits::LinkDriver;
/// use tracklink_hardware::types::LinkStatus;
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() -> tracklink_hardware::Result<()> {
/// let (mut radio, handle) = MockLink::new();
/// handle.script([LinkStatus::ConnectFailed, LinkStatus::Connected]);
///
/// radio.begin().await?;
/// assert_eq!(radio.status().await?, LinkStatus::ConnectFailed);
///
/// radio.begin().await?;
/// assert_eq!(radio.status().await?, LinkStatus::Connected);
/// assert_eq!(handle.begin_count(), 2);
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct MockLink {
    state: Arc<Mutex<LinkState>>,
}

impl MockLink {
    /// Create an idle radio reporting -55 dBm once connected.
    pub fn new() -> (Self, MockLinkHandle) {
        let state = Arc::new(Mutex::new(LinkState {
            status: LinkStatus::Idle,
            rssi: -55,
            script: VecDeque::new(),
            begin_count: 0,
            disconnect_count: 0,
        }));

        (
            Self {
                state: Arc::clone(&state),
            },
            MockLinkHandle { state },
        )
    }
}

impl LinkDriver for MockLink {
    async fn begin(&mut self) -> Result<()> {
        let mut state = lock(&self.state);
        state.begin_count += 1;
        state.status = state.script.pop_front().unwrap_or(LinkStatus::Connecting);
        debug!(attempt = state.begin_count, status = %state.status, "Mock radio begin");
        Ok(())
    }

    async fn status(&mut self) -> Result<LinkStatus> {
        Ok(lock(&self.state).status)
    }

    async fn rssi(&self) -> Option<i32> {
        let state = lock(&self.state);
        state.status.is_connected().then_some(state.rssi)
    }

    async fn disconnect(&mut self) -> Result<()> {
        let mut state = lock(&self.state);
        state.disconnect_count += 1;
        state.status = LinkStatus::Disconnected;
        Ok(())
    }
}

/// Handle for scripting a mock radio.
#[derive(Debug, Clone)]
pub struct MockLinkHandle {
    state: Arc<Mutex<LinkState>>,
}

impl MockLinkHandle {
    /// Queue outcomes for the next `begin()` calls, in order.
    pub fn script(&self, outcomes: impl IntoIterator<Item = LinkStatus>) {
        lock(&self.state).script.extend(outcomes);
    }

    /// Force the current status.
    pub fn set_status(&self, status: LinkStatus) {
        lock(&self.state).status = status;
    }

    pub fn set_rssi(&self, rssi: i32) {
        lock(&self.state).rssi = rssi;
    }

    pub fn status(&self) -> LinkStatus {
        lock(&self.state).status
    }

    pub fn begin_count(&self) -> u32 {
        lock(&self.state).begin_count
    }

    pub fn disconnect_count(&self) -> u32 {
        lock(&self.state).disconnect_count
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_begin_without_script_keeps_connecting() {
        let (mut radio, handle) = MockLink::new();

        assert_eq!(radio.status().await.unwrap(), LinkStatus::Idle);
        radio.begin().await.unwrap();
        assert_eq!(radio.status().await.unwrap(), LinkStatus::Connecting);
        assert_eq!(handle.begin_count(), 1);
    }

    #[tokio::test]
    async fn test_rssi_only_while_connected() {
        let (radio, handle) = MockLink::new();
        handle.set_rssi(-72);

        assert_eq!(radio.rssi().await, None);
        handle.set_status(LinkStatus::Connected);
        assert_eq!(radio.rssi().await, Some(-72));
    }

    #[tokio::test]
    async fn test_disconnect() {
        let (mut radio, handle) = MockLink::new();
        handle.set_status(LinkStatus::Connected);

        radio.disconnect().await.unwrap();
        assert_eq!(handle.status(), LinkStatus::Disconnected);
        assert_eq!(handle.disconnect_count(), 1);
    }
}

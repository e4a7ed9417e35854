//! Scripted transport for tests and simulation.
//!
//! Answers come from, in order of precedence:
//! 1. the script queue, one entry per exchange;
//! 2. the responder closure, if set;
//! 3. otherwise a transport failure, as if the backend were unreachable.
//!
//! Every report is recorded so tests can assert on what was sent.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tracklink_core::{Error, Result};

use crate::payload::{AuthResponse, DeviceReport};
use crate::transport::AuthTransport;

type Responder = Box<dyn Fn(&DeviceReport) -> Result<AuthResponse> + Send + Sync>;

#[derive(Default)]
struct TransportState {
    script: VecDeque<Result<AuthResponse>>,
    responder: Option<Responder>,
    sent: Vec<DeviceReport>,
}

fn lock(state: &Mutex<TransportState>) -> MutexGuard<'_, TransportState> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Mock backend transport.
///
/// # Examples
///
/// ```
/// use chrono::Utc;
/// use tracklink_core::{CardUid, DeviceId};
/// use tracklink_network::{AuthResponse, AuthTransport, DeviceReport, MockTransport};
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() -> tracklink_core::Result<()> {
/// let (mut transport, handle) = MockTransport::new();
/// handle.respond_with(|report| {
///     Ok(match &report.rfid_card_id {
///         Some(uid) if uid.as_str() == "12AB34CD" => AuthResponse::authorized("s-1", "Ana Kaya"),
///         Some(_) => AuthResponse::denied(),
///         None => AuthResponse::acknowledged("Location saved"),
///     })
/// });
///
/// let report = DeviceReport::new(DeviceId::new("ESP32-001")?, Utc::now())
///     .with_card(CardUid::new("12AB34CD")?);
/// let response = transport.exchange(&report).await?;
///
/// assert!(response.authorization.unwrap().authorized);
/// assert_eq!(handle.sent().len(), 1);
/// # Ok(())
/// # }
/// ```
pub struct MockTransport {
    state: Arc<Mutex<TransportState>>,
}

impl MockTransport {
    pub fn new() -> (Self, MockTransportHandle) {
        let state = Arc::new(Mutex::new(TransportState::default()));
        (
            Self {
                state: Arc::clone(&state),
            },
            MockTransportHandle { state },
        )
    }
}

impl std::fmt::Debug for MockTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = lock(&self.state);
        f.debug_struct("MockTransport")
            .field("scripted", &state.script.len())
            .field("sent", &state.sent.len())
            .finish()
    }
}

impl AuthTransport for MockTransport {
    async fn exchange(&mut self, report: &DeviceReport) -> Result<AuthResponse> {
        let mut state = lock(&self.state);
        state.sent.push(report.clone());

        if let Some(result) = state.script.pop_front() {
            return result;
        }

        match &state.responder {
            Some(responder) => responder(report),
            None => Err(Error::TransportFailure("backend unreachable".into())),
        }
    }
}

/// Handle for scripting a mock transport.
#[derive(Clone)]
pub struct MockTransportHandle {
    state: Arc<Mutex<TransportState>>,
}

impl MockTransportHandle {
    /// Queue the result of the next exchange.
    pub fn push(&self, result: Result<AuthResponse>) {
        lock(&self.state).script.push_back(result);
    }

    /// Answer every unscripted exchange with `responder`.
    pub fn respond_with<F>(&self, responder: F)
    where
        F: Fn(&DeviceReport) -> Result<AuthResponse> + Send + Sync + 'static,
    {
        lock(&self.state).responder = Some(Box::new(responder));
    }

    /// Reports sent so far, oldest first.
    pub fn sent(&self) -> Vec<DeviceReport> {
        lock(&self.state).sent.clone()
    }

    /// Reports that carried a card UID: authorization requests and the
    /// telemetry of an authorized session.
    pub fn card_reports(&self) -> Vec<DeviceReport> {
        lock(&self.state)
            .sent
            .iter()
            .filter(|report| report.carries_card())
            .cloned()
            .collect()
    }

    /// Reports without a card UID.
    pub fn plain_reports(&self) -> Vec<DeviceReport> {
        lock(&self.state)
            .sent
            .iter()
            .filter(|report| !report.carries_card())
            .cloned()
            .collect()
    }

    pub fn clear_sent(&self) {
        lock(&self.state).sent.clear();
    }
}

impl std::fmt::Debug for MockTransportHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockTransportHandle").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use tracklink_core::{CardUid, DeviceId};

    fn report(card: Option<&str>) -> DeviceReport {
        let report = DeviceReport::new(DeviceId::new("ESP32-001").unwrap(), Utc::now());
        match card {
            Some(uid) => report.with_card(CardUid::new(uid).unwrap()),
            None => report,
        }
    }

    #[tokio::test]
    async fn test_unscripted_exchange_fails() {
        let (mut transport, handle) = MockTransport::new();

        let result = transport.exchange(&report(None)).await;
        assert!(matches!(result, Err(Error::TransportFailure(_))));
        assert_eq!(handle.sent().len(), 1);
    }

    #[tokio::test]
    async fn test_script_takes_precedence_over_responder() {
        let (mut transport, handle) = MockTransport::new();
        handle.respond_with(|_| Ok(AuthResponse::acknowledged("responder")));
        handle.push(Err(Error::DecodeFailure("truncated".into())));

        let first = transport.exchange(&report(None)).await;
        assert!(matches!(first, Err(Error::DecodeFailure(_))));

        let second = transport.exchange(&report(None)).await.unwrap();
        assert_eq!(second.message, "responder");
    }

    #[tokio::test]
    async fn test_records_reports_by_kind() {
        let (mut transport, handle) = MockTransport::new();
        handle.respond_with(|_| Ok(AuthResponse::acknowledged("")));

        transport.exchange(&report(Some("12AB34CD"))).await.unwrap();
        transport.exchange(&report(None)).await.unwrap();
        transport.exchange(&report(None)).await.unwrap();

        assert_eq!(handle.card_reports().len(), 1);
        assert_eq!(handle.plain_reports().len(), 2);

        handle.clear_sent();
        assert!(handle.sent().is_empty());
    }
}

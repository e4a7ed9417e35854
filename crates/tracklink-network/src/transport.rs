//! Request/response exchange with the backend.

#![allow(async_fn_in_trait)]

use crate::payload::{AuthResponse, DeviceReport};

/// One synchronous exchange with the backend.
///
/// Implementations bound the exchange in time and classify failures as
/// [`TransportFailure`](tracklink_core::Error::TransportFailure) (unreachable,
/// timed out, non-2xx) or [`DecodeFailure`](tracklink_core::Error::DecodeFailure)
/// (malformed body). The caller decides what a failure means for the session.
pub trait AuthTransport: Send + Sync {
    async fn exchange(&mut self, report: &DeviceReport) -> tracklink_core::Result<AuthResponse>;
}

/// Transport chosen at runtime.
///
/// [`AuthTransport`] is not object-safe, so binaries that pick between the
/// HTTP client and the scripted mock dispatch through this enum.
#[derive(Debug)]
#[non_exhaustive]
pub enum AnyTransport {
    Http(crate::client::HttpAuthClient),
    Mock(crate::mock::MockTransport),
}

impl AuthTransport for AnyTransport {
    async fn exchange(&mut self, report: &DeviceReport) -> tracklink_core::Result<AuthResponse> {
        match self {
            Self::Http(client) => client.exchange(report).await,
            Self::Mock(mock) => mock.exchange(report).await,
        }
    }
}

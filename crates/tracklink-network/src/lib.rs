//! Backend communication for tracklink.
//!
//! This crate provides the wire payloads exchanged with the tracking backend,
//! the [`AuthTransport`] seam the controller talks through, an HTTP
//! implementation built on `reqwest` and a scripted mock.
//!
//! # Components
//!
//! - **DeviceReport / AuthResponse**: JSON request and decoded response
//! - **HttpAuthClient**: bounded HTTP POST exchange
//! - **MockTransport**: scripted answers for tests and simulation
//!
//! # Example
//!
//! ```no_run
//! use tracklink_network::{HttpAuthClient, HttpAuthClientConfig};
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = HttpAuthClient::new(HttpAuthClientConfig::default())?;
//! println!("posting to {}", client.server_url());
//! # Ok(())
//! # }
//! ```

mod client;
mod error;
mod mock;
mod payload;
mod transport;

pub use client::{HttpAuthClient, HttpAuthClientConfig};
pub use error::HttpClientError;
pub use mock::{MockTransport, MockTransportHandle};
pub use payload::{AuthResponse, Authorization, DeviceReport, ReportPosition};
pub use transport::{AnyTransport, AuthTransport};

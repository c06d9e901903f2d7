//! Connection abstraction
//!
//! A [`Connection`] is one client session over some transport. After a
//! successful [`authorize`](Connection::authorize) it runs two independent
//! pumps:
//!
//! ```text
//!   transport ──► inbound pump ──► requests() ──► session handler
//!   transport ◄── outbound pump ◄── responses() ◄── handler / workers
//!                      │                   │
//!                      └──── leave() ──────┘   fires once, stops everything
//! ```
//!
//! An unparseable frame, a failed or late write, or a closed transport fires
//! [`Leave`]. Requests with bad payloads are passed through as
//! [`Request::Invalid`](crate::protocol::Request::Invalid) instead.

pub mod auth;
pub mod leave;
pub mod websocket;

#[cfg(test)]
pub(crate) mod testing;

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::chat::Conversant;
use crate::error::Result;
use crate::protocol::{Request, Response};

pub use auth::Authenticator;
pub use leave::Leave;
pub use websocket::WsConnection;

/// Process-unique connection identifier
pub type ConnectionId = u64;

/// Capability contract every transport implements
#[async_trait]
pub trait Connection: Send + 'static {
    /// Connection identifier
    fn id(&self) -> ConnectionId;

    /// Run the credential handshake and start the pumps
    ///
    /// On failure the transport is closed and the connection must be
    /// discarded.
    async fn authorize(&mut self) -> Result<()>;

    /// Authenticated identity; `None` until `authorize` succeeds
    fn conversant(&self) -> Option<&Conversant>;

    /// Decoded inbound requests
    fn requests(&mut self) -> &mut mpsc::Receiver<Request>;

    /// Sender feeding the outbound pump
    fn responses(&self) -> mpsc::Sender<Response>;

    /// Teardown signal
    fn leave(&self) -> Leave;
}

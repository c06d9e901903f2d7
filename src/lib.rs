//! chatty-rs: real-time chat over WebSocket
//!
//! Conversants connect (possibly from several devices), authorize with a
//! credential frame and then exchange JSON requests and responses. Sent
//! messages are persisted by a bounded worker pool and fanned out to every
//! live connection of every member; offline members are handed to a
//! [`Notifier`](chat::Notifier).
//!
//! Storage, authentication and notification are collaborator traits, so the
//! crate ships only in-memory and no-op implementations of them.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use chatty_rs::chat::{ChatInteractor, Conversant, MemoryStore, NoopNotifier};
//! use chatty_rs::connection::Authenticator;
//! use chatty_rs::error::AuthError;
//! use chatty_rs::protocol::Credentials;
//! use chatty_rs::server::{ChatServer, ServerConfig};
//!
//! # async fn run() -> chatty_rs::error::Result<()> {
//! let store = Arc::new(MemoryStore::new());
//! let interactor = ChatInteractor::new(store.clone(), store.clone(), store);
//!
//! let authenticator: Arc<dyn Authenticator> = Arc::new(|creds: &Credentials| -> Result<Conversant, AuthError> {
//!     let id = creds
//!         .get("id")
//!         .and_then(|id| id.parse().ok())
//!         .ok_or_else(|| AuthError::Rejected("missing id".into()))?;
//!     Ok(Conversant::new(id, creds.get("name").cloned().unwrap_or_default()))
//! });
//!
//! let server = ChatServer::new(
//!     ServerConfig::default(),
//!     interactor,
//!     Arc::new(NoopNotifier::new()),
//!     authenticator,
//! );
//! server.run().await
//! # }
//! ```

pub mod chat;
pub mod connection;
pub mod error;
pub mod protocol;
pub mod registry;
pub mod server;
pub mod session;
pub mod stats;

pub use chat::{ChatInteractor, Conversant, Conversation, Message, Notifier};
pub use connection::{Authenticator, Connection, Leave, WsConnection};
pub use error::{Error, Result};
pub use protocol::{Request, Response};
pub use registry::{ConnectionHandle, ConnectionRegistry};
pub use server::{ChatServer, ConnectionManager, ServerConfig};

//! Per-connection session handling
//!
//! Once a connection is authorized and registered, a [`SessionHandler`]
//! owns it: it reads requests, answers the ones that reply to the sender,
//! and hands sends to the worker pool. When the connection leaves, the
//! handler deregisters it.

pub mod context;
pub mod handler;
pub mod state;

pub use context::SessionContext;
pub use handler::SessionHandler;
pub use state::{SessionPhase, SessionState};

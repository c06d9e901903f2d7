//! Handler context
//!
//! Shared services every session handler dispatches into.

use std::sync::Arc;

use crate::chat::ChatInteractor;
use crate::registry::ConnectionRegistry;
use crate::server::worker::JobQueue;
use crate::stats::ChatStats;

/// Services a [`SessionHandler`](super::SessionHandler) works against
#[derive(Clone)]
pub struct SessionContext {
    /// Validation and storage facade
    pub interactor: ChatInteractor,

    /// Send-message worker queue
    pub queue: JobQueue,

    /// Registry the session deregisters from on exit
    pub registry: Arc<ConnectionRegistry>,

    /// Server-wide counters
    pub stats: Arc<ChatStats>,
}

//! Registry entry types
//!
//! The registry never holds connections themselves, only cheap handles to
//! their outbound channel and teardown signal.

use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use uuid::Uuid;

use crate::connection::{Connection, ConnectionId, Leave};
use crate::protocol::Response;

/// Handle to one live connection
#[derive(Debug, Clone)]
pub struct ConnectionHandle {
    id: ConnectionId,
    conversant_id: Uuid,
    responses: mpsc::Sender<Response>,
    leave: Leave,
}

impl ConnectionHandle {
    /// Create a handle from its parts
    pub fn new(
        id: ConnectionId,
        conversant_id: Uuid,
        responses: mpsc::Sender<Response>,
        leave: Leave,
    ) -> Self {
        Self {
            id,
            conversant_id,
            responses,
            leave,
        }
    }

    /// Handle for an authorized connection
    ///
    /// Returns `None` if the connection has no conversant yet.
    pub fn for_connection<C: Connection + ?Sized>(conn: &C) -> Option<Self> {
        let conversant_id = conn.conversant()?.id;
        Some(Self::new(conn.id(), conversant_id, conn.responses(), conn.leave()))
    }

    /// Connection ID
    pub fn id(&self) -> ConnectionId {
        self.id
    }

    /// Owning conversant
    pub fn conversant_id(&self) -> Uuid {
        self.conversant_id
    }

    /// Whether both handles point at the same live connection
    ///
    /// Compares the outbound channel, not the connection ID.
    pub fn same_connection(&self, other: &ConnectionHandle) -> bool {
        self.responses.same_channel(&other.responses)
    }

    /// Queue a response without waiting
    ///
    /// Returns `false` if the outbound buffer is full or the connection is
    /// gone; the response is dropped in that case.
    pub fn deliver(&self, response: Response) -> bool {
        match self.responses.try_send(response) {
            Ok(()) => true,
            Err(TrySendError::Full(response)) => {
                tracing::warn!(
                    connection_id = self.id,
                    conversant = %self.conversant_id,
                    response = response.kind(),
                    "Outbound buffer full, response dropped"
                );
                false
            }
            Err(TrySendError::Closed(_)) => false,
        }
    }

    /// Queue a response, waiting for buffer space
    pub async fn reply(&self, response: Response) -> bool {
        self.responses.send(response).await.is_ok()
    }
}

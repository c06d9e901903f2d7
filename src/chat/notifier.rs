//! Offline notification

use async_trait::async_trait;
use uuid::Uuid;

use crate::error::NotifyError;

use super::model::Message;

/// Reaches conversants that have no active connection
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Notify `conversant_id` about `message`
    async fn notify(&self, conversant_id: Uuid, message: &Message) -> Result<(), NotifyError>;
}

/// Notifier that only logs
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopNotifier;

impl NoopNotifier {
    /// Create a new no-op notifier
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Notifier for NoopNotifier {
    async fn notify(&self, conversant_id: Uuid, message: &Message) -> Result<(), NotifyError> {
        tracing::info!(
            to = %conversant_id,
            conversation = %message.conversation_id,
            message_id = %message.id,
            "Offline notification (noop)"
        );
        Ok(())
    }
}

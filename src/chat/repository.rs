//! Storage collaborator contracts
//!
//! Implementations must be safe for concurrent use and own their atomicity:
//! creating a conversation together with its membership is all-or-nothing.

use async_trait::async_trait;
use uuid::Uuid;

use crate::error::RepositoryError;

use super::model::{Conversant, Conversation, Message, NewConversation, NewMessage};

/// Conversation storage
#[async_trait]
pub trait ConversationRepo: Send + Sync {
    /// Create a conversation with its members
    async fn create(&self, conversation: &NewConversation)
        -> Result<Conversation, RepositoryError>;

    /// Fetch a conversation with a page of messages
    async fn retrieve(
        &self,
        conversation_id: Uuid,
        limit: u32,
        offset: u32,
    ) -> Result<Conversation, RepositoryError>;

    /// Current members of a conversation
    async fn conversants(&self, conversation_id: Uuid)
        -> Result<Vec<Conversant>, RepositoryError>;
}

/// Message storage
#[async_trait]
pub trait MessageRepo: Send + Sync {
    /// Persist a message and return it with its assigned ID
    async fn create(&self, message: &NewMessage) -> Result<Message, RepositoryError>;
}

/// Conversant storage
#[async_trait]
pub trait ConversantRepo: Send + Sync {
    /// Insert the conversant or refresh its display name
    async fn upsert(&self, conversant: &Conversant) -> Result<Conversant, RepositoryError>;
}

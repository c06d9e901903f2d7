//! In-memory storage
//!
//! Implements all three repository contracts over one lock. Nothing is
//! persisted; intended for tests, demos and single-process setups.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::error::RepositoryError;

use super::model::{Conversant, Conversation, Message, NewConversation, NewMessage};
use super::repository::{ConversantRepo, ConversationRepo, MessageRepo};

struct StoredConversation {
    name: String,
    members: Vec<Uuid>,
    direct: bool,
}

#[derive(Default)]
struct Tables {
    conversants: HashMap<Uuid, Conversant>,
    conversations: HashMap<Uuid, StoredConversation>,
    messages: Vec<Message>,
}

impl Tables {
    fn resolve(&self, members: &[Uuid]) -> Vec<Conversant> {
        members
            .iter()
            .map(|id| {
                self.conversants
                    .get(id)
                    .cloned()
                    .unwrap_or_else(|| Conversant::new(*id, ""))
            })
            .collect()
    }
}

/// Volatile store for conversants, conversations and messages
#[derive(Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored messages
    pub async fn message_count(&self) -> usize {
        self.tables.read().await.messages.len()
    }

    /// Look up a stored conversant
    pub async fn conversant(&self, id: Uuid) -> Option<Conversant> {
        self.tables.read().await.conversants.get(&id).cloned()
    }
}

#[async_trait]
impl ConversationRepo for MemoryStore {
    async fn create(
        &self,
        conversation: &NewConversation,
    ) -> Result<Conversation, RepositoryError> {
        let mut tables = self.tables.write().await;
        let id = Uuid::new_v4();
        let members = conversation.conversant_ids().to_vec();

        tables.conversations.insert(
            id,
            StoredConversation {
                name: conversation.name().to_string(),
                members: members.clone(),
                direct: conversation.is_direct(),
            },
        );

        Ok(Conversation {
            id,
            name: conversation.name().to_string(),
            conversants: tables.resolve(&members),
            messages: Vec::new(),
            direct: conversation.is_direct(),
        })
    }

    async fn retrieve(
        &self,
        conversation_id: Uuid,
        limit: u32,
        offset: u32,
    ) -> Result<Conversation, RepositoryError> {
        let tables = self.tables.read().await;
        let stored = tables
            .conversations
            .get(&conversation_id)
            .ok_or_else(|| RepositoryError::NotFound(format!("conversation {}", conversation_id)))?;

        let messages = tables
            .messages
            .iter()
            .filter(|m| m.conversation_id == conversation_id)
            .skip(offset as usize)
            .take(limit as usize)
            .cloned()
            .collect();

        Ok(Conversation {
            id: conversation_id,
            name: stored.name.clone(),
            conversants: tables.resolve(&stored.members),
            messages,
            direct: stored.direct,
        })
    }

    async fn conversants(
        &self,
        conversation_id: Uuid,
    ) -> Result<Vec<Conversant>, RepositoryError> {
        let tables = self.tables.read().await;
        let stored = tables
            .conversations
            .get(&conversation_id)
            .ok_or_else(|| RepositoryError::NotFound(format!("conversation {}", conversation_id)))?;
        Ok(tables.resolve(&stored.members))
    }
}

#[async_trait]
impl MessageRepo for MemoryStore {
    async fn create(&self, message: &NewMessage) -> Result<Message, RepositoryError> {
        let mut tables = self.tables.write().await;
        if !tables.conversations.contains_key(&message.conversation_id()) {
            return Err(RepositoryError::NotFound(format!(
                "conversation {}",
                message.conversation_id()
            )));
        }

        let stored = message.clone().into_message(Uuid::new_v4());
        tables.messages.push(stored.clone());
        Ok(stored)
    }
}

#[async_trait]
impl ConversantRepo for MemoryStore {
    async fn upsert(&self, conversant: &Conversant) -> Result<Conversant, RepositoryError> {
        let mut tables = self.tables.write().await;
        tables.conversants.insert(conversant.id, conversant.clone());
        Ok(conversant.clone())
    }
}

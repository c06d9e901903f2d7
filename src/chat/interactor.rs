//! Orchestration facade
//!
//! Validates client requests, stamps server-side facts (sender identity,
//! `direct` flag) and delegates to the storage collaborators.

use std::collections::HashSet;
use std::sync::Arc;

use uuid::{Uuid, Variant, Version};

use crate::error::{Error, Result, ValidationError};
use crate::protocol::{CreateConversationRequest, RetrieveConversationRequest, SendMessageRequest};

use super::model::{Conversant, Conversation, Message, NewConversation, NewMessage};
use super::repository::{ConversantRepo, ConversationRepo, MessageRepo};

/// Fewest members a conversation may have, sender included
pub const MIN_CONVERSANTS: usize = 2;

/// Most members a conversation may have, sender included
pub const MAX_CONVERSANTS: usize = 20;

const HYPHENATED_LEN: usize = 36;

/// Chat facade over the three repositories
#[derive(Clone)]
pub struct ChatInteractor {
    conversations: Arc<dyn ConversationRepo>,
    messages: Arc<dyn MessageRepo>,
    conversants: Arc<dyn ConversantRepo>,
}

impl ChatInteractor {
    /// Compose a facade from its collaborators
    pub fn new(
        conversations: Arc<dyn ConversationRepo>,
        messages: Arc<dyn MessageRepo>,
        conversants: Arc<dyn ConversantRepo>,
    ) -> Self {
        Self {
            conversations,
            messages,
            conversants,
        }
    }

    /// Validate and create a conversation started by `sender`
    pub async fn create_conversation(
        &self,
        sender: &Conversant,
        request: CreateConversationRequest,
    ) -> Result<Conversation> {
        let draft = conversation_draft(sender, request)?;

        self.conversations.create(&draft).await.map_err(|e| {
            tracing::warn!(sender = %sender.id, error = %e, "Conversation create failed");
            Error::Persistence(e)
        })
    }

    /// Validate a send request and stamp the sender
    ///
    /// Any sender the client may have claimed is ignored.
    pub fn prepare_message(
        &self,
        sender: &Conversant,
        request: SendMessageRequest,
    ) -> std::result::Result<NewMessage, ValidationError> {
        if request.message.is_empty() {
            return Err(ValidationError::EmptyMessage);
        }
        let conversation_id = parse_identity("conversationId", &request.conversation_id)?;

        Ok(NewMessage::new(sender.id, conversation_id, request.message))
    }

    /// Persist a prepared message
    pub async fn send_message(&self, message: &NewMessage) -> Result<Message> {
        self.messages.create(message).await.map_err(|e| {
            tracing::warn!(
                sender = %message.sender_id(),
                conversation = %message.conversation_id(),
                error = %e,
                "Message create failed"
            );
            Error::Persistence(e)
        })
    }

    /// Validate pagination and fetch a conversation page
    pub async fn retrieve_conversation(
        &self,
        request: RetrieveConversationRequest,
    ) -> Result<Conversation> {
        let conversation_id = parse_identity("conversationId", &request.conversation_id)?;
        if request.limit < 1 {
            return Err(ValidationError::InvalidLimit(request.limit).into());
        }
        if request.offset < 0 {
            return Err(ValidationError::InvalidOffset(request.offset).into());
        }
        let limit = u32::try_from(request.limit).unwrap_or(u32::MAX);
        let offset = u32::try_from(request.offset).unwrap_or(u32::MAX);

        self.conversations
            .retrieve(conversation_id, limit, offset)
            .await
            .map_err(|e| {
                tracing::warn!(conversation = %conversation_id, error = %e, "Conversation retrieve failed");
                Error::Persistence(e)
            })
    }

    /// Current members of a conversation
    pub async fn get_conversants(&self, conversation_id: Uuid) -> Result<Vec<Conversant>> {
        Ok(self.conversations.conversants(conversation_id).await?)
    }

    /// Persist or refresh a freshly authorized conversant
    pub async fn upsert_conversant(&self, conversant: &Conversant) -> Result<Conversant> {
        Ok(self.conversants.upsert(conversant).await?)
    }
}

fn conversation_draft(
    sender: &Conversant,
    request: CreateConversationRequest,
) -> std::result::Result<NewConversation, ValidationError> {
    if request.name.is_empty() {
        return Err(ValidationError::EmptyName);
    }

    let mut seen = HashSet::with_capacity(request.conversants.len() + 1);
    let mut ids = Vec::with_capacity(request.conversants.len() + 1);
    for raw in &request.conversants {
        let id = parse_identity("conversants", raw)?;
        if !seen.insert(id) {
            return Err(ValidationError::DuplicateConversant(raw.clone()));
        }
        ids.push(id);
    }

    // The initiator is always a member, listed or not.
    if seen.insert(sender.id) {
        ids.push(sender.id);
    }

    if !(MIN_CONVERSANTS..=MAX_CONVERSANTS).contains(&ids.len()) {
        return Err(ValidationError::ConversantCount {
            count: ids.len(),
            min: MIN_CONVERSANTS,
            max: MAX_CONVERSANTS,
        });
    }

    Ok(NewConversation::new(request.name, ids))
}

/// Parse a hyphenated random (version 4) UUID
fn parse_identity(
    field: &'static str,
    value: &str,
) -> std::result::Result<Uuid, ValidationError> {
    let invalid = || ValidationError::InvalidIdentity {
        field,
        value: value.to_string(),
    };

    // braced, urn, simple and upper-case forms are rejected
    if value.len() != HYPHENATED_LEN || value.bytes().any(|b| b.is_ascii_uppercase()) {
        return Err(invalid());
    }
    let id = Uuid::try_parse(value).map_err(|_| invalid())?;
    if id.get_version() != Some(Version::Random) || id.get_variant() != Variant::RFC4122 {
        return Err(invalid());
    }
    Ok(id)
}

//! Chat domain types
//!
//! Field names follow the JSON wire format (`senderId`, `conversationId`).

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A chat participant
///
/// Identity is independent of any connection or device.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Conversant {
    /// Stable identity
    pub id: Uuid,
    /// Display name
    #[serde(rename = "name", default)]
    pub display_name: String,
}

impl Conversant {
    /// Create a conversant
    pub fn new(id: Uuid, display_name: impl Into<String>) -> Self {
        Self {
            id,
            display_name: display_name.into(),
        }
    }
}

/// A persisted chat message
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    /// Message ID assigned by storage
    pub id: Uuid,
    /// Authenticated identity of the connection that sent it
    pub sender_id: Uuid,
    /// Message text
    pub message: String,
    /// Owning conversation
    pub conversation_id: Uuid,
}

/// A conversation and (optionally) a page of its messages
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Conversation {
    /// Conversation ID assigned by storage
    pub id: Uuid,
    /// Conversation name
    pub name: String,
    /// Members
    pub conversants: Vec<Conversant>,
    /// Retrieved message page; empty on creation
    #[serde(default)]
    pub messages: Vec<Message>,
    /// True iff the conversation has exactly two members
    pub direct: bool,
}

/// Validated conversation draft handed to storage
///
/// Only [`ChatInteractor`](super::ChatInteractor) builds these, so every draft
/// already includes the sender, has 2..=20 unique members and a correct
/// `direct` flag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewConversation {
    name: String,
    conversant_ids: Vec<Uuid>,
}

impl NewConversation {
    pub(crate) fn new(name: String, conversant_ids: Vec<Uuid>) -> Self {
        Self {
            name,
            conversant_ids,
        }
    }

    /// Conversation name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Member IDs, sender included
    pub fn conversant_ids(&self) -> &[Uuid] {
        &self.conversant_ids
    }

    /// Whether this is a two-party conversation
    pub fn is_direct(&self) -> bool {
        self.conversant_ids.len() == 2
    }
}

/// Validated message draft handed to storage
///
/// The sender is always stamped from the authenticated connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewMessage {
    sender_id: Uuid,
    conversation_id: Uuid,
    text: String,
}

impl NewMessage {
    pub(crate) fn new(sender_id: Uuid, conversation_id: Uuid, text: String) -> Self {
        Self {
            sender_id,
            conversation_id,
            text,
        }
    }

    /// Authenticated sender
    pub fn sender_id(&self) -> Uuid {
        self.sender_id
    }

    /// Target conversation
    pub fn conversation_id(&self) -> Uuid {
        self.conversation_id
    }

    /// Message text
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Turn the draft into a stored message under the given ID
    pub fn into_message(self, id: Uuid) -> Message {
        Message {
            id,
            sender_id: self.sender_id,
            message: self.text,
            conversation_id: self.conversation_id,
        }
    }
}

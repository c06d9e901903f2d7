//! Outbound response envelope

use serde::{Deserialize, Serialize};

use crate::chat::{Conversation, Message};
use crate::error::{Error, Result};

/// Client message when persisting a sent message fails
pub const SEND_FAILED: &str = "couldn't send message";

/// Client message when creating a conversation fails in storage
pub const CREATE_FAILED: &str = "unable to create conversation";

/// Client message when loading a conversation fails in storage
pub const RETRIEVE_FAILED: &str = "unable to get conversation";

/// Payload of an `error` response
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    /// Client-safe description
    pub error: String,
}

/// A response sent to a connection
///
/// Serialized as `{"type": "...", "data": {...}}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "camelCase")]
pub enum Response {
    /// A message was posted to one of the recipient's conversations
    NewMessage(Message),
    /// Reply to `createConversation`
    NewConversation(Conversation),
    /// Reply to `retrieveConversation`
    ReturnConversation(Conversation),
    /// A request failed
    Error(ErrorBody),
}

impl Response {
    /// Build an error response
    pub fn error(message: impl Into<String>) -> Self {
        Response::Error(ErrorBody {
            error: message.into(),
        })
    }

    /// Error response for a failed operation
    ///
    /// Storage failures are replaced with `storage_message`; other errors use
    /// [`Error::client_message`].
    pub fn failure(err: &Error, storage_message: &str) -> Self {
        match err {
            Error::Persistence(_) => Self::error(storage_message),
            other => Self::error(other.client_message()),
        }
    }

    /// Wire name of the response type
    pub fn kind(&self) -> &'static str {
        match self {
            Response::NewMessage(_) => "newMessage",
            Response::NewConversation(_) => "newConversation",
            Response::ReturnConversation(_) => "returnConversation",
            Response::Error(_) => "error",
        }
    }

    /// Serialize to a text frame
    pub fn encode(&self) -> Result<String> {
        serde_json::to_string(self).map_err(|e| Error::Protocol(e.to_string()))
    }

    /// Parse a text frame (client side)
    pub fn decode(frame: &str) -> Result<Self> {
        serde_json::from_str(frame).map_err(|e| Error::Protocol(e.to_string()))
    }
}

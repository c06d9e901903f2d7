//! Inbound request envelope
//!
//! Frames look like `{"type": "sendMessage", "data": {...}}`. A frame that is
//! not a JSON object is a protocol error and ends the connection. A
//! well-formed envelope with a missing or bad payload decodes to
//! [`Request::Invalid`] so the connection can report it and keep going.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{Error, Result, ValidationError};

/// Wire name of the send-message request
pub const SEND_MESSAGE: &str = "sendMessage";
/// Wire name of the create-conversation request
pub const CREATE_CONVERSATION: &str = "createConversation";
/// Wire name of the retrieve-conversation request
pub const RETRIEVE_CONVERSATION: &str = "retrieveConversation";

/// Create a conversation with the listed conversants
///
/// The sender is added by the server and may be omitted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CreateConversationRequest {
    /// Conversation name
    pub name: String,
    /// Other members as UUID strings
    pub conversants: Vec<String>,
}

/// Post a message to a conversation
///
/// Carries no sender; the server stamps it from the connection.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SendMessageRequest {
    /// Message text
    pub message: String,
    /// Target conversation as a UUID string
    pub conversation_id: String,
}

/// Fetch a conversation with a page of messages
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RetrieveConversationRequest {
    /// Conversation as a UUID string
    pub conversation_id: String,
    /// Page size, at least 1
    pub limit: i64,
    /// Page start, at least 0
    pub offset: i64,
}

/// A decoded inbound request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Request {
    /// `sendMessage`
    SendMessage(SendMessageRequest),
    /// `createConversation`
    CreateConversation(CreateConversationRequest),
    /// `retrieveConversation`
    RetrieveConversation(RetrieveConversationRequest),
    /// Well-framed envelope whose type or payload could not be used
    Invalid(ValidationError),
}

#[derive(Deserialize)]
struct Envelope {
    #[serde(rename = "type", default)]
    kind: String,
    #[serde(default)]
    data: Option<Value>,
}

impl Request {
    /// Decode a text frame
    ///
    /// Returns `Err(Error::Protocol)` only when the frame itself is unusable.
    pub fn decode(frame: &str) -> Result<Self> {
        let envelope: Envelope =
            serde_json::from_str(frame).map_err(|e| Error::Protocol(e.to_string()))?;

        let data = match envelope.data {
            Some(Value::Null) | None => {
                return Ok(match envelope.kind.as_str() {
                    SEND_MESSAGE | CREATE_CONVERSATION | RETRIEVE_CONVERSATION => {
                        Request::Invalid(ValidationError::MissingPayload)
                    }
                    other => Request::Invalid(ValidationError::UnknownRequestType(other.into())),
                });
            }
            Some(data) => data,
        };

        let request = match envelope.kind.as_str() {
            SEND_MESSAGE => payload(data).map(Request::SendMessage),
            CREATE_CONVERSATION => payload(data).map(Request::CreateConversation),
            RETRIEVE_CONVERSATION => payload(data).map(Request::RetrieveConversation),
            other => Err(ValidationError::UnknownRequestType(other.into())),
        };

        Ok(request.unwrap_or_else(Request::Invalid))
    }

    /// Wire name of the request type
    pub fn kind(&self) -> &'static str {
        match self {
            Request::SendMessage(_) => SEND_MESSAGE,
            Request::CreateConversation(_) => CREATE_CONVERSATION,
            Request::RetrieveConversation(_) => RETRIEVE_CONVERSATION,
            Request::Invalid(_) => "invalid",
        }
    }
}

fn payload<T: DeserializeOwned>(data: Value) -> std::result::Result<T, ValidationError> {
    serde_json::from_value(data).map_err(|e| ValidationError::MalformedPayload(e.to_string()))
}

//! Error types
//!
//! Each concern has its own error enum; [`Error`] wraps them at the crate level.

use thiserror::Error;

/// Crate-level result alias
pub type Result<T> = std::result::Result<T, Error>;

/// Top-level error type
#[derive(Debug, Error)]
pub enum Error {
    /// Request failed validation; the connection stays open
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// Credential handshake failed; the connection is never registered
    #[error("authorization failed: {0}")]
    Authorization(#[from] AuthError),

    /// A storage collaborator failed
    #[error("persistence failure: {0}")]
    Persistence(#[from] RepositoryError),

    /// Worker queue stayed full for longer than the enqueue timeout
    #[error("worker queue saturated")]
    Backpressure,

    /// Inbound frame could not be decoded; fatal for the connection
    #[error("protocol error: {0}")]
    Protocol(String),

    /// Connection or queue already shut down
    #[error("channel closed")]
    Closed,

    /// Underlying socket error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// WebSocket transport error
    #[error("websocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),
}

impl Error {
    /// Message safe to send back to a client
    ///
    /// Storage and transport detail never leaves the server.
    pub fn client_message(&self) -> String {
        match self {
            Error::Validation(e) => e.to_string(),
            Error::Authorization(_) => "not authorized".into(),
            Error::Backpressure => "could not send message".into(),
            _ => "internal server error".into(),
        }
    }

    /// Whether the error ends the connection it occurred on
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Error::Authorization(_) | Error::Protocol(_) | Error::Io(_) | Error::WebSocket(_)
        )
    }
}

/// Request validation failure
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// Envelope arrived without a `data` payload
    #[error("no request body")]
    MissingPayload,

    /// Envelope `type` is not a known request
    #[error("unknown request type: {0}")]
    UnknownRequestType(String),

    /// Payload did not match the request type's shape
    #[error("malformed request body: {0}")]
    MalformedPayload(String),

    /// Conversation name is empty
    #[error("name: cannot be empty")]
    EmptyName,

    /// Conversant count (after adding the sender) out of range
    #[error("conversants: the length must be between {min} and {max}, got {count}")]
    ConversantCount {
        /// Count after the sender was added
        count: usize,
        /// Lower bound
        min: usize,
        /// Upper bound
        max: usize,
    },

    /// Same conversant listed twice
    #[error("conversants: duplicate identity {0}")]
    DuplicateConversant(String),

    /// A value that should be an identity is not a UUID
    #[error("{field}: must be a valid UUID, got {value:?}")]
    InvalidIdentity {
        /// Field name
        field: &'static str,
        /// Offending value
        value: String,
    },

    /// Message text is empty
    #[error("message: cannot be empty")]
    EmptyMessage,

    /// `limit` below one
    #[error("limit: must be no less than 1, got {0}")]
    InvalidLimit(i64),

    /// `offset` below zero
    #[error("offset: must be no less than 0, got {0}")]
    InvalidOffset(i64),
}

/// Credential handshake failure
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthError {
    /// No credentials arrived within the handshake timeout
    #[error("handshake timed out")]
    Timeout,

    /// Peer went away before sending credentials
    #[error("connection closed during handshake")]
    Disconnected,

    /// First frame was not a string-keyed credential map
    #[error("malformed credentials: {0}")]
    MalformedCredentials(String),

    /// Authenticator rejected the credentials
    #[error("credentials rejected: {0}")]
    Rejected(String),

    /// `authorize` called on a connection that already completed it
    #[error("connection already authorized")]
    AlreadyAuthorized,
}

/// Storage collaborator failure
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RepositoryError {
    /// Requested record does not exist
    #[error("{0} not found")]
    NotFound(String),

    /// Backend-specific failure
    #[error("storage backend: {0}")]
    Backend(String),
}

/// Notifier failure; logged, never surfaced to clients
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("notification failed: {0}")]
pub struct NotifyError(pub String);

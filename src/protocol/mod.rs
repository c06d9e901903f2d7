//! Wire protocol
//!
//! Transport-agnostic JSON envelopes exchanged with clients:
//!
//! ```text
//! client                                   server
//!   │  {"token": "..."}                       │   handshake (credentials)
//!   │ ──────────────────────────────────────► │
//!   │  {"type":"sendMessage","data":{..}}     │   requests
//!   │ ──────────────────────────────────────► │
//!   │  {"type":"newMessage","data":{..}}      │   responses
//!   │ ◄────────────────────────────────────── │
//! ```

pub mod handshake;
pub mod request;
pub mod response;

pub use handshake::{decode_credentials, Credentials};
pub use request::{
    CreateConversationRequest, Request, RetrieveConversationRequest, SendMessageRequest,
};
pub use response::{ErrorBody, Response, CREATE_FAILED, RETRIEVE_FAILED, SEND_FAILED};

//! Chat domain: model, storage contracts and the orchestration facade

pub mod interactor;
pub mod memory;
pub mod model;
pub mod notifier;
pub mod repository;

pub use interactor::{ChatInteractor, MAX_CONVERSANTS, MIN_CONVERSANTS};
pub use memory::MemoryStore;
pub use model::{Conversant, Conversation, Message, NewConversation, NewMessage};
pub use notifier::{NoopNotifier, Notifier};
pub use repository::{ConversantRepo, ConversationRepo, MessageRepo};

//! Khichuri - per-user chat history on a document store
//!
//! Users own an ordered list of conversations, each an ordered transcript
//! of system/user/assistant messages. Persistence goes through the
//! `ConversationRepository` trait, with MongoDB and in-memory backends.

pub mod cli;
mod config;
pub mod core;
pub mod error;
pub mod session;
pub mod storage;
pub mod utils;

pub use crate::config::{ChatConfig, LoggingConfig, Settings, StoreConfig};
pub use crate::core::codec::{decode, encode, StoredMessage};
pub use crate::core::message::{ChatMessage, Role};
pub use error::{HistoryError, Result};
pub use session::{ChatModel, ChatSession};
pub use storage::memory::InMemoryRepository;
pub use storage::mongo::{DocumentStore, MongoRepository};
pub use storage::{ConversationRepository, ConversationSummary};

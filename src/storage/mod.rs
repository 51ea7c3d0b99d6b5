//! Conversation Repository
//!
//! Information Hiding:
//! - Users and their conversations live in one document per user
//! - Each operation is a single store call; the store's per-document
//!   atomicity is the only concurrency guarantee
//! - Backends (MongoDB, in-memory) share the document shape defined here

use crate::core::codec::StoredMessage;
use crate::core::message::ChatMessage;
use crate::error::Result;
use async_trait::async_trait;
use bson::DateTime;
use serde::{Deserialize, Serialize};

pub mod memory;
pub mod mongo;

/// One user document: `{user_name, created_at, conversations: [...]}`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserDocument {
    pub user_name: String,
    pub created_at: DateTime,
    #[serde(default)]
    pub conversations: Vec<ConversationDocument>,
}

impl UserDocument {
    pub fn new(user_name: impl Into<String>) -> Self {
        Self {
            user_name: user_name.into(),
            created_at: DateTime::now(),
            conversations: Vec::new(),
        }
    }
}

/// A conversation embedded in its owner's document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationDocument {
    pub conversation_id: String,
    #[serde(default)]
    pub title: String,
    pub created_at: DateTime,
    #[serde(default)]
    pub messages: Vec<StoredMessage>,
}

impl ConversationDocument {
    /// Fresh conversation seeded with the system prompt as its first message
    pub fn new(title: impl Into<String>, system_prompt: &str) -> Self {
        let now = DateTime::now();
        Self {
            conversation_id: new_conversation_id(),
            title: title.into(),
            created_at: now,
            messages: vec![StoredMessage::from(&ChatMessage::system(system_prompt)).stamped(now)],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationSummary {
    pub conversation_id: String,
    pub title: String,
}

/// 128 random bits, lower-case hex (32 chars)
pub fn new_conversation_id() -> String {
    let bytes: [u8; 16] = rand::random();
    hex::encode(bytes)
}

/// Persistence operations over users and their conversations.
///
/// Absence is a routine outcome: reads return `""`/empty and writes return
/// `false` when the user or conversation does not exist. Writes that target
/// one conversation report `true` only when exactly one document changed.
#[async_trait]
pub trait ConversationRepository: Send + Sync {
    /// Returns `false` without writing when the user already exists
    async fn create_user(&self, user_name: &str) -> Result<bool>;

    /// Append a new conversation seeded with a system message.
    /// Fails with `UserNotFound` when no user document matches.
    async fn create_conversation(
        &self,
        user_name: &str,
        title: &str,
        system_prompt: &str,
    ) -> Result<String>;

    /// Titles in stored order
    async fn list_conversation_titles(&self, user_name: &str) -> Result<Vec<ConversationSummary>>;

    async fn get_conversation_title(&self, user_name: &str, conversation_id: &str)
        -> Result<String>;

    async fn rename_conversation(
        &self,
        user_name: &str,
        conversation_id: &str,
        new_title: &str,
    ) -> Result<bool>;

    /// Overwrite the whole message list. Callers pass the full history.
    async fn replace_messages(
        &self,
        user_name: &str,
        conversation_id: &str,
        messages: &[ChatMessage],
    ) -> Result<bool>;

    /// Push a single message onto the end of the transcript
    async fn append_message(
        &self,
        user_name: &str,
        conversation_id: &str,
        message: &ChatMessage,
    ) -> Result<bool>;

    /// Rewrite the content at position 0. Only applies when that entry is a
    /// system message; otherwise nothing is written and `false` is returned.
    async fn update_system_prompt(
        &self,
        user_name: &str,
        conversation_id: &str,
        new_prompt: &str,
    ) -> Result<bool>;

    async fn get_conversation_messages(
        &self,
        user_name: &str,
        conversation_id: &str,
    ) -> Result<Vec<ChatMessage>>;

    async fn delete_conversation(&self, user_name: &str, conversation_id: &str) -> Result<bool>;

    async fn delete_all_conversations(&self, user_name: &str) -> Result<bool>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_conversation_id_shape() {
        let id = new_conversation_id();
        assert_eq!(id.len(), 32);
        assert!(id.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
    }

    #[test]
    fn test_conversation_ids_are_unique() {
        let ids: HashSet<String> = (0..1000).map(|_| new_conversation_id()).collect();
        assert_eq!(ids.len(), 1000);
    }

    #[test]
    fn test_new_conversation_is_seeded() {
        let conv = ConversationDocument::new("Trip planning", "You are a travel agent");
        assert_eq!(conv.title, "Trip planning");
        assert_eq!(conv.messages.len(), 1);
        assert_eq!(conv.messages[0].role, "system");
        assert_eq!(conv.messages[0].content, "You are a travel agent");
        assert_eq!(conv.messages[0].timestamp, Some(conv.created_at));
    }

    #[test]
    fn test_document_shape() {
        let mut user = UserDocument::new("alice");
        user.conversations.push(ConversationDocument::new("Chat", "be brief"));

        let doc = bson::to_document(&user).unwrap();
        assert_eq!(doc.get_str("user_name").unwrap(), "alice");
        assert!(doc.get_datetime("created_at").is_ok());

        let conv = doc.get_array("conversations").unwrap()[0].as_document().unwrap();
        assert_eq!(conv.get_str("conversation_id").unwrap().len(), 32);
        assert_eq!(conv.get_str("title").unwrap(), "Chat");
        let first = conv.get_array("messages").unwrap()[0].as_document().unwrap();
        assert_eq!(first.get_str("role").unwrap(), "system");
        assert!(first.get_datetime("timestamp").is_ok());
    }
}

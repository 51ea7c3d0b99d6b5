//! In-Memory Conversation Repository
//!
//! Information Hiding:
//! - User documents kept in a Vec in insertion order, behind a tokio RwLock
//! - "Modified" outcomes mirror the document store: writing a value equal to
//!   the current one counts as no modification
//! - Suitable for testing and ephemeral sessions

use super::{ConversationDocument, ConversationRepository, ConversationSummary, UserDocument};
use crate::core::codec::{self, StoredMessage};
use crate::core::message::ChatMessage;
use crate::error::{HistoryError, Result};
use async_trait::async_trait;
use bson::DateTime;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Data is lost when the process terminates
pub struct InMemoryRepository {
    users: Arc<RwLock<Vec<UserDocument>>>,
}

impl InMemoryRepository {
    pub fn new() -> Self {
        Self {
            users: Arc::new(RwLock::new(Vec::new())),
        }
    }

    /// Copy of a user's document, for inspection
    pub async fn snapshot(&self, user_name: &str) -> Option<UserDocument> {
        let users = self.users.read().await;
        users.iter().find(|u| u.user_name == user_name).cloned()
    }
}

impl Default for InMemoryRepository {
    fn default() -> Self {
        Self::new()
    }
}

fn find_conversation<'a>(
    users: &'a [UserDocument],
    user_name: &str,
    conversation_id: &str,
) -> Option<&'a ConversationDocument> {
    users
        .iter()
        .find(|u| u.user_name == user_name)?
        .conversations
        .iter()
        .find(|c| c.conversation_id == conversation_id)
}

fn find_conversation_mut<'a>(
    users: &'a mut [UserDocument],
    user_name: &str,
    conversation_id: &str,
) -> Option<&'a mut ConversationDocument> {
    users
        .iter_mut()
        .find(|u| u.user_name == user_name)?
        .conversations
        .iter_mut()
        .find(|c| c.conversation_id == conversation_id)
}

#[async_trait]
impl ConversationRepository for InMemoryRepository {
    async fn create_user(&self, user_name: &str) -> Result<bool> {
        let mut users = self.users.write().await;
        if users.iter().any(|u| u.user_name == user_name) {
            tracing::debug!("[InMemoryRepository] User '{}' already exists", user_name);
            return Ok(false);
        }
        users.push(UserDocument::new(user_name));
        tracing::debug!("[InMemoryRepository] Created user '{}'", user_name);
        Ok(true)
    }

    async fn create_conversation(
        &self,
        user_name: &str,
        title: &str,
        system_prompt: &str,
    ) -> Result<String> {
        let mut users = self.users.write().await;
        let user = users
            .iter_mut()
            .find(|u| u.user_name == user_name)
            .ok_or_else(|| HistoryError::UserNotFound(user_name.to_string()))?;

        let conversation = ConversationDocument::new(title, system_prompt);
        let conversation_id = conversation.conversation_id.clone();
        user.conversations.push(conversation);

        tracing::debug!(
            "[InMemoryRepository] Created conversation '{}' for user '{}'",
            conversation_id,
            user_name
        );
        Ok(conversation_id)
    }

    async fn list_conversation_titles(&self, user_name: &str) -> Result<Vec<ConversationSummary>> {
        let users = self.users.read().await;
        let titles = users
            .iter()
            .find(|u| u.user_name == user_name)
            .map(|u| {
                u.conversations
                    .iter()
                    .map(|c| ConversationSummary {
                        conversation_id: c.conversation_id.clone(),
                        title: c.title.clone(),
                    })
                    .collect()
            })
            .unwrap_or_default();
        Ok(titles)
    }

    async fn get_conversation_title(
        &self,
        user_name: &str,
        conversation_id: &str,
    ) -> Result<String> {
        let users = self.users.read().await;
        Ok(find_conversation(&users, user_name, conversation_id)
            .map(|c| c.title.clone())
            .unwrap_or_default())
    }

    async fn rename_conversation(
        &self,
        user_name: &str,
        conversation_id: &str,
        new_title: &str,
    ) -> Result<bool> {
        let mut users = self.users.write().await;
        match find_conversation_mut(&mut users, user_name, conversation_id) {
            Some(conv) if conv.title != new_title => {
                conv.title = new_title.to_string();
                tracing::debug!("[InMemoryRepository] Renamed '{}' to '{}'", conversation_id, new_title);
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn replace_messages(
        &self,
        user_name: &str,
        conversation_id: &str,
        messages: &[ChatMessage],
    ) -> Result<bool> {
        let stored = codec::encode_at(messages, DateTime::now());
        let mut users = self.users.write().await;
        match find_conversation_mut(&mut users, user_name, conversation_id) {
            Some(conv) if conv.messages != stored => {
                conv.messages = stored;
                tracing::debug!(
                    "[InMemoryRepository] Replaced {} messages in '{}'",
                    messages.len(),
                    conversation_id
                );
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn append_message(
        &self,
        user_name: &str,
        conversation_id: &str,
        message: &ChatMessage,
    ) -> Result<bool> {
        let stored = StoredMessage::from(message).stamped(DateTime::now());
        let mut users = self.users.write().await;
        match find_conversation_mut(&mut users, user_name, conversation_id) {
            Some(conv) => {
                conv.messages.push(stored);
                tracing::debug!(
                    "[InMemoryRepository] Appended {} message to '{}'",
                    message.role(),
                    conversation_id
                );
                Ok(true)
            }
            None => {
                tracing::warn!("[InMemoryRepository] Cannot append: no conversation '{}'", conversation_id);
                Ok(false)
            }
        }
    }

    async fn update_system_prompt(
        &self,
        user_name: &str,
        conversation_id: &str,
        new_prompt: &str,
    ) -> Result<bool> {
        let mut users = self.users.write().await;
        let Some(conv) = find_conversation_mut(&mut users, user_name, conversation_id) else {
            return Ok(false);
        };
        match conv.messages.first_mut() {
            Some(first) if first.role == "system" && first.content != new_prompt => {
                first.content = new_prompt.to_string();
                tracing::debug!("[InMemoryRepository] Updated system prompt of '{}'", conversation_id);
                Ok(true)
            }
            _ => {
                tracing::debug!(
                    "[InMemoryRepository] System prompt of '{}' left unchanged",
                    conversation_id
                );
                Ok(false)
            }
        }
    }

    async fn get_conversation_messages(
        &self,
        user_name: &str,
        conversation_id: &str,
    ) -> Result<Vec<ChatMessage>> {
        let users = self.users.read().await;
        Ok(find_conversation(&users, user_name, conversation_id)
            .map(|c| codec::decode(&c.messages))
            .unwrap_or_default())
    }

    async fn delete_conversation(&self, user_name: &str, conversation_id: &str) -> Result<bool> {
        let mut users = self.users.write().await;
        let Some(user) = users.iter_mut().find(|u| u.user_name == user_name) else {
            return Ok(false);
        };
        let before = user.conversations.len();
        user.conversations.retain(|c| c.conversation_id != conversation_id);
        let deleted = user.conversations.len() != before;
        tracing::debug!(
            "[InMemoryRepository] Deleted conversation '{}' of '{}': {}",
            conversation_id,
            user_name,
            deleted
        );
        Ok(deleted)
    }

    async fn delete_all_conversations(&self, user_name: &str) -> Result<bool> {
        let mut users = self.users.write().await;
        match users.iter_mut().find(|u| u.user_name == user_name) {
            Some(user) if !user.conversations.is_empty() => {
                tracing::debug!(
                    "[InMemoryRepository] Deleted {} conversations of '{}'",
                    user.conversations.len(),
                    user_name
                );
                user.conversations.clear();
                Ok(true)
            }
            _ => Ok(false),
        }
    }
}

//! MongoDB Conversation Repository
//!
//! Information Hiding:
//! - Connection setup and database/collection naming hidden behind `DocumentStore`
//! - Query and update shapes (positional `$`, `$push`, `$pull`) kept private
//! - Reads go through raw `Document`s so malformed stored entries degrade to
//!   empty results instead of failing the whole call

use super::{ConversationDocument, ConversationRepository, ConversationSummary, UserDocument};
use crate::config::Settings;
use crate::core::codec::{self, StoredMessage};
use crate::core::message::ChatMessage;
use crate::error::{HistoryError, Result};
use async_trait::async_trait;
use bson::{doc, Bson, DateTime, Document};
use mongodb::{Client, Collection};

/// Document Store Client: resolves a collection handle
pub struct DocumentStore;

impl DocumentStore {
    /// Connect using `MONGODB_URI` and the configured database/collection
    pub async fn from_settings(settings: &Settings) -> Result<Collection<Document>> {
        let uri = Settings::mongodb_uri()?;
        Self::connect(&uri, &settings.store.database, &settings.store.collection).await
    }

    pub async fn connect(
        uri: &str,
        database: &str,
        collection: &str,
    ) -> Result<Collection<Document>> {
        let client = Client::with_uri_str(uri).await?;
        tracing::info!(
            "[DocumentStore] Configured MongoDB client ({}.{})",
            database,
            collection
        );
        Ok(client.database(database).collection::<Document>(collection))
    }
}

pub struct MongoRepository {
    collection: Collection<Document>,
}

impl MongoRepository {
    pub fn new(collection: Collection<Document>) -> Self {
        Self { collection }
    }

    pub async fn from_settings(settings: &Settings) -> Result<Self> {
        Ok(Self::new(DocumentStore::from_settings(settings).await?))
    }

    /// The single matching conversation as a raw document, if any
    async fn find_conversation(
        &self,
        user_name: &str,
        conversation_id: &str,
    ) -> Result<Option<Document>> {
        let found = self
            .collection
            .find_one(conversation_filter(user_name, conversation_id))
            .projection(doc! { "_id": 0, "conversations.$": 1 })
            .await?;

        Ok(found.and_then(|user| {
            user.get_array("conversations")
                .ok()
                .and_then(|convs| convs.first())
                .and_then(Bson::as_document)
                .cloned()
        }))
    }
}

fn user_filter(user_name: &str) -> Document {
    doc! { "user_name": user_name }
}

fn conversation_filter(user_name: &str, conversation_id: &str) -> Document {
    doc! {
        "user_name": user_name,
        "conversations.conversation_id": conversation_id,
    }
}

/// Matches only when the conversation's first message is a system message
fn system_head_filter(user_name: &str, conversation_id: &str) -> Document {
    doc! {
        "user_name": user_name,
        "conversations": {
            "$elemMatch": {
                "conversation_id": conversation_id,
                "messages.0.role": "system",
            }
        },
    }
}

fn summarize(conversations: &[Bson]) -> Vec<ConversationSummary> {
    conversations
        .iter()
        .filter_map(Bson::as_document)
        .filter_map(|conv| {
            let conversation_id = conv.get_str("conversation_id").ok()?;
            Some(ConversationSummary {
                conversation_id: conversation_id.to_string(),
                title: conv.get_str("title").unwrap_or_default().to_string(),
            })
        })
        .collect()
}

#[async_trait]
impl ConversationRepository for MongoRepository {
    async fn create_user(&self, user_name: &str) -> Result<bool> {
        if self.collection.find_one(user_filter(user_name)).await?.is_some() {
            tracing::debug!("[MongoRepository] User '{}' already exists", user_name);
            return Ok(false);
        }

        let user = bson::to_document(&UserDocument::new(user_name))?;
        self.collection.insert_one(user).await?;
        tracing::debug!("[MongoRepository] Created user '{}'", user_name);
        Ok(true)
    }

    async fn create_conversation(
        &self,
        user_name: &str,
        title: &str,
        system_prompt: &str,
    ) -> Result<String> {
        let conversation = ConversationDocument::new(title, system_prompt);
        let result = self
            .collection
            .update_one(
                user_filter(user_name),
                doc! { "$push": { "conversations": bson::to_bson(&conversation)? } },
            )
            .await?;

        if result.matched_count == 0 {
            tracing::warn!("[MongoRepository] Cannot create conversation: no user '{}'", user_name);
            return Err(HistoryError::UserNotFound(user_name.to_string()));
        }

        tracing::debug!(
            "[MongoRepository] Created conversation '{}' for user '{}'",
            conversation.conversation_id,
            user_name
        );
        Ok(conversation.conversation_id)
    }

    async fn list_conversation_titles(&self, user_name: &str) -> Result<Vec<ConversationSummary>> {
        let found = self
            .collection
            .find_one(user_filter(user_name))
            .projection(doc! {
                "_id": 0,
                "conversations.conversation_id": 1,
                "conversations.title": 1,
            })
            .await?;

        let titles = found
            .as_ref()
            .and_then(|user| user.get_array("conversations").ok())
            .map(|convs| summarize(convs))
            .unwrap_or_default();

        tracing::debug!("[MongoRepository] Listed {} conversations for '{}'", titles.len(), user_name);
        Ok(titles)
    }

    async fn get_conversation_title(
        &self,
        user_name: &str,
        conversation_id: &str,
    ) -> Result<String> {
        Ok(self
            .find_conversation(user_name, conversation_id)
            .await?
            .and_then(|conv| conv.get_str("title").ok().map(str::to_string))
            .unwrap_or_default())
    }

    async fn rename_conversation(
        &self,
        user_name: &str,
        conversation_id: &str,
        new_title: &str,
    ) -> Result<bool> {
        let result = self
            .collection
            .update_one(
                conversation_filter(user_name, conversation_id),
                doc! { "$set": { "conversations.$.title": new_title } },
            )
            .await?;
        tracing::debug!(
            "[MongoRepository] Renamed '{}' (modified: {})",
            conversation_id,
            result.modified_count
        );
        Ok(result.modified_count == 1)
    }

    async fn replace_messages(
        &self,
        user_name: &str,
        conversation_id: &str,
        messages: &[ChatMessage],
    ) -> Result<bool> {
        let stored = codec::encode_at(messages, DateTime::now());
        let result = self
            .collection
            .update_one(
                conversation_filter(user_name, conversation_id),
                doc! { "$set": { "conversations.$.messages": bson::to_bson(&stored)? } },
            )
            .await?;

        tracing::debug!(
            "[MongoRepository] Replaced {} messages in '{}' (modified: {})",
            messages.len(),
            conversation_id,
            result.modified_count
        );
        Ok(result.modified_count == 1)
    }

    async fn append_message(
        &self,
        user_name: &str,
        conversation_id: &str,
        message: &ChatMessage,
    ) -> Result<bool> {
        let stored = StoredMessage::from(message).stamped(DateTime::now());
        let result = self
            .collection
            .update_one(
                conversation_filter(user_name, conversation_id),
                doc! { "$push": { "conversations.$.messages": bson::to_bson(&stored)? } },
            )
            .await?;
        tracing::debug!(
            "[MongoRepository] Appended {} message to '{}' (matched: {})",
            message.role(),
            conversation_id,
            result.matched_count
        );
        Ok(result.matched_count == 1)
    }

    async fn update_system_prompt(
        &self,
        user_name: &str,
        conversation_id: &str,
        new_prompt: &str,
    ) -> Result<bool> {
        let result = self
            .collection
            .update_one(
                system_head_filter(user_name, conversation_id),
                doc! { "$set": { "conversations.$.messages.0.content": new_prompt } },
            )
            .await?;

        if result.matched_count == 0 {
            tracing::warn!(
                "[MongoRepository] No system message at position 0 of '{}'",
                conversation_id
            );
        }
        Ok(result.modified_count == 1)
    }

    async fn get_conversation_messages(
        &self,
        user_name: &str,
        conversation_id: &str,
    ) -> Result<Vec<ChatMessage>> {
        let messages = self
            .find_conversation(user_name, conversation_id)
            .await?
            .and_then(|conv| conv.get_array("messages").ok().map(|raw| codec::decode_bson(raw)))
            .unwrap_or_default();

        tracing::debug!(
            "[MongoRepository] Loaded {} messages from '{}'",
            messages.len(),
            conversation_id
        );
        Ok(messages)
    }

    async fn delete_conversation(&self, user_name: &str, conversation_id: &str) -> Result<bool> {
        let result = self
            .collection
            .update_one(
                user_filter(user_name),
                doc! { "$pull": { "conversations": { "conversation_id": conversation_id } } },
            )
            .await?;
        tracing::debug!(
            "[MongoRepository] Deleted conversation '{}' of '{}' (modified: {})",
            conversation_id,
            user_name,
            result.modified_count
        );
        Ok(result.modified_count == 1)
    }

    async fn delete_all_conversations(&self, user_name: &str) -> Result<bool> {
        let result = self
            .collection
            .update_one(
                user_filter(user_name),
                doc! { "$set": { "conversations": [] } },
            )
            .await?;
        tracing::debug!(
            "[MongoRepository] Cleared conversations of '{}' (modified: {})",
            user_name,
            result.modified_count
        );
        Ok(result.modified_count == 1)
    }
}

//! Chat Session - explicit per-user conversation context
//!
//! Information Hiding:
//! - Active user, conversation and in-memory transcript held in one value
//! - Repository calls are driven from here; callers never assemble history
//! - LLM providers sit behind the `ChatModel` trait

use crate::core::message::ChatMessage;
use crate::storage::{ConversationRepository, ConversationSummary};
use anyhow::{anyhow, bail, Context, Result};
use async_trait::async_trait;
use std::sync::Arc;

/// Text generation over an ordered transcript
#[async_trait]
pub trait ChatModel: Send + Sync {
    async fn complete(&self, messages: &[ChatMessage]) -> Result<String>;
}

pub struct ChatSession {
    repository: Arc<dyn ConversationRepository>,
    user_name: String,
    conversation_id: Option<String>,
    messages: Vec<ChatMessage>,
}

impl ChatSession {
    /// Ensure the user exists and start a session with no active conversation
    pub async fn login(
        repository: Arc<dyn ConversationRepository>,
        user_name: impl Into<String>,
    ) -> Result<Self> {
        let user_name = user_name.into();
        if user_name.trim().is_empty() {
            bail!("User name must not be empty");
        }

        let created = repository.create_user(&user_name).await?;
        tracing::info!("[ChatSession] Logged in as '{}' (new user: {})", user_name, created);

        Ok(Self::for_user(repository, user_name))
    }

    /// Session for a user assumed to exist; performs no writes
    pub fn for_user(repository: Arc<dyn ConversationRepository>, user_name: impl Into<String>) -> Self {
        Self {
            repository,
            user_name: user_name.into(),
            conversation_id: None,
            messages: Vec::new(),
        }
    }

    pub fn user_name(&self) -> &str {
        &self.user_name
    }

    pub fn conversation_id(&self) -> Option<&str> {
        self.conversation_id.as_deref()
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    fn active(&self) -> Result<&str> {
        self.conversation_id
            .as_deref()
            .ok_or_else(|| anyhow!("No active conversation"))
    }

    /// Create a conversation and make it the active one
    pub async fn new_conversation(&mut self, title: &str, system_prompt: &str) -> Result<&str> {
        let conversation_id = self
            .repository
            .create_conversation(&self.user_name, title, system_prompt)
            .await?;

        self.messages = vec![ChatMessage::system(system_prompt)];
        Ok(self.conversation_id.insert(conversation_id).as_str())
    }

    /// Load a stored conversation and make it the active one
    pub async fn open(&mut self, conversation_id: &str) -> Result<()> {
        let messages = self
            .repository
            .get_conversation_messages(&self.user_name, conversation_id)
            .await?;

        // An existing conversation may hold an empty or unreadable transcript
        if messages.is_empty() && !self.exists(conversation_id).await? {
            bail!("Conversation '{}' not found for user '{}'", conversation_id, self.user_name);
        }

        self.conversation_id = Some(conversation_id.to_string());
        self.messages = messages;
        Ok(())
    }

    async fn exists(&self, conversation_id: &str) -> Result<bool> {
        Ok(self
            .titles()
            .await?
            .iter()
            .any(|c| c.conversation_id == conversation_id))
    }

    pub async fn titles(&self) -> Result<Vec<ConversationSummary>> {
        Ok(self.repository.list_conversation_titles(&self.user_name).await?)
    }

    pub async fn title(&self) -> Result<String> {
        let conversation_id = self.active()?;
        Ok(self
            .repository
            .get_conversation_title(&self.user_name, conversation_id)
            .await?)
    }

    pub async fn rename(&self, new_title: &str) -> Result<bool> {
        let new_title = new_title.trim();
        if new_title.is_empty() {
            bail!("Title must not be empty");
        }
        let conversation_id = self.active()?;
        Ok(self
            .repository
            .rename_conversation(&self.user_name, conversation_id, new_title)
            .await?)
    }

    /// Append one message locally and persist it on its own
    pub async fn record(&mut self, message: ChatMessage) -> Result<()> {
        let conversation_id = self.active()?.to_string();
        if message.is_system() {
            bail!("System messages are managed through set_system_prompt");
        }

        let saved = self
            .repository
            .append_message(&self.user_name, &conversation_id, &message)
            .await?;
        if !saved {
            bail!("Conversation '{}' no longer exists", conversation_id);
        }

        self.messages.push(message);
        Ok(())
    }

    /// Send user input to the model, then persist the full transcript
    pub async fn send(&mut self, model: &dyn ChatModel, user_input: &str) -> Result<String> {
        let conversation_id = self.active()?.to_string();
        if !self.messages.first().is_some_and(ChatMessage::is_system) {
            bail!("Transcript of '{}' does not start with a system message", conversation_id);
        }

        self.messages.push(ChatMessage::user(user_input));
        let reply = match model.complete(&self.messages).await {
            Ok(reply) => reply,
            Err(e) => {
                self.messages.pop();
                return Err(e.context("Model invocation failed"));
            }
        };
        self.messages.push(ChatMessage::assistant(reply.as_str()));

        let saved = self
            .repository
            .replace_messages(&self.user_name, &conversation_id, &self.messages)
            .await
            .context("Failed to persist conversation")?;
        if !saved {
            self.messages.truncate(self.messages.len() - 2);
            bail!("Conversation '{}' no longer exists", conversation_id);
        }

        Ok(reply)
    }

    pub async fn set_system_prompt(&mut self, prompt: &str) -> Result<bool> {
        let conversation_id = self.active()?;
        let updated = self
            .repository
            .update_system_prompt(&self.user_name, conversation_id, prompt)
            .await?;

        if updated {
            if let Some(ChatMessage::System(content)) = self.messages.first_mut() {
                *content = prompt.to_string();
            }
        }
        Ok(updated)
    }

    /// Delete the active conversation
    pub async fn delete(&mut self) -> Result<bool> {
        let conversation_id = self.active()?;
        let deleted = self
            .repository
            .delete_conversation(&self.user_name, conversation_id)
            .await?;

        self.conversation_id = None;
        self.messages.clear();
        Ok(deleted)
    }

    pub async fn delete_all(&mut self) -> Result<bool> {
        let deleted = self
            .repository
            .delete_all_conversations(&self.user_name)
            .await?;

        self.conversation_id = None;
        self.messages.clear();
        Ok(deleted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::memory::InMemoryRepository;

    struct EchoModel;

    #[async_trait]
    impl ChatModel for EchoModel {
        async fn complete(&self, messages: &[ChatMessage]) -> Result<String> {
            let last = messages.last().map(ChatMessage::content).unwrap_or_default();
            Ok(format!("echo: {}", last))
        }
    }

    struct FailingModel;

    #[async_trait]
    impl ChatModel for FailingModel {
        async fn complete(&self, _messages: &[ChatMessage]) -> Result<String> {
            Err(anyhow!("provider unavailable"))
        }
    }

    async fn session() -> (Arc<InMemoryRepository>, ChatSession) {
        let repo = Arc::new(InMemoryRepository::new());
        let session = ChatSession::login(repo.clone(), "alice").await.unwrap();
        (repo, session)
    }

    #[tokio::test]
    async fn test_login_twice_is_fine() {
        let (repo, _) = session().await;
        let again = ChatSession::login(repo, "alice").await.unwrap();
        assert_eq!(again.user_name(), "alice");
        assert!(again.conversation_id().is_none());
    }

    #[tokio::test]
    async fn test_for_user_does_not_create() {
        let repo = Arc::new(InMemoryRepository::new());
        let session = ChatSession::for_user(repo.clone(), "bob");
        assert!(session.titles().await.unwrap().is_empty());
        assert!(repo.snapshot("bob").await.is_none());
    }

    #[tokio::test]
    async fn test_login_rejects_blank_name() {
        let repo = Arc::new(InMemoryRepository::new());
        assert!(ChatSession::login(repo, "  ").await.is_err());
    }

    #[tokio::test]
    async fn test_send_persists_full_history() {
        let (repo, mut session) = session().await;
        let id = session
            .new_conversation("New Chat", "You are a helpful assistant.")
            .await
            .unwrap()
            .to_string();

        let reply = session.send(&EchoModel, "Hello!").await.unwrap();
        assert_eq!(reply, "echo: Hello!");

        let stored = repo.get_conversation_messages("alice", &id).await.unwrap();
        assert_eq!(
            stored,
            vec![
                ChatMessage::system("You are a helpful assistant."),
                ChatMessage::user("Hello!"),
                ChatMessage::assistant("echo: Hello!"),
            ]
        );
        assert_eq!(session.messages(), stored.as_slice());
    }

    #[tokio::test]
    async fn test_failed_model_call_leaves_history_untouched() {
        let (repo, mut session) = session().await;
        let id = session.new_conversation("Chat", "rules").await.unwrap().to_string();

        assert!(session.send(&FailingModel, "Hello?").await.is_err());
        assert_eq!(session.messages(), &[ChatMessage::system("rules")]);
        assert_eq!(
            repo.get_conversation_messages("alice", &id).await.unwrap(),
            vec![ChatMessage::system("rules")]
        );
    }

    #[tokio::test]
    async fn test_open_restores_transcript() {
        let (repo, mut session) = session().await;
        let id = session.new_conversation("Chat", "rules").await.unwrap().to_string();
        session.record(ChatMessage::user("note to self")).await.unwrap();

        let mut other = ChatSession::login(repo, "alice").await.unwrap();
        other.open(&id).await.unwrap();
        assert_eq!(other.conversation_id(), Some(id.as_str()));
        assert_eq!(
            other.messages(),
            &[ChatMessage::system("rules"), ChatMessage::user("note to self")]
        );

        assert!(other.open("missing").await.is_err());
    }

    #[tokio::test]
    async fn test_record_rejects_system_messages() {
        let (_, mut session) = session().await;
        session.new_conversation("Chat", "rules").await.unwrap();
        assert!(session.record(ChatMessage::system("sneaky")).await.is_err());
        assert_eq!(session.messages().len(), 1);
    }

    #[tokio::test]
    async fn test_operations_need_active_conversation() {
        let (_, mut session) = session().await;
        assert!(session.title().await.is_err());
        assert!(session.send(&EchoModel, "hi").await.is_err());
        assert!(session.delete().await.is_err());
    }

    #[tokio::test]
    async fn test_rename_trims_and_rejects_blank() {
        let (_, mut session) = session().await;
        session.new_conversation("New Chat", "rules").await.unwrap();

        assert!(session.rename("   ").await.is_err());
        assert!(session.rename("  Kyoto trip ").await.unwrap());
        assert_eq!(session.title().await.unwrap(), "Kyoto trip");
    }

    #[tokio::test]
    async fn test_set_system_prompt_updates_both_copies() {
        let (repo, mut session) = session().await;
        let id = session.new_conversation("Chat", "old").await.unwrap().to_string();
        session.send(&EchoModel, "hi").await.unwrap();

        assert!(session.set_system_prompt("new").await.unwrap());
        assert_eq!(session.messages()[0], ChatMessage::system("new"));
        assert_eq!(
            repo.get_conversation_messages("alice", &id).await.unwrap()[0],
            ChatMessage::system("new")
        );
    }

    #[tokio::test]
    async fn test_open_accepts_empty_transcript() {
        let (repo, mut session) = session().await;
        let id = session.new_conversation("Keep me", "rules").await.unwrap().to_string();
        assert!(repo.replace_messages("alice", &id, &[]).await.unwrap());

        let mut other = ChatSession::for_user(repo.clone(), "alice");
        other.open(&id).await.unwrap();
        assert!(other.messages().is_empty());
        assert!(other.rename("Renamed").await.unwrap());
        assert!(other.delete().await.unwrap());
        assert!(repo.list_conversation_titles("alice").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_send_to_deleted_conversation_fails() {
        let (repo, mut session) = session().await;
        let id = session.new_conversation("Chat", "rules").await.unwrap().to_string();
        assert!(repo.delete_conversation("alice", &id).await.unwrap());

        assert!(session.send(&EchoModel, "hello").await.is_err());
        assert_eq!(session.messages(), &[ChatMessage::system("rules")]);
        assert!(repo.get_conversation_messages("alice", &id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_set_system_prompt_keeps_local_copy_when_not_stored() {
        let (repo, mut session) = session().await;
        let id = session.new_conversation("Chat", "old").await.unwrap().to_string();
        assert!(repo.delete_conversation("alice", &id).await.unwrap());

        assert!(!session.set_system_prompt("new").await.unwrap());
        assert_eq!(session.messages()[0], ChatMessage::system("old"));
    }

    #[tokio::test]
    async fn test_delete_clears_active_conversation() {
        let (_, mut session) = session().await;
        session.new_conversation("One", "s").await.unwrap();
        assert!(session.delete().await.unwrap());
        assert!(session.conversation_id().is_none());
        assert!(session.titles().await.unwrap().is_empty());

        session.new_conversation("Two", "s").await.unwrap();
        session.new_conversation("Three", "s").await.unwrap();
        assert!(session.delete_all().await.unwrap());
        assert!(session.titles().await.unwrap().is_empty());
        assert!(session.messages().is_empty());
    }
}

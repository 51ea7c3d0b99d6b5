//! In-memory chat transcript types
//!
//! A transcript is an ordered `Vec<ChatMessage>`. The variant carries the
//! role, so there is no way to build a message with an unrecognised role.

use serde::{Deserialize, Serialize};
use std::fmt;

/// The three recognised transcript roles
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::System => "system",
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }

    /// Parse a stored role tag. Unknown tags yield `None`.
    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "system" => Some(Role::System),
            "user" => Some(Role::User),
            "assistant" => Some(Role::Assistant),
            _ => None,
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "role", content = "content", rename_all = "lowercase")]
pub enum ChatMessage {
    System(String),
    User(String),
    Assistant(String),
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        ChatMessage::System(content.into())
    }

    pub fn user(content: impl Into<String>) -> Self {
        ChatMessage::User(content.into())
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        ChatMessage::Assistant(content.into())
    }

    pub fn new(role: Role, content: impl Into<String>) -> Self {
        match role {
            Role::System => ChatMessage::System(content.into()),
            Role::User => ChatMessage::User(content.into()),
            Role::Assistant => ChatMessage::Assistant(content.into()),
        }
    }

    pub fn role(&self) -> Role {
        match self {
            ChatMessage::System(_) => Role::System,
            ChatMessage::User(_) => Role::User,
            ChatMessage::Assistant(_) => Role::Assistant,
        }
    }

    pub fn content(&self) -> &str {
        match self {
            ChatMessage::System(c) | ChatMessage::User(c) | ChatMessage::Assistant(c) => c,
        }
    }

    pub fn is_system(&self) -> bool {
        matches!(self, ChatMessage::System(_))
    }
}

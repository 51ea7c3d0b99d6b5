//! Message Codec
//!
//! Maps between `ChatMessage` and the `{role, content, timestamp?}` shape
//! kept inside a conversation document. Decoding is lossy on purpose:
//! entries with an unrecognised role, or that are not documents at all,
//! are dropped rather than reported.

use super::message::{ChatMessage, Role};
use bson::{Bson, DateTime};
use serde::{Deserialize, Serialize};

/// A message as persisted inside a conversation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredMessage {
    #[serde(default)]
    pub role: String,
    #[serde(default)]
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<DateTime>,
}

impl StoredMessage {
    /// Attach the persistence time
    pub fn stamped(mut self, at: DateTime) -> Self {
        self.timestamp = Some(at);
        self
    }
}

impl From<&ChatMessage> for StoredMessage {
    fn from(message: &ChatMessage) -> Self {
        StoredMessage {
            role: message.role().as_str().to_string(),
            content: message.content().to_string(),
            timestamp: None,
        }
    }
}

pub fn encode(messages: &[ChatMessage]) -> Vec<StoredMessage> {
    messages.iter().map(StoredMessage::from).collect()
}

/// Encode and stamp every message with the same persistence time
pub fn encode_at(messages: &[ChatMessage], at: DateTime) -> Vec<StoredMessage> {
    messages
        .iter()
        .map(|m| StoredMessage::from(m).stamped(at))
        .collect()
}

pub fn decode(stored: &[StoredMessage]) -> Vec<ChatMessage> {
    stored
        .iter()
        .filter_map(|m| Role::from_tag(&m.role).map(|role| ChatMessage::new(role, m.content.as_str())))
        .collect()
}

/// Decode a raw BSON `messages` array straight from the store
pub fn decode_bson(values: &[Bson]) -> Vec<ChatMessage> {
    let stored: Vec<StoredMessage> = values
        .iter()
        .filter_map(|value| bson::from_bson::<StoredMessage>(value.clone()).ok())
        .collect();
    decode(&stored)
}

#[cfg(test)]
mod tests {
    use super::*;
    use bson::doc;

    fn transcript() -> Vec<ChatMessage> {
        vec![
            ChatMessage::system("You are a travel agent"),
            ChatMessage::user("Plan a 3-day trip to Kyoto"),
            ChatMessage::assistant("Day 1: Fushimi Inari..."),
        ]
    }

    #[test]
    fn test_encode_tags_roles() {
        let stored = encode(&transcript());
        let roles: Vec<&str> = stored.iter().map(|m| m.role.as_str()).collect();
        assert_eq!(roles, vec!["system", "user", "assistant"]);
        assert!(stored.iter().all(|m| m.timestamp.is_none()));
    }

    #[test]
    fn test_decode_inverts_encode() {
        let messages = transcript();
        assert_eq!(decode(&encode(&messages)), messages);
        assert_eq!(decode(&encode(&[])), Vec::<ChatMessage>::new());
    }

    #[test]
    fn test_timestamps_are_not_round_tripped() {
        let now = DateTime::now();
        let stored = encode_at(&transcript(), now);
        assert!(stored.iter().all(|m| m.timestamp == Some(now)));
        assert_eq!(decode(&stored), transcript());
    }

    #[test]
    fn test_decode_drops_unknown_roles() {
        let stored = vec![
            StoredMessage {
                role: "tool".to_string(),
                content: "ignored".to_string(),
                timestamp: None,
            },
            StoredMessage {
                role: "user".to_string(),
                content: "kept".to_string(),
                timestamp: None,
            },
        ];
        assert_eq!(decode(&stored), vec![ChatMessage::user("kept")]);
    }

    #[test]
    fn test_decode_bson_tolerates_malformed_entries() {
        let values = vec![
            Bson::Document(doc! { "role": "system", "content": "rules" }),
            Bson::String("not a message".to_string()),
            Bson::Document(doc! { "role": "assistant" }),
            Bson::Document(doc! { "content": "no role" }),
            Bson::Document(doc! { "role": "user", "content": "hi", "timestamp": DateTime::now() }),
        ];

        assert_eq!(
            decode_bson(&values),
            vec![
                ChatMessage::system("rules"),
                ChatMessage::assistant(""),
                ChatMessage::user("hi"),
            ]
        );
    }
}

use serde::{Deserialize, Serialize};
use std::fmt;

// ─── Identifiers ─────────────────────────────────────────────────────

macro_rules! string_id {
    ($name:ident) => {
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub String);

        impl $name {
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self(s.to_string())
            }
        }
    };
}

string_id!(ChannelId);
string_id!(MessageId);
string_id!(UserId);

// ─── Messages ────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Author {
    pub id: UserId,
    #[serde(default)]
    pub username: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub id: MessageId,
    pub channel_id: ChannelId,
    pub author: Author,
    #[serde(default)]
    pub content: String,
}

impl Message {
    /// Whether there is any text worth sending to a translator.
    pub fn has_content(&self) -> bool {
        !self.content.trim().is_empty()
    }
}

/// Outgoing message as seen by the pre-send hook. The hook may rewrite
/// `content` in place before the host sends it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Draft {
    pub channel_id: ChannelId,
    pub content: String,
}

// ─── Translation ─────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Sent,
    Received,
}

impl Direction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::Sent => "sent",
            Direction::Received => "received",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TranslationResult {
    pub text: String,
    pub source_language: String,
    pub target_language: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn message_deserializes_from_host_shape() {
        let json = r#"{
            "id": "m1",
            "channel_id": "general",
            "author": { "id": "u7", "username": "kasia" },
            "content": "dzień dobry"
        }"#;
        let msg: Message = serde_json::from_str(json).unwrap();
        assert_eq!(msg.id, MessageId::new("m1"));
        assert_eq!(msg.channel_id.as_str(), "general");
        assert_eq!(msg.author.id, UserId::from("u7"));
        assert!(msg.has_content());
    }

    #[test]
    fn whitespace_only_message_has_no_content() {
        let msg = Message {
            id: "m".into(),
            channel_id: "c".into(),
            author: Author { id: "u".into(), username: String::new() },
            content: "  \n ".into(),
        };
        assert!(!msg.has_content());
    }

    #[test]
    fn direction_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&Direction::Sent).unwrap(), "\"sent\"");
        assert_eq!(Direction::Received.to_string(), "received");
    }
}

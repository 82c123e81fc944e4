//! Chat history types supplied by the host.

use serde::{Deserialize, Serialize};

/// Role of a message in the host's conversation history.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    System,
    User,
    Assistant,
    /// Any role the relay does not recognize; dropped during formatting.
    #[serde(other)]
    Other,
}

/// A message in the conversation history as the host hands it over.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::Assistant,
            content: content.into(),
        }
    }
}

/// One relay invocation: the conversation history for a single
/// request/response cycle.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct RelayRequest {
    pub messages: Vec<ChatMessage>,
}

impl RelayRequest {
    pub fn from_messages(messages: Vec<ChatMessage>) -> Self {
        Self { messages }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_serialization() {
        assert_eq!(
            serde_json::to_value(ChatRole::System).unwrap(),
            serde_json::json!("system")
        );
        assert_eq!(
            serde_json::to_value(ChatRole::Assistant).unwrap(),
            serde_json::json!("assistant")
        );
    }

    #[test]
    fn unknown_role_deserializes_to_other() {
        let msg: ChatMessage =
            serde_json::from_str(r#"{"role": "tool", "content": "output"}"#).unwrap();
        assert_eq!(msg.role, ChatRole::Other);
    }

    #[test]
    fn constructors() {
        assert_eq!(ChatMessage::user("hi").role, ChatRole::User);
        assert_eq!(ChatMessage::system("rules").role, ChatRole::System);
        assert_eq!(ChatMessage::assistant("hello").role, ChatRole::Assistant);
    }
}

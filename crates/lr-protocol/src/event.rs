//! Host event grammar.
//!
//! Events are delivered to the host's event emitter as
//! `{"type": ..., "data": {...}}` objects, matching the emitter contract
//! of the hosting platform.

use serde::{Deserialize, Serialize};

use crate::fragment::UsageStats;

/// Severity attached to status events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StatusLevel {
    Info,
    Success,
    Error,
}

/// One unit of output the relay emits for the host to render.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "lowercase")]
pub enum HostEvent {
    Status {
        status: String,
        level: StatusLevel,
        description: String,
        done: bool,
    },
    Message {
        content: String,
    },
    Reasoning {
        message: String,
    },
    Usage(UsageStats),
    Error {
        error: String,
        #[serde(rename = "type")]
        kind: String,
    },
}

impl HostEvent {
    /// An in-progress or terminal status event. The `status` field follows
    /// the host convention: "in_progress" while work continues,
    /// "complete" once done.
    pub fn status(level: StatusLevel, description: impl Into<String>, done: bool) -> Self {
        HostEvent::Status {
            status: if done { "complete" } else { "in_progress" }.to_string(),
            level,
            description: description.into(),
            done,
        }
    }

    pub fn message(content: impl Into<String>) -> Self {
        HostEvent::Message {
            content: content.into(),
        }
    }

    pub fn reasoning(message: impl Into<String>) -> Self {
        HostEvent::Reasoning {
            message: message.into(),
        }
    }

    pub fn error(error: impl Into<String>, kind: impl Into<String>) -> Self {
        HostEvent::Error {
            error: error.into(),
            kind: kind.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn status_serialization() {
        let event = HostEvent::status(StatusLevel::Info, "Processing request...", false);
        let value = serde_json::to_value(&event).unwrap();
        assert_eq!(
            value,
            json!({
                "type": "status",
                "data": {
                    "status": "in_progress",
                    "level": "info",
                    "description": "Processing request...",
                    "done": false
                }
            })
        );
    }

    #[test]
    fn terminal_status_is_complete() {
        let event = HostEvent::status(StatusLevel::Success, "Response received", true);
        let value = serde_json::to_value(&event).unwrap();
        assert_eq!(value["data"]["status"], "complete");
        assert_eq!(value["data"]["done"], true);
        assert_eq!(value["data"]["level"], "success");
    }

    #[test]
    fn message_serialization() {
        let event = HostEvent::message("Hello");
        let value = serde_json::to_value(&event).unwrap();
        assert_eq!(
            value,
            json!({"type": "message", "data": {"content": "Hello"}})
        );
    }

    #[test]
    fn reasoning_serialization() {
        let event = HostEvent::reasoning("step one");
        let value = serde_json::to_value(&event).unwrap();
        assert_eq!(value["type"], "reasoning");
        assert_eq!(value["data"]["message"], "step one");
    }

    #[test]
    fn usage_serialization() {
        let event = HostEvent::Usage(UsageStats {
            completion_tokens: 15,
            prompt_tokens: 25,
            total_tokens: 40,
            step_count: 2,
        });
        let value = serde_json::to_value(&event).unwrap();
        assert_eq!(
            value,
            json!({
                "type": "usage",
                "data": {
                    "completion_tokens": 15,
                    "prompt_tokens": 25,
                    "total_tokens": 40,
                    "step_count": 2
                }
            })
        );
    }

    #[test]
    fn error_serialization_uses_type_field() {
        let event = HostEvent::error("call c1 never returned", "UnresolvedToolCall");
        let value = serde_json::to_value(&event).unwrap();
        assert_eq!(value["type"], "error");
        assert_eq!(value["data"]["error"], "call c1 never returned");
        assert_eq!(value["data"]["type"], "UnresolvedToolCall");
    }

    #[test]
    fn event_round_trip() {
        let event = HostEvent::status(StatusLevel::Error, "failed", true);
        let json = serde_json::to_string(&event).unwrap();
        let back: HostEvent = serde_json::from_str(&json).unwrap();
        assert_eq!(back, event);
    }
}

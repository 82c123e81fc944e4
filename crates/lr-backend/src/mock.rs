//! Mock frame source for testing.
//!
//! Produces the exact same `Result<Value, BackendError>` stream as the
//! real Letta client, allowing tests at every layer to use the mock
//! instead of real HTTP.

use std::time::Duration;

use async_stream::stream;
use futures::Stream;
use serde_json::{json, Value};
use tokio::time::sleep;

use crate::letta::BackendError;

/// Configurable mock frames.
#[derive(Debug, Clone)]
pub enum MockFrame {
    /// An assistant_message fragment.
    AssistantText { content: String },
    /// A reasoning_message fragment.
    Reasoning { message: String },
    /// A tool_call fragment.
    ToolCall {
        id: String,
        name: String,
        arguments: Value,
    },
    /// A tool_return fragment.
    ToolReturn {
        tool_call_id: String,
        content: String,
        status: Option<String>,
    },
    /// A usage_statistics fragment.
    Usage {
        completion_tokens: u64,
        prompt_tokens: u64,
        total_tokens: u64,
        step_count: u64,
    },
    /// An arbitrary raw frame, for malformed-input tests.
    Raw(Value),
    /// A transport error terminating the stream.
    Error { message: String },
    /// Delay before the next frame (for timing tests).
    Delay { ms: u64 },
}

impl MockFrame {
    fn to_value(&self) -> Option<Value> {
        match self {
            MockFrame::AssistantText { content } => Some(json!({
                "message_type": "assistant_message",
                "content": content,
            })),
            MockFrame::Reasoning { message } => Some(json!({
                "message_type": "reasoning_message",
                "message": message,
            })),
            MockFrame::ToolCall {
                id,
                name,
                arguments,
            } => Some(json!({
                "tool_calls": [{
                    "id": id,
                    "function": {"name": name, "arguments": arguments},
                }],
            })),
            MockFrame::ToolReturn {
                tool_call_id,
                content,
                status,
            } => {
                let mut frame = json!({
                    "tool_call_id": tool_call_id,
                    "content": content,
                });
                if let Some(status) = status {
                    frame["status"] = json!(status);
                }
                Some(frame)
            }
            MockFrame::Usage {
                completion_tokens,
                prompt_tokens,
                total_tokens,
                step_count,
            } => Some(json!({
                "message_type": "usage_statistics",
                "completion_tokens": completion_tokens,
                "prompt_tokens": prompt_tokens,
                "total_tokens": total_tokens,
                "step_count": step_count,
            })),
            MockFrame::Raw(value) => Some(value.clone()),
            MockFrame::Error { .. } | MockFrame::Delay { .. } => None,
        }
    }
}

/// Configuration for the mock stream.
#[derive(Debug, Clone, Default)]
pub struct MockConfig {
    /// Sequence of frames to emit.
    pub frames: Vec<MockFrame>,
    /// Optional delay between each frame (ms).
    pub frame_delay_ms: Option<u64>,
}

impl MockConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_frames(mut self, frames: Vec<MockFrame>) -> Self {
        self.frames = frames;
        self
    }

    pub fn with_frame_delay(mut self, ms: u64) -> Self {
        self.frame_delay_ms = Some(ms);
        self
    }
}

/// Create a frame stream from mock config.
pub fn mock_stream(config: MockConfig) -> impl Stream<Item = Result<Value, BackendError>> {
    stream! {
        for frame in config.frames {
            if let Some(delay_ms) = config.frame_delay_ms {
                sleep(Duration::from_millis(delay_ms)).await;
            }

            match frame {
                MockFrame::Error { message } => {
                    yield Err(BackendError::Api { status: 500, body: message });
                    return;
                }
                MockFrame::Delay { ms } => {
                    sleep(Duration::from_millis(ms)).await;
                }
                other => {
                    if let Some(value) = other.to_value() {
                        yield Ok(value);
                    }
                }
            }
        }
    }
}

/// Built-in fixtures for common scenarios.
pub mod fixtures {
    use super::*;

    /// A plain text answer followed by usage counters.
    pub fn text_with_usage(text: &str) -> MockConfig {
        MockConfig::new().with_frames(vec![
            MockFrame::AssistantText {
                content: text.to_string(),
            },
            MockFrame::Usage {
                completion_tokens: 12,
                prompt_tokens: 34,
                total_tokens: 46,
                step_count: 1,
            },
        ])
    }

    /// Reasoning, a full tool round trip, then the final answer.
    pub fn tool_round_trip(call_id: &str, tool: &str, result: &str, answer: &str) -> MockConfig {
        MockConfig::new().with_frames(vec![
            MockFrame::Reasoning {
                message: format!("I should call {tool}."),
            },
            MockFrame::ToolCall {
                id: call_id.to_string(),
                name: tool.to_string(),
                arguments: json!({"location": "current"}),
            },
            MockFrame::ToolReturn {
                tool_call_id: call_id.to_string(),
                content: result.to_string(),
                status: Some("success".to_string()),
            },
            MockFrame::AssistantText {
                content: answer.to_string(),
            },
        ])
    }

    /// A tool call whose return never arrives.
    pub fn dangling_tool_call(call_id: &str, tool: &str) -> MockConfig {
        MockConfig::new().with_frames(vec![MockFrame::ToolCall {
            id: call_id.to_string(),
            name: tool.to_string(),
            arguments: json!({}),
        }])
    }

    /// Text, then a transport error mid-stream.
    pub fn error_mid_stream(text_before: &str, error: &str) -> MockConfig {
        MockConfig::new().with_frames(vec![
            MockFrame::AssistantText {
                content: text_before.to_string(),
            },
            MockFrame::Error {
                message: error.to_string(),
            },
        ])
    }
}

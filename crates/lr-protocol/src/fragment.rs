//! Fragment grammar streamed by the Letta agent service.
//!
//! Each SSE data frame carries one JSON object whose shape determines its
//! kind. Classification is total: a frame that matches none of the known
//! shapes is an `UnknownFragment` error, never a silent skip, so protocol
//! drift on the agent side surfaces immediately.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// One classified unit of the agent service's streamed output.
#[derive(Debug, Clone, PartialEq)]
pub enum Fragment {
    /// Assistant-visible response text.
    AssistantText { content: String },

    /// An internal reasoning step.
    Reasoning { message: String },

    /// The agent invoked a tool.
    ToolCall(ToolInvocation),

    /// A tool finished and returned its result to the agent.
    ToolReturn {
        tool_call_id: String,
        content: String,
        /// Tool execution outcome as reported by the agent service
        /// ("success" or "error"). Older builds omit it.
        status: Option<String>,
    },

    /// Token/step counters for the in-flight response. Each occurrence
    /// replaces the previous one; the last value before stream end wins.
    Usage(UsageStats),
}

/// A tool invocation as it appears in a `tool_call` fragment.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolInvocation {
    pub id: String,
    pub name: String,
    pub arguments: Map<String, Value>,
}

/// Token usage counters reported by the agent service.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UsageStats {
    pub completion_tokens: u64,
    pub prompt_tokens: u64,
    pub total_tokens: u64,
    pub step_count: u64,
}

/// A frame that matched none of the known fragment shapes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownFragment {
    /// The `message_type` the frame declared, if any.
    pub message_type: Option<String>,
}

impl std::fmt::Display for UnknownFragment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.message_type {
            Some(mt) => write!(f, "unrecognized fragment message_type {mt:?}"),
            None => write!(f, "fragment matches no known shape"),
        }
    }
}

impl std::error::Error for UnknownFragment {}

impl Fragment {
    /// Classify a raw JSON frame by its shape.
    pub fn classify(raw: &Value) -> Result<Fragment, UnknownFragment> {
        let message_type = raw.get("message_type").and_then(|v| v.as_str());

        match message_type {
            Some("assistant_message") => {
                if let Some(content) = raw.get("content").and_then(|v| v.as_str()) {
                    return Ok(Fragment::AssistantText {
                        content: content.to_string(),
                    });
                }
            }
            Some("reasoning_message") => {
                // Current builds put the text in `message`; older ones
                // used `content`.
                let text = raw
                    .get("message")
                    .or_else(|| raw.get("content"))
                    .and_then(|v| v.as_str());
                if let Some(message) = text {
                    return Ok(Fragment::Reasoning {
                        message: message.to_string(),
                    });
                }
            }
            Some("usage_statistics") => {
                if let Some(usage) = parse_usage(raw) {
                    return Ok(Fragment::Usage(usage));
                }
            }
            _ => {}
        }

        // Tool frames are identified by field presence, not message_type.
        if let Some(call) = parse_tool_call(raw) {
            return Ok(Fragment::ToolCall(call));
        }
        if let Some(id) = raw.get("tool_call_id").and_then(|v| v.as_str()) {
            if let Some(content) = raw.get("content").and_then(|v| v.as_str()) {
                return Ok(Fragment::ToolReturn {
                    tool_call_id: id.to_string(),
                    content: content.to_string(),
                    status: raw
                        .get("status")
                        .and_then(|v| v.as_str())
                        .map(str::to_string),
                });
            }
        }

        Err(UnknownFragment {
            message_type: message_type.map(str::to_string),
        })
    }
}

fn parse_usage(raw: &Value) -> Option<UsageStats> {
    Some(UsageStats {
        completion_tokens: raw.get("completion_tokens")?.as_u64()?,
        prompt_tokens: raw.get("prompt_tokens")?.as_u64()?,
        total_tokens: raw.get("total_tokens")?.as_u64()?,
        step_count: raw.get("step_count")?.as_u64()?,
    })
}

fn parse_tool_call(raw: &Value) -> Option<ToolInvocation> {
    let call = raw.get("tool_calls")?.as_array()?.first()?;
    let function = call.get("function")?;
    Some(ToolInvocation {
        id: call.get("id")?.as_str()?.to_string(),
        name: function.get("name")?.as_str()?.to_string(),
        arguments: function.get("arguments")?.as_object()?.clone(),
    })
}

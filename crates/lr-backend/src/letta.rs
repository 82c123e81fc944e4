//! Letta streaming API client.
//!
//! Posts the latest user turn to the agent's `/messages/stream` endpoint
//! and yields one raw JSON frame per SSE data frame. Classification of
//! frames into fragments is the core's job; this module only owns
//! transport, authentication, and message formatting.

use std::time::Duration;

use async_stream::stream;
use futures::Stream;
use reqwest::Client;
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

use lr_protocol::{ChatRole, RelayRequest};

use crate::sse::sse_frames;

const STREAM_PATH: &str = "/v1/agents";

#[derive(Debug, Error)]
pub enum BackendError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("malformed frame: {0}")]
    Json(#[from] serde_json::Error),
    #[error("API error {status}: {body}")]
    Api { status: u16, body: String },
}

/// Letta API client.
pub struct LettaClient {
    base_url: String,
    agent_id: String,
    password: String,
    http: Client,
}

/// Build an HTTP client with appropriate timeouts and connection limits.
fn build_http_client() -> Client {
    Client::builder()
        .timeout(Duration::from_secs(120))
        .connect_timeout(Duration::from_secs(10))
        .pool_max_idle_per_host(2)
        .build()
        .expect("failed to build HTTP client")
}

impl LettaClient {
    pub fn new(
        base_url: impl Into<String>,
        agent_id: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            agent_id: agent_id.into(),
            password: password.into(),
            http: build_http_client(),
        }
    }

    fn stream_url(&self) -> String {
        format!(
            "{}{}/{}/messages/stream",
            self.base_url, STREAM_PATH, self.agent_id
        )
    }

    /// Send a request and return the raw frame stream. The `[DONE]`
    /// terminator is consumed here; downstream sees only payload frames.
    pub fn send(
        &self,
        request: &RelayRequest,
    ) -> impl Stream<Item = Result<Value, BackendError>> + Send + 'static {
        let url = self.stream_url();
        let password = self.password.clone();
        let http = self.http.clone();
        let body = build_payload(request);

        stream! {
            match send_request(&http, &url, &password, &body).await {
                Ok(response) => {
                    let byte_stream = response.bytes_stream();
                    let mut frames = sse_frames(byte_stream);

                    use futures::StreamExt;

                    while let Some(result) = frames.next().await {
                        match result {
                            Ok(frame) => {
                                if frame.is_done() {
                                    return;
                                }
                                if frame.data.is_empty() {
                                    continue;
                                }
                                yield serde_json::from_str::<Value>(&frame.data)
                                    .map_err(BackendError::from);
                            }
                            Err(e) => {
                                yield Err(BackendError::Http(e));
                                return;
                            }
                        }
                    }
                }
                Err(e) => {
                    yield Err(e);
                }
            }
        }
    }
}

async fn send_request(
    http: &Client,
    url: &str,
    password: &str,
    body: &StreamRequest,
) -> Result<reqwest::Response, BackendError> {
    let response = http
        .post(url)
        .header("content-type", "application/json")
        .header("accept", "text/event-stream")
        .header("x-bare-password", format!("password {password}"))
        .json(body)
        .send()
        .await?;

    if !response.status().is_success() {
        // 422 bodies carry the validation detail; pass them through.
        let status = response.status().as_u16();
        let body = response.text().await.unwrap_or_default();
        return Err(BackendError::Api { status, body });
    }

    Ok(response)
}

/// Convert the host's history to the Letta message format: system stays
/// system, everything else the agent accepts becomes user, unsupported
/// roles are dropped. An empty history becomes a single greeting so the
/// request always validates.
fn format_messages(request: &RelayRequest) -> Vec<LettaMessage> {
    let mut formatted: Vec<LettaMessage> = request
        .messages
        .iter()
        .filter(|msg| {
            matches!(
                msg.role,
                ChatRole::System | ChatRole::User | ChatRole::Assistant
            )
        })
        .map(|msg| LettaMessage {
            role: match msg.role {
                ChatRole::System => "system",
                _ => "user",
            },
            content: msg.content.clone(),
        })
        .collect();

    if formatted.is_empty() {
        formatted.push(LettaMessage {
            role: "user",
            content: "Hello".to_string(),
        });
    }

    formatted
}

/// Build the request body. The agent keeps its own history, so only the
/// last formatted message is sent.
fn build_payload(request: &RelayRequest) -> StreamRequest {
    let mut messages = format_messages(request);
    let last = messages.pop().expect("format_messages is never empty");

    StreamRequest {
        messages: vec![last],
        stream_steps: true,
        stream_tokens: true,
    }
}

// API request types

#[derive(Debug, Serialize)]
struct StreamRequest {
    messages: Vec<LettaMessage>,
    stream_steps: bool,
    stream_tokens: bool,
}

#[derive(Debug, Serialize)]
struct LettaMessage {
    role: &'static str,
    content: String,
}

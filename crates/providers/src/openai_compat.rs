//! OpenAI-compatible provider implementation.
//!
//! Works with DeepSeek, OpenRouter and any endpoint exposing an
//! OpenAI-style `/chat/completions` route with SSE streaming.
//!
//! The provider does not reassemble anything: every SSE chunk is turned
//! into the [`StreamDelta`] fragments it carries and forwarded as-is.

use async_trait::async_trait;
use codewright_core::error::ProviderError;
use codewright_core::message::Message;
use codewright_core::provider::{DeltaReceiver, ProviderRequest, StreamDelta, ToolDefinition};
use futures::StreamExt;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;
use tracing::{debug, trace, warn};

/// An OpenAI-compatible chat-completion provider.
pub struct OpenAiCompatProvider {
    name: String,
    base_url: String,
    api_key: String,
    extra_headers: BTreeMap<String, String>,
    extra_body: serde_json::Map<String, serde_json::Value>,
    client: reqwest::Client,
}

impl OpenAiCompatProvider {
    /// Create a new OpenAI-compatible provider.
    pub fn new(
        name: impl Into<String>,
        base_url: impl Into<String>,
        api_key: impl Into<String>,
    ) -> Self {
        // No overall timeout: reasoning models can stream for many minutes.
        let client = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(30))
            .build()
            .unwrap_or_else(|e| {
                warn!(error = %e, "Falling back to default HTTP client");
                reqwest::Client::new()
            });

        Self {
            name: name.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            extra_headers: BTreeMap::new(),
            extra_body: serde_json::Map::new(),
            client,
        }
    }

    /// Create a DeepSeek provider (convenience constructor).
    pub fn deepseek(api_key: impl Into<String>) -> Self {
        Self::new("deepseek", "https://api.deepseek.com", api_key)
    }

    /// Create an OpenRouter provider (convenience constructor).
    pub fn openrouter(api_key: impl Into<String>) -> Self {
        Self::new("openrouter", "https://openrouter.ai/api/v1", api_key)
    }

    /// Headers sent with every request from this provider.
    pub fn with_extra_headers(mut self, headers: BTreeMap<String, String>) -> Self {
        self.extra_headers = headers;
        self
    }

    /// Body fields merged into every request from this provider.
    pub fn with_extra_body(mut self, body: serde_json::Map<String, serde_json::Value>) -> Self {
        self.extra_body = body;
        self
    }

    /// Convert transcript entries to OpenAI API format.
    fn to_api_messages(messages: &[Message]) -> Vec<ApiMessage> {
        messages
            .iter()
            .map(|m| match m {
                Message::System { content } => ApiMessage::plain("system", content),
                Message::User { content } => ApiMessage::plain("user", content),
                Message::Assistant {
                    content,
                    tool_calls,
                } => ApiMessage {
                    role: "assistant".into(),
                    content: content.clone(),
                    tool_calls: if tool_calls.is_empty() {
                        None
                    } else {
                        Some(
                            tool_calls
                                .iter()
                                .map(|tc| ApiToolCall {
                                    id: tc.id.clone(),
                                    r#type: "function".into(),
                                    function: ApiFunction {
                                        name: tc.name.clone(),
                                        arguments: tc.arguments.clone(),
                                    },
                                })
                                .collect(),
                        )
                    },
                    tool_call_id: None,
                },
                Message::Tool {
                    tool_call_id,
                    content,
                } => ApiMessage {
                    role: "tool".into(),
                    content: Some(content.clone()),
                    tool_calls: None,
                    tool_call_id: Some(tool_call_id.clone()),
                },
            })
            .collect()
    }

    /// Convert tool definitions to OpenAI API format.
    fn to_api_tools(tools: &[ToolDefinition]) -> Vec<ApiToolDefinition> {
        tools
            .iter()
            .map(|t| ApiToolDefinition {
                r#type: "function".into(),
                function: ApiToolFunction {
                    name: t.name.clone(),
                    description: t.description.clone(),
                    parameters: t.parameters.clone(),
                },
            })
            .collect()
    }

    /// Build the JSON request body. Extra body fields from the provider and
    /// then the request are merged last and win over the defaults.
    fn build_body(&self, request: &ProviderRequest) -> serde_json::Value {
        let mut body = serde_json::json!({
            "model": request.model,
            "messages": Self::to_api_messages(&request.messages),
            "stream": request.stream,
        });

        if let Some(max_tokens) = request.max_tokens {
            body["max_tokens"] = serde_json::json!(max_tokens);
        }

        if !request.tools.is_empty() {
            body["tools"] = serde_json::json!(Self::to_api_tools(&request.tools));
        }

        for (key, value) in self.extra_body.iter().chain(request.extra_body.iter()) {
            body[key.as_str()] = value.clone();
        }

        body
    }
}

#[async_trait]
impl codewright_core::Provider for OpenAiCompatProvider {
    fn name(&self) -> &str {
        &self.name
    }

    async fn stream(&self, request: ProviderRequest) -> Result<DeltaReceiver, ProviderError> {
        let url = format!("{}/chat/completions", self.base_url);
        let body = self.build_body(&request);

        debug!(
            provider = %self.name,
            model = %request.model,
            messages = request.messages.len(),
            tools = request.tools.len(),
            "Sending streaming request"
        );

        let mut http = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .header("Accept", "text/event-stream");
        for (key, value) in self.extra_headers.iter().chain(request.extra_headers.iter()) {
            http = http.header(key.as_str(), value.as_str());
        }

        let response = http
            .json(&body)
            .send()
            .await
            .map_err(|e| ProviderError::Network(e.to_string()))?;

        let status = response.status().as_u16();

        if status == 429 {
            return Err(ProviderError::RateLimited {
                retry_after_secs: 5,
            });
        }

        if status == 401 || status == 403 {
            return Err(ProviderError::AuthenticationFailed(
                "Invalid API key or insufficient permissions".into(),
            ));
        }

        if status == 404 {
            return Err(ProviderError::ModelNotFound(request.model));
        }

        if status != 200 {
            let error_body = response.text().await.unwrap_or_default();
            warn!(status, body = %error_body, "Provider streaming error");
            return Err(ProviderError::ApiError {
                status_code: status,
                message: error_body,
            });
        }

        let (tx, rx) = tokio::sync::mpsc::channel(64);
        let provider_name = self.name.clone();

        // Spawn task to read the SSE byte stream and forward fragments
        tokio::spawn(async move {
            let mut byte_stream = response.bytes_stream();
            let mut lines = SseLineBuffer::default();

            while let Some(chunk_result) = byte_stream.next().await {
                let bytes = match chunk_result {
                    Ok(b) => b,
                    Err(e) => {
                        let _ = tx
                            .send(Err(ProviderError::StreamInterrupted(e.to_string())))
                            .await;
                        return;
                    }
                };

                for event in lines.push(&bytes) {
                    let data = match event {
                        SseEvent::Done => {
                            trace!(provider = %provider_name, "Stream finished");
                            return;
                        }
                        SseEvent::Data(data) => data,
                    };

                    match parse_sse_data(&data) {
                        Ok(deltas) => {
                            for delta in deltas {
                                if tx.send(Ok(delta)).await.is_err() {
                                    return; // receiver dropped
                                }
                            }
                        }
                        Err(e) => {
                            warn!(provider = %provider_name, error = %e, "Bad stream chunk");
                            let _ = tx.send(Err(e)).await;
                            return;
                        }
                    }
                }
            }

            // A body that ends before [DONE] was cut off; the partial
            // response must not be mistaken for a complete one.
            let reason = match lines.remainder() {
                Some(tail) => format!("stream ended before [DONE] inside an unterminated line: {tail}"),
                None => "stream ended before [DONE]".to_string(),
            };
            warn!(provider = %provider_name, "Stream truncated by server");
            let _ = tx.send(Err(ProviderError::StreamInterrupted(reason))).await;
        });

        Ok(rx)
    }
}

/// One complete SSE event of interest.
#[derive(Debug, PartialEq, Eq)]
enum SseEvent {
    Data(String),
    Done,
}

/// Splits the raw byte stream into SSE `data:` payloads.
///
/// Bytes are buffered until a full line arrives so a multi-byte character
/// split across network chunks is decoded intact.
#[derive(Default)]
struct SseLineBuffer {
    buffer: Vec<u8>,
}

impl SseLineBuffer {
    fn push(&mut self, bytes: &[u8]) -> Vec<SseEvent> {
        self.buffer.extend_from_slice(bytes);
        let mut events = Vec::new();

        while let Some(line_end) = self.buffer.iter().position(|&b| b == b'\n') {
            let raw: Vec<u8> = self.buffer.drain(..=line_end).collect();
            let line = String::from_utf8_lossy(&raw);
            let line = line.trim_end_matches(['\n', '\r']);

            // Skip empty lines and SSE comments (keep-alives)
            if line.is_empty() || line.starts_with(':') {
                continue;
            }

            if let Some(data) = line.strip_prefix("data:") {
                let data = data.trim();
                if data == "[DONE]" {
                    events.push(SseEvent::Done);
                } else if !data.is_empty() {
                    events.push(SseEvent::Data(data.to_string()));
                }
            }
        }

        events
    }

    /// Bytes received after the last newline, if any.
    fn remainder(&self) -> Option<String> {
        let tail = String::from_utf8_lossy(&self.buffer);
        let tail = tail.trim();
        (!tail.is_empty()).then(|| tail.to_string())
    }
}

/// Translate one SSE `data:` payload into the fragments it carries,
/// in the order reasoning, content, tool calls.
fn parse_sse_data(data: &str) -> Result<Vec<StreamDelta>, ProviderError> {
    let chunk: StreamResponse = serde_json::from_str(data)
        .map_err(|e| ProviderError::StreamInterrupted(format!("malformed stream chunk: {e}")))?;

    if let Some(error) = chunk.error {
        return Err(ProviderError::StreamInterrupted(error.message));
    }

    let mut deltas = Vec::new();
    let Some(choice) = chunk.choices.into_iter().next() else {
        return Ok(deltas);
    };
    let delta = choice.delta;

    if let Some(reasoning) = delta.reasoning_content.or(delta.reasoning)
        && !reasoning.is_empty()
    {
        deltas.push(StreamDelta::Reasoning(reasoning));
    }

    if let Some(content) = delta.content
        && !content.is_empty()
    {
        deltas.push(StreamDelta::Content(content));
    }

    for tc in delta.tool_calls.unwrap_or_default() {
        let (name, arguments) = match tc.function {
            Some(f) => (f.name, f.arguments),
            None => (None, None),
        };
        deltas.push(StreamDelta::ToolCall {
            index: tc.index,
            id: tc.id,
            name,
            arguments,
        });
    }

    Ok(deltas)
}

// --- OpenAI API types (internal) ---

#[derive(Debug, Serialize, Deserialize)]
struct ApiMessage {
    role: String,
    /// Serialized as `null` for assistant turns that carry tool calls.
    content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_calls: Option<Vec<ApiToolCall>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_call_id: Option<String>,
}

impl ApiMessage {
    fn plain(role: &str, content: &str) -> Self {
        Self {
            role: role.into(),
            content: Some(content.to_string()),
            tool_calls: None,
            tool_call_id: None,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct ApiToolCall {
    id: String,
    r#type: String,
    function: ApiFunction,
}

#[derive(Debug, Serialize, Deserialize)]
struct ApiFunction {
    name: String,
    arguments: String,
}

#[derive(Debug, Serialize, Deserialize)]
struct ApiToolDefinition {
    r#type: String,
    function: ApiToolFunction,
}

#[derive(Debug, Serialize, Deserialize)]
struct ApiToolFunction {
    name: String,
    description: String,
    parameters: serde_json::Value,
}

// --- Streaming SSE types ---

/// A single SSE `data: {...}` chunk from a streaming response.
#[derive(Debug, Deserialize)]
struct StreamResponse {
    #[serde(default)]
    choices: Vec<StreamChoice>,
    #[serde(default)]
    error: Option<StreamErrorBody>,
}

#[derive(Debug, Deserialize)]
struct StreamErrorBody {
    #[serde(default)]
    message: String,
}

#[derive(Debug, Deserialize)]
struct StreamChoice {
    #[serde(default)]
    delta: StreamDeltaBody,
}

#[derive(Debug, Default, Deserialize)]
struct StreamDeltaBody {
    #[serde(default)]
    content: Option<String>,
    /// DeepSeek
    #[serde(default)]
    reasoning_content: Option<String>,
    /// OpenRouter
    #[serde(default)]
    reasoning: Option<String>,
    #[serde(default)]
    tool_calls: Option<Vec<StreamToolCallDelta>>,
}

/// A tool call fragment: arrives incrementally across chunks.
#[derive(Debug, Deserialize)]
struct StreamToolCallDelta {
    #[serde(default)]
    index: usize,
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    function: Option<StreamFunctionDelta>,
}

#[derive(Debug, Deserialize)]
struct StreamFunctionDelta {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    arguments: Option<String>,
}

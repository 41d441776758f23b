//! Provider trait: the abstraction over chat-completion backends.
//!
//! A Provider sends the transcript to a model endpoint and hands back the
//! response as a stream of [`StreamDelta`] fragments. Reassembly of those
//! fragments happens in the agent crate, not here.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tokio::sync::mpsc;

use crate::error::ProviderError;
use crate::message::Message;

/// One streamed fragment of a model response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamDelta {
    /// Chain-of-thought text, shown to the user but never sent back.
    Reasoning(String),
    /// Visible assistant text.
    Content(String),
    /// A piece of the tool call at `index`. Every part is optional and is
    /// concatenated onto what earlier fragments for the same index carried.
    ToolCall {
        index: usize,
        id: Option<String>,
        name: Option<String>,
        arguments: Option<String>,
    },
}

/// A single request to the model endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderRequest {
    /// The model to use (e.g., "deepseek-reasoner", "anthropic/claude-sonnet-4")
    pub model: String,

    /// The full (compacted) transcript
    pub messages: Vec<Message>,

    /// Tools the model can call
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tools: Vec<ToolDefinition>,

    /// Maximum tokens to generate
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,

    /// Whether to stream the response
    #[serde(default)]
    pub stream: bool,

    /// Provider-specific HTTP headers
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub extra_headers: BTreeMap<String, String>,

    /// Provider-specific fields merged into the JSON body
    #[serde(default, skip_serializing_if = "serde_json::Map::is_empty")]
    pub extra_body: serde_json::Map<String, serde_json::Value>,
}

impl ProviderRequest {
    pub fn new(model: impl Into<String>, messages: Vec<Message>) -> Self {
        Self {
            model: model.into(),
            messages,
            tools: Vec::new(),
            max_tokens: None,
            stream: true,
            extra_headers: BTreeMap::new(),
            extra_body: serde_json::Map::new(),
        }
    }

    pub fn with_tools(mut self, tools: Vec<ToolDefinition>) -> Self {
        self.tools = tools;
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }
}

/// A tool definition sent to the model so it knows what tools it can call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolDefinition {
    /// The tool name
    pub name: String,

    /// Description of what the tool does
    pub description: String,

    /// JSON Schema describing the tool's parameters
    pub parameters: serde_json::Value,
}

/// Receiving half of a response stream.
pub type DeltaReceiver = mpsc::Receiver<Result<StreamDelta, ProviderError>>;

/// The core Provider trait.
///
/// The agent loop calls `stream()` without knowing which endpoint sits
/// behind it. An `Err` item on the receiver is a transport fault that ends
/// the current turn; a closed receiver marks the end of the response.
#[async_trait]
pub trait Provider: Send + Sync {
    /// A human-readable name for this provider (e.g., "deepseek", "openrouter").
    fn name(&self) -> &str;

    /// Send a request and get a stream of response fragments.
    async fn stream(&self, request: ProviderRequest) -> Result<DeltaReceiver, ProviderError>;
}

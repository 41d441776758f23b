//! Message domain types.
//!
//! A [`Message`] is one entry of the transcript exchanged with the model
//! endpoint. The variants mirror the chat-completion roles, and the
//! constructors enforce the wire rules for assistant turns.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};

/// Text substituted when the model produced neither text nor tool calls.
pub const FALLBACK_ASSISTANT_TEXT: &str = "Task completed.";

/// The role of a message sender in a conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// System instructions and injected file context
    System,
    /// The end user
    User,
    /// The model
    Assistant,
    /// Tool execution result
    Tool,
}

/// A single transcript entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "role", rename_all = "lowercase")]
pub enum Message {
    System {
        content: String,
    },
    User {
        content: String,
    },
    Assistant {
        /// `None` whenever `tool_calls` is non-empty.
        content: Option<String>,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        tool_calls: Vec<ToolCallRequest>,
    },
    Tool {
        tool_call_id: String,
        content: String,
    },
}

impl Message {
    /// Create a new system message.
    pub fn system(content: impl Into<String>) -> Self {
        Self::System {
            content: content.into(),
        }
    }

    /// Create a new user message.
    pub fn user(content: impl Into<String>) -> Self {
        Self::User {
            content: content.into(),
        }
    }

    /// Build the assistant entry for one completed model response.
    ///
    /// With tool calls the content is always `None`. Without tool calls,
    /// blank text is replaced by [`FALLBACK_ASSISTANT_TEXT`].
    pub fn assistant_turn(text: &str, tool_calls: Vec<ToolCallRequest>) -> Self {
        if !tool_calls.is_empty() {
            return Self::Assistant {
                content: None,
                tool_calls,
            };
        }

        let content = if text.trim().is_empty() {
            FALLBACK_ASSISTANT_TEXT.to_string()
        } else {
            text.to_string()
        };

        Self::Assistant {
            content: Some(content),
            tool_calls: Vec::new(),
        }
    }

    /// Create a tool result message.
    pub fn tool_result(tool_call_id: impl Into<String>, content: impl Into<String>) -> Self {
        Self::Tool {
            tool_call_id: tool_call_id.into(),
            content: content.into(),
        }
    }

    pub fn role(&self) -> Role {
        match self {
            Self::System { .. } => Role::System,
            Self::User { .. } => Role::User,
            Self::Assistant { .. } => Role::Assistant,
            Self::Tool { .. } => Role::Tool,
        }
    }

    /// The text content, if this entry carries any.
    pub fn content(&self) -> Option<&str> {
        match self {
            Self::System { content } | Self::User { content } | Self::Tool { content, .. } => {
                Some(content)
            }
            Self::Assistant { content, .. } => content.as_deref(),
        }
    }

    /// Tool calls declared by this entry (empty for non-assistant roles).
    pub fn tool_calls(&self) -> &[ToolCallRequest] {
        match self {
            Self::Assistant { tool_calls, .. } => tool_calls,
            _ => &[],
        }
    }

    pub fn is_system(&self) -> bool {
        matches!(self, Self::System { .. })
    }
}

/// A tool call requested by the model inside an assistant turn.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolCallRequest {
    /// Endpoint-assigned id, or a locally synthesized one
    pub id: String,

    /// Name of the tool to invoke
    pub name: String,

    /// Arguments as raw JSON text
    pub arguments: String,
}

impl ToolCallRequest {
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        arguments: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            arguments: arguments.into(),
        }
    }
}

static LAST_CALL_STAMP: AtomicU64 = AtomicU64::new(0);

/// Wall-clock milliseconds, bumped so that no two calls ever return the same value.
fn next_call_stamp() -> u64 {
    let now = u64::try_from(Utc::now().timestamp_millis()).unwrap_or(0);
    let mut prev = LAST_CALL_STAMP.load(Ordering::Relaxed);
    loop {
        let next = now.max(prev + 1);
        match LAST_CALL_STAMP.compare_exchange_weak(prev, next, Ordering::Relaxed, Ordering::Relaxed)
        {
            Ok(_) => return next,
            Err(actual) => prev = actual,
        }
    }
}

/// Synthesize an id for a tool call the endpoint left unnamed.
pub fn synthesize_call_id(index: usize) -> String {
    format!("call_{index}_{}", next_call_stamp())
}

//! Agent-level progress events.
//!
//! `AgentStreamEvent` lifts provider deltas and tool activity into events the
//! presentation layer can render as they happen. The loop never waits on a
//! slow consumer for correctness; events are informational only.

use serde::{Deserialize, Serialize};

use crate::loop_runner::LoopStatus;

/// Events emitted by the agent while it works through a turn.
///
/// - `iteration`: a new model request is about to be issued
/// - `reasoning`: chain-of-thought text from the model
/// - `chunk`: partial assistant text
/// - `tool_call`: the agent is invoking a tool
/// - `tool_result`: tool execution completed
/// - `notice`: something the user should know (limits, skipped batches)
/// - `done`: the turn is over
/// - `error`: the turn failed
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AgentStreamEvent {
    Iteration { number: u32 },

    Reasoning { content: String },

    Chunk { content: String },

    ToolCall {
        id: String,
        name: String,
        arguments: String,
    },

    ToolResult {
        id: String,
        name: String,
        output: String,
    },

    Notice { message: String },

    Done {
        status: LoopStatus,
        iterations: u32,
        requests: u32,
    },

    Error { message: String },
}

impl AgentStreamEvent {
    /// Wire name for this event type.
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::Iteration { .. } => "iteration",
            Self::Reasoning { .. } => "reasoning",
            Self::Chunk { .. } => "chunk",
            Self::ToolCall { .. } => "tool_call",
            Self::ToolResult { .. } => "tool_result",
            Self::Notice { .. } => "notice",
            Self::Done { .. } => "done",
            Self::Error { .. } => "error",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn event_serialization_chunk() {
        let event = AgentStreamEvent::Chunk {
            content: "Hello".into(),
        };
        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains(r#""type":"chunk""#));
        assert!(json.contains(r#""content":"Hello""#));
    }

    #[test]
    fn event_serialization_done() {
        let event = AgentStreamEvent::Done {
            status: LoopStatus::TrivialEditLimit,
            iterations: 3,
            requests: 3,
        };
        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains(r#""type":"done""#));
        assert!(json.contains(r#""status":"trivial_edit_limit""#));
        assert!(json.contains(r#""iterations":3"#));
    }

    #[test]
    fn event_type_matches_tag() {
        let events = [
            AgentStreamEvent::Iteration { number: 1 },
            AgentStreamEvent::Reasoning {
                content: "x".into(),
            },
            AgentStreamEvent::ToolCall {
                id: "a".into(),
                name: "read_file".into(),
                arguments: "{}".into(),
            },
            AgentStreamEvent::ToolResult {
                id: "a".into(),
                name: "read_file".into(),
                output: "ok".into(),
            },
            AgentStreamEvent::Notice {
                message: "x".into(),
            },
            AgentStreamEvent::Error {
                message: "boom".into(),
            },
        ];
        for event in events {
            let json: serde_json::Value = serde_json::to_value(&event).unwrap();
            assert_eq!(json["type"], event.event_type());
        }
    }

    #[test]
    fn event_deserialization() {
        let json = r#"{"type":"tool_result","id":"c1","name":"edit_file","output":"done"}"#;
        let event: AgentStreamEvent = serde_json::from_str(json).unwrap();
        match event {
            AgentStreamEvent::ToolResult { id, output, .. } => {
                assert_eq!(id, "c1");
                assert_eq!(output, "done");
            }
            _ => panic!("Wrong variant"),
        }
    }
}

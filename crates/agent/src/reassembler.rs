//! Stream reassembly.
//!
//! A model response arrives as a sequence of [`StreamDelta`] fragments.
//! Tool calls in particular are split across many fragments that share an
//! index; the accumulator concatenates them and, once the stream is over,
//! hands back whole [`ToolCallRequest`]s in index order.

use codewright_core::message::{ToolCallRequest, synthesize_call_id};
use codewright_core::provider::StreamDelta;
use std::collections::BTreeMap;
use tracing::debug;

#[derive(Debug, Default)]
struct PartialCall {
    id: String,
    name: String,
    arguments: String,
}

/// Accumulates the fragments of one model response.
#[derive(Debug, Default)]
pub struct StreamAccumulator {
    reasoning: String,
    content: String,
    calls: BTreeMap<usize, PartialCall>,
}

/// A fully reassembled model response.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AssembledResponse {
    pub reasoning: String,
    pub text: String,
    pub tool_calls: Vec<ToolCallRequest>,
}

impl StreamAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold one fragment into the response.
    pub fn push(&mut self, delta: StreamDelta) {
        match delta {
            StreamDelta::Reasoning(text) => self.reasoning.push_str(&text),
            StreamDelta::Content(text) => self.content.push_str(&text),
            StreamDelta::ToolCall {
                index,
                id,
                name,
                arguments,
            } => {
                let call = self.calls.entry(index).or_default();
                if let Some(id) = id {
                    call.id.push_str(&id);
                }
                if let Some(name) = name {
                    call.name.push_str(&name);
                }
                if let Some(arguments) = arguments {
                    call.arguments.push_str(&arguments);
                }
            }
        }
    }

    /// Close the response.
    ///
    /// Calls come out in index order. A slot that never received a name is
    /// dropped; a slot without an id gets a synthesized one.
    pub fn finish(self) -> AssembledResponse {
        let mut tool_calls = Vec::with_capacity(self.calls.len());
        for (index, call) in self.calls {
            if call.name.is_empty() {
                debug!(index, "Dropping tool call fragment without a name");
                continue;
            }
            let id = if call.id.is_empty() {
                synthesize_call_id(index)
            } else {
                call.id
            };
            tool_calls.push(ToolCallRequest::new(id, call.name, call.arguments));
        }

        AssembledResponse {
            reasoning: self.reasoning,
            text: self.content,
            tool_calls,
        }
    }
}

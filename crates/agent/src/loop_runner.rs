//! The recursive tool-call loop.

use codewright_core::message::Message;
use codewright_core::provider::{Provider, ProviderRequest, StreamDelta};
use codewright_core::tool::{ToolContext, ToolRegistry};
use codewright_core::transcript::Transcript;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::reassembler::{AssembledResponse, StreamAccumulator};
use crate::stream_event::AgentStreamEvent;
use crate::trivial::TrivialEditGuard;

/// How a turn ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LoopStatus {
    /// The model answered without calling tools.
    Completed,
    /// Too many consecutive formatting-only edit batches.
    TrivialEditLimit,
    /// The iteration cap was reached while the model kept calling tools.
    MaxIterations,
    /// The user interrupted between iterations.
    Cancelled,
    /// The endpoint failed mid-turn.
    Failed,
}

/// Result of one user turn.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoopOutcome {
    pub success: bool,
    pub error: Option<String>,
    pub status: LoopStatus,
    /// Iterations started (each issues one request).
    pub iterations: u32,
    /// Requests the endpoint accepted.
    pub requests: u32,
}

impl LoopOutcome {
    /// The turn stopped on a safety limit rather than a final answer.
    pub fn is_incomplete(&self) -> bool {
        matches!(
            self.status,
            LoopStatus::TrivialEditLimit | LoopStatus::MaxIterations
        )
    }
}

/// Drives one user turn through as many model requests as the model needs.
pub struct AgentLoop {
    /// The endpoint to talk to
    provider: Arc<dyn Provider>,

    /// The model to request
    model: String,

    /// Tools offered to the model
    tools: Arc<ToolRegistry>,

    /// Max tokens per response
    max_tokens: Option<u32>,

    /// Requests per user turn
    max_iterations: u32,

    /// Consecutive trivial batches before giving up
    trivial_edit_limit: u32,

    /// Progress sink for the presentation layer
    events: Option<mpsc::Sender<AgentStreamEvent>>,

    /// Set by the user to stop between iterations
    cancel: Arc<AtomicBool>,

    /// Whether reasoning deltas are forwarded as events
    show_reasoning: bool,
}

impl AgentLoop {
    pub fn new(provider: Arc<dyn Provider>, model: impl Into<String>, tools: Arc<ToolRegistry>) -> Self {
        Self {
            provider,
            model: model.into(),
            tools,
            max_tokens: None,
            max_iterations: 10,
            trivial_edit_limit: 3,
            events: None,
            cancel: Arc::new(AtomicBool::new(false)),
            show_reasoning: true,
        }
    }

    /// Set the maximum number of model requests per user turn.
    pub fn with_max_iterations(mut self, max: u32) -> Self {
        self.max_iterations = max;
        self
    }

    /// Set the max tokens per response.
    pub fn with_max_tokens(mut self, max: u32) -> Self {
        self.max_tokens = Some(max);
        self
    }

    pub fn with_trivial_edit_limit(mut self, limit: u32) -> Self {
        self.trivial_edit_limit = limit;
        self
    }

    /// Forward progress events to `events`.
    pub fn with_events(mut self, events: mpsc::Sender<AgentStreamEvent>) -> Self {
        self.events = Some(events);
        self
    }

    /// Share a cancellation flag with the caller.
    pub fn with_cancel_flag(mut self, cancel: Arc<AtomicBool>) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn with_reasoning(mut self, show: bool) -> Self {
        self.show_reasoning = show;
        self
    }

    async fn emit(&self, event: AgentStreamEvent) {
        if let Some(events) = &self.events
            && events.send(event).await.is_err()
        {
            debug!("Event receiver dropped");
        }
    }

    /// Run one user turn to completion.
    ///
    /// Appends the user message, then alternates model requests and tool
    /// batches until the model stops calling tools or a limit trips. The
    /// transcript is left well formed on every exit path: a failed stream
    /// appends nothing, and every appended tool call has its result.
    pub async fn run(&self, transcript: &mut Transcript, user_message: impl Into<String>) -> LoopOutcome {
        transcript.push(Message::user(user_message));
        transcript.compact();

        info!(
            session = %transcript.id,
            model = %self.model,
            entries = transcript.len(),
            "Processing user turn"
        );

        let definitions = self.tools.definitions();
        let mut guard = TrivialEditGuard::new(self.trivial_edit_limit);
        let mut iterations = 0;
        let mut requests = 0;

        while iterations < self.max_iterations {
            if self.cancel.load(Ordering::SeqCst) {
                info!(session = %transcript.id, iterations, "Turn cancelled by user");
                let outcome = LoopOutcome {
                    success: false,
                    error: Some("Interrupted by user".into()),
                    status: LoopStatus::Cancelled,
                    iterations,
                    requests,
                };
                return self.finish(outcome).await;
            }

            iterations += 1;
            debug!(session = %transcript.id, iteration = iterations, "Agent loop iteration");
            self.emit(AgentStreamEvent::Iteration { number: iterations }).await;

            let mut request = ProviderRequest::new(&self.model, transcript.entries().to_vec())
                .with_tools(definitions.clone());
            request.max_tokens = self.max_tokens;

            let response = match self.stream_response(request, &mut requests).await {
                Ok(response) => response,
                Err(message) => {
                    warn!(session = %transcript.id, iteration = iterations, error = %message, "Model request failed");
                    let outcome = LoopOutcome {
                        success: false,
                        error: Some(message),
                        status: LoopStatus::Failed,
                        iterations,
                        requests,
                    };
                    return self.finish(outcome).await;
                }
            };

            let calls = response.tool_calls.clone();
            transcript.push(Message::assistant_turn(&response.text, response.tool_calls));

            if calls.is_empty() {
                info!(session = %transcript.id, iterations, "Turn completed");
                let outcome = LoopOutcome {
                    success: true,
                    error: None,
                    status: LoopStatus::Completed,
                    iterations,
                    requests,
                };
                return self.finish(outcome).await;
            }

            if guard.observe(&calls) {
                let consecutive = guard.consecutive();
                warn!(
                    session = %transcript.id,
                    consecutive,
                    "Stopping after consecutive trivial edits"
                );
                let skipped = format!(
                    "Skipped: stopped after {consecutive} consecutive formatting-only edits"
                );
                for call in &calls {
                    transcript.push(Message::tool_result(&call.id, &skipped));
                }
                self.emit(AgentStreamEvent::Notice {
                    message: format!(
                        "Stopping after {consecutive} consecutive trivial edits to prevent an infinite loop"
                    ),
                })
                .await;
                let outcome = LoopOutcome {
                    success: true,
                    error: None,
                    status: LoopStatus::TrivialEditLimit,
                    iterations,
                    requests,
                };
                return self.finish(outcome).await;
            }

            debug!(tool_count = calls.len(), "Executing tool calls");
            let mut ctx = ToolContext::new(transcript.context_files());
            for call in &calls {
                self.emit(AgentStreamEvent::ToolCall {
                    id: call.id.clone(),
                    name: call.name.clone(),
                    arguments: call.arguments.clone(),
                })
                .await;

                let output = self.tools.execute(call, &mut ctx).await;
                transcript.push(Message::tool_result(&call.id, &output));

                self.emit(AgentStreamEvent::ToolResult {
                    id: call.id.clone(),
                    name: call.name.clone(),
                    output,
                })
                .await;
            }

            for (path, content) in ctx.take_loaded() {
                if transcript.add_context_file(&path, &content) {
                    debug!(path = %path, "Added file to context before edit");
                }
            }
        }

        warn!(
            session = %transcript.id,
            max_iterations = self.max_iterations,
            "Max iterations reached, task may be incomplete"
        );
        self.emit(AgentStreamEvent::Notice {
            message: format!(
                "Reached maximum iterations ({}). Task may be incomplete.",
                self.max_iterations
            ),
        })
        .await;
        let outcome = LoopOutcome {
            success: true,
            error: None,
            status: LoopStatus::MaxIterations,
            iterations,
            requests,
        };
        self.finish(outcome).await
    }

    /// Issue one request and reassemble its response.
    ///
    /// Deltas are forwarded as events while they arrive; the assembled
    /// response is only returned once the stream closed cleanly.
    async fn stream_response(
        &self,
        request: ProviderRequest,
        requests: &mut u32,
    ) -> Result<AssembledResponse, String> {
        let mut rx = self
            .provider
            .stream(request)
            .await
            .map_err(|e| e.to_string())?;
        *requests += 1;

        let mut accumulator = StreamAccumulator::new();
        while let Some(item) = rx.recv().await {
            let delta = item.map_err(|e| e.to_string())?;
            match &delta {
                StreamDelta::Reasoning(text) if self.show_reasoning => {
                    self.emit(AgentStreamEvent::Reasoning {
                        content: text.clone(),
                    })
                    .await;
                }
                StreamDelta::Content(text) => {
                    self.emit(AgentStreamEvent::Chunk {
                        content: text.clone(),
                    })
                    .await;
                }
                _ => {}
            }
            accumulator.push(delta);
        }

        Ok(accumulator.finish())
    }

    async fn finish(&self, outcome: LoopOutcome) -> LoopOutcome {
        if let Some(error) = &outcome.error {
            self.emit(AgentStreamEvent::Error {
                message: error.clone(),
            })
            .await;
        }
        self.emit(AgentStreamEvent::Done {
            status: outcome.status,
            iterations: outcome.iterations,
            requests: outcome.requests,
        })
        .await;
        outcome
    }
}

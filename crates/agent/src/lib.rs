//! The agent loop for Codewright.
//!
//! One user turn runs as a small state machine:
//!
//! 1. **Append** the user message and compact the transcript
//! 2. **Request** a streamed response with the full transcript and tool schemas
//! 3. **Reassemble** the streamed fragments into text and tool calls
//! 4. **If tool calls**: check for a trivial-edit loop, execute each call in
//!    order, append one result per call, go back to step 2
//! 5. **If text only**: append it and stop
//!
//! The loop also stops at the iteration cap, on a transport fault, or when
//! the user cancels between iterations.

pub mod context_loader;
pub mod loop_runner;
pub mod prompt;
pub mod reassembler;
pub mod session;
pub mod stream_event;
pub mod trivial;

#[cfg(test)]
mod test_helpers;

pub use context_loader::{AddError, AddReport, ContextLoader, SkipReason};
pub use loop_runner::{AgentLoop, LoopOutcome, LoopStatus};
pub use reassembler::{AssembledResponse, StreamAccumulator};
pub use session::Session;
pub use stream_event::AgentStreamEvent;
pub use trivial::{TrivialEditGuard, is_trivial_batch, is_trivial_edit};

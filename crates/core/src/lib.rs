//! # Codewright Core
//!
//! Domain types, traits, and error definitions for the Codewright coding agent.
//! This crate has **no HTTP or filesystem dependencies**; it defines the
//! domain model that all other crates implement against.
//!
//! ## Design Philosophy
//!
//! The model endpoint and the tools are traits here. Implementations live in
//! their respective crates, so the agent loop can be driven by scripted
//! providers in tests exactly as it is by the HTTP provider in production.

pub mod error;
pub mod message;
pub mod provider;
pub mod tool;
pub mod transcript;

// Re-export key types at crate root for ergonomics
pub use error::{ProviderError, ToolError};
pub use message::{FALLBACK_ASSISTANT_TEXT, Message, Role, ToolCallRequest, synthesize_call_id};
pub use provider::{DeltaReceiver, Provider, ProviderRequest, StreamDelta, ToolDefinition};
pub use tool::{Tool, ToolContext, ToolKind, ToolRegistry};
pub use transcript::{CompactionPolicy, SessionId, Transcript, file_marker};

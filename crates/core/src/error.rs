//! Error types for the Codewright domain.
//!
//! Uses `thiserror` for ergonomic error definitions.
//! Tool failures are data (they become result text in the transcript);
//! provider failures are faults that end the current turn.

use thiserror::Error;

/// Transport-level failures talking to the model endpoint.
#[derive(Debug, Clone, Error)]
pub enum ProviderError {
    #[error("API request failed: {message} (status: {status_code})")]
    ApiError {
        status_code: u16,
        message: String,
    },

    #[error("Rate limited by provider, retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("Model not found: {0}")]
    ModelNotFound(String),

    #[error("Stream interrupted: {0}")]
    StreamInterrupted(String),

    #[error("Provider not configured: {0}")]
    NotConfigured(String),

    #[error("Network error: {0}")]
    Network(String),
}

/// Failures inside a single tool call. Always rendered to text for the model.
#[derive(Debug, Error)]
pub enum ToolError {
    #[error("Invalid tool arguments: {0}")]
    InvalidArguments(String),

    #[error("Could not read file '{path}' for editing")]
    ContextLoadFailed { path: String },

    #[error("Original snippet not found in '{path}'")]
    SnippetNotFound { path: String },

    #[error("Ambiguous edit: {occurrences} matches in '{path}'")]
    AmbiguousEdit { path: String, occurrences: usize },

    #[error("File content exceeds {limit} byte size limit")]
    SizeLimitExceeded { limit: usize },

    #[error("Permission denied: {tool_name}: {reason}")]
    PermissionDenied { tool_name: String, reason: String },

    #[error("I/O error on '{path}': {reason}")]
    Io { path: String, reason: String },
}

impl ToolError {
    /// The result text the model sees for this failure.
    ///
    /// Edit outcomes the model is expected to react to are reported plainly;
    /// everything else names the tool that failed.
    pub fn render(&self, tool_name: &str) -> String {
        match self {
            Self::ContextLoadFailed { .. }
            | Self::SnippetNotFound { .. }
            | Self::AmbiguousEdit { .. } => format!("Error: {self}"),
            _ => format!("Error executing {tool_name}: {self}"),
        }
    }
}

//! Trivial-edit detection.
//!
//! Models sometimes get stuck re-applying formatting tweaks forever. The
//! guard classifies each batch of tool calls and counts consecutive batches
//! that only push whitespace around. This is a heuristic: a keyword hit in
//! a snippet marks the batch trivial even when the edit is substantive.

use codewright_core::message::ToolCallRequest;
use codewright_core::tool::{ToolKind, decode_arguments};
use tracing::debug;

/// Phrases that suggest an edit is about layout rather than behavior.
pub const TRIVIAL_KEYWORDS: [&str; 11] = [
    "blank line",
    "spacing",
    "whitespace",
    "indentation",
    "extra blank",
    "remove blank",
    "add blank",
    "pep 8",
    "two blank lines",
    "blank lines between",
    "trailing whitespace",
];

/// Whether replacing `original` with `new` looks like a formatting-only edit.
pub fn is_trivial_edit(original: &str, new: &str) -> bool {
    let original = original.to_lowercase();
    let new = new.to_lowercase();

    if !original.trim().is_empty() && !new.trim().is_empty() {
        let strip = |s: &str| s.split_whitespace().collect::<String>();
        if strip(&original) == strip(&new) {
            return true;
        }
    }

    let combined = format!("{original} {new}");
    TRIVIAL_KEYWORDS.iter().any(|keyword| combined.contains(keyword))
}

/// A batch is trivial when any of its `edit_file` calls is.
///
/// Other tools are ignored, as are edits whose arguments do not decode.
pub fn is_trivial_batch(calls: &[ToolCallRequest]) -> bool {
    calls
        .iter()
        .filter(|call| ToolKind::from_name(&call.name) == ToolKind::EditFile)
        .any(|call| {
            let Ok(arguments) = decode_arguments(&call.arguments) else {
                return false;
            };
            let field = |key: &str| arguments.get(key).and_then(|v| v.as_str()).unwrap_or("");
            is_trivial_edit(field("original_snippet"), field("new_snippet"))
        })
}

/// Counts consecutive trivial batches against a limit.
#[derive(Debug, Clone)]
pub struct TrivialEditGuard {
    limit: u32,
    consecutive: u32,
}

impl TrivialEditGuard {
    pub fn new(limit: u32) -> Self {
        Self {
            limit,
            consecutive: 0,
        }
    }

    /// Classify the next batch. Returns `true` once the limit is reached.
    pub fn observe(&mut self, calls: &[ToolCallRequest]) -> bool {
        if is_trivial_batch(calls) {
            self.consecutive += 1;
            debug!(consecutive = self.consecutive, limit = self.limit, "Trivial edit batch");
        } else {
            self.consecutive = 0;
        }
        self.consecutive >= self.limit
    }

    pub fn consecutive(&self) -> u32 {
        self.consecutive
    }
}

impl Default for TrivialEditGuard {
    fn default() -> Self {
        Self::new(3)
    }
}

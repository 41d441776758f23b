//! The transcript: the ordered conversation log sent to the model endpoint.
//!
//! Insertion order is causal order is wire order. The only operation that
//! removes entries is [`Transcript::compact`], and it never removes system
//! entries.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use tracing::debug;
use uuid::Uuid;

use crate::message::Message;

const FILE_MARKER_PREFIX: &str = "Content of file '";

/// The header that introduces a file's content anywhere in the transcript.
pub fn file_marker(path: &str) -> String {
    format!("{FILE_MARKER_PREFIX}{path}'")
}

/// Unique identifier for a session's transcript.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId(pub String);

impl SessionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// When and how far the transcript is trimmed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompactionPolicy {
    /// Compaction is a no-op while the entry count is at or below this.
    pub threshold: usize,
    /// How many of the most recent non-system entries survive.
    pub keep_recent: usize,
}

impl Default for CompactionPolicy {
    fn default() -> Self {
        Self {
            threshold: 20,
            keep_recent: 15,
        }
    }
}

/// An ordered, append-only (except for compaction) conversation log.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transcript {
    pub id: SessionId,
    entries: Vec<Message>,
    policy: CompactionPolicy,
}

impl Transcript {
    /// Start a transcript seeded with the system prompt.
    pub fn new(system_prompt: impl Into<String>) -> Self {
        Self {
            id: SessionId::new(),
            entries: vec![Message::system(system_prompt)],
            policy: CompactionPolicy::default(),
        }
    }

    pub fn with_policy(mut self, policy: CompactionPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Append an entry.
    pub fn push(&mut self, message: Message) {
        self.entries.push(message);
    }

    pub fn entries(&self) -> &[Message] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn last(&self) -> Option<&Message> {
        self.entries.last()
    }

    /// Whether some entry already carries the content of `path`.
    pub fn holds_file(&self, path: &str) -> bool {
        let marker = file_marker(path);
        self.entries
            .iter()
            .filter_map(Message::content)
            .any(|content| content.contains(&marker))
    }

    /// Every path whose content appears somewhere in the transcript.
    pub fn context_files(&self) -> HashSet<String> {
        let mut files = HashSet::new();
        for content in self.entries.iter().filter_map(Message::content) {
            let mut rest = content;
            while let Some(pos) = rest.find(FILE_MARKER_PREFIX) {
                let after = &rest[pos + FILE_MARKER_PREFIX.len()..];
                let Some(end) = after.find('\'') else {
                    break;
                };
                files.insert(after[..end].to_string());
                rest = &after[end + 1..];
            }
        }
        files
    }

    /// Inject a file's content as a system entry.
    ///
    /// Returns `false` (and appends nothing) when the file is already present.
    pub fn add_context_file(&mut self, path: &str, content: &str) -> bool {
        if self.holds_file(path) {
            return false;
        }
        self.push(Message::system(format!("{}:\n\n{content}", file_marker(path))));
        true
    }

    /// Trim older non-system entries once the transcript grows past the policy threshold.
    ///
    /// The retained window never begins on a tool result: it is widened
    /// backwards to the assistant entry that declared the call. Returns the
    /// number of entries removed.
    pub fn compact(&mut self) -> usize {
        if self.entries.len() <= self.policy.threshold {
            return 0;
        }

        let before = self.entries.len();
        let (system, others): (Vec<Message>, Vec<Message>) =
            std::mem::take(&mut self.entries)
                .into_iter()
                .partition(Message::is_system);

        let mut start = others.len().saturating_sub(self.policy.keep_recent);
        while start > 0 && others.get(start).is_some_and(|m| matches!(m, Message::Tool { .. })) {
            start -= 1;
        }

        self.entries = system;
        self.entries.extend(others.into_iter().skip(start));

        let removed = before - self.entries.len();
        if removed > 0 {
            debug!(
                session = %self.id,
                removed,
                retained = self.entries.len(),
                "Compacted transcript"
            );
        }
        removed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::{Role, ToolCallRequest};

    fn call(id: &str) -> ToolCallRequest {
        ToolCallRequest::new(id, "read_file", r#"{"file_path":"a.py"}"#)
    }

    #[test]
    fn new_transcript_has_leading_system_entry() {
        let t = Transcript::new("You are helpful");
        assert_eq!(t.len(), 1);
        assert_eq!(t.entries()[0].role(), Role::System);
    }

    #[test]
    fn compaction_is_noop_at_threshold() {
        let mut t = Transcript::new("sys");
        for i in 0..19 {
            t.push(Message::user(format!("m{i}")));
        }
        assert_eq!(t.len(), 20);
        assert_eq!(t.compact(), 0);
        assert_eq!(t.len(), 20);
    }

    #[test]
    fn compaction_with_empty_window_keeps_only_system_entries() {
        let mut t = Transcript::new("sys").with_policy(CompactionPolicy {
            threshold: 2,
            keep_recent: 0,
        });
        for i in 0..4 {
            t.push(Message::user(format!("m{i}")));
        }
        assert_eq!(t.compact(), 4);
        assert_eq!(t.entries(), &[Message::system("sys")]);
    }

    #[test]
    fn compaction_keeps_system_and_recent_entries() {
        let mut t = Transcript::new("sys");
        for i in 0..25 {
            t.push(Message::user(format!("m{i}")));
        }
        t.compact();
        assert_eq!(t.len(), 16);
        assert_eq!(t.entries()[0], Message::system("sys"));
        assert_eq!(t.entries()[1].content(), Some("m10"));
        assert_eq!(t.last().and_then(Message::content), Some("m24"));
    }

    #[test]
    fn compaction_moves_injected_system_entries_first() {
        let mut t = Transcript::new("sys");
        for i in 0..12 {
            t.push(Message::user(format!("m{i}")));
        }
        t.add_context_file("/p/a.py", "print(1)");
        for i in 12..24 {
            t.push(Message::user(format!("m{i}")));
        }
        t.compact();
        assert!(t.entries()[0].content() == Some("sys"));
        assert!(t.entries()[1].is_system());
        assert!(t.holds_file("/p/a.py"));
        assert!(t.entries()[2..].iter().all(|m| !m.is_system()));
    }

    #[test]
    fn compaction_never_orphans_tool_results() {
        // 1 system + 29 non-system = 30 entries. The assistant with two
        // calls sits so that the naive 15-entry window starts on its
        // second tool result.
        let mut t = Transcript::new("sys");
        for i in 0..13 {
            t.push(Message::user(format!("m{i}")));
        }
        t.push(Message::assistant_turn("", vec![call("a"), call("b")]));
        t.push(Message::tool_result("a", "ra"));
        t.push(Message::tool_result("b", "rb"));
        for i in 0..13 {
            t.push(Message::user(format!("n{i}")));
        }
        assert_eq!(t.len(), 30);

        t.compact();

        let first_kept = &t.entries()[1];
        assert_eq!(first_kept.role(), Role::Assistant);
        assert_eq!(first_kept.tool_calls().len(), 2);
        assert_eq!(t.len(), 1 + 16);
    }

    #[test]
    fn late_assistant_with_results_survives_compaction() {
        let mut t = Transcript::new("sys");
        for i in 1..25 {
            t.push(Message::user(format!("m{i}")));
        }
        t.push(Message::assistant_turn("", vec![call("x"), call("y")]));
        t.push(Message::tool_result("x", "rx"));
        t.push(Message::tool_result("y", "ry"));
        t.push(Message::user("m28"));
        t.push(Message::user("m29"));
        assert_eq!(t.len(), 30);

        t.compact();

        let pos = t
            .entries()
            .iter()
            .position(|m| m.tool_calls().len() == 2)
            .expect("assistant retained");
        assert!(matches!(&t.entries()[pos + 1], Message::Tool { tool_call_id, .. } if tool_call_id == "x"));
        assert!(matches!(&t.entries()[pos + 2], Message::Tool { tool_call_id, .. } if tool_call_id == "y"));
    }

    #[test]
    fn compacted_window_has_no_tool_before_its_assistant() {
        let mut t = Transcript::new("sys");
        for round in 0..8 {
            t.push(Message::user(format!("u{round}")));
            let ids: Vec<String> = (0..3).map(|k| format!("c{round}_{k}")).collect();
            t.push(Message::assistant_turn(
                "",
                ids.iter().map(|id| call(id)).collect(),
            ));
            for id in &ids {
                t.push(Message::tool_result(id.clone(), "ok"));
            }
        }
        t.compact();

        let mut declared: HashSet<String> = HashSet::new();
        for m in t.entries() {
            match m {
                Message::Assistant { tool_calls, .. } => {
                    declared.extend(tool_calls.iter().map(|c| c.id.clone()));
                }
                Message::Tool { tool_call_id, .. } => {
                    assert!(declared.contains(tool_call_id), "orphaned {tool_call_id}");
                }
                _ => {}
            }
        }
    }

    #[test]
    fn add_context_file_deduplicates() {
        let mut t = Transcript::new("sys");
        assert!(t.add_context_file("/w/main.py", "x = 1"));
        assert!(!t.add_context_file("/w/main.py", "x = 1"));
        assert_eq!(t.len(), 2);
    }

    #[test]
    fn context_files_found_in_tool_results() {
        let mut t = Transcript::new("sys");
        t.push(Message::tool_result(
            "c1",
            "Content of file '/w/a.py':\n\nx = 1\n\nContent of file '/w/b.py':\n\ny = 2",
        ));
        let files = t.context_files();
        assert!(files.contains("/w/a.py"));
        assert!(files.contains("/w/b.py"));
        assert!(t.holds_file("/w/b.py"));
        assert!(!t.holds_file("/w/c.py"));
    }
}

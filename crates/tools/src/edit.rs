//! Snippet edits: the `edit_file` tool.
//!
//! An edit names an exact snippet and its replacement. It applies only when
//! the snippet occurs exactly once; otherwise the file is left untouched.

use async_trait::async_trait;
use codewright_core::error::ToolError;
use codewright_core::tool::{Tool, ToolContext, ToolKind, required_str};
use std::sync::Arc;
use tracing::{debug, info};

use crate::Workspace;
use crate::lint::LintStage;

/// Why a snippet replacement could not be applied.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EditError {
    #[error("Original snippet not found")]
    NotFound,

    #[error("Ambiguous edit: {0} matches")]
    Ambiguous(usize),
}

/// Replace the single occurrence of `original` in `content` with `new`.
pub fn apply_snippet_edit(content: &str, original: &str, new: &str) -> Result<String, EditError> {
    match content.matches(original).count() {
        0 => Err(EditError::NotFound),
        1 => Ok(content.replacen(original, new, 1)),
        n => Err(EditError::Ambiguous(n)),
    }
}

pub struct EditFileTool {
    workspace: Arc<Workspace>,
}

impl EditFileTool {
    pub fn new(workspace: Arc<Workspace>) -> Self {
        Self { workspace }
    }
}

#[async_trait]
impl Tool for EditFileTool {
    fn kind(&self) -> ToolKind {
        ToolKind::EditFile
    }

    fn description(&self) -> &str {
        "Edit an existing file by replacing a specific snippet with new content"
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "file_path": {
                    "type": "string",
                    "description": "The path to the file to edit"
                },
                "original_snippet": {
                    "type": "string",
                    "description": "The exact text snippet to find and replace"
                },
                "new_snippet": {
                    "type": "string",
                    "description": "The new text to replace the original snippet with"
                }
            },
            "required": ["file_path", "original_snippet", "new_snippet"]
        })
    }

    async fn execute(
        &self,
        arguments: serde_json::Value,
        ctx: &mut ToolContext,
    ) -> Result<String, ToolError> {
        let raw = required_str(&arguments, "file_path")?;
        let original = required_str(&arguments, "original_snippet")?;
        let new = required_str(&arguments, "new_snippet")?;

        let context_failure = || ToolError::ContextLoadFailed { path: raw.to_string() };
        let path = self
            .workspace
            .resolve(raw, &self.kind())
            .map_err(|_| context_failure())?;
        let display = path.display().to_string();

        // The model must have seen the file before editing it.
        let content = self
            .workspace
            .read_text(&path)
            .await
            .map_err(|_| context_failure())?;
        if !ctx.holds_file(&display) {
            debug!(path = %path.display(), "Loading file into context before edit");
            ctx.load_file(&display, content.clone());
        }

        let updated = apply_snippet_edit(&content, original, new).map_err(|e| match e {
            EditError::NotFound => ToolError::SnippetNotFound {
                path: display.clone(),
            },
            EditError::Ambiguous(occurrences) => ToolError::AmbiguousEdit {
                path: display.clone(),
                occurrences,
            },
        })?;

        self.workspace.write_text(&path, &updated).await?;
        info!(path = %path.display(), "Applied snippet edit");

        let lint = self.workspace.lint_suffix(&path, LintStage::Edited).await;
        Ok(format!("Successfully edited file '{display}'{lint}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lint::Linter;
    use std::collections::HashSet;

    fn tool(root: &std::path::Path) -> EditFileTool {
        EditFileTool::new(Arc::new(Workspace::new(root).with_linter(Linter::disabled())))
    }

    fn args(path: &str, original: &str, new: &str) -> serde_json::Value {
        serde_json::json!({
            "file_path": path,
            "original_snippet": original,
            "new_snippet": new,
        })
    }

    #[test]
    fn single_occurrence_replaced() {
        let out = apply_snippet_edit("def f():\n    pass\n", "    pass", "    return 1").unwrap();
        assert_eq!(out, "def f():\n    return 1\n");
    }

    #[test]
    fn zero_and_many_occurrences_rejected() {
        assert_eq!(apply_snippet_edit("abc", "xyz", "q"), Err(EditError::NotFound));
        assert_eq!(apply_snippet_edit("x x x", "x", "y"), Err(EditError::Ambiguous(3)));
    }

    #[tokio::test]
    async fn edit_applies_and_loads_context() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().canonicalize().unwrap();
        let file = root.join("foo.py");
        std::fs::write(&file, "def f():\n    pass\n").unwrap();

        let mut ctx = ToolContext::default();
        let out = tool(&root)
            .execute(
                args("foo.py", "def f():\n    pass", "def f():\n    return 1"),
                &mut ctx,
            )
            .await
            .unwrap();

        assert_eq!(out, format!("Successfully edited file '{}'", file.display()));
        assert_eq!(std::fs::read_to_string(&file).unwrap(), "def f():\n    return 1\n");

        let loaded = ctx.take_loaded();
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded[0].0, file.display().to_string());
        assert_eq!(loaded[0].1, "def f():\n    pass\n");
    }

    #[tokio::test]
    async fn known_file_not_reloaded() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().canonicalize().unwrap();
        let file = root.join("foo.py");
        std::fs::write(&file, "a = 1\n").unwrap();

        let mut ctx = ToolContext::new(HashSet::from([file.display().to_string()]));
        tool(&root)
            .execute(args("foo.py", "a = 1", "a = 2"), &mut ctx)
            .await
            .unwrap();
        assert!(ctx.take_loaded().is_empty());
    }

    #[tokio::test]
    async fn not_found_leaves_file_untouched() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("foo.py");
        std::fs::write(&file, "a = 1\n").unwrap();

        let mut ctx = ToolContext::default();
        let err = tool(dir.path())
            .execute(args("foo.py", "b = 1", "b = 2"), &mut ctx)
            .await
            .unwrap_err();
        assert!(matches!(err, ToolError::SnippetNotFound { .. }));
        assert_eq!(std::fs::read_to_string(&file).unwrap(), "a = 1\n");
    }

    #[tokio::test]
    async fn ambiguous_leaves_file_byte_identical() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("dup.py");
        let original = "x = 0\nx = 0\r\n\tx = 0 \n";
        std::fs::write(&file, original).unwrap();

        let mut ctx = ToolContext::default();
        let err = tool(dir.path())
            .execute(args("dup.py", "x = 0", "x = 1"), &mut ctx)
            .await
            .unwrap_err();

        match &err {
            ToolError::AmbiguousEdit { occurrences, .. } => assert_eq!(*occurrences, 3),
            other => panic!("expected ambiguous edit, got {other:?}"),
        }
        assert!(err.render("edit_file").contains("3 matches"));
        assert_eq!(std::fs::read(&file).unwrap(), original.as_bytes());
    }

    #[tokio::test]
    async fn unreadable_file_is_context_failure() {
        let dir = tempfile::tempdir().unwrap();
        let mut ctx = ToolContext::default();
        let err = tool(dir.path())
            .execute(args("ghost.py", "a", "b"), &mut ctx)
            .await
            .unwrap_err();
        assert_eq!(
            err.render("edit_file"),
            "Error: Could not read file 'ghost.py' for editing"
        );
    }
}

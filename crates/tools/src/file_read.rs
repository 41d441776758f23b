//! File read tools: `read_file` and `read_multiple_files`.

use async_trait::async_trait;
use codewright_core::error::ToolError;
use codewright_core::tool::{Tool, ToolContext, ToolKind, required_str};
use codewright_core::transcript::file_marker;
use std::sync::Arc;

use crate::Workspace;
use crate::lint::LintStage;

const SEPARATOR_WIDTH: usize = 50;

pub struct ReadFileTool {
    workspace: Arc<Workspace>,
}

impl ReadFileTool {
    pub fn new(workspace: Arc<Workspace>) -> Self {
        Self { workspace }
    }
}

#[async_trait]
impl Tool for ReadFileTool {
    fn kind(&self) -> ToolKind {
        ToolKind::ReadFile
    }

    fn description(&self) -> &str {
        "Read the content of a single file from the filesystem"
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "file_path": {
                    "type": "string",
                    "description": "The path to the file to read (relative or absolute)"
                }
            },
            "required": ["file_path"]
        })
    }

    async fn execute(
        &self,
        arguments: serde_json::Value,
        ctx: &mut ToolContext,
    ) -> Result<String, ToolError> {
        let raw = required_str(&arguments, "file_path")?;
        let path = self.workspace.resolve(raw, &self.kind())?;
        let content = self.workspace.read_text(&path).await?;
        let display = path.display().to_string();
        ctx.note_file(&display);

        let lint = self.workspace.lint_suffix(&path, LintStage::Read).await;
        Ok(format!("{}:\n\n{content}{lint}", file_marker(&display)))
    }
}

pub struct ReadMultipleFilesTool {
    workspace: Arc<Workspace>,
}

impl ReadMultipleFilesTool {
    pub fn new(workspace: Arc<Workspace>) -> Self {
        Self { workspace }
    }

    async fn read_one(&self, raw: &str, ctx: &mut ToolContext) -> Result<String, ToolError> {
        let path = self.workspace.resolve(raw, &self.kind())?;
        let content = self.workspace.read_text(&path).await?;
        let display = path.display().to_string();
        ctx.note_file(&display);

        let lint = self.workspace.lint_suffix(&path, LintStage::Read).await;
        Ok(format!("{}:\n\n{content}{lint}", file_marker(&display)))
    }
}

#[async_trait]
impl Tool for ReadMultipleFilesTool {
    fn kind(&self) -> ToolKind {
        ToolKind::ReadMultipleFiles
    }

    fn description(&self) -> &str {
        "Read the content of multiple files from the filesystem"
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "file_paths": {
                    "type": "array",
                    "items": { "type": "string" },
                    "description": "Array of file paths to read (relative or absolute)"
                }
            },
            "required": ["file_paths"]
        })
    }

    async fn execute(
        &self,
        arguments: serde_json::Value,
        ctx: &mut ToolContext,
    ) -> Result<String, ToolError> {
        let paths = arguments
            .get("file_paths")
            .and_then(|v| v.as_array())
            .ok_or_else(|| ToolError::InvalidArguments("missing array field 'file_paths'".into()))?;

        let mut sections = Vec::with_capacity(paths.len());
        for entry in paths {
            let Some(raw) = entry.as_str() else {
                sections.push(format!("Error reading '{entry}': path must be a string"));
                continue;
            };
            match self.read_one(raw, ctx).await {
                Ok(section) => sections.push(section),
                Err(e) => sections.push(format!("Error reading '{raw}': {e}")),
            }
        }

        let separator = format!("\n\n{}\n\n", "=".repeat(SEPARATOR_WIDTH));
        Ok(sections.join(&separator))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lint::Linter;

    fn workspace(root: &std::path::Path) -> Arc<Workspace> {
        Arc::new(Workspace::new(root).with_linter(Linter::disabled()))
    }

    #[test]
    fn tool_definition() {
        let tool = ReadFileTool::new(workspace(std::path::Path::new("/tmp")));
        assert_eq!(tool.kind().name(), "read_file");
        let schema = tool.parameters_schema();
        assert_eq!(schema["required"], serde_json::json!(["file_path"]));
    }

    #[tokio::test]
    async fn read_existing_file() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().canonicalize().unwrap();
        std::fs::write(root.join("foo.py"), "def f():\n    pass\n").unwrap();

        let tool = ReadFileTool::new(workspace(&root));
        let mut ctx = ToolContext::default();
        let out = tool
            .execute(serde_json::json!({"file_path": "foo.py"}), &mut ctx)
            .await
            .unwrap();

        let expected_path = root.join("foo.py").display().to_string();
        assert_eq!(
            out,
            format!("Content of file '{expected_path}':\n\ndef f():\n    pass\n")
        );
        assert!(ctx.holds_file(&expected_path));
        assert!(ctx.take_loaded().is_empty());
    }

    #[tokio::test]
    async fn read_nonexistent_file() {
        let dir = tempfile::tempdir().unwrap();
        let tool = ReadFileTool::new(workspace(dir.path()));
        let mut ctx = ToolContext::default();
        let err = tool
            .execute(serde_json::json!({"file_path": "nope.py"}), &mut ctx)
            .await
            .unwrap_err();
        assert!(matches!(err, ToolError::Io { .. }));
    }

    #[tokio::test]
    async fn traversal_refused() {
        let dir = tempfile::tempdir().unwrap();
        let tool = ReadFileTool::new(workspace(dir.path()));
        let mut ctx = ToolContext::default();
        let err = tool
            .execute(serde_json::json!({"file_path": "../etc/passwd"}), &mut ctx)
            .await
            .unwrap_err();
        assert!(matches!(err, ToolError::PermissionDenied { .. }));
    }

    #[tokio::test]
    async fn read_many_reports_errors_per_file() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().canonicalize().unwrap();
        std::fs::write(root.join("a.txt"), "alpha").unwrap();
        std::fs::write(root.join("b.txt"), "beta").unwrap();

        let tool = ReadMultipleFilesTool::new(workspace(&root));
        let mut ctx = ToolContext::default();
        let out = tool
            .execute(
                serde_json::json!({"file_paths": ["a.txt", "missing.txt", "b.txt"]}),
                &mut ctx,
            )
            .await
            .unwrap();

        let sections: Vec<&str> = out.split(&format!("\n\n{}\n\n", "=".repeat(50))).collect();
        assert_eq!(sections.len(), 3);
        assert!(sections[0].ends_with("alpha"));
        assert!(sections[1].starts_with("Error reading 'missing.txt'"));
        assert!(sections[2].ends_with("beta"));
        assert!(ctx.holds_file(&root.join("b.txt").display().to_string()));
    }

    #[tokio::test]
    async fn read_many_requires_array() {
        let tool = ReadMultipleFilesTool::new(workspace(std::path::Path::new("/tmp")));
        let mut ctx = ToolContext::default();
        let err = tool
            .execute(serde_json::json!({"file_paths": "a.txt"}), &mut ctx)
            .await
            .unwrap_err();
        assert!(matches!(err, ToolError::InvalidArguments(_)));
    }
}

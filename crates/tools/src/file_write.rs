//! File creation tools: `create_file` and `create_multiple_files`.

use async_trait::async_trait;
use codewright_core::error::ToolError;
use codewright_core::tool::{Tool, ToolContext, ToolKind, required_str};
use serde::Deserialize;
use std::sync::Arc;
use tracing::info;

use crate::Workspace;
use crate::lint::LintStage;

pub struct CreateFileTool {
    workspace: Arc<Workspace>,
}

impl CreateFileTool {
    pub fn new(workspace: Arc<Workspace>) -> Self {
        Self { workspace }
    }
}

#[async_trait]
impl Tool for CreateFileTool {
    fn kind(&self) -> ToolKind {
        ToolKind::CreateFile
    }

    fn description(&self) -> &str {
        "Create a new file or overwrite an existing file with the provided content"
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "file_path": {
                    "type": "string",
                    "description": "The path where the file should be created"
                },
                "content": {
                    "type": "string",
                    "description": "The content to write to the file"
                }
            },
            "required": ["file_path", "content"]
        })
    }

    async fn execute(
        &self,
        arguments: serde_json::Value,
        _ctx: &mut ToolContext,
    ) -> Result<String, ToolError> {
        let raw = required_str(&arguments, "file_path")?;
        let content = required_str(&arguments, "content")?;

        let path = self.workspace.resolve(raw, &self.kind())?;
        self.workspace.write_text(&path, content).await?;
        info!(path = %path.display(), bytes = content.len(), "Created file");

        let lint = self.workspace.lint_suffix(&path, LintStage::Created).await;
        Ok(format!("Successfully created file '{}'{lint}", path.display()))
    }
}

#[derive(Debug, Deserialize)]
struct FileSpec {
    path: String,
    content: String,
}

pub struct CreateMultipleFilesTool {
    workspace: Arc<Workspace>,
}

impl CreateMultipleFilesTool {
    pub fn new(workspace: Arc<Workspace>) -> Self {
        Self { workspace }
    }
}

#[async_trait]
impl Tool for CreateMultipleFilesTool {
    fn kind(&self) -> ToolKind {
        ToolKind::CreateMultipleFiles
    }

    fn description(&self) -> &str {
        "Create multiple files at once"
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "files": {
                    "type": "array",
                    "items": {
                        "type": "object",
                        "properties": {
                            "path": { "type": "string" },
                            "content": { "type": "string" }
                        },
                        "required": ["path", "content"]
                    },
                    "description": "Array of files to create with their paths and content"
                }
            },
            "required": ["files"]
        })
    }

    async fn execute(
        &self,
        arguments: serde_json::Value,
        _ctx: &mut ToolContext,
    ) -> Result<String, ToolError> {
        let files_value = arguments
            .get("files")
            .cloned()
            .ok_or_else(|| ToolError::InvalidArguments("missing array field 'files'".into()))?;
        let files: Vec<FileSpec> = serde_json::from_value(files_value)
            .map_err(|e| ToolError::InvalidArguments(format!("invalid 'files': {e}")))?;

        // Validate every entry before writing anything.
        let mut planned = Vec::with_capacity(files.len());
        for file in &files {
            let path = self.workspace.resolve(&file.path, &self.kind())?;
            if file.content.len() > self.workspace.max_file_size() {
                return Err(ToolError::SizeLimitExceeded {
                    limit: self.workspace.max_file_size(),
                });
            }
            planned.push((path, file.content.as_str()));
        }

        for (path, content) in &planned {
            self.workspace.write_text(path, content).await?;
        }

        let created: Vec<String> = planned
            .iter()
            .map(|(path, _)| path.display().to_string())
            .collect();
        info!(count = created.len(), "Created files");
        Ok(format!(
            "Successfully created {} files: {}",
            created.len(),
            created.join(", ")
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lint::Linter;

    fn workspace(root: &std::path::Path) -> Arc<Workspace> {
        Arc::new(Workspace::new(root).with_linter(Linter::disabled()))
    }

    #[tokio::test]
    async fn create_and_verify() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().canonicalize().unwrap();
        let tool = CreateFileTool::new(workspace(&root));
        let mut ctx = ToolContext::default();

        let out = tool
            .execute(
                serde_json::json!({"file_path": "pkg/mod.py", "content": "x = 1\n"}),
                &mut ctx,
            )
            .await
            .unwrap();

        let path = root.join("pkg").join("mod.py");
        assert_eq!(out, format!("Successfully created file '{}'", path.display()));
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "x = 1\n");
    }

    #[tokio::test]
    async fn overwrite_existing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("overwrite.txt");
        std::fs::write(&path, "old content").unwrap();

        let tool = CreateFileTool::new(workspace(dir.path()));
        let mut ctx = ToolContext::default();
        tool.execute(
            serde_json::json!({"file_path": "overwrite.txt", "content": "new content"}),
            &mut ctx,
        )
        .await
        .unwrap();

        assert_eq!(std::fs::read_to_string(&path).unwrap(), "new content");
    }

    #[tokio::test]
    async fn oversized_content_refused() {
        let dir = tempfile::tempdir().unwrap();
        let ws = Arc::new(
            Workspace::new(dir.path())
                .with_linter(Linter::disabled())
                .with_max_file_size(8),
        );
        let tool = CreateFileTool::new(ws);
        let mut ctx = ToolContext::default();
        let err = tool
            .execute(
                serde_json::json!({"file_path": "big.txt", "content": "0123456789"}),
                &mut ctx,
            )
            .await
            .unwrap_err();
        assert!(matches!(err, ToolError::SizeLimitExceeded { limit: 8 }));
        assert!(!dir.path().join("big.txt").exists());
    }

    #[tokio::test]
    async fn home_reference_refused() {
        let dir = tempfile::tempdir().unwrap();
        let tool = CreateFileTool::new(workspace(dir.path()));
        let mut ctx = ToolContext::default();
        let err = tool
            .execute(
                serde_json::json!({"file_path": "~/.bashrc", "content": "evil"}),
                &mut ctx,
            )
            .await
            .unwrap_err();
        assert!(matches!(err, ToolError::PermissionDenied { .. }));
    }

    #[tokio::test]
    async fn create_many_lists_paths() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().canonicalize().unwrap();
        let tool = CreateMultipleFilesTool::new(workspace(&root));
        let mut ctx = ToolContext::default();

        let out = tool
            .execute(
                serde_json::json!({"files": [
                    {"path": "a.txt", "content": "A"},
                    {"path": "sub/b.txt", "content": "B"}
                ]}),
                &mut ctx,
            )
            .await
            .unwrap();

        assert_eq!(
            out,
            format!(
                "Successfully created 2 files: {}, {}",
                root.join("a.txt").display(),
                root.join("sub").join("b.txt").display()
            )
        );
        assert_eq!(std::fs::read_to_string(root.join("sub/b.txt")).unwrap(), "B");
    }

    #[tokio::test]
    async fn create_many_writes_nothing_on_bad_entry() {
        let dir = tempfile::tempdir().unwrap();
        let tool = CreateMultipleFilesTool::new(workspace(dir.path()));
        let mut ctx = ToolContext::default();

        let err = tool
            .execute(
                serde_json::json!({"files": [
                    {"path": "ok.txt", "content": "fine"},
                    {"path": "../escape.txt", "content": "bad"}
                ]}),
                &mut ctx,
            )
            .await
            .unwrap_err();

        assert!(matches!(err, ToolError::PermissionDenied { .. }));
        assert!(!dir.path().join("ok.txt").exists());
    }
}

//! Built-in file tools for Codewright.
//!
//! Five tools give the agent access to the workspace: read one or many
//! files, create one or many files, and replace a snippet inside a file.
//! Every path is normalized against the workspace root, and touched source
//! files get lint diagnostics appended to the result when a linter is
//! available.

pub mod edit;
pub mod file_read;
pub mod file_write;
pub mod lint;
pub mod path;

use codewright_core::error::ToolError;
use codewright_core::tool::{ToolKind, ToolRegistry};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

pub use edit::{EditError, apply_snippet_edit};
pub use lint::{LintStage, Linter};
pub use path::{PathError, normalize_path};

/// Default ceiling on file content handled by the tools (5 MB).
pub const DEFAULT_MAX_FILE_SIZE: usize = 5_000_000;

/// Shared settings for the file tools.
#[derive(Debug, Clone)]
pub struct Workspace {
    root: PathBuf,
    max_file_size: usize,
    linter: Linter,
}

impl Workspace {
    /// A workspace rooted at `root` with default limits and linting enabled.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            max_file_size: DEFAULT_MAX_FILE_SIZE,
            linter: Linter::new(Duration::from_secs(10)),
        }
    }

    pub fn with_max_file_size(mut self, bytes: usize) -> Self {
        self.max_file_size = bytes;
        self
    }

    pub fn with_linter(mut self, linter: Linter) -> Self {
        self.linter = linter;
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn max_file_size(&self) -> usize {
        self.max_file_size
    }

    /// Normalize a tool-supplied path.
    pub fn resolve(&self, raw: &str, tool: &ToolKind) -> Result<PathBuf, ToolError> {
        normalize_path(raw, &self.root).map_err(|e| ToolError::PermissionDenied {
            tool_name: tool.name().to_string(),
            reason: e.to_string(),
        })
    }

    /// Read a UTF-8 file, refusing anything above the size limit.
    pub async fn read_text(&self, path: &Path) -> Result<String, ToolError> {
        let io_err = |e: std::io::Error| ToolError::Io {
            path: path.display().to_string(),
            reason: e.to_string(),
        };

        let metadata = tokio::fs::metadata(path).await.map_err(io_err)?;
        if metadata.len() > self.max_file_size as u64 {
            return Err(ToolError::SizeLimitExceeded {
                limit: self.max_file_size,
            });
        }
        tokio::fs::read_to_string(path).await.map_err(io_err)
    }

    /// Write `content`, creating parent directories as needed.
    pub async fn write_text(&self, path: &Path, content: &str) -> Result<(), ToolError> {
        if content.len() > self.max_file_size {
            return Err(ToolError::SizeLimitExceeded {
                limit: self.max_file_size,
            });
        }

        let io_err = |e: std::io::Error| ToolError::Io {
            path: path.display().to_string(),
            reason: e.to_string(),
        };

        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await.map_err(io_err)?;
        }
        tokio::fs::write(path, content).await.map_err(io_err)
    }

    /// Lint diagnostics rendered as a result suffix; empty when clean.
    pub async fn lint_suffix(&self, path: &Path, stage: LintStage) -> String {
        if !lint::is_supported(path) {
            return String::new();
        }
        match self.linter.diagnostics(path).await {
            Some(output) => lint::diagnostics_suffix(stage, &output),
            None => String::new(),
        }
    }
}

/// Create a registry holding all five file tools.
pub fn default_registry(workspace: Arc<Workspace>) -> ToolRegistry {
    let mut registry = ToolRegistry::new();
    registry.register(Box::new(file_read::ReadFileTool::new(workspace.clone())));
    registry.register(Box::new(file_read::ReadMultipleFilesTool::new(workspace.clone())));
    registry.register(Box::new(file_write::CreateFileTool::new(workspace.clone())));
    registry.register(Box::new(file_write::CreateMultipleFilesTool::new(workspace.clone())));
    registry.register(Box::new(edit::EditFileTool::new(workspace)));
    registry
}

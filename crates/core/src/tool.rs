//! Tool trait: the abstraction over agent capabilities.
//!
//! Tools give the agent the ability to act on the workspace: read, create
//! and edit files. The set of tools is closed ([`ToolKind`]); the registry
//! maps each kind to its implementation and is the only place a tool-call
//! name is interpreted.

use async_trait::async_trait;
use serde_json::Value;
use std::collections::{HashMap, HashSet};
use tracing::{debug, warn};

use crate::error::ToolError;
use crate::message::ToolCallRequest;
use crate::provider::ToolDefinition;

/// The fixed set of tools, plus a catch-all for names the model invents.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ToolKind {
    ReadFile,
    ReadMultipleFiles,
    CreateFile,
    CreateMultipleFiles,
    EditFile,
    Unknown(String),
}

impl ToolKind {
    pub fn from_name(name: &str) -> Self {
        match name {
            "read_file" => Self::ReadFile,
            "read_multiple_files" => Self::ReadMultipleFiles,
            "create_file" => Self::CreateFile,
            "create_multiple_files" => Self::CreateMultipleFiles,
            "edit_file" => Self::EditFile,
            other => Self::Unknown(other.to_string()),
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Self::ReadFile => "read_file",
            Self::ReadMultipleFiles => "read_multiple_files",
            Self::CreateFile => "create_file",
            Self::CreateMultipleFiles => "create_multiple_files",
            Self::EditFile => "edit_file",
            Self::Unknown(name) => name,
        }
    }
}

impl std::fmt::Display for ToolKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Per-batch execution context.
///
/// Tracks which files the transcript already carries and which files tools
/// pulled in during the batch. The loop appends the latter as context
/// entries once every call of the batch has its result.
#[derive(Debug, Default)]
pub struct ToolContext {
    known_files: HashSet<String>,
    loaded: Vec<(String, String)>,
}

impl ToolContext {
    pub fn new(known_files: HashSet<String>) -> Self {
        Self {
            known_files,
            loaded: Vec::new(),
        }
    }

    /// Whether `path` is already in context, either from the transcript or
    /// from earlier in this batch.
    pub fn holds_file(&self, path: &str) -> bool {
        self.known_files.contains(path)
    }

    /// Record that a tool result will carry the content of `path`.
    pub fn note_file(&mut self, path: &str) {
        self.known_files.insert(path.to_string());
    }

    /// Queue `content` to be injected as a context entry for `path`.
    pub fn load_file(&mut self, path: &str, content: String) {
        if self.known_files.insert(path.to_string()) {
            self.loaded.push((path.to_string(), content));
        }
    }

    /// Drain the files loaded during this batch, in load order.
    pub fn take_loaded(&mut self) -> Vec<(String, String)> {
        std::mem::take(&mut self.loaded)
    }
}

/// The core Tool trait.
///
/// A failure returned from `execute` never reaches the loop as an error:
/// the registry renders it as the call's result text.
#[async_trait]
pub trait Tool: Send + Sync {
    fn kind(&self) -> ToolKind;

    /// A description of what this tool does (sent to the model).
    fn description(&self) -> &str;

    /// JSON Schema describing this tool's parameters.
    fn parameters_schema(&self) -> Value;

    /// Execute the tool with already-decoded arguments.
    async fn execute(&self, arguments: Value, ctx: &mut ToolContext) -> Result<String, ToolError>;

    fn to_definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: self.kind().name().to_string(),
            description: self.description().to_string(),
            parameters: self.parameters_schema(),
        }
    }
}

/// Fetch a required string argument.
pub fn required_str<'a>(arguments: &'a Value, key: &str) -> Result<&'a str, ToolError> {
    arguments
        .get(key)
        .and_then(Value::as_str)
        .ok_or_else(|| ToolError::InvalidArguments(format!("missing string field '{key}'")))
}

/// Decode the raw argument text of a tool call into a JSON object.
pub fn decode_arguments(raw: &str) -> Result<Value, ToolError> {
    let value: Value = serde_json::from_str(raw)
        .map_err(|e| ToolError::InvalidArguments(format!("arguments are not valid JSON: {e}")))?;
    if !value.is_object() {
        return Err(ToolError::InvalidArguments(
            "arguments must be a JSON object".into(),
        ));
    }
    Ok(value)
}

/// A registry of available tools.
///
/// The agent loop uses this to:
/// 1. Get tool definitions to send to the model
/// 2. Execute tool calls, always getting result text back
pub struct ToolRegistry {
    tools: HashMap<ToolKind, Box<dyn Tool>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self {
            tools: HashMap::new(),
        }
    }

    /// Register a tool. Replaces any existing tool of the same kind.
    pub fn register(&mut self, tool: Box<dyn Tool>) {
        self.tools.insert(tool.kind(), tool);
    }

    pub fn get(&self, kind: &ToolKind) -> Option<&dyn Tool> {
        self.tools.get(kind).map(|t| t.as_ref())
    }

    /// All tool definitions, sorted by name.
    pub fn definitions(&self) -> Vec<ToolDefinition> {
        let mut defs: Vec<ToolDefinition> = self.tools.values().map(|t| t.to_definition()).collect();
        defs.sort_by(|a, b| a.name.cmp(&b.name));
        defs
    }

    /// Execute a tool call. Never fails: every error becomes result text.
    pub async fn execute(&self, call: &ToolCallRequest, ctx: &mut ToolContext) -> String {
        let kind = ToolKind::from_name(&call.name);
        let Some(tool) = self.get(&kind) else {
            warn!(tool = %call.name, call_id = %call.id, "Model requested unknown tool");
            return format!("Unknown function: {}", call.name);
        };

        let arguments = match decode_arguments(&call.arguments) {
            Ok(arguments) => arguments,
            Err(e) => {
                warn!(tool = %call.name, call_id = %call.id, error = %e, "Undecodable tool arguments");
                return e.render(&call.name);
            }
        };

        debug!(tool = %call.name, call_id = %call.id, "Executing tool");
        match tool.execute(arguments, ctx).await {
            Ok(output) => output,
            Err(e) => {
                warn!(tool = %call.name, call_id = %call.id, error = %e, "Tool failed");
                e.render(&call.name)
            }
        }
    }

    /// List all registered tool names.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.tools.keys().map(ToolKind::name).collect();
        names.sort_unstable();
        names
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}

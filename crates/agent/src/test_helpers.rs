//! Shared test helpers for loop and session tests.

use codewright_core::error::ProviderError;
use codewright_core::provider::{DeltaReceiver, Provider, ProviderRequest, StreamDelta};
use std::sync::Mutex;
use tokio::sync::mpsc;

/// One scripted response: the deltas to stream, optionally ending in a fault.
#[derive(Debug, Clone)]
pub struct Script {
    pub deltas: Vec<StreamDelta>,
    pub fault: Option<ProviderError>,
}

impl Script {
    pub fn new(deltas: Vec<StreamDelta>) -> Self {
        Self {
            deltas,
            fault: None,
        }
    }

    pub fn failing(deltas: Vec<StreamDelta>, fault: ProviderError) -> Self {
        Self {
            deltas,
            fault: Some(fault),
        }
    }
}

/// A provider that replays scripted responses.
///
/// Each call to `stream` plays the next script. Once the scripts run out the
/// last one repeats, which makes "always returns a tool call" endpoints
/// easy to express.
pub struct ScriptedProvider {
    scripts: Vec<Script>,
    requests: Mutex<Vec<ProviderRequest>>,
}

impl ScriptedProvider {
    pub fn new(scripts: Vec<Script>) -> Self {
        assert!(!scripts.is_empty(), "ScriptedProvider needs at least one script");
        Self {
            scripts,
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn request_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    pub fn requests(&self) -> Vec<ProviderRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl Provider for ScriptedProvider {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn stream(&self, request: ProviderRequest) -> Result<DeltaReceiver, ProviderError> {
        let script = {
            let mut requests = self.requests.lock().unwrap();
            let index = requests.len().min(self.scripts.len() - 1);
            requests.push(request);
            self.scripts[index].clone()
        };

        let (tx, rx) = mpsc::channel(script.deltas.len() + 1);
        for delta in script.deltas {
            tx.send(Ok(delta)).await.unwrap();
        }
        if let Some(fault) = script.fault {
            tx.send(Err(fault)).await.unwrap();
        }
        Ok(rx)
    }
}

/// Deltas for a plain text answer.
pub fn text(content: &str) -> Script {
    Script::new(vec![StreamDelta::Content(content.to_string())])
}

/// Deltas for a single tool call, with the arguments split into two fragments.
pub fn tool_call(id: &str, name: &str, arguments: serde_json::Value) -> Script {
    let arguments = arguments.to_string();
    let (head, tail) = arguments.split_at(arguments.len() / 2);
    Script::new(vec![
        StreamDelta::ToolCall {
            index: 0,
            id: Some(id.to_string()),
            name: Some(name.to_string()),
            arguments: Some(head.to_string()),
        },
        StreamDelta::ToolCall {
            index: 0,
            id: None,
            name: None,
            arguments: Some(tail.to_string()),
        },
    ])
}

/// An `edit_file` call.
pub fn edit_call(id: &str, path: &str, original: &str, new: &str) -> Script {
    tool_call(
        id,
        "edit_file",
        serde_json::json!({
            "file_path": path,
            "original_snippet": original,
            "new_snippet": new,
        }),
    )
}

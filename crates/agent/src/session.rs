//! A conversation session.
//!
//! The session owns the transcript for its whole lifetime and is the only
//! thing the CLI talks to. Each user turn builds a fresh [`AgentLoop`] for
//! the currently selected model and runs it against the transcript.

use codewright_config::{AgentSettings, AppConfig, ModelConfig};
use codewright_core::error::ProviderError;
use codewright_core::tool::ToolRegistry;
use codewright_core::transcript::{CompactionPolicy, Transcript};
use codewright_providers::router::{ProviderRouter, build_from_config};
use codewright_tools::{Linter, Workspace, default_registry};
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::AtomicBool;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{info, warn};

use crate::context_loader::{AddError, AddReport, ContextLoader};
use crate::loop_runner::{AgentLoop, LoopOutcome, LoopStatus};
use crate::prompt::system_prompt;
use crate::stream_event::AgentStreamEvent;

pub struct Session {
    transcript: Transcript,
    router: ProviderRouter,
    model: String,
    tools: Arc<ToolRegistry>,
    loader: ContextLoader,
    settings: AgentSettings,
}

impl Session {
    /// Create a session over an existing router and workspace.
    pub fn new(
        config: &AppConfig,
        router: ProviderRouter,
        workspace: Arc<Workspace>,
    ) -> Result<Self, ProviderError> {
        if !router.is_known_model(&config.default_model) {
            return Err(ProviderError::ModelNotFound(config.default_model.clone()));
        }

        let policy = CompactionPolicy {
            threshold: config.agent.compaction.threshold,
            keep_recent: config.agent.compaction.keep_recent,
        };
        let transcript = Transcript::new(system_prompt(
            config.agent.system_prompt_override.as_deref(),
        ))
        .with_policy(policy);

        let loader = ContextLoader::new(workspace.root())
            .with_max_files(config.tools.max_context_files)
            .with_max_file_size(config.tools.max_file_size as u64);

        info!(
            session = %transcript.id,
            model = %config.default_model,
            root = %workspace.root().display(),
            "Session started"
        );

        Ok(Self {
            transcript,
            router,
            model: config.default_model.clone(),
            tools: Arc::new(default_registry(workspace)),
            loader,
            settings: config.agent.clone(),
        })
    }

    /// Create a session rooted at `root`, with providers built from `config`.
    pub fn from_config(config: &AppConfig, root: impl Into<PathBuf>) -> Result<Self, ProviderError> {
        let linter = if config.tools.lint {
            Linter::new(Duration::from_secs(config.tools.lint_timeout_secs))
        } else {
            Linter::disabled()
        };
        let workspace = Workspace::new(root)
            .with_max_file_size(config.tools.max_file_size)
            .with_linter(linter);
        Self::new(config, build_from_config(config), Arc::new(workspace))
    }

    pub fn transcript(&self) -> &Transcript {
        &self.transcript
    }

    pub fn current_model(&self) -> &str {
        &self.model
    }

    /// The catalog, sorted by model name.
    pub fn list_models(&self) -> Vec<(&str, &ModelConfig)> {
        self.router
            .models()
            .iter()
            .map(|(name, config)| (name.as_str(), config))
            .collect()
    }

    /// Switch models. The new model must be in the catalog and its provider
    /// must be usable; otherwise the current model stays selected.
    pub fn set_model(&mut self, name: &str) -> Result<(), ProviderError> {
        let resolved = self.router.resolve(name)?;
        info!(from = %self.model, to = %resolved.name, provider = %resolved.provider_id, "Switched model");
        self.model = resolved.name;
        Ok(())
    }

    /// Handle `/add <path>`.
    pub async fn add_context(&mut self, path: &str) -> Result<AddReport, AddError> {
        self.loader.add(&mut self.transcript, path).await
    }

    /// Run one user turn.
    pub async fn send(
        &mut self,
        user_text: &str,
        events: Option<mpsc::Sender<AgentStreamEvent>>,
        cancel: Arc<AtomicBool>,
    ) -> LoopOutcome {
        let resolved = match self.router.resolve(&self.model) {
            Ok(resolved) => resolved,
            Err(e) => {
                warn!(model = %self.model, error = %e, "Cannot reach model");
                return LoopOutcome {
                    success: false,
                    error: Some(e.to_string()),
                    status: LoopStatus::Failed,
                    iterations: 0,
                    requests: 0,
                };
            }
        };

        let mut agent = AgentLoop::new(resolved.provider, resolved.name, self.tools.clone())
            .with_max_tokens(resolved.max_tokens)
            .with_max_iterations(self.settings.max_iterations)
            .with_trivial_edit_limit(self.settings.trivial_edit_limit)
            .with_reasoning(resolved.supports_reasoning)
            .with_cancel_flag(cancel);
        if let Some(events) = events {
            agent = agent.with_events(events);
        }

        agent.run(&mut self.transcript, user_text).await
    }
}

//! Configuration loading, validation, and management for Codewright.
//!
//! Loads configuration from `~/.codewright/config.toml` with environment
//! variable overrides. Validates all settings at startup.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// The root configuration structure.
///
/// Maps directly to `~/.codewright/config.toml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Model used when none is selected explicitly
    #[serde(default = "default_model")]
    pub default_model: String,

    /// Default max tokens per model response
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    /// Endpoint configurations, keyed by provider id
    #[serde(default = "default_providers")]
    pub providers: BTreeMap<String, ProviderConfig>,

    /// Model catalog, keyed by model name
    #[serde(default = "default_models")]
    pub models: BTreeMap<String, ModelConfig>,

    /// Agent loop settings
    #[serde(default)]
    pub agent: AgentSettings,

    /// File tool settings
    #[serde(default)]
    pub tools: ToolsConfig,
}

fn default_model() -> String {
    "deepseek-reasoner".into()
}
fn default_max_tokens() -> u32 {
    64000
}
fn default_true() -> bool {
    true
}

/// Redact a secret string for Debug output.
fn redact(s: &Option<String>) -> &'static str {
    match s {
        Some(_) => "[REDACTED]",
        None => "None",
    }
}

/// One OpenAI-compatible endpoint.
#[derive(Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// Human-readable name (e.g., "DeepSeek")
    #[serde(default)]
    pub display_name: String,

    /// Base URL; `/chat/completions` is appended
    pub base_url: String,

    /// Environment variable holding the API key
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key_env: Option<String>,

    /// Inline API key (takes precedence over `api_key_env`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Headers added to every request
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub extra_headers: BTreeMap<String, String>,

    /// Fields merged into every request body
    #[serde(default, skip_serializing_if = "serde_json::Map::is_empty")]
    pub extra_body: serde_json::Map<String, serde_json::Value>,
}

impl std::fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderConfig")
            .field("display_name", &self.display_name)
            .field("base_url", &self.base_url)
            .field("api_key_env", &self.api_key_env)
            .field("api_key", &redact(&self.api_key))
            .field("extra_headers", &self.extra_headers)
            .field("extra_body", &self.extra_body)
            .finish()
    }
}

impl ProviderConfig {
    fn builtin(display_name: &str, base_url: &str, api_key_env: &str) -> Self {
        Self {
            display_name: display_name.into(),
            base_url: base_url.into(),
            api_key_env: Some(api_key_env.into()),
            api_key: None,
            extra_headers: BTreeMap::new(),
            extra_body: serde_json::Map::new(),
        }
    }

    /// The inline key, or the value of `api_key_env` if set and non-empty.
    pub fn resolve_api_key(&self) -> Option<String> {
        self.api_key.clone().or_else(|| {
            self.api_key_env
                .as_deref()
                .and_then(|var| std::env::var(var).ok())
                .filter(|key| !key.trim().is_empty())
        })
    }
}

/// One entry of the model catalog.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelConfig {
    /// Provider id in [`AppConfig::providers`]
    pub provider: String,

    #[serde(default)]
    pub display_name: String,

    /// Whether the endpoint streams reasoning text for this model
    #[serde(default)]
    pub supports_reasoning: bool,

    /// Overrides [`AppConfig::max_tokens`] for this model
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
}

impl ModelConfig {
    fn builtin(provider: &str, display_name: &str, supports_reasoning: bool) -> Self {
        Self {
            provider: provider.into(),
            display_name: display_name.into(),
            supports_reasoning,
            max_tokens: None,
        }
    }
}

fn default_providers() -> BTreeMap<String, ProviderConfig> {
    BTreeMap::from([
        (
            "deepseek".to_string(),
            ProviderConfig::builtin("DeepSeek", "https://api.deepseek.com", "DEEPSEEK_API_KEY"),
        ),
        (
            "openrouter".to_string(),
            ProviderConfig::builtin(
                "OpenRouter",
                "https://openrouter.ai/api/v1",
                "OPENROUTER_API_KEY",
            ),
        ),
    ])
}

fn default_models() -> BTreeMap<String, ModelConfig> {
    [
        ("deepseek-reasoner", "deepseek", "DeepSeek Reasoner", true),
        ("deepseek-chat", "deepseek", "DeepSeek Chat", false),
        ("anthropic/claude-sonnet-4", "openrouter", "Anthropic Claude Sonnet 4", false),
        (
            "anthropic/claude-3.7-sonnet:thinking",
            "openrouter",
            "Anthropic Claude 3.7 Sonnet (thinking)",
            true,
        ),
        ("anthropic/claude-3.7-sonnet", "openrouter", "Anthropic Claude 3.7 Sonnet", false),
        ("openai/o3-mini-high", "openrouter", "OpenAI o3-mini-high", true),
        ("openai/gpt-4.1", "openrouter", "OpenAI GPT-4.1", false),
        ("google/gemini-2.5-pro-preview", "openrouter", "Google Gemini 2.5 Pro Preview", true),
        (
            "google/gemini-2.5-flash-preview-05-20",
            "openrouter",
            "Google Gemini 2.5 Flash Preview 05-20",
            false,
        ),
    ]
    .into_iter()
    .map(|(name, provider, display, reasoning)| {
        (name.to_string(), ModelConfig::builtin(provider, display, reasoning))
    })
    .collect()
}

/// Agent loop settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentSettings {
    /// Hard cap on model requests per user turn
    #[serde(default = "default_max_iterations")]
    pub max_iterations: u32,

    /// Consecutive trivial-edit batches that end the turn
    #[serde(default = "default_trivial_edit_limit")]
    pub trivial_edit_limit: u32,

    #[serde(default)]
    pub compaction: CompactionConfig,

    /// Replace the built-in system prompt entirely
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system_prompt_override: Option<String>,
}

fn default_max_iterations() -> u32 {
    10
}
fn default_trivial_edit_limit() -> u32 {
    3
}

impl Default for AgentSettings {
    fn default() -> Self {
        Self {
            max_iterations: default_max_iterations(),
            trivial_edit_limit: default_trivial_edit_limit(),
            compaction: CompactionConfig::default(),
            system_prompt_override: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompactionConfig {
    #[serde(default = "default_compaction_threshold")]
    pub threshold: usize,

    #[serde(default = "default_keep_recent")]
    pub keep_recent: usize,
}

fn default_compaction_threshold() -> usize {
    20
}
fn default_keep_recent() -> usize {
    15
}

impl Default for CompactionConfig {
    fn default() -> Self {
        Self {
            threshold: default_compaction_threshold(),
            keep_recent: default_keep_recent(),
        }
    }
}

/// File tool settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolsConfig {
    /// Largest file (bytes) that may be created, read or added to context
    #[serde(default = "default_max_file_size")]
    pub max_file_size: usize,

    /// Run linters on touched source files
    #[serde(default = "default_true")]
    pub lint: bool,

    /// Base linter timeout; TypeScript checks get extra headroom
    #[serde(default = "default_lint_timeout_secs")]
    pub lint_timeout_secs: u64,

    /// Upper bound on files pulled in by one `/add <dir>`
    #[serde(default = "default_max_context_files")]
    pub max_context_files: usize,
}

fn default_max_file_size() -> usize {
    5_000_000
}
fn default_lint_timeout_secs() -> u64 {
    10
}
fn default_max_context_files() -> usize {
    1000
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            max_file_size: default_max_file_size(),
            lint: true,
            lint_timeout_secs: default_lint_timeout_secs(),
            max_context_files: default_max_context_files(),
        }
    }
}

impl AppConfig {
    /// Load configuration from the default path (~/.codewright/config.toml).
    ///
    /// Environment overrides, highest priority first:
    /// - `CODEWRIGHT_MODEL` / `LLM_MODEL`: model name (ignored if not in the catalog)
    /// - `LLM_PROVIDER`: picks that provider's default model
    pub fn load() -> Result<Self, ConfigError> {
        let config_path = Self::config_dir().join("config.toml");
        let mut config = Self::load_from(&config_path)?;
        config.apply_env_overrides(|key| std::env::var(key).ok());
        Ok(config)
    }

    /// Load configuration from a specific file path.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::info!("No config file found at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        Self::from_toml(&content).map_err(|e| match e {
            ConfigError::ParseError { reason, .. } => ConfigError::ParseError {
                path: path.to_path_buf(),
                reason,
            },
            other => other,
        })
    }

    /// Parse and validate a TOML document. Built-in providers and models the
    /// document does not mention are kept.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let mut config: Self = toml::from_str(content).map_err(|e| ConfigError::ParseError {
            path: PathBuf::new(),
            reason: e.to_string(),
        })?;

        for (name, provider) in default_providers() {
            config.providers.entry(name).or_insert(provider);
        }
        for (name, model) in default_models() {
            config.models.entry(name).or_insert(model);
        }

        config.validate()?;
        Ok(config)
    }

    /// Apply environment overrides through `lookup` (injectable for tests).
    pub fn apply_env_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let requested = lookup("CODEWRIGHT_MODEL").or_else(|| lookup("LLM_MODEL"));
        if let Some(model) = requested {
            if self.models.contains_key(&model) {
                self.default_model = model;
                return;
            }
            tracing::warn!(model = %model, "Ignoring unknown model from environment");
        }

        if let Some(provider) = lookup("LLM_PROVIDER") {
            match provider.to_lowercase().as_str() {
                "openrouter" => self.default_model = "anthropic/claude-sonnet-4".into(),
                "deepseek" => self.default_model = "deepseek-reasoner".into(),
                other => tracing::warn!(provider = %other, "Ignoring unknown provider from environment"),
            }
        }
    }

    /// Get the configuration directory path.
    pub fn config_dir() -> PathBuf {
        dirs_home().join(".codewright")
    }

    /// Validate the configuration.
    fn validate(&self) -> Result<(), ConfigError> {
        if self.agent.max_iterations == 0 {
            return Err(ConfigError::ValidationError(
                "agent.max_iterations must be at least 1".into(),
            ));
        }

        if self.agent.trivial_edit_limit == 0 {
            return Err(ConfigError::ValidationError(
                "agent.trivial_edit_limit must be at least 1".into(),
            ));
        }

        let compaction = &self.agent.compaction;
        if compaction.keep_recent == 0 || compaction.keep_recent >= compaction.threshold {
            return Err(ConfigError::ValidationError(
                "agent.compaction.keep_recent must be > 0 and below threshold".into(),
            ));
        }

        for (name, model) in &self.models {
            if !self.providers.contains_key(&model.provider) {
                return Err(ConfigError::ValidationError(format!(
                    "model '{name}' references unknown provider '{}'",
                    model.provider
                )));
            }
        }

        if !self.models.contains_key(&self.default_model) {
            return Err(ConfigError::ValidationError(format!(
                "default_model '{}' is not in the model catalog",
                self.default_model
            )));
        }

        Ok(())
    }

    /// Look up a model in the catalog.
    pub fn model(&self, name: &str) -> Option<&ModelConfig> {
        self.models.get(name)
    }

    /// Look up the provider serving `model`.
    pub fn provider_for(&self, model: &str) -> Option<(&str, &ProviderConfig)> {
        let model = self.models.get(model)?;
        self.providers
            .get_key_value(&model.provider)
            .map(|(id, cfg)| (id.as_str(), cfg))
    }

    /// Max tokens for `model`, honoring per-model overrides.
    pub fn max_tokens_for(&self, model: &str) -> u32 {
        self.models
            .get(model)
            .and_then(|m| m.max_tokens)
            .unwrap_or(self.max_tokens)
    }

    /// Generate a default config TOML string (for the `init` command).
    pub fn default_toml() -> String {
        let config = Self::default();
        toml::to_string_pretty(&config).unwrap_or_default()
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            default_model: default_model(),
            max_tokens: default_max_tokens(),
            providers: default_providers(),
            models: default_models(),
            agent: AgentSettings::default(),
            tools: ToolsConfig::default(),
        }
    }
}

/// Get the user's home directory.
fn dirs_home() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        std::env::var("USERPROFILE")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("C:\\Users\\Default"))
    }
    #[cfg(not(target_os = "windows"))]
    {
        std::env::var("HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("/tmp"))
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file at {path}: {reason}")]
    ReadError { path: PathBuf, reason: String },

    #[error("Failed to parse config file at {path}: {reason}")]
    ParseError { path: PathBuf, reason: String },

    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}

//! Provider router: resolves a model name to the provider that serves it.
//!
//! The model catalog in the config names a provider for every model; the
//! router owns one provider instance per configured endpoint and hands out
//! shared handles.

use codewright_config::{AppConfig, ModelConfig};
use codewright_core::error::ProviderError;
use codewright_core::provider::Provider;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tracing::debug;

use crate::openai_compat::OpenAiCompatProvider;

/// A model resolved against the catalog.
#[derive(Clone)]
pub struct ResolvedModel {
    pub name: String,
    pub provider_id: String,
    pub provider: Arc<dyn Provider>,
    pub supports_reasoning: bool,
    pub max_tokens: u32,
}

impl std::fmt::Debug for ResolvedModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResolvedModel")
            .field("name", &self.name)
            .field("provider_id", &self.provider_id)
            .field("supports_reasoning", &self.supports_reasoning)
            .field("max_tokens", &self.max_tokens)
            .finish()
    }
}

/// Routes model names to the correct provider.
pub struct ProviderRouter {
    providers: HashMap<String, Arc<dyn Provider>>,
    /// Why a provider is unavailable (e.g. its API key variable is unset)
    unavailable: HashMap<String, String>,
    models: BTreeMap<String, ModelConfig>,
    default_max_tokens: u32,
}

impl ProviderRouter {
    /// Create an empty router over a model catalog.
    pub fn new(models: BTreeMap<String, ModelConfig>, default_max_tokens: u32) -> Self {
        Self {
            providers: HashMap::new(),
            unavailable: HashMap::new(),
            models,
            default_max_tokens,
        }
    }

    /// Register a provider under its catalog id.
    pub fn register(&mut self, id: impl Into<String>, provider: Arc<dyn Provider>) {
        let id = id.into();
        self.unavailable.remove(&id);
        self.providers.insert(id, provider);
    }

    /// Get a specific provider by id.
    pub fn get(&self, id: &str) -> Option<Arc<dyn Provider>> {
        self.providers.get(id).cloned()
    }

    /// Whether `model` is in the catalog.
    pub fn is_known_model(&self, model: &str) -> bool {
        self.models.contains_key(model)
    }

    /// The model catalog, sorted by name.
    pub fn models(&self) -> &BTreeMap<String, ModelConfig> {
        &self.models
    }

    /// Resolve a model name to its provider.
    pub fn resolve(&self, model: &str) -> Result<ResolvedModel, ProviderError> {
        let config = self
            .models
            .get(model)
            .ok_or_else(|| ProviderError::ModelNotFound(model.to_string()))?;

        let provider = self.providers.get(&config.provider).cloned().ok_or_else(|| {
            let reason = self
                .unavailable
                .get(&config.provider)
                .cloned()
                .unwrap_or_else(|| format!("no provider registered as '{}'", config.provider));
            ProviderError::NotConfigured(reason)
        })?;

        debug!(model, provider = %config.provider, "Resolved model");

        Ok(ResolvedModel {
            name: model.to_string(),
            provider_id: config.provider.clone(),
            provider,
            supports_reasoning: config.supports_reasoning,
            max_tokens: config.max_tokens.unwrap_or(self.default_max_tokens),
        })
    }

    /// List all registered provider ids.
    pub fn list(&self) -> Vec<&str> {
        let mut ids: Vec<&str> = self.providers.keys().map(|s| s.as_str()).collect();
        ids.sort_unstable();
        ids
    }
}

/// Build providers from configuration.
///
/// A provider without an API key is recorded as unavailable rather than
/// failing startup, so switching to a model on another endpoint still works.
pub fn build_from_config(config: &AppConfig) -> ProviderRouter {
    let mut router = ProviderRouter::new(config.models.clone(), config.max_tokens);

    for (id, provider_config) in &config.providers {
        let Some(api_key) = provider_config.resolve_api_key() else {
            let reason = match &provider_config.api_key_env {
                Some(var) => format!("{var} environment variable not set"),
                None => format!("no API key configured for provider '{id}'"),
            };
            debug!(provider = %id, %reason, "Provider unavailable");
            router.unavailable.insert(id.clone(), reason);
            continue;
        };

        let provider = OpenAiCompatProvider::new(id, &provider_config.base_url, api_key)
            .with_extra_headers(provider_config.extra_headers.clone())
            .with_extra_body(provider_config.extra_body.clone());
        router.register(id.clone(), Arc::new(provider));
    }

    router
}

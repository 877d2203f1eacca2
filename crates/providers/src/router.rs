//! Provider router: selects the LLM backend a pricing agent talks to.
//!
//! Every backend is reached through the OpenAI-compatible client; the router
//! only decides base URL, key and model per provider name.

use std::collections::HashMap;
use std::sync::Arc;

use bertrand_config::AppConfig;
use bertrand_core::error::ProviderError;
use bertrand_core::provider::Provider;
use tracing::debug;

use crate::openai_compat::OpenAiCompatProvider;

/// A provider together with the model it should be asked for.
#[derive(Clone)]
pub struct ResolvedProvider {
    pub provider: Arc<dyn Provider>,
    pub model: String,
}

/// Routes LLM requests to the correct provider.
pub struct ProviderRouter {
    providers: HashMap<String, ResolvedProvider>,
    default_provider: String,
}

impl ProviderRouter {
    /// Create a new router with a default provider.
    pub fn new(default_provider: impl Into<String>) -> Self {
        Self {
            providers: HashMap::new(),
            default_provider: default_provider.into(),
        }
    }

    /// Register a provider and the model to use with it.
    pub fn register(
        &mut self,
        name: impl Into<String>,
        provider: Arc<dyn Provider>,
        model: impl Into<String>,
    ) {
        self.providers.insert(
            name.into(),
            ResolvedProvider {
                provider,
                model: model.into(),
            },
        );
    }

    /// Get the default provider.
    pub fn default(&self) -> Option<ResolvedProvider> {
        self.providers.get(&self.default_provider).cloned()
    }

    /// Get a specific provider by name.
    pub fn get(&self, name: &str) -> Option<ResolvedProvider> {
        self.providers.get(name).cloned()
    }

    /// Get the default provider or fail with a configuration error.
    pub fn require_default(&self) -> Result<ResolvedProvider, ProviderError> {
        self.default().ok_or_else(|| {
            ProviderError::NotConfigured(format!(
                "no provider registered as '{}'",
                self.default_provider
            ))
        })
    }

    /// List all registered provider names.
    pub fn list(&self) -> Vec<&str> {
        self.providers.keys().map(|s| s.as_str()).collect()
    }
}

/// Build providers from configuration.
pub fn build_from_config(config: &AppConfig) -> ProviderRouter {
    let mut router = ProviderRouter::new(&config.default_provider);

    for (name, provider_config) in &config.providers {
        let api_key = provider_config
            .api_key
            .clone()
            .or_else(|| config.api_key.clone())
            .unwrap_or_default();

        let base_url = provider_config
            .api_url
            .clone()
            .unwrap_or_else(|| default_base_url(name));

        let model = provider_config
            .default_model
            .clone()
            .unwrap_or_else(|| config.default_model.clone());

        debug!(provider = %name, %base_url, %model, "Registering provider");
        router.register(
            name.clone(),
            Arc::new(OpenAiCompatProvider::new(name, &base_url, &api_key)),
            model,
        );
    }

    // Ensure the default provider exists (even if not explicitly configured)
    if router.get(&config.default_provider).is_none() {
        let api_key = config.api_key.clone().unwrap_or_default();
        let base_url = default_base_url(&config.default_provider);
        router.register(
            config.default_provider.clone(),
            Arc::new(OpenAiCompatProvider::new(
                &config.default_provider,
                &base_url,
                &api_key,
            )),
            config.default_model.clone(),
        );
    }

    router
}

/// Get the default base URL for well-known providers.
fn default_base_url(provider_name: &str) -> String {
    match provider_name {
        "deepseek" => "https://api.deepseek.com/v1".into(),
        "openai" => "https://api.openai.com/v1".into(),
        "openrouter" => "https://openrouter.ai/api/v1".into(),
        "ollama" => "http://localhost:11434/v1".into(),
        "together" => "https://api.together.xyz/v1".into(),
        "vllm" => "http://localhost:8000/v1".into(),
        _ => format!("https://{provider_name}.api.example.com/v1"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bertrand_config::ProviderConfig;

    #[test]
    fn router_register_and_lookup() {
        let mut router = ProviderRouter::new("deepseek");
        router.register(
            "deepseek",
            Arc::new(OpenAiCompatProvider::deepseek("sk-test")),
            "deepseek-reasoner",
        );

        assert!(router.get("deepseek").is_some());
        assert!(router.get("nonexistent").is_none());
        assert_eq!(router.default().unwrap().model, "deepseek-reasoner");
    }

    #[test]
    fn missing_default_is_not_configured() {
        let router = ProviderRouter::new("deepseek");
        assert!(matches!(
            router.require_default(),
            Err(ProviderError::NotConfigured(_))
        ));
    }

    #[test]
    fn default_base_urls() {
        assert!(default_base_url("deepseek").contains("api.deepseek.com"));
        assert!(default_base_url("openai").contains("api.openai.com"));
        assert!(default_base_url("ollama").contains("localhost:11434"));
    }

    #[test]
    fn build_from_default_config() {
        let config = AppConfig::default();
        let router = build_from_config(&config);
        let resolved = router.default().unwrap();
        assert_eq!(resolved.provider.name(), "deepseek");
        assert_eq!(resolved.model, "deepseek-reasoner");
    }

    #[test]
    fn per_provider_model_overrides_default() {
        let mut config = AppConfig::default();
        config.default_provider = "ollama".into();
        config.providers.insert(
            "ollama".into(),
            ProviderConfig {
                api_key: None,
                api_url: Some("http://gpu-box:11434/v1".into()),
                default_model: Some("qwen3:32b".into()),
            },
        );
        let router = build_from_config(&config);
        assert_eq!(router.require_default().unwrap().model, "qwen3:32b");
        assert_eq!(router.list(), vec!["ollama"]);
    }
}

//! Provider registry: the lookup table behind backend selection.
//!
//! Handles provider creation from config, alias resolution, and the
//! priority order the fallback chain walks.

use std::collections::HashMap;
use std::sync::Arc;

use sentia_config::{AppConfig, ProviderConfig};
use sentia_core::provider::Provider;
use tracing::{debug, warn};

use crate::anthropic::AnthropicProvider;
use crate::gemini::GeminiProvider;
use crate::openai_compat::OpenAiCompatProvider;

/// Alternative names accepted for explicit selection.
const ALIASES: &[(&str, &str)] = &[("claude", "anthropic"), ("dashscope", "qwen")];

/// Name-keyed set of adapters, remembering registration order.
#[derive(Default, Clone)]
pub struct ProviderRegistry {
    providers: HashMap<String, Arc<dyn Provider>>,
    names: Vec<String>,
}

impl ProviderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a provider under its own `name()`. Re-registering replaces.
    pub fn register(&mut self, provider: Arc<dyn Provider>) {
        let name = provider.name().to_string();
        if !self.providers.contains_key(&name) {
            self.names.push(name.clone());
        }
        self.providers.insert(name, provider);
    }

    /// Builder-style `register`.
    pub fn with(mut self, provider: Arc<dyn Provider>) -> Self {
        self.register(provider);
        self
    }

    /// Exact lookup by registered name.
    pub fn get(&self, name: &str) -> Option<Arc<dyn Provider>> {
        self.providers.get(name).cloned()
    }

    /// Case-insensitive lookup that also accepts aliases.
    pub fn resolve(&self, name: &str) -> Option<Arc<dyn Provider>> {
        let wanted = name.trim().to_ascii_lowercase();
        let canonical = ALIASES
            .iter()
            .find(|(alias, _)| *alias == wanted)
            .map(|(_, target)| target.to_string())
            .unwrap_or(wanted);
        self.get(&canonical)
    }

    /// Resolve each name of a priority list, dropping the unknown ones.
    pub fn ordered(&self, order: &[String]) -> Vec<Arc<dyn Provider>> {
        let mut seen = Vec::new();
        let mut out = Vec::new();
        for name in order {
            match self.resolve(name) {
                Some(provider) => {
                    if !seen.iter().any(|s: &String| s == provider.name()) {
                        seen.push(provider.name().to_string());
                        out.push(provider);
                    }
                }
                None => warn!(provider = %name, "Unknown provider in fallback order, skipping"),
            }
        }
        out
    }

    /// Registered names in registration order.
    pub fn names(&self) -> Vec<&str> {
        self.names.iter().map(String::as_str).collect()
    }
}

/// Build all five adapters, applying `providers.<name>` overrides from config.
pub fn build_from_config(config: &AppConfig) -> ProviderRegistry {
    let mut registry = ProviderRegistry::new();

    let openai = apply_openai_overrides(
        OpenAiCompatProvider::openai(api_key(config, "openai")),
        config.provider("openai"),
    );
    let deepseek = apply_openai_overrides(
        OpenAiCompatProvider::deepseek(api_key(config, "deepseek")),
        config.provider("deepseek"),
    );
    let qwen = apply_openai_overrides(
        OpenAiCompatProvider::qwen(api_key(config, "qwen")),
        config.provider("qwen"),
    );

    let mut anthropic = AnthropicProvider::new(api_key(config, "anthropic"));
    if let Some(pc) = config.provider("anthropic") {
        if let Some(url) = &pc.api_url {
            anthropic = anthropic.with_base_url(url);
        }
        if let Some(model) = &pc.default_model {
            anthropic = anthropic.with_model(model);
        }
    }

    let mut gemini = GeminiProvider::new(api_key(config, "gemini"));
    if let Some(pc) = config.provider("gemini") {
        if let Some(url) = &pc.api_url {
            gemini = gemini.with_base_url(url);
        }
        if let Some(model) = &pc.default_model {
            gemini = gemini.with_model(model);
        }
    }

    registry.register(Arc::new(openai));
    registry.register(Arc::new(anthropic));
    registry.register(Arc::new(gemini));
    registry.register(Arc::new(deepseek));
    registry.register(Arc::new(qwen));

    for name in config.providers.keys() {
        if registry.get(name).is_none() {
            warn!(provider = %name, "Ignoring settings for unsupported provider");
        }
    }

    debug!(
        configured = ?registry
            .names()
            .into_iter()
            .filter(|n| registry.get(n).is_some_and(|p| p.is_configured()))
            .collect::<Vec<_>>(),
        "Provider registry built"
    );

    registry
}

fn api_key(config: &AppConfig, name: &str) -> Option<String> {
    config.provider(name).and_then(|pc| pc.api_key.clone())
}

fn apply_openai_overrides(
    mut provider: OpenAiCompatProvider,
    settings: Option<&ProviderConfig>,
) -> OpenAiCompatProvider {
    if let Some(pc) = settings {
        if let Some(url) = &pc.api_url {
            provider = provider.with_base_url(url);
        }
        if let Some(model) = &pc.default_model {
            provider = provider.with_model(model);
        }
    }
    provider
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config_with_key(name: &str, key: &str) -> AppConfig {
        let mut config = AppConfig::default();
        config.providers.insert(
            name.into(),
            ProviderConfig {
                api_key: Some(key.into()),
                api_url: None,
                default_model: None,
            },
        );
        config
    }

    #[test]
    fn builds_every_adapter() {
        let registry = build_from_config(&AppConfig::default());
        assert_eq!(
            registry.names(),
            vec!["openai", "anthropic", "gemini", "deepseek", "qwen"]
        );
        assert!(registry.names().iter().all(|n| !registry.get(n).unwrap().is_configured()));
    }

    #[test]
    fn configured_key_is_applied() {
        let registry = build_from_config(&config_with_key("deepseek", "sk-ds"));
        assert!(registry.get("deepseek").unwrap().is_configured());
        assert!(!registry.get("openai").unwrap().is_configured());
    }

    #[test]
    fn resolve_aliases_and_case() {
        let registry = build_from_config(&AppConfig::default());
        assert_eq!(registry.resolve("claude").unwrap().name(), "anthropic");
        assert_eq!(registry.resolve(" Gemini ").unwrap().name(), "gemini");
        assert!(registry.resolve("llama").is_none());
    }

    #[test]
    fn ordered_skips_unknown_and_duplicates() {
        let registry = build_from_config(&AppConfig::default());
        let order = vec![
            "qwen".to_string(),
            "mystery".to_string(),
            "claude".to_string(),
            "anthropic".to_string(),
        ];
        let names: Vec<String> = registry
            .ordered(&order)
            .iter()
            .map(|p| p.name().to_string())
            .collect();
        assert_eq!(names, vec!["qwen", "anthropic"]);
    }
}

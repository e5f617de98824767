use std::collections::HashMap;
use std::sync::Arc;

use crate::config::{AppConfig, LlmConfig, RoleEntry};
use crate::errors::{GuideError, GuideResult};
use crate::llm::provider::LlmProvider;
use crate::llm::providers::openai_compatible::OpenAiCompatibleProvider;
use crate::llm::types::CallConfig;

/// Registry of all available LLM providers, keyed by their config.toml identifier.
pub struct ProviderRegistry {
    providers: HashMap<String, Arc<dyn LlmProvider>>,
    active: String,
    /// Kept for purpose-to-model lookups.
    llm_config: LlmConfig,
    default_max_tokens: u32,
}

impl ProviderRegistry {
    pub fn new(active: String) -> Self {
        Self {
            providers: HashMap::new(),
            active,
            llm_config: LlmConfig::default(),
            default_max_tokens: 200,
        }
    }

    pub fn register(&mut self, provider: Arc<dyn LlmProvider>) {
        self.providers.insert(provider.name().to_string(), provider);
    }

    pub fn get_active(&self) -> GuideResult<Arc<dyn LlmProvider>> {
        self.providers
            .get(&self.active)
            .cloned()
            .ok_or_else(|| GuideError::Config(format!("Active provider '{}' not found in registry", self.active)))
    }

    /// Return the provider and call configuration for an advisory purpose.
    ///
    /// Resolution order:
    /// 1. `[llm.roles.<purpose>]` in config.toml
    /// 2. Fallback: active provider with its default model / temperature
    pub fn call_config_for(&self, purpose: &str) -> GuideResult<(Arc<dyn LlmProvider>, CallConfig)> {
        let role_entry: Option<&RoleEntry> = match purpose {
            "advisory" => self.llm_config.roles.advisory.as_ref(),
            "analysis" => self.llm_config.roles.analysis.as_ref(),
            other => {
                tracing::warn!(purpose = other, "unknown purpose, falling back to active provider");
                None
            }
        };

        if let Some(entry) = role_entry {
            let provider = self.providers.get(&entry.provider).cloned().ok_or_else(|| {
                GuideError::Config(format!(
                    "Purpose '{}' references unknown provider '{}'",
                    purpose, entry.provider
                ))
            })?;
            let temperature = entry.temperature.unwrap_or_else(|| {
                self.llm_config
                    .providers
                    .get(&entry.provider)
                    .map(|p| p.temperature)
                    .unwrap_or(0.2)
            });
            let max_tokens = entry.max_tokens.unwrap_or(self.default_max_tokens);
            tracing::debug!(
                purpose = purpose,
                provider = %entry.provider,
                model = %entry.model,
                temperature = temperature,
                "resolved purpose config"
            );
            return Ok((
                provider,
                CallConfig {
                    model: entry.model.clone(),
                    temperature,
                    max_tokens,
                },
            ));
        }

        let provider = self.get_active()?;
        let (model, temperature) = self
            .llm_config
            .providers
            .get(&self.active)
            .map(|p| (p.model.clone(), p.temperature))
            .unwrap_or_else(|| (String::new(), 0.2));
        tracing::debug!(
            purpose = purpose,
            provider = %self.active,
            model = %model,
            "purpose not configured, using active provider fallback"
        );
        Ok((
            provider,
            CallConfig {
                model,
                temperature,
                max_tokens: self.default_max_tokens,
            },
        ))
    }

    /// Build a registry from the loaded app config.
    /// API keys are read from environment variables named `ERP_GUIDE_<ID>_API_KEY`.
    pub fn from_config(config: &AppConfig) -> Self {
        let mut registry = Self {
            providers: HashMap::new(),
            active: config.llm.active_provider.clone(),
            llm_config: config.llm.clone(),
            default_max_tokens: config.advisory.max_tokens,
        };
        for (id, entry) in &config.llm.providers {
            let api_key = std::env::var(format!("ERP_GUIDE_{}_API_KEY", id.to_uppercase()))
                .unwrap_or_else(|_| entry.api_key.clone().unwrap_or_default());
            let provider = OpenAiCompatibleProvider::new(id.clone(), entry.api_base.clone(), api_key);
            registry.register(Arc::new(provider));
        }
        registry
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> AppConfig {
        toml::from_str(
            r#"
            [llm]
            active_provider = "openai"

            [llm.providers.openai]
            display_name = "OpenAI"
            api_base = "http://localhost:1/v1/chat/completions"
            model = "gpt-4o-mini"
            temperature = 0.3

            [llm.providers.local]
            display_name = "Local"
            api_base = "http://localhost:2/v1/chat/completions"
            model = "llama"

            [llm.roles.analysis]
            provider = "local"
            model = "llama-large"
            max_tokens = 250

            [advisory]
            max_tokens = 120
            "#,
        )
        .unwrap()
    }

    #[test]
    fn configured_purpose_uses_its_provider() {
        let registry = ProviderRegistry::from_config(&config());
        let (provider, cfg) = registry.call_config_for("analysis").unwrap();
        assert_eq!(provider.name(), "local");
        assert_eq!(cfg.model, "llama-large");
        assert_eq!(cfg.max_tokens, 250);
        assert_eq!(cfg.temperature, 0.2);
    }

    #[test]
    fn unconfigured_purpose_falls_back_to_active() {
        let registry = ProviderRegistry::from_config(&config());
        let (provider, cfg) = registry.call_config_for("advisory").unwrap();
        assert_eq!(provider.name(), "openai");
        assert_eq!(cfg.model, "gpt-4o-mini");
        assert_eq!(cfg.temperature, 0.3);
        assert_eq!(cfg.max_tokens, 120);
    }

    #[test]
    fn empty_registry_has_no_active_provider() {
        let registry = ProviderRegistry::new(String::new());
        assert!(matches!(registry.call_config_for("advisory"), Err(GuideError::Config(_))));
    }
}

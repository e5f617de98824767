use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::errors::{GuideError, GuideResult};

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub llm: LlmConfig,
    #[serde(default)]
    pub advisory: AdvisoryConfig,
    #[serde(default)]
    pub catalogue: CatalogueConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct LlmConfig {
    #[serde(default)]
    pub active_provider: String,
    #[serde(default)]
    pub providers: HashMap<String, ProviderEntry>,
    /// Purpose-to-model mapping. If a purpose is absent, falls back to active_provider defaults.
    #[serde(default)]
    pub roles: RolesConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderEntry {
    pub display_name: String,
    pub api_base: String,
    /// Default model for this provider (used when no role entry exists).
    pub model: String,
    #[serde(default = "default_temperature")]
    pub temperature: f64,
    /// Optional API key stored in config.toml (env var ERP_GUIDE_<ID>_API_KEY wins).
    #[serde(default)]
    pub api_key: Option<String>,
}

/// Maps advisory purposes to specific provider+model combinations.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct RolesConfig {
    /// Next-step coaching during workflow guidance.
    pub advisory: Option<RoleEntry>,
    /// Job-to-tutorial analysis.
    pub analysis: Option<RoleEntry>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoleEntry {
    /// Must match a key under [llm.providers.*].
    pub provider: String,
    pub model: String,
    /// Overrides the provider-level temperature for this purpose.
    pub temperature: Option<f64>,
    /// Overrides [advisory].max_tokens for this purpose.
    pub max_tokens: Option<u32>,
}

fn default_temperature() -> f64 {
    0.2
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdvisoryConfig {
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
    /// Number of visible element labels included in a prompt.
    #[serde(default = "default_max_elements")]
    pub max_elements: usize,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
}

impl Default for AdvisoryConfig {
    fn default() -> Self {
        Self {
            timeout_ms: default_timeout_ms(),
            max_elements: default_max_elements(),
            max_tokens: default_max_tokens(),
        }
    }
}

fn default_timeout_ms() -> u64 {
    8000
}

fn default_max_elements() -> usize {
    15
}

fn default_max_tokens() -> u32 {
    200
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogueConfig {
    #[serde(default = "default_role")]
    pub default_role: String,
    #[serde(default = "default_workflow")]
    pub default_workflow: String,
    /// TOML file with extra `[[workflows]]`; entries replace built-ins with the same id.
    #[serde(default)]
    pub workflows_file: Option<PathBuf>,
    /// TOML file with extra `[[roles]]`; entries replace built-ins with the same id.
    #[serde(default)]
    pub roles_file: Option<PathBuf>,
    /// JSON array of `{module, label, route}` records.
    #[serde(default)]
    pub atlas_file: Option<PathBuf>,
}

impl Default for CatalogueConfig {
    fn default() -> Self {
        Self {
            default_role: default_role(),
            default_workflow: default_workflow(),
            workflows_file: None,
            roles_file: None,
            atlas_file: None,
        }
    }
}

fn default_role() -> String {
    "General User".to_string()
}

fn default_workflow() -> String {
    "purchase order".to_string()
}

fn resolve_config_path() -> GuideResult<PathBuf> {
    if let Ok(exe) = std::env::current_exe() {
        if let Some(parent) = exe.parent() {
            let candidate = parent.join("config.toml");
            if candidate.exists() {
                tracing::debug!(path = %candidate.display(), "config found next to executable");
                return Ok(candidate);
            }
        }
    }

    let cwd = std::env::current_dir()?;
    let candidate = cwd.join("config.toml");
    if candidate.exists() {
        tracing::debug!(path = %candidate.display(), "config found in working directory");
        return Ok(candidate);
    }

    if let Some(dir) = dirs::config_dir() {
        let candidate = dir.join("erp-guide").join("config.toml");
        if candidate.exists() {
            tracing::debug!(path = %candidate.display(), "config found in user config directory");
            return Ok(candidate);
        }
    }

    Err(GuideError::Config(
        "config.toml not found next to executable, in working directory, or in user config directory".into(),
    ))
}

pub fn load_config() -> GuideResult<AppConfig> {
    let path = resolve_config_path()?;
    load_config_from(&path)
}

pub fn load_config_from(path: &Path) -> GuideResult<AppConfig> {
    let content = std::fs::read_to_string(path)?;
    let config: AppConfig = toml::from_str(&content)?;
    tracing::info!(
        path = %path.display(),
        provider = %config.llm.active_provider,
        timeout_ms = config.advisory.timeout_ms,
        "config loaded"
    );
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_uses_defaults() {
        let config: AppConfig = toml::from_str("").unwrap();
        assert_eq!(config.advisory.timeout_ms, 8000);
        assert_eq!(config.advisory.max_elements, 15);
        assert_eq!(config.catalogue.default_role, "General User");
        assert_eq!(config.catalogue.default_workflow, "purchase order");
        assert!(config.llm.providers.is_empty());
    }

    #[test]
    fn parses_providers_and_roles() {
        let text = r#"
            [llm]
            active_provider = "openai"

            [llm.providers.openai]
            display_name = "OpenAI"
            api_base = "https://api.openai.com/v1/chat/completions"
            model = "gpt-4o-mini"

            [llm.roles.analysis]
            provider = "openai"
            model = "gpt-4o"
            max_tokens = 250

            [advisory]
            timeout_ms = 3000
        "#;
        let config: AppConfig = toml::from_str(text).unwrap();
        let provider = &config.llm.providers["openai"];
        assert_eq!(provider.temperature, 0.2);
        let analysis = config.llm.roles.analysis.as_ref().unwrap();
        assert_eq!(analysis.max_tokens, Some(250));
        assert!(config.llm.roles.advisory.is_none());
        assert_eq!(config.advisory.timeout_ms, 3000);
        assert_eq!(config.advisory.max_elements, 15);
    }

    #[test]
    fn load_config_from_reads_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[catalogue]\ndefault_role = \"Accountant\"\n").unwrap();
        let config = load_config_from(&path).unwrap();
        assert_eq!(config.catalogue.default_role, "Accountant");
    }
}

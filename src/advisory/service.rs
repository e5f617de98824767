use std::sync::Arc;

use async_trait::async_trait;

use crate::errors::GuideResult;
use crate::llm::registry::ProviderRegistry;
use crate::llm::types::ChatMessage;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdvisoryPurpose {
    /// Next-step coaching inside a workflow.
    Advisory,
    /// Turning a job description into a starter tutorial.
    Analysis,
}

impl AdvisoryPurpose {
    /// Key under `[llm.roles.*]`.
    pub fn as_str(self) -> &'static str {
        match self {
            AdvisoryPurpose::Advisory => "advisory",
            AdvisoryPurpose::Analysis => "analysis",
        }
    }
}

/// Structured prompt handed to the advisory collaborator.
#[derive(Debug, Clone, PartialEq)]
pub struct PromptContext {
    pub purpose: AdvisoryPurpose,
    pub system: String,
    pub user: String,
}

/// External free-text advisor. Replies are untrusted: they may be empty,
/// malformed, or never arrive.
#[async_trait]
pub trait AdvisoryService: Send + Sync {
    async fn generate_advice(&self, prompt: &PromptContext) -> GuideResult<String>;
}

/// Advisory backed by the configured LLM providers. The registry is built
/// once at startup and only read afterwards.
pub struct LlmAdvisory {
    registry: Arc<ProviderRegistry>,
}

impl LlmAdvisory {
    pub fn new(registry: Arc<ProviderRegistry>) -> Self {
        Self { registry }
    }
}

#[async_trait]
impl AdvisoryService for LlmAdvisory {
    async fn generate_advice(&self, prompt: &PromptContext) -> GuideResult<String> {
        let (provider, cfg) = self.registry.call_config_for(prompt.purpose.as_str())?;

        let messages = vec![
            ChatMessage::system(prompt.system.clone()),
            ChatMessage::user(prompt.user.clone()),
        ];
        let response = provider.chat(messages, &cfg).await?;
        if response.content.trim().is_empty() {
            tracing::warn!(
                purpose = prompt.purpose.as_str(),
                provider = provider.name(),
                "advisory reply was empty"
            );
        }
        Ok(response.content)
    }
}

use async_trait::async_trait;

use crate::errors::GuideResult;
use crate::llm::types::{CallConfig, ChatMessage, LlmResponse};

/// A text-generation backend the advisory layer can call.
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Key under `[llm.providers]`.
    fn name(&self) -> &str;

    /// Sends one non-streaming chat completion and returns the full reply.
    async fn chat(&self, messages: Vec<ChatMessage>, cfg: &CallConfig) -> GuideResult<LlmResponse>;
}

use async_trait::async_trait;

use crate::errors::{GuideError, GuideResult};
use crate::llm::provider::LlmProvider;
use crate::llm::types::{CallConfig, ChatMessage, LlmResponse};

pub struct OpenAiCompatibleProvider {
    id: String,
    api_base: String,
    api_key: String,
    client: reqwest::Client,
}

impl OpenAiCompatibleProvider {
    pub fn new(id: String, api_base: String, api_key: String) -> Self {
        Self {
            id,
            api_base,
            api_key,
            client: reqwest::Client::new(),
        }
    }
}

#[async_trait]
impl LlmProvider for OpenAiCompatibleProvider {
    fn name(&self) -> &str {
        &self.id
    }

    async fn chat(&self, messages: Vec<ChatMessage>, cfg: &CallConfig) -> GuideResult<LlmResponse> {
        let body = serde_json::json!({
            "model": cfg.model,
            "messages": &messages,
            "stream": false,
            "temperature": cfg.temperature,
            "max_tokens": cfg.max_tokens,
        });

        tracing::debug!(
            provider = %self.id,
            model = %cfg.model,
            messages = messages.len(),
            max_tokens = cfg.max_tokens,
            "sending LLM request"
        );

        let response = self
            .client
            .post(&self.api_base)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let err_body = response.text().await.unwrap_or_default();
            return Err(GuideError::LlmProvider(format!("{}: {}", status, err_body)));
        }

        let json: serde_json::Value = response.json().await?;
        let reply = extract_reply(&json)?;

        tracing::info!(
            provider = %self.id,
            content_len = reply.content.len(),
            finish_reason = ?reply.finish_reason,
            "LLM JSON response received"
        );

        Ok(reply)
    }
}

/// Pull the first choice's message out of an OpenAI-compatible completion body.
fn extract_reply(json: &serde_json::Value) -> GuideResult<LlmResponse> {
    if let Some(message) = json["error"]["message"].as_str() {
        return Err(GuideError::LlmProvider(message.to_string()));
    }

    let first = json["choices"]
        .as_array()
        .and_then(|choices| choices.first())
        .ok_or_else(|| GuideError::LlmProvider("response contained no choices".into()))?;

    Ok(LlmResponse {
        content: first["message"]["content"].as_str().unwrap_or("").to_string(),
        finish_reason: first["finish_reason"].as_str().map(|s| s.to_string()),
    })
}

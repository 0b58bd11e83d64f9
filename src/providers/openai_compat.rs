//! OpenAI-compatible API client.
//!
//! Talks to any provider implementing the OpenAI chat completions format:
//! OpenRouter, Anthropic's compat endpoint, OpenAI, DeepSeek, Groq, vLLM.

use anyhow::Result;
use async_trait::async_trait;
use reqwest::Client;
use tracing::debug;

use super::base::CompletionClient;
use crate::config::schema::ProviderConfig;
use crate::errors::AdjutantError;

pub struct OpenAICompatClient {
    api_key: String,
    api_base: String,
    model: String,
    client: Client,
}

impl OpenAICompatClient {
    /// Create a client from provider config.
    ///
    /// When no `api_base` is configured the endpoint is inferred from the
    /// key prefix, falling back to OpenRouter (which supports routed model
    /// names like "anthropic/claude-...").
    pub fn new(config: &ProviderConfig) -> Self {
        let api_key = config.api_key.clone();
        let api_base = if let Some(base) = &config.api_base {
            base.trim_end_matches('/').to_string()
        } else if api_key.starts_with("sk-or-") {
            "https://openrouter.ai/api/v1".to_string()
        } else if api_key.starts_with("sk-ant-") {
            "https://api.anthropic.com/v1".to_string()
        } else if api_key.starts_with("gsk_") {
            "https://api.groq.com/openai/v1".to_string()
        } else {
            "https://openrouter.ai/api/v1".to_string()
        };
        Self {
            api_key,
            api_base,
            model: config.model.clone(),
            client: Client::new(),
        }
    }
}

#[async_trait]
impl CompletionClient for OpenAICompatClient {
    async fn chat(
        &self,
        messages: &[serde_json::Value],
        max_tokens: u32,
        temperature: f64,
    ) -> Result<String> {
        let url = format!("{}/chat/completions", self.api_base);
        let body = serde_json::json!({
            "model": self.model,
            "messages": messages,
            "max_tokens": max_tokens,
            "temperature": temperature,
        });

        debug!(model = %self.model, "sending completion request");
        let resp = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await?;

        let status = resp.status();
        let payload: serde_json::Value = resp.json().await?;
        if !status.is_success() {
            let detail = payload["error"]["message"]
                .as_str()
                .unwrap_or("unknown error")
                .to_string();
            return Err(AdjutantError::Provider(format!("{status}: {detail}")).into());
        }

        payload["choices"][0]["message"]["content"]
            .as_str()
            .map(|s| s.to_string())
            .ok_or_else(|| AdjutantError::Provider("response missing content".to_string()).into())
    }

    fn model(&self) -> &str {
        &self.model
    }
}

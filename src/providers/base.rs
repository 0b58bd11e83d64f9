//! Base LLM completion interface.

use anyhow::Result;
use async_trait::async_trait;

/// Abstract chat completion client.
///
/// The router and planner only ever need a buffered text completion; the
/// trait stays narrow so tests can substitute a canned implementation.
#[async_trait]
pub trait CompletionClient: Send + Sync {
    /// Send a chat completion request.
    ///
    /// `messages` are OpenAI-style `{"role": ..., "content": ...}` objects.
    async fn chat(
        &self,
        messages: &[serde_json::Value],
        max_tokens: u32,
        temperature: f64,
    ) -> Result<String>;

    /// Model identifier this client sends by default.
    fn model(&self) -> &str;
}

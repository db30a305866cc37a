//! LLM provider trait for text completion

use async_trait::async_trait;

use crate::error::Result;

/// Sampling parameters for a completion
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SamplingParams {
    pub temperature: f32,
    pub max_tokens: u32,
}

/// A single system + user completion request
#[derive(Debug, Clone)]
pub struct CompletionRequest {
    pub system_prompt: String,
    pub user_message: String,
    pub params: SamplingParams,
}

/// Trait for hosted text generation
///
/// Implementations:
/// - `OpenAiLlm`: OpenAI-compatible chat completions
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Complete the request; `None` when the model returned no content
    async fn complete(&self, request: &CompletionRequest) -> Result<Option<String>>;

    /// Check if the provider is healthy and available
    async fn health_check(&self) -> Result<bool>;

    /// Get provider name for logging
    fn name(&self) -> &str;

    /// Get the model being used
    fn model(&self) -> &str;
}

//! Answer generation over reranked context

pub mod citation;
pub mod extractive;
pub mod prompt;

pub use citation::{cited_sources, strip_invalid_citations};
pub use extractive::ExtractiveGenerator;
pub use prompt::PromptBuilder;

use async_trait::async_trait;
use std::sync::Arc;

use crate::config::LlmConfig;
use crate::error::Result;
use crate::providers::{LlmProvider, SamplingParams};
use crate::types::RerankedMatch;

/// Answer used when generation produced nothing
pub const FALLBACK_ANSWER: &str = "I couldn't find a specific answer in the provided text.";

/// Trait for producing an answer with `[n]` citations from reranked context
#[async_trait]
pub trait AnswerGenerator: Send + Sync {
    /// Answer `query` from `context`; markers refer to 1-based context positions
    async fn generate(&self, query: &str, context: &[RerankedMatch]) -> Result<String>;

    /// Check if the generator is healthy and available
    async fn health_check(&self) -> Result<bool>;

    /// Get generator name for logging
    fn name(&self) -> &str;
}

/// Generates answers with a single LLM completion
pub struct LlmAnswerGenerator {
    llm: Arc<dyn LlmProvider>,
    params: SamplingParams,
}

impl LlmAnswerGenerator {
    pub fn new(llm: Arc<dyn LlmProvider>, params: SamplingParams) -> Self {
        Self { llm, params }
    }

    /// Sampling parameters from the `[llm]` section
    pub fn from_config(llm: Arc<dyn LlmProvider>, config: &LlmConfig) -> Self {
        Self::new(
            llm,
            SamplingParams {
                temperature: config.temperature,
                max_tokens: config.max_tokens,
            },
        )
    }
}

#[async_trait]
impl AnswerGenerator for LlmAnswerGenerator {
    async fn generate(&self, query: &str, context: &[RerankedMatch]) -> Result<String> {
        let request = PromptBuilder::build_request(query, context, self.params);

        match self.llm.complete(&request).await? {
            Some(answer) if !answer.trim().is_empty() => Ok(answer.trim().to_string()),
            _ => {
                tracing::warn!("{} returned no content, using fallback answer", self.llm.model());
                Ok(FALLBACK_ANSWER.to_string())
            }
        }
    }

    async fn health_check(&self) -> Result<bool> {
        self.llm.health_check().await
    }

    fn name(&self) -> &str {
        self.llm.name()
    }
}

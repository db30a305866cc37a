//! Prompt templates for grounded answer generation

use crate::providers::{CompletionRequest, SamplingParams};
use crate::types::RerankedMatch;

/// Prompt builder for RAG queries
pub struct PromptBuilder;

impl PromptBuilder {
    /// Numbered context blocks, `[1] text` through `[n] text`
    pub fn build_context(matches: &[RerankedMatch]) -> String {
        matches
            .iter()
            .enumerate()
            .map(|(i, m)| format!("[{}] {}", i + 1, m.retrieved.chunk_text.trim()))
            .collect::<Vec<_>>()
            .join("\n\n")
    }

    /// System instruction embedding the context
    pub fn build_system_prompt(context: &str) -> String {
        format!(
            r#"You are a helpful assistant that answers questions using ONLY the context below.

RULES:
1. Use only information explicitly stated in the context
2. If the context does not contain the answer, say so plainly
3. Cite every claim with the bracket number of its context block, e.g. [1] or [2]
4. Only cite numbers that appear in the context

CONTEXT:
{context}"#,
            context = context
        )
    }

    /// Complete single-call request for `query` over `matches`
    pub fn build_request(
        query: &str,
        matches: &[RerankedMatch],
        params: SamplingParams,
    ) -> CompletionRequest {
        CompletionRequest {
            system_prompt: Self::build_system_prompt(&Self::build_context(matches)),
            user_message: query.trim().to_string(),
            params,
        }
    }
}

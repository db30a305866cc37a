//! Rerank provider trait for second-pass relevance scoring

use async_trait::async_trait;

use crate::error::Result;

/// One reranked candidate
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RerankHit {
    /// Position of the candidate in the input slice
    pub index: usize,
    /// Relevance assigned by the reranker
    pub relevance_score: f32,
}

/// Trait for reranking retrieval candidates against the query
///
/// Implementations:
/// - `CohereReranker`: hosted Cohere rerank API
/// - `TermOverlapReranker`: offline query-term overlap
#[async_trait]
pub trait RerankProvider: Send + Sync {
    /// Return at most `top_n` hits, most relevant first
    async fn rerank(&self, query: &str, documents: &[String], top_n: usize)
        -> Result<Vec<RerankHit>>;

    /// Check if the provider is healthy
    async fn health_check(&self) -> Result<bool>;

    /// Get provider name for logging
    fn name(&self) -> &str;
}

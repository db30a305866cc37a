//! Embedding provider trait for generating text embeddings

use async_trait::async_trait;

use crate::error::Result;
use crate::types::EmbeddingVector;

/// Trait for generating text embeddings
///
/// Implementations:
/// - `OpenAiEmbedder`: hosted OpenAI-compatible embeddings API
/// - `HashingEmbedder`: offline token-hash vectors
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Generate embedding for a single text
    async fn embed(&self, text: &str) -> Result<EmbeddingVector>;

    /// Generate embeddings for multiple texts (batch)
    ///
    /// Default implementation calls `embed` sequentially.
    /// Implementations should override for better performance.
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<EmbeddingVector>> {
        let mut embeddings = Vec::with_capacity(texts.len());
        for text in texts {
            embeddings.push(self.embed(text).await?);
        }
        Ok(embeddings)
    }

    /// Embedding dimensions
    fn dimensions(&self) -> usize;

    /// One-time preparation before the first request
    ///
    /// Called behind a single-flight guard, so implementations may do
    /// expensive work here. Default probes the provider and only warns
    /// when the probe fails.
    async fn warm_up(&self) -> Result<()> {
        if !self.health_check().await? {
            tracing::warn!("Embedding provider {} failed its health probe", self.name());
        }
        Ok(())
    }

    /// Check if the provider is healthy and available
    async fn health_check(&self) -> Result<bool>;

    /// Get provider name for logging
    fn name(&self) -> &str;
}

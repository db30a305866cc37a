//! Provider abstractions for embeddings, vector storage, reranking, and LLM
//!
//! Each pipeline stage talks to one trait object, so hosted services and
//! the offline keyword strategies are interchangeable.

pub mod cohere;
pub mod embedding;
pub mod llm;
pub mod local;
pub mod openai;
pub mod pinecone;
pub mod reranker;
pub mod vector_store;

pub use embedding::EmbeddingProvider;
pub use llm::{CompletionRequest, LlmProvider, SamplingParams};
pub use reranker::{RerankHit, RerankProvider};
pub use vector_store::{VectorRecord, VectorStoreProvider};

use std::time::Duration;

use crate::error::{Error, Result};

/// Shared HTTP client settings for hosted providers
pub(crate) fn http_client(timeout_secs: u64) -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .pool_max_idle_per_host(5)
        .build()
        .map_err(|e| Error::config(format!("Failed to create HTTP client: {}", e)))
}

/// Strip trailing slashes so paths can be appended with `format!`
pub(crate) fn trim_base_url(url: &str) -> String {
    url.trim_end_matches('/').to_string()
}

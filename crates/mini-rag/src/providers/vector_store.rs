//! Vector store provider trait for upserting and querying chunk vectors

use async_trait::async_trait;
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::error::Result;
use crate::types::{Chunk, EmbeddingVector, RetrievedMatch};

/// A vector ready to be written to the index
#[derive(Debug, Clone)]
pub struct VectorRecord {
    /// Vector id (the chunk id)
    pub id: Uuid,
    /// Embedding values
    pub values: EmbeddingVector,
    /// Metadata stored alongside the vector (chunk text, ordinal, request id)
    pub metadata: Map<String, Value>,
}

impl VectorRecord {
    /// Pair a chunk with its embedding
    pub fn from_chunk(chunk: &Chunk, values: EmbeddingVector) -> Self {
        Self {
            id: chunk.id,
            values,
            metadata: chunk.to_vector_metadata(),
        }
    }
}

/// Trait for vector storage and similarity search against a named index
///
/// Implementations:
/// - `PineconeVectorStore`: hosted Pinecone index
/// - `InMemoryVectorStore`: process-local brute-force cosine search
#[async_trait]
pub trait VectorStoreProvider: Send + Sync {
    /// Write all vectors; fails as a whole on any error
    async fn upsert(&self, records: &[VectorRecord]) -> Result<()>;

    /// Nearest neighbours of `vector`, best first, at most `top_k`
    ///
    /// With `request_filter` set only vectors written by that request are
    /// considered.
    async fn query(
        &self,
        vector: &[f32],
        top_k: usize,
        request_filter: Option<Uuid>,
    ) -> Result<Vec<RetrievedMatch>>;

    /// Remove every vector written by `request_id`
    ///
    /// Default does nothing; hosted indexes are cleaned up out of band.
    async fn delete_request(&self, _request_id: Uuid) -> Result<()> {
        Ok(())
    }

    /// Check if the provider is healthy
    async fn health_check(&self) -> Result<bool>;

    /// Get provider name for logging
    fn name(&self) -> &str;
}

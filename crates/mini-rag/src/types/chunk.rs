//! Chunk type and its vector-store metadata

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use uuid::Uuid;

/// Embedding vector for a chunk or query
pub type EmbeddingVector = Vec<f32>;

/// Metadata keys written alongside every vector
pub mod meta {
    pub const TEXT: &str = "text";
    pub const ORDINAL: &str = "ordinal";
    pub const TOTAL_CHUNKS: &str = "total_chunks";
    pub const REQUEST_ID: &str = "request_id";
    pub const CREATED_AT: &str = "created_at";
}

/// A bounded segment of the request text
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Chunk {
    /// Vector id (random v4, unique across concurrent requests)
    pub id: Uuid,
    /// Request that produced the chunk
    pub request_id: Uuid,
    /// Text content
    pub text: String,
    /// Zero-based position within the request text
    pub ordinal: usize,
    /// Number of chunks the text was split into
    pub total_chunks: usize,
}

impl Chunk {
    /// Create a new chunk with a fresh id
    pub fn new(request_id: Uuid, text: String, ordinal: usize, total_chunks: usize) -> Self {
        Self {
            id: Uuid::new_v4(),
            request_id,
            text,
            ordinal,
            total_chunks,
        }
    }

    /// Convert to vector metadata for storage
    pub fn to_vector_metadata(&self) -> Map<String, Value> {
        let mut metadata = Map::new();
        metadata.insert(meta::TEXT.to_string(), json!(self.text));
        metadata.insert(meta::ORDINAL.to_string(), json!(self.ordinal));
        metadata.insert(meta::TOTAL_CHUNKS.to_string(), json!(self.total_chunks));
        metadata.insert(meta::REQUEST_ID.to_string(), json!(self.request_id.to_string()));
        metadata.insert(
            meta::CREATED_AT.to_string(),
            json!(chrono::Utc::now().to_rfc3339()),
        );
        metadata
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chunk_ids_are_unique() {
        let request_id = Uuid::new_v4();
        let a = Chunk::new(request_id, "a".to_string(), 0, 2);
        let b = Chunk::new(request_id, "b".to_string(), 1, 2);
        assert_ne!(a.id, b.id);
    }

    #[test]
    fn test_vector_metadata_carries_text_and_request() {
        let request_id = Uuid::new_v4();
        let chunk = Chunk::new(request_id, "Deforestation releases carbon.".to_string(), 1, 3);
        let metadata = chunk.to_vector_metadata();

        assert_eq!(metadata[meta::TEXT], "Deforestation releases carbon.");
        assert_eq!(metadata[meta::ORDINAL], 1);
        assert_eq!(metadata[meta::TOTAL_CHUNKS], 3);
        assert_eq!(metadata[meta::REQUEST_ID], request_id.to_string());
        assert!(metadata.contains_key(meta::CREATED_AT));
    }
}

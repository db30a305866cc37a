//! Local provider implementations for offline use
//!
//! Keyword strategies that satisfy the same contracts as the hosted
//! services, so the pipeline runs without network access or credentials.

use async_trait::async_trait;
use dashmap::DashMap;
use sha2::{Digest, Sha256};
use std::collections::HashSet;
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::keywords;
use crate::types::chunk::meta;
use crate::types::{EmbeddingVector, RetrievedMatch};

use super::embedding::EmbeddingProvider;
use super::reranker::{RerankHit, RerankProvider};
use super::vector_store::{VectorRecord, VectorStoreProvider};

/// Bag-of-words embedder that hashes each keyword into a fixed bucket
pub struct HashingEmbedder {
    dimensions: usize,
}

impl HashingEmbedder {
    /// Create a new hashing embedder
    pub fn new(dimensions: usize) -> Self {
        Self {
            dimensions: dimensions.max(1),
        }
    }

    fn bucket(&self, token: &str) -> usize {
        let digest = Sha256::digest(token.as_bytes());
        let mut prefix = [0u8; 8];
        prefix.copy_from_slice(&digest[..8]);
        (u64::from_le_bytes(prefix) % self.dimensions as u64) as usize
    }
}

#[async_trait]
impl EmbeddingProvider for HashingEmbedder {
    async fn embed(&self, text: &str) -> Result<EmbeddingVector> {
        let mut vector = vec![0.0f32; self.dimensions];
        for token in keywords::tokenize(text) {
            vector[self.bucket(&token)] += 1.0;
        }

        let norm = vector.iter().map(|v| v * v).sum::<f32>().sqrt();
        if norm > 0.0 {
            for v in &mut vector {
                *v /= norm;
            }
        }
        Ok(vector)
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    async fn health_check(&self) -> Result<bool> {
        Ok(true)
    }

    fn name(&self) -> &str {
        "local-hashing"
    }
}

struct StoredVector {
    values: EmbeddingVector,
    text: String,
    request_id: Option<Uuid>,
}

/// Process-local vector index with brute-force cosine search
///
/// Vectors stay until `delete_request` removes the request that wrote them.
#[derive(Default)]
pub struct InMemoryVectorStore {
    vectors: DashMap<Uuid, StoredVector>,
}

impl InMemoryVectorStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored vectors
    pub fn len(&self) -> usize {
        self.vectors.len()
    }

    /// Whether the store is empty
    pub fn is_empty(&self) -> bool {
        self.vectors.is_empty()
    }
}

#[async_trait]
impl VectorStoreProvider for InMemoryVectorStore {
    async fn upsert(&self, records: &[VectorRecord]) -> Result<()> {
        for record in records {
            let text = record
                .metadata
                .get(meta::TEXT)
                .and_then(|v| v.as_str())
                .ok_or_else(|| Error::vector_db(format!("Vector {} has no text metadata", record.id)))?
                .to_string();
            let request_id = record
                .metadata
                .get(meta::REQUEST_ID)
                .and_then(|v| v.as_str())
                .and_then(|s| Uuid::parse_str(s).ok());

            self.vectors.insert(
                record.id,
                StoredVector {
                    values: record.values.clone(),
                    text,
                    request_id,
                },
            );
        }
        Ok(())
    }

    async fn query(
        &self,
        vector: &[f32],
        top_k: usize,
        request_filter: Option<Uuid>,
    ) -> Result<Vec<RetrievedMatch>> {
        let mut matches: Vec<RetrievedMatch> = self
            .vectors
            .iter()
            .filter(|entry| request_filter.map_or(true, |id| entry.request_id == Some(id)))
            .map(|entry| RetrievedMatch {
                chunk_text: entry.text.clone(),
                similarity_score: cosine_similarity(vector, &entry.values),
                external_id: entry.key().to_string(),
            })
            .collect();

        matches.sort_by(|a, b| {
            b.similarity_score
                .total_cmp(&a.similarity_score)
                .then_with(|| a.external_id.cmp(&b.external_id))
        });
        matches.truncate(top_k);
        Ok(matches)
    }

    async fn delete_request(&self, request_id: Uuid) -> Result<()> {
        self.vectors.retain(|_, v| v.request_id != Some(request_id));
        Ok(())
    }

    async fn health_check(&self) -> Result<bool> {
        Ok(true)
    }

    fn name(&self) -> &str {
        "local-memory"
    }
}

/// Cosine similarity; 0.0 when either vector is zero or lengths differ
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() {
        return 0.0;
    }

    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        0.0
    } else {
        dot / (norm_a * norm_b)
    }
}

/// Scores each candidate by the fraction of query keywords it contains
#[derive(Debug, Clone, Copy, Default)]
pub struct TermOverlapReranker;

#[async_trait]
impl RerankProvider for TermOverlapReranker {
    async fn rerank(
        &self,
        query: &str,
        documents: &[String],
        top_n: usize,
    ) -> Result<Vec<RerankHit>> {
        let query_terms = keywords::keyword_set(query);

        let mut hits: Vec<RerankHit> = documents
            .iter()
            .enumerate()
            .map(|(index, doc)| {
                let doc_terms: HashSet<String> = keywords::keyword_set(doc);
                let relevance_score = if query_terms.is_empty() {
                    0.0
                } else {
                    query_terms.intersection(&doc_terms).count() as f32 / query_terms.len() as f32
                };
                RerankHit {
                    index,
                    relevance_score,
                }
            })
            .collect();

        // Stable: ties keep retrieval order
        hits.sort_by(|a, b| b.relevance_score.total_cmp(&a.relevance_score));
        hits.truncate(top_n);
        Ok(hits)
    }

    async fn health_check(&self) -> Result<bool> {
        Ok(true)
    }

    fn name(&self) -> &str {
        "local-term-overlap"
    }
}

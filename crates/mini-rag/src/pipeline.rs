//! Request pipeline: chunk, embed, upsert, retrieve, rerank, generate

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Instant;
use uuid::Uuid;

use crate::config::{BackendProvider, Credentials, RagConfig, RetrievalConfig};
use crate::error::{Error, Result};
use crate::generation::{
    cited_sources, strip_invalid_citations, AnswerGenerator, ExtractiveGenerator,
    LlmAnswerGenerator,
};
use crate::ingestion::TextChunker;
use crate::providers::{
    cohere::CohereReranker,
    local::{HashingEmbedder, InMemoryVectorStore, TermOverlapReranker},
    openai::{OpenAiEmbedder, OpenAiLlm},
    pinecone::PineconeVectorStore,
    EmbeddingProvider, RerankHit, RerankProvider, VectorRecord, VectorStoreProvider,
};
use crate::types::{AnswerResult, RerankedMatch, RetrievedMatch, ValidatedRequest};

/// The collaborators behind each stage
#[derive(Clone)]
pub struct Stages {
    pub embedder: Arc<dyn EmbeddingProvider>,
    pub vector_store: Arc<dyn VectorStoreProvider>,
    pub reranker: Arc<dyn RerankProvider>,
    pub generator: Arc<dyn AnswerGenerator>,
}

impl Stages {
    /// Offline keyword strategies
    pub fn local(config: &RagConfig) -> Self {
        Self {
            embedder: Arc::new(HashingEmbedder::new(config.embeddings.local_dimensions)),
            vector_store: Arc::new(InMemoryVectorStore::new()),
            reranker: Arc::new(TermOverlapReranker),
            generator: Arc::new(ExtractiveGenerator),
        }
    }

    /// Hosted services; each client receives only its own key
    pub fn hosted(config: &RagConfig, credentials: &Credentials) -> Result<Self> {
        let openai_key = require(&credentials.openai_api_key, "OPENAI_API_KEY")?;
        let pinecone_key = require(&credentials.pinecone_api_key, "PINECONE_API_KEY")?;
        let cohere_key = require(&credentials.cohere_api_key, "COHERE_API_KEY")?;

        let llm = Arc::new(OpenAiLlm::new(&config.llm, openai_key)?);

        Ok(Self {
            embedder: Arc::new(OpenAiEmbedder::new(&config.embeddings, openai_key)?),
            vector_store: Arc::new(PineconeVectorStore::new(&config.vector_db, pinecone_key)?),
            reranker: Arc::new(CohereReranker::new(&config.reranker, cohere_key)?),
            generator: Arc::new(LlmAnswerGenerator::from_config(llm, &config.llm)),
        })
    }

    /// Stages for the configured backend
    pub fn for_backend(config: &RagConfig, credentials: &Credentials) -> Result<Self> {
        match config.backend {
            BackendProvider::Local => {
                tracing::info!("Using local backend (hashing embedder + in-memory index)");
                Ok(Self::local(config))
            }
            BackendProvider::Hosted => {
                tracing::info!(
                    "Using hosted backend (embeddings: {}, rerank: {}, llm: {})",
                    config.embeddings.model,
                    config.reranker.model,
                    config.llm.model
                );
                Self::hosted(config, credentials)
            }
        }
    }
}

fn require<'a>(key: &'a Option<String>, name: &str) -> Result<&'a str> {
    key.as_deref()
        .ok_or_else(|| Error::config(format!("{} is not set", name)))
}

/// Single-endpoint RAG pipeline
pub struct RagPipeline {
    chunker: TextChunker,
    stages: Stages,
    retrieval: RetrievalConfig,
}

impl RagPipeline {
    pub fn new(config: &RagConfig, stages: Stages) -> Self {
        Self {
            chunker: TextChunker::from_config(&config.chunking),
            stages,
            retrieval: config.retrieval.clone(),
        }
    }

    /// Build the pipeline for the configured backend
    pub fn from_config(config: &RagConfig, credentials: &Credentials) -> Result<Self> {
        Ok(Self::new(config, Stages::for_backend(config, credentials)?))
    }

    pub fn stages(&self) -> &Stages {
        &self.stages
    }

    /// Prepare the embedder and probe every other collaborator
    ///
    /// A probe that reports the service unavailable is only logged.
    pub async fn warm_up(&self) -> Result<()> {
        let start = Instant::now();
        self.stages.embedder.warm_up().await?;

        let stages = &self.stages;
        let probes = [
            (
                "Vector store",
                stages.vector_store.name(),
                stages.vector_store.health_check().await?,
            ),
            (
                "Reranker",
                stages.reranker.name(),
                stages.reranker.health_check().await?,
            ),
            (
                "Generator",
                stages.generator.name(),
                stages.generator.health_check().await?,
            ),
        ];
        for (stage, name, healthy) in probes {
            if !healthy {
                tracing::warn!("{} {} failed its health probe", stage, name);
            }
        }

        tracing::info!(
            "Providers ready in {}ms (embedder: {}, index: {}, reranker: {}, generator: {})",
            start.elapsed().as_millis(),
            self.stages.embedder.name(),
            self.stages.vector_store.name(),
            self.stages.reranker.name(),
            self.stages.generator.name()
        );
        Ok(())
    }

    /// Embed the query and fetch its nearest chunks
    async fn retrieve(&self, query: &str, filter: Option<Uuid>) -> Result<Vec<RetrievedMatch>> {
        let query_vector = self.stages.embedder.embed(query).await?;
        self.stages
            .vector_store
            .query(&query_vector, self.retrieval.top_k, filter)
            .await
    }

    /// Drop the vectors of a finished request
    async fn release(&self, request_id: Uuid) {
        if let Err(e) = self.stages.vector_store.delete_request(request_id).await {
            tracing::warn!("Failed to remove vectors of request {}: {}", request_id, e);
        }
    }

    /// Answer `request.query` from `request.text`
    ///
    /// Any collaborator failure aborts the request. With isolated requests
    /// the request's vectors are removed once retrieval has run.
    pub async fn answer(&self, request: &ValidatedRequest) -> Result<AnswerResult> {
        let start = Instant::now();
        let request_id = Uuid::new_v4();

        tracing::info!(
            "RAG request {} ({} chars of text)",
            request_id,
            request.text.chars().count()
        );
        tracing::debug!("RAG request {} query: \"{}\"", request_id, request.query);

        let chunks = self.chunker.chunk(request_id, &request.text);
        if chunks.is_empty() {
            return Ok(AnswerResult::no_relevant_information());
        }
        tracing::debug!("Split text into {} chunks", chunks.len());

        let texts: Vec<String> = chunks.iter().map(|c| c.text.clone()).collect();
        let embeddings = self.stages.embedder.embed_batch(&texts).await?;
        if embeddings.len() != chunks.len() {
            return Err(Error::embedding(format!(
                "Expected {} embeddings, got {}",
                chunks.len(),
                embeddings.len()
            )));
        }

        let records: Vec<VectorRecord> = chunks
            .iter()
            .zip(embeddings)
            .map(|(chunk, values)| VectorRecord::from_chunk(chunk, values))
            .collect();
        self.stages.vector_store.upsert(&records).await?;
        tracing::debug!("Upserted {} vectors to {}", records.len(), self.stages.vector_store.name());

        // Isolated vectors are unreachable once retrieval is done
        let filter = self.retrieval.isolate_requests.then_some(request_id);
        let retrieved = self.retrieve(&request.query, filter).await;
        if filter.is_some() {
            self.release(request_id).await;
        }
        let mut retrieved = retrieved?;

        let candidates = retrieved.len();
        retrieved.retain(|m| m.similarity_score > self.retrieval.similarity_threshold);
        tracing::debug!(
            "Retrieved {} matches, {} above threshold {}",
            candidates,
            retrieved.len(),
            self.retrieval.similarity_threshold
        );

        if retrieved.is_empty() {
            tracing::info!(
                "RAG request {} found no relevant chunks ({}ms)",
                request_id,
                start.elapsed().as_millis()
            );
            return Ok(AnswerResult::no_relevant_information());
        }

        let documents: Vec<String> = retrieved.iter().map(|m| m.chunk_text.clone()).collect();
        let hits = self
            .stages
            .reranker
            .rerank(&request.query, &documents, self.retrieval.top_n)
            .await?;
        let reranked = join_reranked(retrieved, &hits, self.retrieval.top_n)?;

        if reranked.is_empty() {
            return Ok(AnswerResult::no_relevant_information());
        }

        let answer = self.stages.generator.generate(&request.query, &reranked).await?;
        let answer = strip_invalid_citations(&answer, reranked.len());
        tracing::debug!("Answer cites sources {:?}", cited_sources(&answer));

        let result = AnswerResult::assemble(answer, &reranked);
        tracing::info!(
            "RAG request {} answered with {} sources from {} chunks in {}ms",
            request_id,
            result.sources.len(),
            chunks.len(),
            start.elapsed().as_millis()
        );
        Ok(result)
    }
}

/// Attach rerank scores to their retrieval matches, best first, at most `top_n`
fn join_reranked(
    retrieved: Vec<RetrievedMatch>,
    hits: &[RerankHit],
    top_n: usize,
) -> Result<Vec<RerankedMatch>> {
    let mut used = HashSet::new();
    let mut reranked = Vec::with_capacity(hits.len().min(top_n));

    for hit in hits {
        let candidate = retrieved.get(hit.index).ok_or_else(|| {
            Error::rerank(format!(
                "Rerank index {} out of range for {} candidates",
                hit.index,
                retrieved.len()
            ))
        })?;
        if !used.insert(hit.index) {
            continue;
        }
        reranked.push(RerankedMatch {
            retrieved: candidate.clone(),
            rerank_score: hit.relevance_score,
        });
    }

    reranked.sort_by(|a, b| b.rerank_score.total_cmp(&a.rerank_score));
    reranked.truncate(top_n);
    Ok(reranked)
}

//! Configuration for the RAG pipeline

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

/// Main configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RagConfig {
    /// Which provider set backs the pipeline stages
    pub backend: BackendProvider,
    /// Server configuration
    pub server: ServerConfig,
    /// Chunking configuration
    pub chunking: ChunkingConfig,
    /// Retrieval and rerank cut-offs
    pub retrieval: RetrievalConfig,
    /// Embedding service configuration
    pub embeddings: EmbeddingConfig,
    /// Vector index configuration
    pub vector_db: VectorDbConfig,
    /// Reranking service configuration
    pub reranker: RerankConfig,
    /// Text generation configuration
    pub llm: LlmConfig,
}

/// Backend provider selection
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum BackendProvider {
    /// Offline keyword strategies (hashing embedder, in-memory index, extractive answers)
    #[default]
    Local,
    /// External SaaS (OpenAI embeddings + chat, Pinecone, Cohere rerank)
    Hosted,
}

impl std::str::FromStr for BackendProvider {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "local" => Ok(Self::Local),
            "hosted" => Ok(Self::Hosted),
            other => Err(Error::config(format!(
                "Unknown backend '{}', expected 'local' or 'hosted'",
                other
            ))),
        }
    }
}

impl std::fmt::Display for BackendProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Local => write!(f, "local"),
            Self::Hosted => write!(f, "hosted"),
        }
    }
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Host address
    pub host: String,
    /// Port number
    pub port: u16,
    /// Enable CORS
    pub enable_cors: bool,
    /// Maximum request body size in bytes
    pub max_body_size: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            enable_cors: true,
            max_body_size: 2 * 1024 * 1024, // 2MB
        }
    }
}

/// Text chunking configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChunkingConfig {
    /// Target chunk size in characters
    pub chunk_size: usize,
    /// Overlap between chunks in characters
    pub chunk_overlap: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            chunk_size: 500,
            chunk_overlap: 50,
        }
    }
}

/// Retrieval configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrievalConfig {
    /// Nearest neighbours requested from the vector index
    pub top_k: usize,
    /// Matches scoring at or below this are dropped
    pub similarity_threshold: f32,
    /// Sources kept after reranking
    pub top_n: usize,
    /// Restrict the query to vectors written by the same request
    pub isolate_requests: bool,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            top_k: 8,
            similarity_threshold: 0.2,
            top_n: 3,
            isolate_requests: true,
        }
    }
}

/// Embedding configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingConfig {
    /// OpenAI-compatible API base URL
    pub base_url: String,
    /// Model name
    pub model: String,
    /// Embedding dimensions reported by the hosted model
    pub dimensions: usize,
    /// Dimensions of the local hashing embedder
    pub local_dimensions: usize,
    /// Maximum in-flight embedding calls per request
    pub max_concurrency: usize,
    /// Request timeout in seconds
    pub timeout_secs: u64,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.openai.com/v1".to_string(),
            model: "text-embedding-3-small".to_string(),
            dimensions: 1536,
            local_dimensions: 384,
            max_concurrency: 4,
            timeout_secs: 30,
        }
    }
}

/// Vector index (Pinecone data plane) configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct VectorDbConfig {
    /// Index host, e.g. `https://my-index-abc123.svc.us-east-1.pinecone.io`
    pub index_host: Option<String>,
    /// Optional namespace inside the index
    pub namespace: Option<String>,
    /// Request timeout in seconds
    pub timeout_secs: Option<u64>,
}

/// Reranking (Cohere) configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RerankConfig {
    /// API base URL
    pub base_url: String,
    /// Rerank model
    pub model: String,
    /// Request timeout in seconds
    pub timeout_secs: u64,
}

impl Default for RerankConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.cohere.com".to_string(),
            model: "rerank-v3.5".to_string(),
            timeout_secs: 30,
        }
    }
}

/// Text generation configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    /// OpenAI-compatible API base URL
    pub base_url: String,
    /// Chat model name
    pub model: String,
    /// Sampling temperature (low for grounded answers)
    pub temperature: f32,
    /// Output token budget
    pub max_tokens: u32,
    /// Request timeout in seconds
    pub timeout_secs: u64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.openai.com/v1".to_string(),
            model: "gpt-4o-mini".to_string(),
            temperature: 0.2,
            max_tokens: 500,
            timeout_secs: 60,
        }
    }
}

/// API keys for the hosted collaborators, read from the environment only
#[derive(Clone, Default)]
pub struct Credentials {
    pub openai_api_key: Option<String>,
    pub pinecone_api_key: Option<String>,
    pub cohere_api_key: Option<String>,
}

impl Credentials {
    /// Read `OPENAI_API_KEY`, `PINECONE_API_KEY` and `COHERE_API_KEY`
    pub fn from_env() -> Self {
        Self {
            openai_api_key: non_empty_env("OPENAI_API_KEY"),
            pinecone_api_key: non_empty_env("PINECONE_API_KEY"),
            cohere_api_key: non_empty_env("COHERE_API_KEY"),
        }
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mask = |k: &Option<String>| if k.is_some() { "<set>" } else { "<unset>" };
        f.debug_struct("Credentials")
            .field("openai_api_key", &mask(&self.openai_api_key))
            .field("pinecone_api_key", &mask(&self.pinecone_api_key))
            .field("cohere_api_key", &mask(&self.cohere_api_key))
            .finish()
    }
}

fn non_empty_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

impl RagConfig {
    /// Default config file location (`<config dir>/mini-rag/config.toml`)
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join("mini-rag").join("config.toml"))
    }

    /// Parse a TOML document; missing sections fall back to defaults
    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| Error::config(format!("Invalid config: {}", e)))
    }

    /// Load from an explicit file, or the default location if present,
    /// then apply environment overrides
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => {
                let content = std::fs::read_to_string(path).map_err(|e| {
                    Error::config(format!("Failed to read {}: {}", path.display(), e))
                })?;
                Self::from_toml_str(&content)?
            }
            None => match Self::default_path().filter(|p| p.exists()) {
                Some(path) => {
                    tracing::info!("Loading config from {}", path.display());
                    Self::from_toml_str(&std::fs::read_to_string(&path)?)?
                }
                None => Self::default(),
            },
        };

        config.apply_env_overrides(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    /// Apply `MINI_RAG_*` and index overrides from a variable lookup
    pub fn apply_env_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(backend) = lookup("MINI_RAG_BACKEND") {
            self.backend = backend.parse()?;
        }
        if let Some(host) = lookup("MINI_RAG_HOST") {
            self.server.host = host;
        }
        if let Some(port) = lookup("MINI_RAG_PORT") {
            self.server.port = port
                .parse()
                .map_err(|_| Error::config(format!("Invalid MINI_RAG_PORT '{}'", port)))?;
        }
        if let Some(host) = lookup("PINECONE_INDEX_HOST") {
            self.vector_db.index_host = Some(host);
        }
        if let Some(namespace) = lookup("PINECONE_NAMESPACE") {
            self.vector_db.namespace = Some(namespace);
        }
        if let Some(model) = lookup("OPENAI_EMBEDDING_MODEL") {
            self.embeddings.model = model;
        }
        if let Some(model) = lookup("OPENAI_CHAT_MODEL") {
            self.llm.model = model;
        }
        if let Some(model) = lookup("COHERE_RERANK_MODEL") {
            self.reranker.model = model;
        }
        Ok(())
    }

    /// Check internal consistency and, for the hosted backend, that every
    /// collaborator has what it needs
    pub fn validate(&self, credentials: &Credentials) -> Result<()> {
        if self.chunking.chunk_size == 0 {
            return Err(Error::config("chunking.chunk_size must be greater than 0"));
        }
        if self.chunking.chunk_overlap >= self.chunking.chunk_size {
            return Err(Error::config(
                "chunking.chunk_overlap must be smaller than chunking.chunk_size",
            ));
        }
        if self.retrieval.top_k == 0 || self.retrieval.top_n == 0 {
            return Err(Error::config("retrieval.top_k and retrieval.top_n must be at least 1"));
        }
        if !(0.0..=1.0).contains(&self.retrieval.similarity_threshold) {
            return Err(Error::config(
                "retrieval.similarity_threshold must be within [0, 1]",
            ));
        }

        if self.backend == BackendProvider::Hosted {
            let mut missing = Vec::new();
            if credentials.openai_api_key.is_none() {
                missing.push("OPENAI_API_KEY");
            }
            if credentials.pinecone_api_key.is_none() {
                missing.push("PINECONE_API_KEY");
            }
            if credentials.cohere_api_key.is_none() {
                missing.push("COHERE_API_KEY");
            }
            if self.vector_db.index_host.is_none() {
                missing.push("PINECONE_INDEX_HOST");
            }
            if !missing.is_empty() {
                return Err(Error::config(format!(
                    "Hosted backend requires: {}",
                    missing.join(", ")
                )));
            }
        }

        Ok(())
    }
}

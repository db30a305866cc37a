//! Pinecone data-plane client

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use uuid::Uuid;

use crate::config::VectorDbConfig;
use crate::error::{Error, Result};
use crate::types::chunk::meta;
use crate::types::RetrievedMatch;

use super::vector_store::{VectorRecord, VectorStoreProvider};
use super::{http_client, trim_base_url};

/// Vectors per upsert request
const UPSERT_BATCH_SIZE: usize = 100;
const DEFAULT_TIMEOUT_SECS: u64 = 30;
const API_VERSION: &str = "2025-01";

#[derive(Serialize)]
struct UpsertVector<'a> {
    id: String,
    values: &'a [f32],
    metadata: &'a Map<String, Value>,
}

#[derive(Serialize)]
struct UpsertRequest<'a> {
    vectors: Vec<UpsertVector<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    namespace: Option<&'a str>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct QueryRequest<'a> {
    vector: &'a [f32],
    top_k: usize,
    include_metadata: bool,
    include_values: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    namespace: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    filter: Option<Value>,
}

#[derive(Deserialize)]
struct QueryResponse {
    #[serde(default)]
    matches: Vec<QueryMatch>,
}

#[derive(Deserialize)]
struct QueryMatch {
    id: String,
    #[serde(default)]
    score: f32,
    #[serde(default)]
    metadata: Option<Map<String, Value>>,
}

/// Vector store backed by a Pinecone index host
pub struct PineconeVectorStore {
    client: reqwest::Client,
    host: String,
    api_key: String,
    namespace: Option<String>,
}

impl PineconeVectorStore {
    /// Create a client for the configured index host
    pub fn new(config: &VectorDbConfig, api_key: impl Into<String>) -> Result<Self> {
        let host = config
            .index_host
            .as_deref()
            .ok_or_else(|| Error::config("vector_db.index_host is required"))?;

        Ok(Self {
            client: http_client(config.timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS))?,
            host: normalize_host(host),
            api_key: api_key.into(),
            namespace: config.namespace.clone().filter(|ns| !ns.is_empty()),
        })
    }

    async fn post<T: Serialize + ?Sized>(&self, path: &str, body: &T) -> Result<reqwest::Response> {
        let response = self
            .client
            .post(format!("{}{}", self.host, path))
            .header("Api-Key", &self.api_key)
            .header("X-Pinecone-API-Version", API_VERSION)
            .json(body)
            .send()
            .await
            .map_err(|e| Error::vector_db(format!("Pinecone request to {} failed: {}", path, e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::vector_db(format!(
                "Pinecone {} failed ({}): {}",
                path, status, body
            )));
        }

        Ok(response)
    }
}

/// Index hosts are shown without a scheme in the console
fn normalize_host(host: &str) -> String {
    let host = trim_base_url(host.trim());
    if host.starts_with("http://") || host.starts_with("https://") {
        host
    } else {
        format!("https://{}", host)
    }
}

/// Metadata filter matching vectors written by one request
fn request_id_filter(request_id: Uuid) -> Value {
    let mut filter = Map::new();
    filter.insert(
        meta::REQUEST_ID.to_string(),
        json!({ "$eq": request_id.to_string() }),
    );
    Value::Object(filter)
}

#[async_trait]
impl VectorStoreProvider for PineconeVectorStore {
    async fn upsert(&self, records: &[VectorRecord]) -> Result<()> {
        for batch in records.chunks(UPSERT_BATCH_SIZE) {
            let request = UpsertRequest {
                vectors: batch
                    .iter()
                    .map(|r| UpsertVector {
                        id: r.id.to_string(),
                        values: &r.values,
                        metadata: &r.metadata,
                    })
                    .collect(),
                namespace: self.namespace.as_deref(),
            };
            self.post("/vectors/upsert", &request).await?;
            tracing::debug!("Upserted {} vectors to Pinecone", batch.len());
        }
        Ok(())
    }

    async fn query(
        &self,
        vector: &[f32],
        top_k: usize,
        request_filter: Option<Uuid>,
    ) -> Result<Vec<RetrievedMatch>> {
        let request = QueryRequest {
            vector,
            top_k,
            include_metadata: true,
            include_values: false,
            namespace: self.namespace.as_deref(),
            filter: request_filter.map(request_id_filter),
        };

        let parsed: QueryResponse = self
            .post("/query", &request)
            .await?
            .json()
            .await
            .map_err(|e| Error::vector_db(format!("Failed to parse query response: {}", e)))?;

        let mut matches = Vec::with_capacity(parsed.matches.len());
        for m in parsed.matches {
            let text = m
                .metadata
                .as_ref()
                .and_then(|md| md.get(meta::TEXT))
                .and_then(|v| v.as_str());
            match text {
                Some(text) => matches.push(RetrievedMatch {
                    chunk_text: text.to_string(),
                    similarity_score: m.score,
                    external_id: m.id,
                }),
                None => tracing::warn!("Skipping match {} without text metadata", m.id),
            }
        }
        Ok(matches)
    }

    async fn health_check(&self) -> Result<bool> {
        Ok(self
            .post("/describe_index_stats", &json!({}))
            .await
            .is_ok())
    }

    fn name(&self) -> &str {
        "pinecone"
    }
}

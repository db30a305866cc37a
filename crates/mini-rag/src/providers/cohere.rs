//! Cohere rerank client

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::config::RerankConfig;
use crate::error::{Error, Result};

use super::reranker::{RerankHit, RerankProvider};
use super::{http_client, trim_base_url};

#[derive(Serialize)]
struct RerankRequest<'a> {
    model: &'a str,
    query: &'a str,
    documents: &'a [String],
    top_n: usize,
}

#[derive(Deserialize)]
struct RerankResponse {
    results: Vec<RerankResult>,
}

#[derive(Deserialize)]
struct RerankResult {
    index: usize,
    relevance_score: f32,
}

/// Reranker backed by `POST /v2/rerank`
pub struct CohereReranker {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    model: String,
}

impl CohereReranker {
    pub fn new(config: &RerankConfig, api_key: impl Into<String>) -> Result<Self> {
        Ok(Self {
            client: http_client(config.timeout_secs)?,
            base_url: trim_base_url(&config.base_url),
            api_key: api_key.into(),
            model: config.model.clone(),
        })
    }
}

#[async_trait]
impl RerankProvider for CohereReranker {
    async fn rerank(
        &self,
        query: &str,
        documents: &[String],
        top_n: usize,
    ) -> Result<Vec<RerankHit>> {
        if documents.is_empty() {
            return Ok(Vec::new());
        }

        let response = self
            .client
            .post(format!("{}/v2/rerank", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&RerankRequest {
                model: &self.model,
                query,
                documents,
                top_n: top_n.min(documents.len()),
            })
            .send()
            .await
            .map_err(|e| Error::rerank(format!("Rerank request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::rerank(format!("Rerank failed ({}): {}", status, body)));
        }

        let parsed: RerankResponse = response
            .json()
            .await
            .map_err(|e| Error::rerank(format!("Failed to parse rerank response: {}", e)))?;

        let mut hits = Vec::with_capacity(parsed.results.len());
        for result in parsed.results {
            if result.index >= documents.len() {
                return Err(Error::rerank(format!(
                    "Rerank result index {} out of range for {} documents",
                    result.index,
                    documents.len()
                )));
            }
            hits.push(RerankHit {
                index: result.index,
                relevance_score: result.relevance_score,
            });
        }
        Ok(hits)
    }

    async fn health_check(&self) -> Result<bool> {
        let response = self
            .client
            .get(format!("{}/v1/models/{}", self.base_url, self.model))
            .bearer_auth(&self.api_key)
            .send()
            .await;
        Ok(matches!(response, Ok(r) if r.status().is_success()))
    }

    fn name(&self) -> &str {
        "cohere"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_empty_documents_skip_request() {
        let config = RerankConfig {
            base_url: "http://127.0.0.1:9".to_string(),
            ..Default::default()
        };
        let reranker = CohereReranker::new(&config, "co-key").unwrap();
        let hits = reranker.rerank("query", &[], 3).await.unwrap();
        assert!(hits.is_empty());
    }
}

//! OpenAI-compatible providers for embeddings and chat completion

use async_trait::async_trait;
use futures::{stream, StreamExt, TryStreamExt};
use serde::{Deserialize, Serialize};

use crate::config::{EmbeddingConfig, LlmConfig};
use crate::error::{Error, Result};
use crate::types::EmbeddingVector;

use super::embedding::EmbeddingProvider;
use super::llm::{CompletionRequest, LlmProvider};
use super::{http_client, trim_base_url};

/// Inputs per embeddings request accepted by the API
const EMBEDDING_BATCH_LIMIT: usize = 2048;

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a [String],
}

#[derive(Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Deserialize)]
struct EmbeddingData {
    index: usize,
    embedding: Vec<f32>,
}

#[derive(Deserialize)]
struct ErrorResponse {
    error: ErrorDetail,
}

#[derive(Deserialize)]
struct ErrorDetail {
    message: String,
}

/// Prefer the API's own error message over the raw body
fn error_detail(body: String) -> String {
    serde_json::from_str::<ErrorResponse>(&body)
        .map(|e| e.error.message)
        .unwrap_or(body)
}

/// Embedding provider backed by `POST /embeddings`
pub struct OpenAiEmbedder {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    model: String,
    dimensions: usize,
    max_concurrency: usize,
}

impl OpenAiEmbedder {
    /// Create a new embedder holding only its own API key
    pub fn new(config: &EmbeddingConfig, api_key: impl Into<String>) -> Result<Self> {
        Ok(Self {
            client: http_client(config.timeout_secs)?,
            base_url: trim_base_url(&config.base_url),
            api_key: api_key.into(),
            model: config.model.clone(),
            dimensions: config.dimensions,
            max_concurrency: config.max_concurrency.max(1),
        })
    }

    async fn request_batch(&self, texts: &[String]) -> Result<Vec<EmbeddingVector>> {
        let response = self
            .client
            .post(format!("{}/embeddings", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&EmbeddingRequest {
                model: &self.model,
                input: texts,
            })
            .send()
            .await
            .map_err(|e| Error::embedding(format!("Embedding request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::embedding(format!(
                "Embedding failed ({}): {}",
                status,
                error_detail(body)
            )));
        }

        let mut parsed: EmbeddingResponse = response
            .json()
            .await
            .map_err(|e| Error::embedding(format!("Failed to parse embedding response: {}", e)))?;

        if parsed.data.len() != texts.len() {
            return Err(Error::embedding(format!(
                "Expected {} embeddings, got {}",
                texts.len(),
                parsed.data.len()
            )));
        }

        // The API does not promise input order
        parsed.data.sort_by_key(|d| d.index);
        Ok(parsed.data.into_iter().map(|d| d.embedding).collect())
    }
}

#[async_trait]
impl EmbeddingProvider for OpenAiEmbedder {
    async fn embed(&self, text: &str) -> Result<EmbeddingVector> {
        self.request_batch(&[text.to_string()])
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| Error::embedding("No embedding in response"))
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<EmbeddingVector>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        tracing::debug!(
            "Embedding {} texts with {} ({} per request)",
            texts.len(),
            self.model,
            EMBEDDING_BATCH_LIMIT
        );

        let calls: Vec<_> = texts
            .chunks(EMBEDDING_BATCH_LIMIT)
            .map(|batch| self.request_batch(batch))
            .collect();
        let batches: Vec<Vec<EmbeddingVector>> = stream::iter(calls)
            .buffered(self.max_concurrency)
            .try_collect()
            .await?;

        Ok(batches.into_iter().flatten().collect())
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    async fn health_check(&self) -> Result<bool> {
        let response = self
            .client
            .get(format!("{}/models/{}", self.base_url, self.model))
            .bearer_auth(&self.api_key)
            .send()
            .await;
        Ok(matches!(response, Ok(r) if r.status().is_success()))
    }

    fn name(&self) -> &str {
        "openai-embeddings"
    }
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
    max_tokens: u32,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Deserialize)]
struct ChatChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

/// LLM provider backed by `POST /chat/completions`
pub struct OpenAiLlm {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    model: String,
}

impl OpenAiLlm {
    /// Create a new chat client holding only its own API key
    pub fn new(config: &LlmConfig, api_key: impl Into<String>) -> Result<Self> {
        Ok(Self {
            client: http_client(config.timeout_secs)?,
            base_url: trim_base_url(&config.base_url),
            api_key: api_key.into(),
            model: config.model.clone(),
        })
    }
}

#[async_trait]
impl LlmProvider for OpenAiLlm {
    async fn complete(&self, request: &CompletionRequest) -> Result<Option<String>> {
        let body = ChatRequest {
            model: &self.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: &request.system_prompt,
                },
                ChatMessage {
                    role: "user",
                    content: &request.user_message,
                },
            ],
            temperature: request.params.temperature,
            max_tokens: request.params.max_tokens,
        };

        tracing::info!("Generating answer with model: {}", self.model);

        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| Error::llm(format!("Generation request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::llm(format!(
                "Generation failed ({}): {}",
                status,
                error_detail(body)
            )));
        }

        let parsed: ChatResponse = response
            .json()
            .await
            .map_err(|e| Error::llm(format!("Failed to parse generation response: {}", e)))?;

        Ok(parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content))
    }

    async fn health_check(&self) -> Result<bool> {
        let response = self
            .client
            .get(format!("{}/models/{}", self.base_url, self.model))
            .bearer_auth(&self.api_key)
            .send()
            .await;
        Ok(matches!(response, Ok(r) if r.status().is_success()))
    }

    fn name(&self) -> &str {
        "openai-chat"
    }

    fn model(&self) -> &str {
        &self.model
    }
}

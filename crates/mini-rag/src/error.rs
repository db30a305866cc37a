//! Error types for the RAG pipeline

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// Result type alias for pipeline operations
pub type Result<T> = std::result::Result<T, Error>;

/// Message returned to clients for every non-validation failure
pub const GENERIC_ERROR_MESSAGE: &str = "Error processing request";

/// RAG pipeline errors
#[derive(Debug, Error)]
pub enum Error {
    /// Request body failed validation
    #[error("{0}")]
    Validation(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Embedding service error
    #[error("Embedding generation failed: {0}")]
    Embedding(String),

    /// Vector index error
    #[error("Vector store error: {0}")]
    VectorDb(String),

    /// Reranking service error
    #[error("Rerank error: {0}")]
    Rerank(String),

    /// Text generation error
    #[error("LLM error: {0}")]
    Llm(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Create a validation error
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Create a config error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Create an embedding error
    pub fn embedding(message: impl Into<String>) -> Self {
        Self::Embedding(message.into())
    }

    /// Create a vector db error
    pub fn vector_db(message: impl Into<String>) -> Self {
        Self::VectorDb(message.into())
    }

    /// Create a rerank error
    pub fn rerank(message: impl Into<String>) -> Self {
        Self::Rerank(message.into())
    }

    /// Create an LLM error
    pub fn llm(message: impl Into<String>) -> Self {
        Self::Llm(message.into())
    }

    /// Create an internal error
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    /// Whether the caller is at fault (400) rather than the server (500)
    pub fn is_client_error(&self) -> bool {
        matches!(self, Self::Validation(_))
    }

    /// HTTP status this error maps to
    pub fn status_code(&self) -> StatusCode {
        if self.is_client_error() {
            StatusCode::BAD_REQUEST
        } else {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status = self.status_code();

        // Collaborator details stay in the log; clients only see a generic message.
        let message = match &self {
            Error::Validation(msg) => {
                tracing::debug!("Rejected request: {}", msg);
                msg.clone()
            }
            other => {
                tracing::error!("Request failed: {}", other);
                GENERIC_ERROR_MESSAGE.to_string()
            }
        };

        (status, Json(json!({ "error": message }))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn body_json(response: Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_validation_maps_to_bad_request() {
        let response = Error::validation("Missing text or query in request body").into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let body = body_json(response).await;
        assert_eq!(body["error"], "Missing text or query in request body");
    }

    #[tokio::test]
    async fn test_collaborator_errors_are_generic() {
        for err in [
            Error::embedding("quota exceeded for key sk-123"),
            Error::vector_db("index not found"),
            Error::rerank("503 from upstream"),
            Error::llm("model overloaded"),
            Error::internal("join error"),
        ] {
            let response = err.into_response();
            assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

            let body = body_json(response).await;
            assert_eq!(body["error"], GENERIC_ERROR_MESSAGE);
        }
    }

    #[test]
    fn test_client_error_classification() {
        assert!(Error::validation("x").is_client_error());
        assert!(!Error::config("x").is_client_error());
        assert!(!Error::llm("x").is_client_error());
    }
}

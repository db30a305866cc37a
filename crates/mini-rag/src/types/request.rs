//! Request body for the RAG endpoint

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Body of `POST /api/rag`
///
/// Both fields are optional at the serde level so that a missing field
/// reaches [`RagRequest::validate`] and produces a 400 instead of an
/// extractor rejection.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RagRequest {
    /// Text to answer from
    #[serde(default)]
    pub text: Option<String>,
    /// Question about the text
    #[serde(default)]
    pub query: Option<String>,
}

/// A request whose fields are known to be present and non-empty
#[derive(Debug, Clone)]
pub struct ValidatedRequest {
    pub text: String,
    pub query: String,
}

impl RagRequest {
    /// Create a request from both fields
    pub fn new(text: impl Into<String>, query: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            query: Some(query.into()),
        }
    }

    /// Require non-empty `text` and `query`
    pub fn validate(self) -> Result<ValidatedRequest> {
        let text = self.text.filter(|t| !t.trim().is_empty());
        let query = self.query.filter(|q| !q.trim().is_empty());

        match (text, query) {
            (Some(text), Some(query)) => Ok(ValidatedRequest { text, query }),
            (None, None) => Err(Error::validation("Missing text or query in request body")),
            (None, Some(_)) => Err(Error::validation("Missing text in request body")),
            (Some(_), None) => Err(Error::validation("Missing query in request body")),
        }
    }
}

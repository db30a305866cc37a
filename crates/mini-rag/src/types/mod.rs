//! Core types for the RAG pipeline

pub mod chunk;
pub mod request;
pub mod response;

pub use chunk::{Chunk, EmbeddingVector};
pub use request::{RagRequest, ValidatedRequest};
pub use response::{AnswerResult, RerankedMatch, RetrievedMatch, Source};

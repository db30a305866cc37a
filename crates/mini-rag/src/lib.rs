//! mini-rag: single-endpoint retrieval-augmented question answering
//!
//! A request carries the text to search and a question. The text is chunked,
//! embedded and written to a vector index; the question retrieves the nearest
//! chunks, a reranker keeps the best few, and a generator answers with `[n]`
//! citations into the returned sources.
//!
//! Every stage sits behind a provider trait with a hosted implementation
//! (OpenAI, Pinecone, Cohere) and an offline one.

pub mod config;
pub mod error;
pub mod generation;
pub mod ingestion;
pub mod keywords;
pub mod pipeline;
pub mod providers;
pub mod server;
pub mod types;

pub use config::{BackendProvider, Credentials, RagConfig};
pub use error::{Error, Result};
pub use pipeline::{RagPipeline, Stages};
pub use types::{AnswerResult, RagRequest, Source};

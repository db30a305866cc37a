//! Splitting request text into chunks

mod chunker;

pub use chunker::TextChunker;

//! Retrieval results and the answer returned to clients

use serde::{Deserialize, Serialize};

/// Answer used when nothing in the index clears the similarity threshold
pub const NO_RELEVANT_INFO_ANSWER: &str =
    "I couldn't find any relevant information in the provided text to answer your question.";

/// Maximum characters of chunk text shown per source (before the ellipsis)
pub const SOURCE_TEXT_MAX_CHARS: usize = 200;

/// A nearest-neighbour hit from the vector index
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RetrievedMatch {
    /// Chunk text stored with the vector
    pub chunk_text: String,
    /// Similarity reported by the index (metric is the store's own)
    pub similarity_score: f32,
    /// Vector id in the index
    pub external_id: String,
}

/// A retrieved match with its reranker score
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RerankedMatch {
    #[serde(flatten)]
    pub retrieved: RetrievedMatch,
    pub rerank_score: f32,
}

/// One cited source in the response
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Source {
    /// 1-based, matches the `[n]` markers in the answer
    pub id: usize,
    /// Chunk text, truncated for display
    pub text: String,
    pub similarity_score: f32,
    pub rerank_score: f32,
}

/// Response body of a successful request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnswerResult {
    pub answer: String,
    pub sources: Vec<Source>,
}

impl AnswerResult {
    /// The terminal state for an empty retrieval
    pub fn no_relevant_information() -> Self {
        Self {
            answer: NO_RELEVANT_INFO_ANSWER.to_string(),
            sources: Vec::new(),
        }
    }

    /// Join reranked matches into numbered sources; scores pass through unmodified
    pub fn assemble(answer: String, reranked: &[RerankedMatch]) -> Self {
        let sources = reranked
            .iter()
            .enumerate()
            .map(|(i, m)| Source {
                id: i + 1,
                text: truncate_source_text(&m.retrieved.chunk_text, SOURCE_TEXT_MAX_CHARS),
                similarity_score: m.retrieved.similarity_score,
                rerank_score: m.rerank_score,
            })
            .collect();

        Self { answer, sources }
    }
}

/// Truncate to `max_chars` characters, appending `...` when anything was cut
pub fn truncate_source_text(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((byte_idx, _)) => format!("{}...", &text[..byte_idx]),
        None => text.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reranked(text: &str, similarity: f32, rerank: f32) -> RerankedMatch {
        RerankedMatch {
            retrieved: RetrievedMatch {
                chunk_text: text.to_string(),
                similarity_score: similarity,
                external_id: uuid::Uuid::new_v4().to_string(),
            },
            rerank_score: rerank,
        }
    }

    #[test]
    fn test_truncate_short_text_untouched() {
        assert_eq!(truncate_source_text("short", 200), "short");
        assert_eq!(truncate_source_text(&"a".repeat(200), 200), "a".repeat(200));
    }

    #[test]
    fn test_truncate_long_text() {
        let truncated = truncate_source_text(&"b".repeat(450), 200);
        assert_eq!(truncated.chars().count(), 203);
        assert!(truncated.ends_with("..."));
    }

    #[test]
    fn test_truncate_multibyte() {
        let text = "é".repeat(300);
        let truncated = truncate_source_text(&text, 200);
        assert_eq!(truncated.chars().count(), 203);
        assert!(truncated.starts_with("éé"));
    }

    #[test]
    fn test_assemble_numbers_sources_in_order() {
        let matches = vec![
            reranked(&"x".repeat(600), 0.81, 0.97),
            reranked("second", 0.44, 0.52),
        ];
        let result = AnswerResult::assemble("Because [1].".to_string(), &matches);

        assert_eq!(result.sources.len(), 2);
        assert_eq!(result.sources[0].id, 1);
        assert_eq!(result.sources[1].id, 2);
        assert_eq!(result.sources[0].text.chars().count(), 203);
        assert_eq!(result.sources[0].similarity_score, 0.81);
        assert_eq!(result.sources[0].rerank_score, 0.97);
    }

    #[test]
    fn test_wire_format_is_camel_case() {
        let result = AnswerResult::assemble("a".to_string(), &[reranked("t", 0.5, 0.6)]);
        let value = serde_json::to_value(&result).unwrap();

        let source = &value["sources"][0];
        assert_eq!(source["id"], 1);
        assert!(source["similarityScore"].is_number());
        assert!(source["rerankScore"].is_number());
    }

    #[test]
    fn test_no_relevant_information() {
        let result = AnswerResult::no_relevant_information();
        assert_eq!(result.answer, NO_RELEVANT_INFO_ANSWER);
        assert!(result.sources.is_empty());
    }
}

//! Offline answer generation by sentence extraction

use async_trait::async_trait;
use std::collections::HashSet;
use unicode_segmentation::UnicodeSegmentation;

use crate::error::Result;
use crate::keywords;
use crate::types::RerankedMatch;

use super::{AnswerGenerator, FALLBACK_ANSWER};

const MAX_SENTENCES: usize = 4;

struct Candidate<'a> {
    sentence: &'a str,
    /// Next sentence of the same chunk
    follower: Option<&'a str>,
    source: usize,
    position: (usize, usize),
    score: usize,
}

/// Answers with the context sentences that mention query keywords
///
/// Each matching sentence is kept together with the sentence after it, and
/// every sentence is cited with the number of the source it came from.
#[derive(Debug, Clone, Copy, Default)]
pub struct ExtractiveGenerator;

impl ExtractiveGenerator {
    fn select<'a>(query: &str, context: &'a [RerankedMatch]) -> Vec<(&'a str, usize)> {
        let query_terms = keywords::keyword_set(query);
        if query_terms.is_empty() {
            return Vec::new();
        }

        let mut seen = HashSet::new();
        let mut candidates = Vec::new();
        for (source, m) in context.iter().enumerate() {
            let sentences: Vec<&str> = m
                .retrieved
                .chunk_text
                .split_sentence_bounds()
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .collect();

            for (i, &sentence) in sentences.iter().enumerate() {
                // Overlapping chunks repeat sentences
                if !seen.insert(sentence) {
                    continue;
                }
                let score = keywords::keyword_set(sentence)
                    .intersection(&query_terms)
                    .count();
                if score > 0 {
                    candidates.push(Candidate {
                        sentence,
                        follower: sentences.get(i + 1).copied(),
                        source: source + 1,
                        position: (source, i),
                        score,
                    });
                }
            }
        }

        candidates.sort_by(|a, b| b.score.cmp(&a.score));
        candidates.truncate(MAX_SENTENCES);
        candidates.sort_by_key(|c| c.position);

        let mut emitted = HashSet::new();
        let mut selected = Vec::new();
        for candidate in candidates {
            for sentence in std::iter::once(candidate.sentence).chain(candidate.follower) {
                if emitted.insert(sentence) {
                    selected.push((sentence, candidate.source));
                }
            }
        }
        selected
    }
}

#[async_trait]
impl AnswerGenerator for ExtractiveGenerator {
    async fn generate(&self, query: &str, context: &[RerankedMatch]) -> Result<String> {
        let selected = Self::select(query, context);
        if selected.is_empty() {
            return Ok(FALLBACK_ANSWER.to_string());
        }

        let body = selected
            .iter()
            .map(|(sentence, source)| format!("{} [{}]", sentence, source))
            .collect::<Vec<_>>()
            .join(" ");
        Ok(format!("Based on the text: {}", body))
    }

    async fn health_check(&self) -> Result<bool> {
        Ok(true)
    }

    fn name(&self) -> &str {
        "local-extractive"
    }
}

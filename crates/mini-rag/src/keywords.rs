//! Keyword extraction shared by the offline strategies

use regex::Regex;
use std::collections::HashSet;
use std::sync::OnceLock;

const STOPWORDS: &[&str] = &[
    "a", "about", "all", "also", "an", "and", "any", "are", "as", "at", "be", "been", "but",
    "by", "can", "could", "did", "do", "does", "for", "from", "had", "has", "have", "how", "i",
    "in", "into", "is", "it", "its", "main", "more", "most", "of", "on", "or", "our", "some",
    "such", "than", "that", "the", "their", "them", "there", "these", "they", "this", "those",
    "to", "was", "we", "were", "what", "when", "where", "which", "while", "who", "why", "will",
    "with", "would", "you", "your",
];

fn word_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"[\p{L}\p{N}]+").expect("static pattern"))
}

fn stopwords() -> &'static HashSet<&'static str> {
    static SET: OnceLock<HashSet<&'static str>> = OnceLock::new();
    SET.get_or_init(|| STOPWORDS.iter().copied().collect())
}

/// Lowercased, plural-folded content words in order of appearance
pub fn tokenize(text: &str) -> Vec<String> {
    word_pattern()
        .find_iter(&text.to_lowercase())
        .map(|m| m.as_str())
        .filter(|w| w.chars().count() > 1 && !stopwords().contains(w))
        .map(normalize)
        .collect()
}

/// Distinct keywords of a query
pub fn keyword_set(text: &str) -> HashSet<String> {
    tokenize(text).into_iter().collect()
}

/// Fold simple plurals so "causes" matches "cause"
fn normalize(word: &str) -> String {
    if word.len() > 3 && word.ends_with('s') && !word.ends_with("ss") {
        word[..word.len() - 1].to_string()
    } else {
        word.to_string()
    }
}

//! Citation marker extraction and cleanup

use regex::{Captures, Regex};
use std::collections::BTreeSet;
use std::sync::OnceLock;

fn marker_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"(\s*)\[(\d{1,4})\]").expect("Invalid regex"))
}

fn cited_number(caps: &Captures<'_>) -> Option<usize> {
    caps.get(2).and_then(|m| m.as_str().parse().ok())
}

/// Distinct source numbers cited in `answer`, ascending
pub fn cited_sources(answer: &str) -> Vec<usize> {
    marker_pattern()
        .captures_iter(answer)
        .filter_map(|caps| cited_number(&caps))
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

/// Remove `[n]` markers that do not refer to one of `source_count` sources
///
/// Leading whitespace before a removed marker goes with it.
pub fn strip_invalid_citations(answer: &str, source_count: usize) -> String {
    marker_pattern()
        .replace_all(answer, |caps: &Captures<'_>| match cited_number(caps) {
            Some(n) if (1..=source_count).contains(&n) => caps[0].to_string(),
            _ => String::new(),
        })
        .into_owned()
}

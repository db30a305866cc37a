//! Recursive text chunking with overlap

use unicode_segmentation::UnicodeSegmentation;
use uuid::Uuid;

use crate::config::ChunkingConfig;
use crate::types::Chunk;

/// Natural boundaries tried in order before a hard character cut
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Boundary {
    Paragraph,
    Sentence,
    Word,
    Character,
}

impl Boundary {
    fn finer(self) -> Self {
        match self {
            Self::Paragraph => Self::Sentence,
            Self::Sentence => Self::Word,
            Self::Word | Self::Character => Self::Character,
        }
    }
}

/// Text chunker with configurable size and overlap
///
/// Sizes are counted in characters, not bytes. Output is deterministic:
/// the same text always yields the same chunk texts.
#[derive(Debug, Clone)]
pub struct TextChunker {
    /// Target chunk size in characters
    chunk_size: usize,
    /// Overlap between consecutive chunks in characters
    overlap: usize,
}

impl TextChunker {
    /// Create a new chunker. `overlap` is clamped below `chunk_size`.
    pub fn new(chunk_size: usize, overlap: usize) -> Self {
        let chunk_size = chunk_size.max(1);
        Self {
            chunk_size,
            overlap: overlap.min(chunk_size - 1),
        }
    }

    /// Create from config
    pub fn from_config(config: &ChunkingConfig) -> Self {
        Self::new(config.chunk_size, config.chunk_overlap)
    }

    /// Split request text into chunks tagged with the request id
    pub fn chunk(&self, request_id: Uuid, text: &str) -> Vec<Chunk> {
        let texts = self.split(text);
        let total = texts.len();

        texts
            .into_iter()
            .enumerate()
            .map(|(ordinal, text)| Chunk::new(request_id, text, ordinal, total))
            .collect()
    }

    /// Split text into overlapping segments of at most `chunk_size` characters
    pub fn split(&self, text: &str) -> Vec<String> {
        if text.trim().is_empty() {
            return Vec::new();
        }

        let mut atoms = Vec::new();
        self.collect_atoms(text, Boundary::Paragraph, &mut atoms);
        self.merge(&atoms)
    }

    /// Atoms leave room for a full overlap in front of them
    fn atom_limit(&self) -> usize {
        self.chunk_size - self.overlap
    }

    /// Break text into contiguous pieces no longer than `atom_limit`,
    /// descending to finer boundaries only where a piece is still too long
    fn collect_atoms<'a>(&self, text: &'a str, boundary: Boundary, atoms: &mut Vec<&'a str>) {
        let limit = self.atom_limit();
        if char_len(text) <= limit {
            atoms.push(text);
            return;
        }

        let segments: Vec<&str> = match boundary {
            Boundary::Paragraph => split_keeping_separator(text, "\n\n"),
            Boundary::Sentence => text.split_sentence_bounds().collect(),
            Boundary::Word => text.split_word_bounds().collect(),
            Boundary::Character => {
                hard_cut(text, limit, atoms);
                return;
            }
        };

        let finer = boundary.finer();
        for segment in segments {
            if char_len(segment) <= limit {
                atoms.push(segment);
            } else {
                self.collect_atoms(segment, finer, atoms);
            }
        }
    }

    /// Greedily pack atoms into chunks, seeding each new chunk with the
    /// tail of the previous one
    fn merge(&self, atoms: &[&str]) -> Vec<String> {
        let mut chunks = Vec::new();
        let mut current = String::new();
        let mut current_len = 0usize;
        // Whether `current` holds anything beyond carried-over overlap
        let mut has_fresh = false;

        for atom in atoms {
            let atom_len = char_len(atom);

            if current_len + atom_len > self.chunk_size {
                if has_fresh {
                    let budget = self.overlap.min(self.chunk_size - atom_len);
                    let carried = overlap_tail(&current, budget).to_string();
                    push_trimmed(&mut chunks, &current);
                    current = carried;
                    current_len = char_len(&current);
                    has_fresh = false;
                } else {
                    current.clear();
                    current_len = 0;
                }
            }

            current.push_str(atom);
            current_len += atom_len;
            has_fresh |= !atom.trim().is_empty();
        }

        if has_fresh {
            push_trimmed(&mut chunks, &current);
        }

        chunks
    }
}

impl Default for TextChunker {
    fn default() -> Self {
        Self::from_config(&ChunkingConfig::default())
    }
}

fn char_len(text: &str) -> usize {
    text.chars().count()
}

fn push_trimmed(chunks: &mut Vec<String>, text: &str) {
    let trimmed = text.trim();
    if !trimmed.is_empty() {
        chunks.push(trimmed.to_string());
    }
}

/// Split text at a separator, keeping the separator on the preceding segment
fn split_keeping_separator<'a>(text: &'a str, separator: &str) -> Vec<&'a str> {
    let mut segments = Vec::new();
    let mut start = 0;

    while let Some(pos) = text[start..].find(separator) {
        let end = start + pos + separator.len();
        segments.push(&text[start..end]);
        start = end;
    }

    if start < text.len() {
        segments.push(&text[start..]);
    }

    segments
}

/// Cut text into pieces of exactly `limit` characters (the last may be shorter)
fn hard_cut<'a>(text: &'a str, limit: usize, atoms: &mut Vec<&'a str>) {
    let mut start = 0;
    let mut count = 0;

    for (idx, _) in text.char_indices() {
        if count == limit {
            atoms.push(&text[start..idx]);
            start = idx;
            count = 0;
        }
        count += 1;
    }

    if start < text.len() {
        atoms.push(&text[start..]);
    }
}

/// Last `budget` characters of `text`, moved forward to a word start when
/// the cut lands inside a word
fn overlap_tail(text: &str, budget: usize) -> &str {
    if budget == 0 {
        return "";
    }

    let total = char_len(text);
    if total <= budget {
        return text;
    }

    let start = text
        .char_indices()
        .nth(total - budget)
        .map(|(idx, _)| idx)
        .unwrap_or(0);
    let tail = &text[start..];

    let cut_mid_word = !tail.starts_with(char::is_whitespace)
        && !text[..start].ends_with(char::is_whitespace);

    if cut_mid_word {
        if let Some(pos) = tail.find(char::is_whitespace) {
            return tail[pos..].trim_start();
        }
    }

    tail
}

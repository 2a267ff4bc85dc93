//! Lexical chunk retrieval for answer generation.
//!
//! Scores each answer chunk by how many distinct question terms it contains.
//! Ties keep document order. No embeddings, no similarity search.

use std::collections::HashSet;

/// Number of chunks stuffed into one answer prompt.
pub const DEFAULT_TOP_K: usize = 4;

const MIN_TERM_LEN: usize = 3;
const STOPWORDS: &[&str] = &[
    "the", "and", "for", "are", "but", "not", "you", "your", "with", "this", "that", "what",
    "when", "where", "which", "who", "why", "how", "does", "did", "can", "could", "would",
    "should", "from", "into", "about", "explain", "describe", "between", "its", "their", "there",
    "have", "has", "was", "were", "will",
];

fn terms(text: &str) -> HashSet<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|t| t.chars().count() >= MIN_TERM_LEN)
        .map(str::to_lowercase)
        .filter(|t| !STOPWORDS.contains(&t.as_str()))
        .collect()
}

pub struct ChunkIndex {
    chunks: Vec<String>,
    chunk_terms: Vec<HashSet<String>>,
}

impl ChunkIndex {
    pub fn new(chunks: Vec<String>) -> Self {
        let chunk_terms = chunks.iter().map(|c| terms(c)).collect();
        Self {
            chunks,
            chunk_terms,
        }
    }

    pub fn chunk_count(&self) -> usize {
        self.chunks.len()
    }

    /// Up to `k` chunks most relevant to `query`, best first. Falls back to
    /// the leading chunks when nothing overlaps so the model still sees context.
    pub fn top_k(&self, query: &str, k: usize) -> Vec<&str> {
        let query_terms = terms(query);

        let mut scored: Vec<(usize, usize)> = self
            .chunk_terms
            .iter()
            .enumerate()
            .map(|(i, t)| (i, query_terms.intersection(t).count()))
            .filter(|(_, score)| *score > 0)
            .collect();
        // stable sort keeps document order among equal scores
        scored.sort_by(|a, b| b.1.cmp(&a.1));

        if scored.is_empty() {
            return self.chunks.iter().take(k).map(String::as_str).collect();
        }
        scored
            .into_iter()
            .take(k)
            .map(|(i, _)| self.chunks[i].as_str())
            .collect()
    }
}

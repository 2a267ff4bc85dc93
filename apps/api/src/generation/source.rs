//! Source loading and chunking.
//!
//! Token counts are approximated by whitespace-separated words. That is
//! coarse, but chunk sizes only need to keep prompts well inside the model's
//! context window.

use std::path::Path;

use tracing::info;

use crate::generation::{GenerationError, SourceDocument};

/// Chunk shape used for question generation (refine pass per chunk).
pub const QUESTION_CHUNK_TOKENS: usize = 10_000;
pub const QUESTION_CHUNK_OVERLAP: usize = 200;
/// Chunk shape used for answer retrieval.
pub const ANSWER_CHUNK_TOKENS: usize = 1_000;
pub const ANSWER_CHUNK_OVERLAP: usize = 100;

/// Extracts the text of every page of a PDF. pdf-extract is CPU-bound, so it
/// runs on the blocking pool.
pub async fn load_pdf(path: &Path) -> Result<SourceDocument, GenerationError> {
    let owned = path.to_path_buf();
    let text = tokio::task::spawn_blocking(move || pdf_extract::extract_text(&owned))
        .await
        .map_err(|e| GenerationError::SourceUnreadable(format!("extraction aborted: {e}")))?
        .map_err(|e| GenerationError::SourceUnreadable(e.to_string()))?;

    if text.trim().is_empty() {
        return Err(GenerationError::SourceUnreadable(
            "no extractable text".to_string(),
        ));
    }

    info!(
        words = text.split_whitespace().count(),
        "Extracted text from {}",
        path.display()
    );
    Ok(SourceDocument {
        path: path.to_path_buf(),
        text,
    })
}

/// Splits `text` into windows of at most `chunk_size` words, consecutive
/// windows sharing `overlap` words.
pub fn split_tokens(text: &str, chunk_size: usize, overlap: usize) -> Vec<String> {
    let words: Vec<&str> = text.split_whitespace().collect();
    if words.is_empty() || chunk_size == 0 {
        return Vec::new();
    }

    let step = chunk_size.saturating_sub(overlap).max(1);
    let mut chunks = Vec::new();
    let mut start = 0;
    loop {
        let end = (start + chunk_size).min(words.len());
        chunks.push(words[start..end].join(" "));
        if end == words.len() {
            break;
        }
        start += step;
    }
    chunks
}

/// Question chunks and the finer answer chunks derived from them.
pub fn chunk_source(source: &SourceDocument) -> (Vec<String>, Vec<String>) {
    let question_chunks = split_tokens(&source.text, QUESTION_CHUNK_TOKENS, QUESTION_CHUNK_OVERLAP);
    let answer_chunks = question_chunks
        .iter()
        .flat_map(|chunk| split_tokens(chunk, ANSWER_CHUNK_TOKENS, ANSWER_CHUNK_OVERLAP))
        .collect();
    (question_chunks, answer_chunks)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn numbered_words(n: usize) -> String {
        (0..n).map(|i| format!("w{i}")).collect::<Vec<_>>().join(" ")
    }

    #[test]
    fn test_short_text_is_one_chunk() {
        assert_eq!(split_tokens("a b  c\n d", 10, 2), vec!["a b c d"]);
    }

    #[test]
    fn test_empty_text_has_no_chunks() {
        assert!(split_tokens("   \n ", 10, 2).is_empty());
    }

    #[test]
    fn test_windows_overlap() {
        let chunks = split_tokens(&numbered_words(10), 4, 1);
        assert_eq!(
            chunks,
            vec!["w0 w1 w2 w3", "w3 w4 w5 w6", "w6 w7 w8 w9"]
        );
    }

    #[test]
    fn test_overlap_not_smaller_than_chunk_still_advances() {
        let chunks = split_tokens(&numbered_words(3), 2, 5);
        assert_eq!(chunks, vec!["w0 w1", "w1 w2"]);
    }

    #[test]
    fn test_chunk_source_splits_answers_finer() {
        let source = SourceDocument {
            path: "doc.pdf".into(),
            text: numbered_words(2_500),
        };
        let (questions, answers) = chunk_source(&source);
        assert_eq!(questions.len(), 1);
        // 2500 words at 1000/100 → starts at 0, 900, 1800
        assert_eq!(answers.len(), 3);
    }

    #[tokio::test]
    async fn test_load_pdf_rejects_non_pdf() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("fake.pdf");
        std::fs::write(&path, b"definitely not a pdf").unwrap();

        let err = load_pdf(&path).await.unwrap_err();
        assert!(matches!(err, GenerationError::SourceUnreadable(_)));
    }
}

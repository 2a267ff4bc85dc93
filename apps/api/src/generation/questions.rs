//! Question list parsing.

/// Ordered, filtered questions. Every entry is trimmed, non-empty and ends
/// with `?` or `.`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QuestionList(Vec<String>);

impl QuestionList {
    /// Wraps already-filtered questions.
    pub fn new(questions: Vec<String>) -> Self {
        Self(questions)
    }

    /// Parses raw LLM output: one candidate per line, keeping only lines that
    /// end like a question or a sentence, capped at `limit`.
    pub fn from_llm_output(raw: &str, limit: usize) -> Self {
        Self::new(
            raw.trim()
                .lines()
                .map(str::trim)
                .filter(|line| is_question_line(line))
                .take(limit)
                .map(String::from)
                .collect(),
        )
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, String> {
        self.0.iter()
    }
}

fn is_question_line(line: &str) -> bool {
    // a lone "?" or "." is punctuation debris, not a question
    line.chars().count() > 1 && (line.ends_with('?') || line.ends_with('.'))
}

//! Question/answer generation.
//!
//! The job runner only sees the `GenerationService` and `AnswerResolver`
//! traits. `LlmGenerationService` is the production backend: PDF text →
//! chunks → refine-style question generation → retrieval-stuffed answers.
//! All LLM calls go through `llm_client`.

pub mod pipeline;
pub mod prompts;
pub mod questions;
pub mod retrieval;
pub mod source;
#[cfg(test)]
pub mod testing;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;
use tracing::warn;

use crate::document::{AnswerOutcome, QaPair};

pub use pipeline::LlmGenerationService;
pub use questions::QuestionList;

#[derive(Debug, Error)]
pub enum GenerationError {
    #[error("Failed to load PDF: {0}")]
    SourceUnreadable(String),

    #[error("Question generation failed: {0}")]
    QuestionGeneration(String),

    #[error("No usable questions were generated")]
    NoQuestions,

    #[error("{0}")]
    Answer(String),
}

/// Extracted text of an uploaded document.
#[derive(Debug, Clone)]
pub struct SourceDocument {
    pub path: PathBuf,
    pub text: String,
}

/// Pluggable question/answer backend.
///
/// Carried in `AppState` as `Arc<dyn GenerationService>`.
#[async_trait]
pub trait GenerationService: Send + Sync {
    async fn load_source(&self, path: &Path) -> Result<SourceDocument, GenerationError>;

    /// Produces questions for `source`. May return fewer than `question_count`,
    /// and may take a long time; transient failures are retried internally.
    async fn generate(
        &self,
        source: &SourceDocument,
        question_count: usize,
    ) -> Result<GenerationOutput, GenerationError>;
}

/// Answers one question. Each call is independently fallible.
#[async_trait]
pub trait AnswerResolver: Send + Sync {
    async fn resolve(&self, question: &str) -> Result<String, GenerationError>;
}

pub struct GenerationOutput {
    pub questions: QuestionList,
    pub resolver: Arc<dyn AnswerResolver>,
}

impl GenerationOutput {
    /// Resolves the first `min(question_count, questions.len())` questions in
    /// order. A failed resolution becomes `AnswerOutcome::Failed` and the loop
    /// moves on.
    pub async fn answer_all(&self, question_count: usize) -> Vec<QaPair> {
        let mut pairs = Vec::new();
        for (index, question) in self.questions.iter().take(question_count).enumerate() {
            let answer = match self.resolver.resolve(question).await {
                Ok(text) => AnswerOutcome::Answered(text),
                Err(e) => {
                    warn!(question = index + 1, "Answer generation failed: {e}");
                    AnswerOutcome::Failed(e.to_string())
                }
            };
            pairs.push(QaPair {
                question: question.clone(),
                answer,
            });
        }
        pairs
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FailsOn(&'static str);

    #[async_trait]
    impl AnswerResolver for FailsOn {
        async fn resolve(&self, question: &str) -> Result<String, GenerationError> {
            if question == self.0 {
                Err(GenerationError::Answer("upstream timeout".to_string()))
            } else {
                Ok(format!("answer to {question}"))
            }
        }
    }

    fn output(questions: &[&str], resolver: FailsOn) -> GenerationOutput {
        GenerationOutput {
            questions: QuestionList::new(questions.iter().map(|q| q.to_string()).collect()),
            resolver: Arc::new(resolver),
        }
    }

    #[tokio::test]
    async fn test_answer_all_isolates_failures() {
        let out = output(&["a?", "b?", "c?"], FailsOn("b?"));
        let pairs = out.answer_all(3).await;

        assert_eq!(pairs.len(), 3);
        assert_eq!(pairs[0].answer, AnswerOutcome::Answered("answer to a?".into()));
        assert_eq!(pairs[1].answer, AnswerOutcome::Failed("upstream timeout".into()));
        assert_eq!(pairs[2].answer, AnswerOutcome::Answered("answer to c?".into()));
    }

    #[tokio::test]
    async fn test_answer_all_caps_at_available_questions() {
        let out = output(&["a?", "b?"], FailsOn("none"));
        assert_eq!(out.answer_all(5).await.len(), 2);
        assert_eq!(out.answer_all(1).await.len(), 1);
    }
}

//! Scripted generation backend for tests.

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;

use crate::generation::{
    AnswerResolver, GenerationError, GenerationOutput, GenerationService, QuestionList,
    SourceDocument,
};

/// Treats the uploaded file as plain text and produces `question_count`
/// canned questions (or `questions` if set).
#[derive(Default, Clone)]
pub struct ScriptedGenerator {
    pub questions: Option<Vec<String>>,
    /// 1-based question numbers whose answers fail.
    pub failing_answers: Vec<usize>,
    pub generate_error: Option<String>,
}

#[async_trait]
impl GenerationService for ScriptedGenerator {
    async fn load_source(&self, path: &Path) -> Result<SourceDocument, GenerationError> {
        let bytes = tokio::fs::read(path)
            .await
            .map_err(|e| GenerationError::SourceUnreadable(e.to_string()))?;
        Ok(SourceDocument {
            path: path.to_path_buf(),
            text: String::from_utf8_lossy(&bytes).into_owned(),
        })
    }

    async fn generate(
        &self,
        _source: &SourceDocument,
        question_count: usize,
    ) -> Result<GenerationOutput, GenerationError> {
        if let Some(message) = &self.generate_error {
            return Err(GenerationError::QuestionGeneration(message.clone()));
        }
        let questions = self.questions.clone().unwrap_or_else(|| {
            (1..=question_count)
                .map(|i| format!("Question number {i}?"))
                .collect()
        });
        Ok(GenerationOutput {
            resolver: Arc::new(ScriptedResolver {
                questions: questions.clone(),
                failing: self.failing_answers.clone(),
            }),
            questions: QuestionList::new(questions),
        })
    }
}

struct ScriptedResolver {
    questions: Vec<String>,
    failing: Vec<usize>,
}

#[async_trait]
impl AnswerResolver for ScriptedResolver {
    async fn resolve(&self, question: &str) -> Result<String, GenerationError> {
        let number = self
            .questions
            .iter()
            .position(|q| q == question)
            .map_or(0, |i| i + 1);
        if self.failing.contains(&number) {
            return Err(GenerationError::Answer(format!(
                "resolver failed on question {number}"
            )));
        }
        Ok(format!("### Answer {number}\n- **point** one\n\nclosing line"))
    }
}

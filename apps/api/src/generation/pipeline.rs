//! LLM-backed generation pipeline.
//!
//! Flow: load PDF → chunk → question pass over the first chunk → refine pass
//! over each further chunk → filter questions → build the retrieval index
//! used by the answer resolver.

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::info;

use crate::generation::prompts::{
    fill_template, ANSWER_PROMPT_TEMPLATE, QUESTION_PROMPT_TEMPLATE, REFINE_PROMPT_TEMPLATE,
};
use crate::generation::retrieval::{ChunkIndex, DEFAULT_TOP_K};
use crate::generation::source::{chunk_source, load_pdf};
use crate::generation::{
    AnswerResolver, GenerationError, GenerationOutput, GenerationService, QuestionList,
    SourceDocument,
};
use crate::llm_client::prompts::{ANSWER_SYSTEM, QUESTION_SYSTEM};
use crate::llm_client::LlmClient;

const QUESTION_TEMPERATURE: f32 = 0.3;
const ANSWER_TEMPERATURE: f32 = 0.1;

pub struct LlmGenerationService {
    llm: LlmClient,
}

impl LlmGenerationService {
    pub fn new(llm: LlmClient) -> Self {
        Self { llm }
    }

    /// Runs the refine chain over the question chunks and returns the raw
    /// question text from the final pass.
    async fn draft_questions(
        &self,
        chunks: &[String],
        question_count: usize,
    ) -> Result<String, GenerationError> {
        let count = question_count.to_string();
        let mut draft = String::new();

        for (index, chunk) in chunks.iter().enumerate() {
            let prompt = if index == 0 {
                fill_template(
                    QUESTION_PROMPT_TEMPLATE,
                    &[("text", chunk.as_str()), ("num_questions", count.as_str())],
                )
            } else {
                fill_template(
                    REFINE_PROMPT_TEMPLATE,
                    &[
                        ("existing_answer", draft.as_str()),
                        ("text", chunk.as_str()),
                        ("num_questions", count.as_str()),
                    ],
                )
            };

            draft = self
                .llm
                .complete(&prompt, QUESTION_SYSTEM, QUESTION_TEMPERATURE)
                .await
                .map_err(|e| GenerationError::QuestionGeneration(e.to_string()))?;
            info!("Question pass {}/{} complete", index + 1, chunks.len());
        }

        Ok(draft)
    }
}

#[async_trait]
impl GenerationService for LlmGenerationService {
    async fn load_source(&self, path: &Path) -> Result<SourceDocument, GenerationError> {
        load_pdf(path).await
    }

    async fn generate(
        &self,
        source: &SourceDocument,
        question_count: usize,
    ) -> Result<GenerationOutput, GenerationError> {
        let (question_chunks, answer_chunks) = chunk_source(source);
        if question_chunks.is_empty() {
            return Err(GenerationError::SourceUnreadable(
                "document has no text".to_string(),
            ));
        }
        info!(
            "Split {} into {} question chunks",
            source.path.display(),
            question_chunks.len()
        );

        let draft = self.draft_questions(&question_chunks, question_count).await?;
        let questions = QuestionList::from_llm_output(&draft, question_count);
        if questions.is_empty() {
            return Err(GenerationError::NoQuestions);
        }
        info!("Generated {} questions", questions.len());

        let index = ChunkIndex::new(answer_chunks);
        info!("Indexed {} answer chunks for retrieval", index.chunk_count());

        Ok(GenerationOutput {
            questions,
            resolver: Arc::new(RetrievalAnswerResolver {
                llm: self.llm.clone(),
                index,
            }),
        })
    }
}

/// Answers by stuffing the top-ranked answer chunks into one prompt.
struct RetrievalAnswerResolver {
    llm: LlmClient,
    index: ChunkIndex,
}

#[async_trait]
impl AnswerResolver for RetrievalAnswerResolver {
    async fn resolve(&self, question: &str) -> Result<String, GenerationError> {
        let context = self.index.top_k(question, DEFAULT_TOP_K).join("\n\n");
        let prompt = fill_template(
            ANSWER_PROMPT_TEMPLATE,
            &[("context", context.as_str()), ("question", question)],
        );

        self.llm
            .complete(&prompt, ANSWER_SYSTEM, ANSWER_TEMPERATURE)
            .await
            .map_err(|e| GenerationError::Answer(e.to_string()))
    }
}

//! Document assembly: builds the Q&A document model and persists it as DOCX.
//!
//! Building the model is pure (`build_document`); rendering and writing the
//! artifact happen in `DocumentAssembler::assemble`.

pub mod render;

use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::info;
use uuid::Uuid;

use crate::formatting::{format_answer, FormattedBlock};

pub const DOCUMENT_TITLE: &str = "Interview Questions and Answers";
pub const ARTIFACT_FILE_NAME: &str = "QA.docx";
pub const DIVIDER: &str = "--------------------------------------------------";

#[derive(Debug, Error)]
pub enum AssemblyError {
    #[error("Failed to render document: {0}")]
    Render(String),

    #[error("Failed to write artifact {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Outcome of resolving one question's answer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AnswerOutcome {
    Answered(String),
    Failed(String),
}

impl AnswerOutcome {
    /// Text that goes into the document: the answer, or the failure placeholder.
    pub fn display_text(&self) -> String {
        match self {
            AnswerOutcome::Answered(text) => text.clone(),
            AnswerOutcome::Failed(reason) => format!("Answer generation failed: {reason}"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct QaPair {
    pub question: String,
    pub answer: AnswerOutcome,
}

/// One paragraph of the output document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DocParagraph {
    Title(String),
    QuestionHeading(usize),
    QuestionText(String),
    AnswerHeading,
    Answer(FormattedBlock),
    Divider,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentModel {
    pub paragraphs: Vec<DocParagraph>,
}

impl DocumentModel {
    /// Number of question/answer pairs in the document.
    #[cfg(test)]
    pub fn pair_count(&self) -> usize {
        self.paragraphs
            .iter()
            .filter(|p| matches!(p, DocParagraph::QuestionHeading(_)))
            .count()
    }
}

/// A written document, referenced relative to the output directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputArtifact {
    /// `<job_id>/QA.docx`
    pub name: String,
    pub path: PathBuf,
}

/// Lays out the title and every pair in order, numbering questions from 1.
pub fn build_document(title: &str, pairs: &[QaPair]) -> DocumentModel {
    let mut paragraphs = vec![DocParagraph::Title(title.to_string())];

    for (index, pair) in pairs.iter().enumerate() {
        paragraphs.push(DocParagraph::QuestionHeading(index + 1));
        paragraphs.push(DocParagraph::QuestionText(pair.question.clone()));
        paragraphs.push(DocParagraph::AnswerHeading);
        paragraphs.extend(
            format_answer(&pair.answer.display_text())
                .into_iter()
                .map(DocParagraph::Answer),
        );
        paragraphs.push(DocParagraph::Divider);
    }

    DocumentModel { paragraphs }
}

/// Writes Q&A documents under `output_dir/<job_id>/`.
#[derive(Debug, Clone)]
pub struct DocumentAssembler {
    output_dir: PathBuf,
}

impl DocumentAssembler {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
        }
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Resolves an artifact name (as stored on a job) to its path on disk.
    pub fn artifact_path(&self, name: &str) -> PathBuf {
        self.output_dir.join(name)
    }

    pub async fn assemble(
        &self,
        job_id: Uuid,
        title: &str,
        pairs: &[QaPair],
    ) -> Result<OutputArtifact, AssemblyError> {
        let model = build_document(title, pairs);
        let bytes = tokio::task::spawn_blocking(move || render::render_docx(&model))
            .await
            .map_err(|e| AssemblyError::Render(format!("render task aborted: {e}")))??;

        let name = format!("{job_id}/{ARTIFACT_FILE_NAME}");
        let path = self.artifact_path(&name);
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|source| AssemblyError::Write {
                    path: parent.to_path_buf(),
                    source,
                })?;
        }
        tokio::fs::write(&path, &bytes)
            .await
            .map_err(|source| AssemblyError::Write {
                path: path.clone(),
                source,
            })?;

        info!(%job_id, bytes = bytes.len(), "Wrote artifact {}", path.display());
        Ok(OutputArtifact { name, path })
    }
}

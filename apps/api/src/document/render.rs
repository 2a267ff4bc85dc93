//! DOCX rendering via docx-rs.
//!
//! docx-rs sizes runs in half-points and indents paragraphs in twips (1/20 pt).

use std::io::Cursor;

use docx_rs::{AlignmentType, Docx, Paragraph, Run};

use crate::document::{AssemblyError, DocParagraph, DocumentModel, DIVIDER};
use crate::formatting::{BlockStyle, FormattedBlock, BODY_SIZE_PT};

const TITLE_SIZE_PT: u32 = 20;
const SECTION_HEADING_SIZE_PT: u32 = 13;

fn half_points(pt: u32) -> usize {
    (pt * 2) as usize
}

fn twips(pt: u32) -> i32 {
    (pt * 20) as i32
}

pub fn render_docx(model: &DocumentModel) -> Result<Vec<u8>, AssemblyError> {
    let docx = model
        .paragraphs
        .iter()
        .fold(Docx::new(), |docx, paragraph| {
            docx.add_paragraph(render_paragraph(paragraph))
        });

    let mut buffer = Cursor::new(Vec::new());
    docx.build()
        .pack(&mut buffer)
        .map_err(|e| AssemblyError::Render(e.to_string()))?;
    Ok(buffer.into_inner())
}

fn render_paragraph(paragraph: &DocParagraph) -> Paragraph {
    match paragraph {
        DocParagraph::Title(title) => Paragraph::new()
            .align(AlignmentType::Center)
            .add_run(Run::new().add_text(title).bold().size(half_points(TITLE_SIZE_PT))),
        DocParagraph::QuestionHeading(number) => {
            section_heading(&format!("Question {number}:"))
        }
        DocParagraph::QuestionText(text) => Paragraph::new().add_run(body_run(text)),
        DocParagraph::AnswerHeading => section_heading("Answer:"),
        DocParagraph::Answer(block) => render_block(block),
        DocParagraph::Divider => Paragraph::new().add_run(body_run(DIVIDER)),
    }
}

fn section_heading(text: &str) -> Paragraph {
    Paragraph::new().add_run(
        Run::new()
            .add_text(text)
            .bold()
            .size(half_points(SECTION_HEADING_SIZE_PT)),
    )
}

fn body_run(text: &str) -> Run {
    Run::new().add_text(text).size(half_points(BODY_SIZE_PT))
}

fn render_block(block: &FormattedBlock) -> Paragraph {
    let size = half_points(block.style.font_size_pt());
    let mut paragraph = Paragraph::new();

    if block.style == BlockStyle::Heading {
        paragraph = paragraph.align(AlignmentType::Left);
    }
    if block.style.indent_pt() > 0 {
        paragraph = paragraph.indent(Some(twips(block.style.indent_pt())), None, None, None);
    }
    if !block.marker.is_empty() {
        paragraph = paragraph.add_run(Run::new().add_text(block.marker.trim_start()).size(size));
    }

    block.spans.iter().fold(paragraph, |paragraph, span| {
        let run = Run::new().add_text(&span.text).size(size);
        paragraph.add_run(if span.bold { run.bold() } else { run })
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::{build_document, AnswerOutcome, QaPair};

    #[test]
    fn test_unit_conversions() {
        assert_eq!(half_points(11), 22);
        assert_eq!(twips(20), 400);
    }

    #[test]
    fn test_render_produces_zip_payload() {
        let model = build_document(
            "Title",
            &[QaPair {
                question: "Why?".to_string(),
                answer: AnswerOutcome::Answered("### H\n- **b** c\n  - d".to_string()),
            }],
        );
        let bytes = render_docx(&model).unwrap();
        assert!(bytes.starts_with(b"PK"));
    }
}

//! Bold-span tokenizer.
//!
//! Splits a line into plain and bold runs. A bold run is `**text**` where
//! `text` is at least one character and contains no `*`. Anything that does
//! not close properly (a lone `**`, `****`, `**a*b**`) stays in the plain run
//! verbatim, so concatenating the span texts with their markers restored
//! always reproduces the input.

use serde::{Deserialize, Serialize};

const MARKER: &str = "**";

/// A contiguous run of text with a single weight.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Span {
    pub text: String,
    pub bold: bool,
}

impl Span {
    pub fn plain(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            bold: false,
        }
    }

    pub fn bold(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            bold: true,
        }
    }
}

/// Tokenizes `line` into spans. Empty runs are never emitted; a line with no
/// text at all yields a single empty plain span.
pub fn parse_bold_spans(line: &str) -> Vec<Span> {
    let mut spans = Vec::new();
    let mut plain_start = 0;
    let mut cursor = 0;

    while let Some(offset) = line[cursor..].find(MARKER) {
        let open = cursor + offset;
        match closing_marker(line, open) {
            Some(close) => {
                push_plain(&mut spans, &line[plain_start..open]);
                spans.push(Span::bold(&line[open + MARKER.len()..close]));
                cursor = close + MARKER.len();
                plain_start = cursor;
            }
            // Retry one byte later: `***a**` should still bold `a`.
            None => cursor = open + 1,
        }
    }

    push_plain(&mut spans, &line[plain_start..]);

    if spans.is_empty() {
        spans.push(Span::plain(""));
    }
    spans
}

/// Returns the byte index of the `**` closing the run opened at `open`, if the
/// run between them is non-empty and free of `*`.
fn closing_marker(line: &str, open: usize) -> Option<usize> {
    let body_start = open + MARKER.len();
    let star = body_start + line[body_start..].find('*')?;
    if star == body_start || !line[star..].starts_with(MARKER) {
        return None;
    }
    Some(star)
}

fn push_plain(spans: &mut Vec<Span>, text: &str) {
    if !text.is_empty() {
        spans.push(Span::plain(text));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_line_is_single_span() {
        assert_eq!(parse_bold_spans("just text"), vec![Span::plain("just text")]);
    }

    #[test]
    fn test_empty_line_yields_empty_plain_span() {
        assert_eq!(parse_bold_spans(""), vec![Span::plain("")]);
    }

    #[test]
    fn test_bold_in_the_middle_keeps_whitespace() {
        assert_eq!(
            parse_bold_spans("use **Rust** daily "),
            vec![
                Span::plain("use "),
                Span::bold("Rust"),
                Span::plain(" daily "),
            ]
        );
    }

    #[test]
    fn test_adjacent_bold_runs() {
        assert_eq!(
            parse_bold_spans("**a****b**"),
            vec![Span::bold("a"), Span::bold("b")]
        );
    }

    #[test]
    fn test_unmatched_marker_stays_literal() {
        assert_eq!(
            parse_bold_spans("a **dangling marker"),
            vec![Span::plain("a **dangling marker")]
        );
    }

    #[test]
    fn test_empty_bold_run_is_not_bold() {
        assert_eq!(parse_bold_spans("****"), vec![Span::plain("****")]);
    }

    #[test]
    fn test_inner_single_star_breaks_the_run() {
        assert_eq!(
            parse_bold_spans("**a*b** tail"),
            vec![Span::plain("**a*b** tail")]
        );
    }

    #[test]
    fn test_triple_star_bolds_inner_text() {
        assert_eq!(
            parse_bold_spans("***a**"),
            vec![Span::plain("*"), Span::bold("a")]
        );
    }

    #[test]
    fn test_multibyte_text_around_markers() {
        assert_eq!(
            parse_bold_spans("café **naïve** – ok"),
            vec![
                Span::plain("café "),
                Span::bold("naïve"),
                Span::plain(" – ok"),
            ]
        );
    }
}

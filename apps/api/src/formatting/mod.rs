//! Answer formatter: turns LLM answer text into styled blocks.
//!
//! Answer text is split on blank lines into blocks, each block into lines, and
//! every line becomes exactly one `FormattedBlock`. The first matching rule wins:
//!
//! | prefix         | style           | indent   | bold parsing |
//! |----------------|-----------------|----------|--------------|
//! | `### `         | Heading         | none     | no           |
//! | `1. ` / `- `   | PrimaryBullet   | level 1  | yes          |
//! | `  - `         | SecondaryBullet | level 2  | yes          |
//! | anything else  | Plain           | none     | yes          |
//!
//! Pure functions only; the same input always yields the same blocks.

pub mod spans;

use serde::{Deserialize, Serialize};

pub use spans::{parse_bold_spans, Span};

/// Heading runs are set at 14pt.
pub const HEADING_SIZE_PT: u32 = 14;
/// Body runs (plain and bullets) are set at 11pt.
pub const BODY_SIZE_PT: u32 = 11;
/// Left indent of one bullet level.
pub const INDENT_STEP_PT: u32 = 20;

const HEADING_PREFIX: &str = "### ";
const PRIMARY_PREFIXES: [&str; 2] = ["1. ", "- "];
const SECONDARY_PREFIX: &str = "  - ";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BlockStyle {
    Heading,
    PrimaryBullet,
    SecondaryBullet,
    Plain,
}

impl BlockStyle {
    /// Indent level: 0 for headings and plain text, 1 and 2 for bullets.
    pub fn indent_level(self) -> u32 {
        match self {
            BlockStyle::PrimaryBullet => 1,
            BlockStyle::SecondaryBullet => 2,
            BlockStyle::Heading | BlockStyle::Plain => 0,
        }
    }

    pub fn indent_pt(self) -> u32 {
        self.indent_level() * INDENT_STEP_PT
    }

    pub fn font_size_pt(self) -> u32 {
        match self {
            BlockStyle::Heading => HEADING_SIZE_PT,
            _ => BODY_SIZE_PT,
        }
    }
}

/// One formatted line of answer text.
///
/// `marker` holds the bullet prefix stripped from the line (`"- "`, `"1. "`,
/// `"  - "`), so no source text is lost; it is empty for headings and plain lines.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormattedBlock {
    pub style: BlockStyle,
    pub marker: String,
    pub spans: Vec<Span>,
}

impl FormattedBlock {
    /// Concatenated span text, without the bullet marker.
    #[cfg(test)]
    pub fn text(&self) -> String {
        self.spans.iter().map(|s| s.text.as_str()).collect()
    }
}

/// Formats a single line.
pub fn format_block(line: &str) -> FormattedBlock {
    if let Some(rest) = line.strip_prefix(HEADING_PREFIX) {
        return FormattedBlock {
            style: BlockStyle::Heading,
            marker: String::new(),
            spans: vec![Span::bold(rest)],
        };
    }

    for prefix in PRIMARY_PREFIXES {
        if let Some(rest) = line.strip_prefix(prefix) {
            return bullet(BlockStyle::PrimaryBullet, prefix, rest);
        }
    }

    if let Some(rest) = line.strip_prefix(SECONDARY_PREFIX) {
        return bullet(BlockStyle::SecondaryBullet, SECONDARY_PREFIX, rest);
    }

    FormattedBlock {
        style: BlockStyle::Plain,
        marker: String::new(),
        spans: parse_bold_spans(line),
    }
}

fn bullet(style: BlockStyle, marker: &str, rest: &str) -> FormattedBlock {
    FormattedBlock {
        style,
        marker: marker.to_string(),
        spans: parse_bold_spans(rest),
    }
}

/// Splits answer text into lines the way the document renders them: first on
/// blank-line separators, then on line breaks. Separators are not lines
/// themselves, but an empty line inside a block (e.g. from `"\n\n\n"`) is.
pub fn answer_lines(answer: &str) -> impl Iterator<Item = &str> {
    answer.split("\n\n").flat_map(split_lines)
}

/// `\n`, `\r\n` and a lone `\r` all end a line, as do the other Unicode line
/// and paragraph separators. A trailing break does not start an empty line.
fn split_lines(text: &str) -> Vec<&str> {
    let mut lines = Vec::new();
    let mut start = 0;
    let mut chars = text.char_indices().peekable();
    while let Some((i, c)) = chars.next() {
        if !is_line_break(c) {
            continue;
        }
        lines.push(&text[start..i]);
        start = i + c.len_utf8();
        if c == '\r' {
            if let Some(&(j, '\n')) = chars.peek() {
                chars.next();
                start = j + 1;
            }
        }
    }
    if start < text.len() {
        lines.push(&text[start..]);
    }
    lines
}

fn is_line_break(c: char) -> bool {
    matches!(
        c,
        '\n' | '\r' | '\u{0b}' | '\u{0c}' | '\u{1c}'..='\u{1e}' | '\u{85}' | '\u{2028}' | '\u{2029}'
    )
}

/// Formats a whole answer, one block per line in original order.
pub fn format_answer(answer: &str) -> Vec<FormattedBlock> {
    answer_lines(answer).map(format_block).collect()
}

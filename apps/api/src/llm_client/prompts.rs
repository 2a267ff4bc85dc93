// Shared prompt fragments. Pipeline-specific templates live in
// generation/prompts.rs next to the code that fills them in.

/// System prompt for question generation and refinement.
pub const QUESTION_SYSTEM: &str = "You are an expert interviewer who writes clear, \
    self-contained interview questions. Output only the questions, one per line, \
    each ending with a question mark or a period. Do not add headings, preambles \
    or closing remarks.";

/// System prompt for answering a question from retrieved context.
pub const ANSWER_SYSTEM: &str = "You are a precise technical assistant preparing a \
    candidate for an interview. Answer from the provided context. You may use \
    markdown headings (### ), bullet points (- ), nested bullets (two spaces then - ) \
    and **bold** for key terms. Do not use any other markdown.";

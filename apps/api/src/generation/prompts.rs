//! Prompt templates for the generation pipeline.
//!
//! Placeholders are `{name}`; fill them with `fill_template`, which
//! substitutes in a single pass so document text containing braces is never
//! re-expanded.

/// First pass over the source: draft questions from one chunk.
pub const QUESTION_PROMPT_TEMPLATE: &str = r#"You are an expert at creating interview questions across multiple domains, including coding, theoretical knowledge, and behavioral insights.
Your goal is to thoroughly prepare an individual for various aspects of their interview, including technical proficiency, problem-solving, and personal fit.
Using the material below, create at least {num_questions} questions that assess coding skills, technical understanding, problem-solving abilities, and general reasoning where applicable.

------------
{text}
------------

Ensure each question provides significant value and covers diverse aspects of the material.
Make sure not to lose any important information.
Give only the questions, in English, without headings.

QUESTIONS:
"#;

/// Every further chunk: refine the running question list with new context.
pub const REFINE_PROMPT_TEMPLATE: &str = r#"You are an expert at refining interview questions to cover a comprehensive range of topics.
Your goal is to ensure readiness of an individual for both technical and non-technical aspects of an interview.
We have received some practice questions to a certain extent: {existing_answer}.
Select the best {num_questions} questions from the list, focusing on those that cover diverse competencies.
You may refine the existing questions, or add new ones only if necessary, using the additional context below.

------------
{text}
------------

Given the new context, improve the questions where relevant or introduce new ones to cover any missing aspects.
If the context is not helpful, return the original questions.
Put the question number in front of each question.

QUESTIONS:
"#;

/// Answer a question from the retrieved chunks.
pub const ANSWER_PROMPT_TEMPLATE: &str = r#"Use the following pieces of context to answer the question at the end. If you don't know the answer, just say that you don't know, don't try to make up an answer.

{context}

Question: {question}
Helpful Answer:"#;

/// Substitutes `{key}` placeholders from `values`. Unknown placeholders and
/// stray braces are copied through unchanged.
pub fn fill_template(template: &str, values: &[(&str, &str)]) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(open) = rest.find('{') {
        out.push_str(&rest[..open]);
        let after = &rest[open + 1..];
        let substituted = after.find('}').and_then(|close| {
            let key = &after[..close];
            values
                .iter()
                .find(|(k, _)| *k == key)
                .map(|(_, v)| (*v, close))
        });
        match substituted {
            Some((value, close)) => {
                out.push_str(value);
                rest = &after[close + 1..];
            }
            None => {
                out.push('{');
                rest = after;
            }
        }
    }
    out.push_str(rest);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fill_replaces_known_keys() {
        let out = fill_template("{a} and {b}", &[("a", "x"), ("b", "y")]);
        assert_eq!(out, "x and y");
    }

    #[test]
    fn test_fill_does_not_reexpand_values() {
        let out = fill_template("{text} / {num_questions}", &[("text", "{num_questions}"), ("num_questions", "5")]);
        assert_eq!(out, "{num_questions} / 5");
    }

    #[test]
    fn test_fill_keeps_unknown_and_stray_braces() {
        let out = fill_template("fn main() { {unknown} }", &[("text", "t")]);
        assert_eq!(out, "fn main() { {unknown} }");
    }

    #[test]
    fn test_question_template_has_all_placeholders_filled() {
        let out = fill_template(QUESTION_PROMPT_TEMPLATE, &[("text", "body"), ("num_questions", "7")]);
        assert!(out.contains("at least 7 questions"));
        assert!(out.contains("body"));
        assert!(!out.contains("{text}"));
    }
}

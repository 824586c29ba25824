//! Persona prompt assembly.
//!
//! The persona template is compiled into the binary and substituted with the
//! caller's question verbatim. Nothing here escapes, truncates or filters the
//! question; the behavioral rules live in the template text itself.

use once_cell::sync::Lazy;

/// Token in the template that is replaced by the caller's question.
pub const QUESTION_PLACEHOLDER: &str = "{User_question}";

static PERSONA_TEMPLATE: Lazy<&'static str> =
    Lazy::new(|| include_str!("../prompts/base_context.txt").trim());

/// The persona template, trimmed of surrounding whitespace.
pub fn persona_template() -> &'static str {
    *PERSONA_TEMPLATE
}

/// Substitute every placeholder in `template` with `question`.
///
/// The replacement text is never re-scanned, so a question that itself
/// contains the placeholder is inserted literally.
pub fn build_prompt(template: &str, question: &str) -> String {
    template.replace(QUESTION_PLACEHOLDER, question)
}

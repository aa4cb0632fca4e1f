//! System prompt and grounding text for document Q&A.
//!
//! Every prompt lives here so the model-facing wording can change without
//! touching retry or session logic in [`crate::chat`], and so tests can
//! inspect the exact text the model receives.
//!
//! Callers can override the default via [`crate::config::ChatConfig::system_prompt`];
//! an override must contain [`GROUNDING_PLACEHOLDER`], which is replaced by
//! the selected paragraphs.

use crate::document::Paragraph;

/// Marker replaced by the formatted grounding paragraphs.
pub const GROUNDING_PLACEHOLDER: &str = "{grounding}";

/// Default system prompt for answering questions about a PDF.
///
/// The citation format in rule 4 is what [`crate::citations::extract_citations`]
/// parses back out of the answer. Keep the two in step.
pub const DEFAULT_SYSTEM_PROMPT: &str = r#"You are an assistant specialised in analysing PDF documents.

Here is the relevant content of the PDF:

{grounding}

Rules to follow:
1. Use only the information from the PDF content above
2. If the answer is not in the PDF, say so clearly
3. Quote the relevant passages of the PDF and give their page numbers
4. Citation format: "page X: [quoted text]"
5. Be concise"#;

/// Format paragraphs as the page-tagged grounding block.
///
/// Each paragraph becomes `[Page <page>] : <text>`; entries are separated by
/// a blank line. The page tags are what lets the model cite pages at all.
///
/// ```rust
/// use pdfchat::{prompts::format_grounding, Paragraph};
///
/// let text = format_grounding(&[
///     Paragraph::new("Intro.", 1, 0),
///     Paragraph::new("Revenue grew.", 3, 7),
/// ]);
/// assert_eq!(text, "[Page 1] : Intro.\n\n[Page 3] : Revenue grew.");
/// ```
pub fn format_grounding(paragraphs: &[Paragraph]) -> String {
    paragraphs
        .iter()
        .map(|p| format!("[Page {}] : {}", p.page, p.text))
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// Substitute the grounding block into `template` (or the default prompt).
pub fn build_system_prompt(template: Option<&str>, paragraphs: &[Paragraph]) -> String {
    template
        .unwrap_or(DEFAULT_SYSTEM_PROMPT)
        .replace(GROUNDING_PLACEHOLDER, &format_grounding(paragraphs))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_prompt_has_placeholder_once() {
        assert_eq!(DEFAULT_SYSTEM_PROMPT.matches(GROUNDING_PLACEHOLDER).count(), 1);
    }

    #[test]
    fn default_prompt_requests_parsable_citations() {
        assert!(DEFAULT_SYSTEM_PROMPT.contains("page X: [quoted text]"));
        let cited = crate::citations::extract_citations("page 4: [quoted text]");
        assert_eq!(cited.len(), 1);
    }

    #[test]
    fn grounding_empty() {
        assert_eq!(format_grounding(&[]), "");
    }

    #[test]
    fn build_default_prompt() {
        let prompt = build_system_prompt(None, &[Paragraph::new("Costs fell.", 2, 0)]);
        assert!(prompt.contains("[Page 2] : Costs fell."));
        assert!(!prompt.contains(GROUNDING_PLACEHOLDER));
    }

    #[test]
    fn build_custom_prompt() {
        let prompt = build_system_prompt(
            Some("Context:\n{grounding}\nAnswer in French."),
            &[Paragraph::new("A.", 1, 0), Paragraph::new("B.", 1, 1)],
        );
        assert_eq!(
            prompt,
            "Context:\n[Page 1] : A.\n\n[Page 1] : B.\nAnswer in French."
        );
    }
}

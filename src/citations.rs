//! Page citations in model answers.
//!
//! The system prompt asks the model to cite its sources as
//! `page 3: <quoted text>`. [`extract_citations`] recovers those
//! `(page, text)` pairs so the UI can offer "jump to page" links.
//!
//! Parsing is deliberately forgiving: models wander from the requested
//! format, and a missed citation is better than a failed answer. Nothing
//! in this module returns an error.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

/// A page reference recovered from model output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Citation {
    /// 1-based page number.
    pub page: u32,
    /// Quoted text, trimmed. May be empty when two markers are adjacent.
    pub text: String,
}

impl Citation {
    pub fn new(page: u32, text: impl Into<String>) -> Self {
        Self {
            page,
            text: text.into(),
        }
    }
}

/// `page <N> :`, any case, whitespace optional. ASCII digits only so the
/// capture always parses.
static RE_PAGE_MARKER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\bpage\s*([0-9]+)\s*:").unwrap());

/// `[P<n>]` followed by everything up to the next `[`.
static RE_BRACKET_REF: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\[P([0-9]+)\]([^\[]*)").unwrap());

/// Extract every `page N: text` citation, in order of appearance.
///
/// Each citation's text runs from its marker to the next marker (or the end
/// of the input) and may span lines. Markers whose page is 0 or does not fit
/// in a `u32` are skipped; their text is dropped with them.
///
/// ```rust
/// use pdfchat::{extract_citations, Citation};
///
/// let found = extract_citations("page 3: Revenue grew 10%. page 7: Costs fell.");
/// assert_eq!(
///     found,
///     vec![Citation::new(3, "Revenue grew 10%."), Citation::new(7, "Costs fell.")]
/// );
/// assert!(extract_citations("No sources here.").is_empty());
/// ```
pub fn extract_citations(model_text: &str) -> Vec<Citation> {
    let markers: Vec<(usize, usize, Option<u32>)> = RE_PAGE_MARKER
        .captures_iter(model_text)
        .filter_map(|caps| {
            let whole = caps.get(0)?;
            let page = caps
                .get(1)
                .and_then(|m| m.as_str().parse::<u32>().ok())
                .filter(|&p| p >= 1);
            Some((whole.start(), whole.end(), page))
        })
        .collect();

    let mut citations = Vec::with_capacity(markers.len());
    for (i, &(_, text_start, page)) in markers.iter().enumerate() {
        let Some(page) = page else {
            continue;
        };
        let text_end = markers
            .get(i + 1)
            .map_or(model_text.len(), |&(next_start, _, _)| next_start);
        citations.push(Citation::new(page, model_text[text_start..text_end].trim()));
    }
    citations
}

/// Text following the `[P<page>]` marker up to the next `[`, trimmed.
///
/// Returns an empty string when the page is never referenced. Only the
/// first reference to `page` is used.
///
/// ```rust
/// use pdfchat::citations::reference_text;
///
/// let answer = "Sales rose [P2] in the north region [P5] and fell elsewhere.";
/// assert_eq!(reference_text(answer, 2), "in the north region");
/// assert_eq!(reference_text(answer, 9), "");
/// ```
pub fn reference_text(content: &str, page: u32) -> String {
    RE_BRACKET_REF
        .captures_iter(content)
        .find(|caps| {
            caps.get(1)
                .and_then(|m| m.as_str().parse::<u32>().ok())
                .is_some_and(|p| p == page)
        })
        .and_then(|caps| caps.get(2))
        .map(|m| m.as_str().trim().to_string())
        .unwrap_or_default()
}

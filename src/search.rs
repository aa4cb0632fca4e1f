//! Page-level keyword search, the "find in document" box next to the chat.
//!
//! Unlike the ranker this works on whole pages and requires every query
//! term to be present. Matching ignores case and accents; excerpts are cut
//! from the original text so they read as the PDF does.

use crate::document::Document;
use crate::normalize::normalize_text;
use serde::{Deserialize, Serialize};

/// Chars of context kept before the first term's occurrence.
pub const EXCERPT_BEFORE: usize = 50;

/// Chars kept from the first term's occurrence onward.
pub const EXCERPT_AFTER: usize = 200;

/// One page containing every query term.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchHit {
    /// 1-based page number.
    pub page: u32,
    /// Text around the first term's first occurrence, trimmed.
    pub excerpt: String,
}

/// Search per-page text; `pages[0]` is page 1.
///
/// Terms are the whitespace-separated words of `query`. A query with no
/// terms matches nothing.
///
/// ```rust
/// use pdfchat::search::search_pages;
///
/// let hits = search_pages("net income", &["Revenue only.", "Net income rose; income tax fell."]);
/// assert_eq!(hits.len(), 1);
/// assert_eq!(hits[0].page, 2);
/// ```
pub fn search_pages<S: AsRef<str>>(query: &str, pages: &[S]) -> Vec<SearchHit> {
    let numbered = pages
        .iter()
        .enumerate()
        .filter_map(|(i, text)| Some((u32::try_from(i + 1).ok()?, text.as_ref())));
    search_numbered(query, numbered)
}

/// Search a loaded document page by page.
///
/// Only pages that hold paragraphs are visited, and hits carry the
/// paragraphs' own page numbers.
pub fn search_document(query: &str, document: &Document) -> Vec<SearchHit> {
    let pages = document.page_texts();
    search_numbered(query, pages.iter().map(|(page, text)| (*page, text.as_str())))
}

fn search_numbered<'a>(
    query: &str,
    pages: impl Iterator<Item = (u32, &'a str)>,
) -> Vec<SearchHit> {
    let terms: Vec<String> = query.split_whitespace().map(normalize_text).collect();
    if terms.is_empty() {
        return Vec::new();
    }

    pages
        .filter_map(|(page, text)| {
            search_page(&terms, text).map(|excerpt| SearchHit { page, excerpt })
        })
        .collect()
}

fn search_page(terms: &[String], text: &str) -> Option<String> {
    let original: Vec<char> = text.chars().collect();
    let (folded, origin) = fold_with_origin(&original);

    if !terms.iter().all(|t| folded.contains(t.as_str())) {
        return None;
    }

    let byte_pos = folded.find(terms[0].as_str())?;
    let folded_char_pos = folded[..byte_pos].chars().count();
    let start = origin.get(folded_char_pos).copied().unwrap_or(original.len());

    let from = start.saturating_sub(EXCERPT_BEFORE);
    let to = (start + EXCERPT_AFTER).min(original.len());
    let excerpt: String = original[from..to].iter().collect();
    Some(excerpt.trim().to_string())
}

/// Fold `chars` for matching and record, for each folded char, the position
/// of the original char it came from.
fn fold_with_origin(chars: &[char]) -> (String, Vec<usize>) {
    let mut folded = String::with_capacity(chars.len());
    let mut origin = Vec::with_capacity(chars.len());
    let mut buf = [0u8; 4];

    for (pos, c) in chars.iter().enumerate() {
        for f in normalize_text(c.encode_utf8(&mut buf)).chars() {
            folded.push(f);
            origin.push(pos);
        }
    }
    (folded, origin)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::Paragraph;

    #[test]
    fn all_terms_required() {
        let pages = ["alpha beta", "alpha gamma", "beta gamma alpha"];
        let hits = search_pages("alpha gamma", &pages);
        let found: Vec<u32> = hits.iter().map(|h| h.page).collect();
        assert_eq!(found, vec![2, 3]);
    }

    #[test]
    fn case_and_accent_insensitive() {
        let hits = search_pages("resume", &["Le RÉSUMÉ du rapport"]);
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].excerpt, "Le RÉSUMÉ du rapport");
    }

    #[test]
    fn excerpt_window() {
        let page = format!("{}needle{}", "a".repeat(80), "b".repeat(300));
        let hits = search_pages("needle", &[page]);
        let excerpt = &hits[0].excerpt;
        assert_eq!(excerpt.chars().count(), EXCERPT_BEFORE + EXCERPT_AFTER);
        assert!(excerpt.starts_with(&"a".repeat(50)));
        assert!(excerpt[50..].starts_with("needle"));
    }

    #[test]
    fn excerpt_clamped_at_page_start() {
        let hits = search_pages("first", &["first words of the page"]);
        assert_eq!(hits[0].excerpt, "first words of the page");
    }

    #[test]
    fn excerpt_anchored_on_first_term() {
        let page = format!("{} zebra {} apple", "x".repeat(10), "y".repeat(300));
        let hits = search_pages("apple zebra", &[page]);
        // Anchored on "apple", far past "zebra".
        assert!(hits[0].excerpt.ends_with("apple"));
        assert!(!hits[0].excerpt.contains("zebra"));
    }

    #[test]
    fn multibyte_text_cuts_on_char_boundaries() {
        let page = format!("{}cible{}", "é".repeat(60), "ü".repeat(250));
        let hits = search_pages("cible", &[page]);
        assert_eq!(hits[0].excerpt.chars().count(), 250);
    }

    #[test]
    fn empty_query_matches_nothing() {
        assert!(search_pages("   ", &["anything"]).is_empty());
    }

    #[test]
    fn search_document_uses_pages() {
        let doc = Document::from_pages(&["Intro.", "Nothing here.", "Budget review."]);
        let hits = search_document("budget", &doc);
        assert_eq!(hits, vec![SearchHit { page: 3, excerpt: "Budget review.".into() }]);
    }

    #[test]
    fn search_document_keeps_sparse_page_numbers() {
        let doc = Document::from_paragraphs(vec![
            Paragraph::new("Cover page.", 1, 0),
            Paragraph::new("The needle is here.", u32::MAX, 1),
        ])
        .unwrap();
        let hits = search_document("needle", &doc);
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].page, u32::MAX);
        assert_eq!(hits[0].excerpt, "The needle is here.");
    }
}

//! Page-tagged paragraphs: the unit of retrieval.
//!
//! PDF text extraction happens upstream (in the browser, or via a tool such
//! as `pdftotext`). This module only receives its output:
//!
//! * a JSON array of `{ "text", "page", "index" }` paragraphs, or
//! * per-page text, which [`Document::from_pages`] splits into paragraphs
//!   on blank lines.
//!
//! Either way the resulting [`Document`] upholds two invariants the ranker
//! relies on: `index` is strictly increasing in document order and every
//! `page` is ≥ 1.

use crate::error::PdfChatError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use tracing::debug;

/// Page separator emitted by `pdftotext` and most PDF text extractors.
pub const FORM_FEED: char = '\u{000C}';

/// A unit of extracted document text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Paragraph {
    /// Paragraph text as extracted.
    pub text: String,
    /// 1-based source page.
    pub page: u32,
    /// Stable position across the whole document.
    pub index: usize,
}

impl Paragraph {
    pub fn new(text: impl Into<String>, page: u32, index: usize) -> Self {
        Self {
            text: text.into(),
            page,
            index,
        }
    }
}

/// A paragraph with its relevance score for one query.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoredParagraph {
    pub paragraph: Paragraph,
    /// Number of matched query tokens (exact) or summed similarity (fuzzy).
    pub score: f64,
}

/// An ordered, validated sequence of paragraphs.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Document {
    paragraphs: Vec<Paragraph>,
}

impl Document {
    /// Wrap paragraphs produced elsewhere, checking ordering and page numbers.
    pub fn from_paragraphs(paragraphs: Vec<Paragraph>) -> Result<Self, PdfChatError> {
        for (position, pair) in paragraphs.windows(2).enumerate() {
            if pair[1].index <= pair[0].index {
                return Err(PdfChatError::IndexOutOfOrder {
                    position: position + 1,
                    previous: pair[0].index,
                    index: pair[1].index,
                });
            }
        }
        if let Some(p) = paragraphs.iter().find(|p| p.page == 0) {
            return Err(PdfChatError::InvalidPage { index: p.index });
        }
        Ok(Self { paragraphs })
    }

    /// Build paragraphs from per-page text; `pages[0]` is page 1.
    ///
    /// Paragraphs are separated by blank lines. Whitespace inside a
    /// paragraph (including the hard line breaks PDF extraction leaves
    /// mid-sentence) collapses to single spaces. Empty paragraphs are
    /// dropped; indexes are contiguous from 0.
    pub fn from_pages<S: AsRef<str>>(pages: &[S]) -> Self {
        let mut paragraphs = Vec::new();
        for (page_idx, page_text) in pages.iter().enumerate() {
            let page = u32::try_from(page_idx + 1).unwrap_or(u32::MAX);
            for block in split_blocks(page_text.as_ref()) {
                let index = paragraphs.len();
                paragraphs.push(Paragraph::new(block, page, index));
            }
        }
        debug!(
            "Segmented {} pages into {} paragraphs",
            pages.len(),
            paragraphs.len()
        );
        Self { paragraphs }
    }

    /// Build paragraphs from plain text whose pages are separated by form feeds.
    pub fn from_text(text: &str) -> Self {
        let pages: Vec<&str> = text.split(FORM_FEED).collect();
        // pdftotext terminates the last page with a form feed too.
        let pages = match pages.split_last() {
            Some((last, rest)) if last.trim().is_empty() && !rest.is_empty() => rest,
            _ => &pages[..],
        };
        Self::from_pages(pages)
    }

    /// Parse a JSON paragraph array.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        let paragraphs: Vec<Paragraph> = serde_json::from_str(json)?;
        Ok(Self { paragraphs })
    }

    /// Load a document from disk.
    ///
    /// Files ending in `.json` are parsed as a paragraph array and validated;
    /// anything else is treated as form-feed separated plain text.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, PdfChatError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => PdfChatError::DocumentNotFound {
                path: path.to_path_buf(),
            },
            _ => PdfChatError::DocumentRead {
                path: path.to_path_buf(),
                source: e,
            },
        })?;

        let is_json = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case("json"));

        if is_json {
            let parsed =
                Self::from_json(&content).map_err(|e| PdfChatError::MalformedDocument {
                    path: path.to_path_buf(),
                    detail: e.to_string(),
                })?;
            Self::from_paragraphs(parsed.paragraphs)
        } else {
            Ok(Self::from_text(&content))
        }
    }

    pub fn paragraphs(&self) -> &[Paragraph] {
        &self.paragraphs
    }

    pub fn len(&self) -> usize {
        self.paragraphs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paragraphs.is_empty()
    }

    /// Highest page number present, or 0 for an empty document.
    pub fn page_count(&self) -> u32 {
        self.paragraphs.iter().map(|p| p.page).max().unwrap_or(0)
    }

    /// Re-assemble the text of every page that has paragraphs, ascending
    /// by page number (paragraphs joined by blank lines).
    ///
    /// Pages without paragraphs are skipped, so the result never grows with
    /// the highest page number.
    pub fn page_texts(&self) -> Vec<(u32, String)> {
        let mut pages: BTreeMap<u32, String> = BTreeMap::new();
        for p in &self.paragraphs {
            let slot = pages.entry(p.page).or_default();
            if !slot.is_empty() {
                slot.push_str("\n\n");
            }
            slot.push_str(&p.text);
        }
        pages.into_iter().collect()
    }
}

/// Split page text into blank-line separated blocks with collapsed whitespace.
fn split_blocks(text: &str) -> Vec<String> {
    let mut blocks = Vec::new();
    let mut current: Vec<&str> = Vec::new();

    for line in text.lines() {
        if line.trim().is_empty() {
            flush_block(&mut current, &mut blocks);
        } else {
            current.push(line);
        }
    }
    flush_block(&mut current, &mut blocks);
    blocks
}

fn flush_block(lines: &mut Vec<&str>, blocks: &mut Vec<String>) {
    if lines.is_empty() {
        return;
    }
    let joined = lines
        .iter()
        .flat_map(|l| l.split_whitespace())
        .collect::<Vec<_>>()
        .join(" ");
    if !joined.is_empty() {
        blocks.push(joined);
    }
    lines.clear();
}

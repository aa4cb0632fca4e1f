//! Result types returned by a chat turn.

use crate::citations::Citation;
use serde::{Deserialize, Serialize};

/// A grounded answer to one question.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatAnswer {
    /// Model answer, as returned.
    pub content: String,

    /// Citations parsed from `content`, in order of appearance.
    pub citations: Vec<Citation>,

    /// Pages of the paragraphs sent as grounding, ascending and distinct.
    pub selected_pages: Vec<u32>,

    /// Prompt tokens reported by the provider.
    pub input_tokens: usize,

    /// Completion tokens reported by the provider.
    pub output_tokens: usize,

    /// Wall-clock time of the model call, including retries.
    pub duration_ms: u64,

    /// Retries needed before the call succeeded.
    pub retries: u32,
}

impl ChatAnswer {
    /// Distinct cited pages in first-mention order, for "jump to page" links.
    pub fn cited_pages(&self) -> Vec<u32> {
        let mut pages: Vec<u32> = Vec::new();
        for c in &self.citations {
            if !pages.contains(&c.page) {
                pages.push(c.page);
            }
        }
        pages
    }

    /// True when the model cited nothing; usually the answer is not in the
    /// document or the model ignored the citation format.
    pub fn is_uncited(&self) -> bool {
        self.citations.is_empty()
    }
}

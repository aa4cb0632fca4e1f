//! Paragraph relevance ranking: pick the grounding text for one question.
//!
//! ## Algorithm
//!
//! ```text
//! query ──▶ tokens ──▶ score every paragraph ──▶ top matches ──▶ + neighbours ──▶ cap ──▶ sort by index
//!                           │
//!                           └─ nothing matched ──▶ first paragraphs of the document
//! ```
//!
//! 1. Normalise query and paragraphs ([`crate::normalize`]).
//! 2. Score each paragraph with the configured [`MatchStrategy`]; drop
//!    paragraphs scoring 0.
//! 3. If nothing scored, fall back to the first `min(fallback_count,
//!    max_paragraphs)` paragraphs. The model always gets some text.
//! 4. Take the `top_matches` best (ties keep document order) and add
//!    `context_window` neighbours on each side.
//! 5. Cap at `max_paragraphs` (matches before neighbours, best first), then
//!    sort by `index`.
//!
//! The output is in reading order, never relevance order: the model sees
//! page tags ascending, which keeps the page numbers it echoes back sane.
//!
//! Ranking is pure and total. Same input, same output, no errors.

use crate::config::{MatchStrategy, RankerConfig};
use crate::document::{Paragraph, ScoredParagraph};
use crate::normalize::{normalize_text, tokenize};
use crate::similarity::best_similarity;
use std::cmp::Ordering;
use std::collections::HashSet;
use tracing::debug;

/// Selects the paragraphs most likely to answer a question.
///
/// Holds only configuration, so it is `Send + Sync` and can be shared
/// freely between tasks.
#[derive(Debug, Clone, Default)]
pub struct Ranker {
    config: RankerConfig,
}

impl Ranker {
    pub fn new(config: RankerConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &RankerConfig {
        &self.config
    }

    /// Select up to `max_paragraphs` paragraphs for `query`, in index order.
    ///
    /// `paragraphs` must be in document order (ascending `index`). A
    /// `top_matches` or `fallback_count` of 0 counts as 1, so non-empty
    /// input always yields a non-empty selection.
    pub fn rank(&self, query: &str, paragraphs: &[Paragraph]) -> Vec<Paragraph> {
        let max = self.config.max_paragraphs;
        if paragraphs.is_empty() || max == 0 {
            return Vec::new();
        }

        let matches = self.ranked_positions(query, paragraphs);

        if matches.is_empty() {
            let n = self.config.fallback_count.max(1).min(max).min(paragraphs.len());
            debug!("No paragraph matched; falling back to the first {}", n);
            return paragraphs[..n].to_vec();
        }

        let top: Vec<usize> = matches
            .iter()
            .take(self.config.top_matches.max(1))
            .map(|(pos, _)| *pos)
            .collect();

        let mut seen: HashSet<usize> = HashSet::new();
        let mut selected: Vec<usize> = Vec::with_capacity(max);
        let mut push = |pos: usize, selected: &mut Vec<usize>| {
            if seen.insert(paragraphs[pos].index) {
                selected.push(pos);
            }
        };

        for &pos in &top {
            push(pos, &mut selected);
        }
        for &pos in &top {
            for offset in 1..=self.config.context_window {
                if let Some(before) = pos.checked_sub(offset) {
                    push(before, &mut selected);
                }
                if pos + offset < paragraphs.len() {
                    push(pos + offset, &mut selected);
                }
            }
        }

        selected.truncate(max);
        selected.sort_by_key(|&pos| paragraphs[pos].index);

        debug!(
            "Selected {} of {} paragraphs ({} matched, best score {:.2})",
            selected.len(),
            paragraphs.len(),
            matches.len(),
            matches[0].1
        );

        selected.into_iter().map(|pos| paragraphs[pos].clone()).collect()
    }

    /// Every matching paragraph with its score, best first.
    ///
    /// Ties keep document order. Non-matching paragraphs are omitted.
    pub fn score(&self, query: &str, paragraphs: &[Paragraph]) -> Vec<ScoredParagraph> {
        self.ranked_positions(query, paragraphs)
            .into_iter()
            .map(|(pos, score)| ScoredParagraph {
                paragraph: paragraphs[pos].clone(),
                score,
            })
            .collect()
    }

    /// `(position, score)` for each paragraph scoring above zero, best first.
    fn ranked_positions(&self, query: &str, paragraphs: &[Paragraph]) -> Vec<(usize, f64)> {
        let query_tokens = tokenize(query, self.config.min_token_len);
        if query_tokens.is_empty() {
            return Vec::new();
        }

        let mut scored: Vec<(usize, f64)> = paragraphs
            .iter()
            .enumerate()
            .map(|(pos, p)| (pos, self.score_paragraph(&query_tokens, &p.text)))
            .filter(|(_, score)| *score > 0.0)
            .collect();

        // Stable: equal scores stay in document order.
        scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(Ordering::Equal));
        scored
    }

    fn score_paragraph(&self, query_tokens: &[String], text: &str) -> f64 {
        match self.config.strategy {
            MatchStrategy::Exact => {
                let haystack = normalize_text(text);
                query_tokens
                    .iter()
                    .filter(|t| haystack.contains(t.as_str()))
                    .count() as f64
            }
            MatchStrategy::Fuzzy => {
                let words = tokenize(text, self.config.min_token_len);
                query_tokens
                    .iter()
                    .map(|t| best_similarity(t, words.iter().map(String::as_str)))
                    .sum()
            }
        }
    }
}

/// Rank with default settings and the given cap.
///
/// ```rust
/// use pdfchat::{rank, Paragraph};
///
/// let doc = vec![
///     Paragraph::new("Table of contents", 1, 0),
///     Paragraph::new("Revenue grew ten percent.", 2, 1),
/// ];
/// let picked = rank("What happened to revenue?", &doc, 5);
/// assert_eq!(picked.len(), 2);
/// assert_eq!(picked[1].page, 2);
/// ```
pub fn rank(query: &str, paragraphs: &[Paragraph], max_paragraphs: usize) -> Vec<Paragraph> {
    let config = RankerConfig {
        max_paragraphs,
        ..RankerConfig::default()
    };
    Ranker::new(config).rank(query, paragraphs)
}

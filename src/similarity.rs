//! Word-level fuzzy similarity for typo- and inflection-tolerant matching.
//!
//! Used by [`crate::config::MatchStrategy::Fuzzy`]. Inputs are single
//! normalised tokens (see [`crate::normalize`]), never whole paragraphs, so
//! the quadratic edit-distance table stays tiny.

/// Score returned when one token contains the other ("revenue" / "revenues").
pub const SUBSTRING_SIMILARITY: f64 = 0.8;

/// Edit-distance similarities at or below this value count as no match.
pub const MATCH_THRESHOLD: f64 = 0.8;

/// Classic Levenshtein distance (insert, delete and substitute all cost 1).
///
/// Works over chars so multi-byte letters count as one edit.
pub fn levenshtein(a: &str, b: &str) -> usize {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();

    if a.is_empty() {
        return b.len();
    }
    if b.is_empty() {
        return a.len();
    }

    // Two rolling rows of the DP table.
    let mut prev: Vec<usize> = (0..=b.len()).collect();
    let mut curr = vec![0usize; b.len() + 1];

    for (i, ca) in a.iter().enumerate() {
        curr[0] = i + 1;
        for (j, cb) in b.iter().enumerate() {
            let substitution = prev[j] + usize::from(ca != cb);
            let deletion = prev[j + 1] + 1;
            let insertion = curr[j] + 1;
            curr[j + 1] = substitution.min(deletion).min(insertion);
        }
        std::mem::swap(&mut prev, &mut curr);
    }

    prev[b.len()]
}

/// Similarity of two tokens in `[0.0, 1.0]`.
///
/// * `1.0` when equal
/// * [`SUBSTRING_SIMILARITY`] when one contains the other
/// * otherwise `1 - levenshtein / max_len`, kept only above
///   [`MATCH_THRESHOLD`]; anything lower is `0.0`
///
/// ```rust
/// use pdfchat::similarity::word_similarity;
///
/// assert!(word_similarity("color", "colour") > 0.8);
/// assert_eq!(word_similarity("cat", "dog"), 0.0);
/// ```
pub fn word_similarity(a: &str, b: &str) -> f64 {
    if a == b {
        return 1.0;
    }
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }
    if a.contains(b) || b.contains(a) {
        return SUBSTRING_SIMILARITY;
    }

    let max_len = a.chars().count().max(b.chars().count());
    let similarity = 1.0 - levenshtein(a, b) as f64 / max_len as f64;
    if similarity > MATCH_THRESHOLD {
        similarity
    } else {
        0.0
    }
}

/// Best [`word_similarity`] of `token` against any of `candidates`.
///
/// Stops early on an exact hit.
pub fn best_similarity<'a, I>(token: &str, candidates: I) -> f64
where
    I: IntoIterator<Item = &'a str>,
{
    let mut best = 0.0f64;
    for candidate in candidates {
        let s = word_similarity(token, candidate);
        if s > best {
            best = s;
            if best >= 1.0 {
                break;
            }
        }
    }
    best
}

//! Text normalisation shared by the ranker and the page search.
//!
//! Questions are typed by people and documents come out of PDF text
//! extraction, so the two rarely agree on case or accents ("Résumé" vs
//! "resume"). Both sides go through the same pipeline before any matching:
//!
//! 1. lower-case
//! 2. canonical decomposition (NFD), then drop combining marks
//! 3. split on whitespace and trim sentence punctuation, brackets and
//!    quotes from token edges, so a trailing "?" or "," does not hide a
//!    match
//! 4. keep tokens of at least the minimum length

use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

/// Tokens shorter than this many chars are discarded ("de", "of", "la", ...).
pub const DEFAULT_MIN_TOKEN_LEN: usize = 3;

/// Lower-case `text` and strip diacritics.
///
/// ```rust
/// use pdfchat::normalize::normalize_text;
///
/// assert_eq!(normalize_text("Élève À Noël"), "eleve a noel");
/// ```
pub fn normalize_text(text: &str) -> String {
    text.to_lowercase()
        .nfd()
        .filter(|c| !is_combining_mark(*c))
        .collect()
}

/// Normalise `text` and split it into tokens of at least `min_len` chars.
///
/// Length is counted in chars, not bytes, so accented words are not
/// favoured over their unaccented spelling. Symbols that carry meaning
/// stay on the token ("10%", "$48m", "e-mail").
pub fn tokenize(text: &str, min_len: usize) -> Vec<String> {
    normalize_text(text)
        .split_whitespace()
        .map(|t| t.trim_matches(is_edge_punctuation))
        .filter(|t| t.chars().count() >= min_len)
        .map(str::to_string)
        .collect()
}

/// Punctuation that hugs words in running text without being part of them.
fn is_edge_punctuation(c: char) -> bool {
    matches!(
        c,
        '.' | ',' | ';' | ':' | '!' | '?' | '(' | ')' | '[' | ']' | '{' | '}' | '"' | '\''
            | '«' | '»' | '“' | '”' | '‘' | '’'
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_accents_and_case() {
        assert_eq!(normalize_text("ÇA CRÉÉ"), "ca cree");
        assert_eq!(normalize_text("Müller"), "muller");
    }

    #[test]
    fn ascii_is_only_lowercased() {
        assert_eq!(normalize_text("Revenue Q3"), "revenue q3");
    }

    #[test]
    fn short_tokens_dropped() {
        let tokens = tokenize("Is it in the PDF at all?", DEFAULT_MIN_TOKEN_LEN);
        assert_eq!(tokens, vec!["the", "pdf", "all"]);
    }

    #[test]
    fn edge_punctuation_trimmed() {
        assert_eq!(
            tokenize("(revenue), growth: e-mail!", 3),
            vec!["revenue", "growth", "e-mail"]
        );
        assert!(tokenize("?? .. ()", 1).is_empty());
    }

    #[test]
    fn meaningful_symbols_kept() {
        assert_eq!(tokenize("Did costs fall 10%?", 3), vec!["did", "costs", "fall", "10%"]);
        assert_eq!(tokenize("“$48m” -", 1), vec!["$48m", "-"]);
    }

    #[test]
    fn length_counts_chars_not_bytes() {
        // "été" is 3 chars but 5 bytes before normalisation.
        assert_eq!(tokenize("été", 3), vec!["ete"]);
        assert!(tokenize("où", 3).is_empty());
    }

    #[test]
    fn empty_and_whitespace_input() {
        assert!(tokenize("", 3).is_empty());
        assert!(tokenize("   \n\t ", 3).is_empty());
    }
}

//! Error types for the pdfchat library.
//!
//! Only the collaborators around the retrieval core can fail: loading a
//! document, validating configuration, and talking to the language model.
//! The core itself ([`crate::ranker`], [`crate::citations`],
//! [`crate::search`], prompt formatting) is total. It degrades to fallbacks
//! (first paragraphs, empty citation list) instead of returning errors, so
//! nothing in it appears here.

use std::path::PathBuf;
use thiserror::Error;

/// All errors returned by the pdfchat library.
#[derive(Debug, Error)]
pub enum PdfChatError {
    // ── Document errors ───────────────────────────────────────────────────
    /// Document file was not found at the given path.
    #[error("Document not found: '{path}'\nCheck the path exists and is readable.")]
    DocumentNotFound { path: PathBuf },

    /// Document file exists but could not be read.
    #[error("Failed to read document '{path}': {source}")]
    DocumentRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A JSON paragraph file did not match the expected shape.
    #[error("Document '{path}' is not a valid paragraph list: {detail}\nExpected a JSON array of {{\"text\", \"page\", \"index\"}} objects.")]
    MalformedDocument { path: PathBuf, detail: String },

    /// Paragraph indexes must be strictly increasing in document order.
    #[error("Paragraph index {index} at position {position} does not follow index {previous}")]
    IndexOutOfOrder {
        position: usize,
        previous: usize,
        index: usize,
    },

    /// Pages are 1-based.
    #[error("Paragraph {index} has page 0; pages are numbered from 1")]
    InvalidPage { index: usize },

    // ── LLM errors ────────────────────────────────────────────────────────
    /// No provider was supplied and none could be created.
    #[error("LLM provider '{provider}' is not configured.\n{hint}")]
    ProviderNotConfigured { provider: String, hint: String },

    /// The LLM call failed on every attempt.
    #[error("LLM call failed after {retries} retries: {message}")]
    LlmFailed { retries: u32, message: String },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn index_out_of_order_display() {
        let e = PdfChatError::IndexOutOfOrder {
            position: 4,
            previous: 9,
            index: 7,
        };
        let msg = e.to_string();
        assert!(msg.contains("index 7"), "got: {msg}");
        assert!(msg.contains("position 4"), "got: {msg}");
    }

    #[test]
    fn llm_failed_display() {
        let e = PdfChatError::LlmFailed {
            retries: 2,
            message: "503 Service Unavailable".into(),
        };
        assert!(e.to_string().contains("2 retries"));
        assert!(e.to_string().contains("503"));
    }

    #[test]
    fn provider_not_configured_carries_hint() {
        let e = PdfChatError::ProviderNotConfigured {
            provider: "deepseek".into(),
            hint: "Set DEEPSEEK_API_KEY".into(),
        };
        let msg = e.to_string();
        assert!(msg.contains("deepseek"));
        assert!(msg.contains("DEEPSEEK_API_KEY"));
    }
}

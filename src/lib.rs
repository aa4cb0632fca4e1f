//! # pdfchat
//!
//! Ask questions about a PDF and get answers grounded in its text, with page
//! citations.
//!
//! ## Why this crate?
//!
//! Sending a whole document to a language model with every question is slow,
//! expensive and, past the context window, impossible. This crate keeps the
//! prompt small: it picks the handful of paragraphs most likely to answer the
//! question, tags each with its page, and asks the model to cite pages back.
//! Those citations are parsed out of the answer so a viewer can jump straight
//! to the source.
//!
//! ## Pipeline Overview
//!
//! ```text
//! page text
//!  │
//!  ├─ 1. Segment  split pages into page-tagged paragraphs     (document)
//!  ├─ 2. Rank     score, expand with neighbours, cap, reorder  (ranker)
//!  ├─ 3. Prompt   "[Page N] : text" grounding + rules          (prompts)
//!  ├─ 4. LLM      history window + question, retry/backoff     (chat)
//!  └─ 5. Cite     "page N: quote" → Citation list              (citations)
//! ```
//!
//! Steps 1, 2, 3 and 5 are pure, synchronous and infallible; only step 4
//! talks to the network.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use pdfchat::{ChatConfig, ChatSession, Document};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Plain text with form feeds between pages, e.g. from `pdftotext report.pdf`
//!     let document = Document::load("report.txt")?;
//!     let config = ChatConfig::builder()
//!         .provider_name("openai")
//!         .model("gpt-4.1-mini")
//!         .build()?;
//!
//!     let mut session = ChatSession::new(document, config)?;
//!     let answer = session.ask("How did revenue change?").await?;
//!     println!("{}", answer.content);
//!     for c in &answer.citations {
//!         eprintln!("page {}: {}", c.page, c.text);
//!     }
//!     Ok(())
//! }
//! ```
//!
//! Retrieval alone needs no model at all:
//!
//! ```rust
//! use pdfchat::{rank, Document};
//!
//! let doc = Document::from_pages(&["Contents.", "Revenue rose 10%.\n\nCosts fell."]);
//! let picked = rank("revenue", doc.paragraphs(), 5);
//! assert_eq!(picked[0].page, 1);
//! assert_eq!(picked[1].text, "Revenue rose 10%.");
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `pdfchat` binary (clap + anyhow + indicatif + tracing-subscriber) |
//!
//! Disable `cli` when using only the library:
//! ```toml
//! pdfchat = { version = "0.1", default-features = false }
//! ```

// ── Modules ──────────────────────────────────────────────────────────────

pub mod chat;
pub mod citations;
pub mod config;
pub mod document;
pub mod error;
pub mod normalize;
pub mod output;
pub mod progress;
pub mod prompts;
pub mod ranker;
pub mod search;
pub mod similarity;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use chat::{ChatSession, History, Role, Turn};
pub use citations::{extract_citations, Citation};
pub use config::{ChatConfig, ChatConfigBuilder, MatchStrategy, RankerConfig, RankerConfigBuilder};
pub use document::{Document, Paragraph, ScoredParagraph};
pub use error::PdfChatError;
pub use output::ChatAnswer;
pub use progress::{ChatProgressCallback, NoopProgressCallback, ProgressCallback};
pub use ranker::{rank, Ranker};
pub use search::{search_document, search_pages, SearchHit};

//! Chat sessions over one document.
//!
//! A [`ChatSession`] owns a document, its configuration and the
//! conversation so far. Each [`ChatSession::ask`] runs one turn:
//!
//! ```text
//! question ─▶ Ranker ─▶ system prompt + grounding ─┐
//!                                                  ├─▶ LLM (retry/backoff) ─▶ citations ─▶ ChatAnswer
//!               trailing history window ───────────┘
//! ```
//!
//! ## Message layout
//!
//! 1. **System message**: the system prompt with the selected paragraphs
//!    substituted for `{grounding}`
//! 2. **History**: the last `history_window` messages, oldest first
//! 3. **User message**: the question
//!
//! Grounding is recomputed for every question; earlier answers reach the
//! model only through the history window.
//!
//! ## Retry strategy
//!
//! Failed calls are retried up to `max_retries` times with exponential
//! backoff (`retry_backoff_ms * 2^(attempt-1)`): 500 ms then 1 s with the
//! defaults. History is only updated once a call succeeds, so a failed turn
//! can simply be asked again.

use crate::citations::extract_citations;
use crate::config::ChatConfig;
use crate::document::{Document, Paragraph};
use crate::error::PdfChatError;
use crate::output::ChatAnswer;
use crate::progress::{ChatProgressCallback, NoopProgressCallback};
use crate::prompts::build_system_prompt;
use crate::ranker::Ranker;
use edgequake_llm::{ChatMessage, CompletionOptions, LLMProvider, ProviderFactory};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use std::time::Instant;
use tokio::time::{sleep, Duration};
use tracing::{debug, info, warn};

/// Model used when a provider is named without a model.
pub const DEFAULT_MODEL: &str = "gpt-4.1-nano";

// ── History ──────────────────────────────────────────────────────────────

/// Who said a turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

/// One message of the conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Turn {
    pub role: Role,
    pub content: String,
}

impl Turn {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }

    fn to_message(&self) -> ChatMessage {
        match self.role {
            Role::User => ChatMessage::user(&self.content),
            Role::Assistant => ChatMessage::assistant(&self.content),
        }
    }
}

/// Append-only conversation log. Grows for the whole session; only a
/// trailing window is ever replayed to the model.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct History {
    turns: Vec<Turn>,
}

impl History {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, turn: Turn) {
        self.turns.push(turn);
    }

    pub fn turns(&self) -> &[Turn] {
        &self.turns
    }

    /// The last `n` turns (fewer if the history is shorter).
    ///
    /// The window never opens on an assistant turn: an answer whose question
    /// fell outside the window is left out as well.
    pub fn trailing(&self, n: usize) -> &[Turn] {
        let mut start = self.turns.len().saturating_sub(n);
        if self.turns.get(start).is_some_and(|t| t.role == Role::Assistant) {
            start += 1;
        }
        &self.turns[start..]
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    pub fn clear(&mut self) {
        self.turns.clear();
    }
}

// ── Messages ─────────────────────────────────────────────────────────────

/// Assemble the request: system prompt, replayed history, then the question.
pub fn build_messages(system_prompt: &str, history: &[Turn], question: &str) -> Vec<ChatMessage> {
    let mut messages = Vec::with_capacity(history.len() + 2);
    messages.push(ChatMessage::system(system_prompt));
    messages.extend(history.iter().map(Turn::to_message));
    messages.push(ChatMessage::user(question));
    messages
}

fn build_options(config: &ChatConfig) -> CompletionOptions {
    CompletionOptions {
        temperature: Some(config.temperature),
        max_tokens: Some(config.max_tokens),
        ..Default::default()
    }
}

/// Distinct pages of `paragraphs`, ascending.
fn pages_of(paragraphs: &[Paragraph]) -> Vec<u32> {
    let mut pages: Vec<u32> = paragraphs.iter().map(|p| p.page).collect();
    pages.sort_unstable();
    pages.dedup();
    pages
}

// ── Provider ─────────────────────────────────────────────────────────────

/// Resolve the LLM provider from the configuration.
///
/// 1. **Pre-built provider** (`config.provider`) is used as-is.
/// 2. **Named provider** (`config.provider_name`) is created through
///    [`ProviderFactory::create_llm_provider`] with `config.model`, or
///    [`DEFAULT_MODEL`]. The factory reads that provider's API key.
///
/// Nothing else is tried: choosing a provider from whatever happens to be
/// set in the environment is the caller's job (the `pdfchat` binary does it).
pub fn resolve_provider(config: &ChatConfig) -> Result<Arc<dyn LLMProvider>, PdfChatError> {
    if let Some(ref provider) = config.provider {
        return Ok(Arc::clone(provider));
    }

    if let Some(ref name) = config.provider_name {
        let model = config.model.as_deref().unwrap_or(DEFAULT_MODEL);
        return ProviderFactory::create_llm_provider(name, model).map_err(|e| {
            PdfChatError::ProviderNotConfigured {
                provider: name.clone(),
                hint: format!("{e}"),
            }
        });
    }

    Err(PdfChatError::ProviderNotConfigured {
        provider: "none".to_string(),
        hint: "Set ChatConfig::provider or ChatConfig::provider_name \
               (e.g. \"openai\" with OPENAI_API_KEY exported)."
            .to_string(),
    })
}

// ── Session ──────────────────────────────────────────────────────────────

/// A conversation about one document.
pub struct ChatSession {
    document: Document,
    config: ChatConfig,
    ranker: Ranker,
    provider: Arc<dyn LLMProvider>,
    history: History,
}

impl fmt::Debug for ChatSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChatSession")
            .field("paragraphs", &self.document.len())
            .field("config", &self.config)
            .field("history", &self.history.len())
            .finish()
    }
}

impl ChatSession {
    /// Start a session. Fails only if no provider can be resolved.
    pub fn new(document: Document, config: ChatConfig) -> Result<Self, PdfChatError> {
        let provider = resolve_provider(&config)?;
        let ranker = Ranker::new(config.ranker.clone());
        Ok(Self {
            document,
            config,
            ranker,
            provider,
            history: History::new(),
        })
    }

    pub fn document(&self) -> &Document {
        &self.document
    }

    pub fn config(&self) -> &ChatConfig {
        &self.config
    }

    pub fn history(&self) -> &History {
        &self.history
    }

    /// Forget the conversation; the document stays loaded.
    pub fn reset(&mut self) {
        debug!("Clearing {} history turns", self.history.len());
        self.history.clear();
    }

    /// Paragraphs that would be sent as grounding for `question`.
    pub fn select(&self, question: &str) -> Vec<Paragraph> {
        self.ranker.rank(question, self.document.paragraphs())
    }

    /// Messages that would be sent for `question` in the current state.
    pub fn messages_for(&self, question: &str) -> Vec<ChatMessage> {
        self.compose(question, &self.select(question))
    }

    fn compose(&self, question: &str, grounding: &[Paragraph]) -> Vec<ChatMessage> {
        let system = build_system_prompt(self.config.system_prompt.as_deref(), grounding);
        build_messages(
            &system,
            self.history.trailing(self.config.history_window),
            question,
        )
    }

    /// Answer `question` from the document.
    ///
    /// On success the question and answer are appended to the history. On
    /// failure the history is unchanged.
    pub async fn ask(&mut self, question: &str) -> Result<ChatAnswer, PdfChatError> {
        let start = Instant::now();
        let noop = NoopProgressCallback;
        let progress: &dyn ChatProgressCallback = match self.config.progress_callback {
            Some(ref cb) => cb.as_ref(),
            None => &noop,
        };

        let grounding = self.select(question);
        let selected_pages = pages_of(&grounding);
        debug!(
            "Grounding {} paragraphs from pages {:?}",
            grounding.len(),
            selected_pages
        );
        progress.on_grounding(grounding.len(), &selected_pages);

        let messages = self.compose(question, &grounding);
        let options = build_options(&self.config);

        let mut last_err: Option<String> = None;

        for attempt in 0..=self.config.max_retries {
            if attempt > 0 {
                let backoff = self.config.retry_backoff_ms * 2u64.pow(attempt - 1);
                warn!(
                    "Retry {}/{} after {}ms",
                    attempt, self.config.max_retries, backoff
                );
                progress.on_retry(attempt, self.config.max_retries, backoff);
                sleep(Duration::from_millis(backoff)).await;
            }

            progress.on_request(attempt, messages.len());
            match self.provider.chat(&messages, Some(&options)).await {
                Ok(response) => {
                    let duration = start.elapsed();
                    let citations = extract_citations(&response.content);
                    info!(
                        "Answered in {:?}: {} citations, {} input tokens, {} output tokens",
                        duration,
                        citations.len(),
                        response.prompt_tokens,
                        response.completion_tokens
                    );

                    progress.on_answer(citations.len(), duration.as_millis() as u64);
                    self.history.push(Turn::user(question));
                    self.history.push(Turn::assistant(&response.content));

                    return Ok(ChatAnswer {
                        content: response.content,
                        citations,
                        selected_pages,
                        input_tokens: response.prompt_tokens,
                        output_tokens: response.completion_tokens,
                        duration_ms: duration.as_millis() as u64,
                        retries: attempt,
                    });
                }
                Err(e) => {
                    let err_msg = format!("{}", e);
                    warn!("Attempt {} failed: {}", attempt + 1, err_msg);
                    last_err = Some(err_msg);
                }
            }
        }

        let message = last_err.unwrap_or_else(|| "Unknown error".to_string());
        progress.on_error(&message);
        Err(PdfChatError::LlmFailed {
            retries: self.config.max_retries,
            message,
        })
    }
}

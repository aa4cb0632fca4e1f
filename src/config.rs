//! Configuration for ranking and for chat sessions.
//!
//! [`RankerConfig`] tunes the pure retrieval core; [`ChatConfig`] wraps it
//! together with everything the model call needs. The model is always
//! configured explicitly (a pre-built provider or a provider name and model
//! passed in here). The library never looks up API keys or provider choices
//! in the process environment; that is left to the caller (the CLI does it).

use crate::error::PdfChatError;
use crate::normalize::DEFAULT_MIN_TOKEN_LEN;
use crate::progress::ProgressCallback;
use edgequake_llm::LLMProvider;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

// ── Ranker ───────────────────────────────────────────────────────────────

/// How query tokens are matched against paragraph text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchStrategy {
    /// Count query tokens that occur as substrings of the paragraph. (default)
    #[default]
    Exact,
    /// Sum, per query token, the best fuzzy similarity against any paragraph
    /// token. Tolerates typos and inflections ("colour" / "color").
    Fuzzy,
}

/// Tuning knobs for [`crate::ranker::Ranker`].
///
/// # Example
/// ```rust
/// use pdfchat::{MatchStrategy, RankerConfig};
///
/// let config = RankerConfig::builder()
///     .max_paragraphs(8)
///     .strategy(MatchStrategy::Fuzzy)
///     .build()
///     .unwrap();
/// assert_eq!(config.top_matches, 3);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankerConfig {
    /// Hard cap on paragraphs forwarded to the model. Default: 5.
    pub max_paragraphs: usize,

    /// Number of best matches whose neighbours are pulled in. Default: 3.
    pub top_matches: usize,

    /// Neighbours included on each side of a top match. Default: 1. Zero
    /// disables context expansion.
    pub context_window: usize,

    /// Paragraphs returned from the start of the document when nothing
    /// matches. Default: 3 (still capped by `max_paragraphs`).
    pub fallback_count: usize,

    /// Minimum token length in chars; shorter tokens are ignored. Default: 3.
    pub min_token_len: usize,

    /// Token matching strategy. Default: [`MatchStrategy::Exact`].
    pub strategy: MatchStrategy,
}

impl Default for RankerConfig {
    fn default() -> Self {
        Self {
            max_paragraphs: 5,
            top_matches: 3,
            context_window: 1,
            fallback_count: 3,
            min_token_len: DEFAULT_MIN_TOKEN_LEN,
            strategy: MatchStrategy::default(),
        }
    }
}

impl RankerConfig {
    pub fn builder() -> RankerConfigBuilder {
        RankerConfigBuilder {
            config: Self::default(),
        }
    }
}

/// Builder for [`RankerConfig`].
#[derive(Debug)]
pub struct RankerConfigBuilder {
    config: RankerConfig,
}

impl RankerConfigBuilder {
    pub fn max_paragraphs(mut self, n: usize) -> Self {
        self.config.max_paragraphs = n;
        self
    }

    pub fn top_matches(mut self, n: usize) -> Self {
        self.config.top_matches = n.max(1);
        self
    }

    pub fn context_window(mut self, n: usize) -> Self {
        self.config.context_window = n;
        self
    }

    pub fn fallback_count(mut self, n: usize) -> Self {
        self.config.fallback_count = n.max(1);
        self
    }

    pub fn min_token_len(mut self, n: usize) -> Self {
        self.config.min_token_len = n.max(1);
        self
    }

    pub fn strategy(mut self, strategy: MatchStrategy) -> Self {
        self.config.strategy = strategy;
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<RankerConfig, PdfChatError> {
        if self.config.max_paragraphs == 0 {
            return Err(PdfChatError::InvalidConfig(
                "max_paragraphs must be ≥ 1".into(),
            ));
        }
        Ok(self.config)
    }
}

// ── Chat ─────────────────────────────────────────────────────────────────

/// Configuration for a [`crate::chat::ChatSession`].
///
/// Built via [`ChatConfig::builder()`] or [`ChatConfig::default()`].
///
/// # Example
/// ```rust
/// use pdfchat::ChatConfig;
///
/// let config = ChatConfig::builder()
///     .provider_name("openai")
///     .model("gpt-4.1-mini")
///     .history_window(2)
///     .build()
///     .unwrap();
/// assert_eq!(config.max_tokens, 1000);
/// ```
#[derive(Clone)]
pub struct ChatConfig {
    /// Pre-constructed LLM provider. Takes precedence over `provider_name`.
    pub provider: Option<Arc<dyn LLMProvider>>,

    /// LLM provider name (e.g. "openai", "anthropic", "ollama").
    pub provider_name: Option<String>,

    /// LLM model identifier. If None, uses the provider's default.
    pub model: Option<String>,

    /// Sampling temperature. Default: 0.2.
    ///
    /// Answers must stay close to the grounding text; low temperature keeps
    /// the model quoting rather than paraphrasing.
    pub temperature: f32,

    /// Maximum tokens the model may generate per answer. Default: 1000.
    pub max_tokens: usize,

    /// Number of trailing history messages replayed to the model. Default: 3.
    ///
    /// Counts single messages, not question/answer pairs. The window never
    /// opens on an answer, so an odd value sends one message fewer once the
    /// history holds complete turns (3 sends the last question and answer).
    /// The full history grows for the whole session; only this window is
    /// ever sent.
    pub history_window: usize,

    /// Maximum retry attempts on a failed model call. Default: 2.
    pub max_retries: u32,

    /// Initial retry delay in milliseconds, doubled per attempt. Default: 500.
    pub retry_backoff_ms: u64,

    /// Custom system prompt. Must contain `{grounding}`. If None, uses
    /// [`crate::prompts::DEFAULT_SYSTEM_PROMPT`].
    pub system_prompt: Option<String>,

    /// Passage selection settings.
    pub ranker: RankerConfig,

    /// Optional callback for turn events (grounding, retries, answer).
    pub progress_callback: Option<ProgressCallback>,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            provider: None,
            provider_name: None,
            model: None,
            temperature: 0.2,
            max_tokens: 1000,
            history_window: 3,
            max_retries: 2,
            retry_backoff_ms: 500,
            system_prompt: None,
            ranker: RankerConfig::default(),
            progress_callback: None,
        }
    }
}

impl fmt::Debug for ChatConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChatConfig")
            .field("provider", &self.provider.as_ref().map(|_| "<dyn LLMProvider>"))
            .field("provider_name", &self.provider_name)
            .field("model", &self.model)
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .field("history_window", &self.history_window)
            .field("max_retries", &self.max_retries)
            .field("retry_backoff_ms", &self.retry_backoff_ms)
            .field("system_prompt", &self.system_prompt.as_ref().map(|p| p.len()))
            .field("ranker", &self.ranker)
            .field(
                "progress_callback",
                &self.progress_callback.as_ref().map(|_| "<dyn ChatProgressCallback>"),
            )
            .finish()
    }
}

impl ChatConfig {
    pub fn builder() -> ChatConfigBuilder {
        ChatConfigBuilder {
            config: Self::default(),
        }
    }
}

/// Builder for [`ChatConfig`].
#[derive(Debug)]
pub struct ChatConfigBuilder {
    config: ChatConfig,
}

impl ChatConfigBuilder {
    pub fn provider(mut self, provider: Arc<dyn LLMProvider>) -> Self {
        self.config.provider = Some(provider);
        self
    }

    pub fn provider_name(mut self, name: impl Into<String>) -> Self {
        self.config.provider_name = Some(name.into());
        self
    }

    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.config.model = Some(model.into());
        self
    }

    pub fn temperature(mut self, t: f32) -> Self {
        self.config.temperature = t.clamp(0.0, 2.0);
        self
    }

    pub fn max_tokens(mut self, n: usize) -> Self {
        self.config.max_tokens = n;
        self
    }

    pub fn history_window(mut self, n: usize) -> Self {
        self.config.history_window = n;
        self
    }

    pub fn max_retries(mut self, n: u32) -> Self {
        self.config.max_retries = n;
        self
    }

    pub fn retry_backoff_ms(mut self, ms: u64) -> Self {
        self.config.retry_backoff_ms = ms;
        self
    }

    pub fn system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.config.system_prompt = Some(prompt.into());
        self
    }

    pub fn ranker(mut self, ranker: RankerConfig) -> Self {
        self.config.ranker = ranker;
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<ChatConfig, PdfChatError> {
        let c = &self.config;
        if c.max_tokens == 0 {
            return Err(PdfChatError::InvalidConfig(
                "max_tokens must be ≥ 1".into(),
            ));
        }
        if c.ranker.max_paragraphs == 0 {
            return Err(PdfChatError::InvalidConfig(
                "ranker.max_paragraphs must be ≥ 1".into(),
            ));
        }
        if let Some(ref prompt) = c.system_prompt {
            if !prompt.contains(crate::prompts::GROUNDING_PLACEHOLDER) {
                return Err(PdfChatError::InvalidConfig(format!(
                    "system prompt must contain the {} placeholder",
                    crate::prompts::GROUNDING_PLACEHOLDER
                )));
            }
        }
        Ok(self.config)
    }
}

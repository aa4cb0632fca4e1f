//! Callback trait for chat-turn events.
//!
//! Inject an [`Arc<dyn ChatProgressCallback>`] via
//! [`crate::config::ChatConfigBuilder::progress_callback`] to follow a turn
//! as it happens: which pages were picked as grounding, when the request
//! goes out, each retry, and the outcome. The `pdfchat` binary drives its
//! spinner from these events.
//!
//! # Example
//!
//! ```rust
//! use pdfchat::{ChatConfig, ChatProgressCallback};
//! use std::sync::{Arc, atomic::{AtomicU32, Ordering}};
//!
//! struct RetryCounter(AtomicU32);
//!
//! impl ChatProgressCallback for RetryCounter {
//!     fn on_retry(&self, _attempt: u32, _max_retries: u32, _backoff_ms: u64) {
//!         self.0.fetch_add(1, Ordering::SeqCst);
//!     }
//! }
//!
//! let config = ChatConfig::builder()
//!     .provider_name("openai")
//!     .progress_callback(Arc::new(RetryCounter(AtomicU32::new(0))))
//!     .build()
//!     .unwrap();
//! ```

use std::sync::Arc;

/// Called by [`crate::chat::ChatSession::ask`] during a turn.
///
/// All methods default to no-ops so implementations only override what
/// they care about.
pub trait ChatProgressCallback: Send + Sync {
    /// Grounding has been selected.
    ///
    /// # Arguments
    /// * `paragraphs`: number of paragraphs selected
    /// * `pages`:      their distinct pages, ascending
    fn on_grounding(&self, paragraphs: usize, pages: &[u32]) {
        let _ = (paragraphs, pages);
    }

    /// The request is about to be sent (once per attempt).
    ///
    /// # Arguments
    /// * `attempt`:  0 for the first try
    /// * `messages`: number of messages in the request
    fn on_request(&self, attempt: u32, messages: usize) {
        let _ = (attempt, messages);
    }

    /// An attempt failed and the next one starts after `backoff_ms`.
    fn on_retry(&self, attempt: u32, max_retries: u32, backoff_ms: u64) {
        let _ = (attempt, max_retries, backoff_ms);
    }

    /// The model answered.
    ///
    /// # Arguments
    /// * `citations`:   citations parsed from the answer
    /// * `duration_ms`: wall-clock time including retries
    fn on_answer(&self, citations: usize, duration_ms: u64) {
        let _ = (citations, duration_ms);
    }

    /// Every attempt failed.
    fn on_error(&self, error: &str) {
        let _ = error;
    }
}

/// A no-op implementation, used when no callback is configured.
pub struct NoopProgressCallback;

impl ChatProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in [`crate::config::ChatConfig`].
pub type ProgressCallback = Arc<dyn ChatProgressCallback>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
    use std::sync::Mutex;

    #[derive(Default)]
    struct TrackingCallback {
        pages: Mutex<Vec<u32>>,
        requests: AtomicUsize,
        retries: AtomicUsize,
        last_backoff: AtomicU64,
        errors: AtomicUsize,
    }

    impl ChatProgressCallback for TrackingCallback {
        fn on_grounding(&self, _paragraphs: usize, pages: &[u32]) {
            if let Ok(mut p) = self.pages.lock() {
                *p = pages.to_vec();
            }
        }

        fn on_request(&self, _attempt: u32, _messages: usize) {
            self.requests.fetch_add(1, Ordering::SeqCst);
        }

        fn on_retry(&self, _attempt: u32, _max_retries: u32, backoff_ms: u64) {
            self.retries.fetch_add(1, Ordering::SeqCst);
            self.last_backoff.store(backoff_ms, Ordering::SeqCst);
        }

        fn on_error(&self, _error: &str) {
            self.errors.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn noop_callback_does_not_panic() {
        let cb = NoopProgressCallback;
        cb.on_grounding(3, &[1, 2]);
        cb.on_request(0, 4);
        cb.on_retry(1, 2, 500);
        cb.on_answer(2, 1200);
        cb.on_error("timeout");
    }

    #[test]
    fn tracking_callback_receives_events() {
        let tracker = TrackingCallback::default();

        tracker.on_grounding(4, &[2, 5]);
        tracker.on_request(0, 3);
        tracker.on_retry(1, 2, 500);
        tracker.on_request(1, 3);
        tracker.on_retry(2, 2, 1000);
        tracker.on_request(2, 3);
        tracker.on_error("503");

        assert_eq!(*tracker.pages.lock().unwrap(), vec![2, 5]);
        assert_eq!(tracker.requests.load(Ordering::SeqCst), 3);
        assert_eq!(tracker.retries.load(Ordering::SeqCst), 2);
        assert_eq!(tracker.last_backoff.load(Ordering::SeqCst), 1000);
        assert_eq!(tracker.errors.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn arc_dyn_callback_works() {
        let cb: ProgressCallback = Arc::new(NoopProgressCallback);
        cb.on_answer(0, 10);
    }
}

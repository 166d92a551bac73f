//! Async wrapper around a blocking transcription backend.
//!
//! Runs the model call on tokio's blocking thread pool, rebases the
//! returned window-relative timestamps onto the session timeline, retries
//! `ModelUnavailable` with bounded exponential backoff, and honors
//! cooperative cancellation at session teardown.

use crate::asr::Transcriber;
use crate::audio::AudioWindow;
use crate::defaults;
use crate::error::{Result, SottoError};
use crate::transcript::Token;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tracing::warn;

/// Cooperative cancellation flag shared between a session and its in-flight
/// adapter calls.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    cancelled: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation of current and future adapter calls.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

/// Async adapter for a [`Transcriber`] backend.
pub struct InferenceAdapter<T: Transcriber> {
    backend: Arc<T>,
    max_retries: u32,
    cancel: CancelToken,
}

impl<T: Transcriber + 'static> InferenceAdapter<T> {
    pub fn new(backend: T, max_retries: u32, cancel: CancelToken) -> Self {
        Self {
            backend: Arc::new(backend),
            max_retries,
            cancel,
        }
    }

    /// Creates an adapter sharing an existing backend handle.
    pub fn from_arc(backend: Arc<T>, max_retries: u32, cancel: CancelToken) -> Self {
        Self {
            backend,
            max_retries,
            cancel,
        }
    }

    /// Transcribe one window, returning tokens with absolute session
    /// timestamps.
    ///
    /// `ModelUnavailable` is retried up to `max_retries` times with
    /// exponential backoff; any other error returns immediately. The
    /// blocking call itself cannot be interrupted, so if the token is
    /// cancelled while a call is in flight the result is discarded and
    /// `Cancelled` returned.
    pub async fn transcribe_window(&self, window: &AudioWindow) -> Result<Vec<Token>> {
        let mut attempt: u32 = 0;
        loop {
            if self.cancel.is_cancelled() {
                return Err(SottoError::Cancelled);
            }

            let backend = self.backend.clone();
            let input = window.clone();
            let outcome = tokio::task::spawn_blocking(move || backend.transcribe(&input))
                .await
                .map_err(|e| SottoError::ModelUnavailable {
                    backend: self.backend.model_name().to_string(),
                    message: format!("inference task panicked: {e}"),
                })?;

            if self.cancel.is_cancelled() {
                return Err(SottoError::Cancelled);
            }

            match outcome {
                Ok(tokens) => return Ok(rebase(tokens, window.start)),
                Err(err @ SottoError::ModelUnavailable { .. }) if attempt < self.max_retries => {
                    let delay = backoff_delay(attempt);
                    warn!(
                        attempt = attempt + 1,
                        max_retries = self.max_retries,
                        delay_ms = delay.as_millis() as u64,
                        error = %err,
                        "inference failed, backing off before retry"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(err) => return Err(err),
            }
        }
    }
}

/// Shift window-relative token times onto the session timeline.
fn rebase(mut tokens: Vec<Token>, offset: f64) -> Vec<Token> {
    for token in &mut tokens {
        token.start += offset;
        token.end += offset;
    }
    tokens
}

/// Delay before retry `attempt` (zero-based): base doubled per attempt,
/// capped.
fn backoff_delay(attempt: u32) -> Duration {
    let ms = defaults::RETRY_BACKOFF_BASE_MS << attempt.min(6);
    Duration::from_millis(ms.min(defaults::RETRY_BACKOFF_MAX_MS))
}

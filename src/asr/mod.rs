//! Speech-to-text backend seam.
//!
//! The engine talks to recognition models through the [`Transcriber`]
//! trait: an audio window in, timed tokens out. Implementations are
//! synchronous and potentially slow; [`InferenceAdapter`] wraps them for
//! use from async session code, adding retry, cancellation, and
//! timestamp rebasing.

pub mod adapter;
pub mod backend;

pub use adapter::{CancelToken, InferenceAdapter};
pub use backend::ScriptedTranscriber;

use crate::audio::AudioWindow;
use crate::error::Result;
use crate::transcript::Token;
use std::sync::Arc;
use std::time::Instant;
use tracing::debug;

/// Trait for timed speech-to-text transcription.
///
/// Implementations see only the window's samples: returned timestamps are
/// relative to the window start, and are rebased onto the session timeline
/// by [`InferenceAdapter`]. Calls must be stateless, so overlapping windows
/// can be re-inferred every cycle, and deterministic for a given window.
pub trait Transcriber: Send + Sync {
    /// Transcribe one audio window into ordered, timed tokens.
    fn transcribe(&self, window: &AudioWindow) -> Result<Vec<Token>>;

    /// Name of the loaded model.
    fn model_name(&self) -> &str;

    /// Whether the backend is loaded and reachable.
    fn is_ready(&self) -> bool;
}

/// Implement Transcriber for Arc<T> so one backend handle can be shared
/// across sessions.
impl<T: Transcriber + ?Sized> Transcriber for Arc<T> {
    fn transcribe(&self, window: &AudioWindow) -> Result<Vec<Token>> {
        (**self).transcribe(window)
    }

    fn model_name(&self) -> &str {
        (**self).model_name()
    }

    fn is_ready(&self) -> bool {
        (**self).is_ready()
    }
}

/// Run a short silent window through the backend once.
///
/// The first inference on a freshly loaded model is typically far slower
/// than steady state; paying that cost up front keeps it out of the first
/// real cycle's latency.
pub fn warm_up(backend: &dyn Transcriber, sample_rate: u32, secs: f64) -> Result<()> {
    let window = AudioWindow {
        start: 0.0,
        sample_rate,
        samples: vec![0i16; (secs * sample_rate as f64) as usize],
    };
    let started = Instant::now();
    backend.transcribe(&window)?;
    debug!(
        model = backend.model_name(),
        elapsed_ms = started.elapsed().as_millis() as u64,
        "backend warm-up complete"
    );
    Ok(())
}

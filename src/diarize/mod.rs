//! Speaker diarization backend seam.
//!
//! Mirrors the transcription seam: a sync [`Diarizer`] trait, a scripted
//! test double, and an async adapter. The one deliberate asymmetry is
//! failure handling — diarization is advisory, so a failed or panicked
//! call costs the cycle its new speaker segments and nothing else.
//! Transcript emission never waits on a diarization retry.

use crate::asr::CancelToken;
use crate::audio::AudioWindow;
use crate::error::{Result, SottoError};
use crate::transcript::SpeakerSegment;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tracing::warn;

/// Trait for speaker diarization over an audio window.
///
/// Like the transcription seam, implementations see only the window's
/// samples: returned segment times are window-relative and rebased by
/// [`DiarizationAdapter`]. Calls must be stateless and deterministic for
/// a given window; segments come back ordered by start time.
pub trait Diarizer: Send + Sync {
    /// Identify speaker turns within one audio window.
    fn diarize(&self, window: &AudioWindow) -> Result<Vec<SpeakerSegment>>;

    /// Name of the loaded model.
    fn model_name(&self) -> &str;

    /// Whether the backend is loaded and reachable.
    fn is_ready(&self) -> bool;
}

impl<D: Diarizer + ?Sized> Diarizer for Arc<D> {
    fn diarize(&self, window: &AudioWindow) -> Result<Vec<SpeakerSegment>> {
        (**self).diarize(window)
    }

    fn model_name(&self) -> &str {
        (**self).model_name()
    }

    fn is_ready(&self) -> bool {
        (**self).is_ready()
    }
}

/// A [`Diarizer`] that reads speaker turns off a fixed script placed on
/// the session timeline.
///
/// `diarize` returns every scripted segment intersecting the window,
/// clipped to the window and shifted to window-relative times. Clones
/// share the call counter, like the scripted transcriber.
#[derive(Debug, Clone)]
pub struct ScriptedDiarizer {
    model_name: String,
    script: Vec<SpeakerSegment>,
    always_fail: bool,
    calls: Arc<AtomicUsize>,
}

impl ScriptedDiarizer {
    pub fn new(model_name: &str) -> Self {
        Self {
            model_name: model_name.to_string(),
            script: Vec::new(),
            always_fail: false,
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Add one ground-truth speaker turn at absolute session time.
    pub fn marks(mut self, speaker: u32, start: f64, end: f64) -> Self {
        self.script.push(SpeakerSegment::new(speaker, start, end));
        self
    }

    /// Fail every call with `ModelUnavailable`.
    pub fn with_failure(mut self) -> Self {
        self.always_fail = true;
        self
    }

    /// Number of `diarize` calls so far, shared across clones.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl Diarizer for ScriptedDiarizer {
    fn diarize(&self, window: &AudioWindow) -> Result<Vec<SpeakerSegment>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.always_fail {
            return Err(SottoError::ModelUnavailable {
                backend: self.model_name.clone(),
                message: "scripted failure".to_string(),
            });
        }
        let end = window.end();
        let mut segments: Vec<SpeakerSegment> = self
            .script
            .iter()
            .filter(|s| s.start < end && s.end > window.start)
            .map(|s| {
                SpeakerSegment::new(
                    s.speaker,
                    s.start.max(window.start) - window.start,
                    s.end.min(end) - window.start,
                )
            })
            .collect();
        segments.sort_by(|a, b| a.start.partial_cmp(&b.start).unwrap_or(std::cmp::Ordering::Equal));
        Ok(segments)
    }

    fn model_name(&self) -> &str {
        &self.model_name
    }

    fn is_ready(&self) -> bool {
        !self.always_fail
    }
}

/// Async adapter for a [`Diarizer`] backend.
///
/// Runs the blocking call off the async runtime and rebases timestamps,
/// like the inference adapter, but converts every failure into an empty
/// segment list instead of an error.
pub struct DiarizationAdapter<D: Diarizer> {
    backend: Arc<D>,
    cancel: CancelToken,
}

impl<D: Diarizer + 'static> DiarizationAdapter<D> {
    pub fn new(backend: D, cancel: CancelToken) -> Self {
        Self {
            backend: Arc::new(backend),
            cancel,
        }
    }

    /// Creates an adapter sharing an existing backend handle.
    pub fn from_arc(backend: Arc<D>, cancel: CancelToken) -> Self {
        Self { backend, cancel }
    }

    /// Diarize one window, returning segments with absolute session
    /// timestamps. On failure the segments are simply absent.
    pub async fn diarize_window(&self, window: &AudioWindow) -> Vec<SpeakerSegment> {
        if self.cancel.is_cancelled() {
            return Vec::new();
        }

        let backend = self.backend.clone();
        let input = window.clone();
        let outcome = tokio::task::spawn_blocking(move || backend.diarize(&input)).await;

        if self.cancel.is_cancelled() {
            return Vec::new();
        }

        match outcome {
            Ok(Ok(segments)) => rebase(segments, window.start),
            Ok(Err(err)) => {
                warn!(error = %err, "diarization failed, cycle proceeds without new segments");
                Vec::new()
            }
            Err(err) => {
                warn!(error = %err, "diarization task panicked, cycle proceeds without new segments");
                Vec::new()
            }
        }
    }
}

/// Shift window-relative segment times onto the session timeline.
fn rebase(mut segments: Vec<SpeakerSegment>, offset: f64) -> Vec<SpeakerSegment> {
    for segment in &mut segments {
        segment.start += offset;
        segment.end += offset;
    }
    segments
}

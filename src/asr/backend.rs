//! Deterministic scripted backend for tests and offline demos.

use crate::asr::Transcriber;
use crate::audio::AudioWindow;
use crate::error::{Result, SottoError};
use crate::transcript::Token;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

/// A [`Transcriber`] that "hears" from a fixed script of ground-truth
/// tokens placed on the session timeline.
///
/// `transcribe` returns every scripted token whose span lies fully inside
/// the requested window, with timestamps shifted to be window-relative —
/// what a perfectly consistent model would produce. Identical windows
/// always yield identical hypotheses, which the stitcher tests rely on.
///
/// Clones share the call counter and failure budget, so a clone kept by
/// the test can observe calls made through the adapter's copy.
#[derive(Debug, Clone)]
pub struct ScriptedTranscriber {
    model_name: String,
    script: Vec<Token>,
    fail_first: usize,
    always_fail: bool,
    calls: Arc<AtomicUsize>,
}

impl ScriptedTranscriber {
    pub fn new(model_name: &str) -> Self {
        Self {
            model_name: model_name.to_string(),
            script: Vec::new(),
            fail_first: 0,
            always_fail: false,
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Add one ground-truth token at absolute session time.
    pub fn hears(mut self, text: &str, start: f64, end: f64) -> Self {
        self.script.push(Token::new(text, start, end, 1.0));
        self
    }

    /// Replace the whole script at once.
    pub fn with_script(mut self, script: Vec<Token>) -> Self {
        self.script = script;
        self
    }

    /// Fail every call with `ModelUnavailable`.
    pub fn with_failure(mut self) -> Self {
        self.always_fail = true;
        self
    }

    /// Fail the first `n` calls, then behave normally. Exercises the
    /// adapter's retry path.
    pub fn with_transient_failures(mut self, n: usize) -> Self {
        self.fail_first = n;
        self
    }

    /// Number of `transcribe` calls so far, shared across clones.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl Transcriber for ScriptedTranscriber {
    fn transcribe(&self, window: &AudioWindow) -> Result<Vec<Token>> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        if self.always_fail || call < self.fail_first {
            return Err(SottoError::ModelUnavailable {
                backend: self.model_name.clone(),
                message: "scripted failure".to_string(),
            });
        }
        let end = window.end();
        Ok(self
            .script
            .iter()
            .filter(|t| t.start >= window.start && t.end <= end)
            .map(|t| {
                let mut heard = t.clone();
                heard.start -= window.start;
                heard.end -= window.start;
                heard
            })
            .collect())
    }

    fn model_name(&self) -> &str {
        &self.model_name
    }

    fn is_ready(&self) -> bool {
        !self.always_fail
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_window(start: f64, secs: f64) -> AudioWindow {
        AudioWindow {
            start,
            sample_rate: 16000,
            samples: vec![0i16; (secs * 16000.0) as usize],
        }
    }

    #[test]
    fn returns_tokens_fully_inside_the_window() {
        let backend = ScriptedTranscriber::new("scripted")
            .hears("a", 0.2, 0.5)
            .hears("b", 0.6, 1.0)
            .hears("c", 1.2, 1.8);

        let tokens = backend.transcribe(&make_window(0.0, 1.0)).unwrap();
        let texts: Vec<&str> = tokens.iter().map(|t| t.text.as_str()).collect();
        assert_eq!(texts, ["a", "b"]);
    }

    #[test]
    fn token_straddling_window_end_is_not_heard() {
        let backend = ScriptedTranscriber::new("scripted").hears("cut", 0.8, 1.3);
        let tokens = backend.transcribe(&make_window(0.0, 1.0)).unwrap();
        assert!(tokens.is_empty());
    }

    #[test]
    fn timestamps_are_window_relative() {
        let backend = ScriptedTranscriber::new("scripted").hears("word", 1.25, 1.75);

        let tokens = backend.transcribe(&make_window(1.0, 1.0)).unwrap();
        assert_eq!(tokens.len(), 1);
        assert!((tokens[0].start - 0.25).abs() < 1e-9);
        assert!((tokens[0].end - 0.75).abs() < 1e-9);
    }

    #[test]
    fn identical_windows_yield_identical_hypotheses() {
        let backend = ScriptedTranscriber::new("scripted")
            .hears("one", 0.1, 0.4)
            .hears("two", 0.5, 0.9);

        let first = backend.transcribe(&make_window(0.0, 1.0)).unwrap();
        let second = backend.transcribe(&make_window(0.0, 1.0)).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn empty_script_hears_nothing() {
        let backend = ScriptedTranscriber::new("scripted");
        let tokens = backend.transcribe(&make_window(0.0, 2.0)).unwrap();
        assert!(tokens.is_empty());
    }

    #[test]
    fn with_failure_reports_model_unavailable() {
        let backend = ScriptedTranscriber::new("tiny-en").with_failure();
        assert!(!backend.is_ready());

        let err = backend.transcribe(&make_window(0.0, 1.0)).unwrap_err();
        match err {
            SottoError::ModelUnavailable { backend, .. } => assert_eq!(backend, "tiny-en"),
            other => panic!("expected ModelUnavailable, got {other:?}"),
        }
    }

    #[test]
    fn transient_failures_clear_after_n_calls() {
        let backend = ScriptedTranscriber::new("scripted")
            .hears("ok", 0.0, 0.5)
            .with_transient_failures(2);

        assert!(backend.transcribe(&make_window(0.0, 1.0)).is_err());
        assert!(backend.transcribe(&make_window(0.0, 1.0)).is_err());
        let tokens = backend.transcribe(&make_window(0.0, 1.0)).unwrap();
        assert_eq!(tokens.len(), 1);
        assert_eq!(backend.calls(), 3);
    }

    #[test]
    fn call_count_is_shared_across_clones() {
        let backend = ScriptedTranscriber::new("scripted");
        let clone = backend.clone();

        backend.transcribe(&make_window(0.0, 1.0)).unwrap();
        clone.transcribe(&make_window(0.0, 1.0)).unwrap();

        assert_eq!(backend.calls(), 2);
        assert_eq!(clone.calls(), 2);
    }
}

//! Default configuration constants for sotto.
//!
//! Shared constants used across configuration types and adapters, kept in one
//! place so the config defaults, CLI help text, and engine agree.

/// Default audio sample rate in Hz.
///
/// 16kHz is the standard for speech recognition and provides a good balance
/// between quality and computational efficiency for voice applications.
pub const SAMPLE_RATE: u32 = 16000;

/// Default inference cycle cadence in seconds.
///
/// The session controller attempts one inference cycle per cadence interval.
/// Shorter cycles lower latency but increase flicker and compute cost.
pub const CYCLE_CADENCE_SECS: f64 = 1.0;

/// Default minimum window duration in seconds.
///
/// A cycle is deferred until at least this much audio is available past the
/// window start. Matches the one-second minimum chunk most streaming
/// recognizers need to produce usable hypotheses.
pub const MIN_WINDOW_SECS: f64 = 1.0;

/// Default maximum window duration in seconds.
///
/// Windows are capped at this length; recognition quality plateaus well
/// before this and longer windows only add latency.
pub const MAX_WINDOW_SECS: f64 = 30.0;

/// Default context margin in seconds.
///
/// Each window starts this far before the committed boundary so the backend
/// re-hears recent committed audio, which stabilizes the tokens right at the
/// boundary.
pub const CONTEXT_MARGIN_SECS: f64 = 2.0;

/// Default committal threshold in consecutive cycles.
///
/// A tentative token must survive this many consecutive cycles unchanged
/// (same text, start time within tolerance) before it is frozen as committed.
/// 2 is the classic local-agreement policy: commit what two successive
/// hypotheses agree on.
pub const COMMITTAL_THRESHOLD_CYCLES: u32 = 2;

/// Default token matching time tolerance in seconds.
///
/// Tokens from successive cycles are considered the same word only if their
/// start times differ by at most this much. 200ms absorbs normal timestamp
/// jitter between overlapping windows without matching across word
/// boundaries.
pub const MATCH_TIME_TOLERANCE_SECS: f64 = 0.2;

/// Whether speaker diarization runs by default.
pub const DIARIZATION_ENABLED: bool = false;

/// Default cap on buffered audio in seconds.
///
/// If a client outruns inference for this long, the oldest un-trimmed audio
/// is dropped (with a warning) rather than growing the buffer without bound.
pub const MAX_BUFFER_SECS: f64 = 120.0;

/// Maximum retry attempts when a model backend reports itself unavailable.
pub const MAX_MODEL_RETRIES: u32 = 3;

/// Base delay for exponential retry backoff, in milliseconds.
///
/// Attempt n waits `base * 2^n`, capped at [`RETRY_BACKOFF_MAX_MS`].
pub const RETRY_BACKOFF_BASE_MS: u64 = 250;

/// Upper bound on a single retry backoff delay, in milliseconds.
pub const RETRY_BACKOFF_MAX_MS: u64 = 2_000;

/// Duration of one inbound audio chunk in milliseconds.
///
/// The file-fed session slices WAV input into chunks of this size; network
/// transports are expected to do the same.
pub const CHUNK_MS: u32 = 100;

/// Duration of the silence window used to warm up a backend, in seconds.
pub const WARMUP_SECS: f64 = 1.0;

/// Convert a duration in seconds to a sample count at [`SAMPLE_RATE`].
pub const fn secs_to_samples(secs: f64) -> usize {
    (secs * SAMPLE_RATE as f64) as usize
}

/// Convert a sample count at [`SAMPLE_RATE`] to a duration in seconds.
pub const fn samples_to_secs(samples: usize) -> f64 {
    samples as f64 / SAMPLE_RATE as f64
}

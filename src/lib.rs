//! sotto - incremental streaming speech-to-text engine
//!
//! Turns an ordered stream of audio chunks into a transcript that grows
//! monotonically: text is tentative until it has survived enough
//! inference cycles, then committed and never revised again.

#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]
#![warn(clippy::let_underscore_must_use)]

pub mod asr;
pub mod audio;
pub mod cli;
pub mod config;
pub mod defaults;
pub mod diarize;
pub mod error;
pub mod protocol;
pub mod session;
pub mod transcript;

// Backend seams (audio in, text/speakers out)
pub use asr::{InferenceAdapter, ScriptedTranscriber, Transcriber};
pub use diarize::{DiarizationAdapter, Diarizer, ScriptedDiarizer};

// Session lifecycle
pub use session::{SessionController, SessionHandle};

// Transcript model
pub use transcript::{SpeakerSegment, Stitcher, Token, Transcript, TranscriptEvent};

// Wire types
pub use protocol::{ClientMessage, ServerMessage};

// Error handling
pub use error::{Result, SottoError};

// Config
pub use config::Config;

/// Build version string with optional git commit hash.
///
/// Returns `"0.1.0+abc1234"` when git hash is available, `"0.1.0"` otherwise.
pub fn version_string() -> String {
    let version = env!("CARGO_PKG_VERSION");
    match option_env!("GIT_HASH") {
        Some(hash) if !hash.is_empty() => format!("{}+{}", version, hash),
        _ => version.to_string(),
    }
}

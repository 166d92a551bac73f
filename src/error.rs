//! Error types for sotto.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum SottoError {
    // Configuration errors
    #[error("Configuration file not found at {path}")]
    ConfigFileNotFound { path: String },

    #[error("Invalid configuration value for {key}: {message}")]
    ConfigInvalidValue { key: String, message: String },

    #[error("Configuration error: {0}")]
    Config(#[from] toml::de::Error),

    // Ingest errors
    #[error("Out-of-order audio chunk: expected sequence {expected}, got {got}")]
    OutOfOrderChunk { expected: u64, got: u64 },

    #[error("Insufficient audio: {buffered_secs:.2}s buffered, {needed_secs:.2}s needed")]
    InsufficientAudio { buffered_secs: f64, needed_secs: f64 },

    #[error("Audio decode failed: {message}")]
    AudioDecode { message: String },

    // Backend errors
    #[error("Model backend '{backend}' unavailable: {message}")]
    ModelUnavailable { backend: String, message: String },

    #[error("Inference cancelled")]
    Cancelled,

    // Session errors
    #[error("Session closed")]
    SessionClosed,

    // Wire protocol errors
    #[error("Protocol error: {0}")]
    Protocol(#[from] serde_json::Error),

    // General I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

// Type alias for convenience
pub type Result<T> = std::result::Result<T, SottoError>;

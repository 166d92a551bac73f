//! Audio ingest: the per-session buffer and the WAV chunk feed.

pub mod buffer;
pub mod wav;

pub use buffer::{AudioChunk, AudioWindow, IngestBuffer};
pub use wav::WavStream;

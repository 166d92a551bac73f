//! Incremental transcript assembly.
//!
//! Each inference cycle produces a fresh hypothesis for the tail of the
//! audio. The stitcher aligns consecutive hypotheses and splits the
//! transcript into two regions:
//!
//! ```text
//!              committed                    tentative
//! ┌────────────────────────────────┬─────────────────────────┐
//! │ stable across enough cycles,   │ latest hypothesis tail, │
//! │ never revised again            │ replaced every cycle    │
//! └────────────────────────────────┴─────────────────────────┘
//!                                  ▲
//!                          committed boundary
//! ```
//!
//! Speaker labels arrive on their own cadence and are merged onto
//! tokens by time overlap without ever moving the boundary.

pub mod speakers;
pub mod stitcher;
pub mod types;

pub use speakers::SpeakerTimeline;
pub use stitcher::Stitcher;
pub use types::{
    SpeakerLine, SpeakerSegment, Token, Transcript, TranscriptEvent, joined_text, speaker_lines,
};

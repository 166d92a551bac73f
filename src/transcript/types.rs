//! Transcript data model: tokens, the committed/tentative split, and the
//! speaker-grouped rendering used on the wire and in terminal output.

use serde::{Deserialize, Serialize};

/// One recognized text fragment with its span on the session timeline.
///
/// `text` is a bare word or word piece without surrounding whitespace; views
/// that render token runs insert single spaces between them. Times are
/// seconds from session start, `[start, end)`. Tokens are ordered by start
/// time and never reordered after creation, only reclassified between
/// tentative and committed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Token {
    pub text: String,
    pub start: f64,
    pub end: f64,
    pub confidence: f32,
    /// Speaker label, `None` until diarization assigns one (or forever, when
    /// diarization is disabled).
    pub speaker: Option<u32>,
}

impl Token {
    pub fn new(text: impl Into<String>, start: f64, end: f64, confidence: f32) -> Self {
        Self {
            text: text.into(),
            start,
            end,
            confidence,
            speaker: None,
        }
    }

    pub fn duration(&self) -> f64 {
        self.end - self.start
    }

    /// Overlap in seconds between this token and the span `[start, end)`.
    pub fn overlap(&self, start: f64, end: f64) -> f64 {
        (self.end.min(end) - self.start.max(start)).max(0.0)
    }
}

/// A diarization result: one speaker active over `[start, end)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpeakerSegment {
    pub speaker: u32,
    pub start: f64,
    pub end: f64,
}

impl SpeakerSegment {
    pub fn new(speaker: u32, start: f64, end: f64) -> Self {
        Self {
            speaker,
            start,
            end,
        }
    }
}

/// The transcript of one session: a committed prefix that never changes
/// again, and a tentative suffix that may be rewritten by the next inference
/// cycle. The tentative suffix always starts at the committed boundary.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Transcript {
    committed: Vec<Token>,
    tentative: Vec<Token>,
}

impl Transcript {
    /// Tokens frozen as final.
    pub fn committed(&self) -> &[Token] {
        &self.committed
    }

    /// Tokens still subject to revision.
    pub fn tentative(&self) -> &[Token] {
        &self.tentative
    }

    /// End time of the committed prefix, in seconds. 0.0 before anything
    /// commits. Monotonically non-decreasing over the session.
    pub fn committed_boundary(&self) -> f64 {
        self.committed.last().map_or(0.0, |t| t.end)
    }

    /// End time of the full transcript (committed + tentative).
    pub fn end_time(&self) -> f64 {
        self.tentative
            .last()
            .map_or_else(|| self.committed_boundary(), |t| t.end)
    }

    pub fn is_empty(&self) -> bool {
        self.committed.is_empty() && self.tentative.is_empty()
    }

    pub(crate) fn promote(&mut self, token: Token) {
        self.committed.push(token);
    }

    pub(crate) fn replace_tentative(&mut self, tokens: Vec<Token>) {
        self.tentative = tokens;
    }

    /// Move the first `count` tentative tokens into the committed prefix.
    pub(crate) fn promote_prefix(&mut self, count: usize) {
        let tail = self.tentative.split_off(count);
        self.committed.append(&mut self.tentative);
        self.tentative = tail;
    }

    pub(crate) fn committed_mut(&mut self) -> &mut [Token] {
        &mut self.committed
    }

    pub(crate) fn tentative_mut(&mut self) -> &mut [Token] {
        &mut self.tentative
    }

    /// Move every remaining tentative token into the committed prefix.
    /// Used at session end for best-effort final output. Returns how many
    /// tokens moved.
    pub(crate) fn flush_tentative(&mut self) -> usize {
        let count = self.tentative.len();
        self.committed.append(&mut self.tentative);
        count
    }
}

/// One cycle's outward-facing result.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TranscriptEvent {
    /// Tokens newly frozen this cycle, in order.
    pub committed_delta: Vec<Token>,
    /// The complete current tentative suffix (replaces any previous one).
    pub tentative: Vec<Token>,
    /// True when any token's speaker label changed this cycle, including
    /// labels filled in on already-committed tokens.
    pub speakers_updated: bool,
}

impl TranscriptEvent {
    /// True when the event would tell a client nothing new.
    pub fn is_empty(&self) -> bool {
        self.committed_delta.is_empty() && self.tentative.is_empty() && !self.speakers_updated
    }
}

/// A run of consecutive committed tokens attributed to one speaker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpeakerLine {
    pub speaker: Option<u32>,
    pub text: String,
}

/// Group consecutive tokens by speaker label into renderable lines.
///
/// Adjacent tokens with the same label share a line; a label change starts a
/// new one. With diarization disabled this yields at most one line with
/// `speaker: None`.
pub fn speaker_lines(tokens: &[Token]) -> Vec<SpeakerLine> {
    let mut lines: Vec<SpeakerLine> = Vec::new();
    for token in tokens {
        match lines.last_mut() {
            Some(line) if line.speaker == token.speaker => {
                line.text.push(' ');
                line.text.push_str(&token.text);
            }
            _ => lines.push(SpeakerLine {
                speaker: token.speaker,
                text: token.text.clone(),
            }),
        }
    }
    lines
}

/// Join a token run into a plain string, space-separated.
pub fn joined_text(tokens: &[Token]) -> String {
    tokens
        .iter()
        .map(|t| t.text.as_str())
        .collect::<Vec<_>>()
        .join(" ")
}

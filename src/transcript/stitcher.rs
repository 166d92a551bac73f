//! Hypothesis stitcher: merges successive overlapping inference outputs into
//! one monotonically growing transcript.
//!
//! Each inference cycle re-transcribes a window reaching back before the
//! committed boundary, so successive hypotheses overlap. The stitcher:
//! - aligns the new hypothesis against the current tentative suffix
//!   (longest common subsequence over token text, with a start-time
//!   tolerance, so timestamps and confidence survive the merge),
//! - counts how many consecutive cycles each tentative token has survived,
//! - freezes the stable prefix as committed once it reaches the committal
//!   threshold, and
//! - replaces whatever failed to match wholesale (flicker is acceptable,
//!   corruption is not).
//!
//! Committed tokens are never altered again. Speaker labels are filled in
//! from the diarization timeline, possibly cycles later, and are likewise
//! frozen once set.

use crate::transcript::speakers::SpeakerTimeline;
use crate::transcript::types::{SpeakerSegment, Token, Transcript, TranscriptEvent};
use tracing::debug;

/// Longest run of committed tokens a hypothesis plausibly re-hears past the
/// boundary in one window.
const MAX_REHEARD_TOKENS: usize = 5;

pub struct Stitcher {
    transcript: Transcript,
    timeline: SpeakerTimeline,
    /// Consecutive-cycle survival count per tentative token, parallel to
    /// `transcript.tentative()`.
    stability: Vec<u32>,
    committal_threshold: u32,
    time_tolerance: f64,
}

impl Stitcher {
    pub fn new(committal_threshold: u32, time_tolerance: f64) -> Self {
        Self {
            transcript: Transcript::default(),
            timeline: SpeakerTimeline::new(),
            stability: Vec::new(),
            committal_threshold,
            time_tolerance,
        }
    }

    pub fn transcript(&self) -> &Transcript {
        &self.transcript
    }

    pub fn committed_boundary(&self) -> f64 {
        self.transcript.committed_boundary()
    }

    /// Merge one window's diarization segments into the cumulative timeline.
    /// Labels are applied to tokens on the next [`apply`](Self::apply) or
    /// [`flush`](Self::flush).
    pub fn merge_segments(&mut self, window_start: f64, segments: Vec<SpeakerSegment>) {
        self.timeline.extend(window_start, segments);
    }

    /// Apply one cycle's inference output and return the resulting event.
    ///
    /// An empty hypothesis (silence) leaves the transcript untouched:
    /// standing tentative text neither advances toward committal nor gets
    /// discarded.
    pub fn apply(&mut self, hypothesis: Vec<Token>) -> TranscriptEvent {
        if hypothesis.is_empty() {
            let speakers_updated = self.assign_labels();
            return TranscriptEvent {
                committed_delta: Vec::new(),
                tentative: self.transcript.tentative().to_vec(),
                speakers_updated,
            };
        }

        let candidates = self.boundary_candidates(hypothesis);
        let (tentative, stability) = self.align(candidates);
        self.transcript.replace_tentative(tentative);
        self.stability = stability;

        let promoted = self.promote_stable();
        let speakers_updated = self.assign_labels();

        let committed = self.transcript.committed();
        let committed_delta = committed[committed.len() - promoted..].to_vec();
        if promoted > 0 {
            debug!(
                promoted,
                boundary = self.transcript.committed_boundary(),
                "froze stable prefix"
            );
        }

        TranscriptEvent {
            committed_delta,
            tentative: self.transcript.tentative().to_vec(),
            speakers_updated,
        }
    }

    /// Commit everything still tentative, best-effort, for session end.
    pub fn flush(&mut self) -> TranscriptEvent {
        let flushed = self.transcript.flush_tentative();
        self.stability.clear();
        let speakers_updated = self.assign_labels();

        let committed = self.transcript.committed();
        let committed_delta = committed[committed.len() - flushed..].to_vec();
        debug!(flushed, "flushed tentative suffix at session end");

        TranscriptEvent {
            committed_delta,
            tentative: Vec::new(),
            speakers_updated,
        }
    }

    /// Reduce a window hypothesis to the tokens eligible for the tentative
    /// suffix.
    ///
    /// The window reaches back before the committed boundary, so the model
    /// re-emits words that are already frozen. Tokens mostly inside the
    /// committed region are dropped; a leading re-hearing of the committed
    /// tail (same texts, starts within tolerance, up to
    /// [`MAX_REHEARD_TOKENS`] long) is dropped even when its jittered spans
    /// leak past the boundary; a leading survivor that still straddles the
    /// boundary is clamped to start exactly at it.
    fn boundary_candidates(&self, hypothesis: Vec<Token>) -> Vec<Token> {
        let boundary = self.transcript.committed_boundary();
        let mut out: Vec<Token> = hypothesis
            .into_iter()
            .filter(|t| t.start >= boundary - self.time_tolerance && t.end > boundary)
            .collect();

        // Match the longest committed suffix first: with repeated words a
        // shorter match can succeed while the full run still duplicates.
        let committed = self.transcript.committed();
        let longest = out.len().min(committed.len()).min(MAX_REHEARD_TOKENS);
        let reheard = (1..=longest)
            .rev()
            .find(|&n| {
                committed[committed.len() - n..]
                    .iter()
                    .zip(&out[..n])
                    .all(|(frozen, heard)| self.matches(heard, frozen))
            })
            .unwrap_or(0);
        out.drain(..reheard);

        for token in out.iter_mut() {
            if token.start < boundary {
                token.start = boundary;
            } else {
                break;
            }
        }
        out
    }

    /// Align the candidate tokens against the current tentative suffix and
    /// compute the new suffix with carried-over stability counts.
    ///
    /// Longest common subsequence over a tolerance-bounded equality: two
    /// tokens match when their text is identical and their start times are
    /// within the tolerance. Matched candidates inherit the old token's
    /// stability count (plus one) and its speaker label; unmatched
    /// candidates start a fresh chain at one. A hypothesis with no matches
    /// at all degrades to wholesale replacement through the same path.
    fn align(&self, candidates: Vec<Token>) -> (Vec<Token>, Vec<u32>) {
        let old = self.transcript.tentative();
        let m = old.len();
        let n = candidates.len();

        let mut lcs = vec![vec![0u32; n + 1]; m + 1];
        for i in (0..m).rev() {
            for j in (0..n).rev() {
                lcs[i][j] = if self.matches(&old[i], &candidates[j]) {
                    lcs[i + 1][j + 1] + 1
                } else {
                    lcs[i + 1][j].max(lcs[i][j + 1])
                };
            }
        }

        let mut matched_old: Vec<Option<usize>> = vec![None; n];
        let (mut i, mut j) = (0, 0);
        while i < m && j < n {
            if self.matches(&old[i], &candidates[j]) && lcs[i][j] == lcs[i + 1][j + 1] + 1 {
                matched_old[j] = Some(i);
                i += 1;
                j += 1;
            } else if lcs[i + 1][j] >= lcs[i][j + 1] {
                i += 1;
            } else {
                j += 1;
            }
        }

        let old_speakers: Vec<Option<u32>> = old.iter().map(|t| t.speaker).collect();
        let mut tentative = Vec::with_capacity(n);
        let mut stability = Vec::with_capacity(n);
        for (j, mut token) in candidates.into_iter().enumerate() {
            match matched_old[j] {
                Some(i) => {
                    stability.push(self.stability[i].saturating_add(1));
                    if token.speaker.is_none() {
                        token.speaker = old_speakers[i];
                    }
                }
                None => stability.push(1),
            }
            tentative.push(token);
        }
        (tentative, stability)
    }

    fn matches(&self, a: &Token, b: &Token) -> bool {
        a.text == b.text && (a.start - b.start).abs() <= self.time_tolerance
    }

    /// Freeze the longest tentative prefix whose tokens have all reached the
    /// committal threshold. Only a prefix may commit: promoting past an
    /// unstable token would leave a hole between committed and tentative.
    fn promote_stable(&mut self) -> usize {
        let stable = self
            .stability
            .iter()
            .take_while(|&&count| count >= self.committal_threshold)
            .count();
        if stable > 0 {
            self.transcript.promote_prefix(stable);
            self.stability.drain(..stable);
        }
        stable
    }

    fn assign_labels(&mut self) -> bool {
        let committed = self.timeline.assign(self.transcript.committed_mut());
        let tentative = self.timeline.assign(self.transcript.tentative_mut());
        committed || tentative
    }
}

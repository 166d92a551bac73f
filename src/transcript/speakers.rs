//! Speaker timeline: accumulates diarization segments across windows and
//! assigns labels to tokens by time overlap.
//!
//! Diarization runs on the same windows as inference but produces its own
//! view of time, so label assignment is a vote: a token takes the label of
//! the segment overlapping it the most. Labels are filled in, possibly late,
//! and never altered once set.

use crate::transcript::types::{SpeakerSegment, Token};
use std::cmp::Ordering;

/// Cumulative speaker segments for one session, ordered by start time.
///
/// A later window re-examines its time range with more context, so its
/// segments supersede earlier coverage of that range: stored segments are
/// clipped at the new window's start before the new batch is added.
#[derive(Debug, Clone, Default)]
pub struct SpeakerTimeline {
    segments: Vec<SpeakerSegment>,
}

impl SpeakerTimeline {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    pub fn segments(&self) -> &[SpeakerSegment] {
        &self.segments
    }

    /// Merge one window's diarization output, superseding previous coverage
    /// from `window_start` onward.
    pub fn extend(&mut self, window_start: f64, new_segments: Vec<SpeakerSegment>) {
        self.segments.retain_mut(|seg| {
            if seg.end <= window_start {
                true
            } else if seg.start < window_start {
                seg.end = window_start;
                true
            } else {
                false
            }
        });
        self.segments.extend(new_segments);
        self.segments.sort_by(|a, b| {
            a.start
                .partial_cmp(&b.start)
                .unwrap_or(Ordering::Equal)
        });
    }

    /// Label for the span `[start, end)`: the segment with maximal overlap
    /// wins; on an exact tie the segment with the earliest start wins.
    /// Returns `None` when no segment overlaps at all.
    pub fn label_for(&self, start: f64, end: f64) -> Option<u32> {
        let mut best: Option<(f64, u32)> = None;
        for seg in &self.segments {
            if seg.start >= end {
                break;
            }
            let overlap = (seg.end.min(end) - seg.start.max(start)).max(0.0);
            if overlap <= 0.0 {
                continue;
            }
            // Strict comparison keeps the earliest-start segment on ties,
            // since segments are iterated in start order.
            if best.is_none_or(|(best_overlap, _)| overlap > best_overlap) {
                best = Some((overlap, seg.speaker));
            }
        }
        best.map(|(_, speaker)| speaker)
    }

    /// Fill unset speaker labels on `tokens`. Labels already present are
    /// left untouched. Returns true if any label was assigned.
    pub fn assign(&self, tokens: &mut [Token]) -> bool {
        let mut changed = false;
        for token in tokens.iter_mut() {
            if token.speaker.is_none()
                && let Some(label) = self.label_for(token.start, token.end)
            {
                token.speaker = Some(label);
                changed = true;
            }
        }
        changed
    }
}

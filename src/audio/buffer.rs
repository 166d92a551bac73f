//! Ingest buffer: accumulates a client's audio stream in arrival order and
//! serves window snapshots for inference.
//!
//! The buffer tracks its position on the absolute session timeline as a
//! sample offset, so trimming committed audio never disturbs timestamps.
//! Windows are owned snapshots: appends continue freely while an inference
//! cycle reads from a window taken earlier.

use crate::error::{Result, SottoError};
use std::collections::VecDeque;
use tracing::warn;

/// One inbound audio chunk, tagged with its arrival sequence number.
/// Samples are 16-bit PCM, mono, at the session sample rate.
#[derive(Debug, Clone, PartialEq)]
pub struct AudioChunk {
    pub seq: u64,
    pub samples: Vec<i16>,
}

impl AudioChunk {
    pub fn new(seq: u64, samples: Vec<i16>) -> Self {
        Self { seq, samples }
    }
}

/// A contiguous slice `[start, start + duration)` of session audio, copied
/// out of the buffer at creation time.
#[derive(Debug, Clone)]
pub struct AudioWindow {
    pub start: f64,
    pub sample_rate: u32,
    pub samples: Vec<i16>,
}

impl AudioWindow {
    pub fn duration(&self) -> f64 {
        self.samples.len() as f64 / self.sample_rate as f64
    }

    pub fn end(&self) -> f64 {
        self.start + self.duration()
    }
}

/// Time-ordered audio accumulator for one session.
pub struct IngestBuffer {
    samples: VecDeque<i16>,
    sample_rate: u32,
    /// Absolute sample index of `samples[0]` on the session timeline.
    start_sample: u64,
    next_seq: u64,
    max_buffered_samples: usize,
}

impl IngestBuffer {
    pub fn new(sample_rate: u32, max_buffer_secs: f64) -> Self {
        Self {
            samples: VecDeque::new(),
            sample_rate,
            start_sample: 0,
            next_seq: 0,
            max_buffered_samples: (max_buffer_secs * sample_rate as f64) as usize,
        }
    }

    /// Append one chunk. Chunks must arrive with consecutive sequence
    /// numbers; anything else is a protocol violation and the buffer is
    /// left untouched.
    ///
    /// If the buffer exceeds its duration cap (a client outrunning
    /// inference), the oldest audio is dropped with a warning. Timestamps
    /// of the remaining audio are unaffected.
    pub fn append(&mut self, chunk: AudioChunk) -> Result<()> {
        if chunk.seq != self.next_seq {
            return Err(SottoError::OutOfOrderChunk {
                expected: self.next_seq,
                got: chunk.seq,
            });
        }
        self.next_seq += 1;
        self.samples.extend(chunk.samples);

        if self.samples.len() > self.max_buffered_samples {
            let overflow = self.samples.len() - self.max_buffered_samples;
            self.samples.drain(..overflow);
            self.start_sample += overflow as u64;
            warn!(
                dropped_secs = overflow as f64 / self.sample_rate as f64,
                buffered_secs = self.buffered_secs(),
                "audio buffer over capacity, dropped oldest audio"
            );
        }
        Ok(())
    }

    /// Start of buffered audio on the session timeline, in seconds.
    pub fn start_time(&self) -> f64 {
        self.start_sample as f64 / self.sample_rate as f64
    }

    /// End of buffered audio on the session timeline, in seconds.
    pub fn end_time(&self) -> f64 {
        (self.start_sample + self.samples.len() as u64) as f64 / self.sample_rate as f64
    }

    pub fn buffered_secs(&self) -> f64 {
        self.samples.len() as f64 / self.sample_rate as f64
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Sequence number the next appended chunk must carry.
    pub fn next_seq(&self) -> u64 {
        self.next_seq
    }

    /// Snapshot the largest window starting at `start` (clamped into the
    /// buffered range) within `[min_duration, max_duration]`.
    ///
    /// When more than `max_duration` is available the window keeps its
    /// start and caps its length: continuity at the committed boundary
    /// matters more than reaching the live edge, which later cycles will
    /// cover.
    pub fn window(
        &self,
        start: f64,
        min_duration: f64,
        max_duration: f64,
    ) -> Result<AudioWindow> {
        let start = start.max(self.start_time());
        let available = self.end_time() - start;
        if available < min_duration {
            return Err(SottoError::InsufficientAudio {
                buffered_secs: available.max(0.0),
                needed_secs: min_duration,
            });
        }

        let duration = available.min(max_duration);
        let abs_start = (start * self.sample_rate as f64).round() as u64;
        let offset = (abs_start - self.start_sample) as usize;
        let count = (duration * self.sample_rate as f64).round() as usize;
        let count = count.min(self.samples.len() - offset);

        let samples: Vec<i16> = self.samples.iter().skip(offset).take(count).copied().collect();
        Ok(AudioWindow {
            start: abs_start as f64 / self.sample_rate as f64,
            sample_rate: self.sample_rate,
            samples,
        })
    }

    /// Discard buffered audio strictly before `up_to` (seconds). A time at
    /// or before the current start is a no-op; a time past the end clears
    /// the buffer.
    pub fn trim(&mut self, up_to: f64) {
        let target = (up_to * self.sample_rate as f64).round() as u64;
        if target <= self.start_sample {
            return;
        }
        let end_sample = self.start_sample + self.samples.len() as u64;
        let target = target.min(end_sample);
        let drop = (target - self.start_sample) as usize;
        self.samples.drain(..drop);
        self.start_sample = target;
    }
}

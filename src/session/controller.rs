//! Session controller: drives the repeating inference cycle for one client.
//!
//! Each cycle takes a window reaching from just before the committed
//! boundary to the end of buffered audio, runs transcription (and
//! diarization, if enabled) on it, feeds the results to the stitcher, and
//! emits the resulting event. Cycles run on a fixed cadence with at most
//! one inference in flight; a tick that lands while a cycle is still
//! running is skipped, never queued.

use crate::asr::{CancelToken, InferenceAdapter, Transcriber};
use crate::audio::{AudioChunk, AudioWindow, IngestBuffer};
use crate::config::Config;
use crate::diarize::{DiarizationAdapter, Diarizer};
use crate::error::{Result, SottoError};
use crate::protocol::{ClientMessage, ServerMessage};
use crate::transcript::{Stitcher, Token, TranscriptEvent};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

/// Why the session loop exited.
enum CloseReason {
    /// Client sent `EndSession` or dropped its handle.
    Ended,
    /// Client stopped reading events.
    ClientGone,
    /// Cancel token was set.
    Cancelled,
    /// Unrecoverable error; reported to the client before closing.
    Failed(SottoError),
}

/// One client's streaming state machine: buffer, stitcher, and adapters.
pub struct SessionController<T: Transcriber, D: Diarizer> {
    buffer: IngestBuffer,
    stitcher: Stitcher,
    asr: InferenceAdapter<T>,
    diarization: Option<DiarizationAdapter<D>>,
    /// Tentative suffix of the last event sent, for emission gating.
    last_tentative: Vec<Token>,
    cancel: CancelToken,
    cadence: Duration,
    min_window_secs: f64,
    max_window_secs: f64,
    context_margin_secs: f64,
}

impl<T: Transcriber + 'static, D: Diarizer + 'static> SessionController<T, D> {
    pub fn new(config: &Config, transcriber: T, diarizer: Option<D>) -> Self {
        let cancel = CancelToken::new();
        Self {
            buffer: IngestBuffer::new(config.session.sample_rate, config.session.max_buffer_secs),
            stitcher: Stitcher::new(
                config.session.committal_threshold_cycles,
                config.session.match_time_tolerance_secs,
            ),
            asr: InferenceAdapter::new(transcriber, config.asr.max_retries, cancel.clone()),
            diarization: diarizer.map(|d| DiarizationAdapter::new(d, cancel.clone())),
            last_tentative: Vec::new(),
            cancel,
            cadence: config.session.cycle_cadence(),
            min_window_secs: config.session.min_window_secs,
            max_window_secs: config.session.max_window_secs,
            context_margin_secs: config.session.context_margin_secs,
        }
    }

    /// Token that interrupts this session's in-flight adapter calls.
    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    /// Absolute start of the next inference window: the context margin
    /// before the committed boundary, clamped to the session start.
    fn window_start(&self) -> f64 {
        (self.stitcher.committed_boundary() - self.context_margin_secs).max(0.0)
    }

    fn handle_audio(&mut self, seq: u64, samples: Vec<i16>) -> Result<()> {
        self.buffer.append(AudioChunk::new(seq, samples))
    }

    /// One steady-state inference cycle. `Ok(None)` when the buffer does
    /// not yet hold `min_window_secs` past the window start, or when the
    /// cycle produced nothing a client would care about.
    async fn run_cycle(&mut self) -> Result<Option<TranscriptEvent>> {
        let window =
            match self
                .buffer
                .window(self.window_start(), self.min_window_secs, self.max_window_secs)
            {
                Ok(window) => window,
                Err(SottoError::InsufficientAudio {
                    buffered_secs,
                    needed_secs,
                }) => {
                    debug!(buffered_secs, needed_secs, "cycle deferred");
                    return Ok(None);
                }
                Err(err) => return Err(err),
            };

        let event = self.infer_and_stitch(window).await?;

        // drop committed audio the next window will not reach back into
        self.buffer.trim(self.window_start());

        Ok(self.emittable(event))
    }

    /// Pass an event on only when the client would see a difference: new
    /// committed text, a speaker update, or a tentative suffix that no
    /// longer matches the last one sent. The last case covers retraction:
    /// a window that shrinks the tentative suffix to nothing must still
    /// reach the client, or stale text stays on screen.
    fn emittable(&mut self, event: TranscriptEvent) -> Option<TranscriptEvent> {
        if event.committed_delta.is_empty()
            && !event.speakers_updated
            && event.tentative == self.last_tentative
        {
            return None;
        }
        self.last_tentative = event.tentative.clone();
        Some(event)
    }

    /// Run both adapters on one window and stitch the results.
    async fn infer_and_stitch(&mut self, window: AudioWindow) -> Result<TranscriptEvent> {
        if let Some(diarization) = &self.diarization {
            let (hypothesis, segments) = tokio::join!(
                self.asr.transcribe_window(&window),
                diarization.diarize_window(&window),
            );
            self.stitcher.merge_segments(window.start, segments);
            Ok(self.stitcher.apply(hypothesis?))
        } else {
            let hypothesis = self.asr.transcribe_window(&window).await?;
            Ok(self.stitcher.apply(hypothesis))
        }
    }

    /// Best-effort final event at session end: one drain cycle over any
    /// trailing audio shorter than the usual minimum, then promotion of
    /// whatever is still tentative.
    async fn finish(&mut self) -> TranscriptEvent {
        let mut event = match self.drain_cycle().await {
            Ok(Some(event)) => event,
            Ok(None) => TranscriptEvent::default(),
            Err(err) => {
                warn!(error = %err, "final inference cycle failed, flushing without it");
                TranscriptEvent::default()
            }
        };

        let flushed = self.stitcher.flush();
        event.committed_delta.extend(flushed.committed_delta);
        event.tentative = Vec::new();
        event.speakers_updated |= flushed.speakers_updated;
        event
    }

    /// Like [`run_cycle`](Self::run_cycle) but with no minimum duration,
    /// so a trailing sub-minimum stretch of audio still gets heard.
    async fn drain_cycle(&mut self) -> Result<Option<TranscriptEvent>> {
        let start = self.window_start();
        if self.buffer.end_time() <= start {
            return Ok(None);
        }
        let window = self.buffer.window(start, 0.0, self.max_window_secs)?;
        if window.samples.is_empty() {
            return Ok(None);
        }
        let event = self.infer_and_stitch(window).await?;
        Ok(Some(event))
    }

    /// Drive the session until the client ends it, a fatal error occurs,
    /// or the cancel token fires.
    pub async fn run(
        mut self,
        mut inbound: mpsc::Receiver<ClientMessage>,
        outbound: mpsc::Sender<ServerMessage>,
    ) {
        info!(
            cadence_ms = self.cadence.as_millis() as u64,
            diarization = self.diarization.is_some(),
            "session started"
        );

        let mut ticker = tokio::time::interval(self.cadence);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        let reason = loop {
            if self.cancel.is_cancelled() {
                break CloseReason::Cancelled;
            }
            tokio::select! {
                message = inbound.recv() => match message {
                    Some(ClientMessage::Audio { seq, samples }) => {
                        if let Err(err) = self.handle_audio(seq, samples) {
                            break CloseReason::Failed(err);
                        }
                    }
                    Some(ClientMessage::EndSession) | None => break CloseReason::Ended,
                },
                _ = ticker.tick() => match self.run_cycle().await {
                    Ok(Some(event)) => {
                        if outbound.send(ServerMessage::Transcript(event)).await.is_err() {
                            break CloseReason::ClientGone;
                        }
                    }
                    Ok(None) => {}
                    Err(SottoError::Cancelled) => break CloseReason::Cancelled,
                    Err(err) => break CloseReason::Failed(err),
                },
            }
        };

        match reason {
            CloseReason::Ended => {
                let event = self.finish().await;
                if let Some(event) = self.emittable(event) {
                    let _ = outbound.send(ServerMessage::Transcript(event)).await;
                }
                let _ = outbound.send(ServerMessage::Closed).await;
            }
            CloseReason::Failed(err) => {
                warn!(error = %err, "session failed");
                let _ = outbound
                    .send(ServerMessage::Error {
                        message: err.to_string(),
                    })
                    .await;
                let _ = outbound.send(ServerMessage::Closed).await;
            }
            CloseReason::Cancelled | CloseReason::ClientGone => {
                let _ = outbound.send(ServerMessage::Closed).await;
            }
        }

        info!(
            committed_secs = self.stitcher.committed_boundary(),
            "session closed"
        );
    }
}

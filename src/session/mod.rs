//! Session lifecycle: one client's streaming transcription from first
//! chunk to close.
//!
//! ```text
//!               SessionHandle                    session task
//! ┌──────────┐  send_chunk / end   ┌───────────────────────────────────┐
//! │ client / │ ───────────────────▶│ IngestBuffer → InferenceAdapter ─┐│
//! │ transport│                     │        (+ DiarizationAdapter)    ││
//! │          │ ◀─────────────────── │              Stitcher ◀──────────┘│
//! └──────────┘   ServerMessage     └───────────────────────────────────┘
//! ```
//!
//! A session is spawned onto the runtime and driven through its
//! [`SessionHandle`]: audio chunks go in, [`ServerMessage`]s come out. No
//! state is shared between sessions; an expensive backend is shared by
//! handing each session an `Arc` of it.

pub mod controller;

pub use controller::SessionController;

use crate::asr::{CancelToken, Transcriber};
use crate::audio::AudioChunk;
use crate::config::Config;
use crate::diarize::Diarizer;
use crate::error::{Result, SottoError};
use crate::protocol::{ClientMessage, ServerMessage};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::warn;

/// Inbound chunk backlog tolerated while an inference cycle runs. At
/// 100ms chunks this is ~25s of audio.
const INBOUND_CAPACITY: usize = 256;
const EVENT_CAPACITY: usize = 64;

/// Spawn a session task for one client and return its handle.
///
/// Passing `None` for the diarizer runs the session without speaker
/// labels; every token keeps `speaker: None` for its whole life.
pub fn spawn<T, D>(config: &Config, transcriber: T, diarizer: Option<D>) -> SessionHandle
where
    T: Transcriber + 'static,
    D: Diarizer + 'static,
{
    let controller = SessionController::new(config, transcriber, diarizer);
    let cancel = controller.cancel_token();
    let (inbound_tx, inbound_rx) = mpsc::channel(INBOUND_CAPACITY);
    let (event_tx, event_rx) = mpsc::channel(EVENT_CAPACITY);
    let task = tokio::spawn(controller.run(inbound_rx, event_tx));
    SessionHandle {
        inbound: inbound_tx,
        events: event_rx,
        cancel,
        task,
    }
}

/// Client-side handle to a running session.
pub struct SessionHandle {
    inbound: mpsc::Sender<ClientMessage>,
    events: mpsc::Receiver<ServerMessage>,
    cancel: CancelToken,
    task: JoinHandle<()>,
}

impl SessionHandle {
    /// Send one audio chunk into the session.
    pub async fn send_chunk(&self, chunk: AudioChunk) -> Result<()> {
        self.inbound
            .send(ClientMessage::Audio {
                seq: chunk.seq,
                samples: chunk.samples,
            })
            .await
            .map_err(|_| SottoError::SessionClosed)
    }

    /// Signal that no more audio will follow. The session flushes its
    /// remaining tentative text and closes.
    pub async fn end(&self) -> Result<()> {
        self.inbound
            .send(ClientMessage::EndSession)
            .await
            .map_err(|_| SottoError::SessionClosed)
    }

    /// Next message from the session, or `None` once it has closed and
    /// all messages are drained.
    pub async fn next_event(&mut self) -> Option<ServerMessage> {
        self.events.recv().await
    }

    /// A message already waiting, if any. Never blocks.
    pub fn try_event(&mut self) -> Option<ServerMessage> {
        self.events.try_recv().ok()
    }

    /// Abortive teardown: interrupt any in-flight inference and close
    /// without flushing.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Wait for the session task to finish.
    pub async fn join(self) {
        if let Err(err) = self.task.await {
            warn!(error = %err, "session task failed");
        }
    }
}

//! End-to-end session tests: chunked audio in, transcript events out.

use sotto::audio::{AudioChunk, AudioWindow, WavStream};
use sotto::config::Config;
use sotto::protocol::ServerMessage;
use sotto::session::{self, SessionHandle};
use sotto::transcript::Token;
use sotto::{Result, ScriptedDiarizer, ScriptedTranscriber, Transcriber};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, mpsc};
use std::time::Duration;

const SAMPLE_RATE: f64 = 16000.0;

fn chunk(seq: u64, secs: f64) -> AudioChunk {
    AudioChunk::new(seq, vec![0i16; (secs * SAMPLE_RATE) as usize])
}

fn texts(tokens: &[Token]) -> Vec<&str> {
    tokens.iter().map(|t| t.text.as_str()).collect()
}

/// Drain the session to `Closed`, collecting committed tokens in emission
/// order and checking each event for a well-formed committed/tentative
/// split.
async fn drain_to_close(handle: &mut SessionHandle) -> Vec<Token> {
    let mut committed: Vec<Token> = Vec::new();
    while let Some(message) = handle.next_event().await {
        match message {
            ServerMessage::Transcript(event) => {
                let boundary = committed.last().map(|t| t.end).unwrap_or(0.0);
                for token in &event.committed_delta {
                    assert!(
                        token.start >= boundary - 1e-9,
                        "commit reaches back before the frozen prefix: {token:?}"
                    );
                }
                committed.extend(event.committed_delta);
                let boundary = committed.last().map(|t| t.end).unwrap_or(0.0);
                for token in &event.tentative {
                    assert!(
                        token.start >= boundary - 1e-9,
                        "tentative token inside the committed region: {token:?}"
                    );
                }
            }
            ServerMessage::Closed => break,
            ServerMessage::Error { message } => panic!("session error: {message}"),
        }
    }
    committed
}

/// Ten seconds of audio in 100ms chunks, sequence numbers 0..99: silence
/// for two seconds, then a fixed narration. The committed transcript must
/// converge to exactly the scripted tokens, each frozen once, in order.
#[tokio::test(start_paused = true)]
async fn ten_second_stream_converges_to_script() {
    let script: [(&str, f64, f64); 9] = [
        ("the", 2.1, 2.4),
        ("quick", 2.5, 2.9),
        ("brown", 3.0, 3.4),
        ("fox", 3.5, 3.9),
        ("jumps", 4.1, 4.5),
        ("over", 4.6, 5.0),
        ("the", 5.1, 5.3),
        ("lazy", 5.4, 5.8),
        ("dog", 5.9, 6.3),
    ];
    let mut backend = ScriptedTranscriber::new("scripted");
    for (text, start, end) in script {
        backend = backend.hears(text, start, end);
    }

    let mut handle = session::spawn(&Config::default(), backend, None::<ScriptedDiarizer>);

    // Real-time pacing: one 100ms chunk per 100ms of (virtual) time.
    for seq in 0..100 {
        handle.send_chunk(chunk(seq, 0.1)).await.unwrap();
        tokio::time::sleep(Duration::from_millis(100)).await;
    }
    handle.end().await.unwrap();

    let committed = drain_to_close(&mut handle).await;

    assert_eq!(
        texts(&committed),
        ["the", "quick", "brown", "fox", "jumps", "over", "the", "lazy", "dog"]
    );
    for (token, (_, start, end)) in committed.iter().zip(script) {
        assert!(
            (token.start - start).abs() < 1e-9 && (token.end - end).abs() < 1e-9,
            "timestamps drifted through the pipeline: {token:?}"
        );
    }
    handle.join().await;
}

/// The first transcript event of a session carries only tentative text;
/// nothing commits before surviving the committal threshold.
#[tokio::test(start_paused = true)]
async fn first_event_is_tentative_only() {
    let backend = ScriptedTranscriber::new("scripted")
        .hears("early", 0.2, 0.8)
        .hears("words", 0.9, 1.4);
    let mut handle = session::spawn(&Config::default(), backend, None::<ScriptedDiarizer>);

    for seq in 0..20 {
        handle.send_chunk(chunk(seq, 0.1)).await.unwrap();
        tokio::time::sleep(Duration::from_millis(100)).await;
    }

    // First cycle's window ends near 1.0s, so only "early" fits inside it.
    let message = handle.next_event().await.expect("first transcript event");
    match message {
        ServerMessage::Transcript(event) => {
            assert!(event.committed_delta.is_empty());
            assert_eq!(texts(&event.tentative), ["early"]);
        }
        other => panic!("expected transcript, got {other:?}"),
    }

    handle.end().await.unwrap();
    let committed = drain_to_close(&mut handle).await;
    assert_eq!(texts(&committed), ["early", "words"]);
    handle.join().await;
}

/// Backend that blocks every call until the test hands it a permit.
struct GatedTranscriber {
    inner: ScriptedTranscriber,
    permits: Mutex<mpsc::Receiver<()>>,
    calls: Arc<AtomicUsize>,
}

impl GatedTranscriber {
    fn new(inner: ScriptedTranscriber) -> (Self, mpsc::Sender<()>, Arc<AtomicUsize>) {
        let (tx, rx) = mpsc::channel();
        let calls = Arc::new(AtomicUsize::new(0));
        let gated = Self {
            inner,
            permits: Mutex::new(rx),
            calls: calls.clone(),
        };
        (gated, tx, calls)
    }
}

impl Transcriber for GatedTranscriber {
    fn transcribe(&self, window: &AudioWindow) -> Result<Vec<Token>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        // A closed permit channel opens the gate so teardown never hangs.
        let _ = self.permits.lock().unwrap().recv();
        self.inner.transcribe(window)
    }

    fn model_name(&self) -> &str {
        "gated"
    }

    fn is_ready(&self) -> bool {
        true
    }
}

/// While an inference call is in flight, elapsed cadence ticks are skipped
/// rather than queued: the backend sees no second call until the first
/// returns.
#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn slow_inference_skips_ticks_instead_of_queueing() {
    let inner = ScriptedTranscriber::new("scripted").hears("held", 0.5, 1.2);
    let (backend, permits, calls) = GatedTranscriber::new(inner);

    let mut config = Config::default();
    config.session.cycle_cadence_secs = 0.2;
    config.session.min_window_secs = 0.5;
    config.asr.max_retries = 0;

    let mut handle = session::spawn(&config, backend, None::<ScriptedDiarizer>);
    for seq in 0..30 {
        handle.send_chunk(chunk(seq, 0.1)).await.unwrap();
    }

    // Several cadence periods pass while the first call sits on the gate.
    tokio::time::sleep(Duration::from_millis(700)).await;
    assert_eq!(
        calls.load(Ordering::SeqCst),
        1,
        "a second inference was issued while the first was still running"
    );

    for _ in 0..20 {
        permits.send(()).unwrap();
    }
    tokio::time::sleep(Duration::from_millis(500)).await;
    assert!(calls.load(Ordering::SeqCst) >= 2, "cycles never resumed");

    handle.end().await.unwrap();
    let committed = drain_to_close(&mut handle).await;
    assert_eq!(texts(&committed), ["held"]);
    handle.join().await;
}

/// A WAV file fed chunk-by-chunk commits the script on end-of-stream, with
/// absolute timestamps intact through decode, chunking, and stitching.
#[tokio::test(start_paused = true)]
async fn wav_file_feed_flushes_full_script() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("fixture.wav");
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate: 16000,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut writer = hound::WavWriter::create(&path, spec).unwrap();
    for _ in 0..(3 * 16000) {
        writer.write_sample(0i16).unwrap();
    }
    writer.finalize().unwrap();

    let stream = WavStream::open(&path, 100).unwrap();
    assert!((stream.duration_secs() - 3.0).abs() < 1e-9);

    let backend = ScriptedTranscriber::new("scripted")
        .hears("from", 0.3, 0.9)
        .hears("disk", 1.0, 1.6);
    let mut handle = session::spawn(&Config::default(), backend, None::<ScriptedDiarizer>);

    for piece in stream {
        handle.send_chunk(piece).await.unwrap();
    }
    handle.end().await.unwrap();

    let committed = drain_to_close(&mut handle).await;
    assert_eq!(texts(&committed), ["from", "disk"]);
    assert!((committed[0].start - 0.3).abs() < 1e-9);
    assert!((committed[1].end - 1.6).abs() < 1e-9);
    assert!(committed.iter().all(|t| t.speaker.is_none()));
    handle.join().await;
}

/// With diarization enabled, flushed tokens carry the speaker whose
/// scripted turn overlaps them most.
#[tokio::test(start_paused = true)]
async fn diarized_session_labels_flushed_tokens() {
    let backend = ScriptedTranscriber::new("scripted")
        .hears("one", 0.2, 0.8)
        .hears("two", 1.1, 1.7);
    let diarizer = ScriptedDiarizer::new("scripted")
        .marks(0, 0.0, 1.0)
        .marks(1, 1.0, 2.0);
    let mut handle = session::spawn(&Config::default(), backend, Some(diarizer));

    for seq in 0..20 {
        handle.send_chunk(chunk(seq, 0.1)).await.unwrap();
    }
    handle.end().await.unwrap();

    let committed = drain_to_close(&mut handle).await;
    assert_eq!(texts(&committed), ["one", "two"]);
    assert_eq!(committed[0].speaker, Some(0));
    assert_eq!(committed[1].speaker, Some(1));
    handle.join().await;
}

/// Silence in, nothing out: no transcript events, just a clean close.
#[tokio::test(start_paused = true)]
async fn silent_stream_closes_without_transcript() {
    let backend = ScriptedTranscriber::new("scripted");
    let mut handle = session::spawn(&Config::default(), backend, None::<ScriptedDiarizer>);

    for seq in 0..10 {
        handle.send_chunk(chunk(seq, 0.1)).await.unwrap();
        tokio::time::sleep(Duration::from_millis(100)).await;
    }
    handle.end().await.unwrap();

    while let Some(message) = handle.next_event().await {
        match message {
            ServerMessage::Closed => break,
            other => panic!("expected a silent close, got {other:?}"),
        }
    }
    handle.join().await;
}

use anyhow::Result;
use clap::Parser;
use sotto::audio::WavStream;
use sotto::cli::{Cli, Commands};
use sotto::config::Config;
use sotto::protocol::ServerMessage;
use sotto::transcript::{SpeakerSegment, Token, TranscriptEvent, joined_text, speaker_lines};
use sotto::{ScriptedDiarizer, ScriptedTranscriber, asr, defaults, session};
use std::io::{self, IsTerminal, Write};
use std::path::Path;
use std::time::Duration;
use tracing::info;

/// Words the scripted demo backend "hears", cycled across the input's
/// duration. Real model backends are wired in by library users; the binary
/// demonstrates the streaming engine end to end.
const DEMO_WORDS: [&str; 9] = [
    "the", "quick", "brown", "fox", "jumps", "over", "the", "lazy", "dog",
];

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        None => {
            let config = load_config(cli.config.as_deref())?;
            run_transcribe(config, None).await
        }
        Some(Commands::Transcribe {
            file,
            cadence,
            threshold,
            diarize,
        }) => {
            let config = load_config(cli.config.as_deref())?;
            let config = apply_overrides(config, cadence, threshold, diarize)?;
            run_transcribe(config, file.as_deref()).await
        }
        Some(Commands::Defaults) => {
            print!("{}", toml::to_string_pretty(&Config::default())?);
            Ok(())
        }
    }
}

/// Route log output to stderr so stdout stays clean for transcript text.
///
/// `RUST_LOG` takes precedence; otherwise verbosity maps to a crate-level
/// filter (`-v`: info, `-vv`: debug, `-vvv`: everything).
fn init_logging(verbose: u8) {
    let directive = match verbose {
        0 => "sotto=warn",
        1 => "sotto=info",
        2 => "sotto=debug",
        _ => "trace",
    };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(directive));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// Load configuration from file or use defaults.
///
/// Priority order:
/// 1. Custom config path from CLI (--config)
/// 2. Default config path (~/.config/sotto/config.toml)
/// 3. Built-in defaults with environment variable overrides
fn load_config(custom_path: Option<&Path>) -> Result<Config> {
    let config = if let Some(path) = custom_path {
        Config::load(path)?
    } else {
        let default_path = Config::default_path();
        Config::load_or_default(&default_path)?
    };

    Ok(config.with_env_overrides())
}

/// Fold CLI flags into the loaded configuration and re-validate.
fn apply_overrides(
    mut config: Config,
    cadence: Option<f64>,
    threshold: Option<u32>,
    diarize: bool,
) -> Result<Config> {
    if let Some(secs) = cadence {
        config.session.cycle_cadence_secs = secs;
    }
    if let Some(cycles) = threshold {
        config.session.committal_threshold_cycles = cycles;
    }
    if diarize {
        config.diarization.enabled = true;
    }
    config.validate()?;
    Ok(config)
}

/// Stream a WAV file (or stdin) through a live session at real-time pace,
/// printing committed lines as they freeze and the tentative tail as it
/// changes.
async fn run_transcribe(config: Config, file: Option<&Path>) -> Result<()> {
    let stream = match file {
        Some(path) => WavStream::open(path, defaults::CHUNK_MS)?,
        None => {
            if io::stdin().is_terminal() {
                eprintln!("No input file and stdin is a terminal.");
                eprintln!("Pipe WAV data in or pass a file: sotto transcribe <file.wav>");
                std::process::exit(1);
            }
            WavStream::from_stdin(defaults::CHUNK_MS)?
        }
    };

    if stream.is_empty() {
        eprintln!("Input contains no audio samples");
        return Ok(());
    }

    let duration = stream.duration_secs();
    info!(duration_secs = duration, "decoded input audio");

    let transcriber =
        ScriptedTranscriber::new(&config.asr.model).with_script(demo_script(duration));
    asr::warm_up(&transcriber, config.session.sample_rate, defaults::WARMUP_SECS)?;

    let diarizer = if config.diarization.enabled {
        Some(demo_diarizer(duration))
    } else {
        None
    };

    let mut handle = session::spawn(&config, transcriber, diarizer);
    let mut view = LiveView::new();
    let mut failure: Option<String> = None;
    let pace = Duration::from_millis(defaults::CHUNK_MS as u64);

    for chunk in stream {
        // A send failure means the session task is gone; the close reason
        // arrives through the event channel below.
        if handle.send_chunk(chunk).await.is_err() {
            break;
        }
        while let Some(msg) = handle.try_event() {
            apply_message(&mut view, msg, &mut failure);
        }
        tokio::time::sleep(pace).await;
    }

    handle.end().await.ok();
    while let Some(msg) = handle.next_event().await {
        let closed = matches!(msg, ServerMessage::Closed);
        apply_message(&mut view, msg, &mut failure);
        if closed {
            break;
        }
    }
    handle.join().await;

    if let Some(message) = failure {
        anyhow::bail!("session failed: {message}");
    }
    Ok(())
}

fn apply_message(view: &mut LiveView, msg: ServerMessage, failure: &mut Option<String>) {
    match msg {
        ServerMessage::Transcript(event) => view.apply(&event),
        ServerMessage::Error { message } => *failure = Some(message),
        ServerMessage::Closed => view.finish(),
    }
}

/// Terminal rendering of a growing transcript: committed lines print
/// permanently, the tentative tail lives on one overwritten line.
struct LiveView {
    tentative_visible: bool,
}

impl LiveView {
    fn new() -> Self {
        Self {
            tentative_visible: false,
        }
    }

    fn apply(&mut self, event: &TranscriptEvent) {
        if !event.committed_delta.is_empty() {
            self.clear_tentative();
            for line in speaker_lines(&event.committed_delta) {
                match line.speaker {
                    Some(id) => println!("[speaker {id}] {}", line.text),
                    None => println!("{}", line.text),
                }
            }
        }
        self.show_tentative(&joined_text(&event.tentative));
    }

    fn show_tentative(&mut self, text: &str) {
        self.clear_tentative();
        if !text.is_empty() {
            print!("~ {text}");
            io::stdout().flush().unwrap_or(());
            self.tentative_visible = true;
        }
    }

    fn clear_tentative(&mut self) {
        if self.tentative_visible {
            print!("\r\x1b[K");
            io::stdout().flush().unwrap_or(());
            self.tentative_visible = false;
        }
    }

    fn finish(&mut self) {
        self.clear_tentative();
    }
}

/// Synthesize the demo backend's script: a canned narration paced across
/// the input's duration at conversational speed.
fn demo_script(duration_secs: f64) -> Vec<Token> {
    let word_secs = 0.32;
    let gap_secs = 0.08;
    let mut tokens = Vec::new();
    let mut t = 0.2;
    let mut i = 0;
    while t + word_secs <= duration_secs {
        tokens.push(Token::new(
            DEMO_WORDS[i % DEMO_WORDS.len()],
            t,
            t + word_secs,
            0.9,
        ));
        t += word_secs + gap_secs;
        i += 1;
    }
    tokens
}

/// Scripted speaker turns alternating every few seconds.
fn demo_diarizer(duration_secs: f64) -> ScriptedDiarizer {
    let turn_secs = 4.0;
    let mut marks: Vec<SpeakerSegment> = Vec::new();
    let mut t = 0.0;
    let mut speaker = 0;
    while t < duration_secs {
        let end = (t + turn_secs).min(duration_secs);
        marks.push(SpeakerSegment::new(speaker, t, end));
        t = end;
        speaker = 1 - speaker;
    }
    marks
        .into_iter()
        .fold(ScriptedDiarizer::new("demo-diarizer"), |d, s| {
            d.marks(s.speaker, s.start, s.end)
        })
}

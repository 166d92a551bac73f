//! Command-line interface for sotto
//!
//! Provides argument parsing using clap derive macros.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Incremental streaming speech-to-text
#[derive(Parser, Debug)]
#[command(name = "sotto", version, about = "Incremental streaming speech-to-text")]
pub struct Cli {
    /// Subcommand to execute; defaults to transcribing stdin
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Path to configuration file
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Verbose output (-v: cycle events, -vv: engine internals)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Stream a WAV file through a session, printing the transcript as it
    /// stabilizes
    Transcribe {
        /// 16-bit PCM WAV file; reads stdin when omitted
        file: Option<PathBuf>,

        /// Inference cycle cadence. Examples: 500ms, 1s, 2s
        #[arg(long, value_name = "DURATION", value_parser = parse_secs)]
        cadence: Option<f64>,

        /// Consecutive agreeing cycles required to commit a token
        #[arg(long, value_name = "N")]
        threshold: Option<u32>,

        /// Label tokens with speaker turns
        #[arg(long)]
        diarize: bool,
    },

    /// Print the default configuration as TOML
    Defaults,
}

/// Parse a duration argument into seconds.
///
/// Supports any duration format accepted by `humantime`: bare numbers
/// (seconds), single-unit (`500ms`, `2s`), and compound (`1m30s`).
fn parse_secs(s: &str) -> Result<f64, String> {
    let s = s.trim();
    if let Ok(secs) = s.parse::<f64>() {
        return Ok(secs);
    }
    humantime::parse_duration(s)
        .map(|d| d.as_secs_f64())
        .map_err(|e| e.to_string())
}

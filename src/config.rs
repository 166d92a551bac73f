use crate::defaults;
use crate::error::{Result, SottoError};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Root configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct Config {
    pub session: SessionConfig,
    pub asr: AsrConfig,
    pub diarization: DiarizationConfig,
}

/// Streaming session tuning.
///
/// These are the latency/stability trade-off knobs: cadence and window bounds
/// control how often and on how much audio inference runs, the committal
/// threshold and match tolerance control how eagerly tentative text freezes.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SessionConfig {
    pub sample_rate: u32,
    pub cycle_cadence_secs: f64,
    pub min_window_secs: f64,
    pub max_window_secs: f64,
    pub context_margin_secs: f64,
    pub committal_threshold_cycles: u32,
    pub match_time_tolerance_secs: f64,
    pub max_buffer_secs: f64,
}

/// Speech recognition backend configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AsrConfig {
    pub model: String,
    pub language: String,
    pub max_retries: u32,
}

/// Speaker diarization configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct DiarizationConfig {
    pub enabled: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            sample_rate: defaults::SAMPLE_RATE,
            cycle_cadence_secs: defaults::CYCLE_CADENCE_SECS,
            min_window_secs: defaults::MIN_WINDOW_SECS,
            max_window_secs: defaults::MAX_WINDOW_SECS,
            context_margin_secs: defaults::CONTEXT_MARGIN_SECS,
            committal_threshold_cycles: defaults::COMMITTAL_THRESHOLD_CYCLES,
            match_time_tolerance_secs: defaults::MATCH_TIME_TOLERANCE_SECS,
            max_buffer_secs: defaults::MAX_BUFFER_SECS,
        }
    }
}

impl Default for AsrConfig {
    fn default() -> Self {
        Self {
            model: "base".to_string(),
            language: "auto".to_string(),
            max_retries: defaults::MAX_MODEL_RETRIES,
        }
    }
}

impl Default for DiarizationConfig {
    fn default() -> Self {
        Self {
            enabled: defaults::DIARIZATION_ENABLED,
        }
    }
}

impl SessionConfig {
    pub fn cycle_cadence(&self) -> Duration {
        Duration::from_secs_f64(self.cycle_cadence_secs)
    }
}

impl Config {
    /// Load configuration from a TOML file
    ///
    /// Returns an error if the file is missing or contains invalid TOML.
    /// Missing fields use default values.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                SottoError::ConfigFileNotFound {
                    path: path.display().to_string(),
                }
            } else {
                SottoError::Io(e)
            }
        })?;
        let config: Config = toml::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a file, falling back to defaults if missing
    ///
    /// Only a missing file falls back; invalid TOML or invalid values are
    /// still reported as errors.
    pub fn load_or_default(path: &Path) -> Result<Self> {
        match Self::load(path) {
            Ok(config) => Ok(config),
            Err(SottoError::ConfigFileNotFound { .. }) => Ok(Self::default()),
            Err(e) => Err(e),
        }
    }

    /// Apply environment variable overrides
    ///
    /// Supported environment variables:
    /// - SOTTO_MODEL → asr.model
    /// - SOTTO_LANGUAGE → asr.language
    /// - SOTTO_DIARIZATION → diarization.enabled ("1"/"true" enables)
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(model) = std::env::var("SOTTO_MODEL")
            && !model.is_empty()
        {
            self.asr.model = model;
        }

        if let Ok(language) = std::env::var("SOTTO_LANGUAGE")
            && !language.is_empty()
        {
            self.asr.language = language;
        }

        if let Ok(diarization) = std::env::var("SOTTO_DIARIZATION")
            && !diarization.is_empty()
        {
            self.diarization.enabled = diarization == "1" || diarization.eq_ignore_ascii_case("true");
        }

        self
    }

    /// Check value ranges that serde cannot express.
    pub fn validate(&self) -> Result<()> {
        let s = &self.session;
        if s.sample_rate == 0 {
            return Err(invalid("session.sample_rate", "must be positive"));
        }
        if s.cycle_cadence_secs <= 0.0 {
            return Err(invalid("session.cycle_cadence_secs", "must be positive"));
        }
        if s.min_window_secs <= 0.0 {
            return Err(invalid("session.min_window_secs", "must be positive"));
        }
        if s.min_window_secs > s.max_window_secs {
            return Err(invalid(
                "session.max_window_secs",
                "must be at least min_window_secs",
            ));
        }
        if s.context_margin_secs < 0.0 {
            return Err(invalid("session.context_margin_secs", "must not be negative"));
        }
        if s.committal_threshold_cycles == 0 {
            return Err(invalid(
                "session.committal_threshold_cycles",
                "must be at least 1",
            ));
        }
        if s.match_time_tolerance_secs < 0.0 {
            return Err(invalid(
                "session.match_time_tolerance_secs",
                "must not be negative",
            ));
        }
        if s.max_buffer_secs < s.max_window_secs {
            return Err(invalid(
                "session.max_buffer_secs",
                "must be at least max_window_secs",
            ));
        }
        Ok(())
    }

    /// Get the default configuration file path
    ///
    /// Returns ~/.config/sotto/config.toml on Linux
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("sotto")
            .join("config.toml")
    }
}

fn invalid(key: &str, message: &str) -> SottoError {
    SottoError::ConfigInvalidValue {
        key: key.to_string(),
        message: message.to_string(),
    }
}

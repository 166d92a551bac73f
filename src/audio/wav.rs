//! WAV file decoding into a sequence-numbered chunk stream.
//!
//! Feeds recorded audio through a session the same way a network client
//! would: decoded to 16kHz mono and sliced into fixed-duration chunks with
//! consecutive sequence numbers. Arbitrary source rates and stereo input are
//! accepted and converted.

use crate::audio::buffer::AudioChunk;
use crate::defaults::SAMPLE_RATE;
use crate::error::{Result, SottoError};
use std::io::Read;
use std::path::Path;

/// Decoded WAV audio, iterated as [`AudioChunk`]s.
pub struct WavStream {
    samples: Vec<i16>,
    position: usize,
    chunk_samples: usize,
    next_seq: u64,
}

impl WavStream {
    /// Decode WAV data from any reader, converting to 16kHz mono.
    /// Only 16-bit integer PCM sample formats are supported.
    pub fn from_reader(reader: impl Read, chunk_ms: u32) -> Result<Self> {
        let mut wav_reader = hound::WavReader::new(reader).map_err(|e| SottoError::AudioDecode {
            message: format!("not a readable WAV stream: {}", e),
        })?;

        let spec = wav_reader.spec();
        let raw: Vec<i16> = wav_reader
            .samples::<i16>()
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(|e| SottoError::AudioDecode {
                message: format!("unsupported sample data (need 16-bit PCM): {}", e),
            })?;

        let mono = match spec.channels {
            1 => raw,
            2 => downmix_stereo(&raw),
            other => {
                return Err(SottoError::AudioDecode {
                    message: format!("unsupported channel count: {}", other),
                });
            }
        };

        let samples = if spec.sample_rate == SAMPLE_RATE {
            mono
        } else {
            resample(&mono, spec.sample_rate, SAMPLE_RATE)
        };

        let chunk_samples = (SAMPLE_RATE as u64 * chunk_ms as u64 / 1000) as usize;
        Ok(Self {
            samples,
            position: 0,
            chunk_samples: chunk_samples.max(1),
            next_seq: 0,
        })
    }

    /// Decode a WAV file from disk.
    pub fn open(path: &Path, chunk_ms: u32) -> Result<Self> {
        let file = std::fs::File::open(path)?;
        Self::from_reader(std::io::BufReader::new(file), chunk_ms)
    }

    /// Decode WAV data piped on stdin.
    pub fn from_stdin(chunk_ms: u32) -> Result<Self> {
        let mut data = Vec::new();
        std::io::stdin().lock().read_to_end(&mut data)?;
        Self::from_reader(std::io::Cursor::new(data), chunk_ms)
    }

    /// Total decoded duration in seconds.
    pub fn duration_secs(&self) -> f64 {
        self.samples.len() as f64 / SAMPLE_RATE as f64
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
}

impl Iterator for WavStream {
    type Item = AudioChunk;

    fn next(&mut self) -> Option<AudioChunk> {
        if self.position >= self.samples.len() {
            return None;
        }
        let end = (self.position + self.chunk_samples).min(self.samples.len());
        let chunk = AudioChunk::new(self.next_seq, self.samples[self.position..end].to_vec());
        self.position = end;
        self.next_seq += 1;
        Some(chunk)
    }
}

fn downmix_stereo(samples: &[i16]) -> Vec<i16> {
    samples
        .chunks_exact(2)
        .map(|pair| ((pair[0] as i32 + pair[1] as i32) / 2) as i16)
        .collect()
}

/// Linear interpolation resampling.
fn resample(samples: &[i16], from_rate: u32, to_rate: u32) -> Vec<i16> {
    if from_rate == to_rate || samples.is_empty() {
        return samples.to_vec();
    }

    let ratio = from_rate as f64 / to_rate as f64;
    let output_len = (samples.len() as f64 / ratio).ceil() as usize;

    (0..output_len)
        .map(|i| {
            let pos = i as f64 * ratio;
            let idx = pos.floor() as usize;
            let frac = pos - idx as f64;
            if idx + 1 >= samples.len() {
                samples[samples.len() - 1]
            } else {
                let a = samples[idx] as f64;
                let b = samples[idx + 1] as f64;
                (a + (b - a) * frac) as i16
            }
        })
        .collect()
}

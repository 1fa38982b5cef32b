//! Pipeline configuration.
//!
//! Every field has a default, so an empty TOML document is a valid config.
//!
//! ```toml
//! [dataset]
//! file_pattern = "*.wav"
//! target_sample_rate = 22050
//!
//! [mel]
//! n_fft = 2048
//! hop_length = 512
//! n_mels = 128
//! ```

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::{Result, TuneError};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub dataset: DatasetConfig,
    pub mel: MelConfig,
}

/// How source files are discovered and decoded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DatasetConfig {
    /// Glob matched against file names directly inside the source folder.
    pub file_pattern: String,
    /// Resample every tune to this rate. `None` keeps the native rate.
    pub target_sample_rate: Option<u32>,
}

impl Default for DatasetConfig {
    fn default() -> Self {
        Self {
            file_pattern: "*.wav".to_string(),
            target_sample_rate: None,
        }
    }
}

/// Mel spectrogram parameters. Defaults follow librosa.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MelConfig {
    /// FFT size (also the Hann window length)
    pub n_fft: usize,
    /// Samples between successive frames
    pub hop_length: usize,
    /// Number of Mel bins
    pub n_mels: usize,
    /// Lowest filter frequency in Hz
    pub fmin: f32,
    /// Highest filter frequency in Hz, Nyquist when unset
    pub fmax: Option<f32>,
    /// Floor the decibel range to `max - top_db`
    pub top_db: Option<f32>,
}

impl Default for MelConfig {
    fn default() -> Self {
        Self {
            n_fft: 2048,
            hop_length: 512,
            n_mels: 128,
            fmin: 0.0,
            fmax: None,
            top_db: None,
        }
    }
}

impl PipelineConfig {
    pub fn from_toml_str(text: &str) -> Result<Self> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| TuneError::io(path, e))?;
        Self::from_toml_str(&text)
    }

    pub fn validate(&self) -> Result<()> {
        self.dataset.validate()?;
        self.mel.validate()
    }
}

impl DatasetConfig {
    pub fn validate(&self) -> Result<()> {
        if self.file_pattern.trim().is_empty() {
            return Err(invalid("file_pattern must not be empty"));
        }
        if self.target_sample_rate == Some(0) {
            return Err(invalid("target_sample_rate must be positive"));
        }
        Ok(())
    }
}

impl MelConfig {
    pub fn validate(&self) -> Result<()> {
        if self.n_fft < 2 {
            return Err(invalid("n_fft must be at least 2"));
        }
        if self.hop_length == 0 {
            return Err(invalid("hop_length must be positive"));
        }
        if self.n_mels == 0 {
            return Err(invalid("n_mels must be positive"));
        }
        if !self.fmin.is_finite() || self.fmin < 0.0 {
            return Err(invalid("fmin must be a non-negative frequency"));
        }
        if let Some(fmax) = self.fmax {
            if !fmax.is_finite() || fmax <= self.fmin {
                return Err(invalid("fmax must be above fmin"));
            }
        }
        if let Some(top_db) = self.top_db {
            if !top_db.is_finite() || top_db <= 0.0 {
                return Err(invalid("top_db must be positive"));
            }
        }
        Ok(())
    }

    /// Upper filter frequency for a given sample rate.
    pub fn fmax_for(&self, sample_rate: u32) -> f32 {
        self.fmax.unwrap_or(sample_rate as f32 / 2.0)
    }
}

fn invalid(reason: &str) -> TuneError {
    TuneError::InvalidConfig(reason.to_string())
}

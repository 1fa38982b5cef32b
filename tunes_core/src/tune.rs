use hound::{SampleFormat, WavSpec, WavWriter};
use ndarray::ArrayView1;
use std::fmt;
use std::path::{Path, PathBuf};

use crate::export::{ensure_destination, output_path, ExportFormat};
use crate::{Result, TuneError};

/// Largest sample buffer a `Vec<f32>` can hold.
const MAX_SAMPLES: usize = isize::MAX as usize / std::mem::size_of::<f32>();

/// One decoded audio clip.
#[derive(Debug, Clone, PartialEq)]
pub struct Tune {
    samples: Vec<f32>,
    sample_rate: u32,
    source_path: PathBuf,
}

impl Tune {
    pub fn new(samples: Vec<f32>, sample_rate: u32, source_path: impl Into<PathBuf>) -> Result<Self> {
        if sample_rate == 0 {
            return Err(TuneError::InvalidTune("sample rate must be positive"));
        }
        if samples.is_empty() {
            return Err(TuneError::InvalidTune("a tune needs at least one sample"));
        }
        Ok(Self {
            samples,
            sample_rate,
            source_path: source_path.into(),
        })
    }

    pub fn samples(&self) -> &[f32] {
        &self.samples
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn source_path(&self) -> &Path {
        &self.source_path
    }

    /// File name of the source, e.g. `kick.wav`.
    pub fn file_name(&self) -> Option<&str> {
        self.source_path.file_name().and_then(|n| n.to_str())
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn duration_seconds(&self) -> f64 {
        self.samples.len() as f64 / self.sample_rate as f64
    }

    /// Sample count for a duration, rounded to the nearest sample.
    ///
    /// `None` for negative or non-finite durations, and for sample counts
    /// too large to allocate.
    pub fn samples_for(&self, seconds: f64) -> Option<usize> {
        if !seconds.is_finite() || seconds < 0.0 {
            return None;
        }
        let count = (seconds * self.sample_rate as f64).round();
        if count >= MAX_SAMPLES as f64 {
            return None;
        }
        Some(count as usize)
    }

    /// Loop-pad to `target_seconds` by repeating the clip from its start.
    ///
    /// Never shortens: a tune at or above the target is left alone.
    pub fn pad(&mut self, target_seconds: f64) {
        let Some(target) = self.samples_for(target_seconds) else {
            return;
        };
        if target <= self.samples.len() || self.samples.is_empty() {
            return;
        }
        self.samples = self.samples.iter().copied().cycle().take(target).collect();
    }

    /// Keep only the first `target_seconds` of the clip.
    pub fn crop(&mut self, target_seconds: f64) {
        let Some(target) = self.samples_for(target_seconds) else {
            return;
        };
        if target >= self.samples.len() {
            return;
        }
        self.samples.truncate(target);
    }

    /// Write the current samples into `destination` and return the file path.
    pub fn export(&self, destination: impl AsRef<Path>, format: ExportFormat) -> Result<PathBuf> {
        let destination = destination.as_ref();
        ensure_destination(destination)?;

        let path = match format {
            ExportFormat::Npy => {
                let path = output_path(destination, &self.source_path, "_tune", "npy");
                ndarray_npy::write_npy(&path, &ArrayView1::from(self.samples.as_slice()))?;
                path
            }
            ExportFormat::Wav => {
                let path = output_path(destination, &self.source_path, "", "wav");
                self.write_wav(&path)?;
                path
            }
        };

        tracing::debug!(path = %path.display(), %format, "exported tune");
        Ok(path)
    }

    fn write_wav(&self, path: &Path) -> Result<()> {
        let spec = WavSpec {
            channels: 1,
            sample_rate: self.sample_rate,
            bits_per_sample: 32,
            sample_format: SampleFormat::Float,
        };
        let mut writer = WavWriter::create(path, spec)?;
        for &sample in &self.samples {
            writer.write_sample(sample)?;
        }
        writer.finalize()?;
        Ok(())
    }
}

impl fmt::Display for Tune {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.3} seconds audio.", self.duration_seconds())
    }
}

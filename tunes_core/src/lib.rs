//! Tune preprocessing: decode short audio clips, normalize their duration
//! and turn them into decibel-scaled Mel spectrograms.
//!
//! ```no_run
//! use tunes_core::{progress::LogProgress, TuneDataset};
//!
//! # fn main() -> tunes_core::Result<()> {
//! let mut dataset = TuneDataset::new();
//! dataset.load("data/tunes")?;
//! dataset.extract_tunes(&mut LogProgress)?;
//! dataset.pad_tunes(2.0)?;
//! dataset.extract_mel_spectrograms(&mut LogProgress)?;
//! let batch = dataset.spectrogram_batch()?;
//! # let _ = batch;
//! # Ok(())
//! # }
//! ```

pub mod audio;
pub mod config;
pub mod dataset;
pub mod error;
pub mod export;
pub mod progress;
pub mod spectrogram;
pub mod tune;

pub use config::{DatasetConfig, MelConfig, PipelineConfig};
pub use dataset::TuneDataset;
pub use error::{Result, TuneError};
pub use export::ExportFormat;
pub use spectrogram::MelSpectrogram;
pub use tune::Tune;

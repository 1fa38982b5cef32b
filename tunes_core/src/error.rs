use std::path::PathBuf;

use crate::progress::Stage;

/// Errors produced by the tune pipeline.
#[derive(Debug, thiserror::Error)]
pub enum TuneError {
    #[error("folder does not exist: {}", .0.display())]
    FolderNotFound(PathBuf),

    #[error("{stage} stage is not ready: {reason}")]
    StageNotReady { stage: Stage, reason: &'static str },

    #[error("export destination is missing or not a directory: {}", .0.display())]
    InvalidDestination(PathBuf),

    #[error("unsupported export format: {0:?}")]
    UnsupportedFormat(String),

    #[error("failed to decode {}: {reason}", .path.display())]
    DecodeFailure { path: PathBuf, reason: String },

    #[error("invalid tune: {0}")]
    InvalidTune(&'static str),

    #[error("invalid file pattern {pattern:?}: {source}")]
    InvalidPattern {
        pattern: String,
        source: glob::PatternError,
    },

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("spectrogram shapes differ: expected {expected:?}, got {actual:?}")]
    ShapeMismatch {
        expected: (usize, usize),
        actual: (usize, usize),
    },

    #[error("resampling failed: {0}")]
    Resample(String),

    #[error("spectral transform failed: {0}")]
    Spectral(String),

    #[error("I/O error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to write array: {0}")]
    Npy(#[from] ndarray_npy::WriteNpyError),

    #[error("failed to write wav: {0}")]
    Wav(#[from] hound::Error),

    #[error("failed to render image: {0}")]
    Image(#[from] image::ImageError),

    #[error("failed to parse configuration: {0}")]
    Toml(#[from] toml::de::Error),
}

pub type Result<T> = std::result::Result<T, TuneError>;

impl TuneError {
    pub(crate) fn decode(path: impl Into<PathBuf>, reason: impl ToString) -> Self {
        Self::DecodeFailure {
            path: path.into(),
            reason: reason.to_string(),
        }
    }

    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

//! Output naming and the formats tunes can be written in.

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::{Result, TuneError};

/// Formats a [`Tune`](crate::Tune) can be exported as.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ExportFormat {
    /// Raw float32 samples as a NumPy `.npy` array.
    #[default]
    Npy,
    /// Playable mono 32-bit float WAV.
    Wav,
}

impl ExportFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExportFormat::Npy => "npy",
            ExportFormat::Wav => "wav",
        }
    }
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ExportFormat {
    type Err = TuneError;

    fn from_str(token: &str) -> Result<Self> {
        match token.trim().to_ascii_lowercase().as_str() {
            "npy" | "numpy" => Ok(ExportFormat::Npy),
            "wav" | "audio" => Ok(ExportFormat::Wav),
            _ => Err(TuneError::UnsupportedFormat(token.to_string())),
        }
    }
}

/// Fail unless `folder` is an existing directory.
pub(crate) fn ensure_destination(folder: &Path) -> Result<()> {
    if folder.is_dir() {
        Ok(())
    } else {
        Err(TuneError::InvalidDestination(folder.to_path_buf()))
    }
}

/// `<folder>/<source stem><suffix>.<extension>`
pub(crate) fn output_path(folder: &Path, source: &Path, suffix: &str, extension: &str) -> PathBuf {
    let stem = source
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "tune".to_string());
    folder.join(format!("{stem}{suffix}.{extension}"))
}

use anyhow::{Context, Result};
use serde::Serialize;
use std::{
    fs::File,
    io::{BufWriter, Write},
    path::{Path, PathBuf},
};

use tunes_core::TuneDataset;

/// One JSON line per tune.
#[derive(Debug, Serialize)]
pub struct ManifestLine {
    pub source_path: String,
    pub sample_rate: u32,
    pub duration_seconds: f64,
    pub num_samples: usize,
    pub mel_shape: Option<(usize, usize)>,
    pub exported: Vec<String>,
}

/// Build manifest lines for every tune, attaching exported files by index.
pub fn lines(dataset: &TuneDataset, exported: &[Vec<PathBuf>]) -> Vec<ManifestLine> {
    dataset
        .tunes()
        .iter()
        .enumerate()
        .map(|(i, tune)| ManifestLine {
            source_path: tune.source_path().to_string_lossy().to_string(),
            sample_rate: tune.sample_rate(),
            duration_seconds: tune.duration_seconds(),
            num_samples: tune.len(),
            mel_shape: dataset.mel_spectrograms().get(i).map(|mel| mel.shape()),
            exported: exported
                .get(i)
                .map(|paths| paths.iter().map(|p| p.to_string_lossy().to_string()).collect())
                .unwrap_or_default(),
        })
        .collect()
}

pub fn write(out_path: &Path, lines: &[ManifestLine]) -> Result<()> {
    if let Some(parent) = out_path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create manifest folder: {}", parent.display()))?;
    }

    let out_file = File::create(out_path)
        .with_context(|| format!("Failed to create manifest: {}", out_path.display()))?;
    let mut writer = BufWriter::new(out_file);

    for line in lines {
        serde_json::to_writer(&mut writer, line)?;
        writer.write_all(b"\n")?;
    }

    writer.flush()?;
    tracing::info!(path = %out_path.display(), lines = lines.len(), "wrote manifest");
    Ok(())
}

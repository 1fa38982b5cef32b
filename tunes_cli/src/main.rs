mod manifest;
mod progress_bar;

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use tunes_core::progress::{ProgressObserver, Silent};
use tunes_core::{ExportFormat, PipelineConfig, TuneDataset, TuneError};

use crate::progress_bar::BarProgress;

/// Turn a folder of short audio clips into Mel spectrograms.
#[derive(Parser, Debug)]
#[command(name = "tunes", version, about)]
struct Args {
    /// Folder containing the source audio files
    folder: PathBuf,

    /// Glob matched against file names (overrides the config file)
    #[arg(long)]
    pattern: Option<String>,

    /// TOML pipeline configuration
    #[arg(long)]
    config: Option<PathBuf>,

    /// Loop-pad every tune to this many seconds
    #[arg(long)]
    pad: Option<f64>,

    /// Head-crop every tune to this many seconds
    #[arg(long)]
    crop: Option<f64>,

    /// Export folder, created if needed
    #[arg(long)]
    out: Option<PathBuf>,

    /// Tune export format: npy or wav
    #[arg(long, default_value = "npy", value_parser = parse_format)]
    format: ExportFormat,

    /// Also export the Mel spectrograms as .npy
    #[arg(long)]
    mel: bool,

    /// Also render the Mel spectrograms as .png
    #[arg(long)]
    plot: bool,

    /// Write a JSONL manifest describing every tune
    #[arg(long)]
    manifest: Option<PathBuf>,

    /// No progress bars, warnings only
    #[arg(long, short)]
    quiet: bool,
}

fn parse_format(token: &str) -> std::result::Result<ExportFormat, String> {
    token.parse().map_err(|e: TuneError| e.to_string())
}

fn init_logging(quiet: bool) {
    let default_level = if quiet { "warn" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(args.quiet);

    let mut config = match &args.config {
        Some(path) => PipelineConfig::from_toml_file(path)
            .with_context(|| format!("Failed to load config: {}", path.display()))?,
        None => PipelineConfig::default(),
    };
    if let Some(pattern) = &args.pattern {
        config.dataset.file_pattern = pattern.clone();
    }

    let mut dataset = TuneDataset::with_config(&config)?;
    dataset
        .load(&args.folder)
        .with_context(|| format!("Failed to scan {}", args.folder.display()))?;
    tracing::info!("{dataset}");

    let mut progress: Box<dyn ProgressObserver> = if args.quiet {
        Box::new(Silent)
    } else {
        Box::new(BarProgress::new()?)
    };

    dataset.extract_tunes(progress.as_mut())?;
    if dataset.tunes().is_empty() {
        tracing::warn!("nothing to do");
        return Ok(());
    }

    if let Some(seconds) = args.pad {
        dataset.pad_tunes(seconds)?;
    }
    if let Some(seconds) = args.crop {
        dataset.crop_tunes(seconds)?;
    }

    dataset.extract_mel_spectrograms(progress.as_mut())?;
    drop(progress);

    let mut exported: Vec<Vec<PathBuf>> = vec![Vec::new(); dataset.tunes().len()];
    if let Some(out) = &args.out {
        std::fs::create_dir_all(out)
            .with_context(|| format!("Failed to create output folder: {}", out.display()))?;

        for (i, path) in dataset.export_tunes(out, args.format)?.into_iter().enumerate() {
            exported[i].push(path);
        }
        if args.mel {
            for (i, path) in dataset.export_mel_spectrograms(out)?.into_iter().enumerate() {
                exported[i].push(path);
            }
        }
        if args.plot {
            for (i, mel) in dataset.mel_spectrograms().iter().enumerate() {
                exported[i].push(mel.visualize(out)?);
            }
        }
        tracing::info!(
            folder = %out.display(),
            files = exported.iter().map(Vec::len).sum::<usize>(),
            "export finished"
        );
    } else if args.mel || args.plot {
        tracing::warn!("--mel and --plot need --out, skipping export");
    }

    if let Some(path) = &args.manifest {
        let lines = manifest::lines(&dataset, &exported);
        manifest::write(path, &lines)?;
    }

    for mel in dataset.mel_spectrograms() {
        tracing::debug!(source = %mel.source_path().display(), "{mel}");
    }

    Ok(())
}

//! A folder of tunes moving through discover, extract, normalize and
//! feature-extract stages.
//!
//! Every stage is all-or-nothing: on error the dataset keeps whatever it
//! held before the call. Index `i` of `file_paths`, `tunes` and
//! `mel_spectrograms` always refers to the same source file.

use glob::{MatchOptions, Pattern};
use ndarray::{s, Array3};
use std::fmt;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use crate::audio::decode_mono;
use crate::config::{DatasetConfig, MelConfig, PipelineConfig};
use crate::export::ExportFormat;
use crate::progress::{ProgressObserver, Stage, StageProgress};
use crate::{MelSpectrogram, Result, Tune, TuneError};

#[derive(Debug, Clone, Default)]
pub struct TuneDataset {
    dataset_config: DatasetConfig,
    mel_config: MelConfig,
    source_folder: Option<PathBuf>,
    file_paths: Option<Vec<PathBuf>>,
    tunes: Vec<Tune>,
    mel_spectrograms: Vec<MelSpectrogram>,
}

impl TuneDataset {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: &PipelineConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            dataset_config: config.dataset.clone(),
            mel_config: config.mel.clone(),
            ..Self::default()
        })
    }

    pub fn mel_config(&self) -> &MelConfig {
        &self.mel_config
    }

    pub fn source_folder(&self) -> Option<&Path> {
        self.source_folder.as_deref()
    }

    /// Discovered files, empty until [`load`](Self::load) succeeds.
    pub fn file_paths(&self) -> &[PathBuf] {
        self.file_paths.as_deref().unwrap_or_default()
    }

    pub fn tunes(&self) -> &[Tune] {
        &self.tunes
    }

    pub fn mel_spectrograms(&self) -> &[MelSpectrogram] {
        &self.mel_spectrograms
    }

    pub fn len(&self) -> usize {
        self.file_paths().len()
    }

    pub fn is_empty(&self) -> bool {
        self.file_paths().is_empty()
    }

    /// Discover files matching the configured pattern (`*.wav` by default).
    pub fn load(&mut self, folder: impl AsRef<Path>) -> Result<&mut Self> {
        let pattern = self.dataset_config.file_pattern.clone();
        self.load_matching(folder, &pattern)
    }

    /// Discover the files directly inside `folder` whose name matches `pattern`.
    ///
    /// File contents are not read. A successful call replaces the file list
    /// and drops tunes and spectrograms from any earlier load.
    pub fn load_matching(&mut self, folder: impl AsRef<Path>, pattern: &str) -> Result<&mut Self> {
        let folder = folder.as_ref();
        if !folder.is_dir() {
            return Err(TuneError::FolderNotFound(folder.to_path_buf()));
        }

        let matcher = Pattern::new(pattern).map_err(|source| TuneError::InvalidPattern {
            pattern: pattern.to_string(),
            source,
        })?;
        let options = MatchOptions {
            case_sensitive: true,
            require_literal_separator: true,
            require_literal_leading_dot: true,
        };

        let mut file_paths = Vec::new();
        for entry in WalkDir::new(folder).min_depth(1).max_depth(1).follow_links(true) {
            let entry = entry.map_err(|e| {
                let path = e.path().unwrap_or(folder).to_path_buf();
                let source = e
                    .into_io_error()
                    .unwrap_or_else(|| std::io::Error::other("filesystem loop"));
                TuneError::io(path, source)
            })?;
            if !entry.file_type().is_file() {
                continue;
            }
            let matches = entry
                .file_name()
                .to_str()
                .is_some_and(|name| matcher.matches_with(name, options));
            if matches {
                file_paths.push(entry.into_path());
            }
        }

        tracing::info!(
            folder = %folder.display(),
            pattern,
            files = file_paths.len(),
            "discovered tunes"
        );
        if file_paths.is_empty() {
            tracing::warn!(folder = %folder.display(), pattern, "no files matched");
        }

        self.source_folder = Some(folder.to_path_buf());
        self.file_paths = Some(file_paths);
        self.tunes.clear();
        self.mel_spectrograms.clear();
        Ok(self)
    }

    /// Decode every discovered file into a [`Tune`], in discovery order.
    ///
    /// The first file that fails to decode aborts the stage.
    pub fn extract_tunes<P: ProgressObserver + ?Sized>(&mut self, progress: &mut P) -> Result<()> {
        let Some(file_paths) = self.file_paths.as_deref() else {
            return Err(TuneError::StageNotReady {
                stage: Stage::Extract,
                reason: "no folder has been loaded",
            });
        };

        let total = file_paths.len();
        let mut tunes = Vec::with_capacity(total);
        for (it, path) in file_paths.iter().enumerate() {
            let audio = decode_mono(path, self.dataset_config.target_sample_rate)?;
            let tune = Tune::new(audio.samples, audio.sample_rate, path.clone())
                .map_err(|e| TuneError::decode(path, e))?;
            tracing::debug!(path = %path.display(), "{tune}");
            tunes.push(tune);

            progress.on_progress(&StageProgress {
                stage: Stage::Extract,
                completed: it + 1,
                total,
            });
        }

        tracing::info!(tunes = tunes.len(), "extracted tunes");
        self.tunes = tunes;
        self.mel_spectrograms.clear();
        Ok(())
    }

    /// Loop-pad every tune shorter than `target_seconds`.
    pub fn pad_tunes(&mut self, target_seconds: f64) -> Result<()> {
        self.require_tunes(Stage::Normalize)?;
        let mut padded = 0;
        for tune in &mut self.tunes {
            let before = tune.len();
            tune.pad(target_seconds);
            if tune.len() != before {
                padded += 1;
            }
        }
        tracing::info!(target_seconds, padded, "padded tunes");
        Ok(())
    }

    /// Head-crop every tune longer than `target_seconds`.
    pub fn crop_tunes(&mut self, target_seconds: f64) -> Result<()> {
        self.require_tunes(Stage::Normalize)?;
        let mut cropped = 0;
        for tune in &mut self.tunes {
            let before = tune.len();
            tune.crop(target_seconds);
            if tune.len() != before {
                cropped += 1;
            }
        }
        tracing::info!(target_seconds, cropped, "cropped tunes");
        Ok(())
    }

    /// Compute one [`MelSpectrogram`] per tune, in order.
    pub fn extract_mel_spectrograms<P: ProgressObserver + ?Sized>(
        &mut self,
        progress: &mut P,
    ) -> Result<()> {
        self.require_tunes(Stage::FeatureExtract)?;

        let total = self.tunes.len();
        let mut mel_spectrograms = Vec::with_capacity(total);
        for (it, tune) in self.tunes.iter().enumerate() {
            let mel = MelSpectrogram::from_tune(tune, &self.mel_config)?;
            tracing::debug!(path = %tune.source_path().display(), "{mel}");
            mel_spectrograms.push(mel);

            progress.on_progress(&StageProgress {
                stage: Stage::FeatureExtract,
                completed: it + 1,
                total,
            });
        }

        tracing::info!(spectrograms = mel_spectrograms.len(), "extracted mel spectrograms");
        self.mel_spectrograms = mel_spectrograms;
        Ok(())
    }

    /// Discovered path whose file name (with extension) is `file_name`.
    pub fn file_path(&self, file_name: &str) -> Option<&Path> {
        self.file_paths()
            .iter()
            .find(|path| path.file_name().is_some_and(|name| name == file_name))
            .map(PathBuf::as_path)
    }

    /// Extracted tune whose source file name is `file_name`.
    pub fn tune(&self, file_name: &str) -> Option<&Tune> {
        self.tunes.iter().find(|tune| tune.file_name() == Some(file_name))
    }

    /// Export every tune into `destination`; returns the written paths in order.
    pub fn export_tunes(&self, destination: impl AsRef<Path>, format: ExportFormat) -> Result<Vec<PathBuf>> {
        self.require_tunes(Stage::Extract)?;
        let destination = destination.as_ref();
        self.tunes
            .iter()
            .map(|tune| tune.export(destination, format))
            .collect()
    }

    /// Export every spectrogram into `destination`; returns the written paths in order.
    pub fn export_mel_spectrograms(&self, destination: impl AsRef<Path>) -> Result<Vec<PathBuf>> {
        self.require_mel_spectrograms()?;
        let destination = destination.as_ref();
        self.mel_spectrograms
            .iter()
            .map(|mel| mel.export(destination))
            .collect()
    }

    /// Stack all spectrograms into a `(tunes, mel bins, frames)` batch.
    ///
    /// Every spectrogram must share one shape; pad the tunes to a common
    /// duration before feature extraction to get there.
    pub fn spectrogram_batch(&self) -> Result<Array3<f32>> {
        self.require_mel_spectrograms()?;

        let expected = self.mel_spectrograms[0].shape();
        if let Some(odd) = self.mel_spectrograms.iter().find(|m| m.shape() != expected) {
            return Err(TuneError::ShapeMismatch {
                expected,
                actual: odd.shape(),
            });
        }

        let (bins, frames) = expected;
        let mut batch = Array3::<f32>::zeros((self.mel_spectrograms.len(), bins, frames));
        for (i, mel) in self.mel_spectrograms.iter().enumerate() {
            batch.slice_mut(s![i, .., ..]).assign(mel.content());
        }
        Ok(batch)
    }

    fn require_tunes(&self, stage: Stage) -> Result<()> {
        if self.tunes.is_empty() {
            return Err(TuneError::StageNotReady {
                stage,
                reason: "no tunes have been extracted",
            });
        }
        Ok(())
    }

    fn require_mel_spectrograms(&self) -> Result<()> {
        if self.mel_spectrograms.is_empty() {
            return Err(TuneError::StageNotReady {
                stage: Stage::FeatureExtract,
                reason: "no mel spectrograms have been extracted",
            });
        }
        Ok(())
    }
}

impl fmt::Display for TuneDataset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.source_folder {
            Some(folder) => write!(f, "{} files loaded from {}.", self.len(), folder.display()),
            None => f.write_str("no folder loaded."),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::progress::Silent;
    use hound::{SampleFormat, WavSpec, WavWriter};

    fn write_tone(dir: &Path, name: &str, sample_rate: u32, len: usize) -> PathBuf {
        let path = dir.join(name);
        let spec = WavSpec {
            channels: 1,
            sample_rate,
            bits_per_sample: 16,
            sample_format: SampleFormat::Int,
        };
        let mut writer = WavWriter::create(&path, spec).unwrap();
        for i in 0..len {
            writer.write_sample(((i % 64) as i16 - 32) * 500).unwrap();
        }
        writer.finalize().unwrap();
        path
    }

    fn small_mel_config() -> PipelineConfig {
        PipelineConfig {
            mel: MelConfig {
                n_fft: 256,
                hop_length: 64,
                n_mels: 16,
                ..MelConfig::default()
            },
            ..PipelineConfig::default()
        }
    }

    #[test]
    fn load_missing_folder_keeps_previous_paths() {
        let dir = tempfile::tempdir().unwrap();
        write_tone(dir.path(), "a.wav", 8000, 800);

        let mut dataset = TuneDataset::new();
        dataset.load(dir.path()).unwrap();
        assert_eq!(dataset.len(), 1);

        let err = dataset.load(dir.path().join("gone")).unwrap_err();
        assert!(matches!(err, TuneError::FolderNotFound(_)));
        assert_eq!(dataset.file_paths(), &[dir.path().join("a.wav")]);
        assert_eq!(dataset.source_folder(), Some(dir.path()));
    }

    #[test]
    fn load_filters_by_pattern_and_skips_subfolders() {
        let dir = tempfile::tempdir().unwrap();
        write_tone(dir.path(), "a.wav", 8000, 800);
        write_tone(dir.path(), "b.wav", 8000, 800);
        std::fs::write(dir.path().join("notes.txt"), b"hi").unwrap();
        std::fs::create_dir(dir.path().join("nested.wav")).unwrap();
        std::fs::create_dir(dir.path().join("sub")).unwrap();
        write_tone(&dir.path().join("sub"), "c.wav", 8000, 800);

        let mut dataset = TuneDataset::new();
        dataset.load(dir.path()).unwrap();

        let mut names: Vec<_> = dataset
            .file_paths()
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        names.sort();
        assert_eq!(names, vec!["a.wav", "b.wav"]);

        dataset.load_matching(dir.path(), "*.txt").unwrap();
        assert_eq!(dataset.file_paths(), &[dir.path().join("notes.txt")]);
    }

    #[test]
    fn invalid_pattern_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let mut dataset = TuneDataset::new();
        let err = dataset.load_matching(dir.path(), "[*.wav").unwrap_err();
        assert!(matches!(err, TuneError::InvalidPattern { .. }));
    }

    #[test]
    fn extract_before_load_is_not_ready() {
        let mut dataset = TuneDataset::new();
        let err = dataset.extract_tunes(&mut Silent).unwrap_err();
        assert!(matches!(
            err,
            TuneError::StageNotReady {
                stage: Stage::Extract,
                ..
            }
        ));
    }

    #[test]
    fn later_stages_need_tunes() {
        let mut dataset = TuneDataset::new();
        assert!(matches!(
            dataset.extract_mel_spectrograms(&mut Silent),
            Err(TuneError::StageNotReady {
                stage: Stage::FeatureExtract,
                ..
            })
        ));
        assert!(matches!(
            dataset.pad_tunes(1.0),
            Err(TuneError::StageNotReady {
                stage: Stage::Normalize,
                ..
            })
        ));
        assert!(matches!(
            dataset.crop_tunes(1.0),
            Err(TuneError::StageNotReady { .. })
        ));
        assert!(matches!(
            dataset.spectrogram_batch(),
            Err(TuneError::StageNotReady { .. })
        ));
    }

    #[test]
    fn empty_folder_leaves_later_stages_not_ready() {
        let dir = tempfile::tempdir().unwrap();
        let mut dataset = TuneDataset::new();
        dataset.load(dir.path()).unwrap();
        dataset.extract_tunes(&mut Silent).unwrap();
        assert!(dataset.tunes().is_empty());
        assert!(dataset.pad_tunes(1.0).is_err());
    }

    #[test]
    fn extraction_reports_progress_per_file() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["a.wav", "b.wav", "c.wav"] {
            write_tone(dir.path(), name, 8000, 400);
        }
        let mut dataset = TuneDataset::with_config(&small_mel_config()).unwrap();
        dataset.load(dir.path()).unwrap();

        let mut events = Vec::new();
        dataset
            .extract_tunes(&mut |p: &StageProgress| events.push((p.stage, p.completed, p.total)))
            .unwrap();
        assert_eq!(
            events,
            vec![
                (Stage::Extract, 1, 3),
                (Stage::Extract, 2, 3),
                (Stage::Extract, 3, 3)
            ]
        );

        let mut percents = Vec::new();
        dataset
            .extract_mel_spectrograms(&mut |p: &StageProgress| percents.push(p.percent().round()))
            .unwrap();
        assert_eq!(percents, vec![33.0, 67.0, 100.0]);
    }

    #[test]
    fn failed_re_extract_keeps_previous_tunes() {
        let dir = tempfile::tempdir().unwrap();
        let good = write_tone(dir.path(), "good.wav", 8000, 800);

        let mut dataset = TuneDataset::new();
        dataset.load(dir.path()).unwrap();
        dataset.extract_tunes(&mut Silent).unwrap();
        let before = dataset.tunes().to_vec();
        assert_eq!(before.len(), 1);

        std::fs::write(&good, b"RIFF but not really").unwrap();
        let err = dataset.extract_tunes(&mut Silent).unwrap_err();
        assert!(matches!(err, TuneError::DecodeFailure { .. }), "{err}");
        assert_eq!(dataset.tunes(), before.as_slice());
    }

    #[test]
    fn failed_re_extract_keeps_mel_spectrograms() {
        let dir = tempfile::tempdir().unwrap();
        let good = write_tone(dir.path(), "good.wav", 8000, 800);

        let mut dataset = TuneDataset::with_config(&small_mel_config()).unwrap();
        dataset.load(dir.path()).unwrap();
        dataset.extract_tunes(&mut Silent).unwrap();
        dataset.extract_mel_spectrograms(&mut Silent).unwrap();
        let before = dataset.mel_spectrograms().to_vec();

        std::fs::write(&good, b"RIFF but not really").unwrap();
        assert!(dataset.extract_tunes(&mut Silent).is_err());
        assert_eq!(dataset.mel_spectrograms(), before.as_slice());
        assert_eq!(dataset.tunes().len(), 1);
    }

    #[test]
    fn lookup_by_file_name() {
        let dir = tempfile::tempdir().unwrap();
        write_tone(dir.path(), "snare.wav", 8000, 1600);
        write_tone(dir.path(), "kick.wav", 8000, 800);

        let mut dataset = TuneDataset::new();
        dataset.load(dir.path()).unwrap();
        assert_eq!(dataset.file_path("kick.wav"), Some(dir.path().join("kick.wav").as_path()));
        assert!(dataset.file_path("kick").is_none());

        dataset.extract_tunes(&mut Silent).unwrap();
        assert_eq!(dataset.tune("snare.wav").unwrap().len(), 1600);
        assert!(dataset.tune("hat.wav").is_none());
    }

    #[test]
    fn batch_requires_uniform_shapes() {
        let dir = tempfile::tempdir().unwrap();
        write_tone(dir.path(), "short.wav", 8000, 800);
        write_tone(dir.path(), "long.wav", 8000, 2400);

        let mut dataset = TuneDataset::with_config(&small_mel_config()).unwrap();
        dataset.load(dir.path()).unwrap();
        dataset.extract_tunes(&mut Silent).unwrap();
        dataset.extract_mel_spectrograms(&mut Silent).unwrap();
        assert!(matches!(
            dataset.spectrogram_batch(),
            Err(TuneError::ShapeMismatch { .. })
        ));

        dataset.pad_tunes(0.3).unwrap();
        dataset.extract_mel_spectrograms(&mut Silent).unwrap();
        let batch = dataset.spectrogram_batch().unwrap();
        assert_eq!(batch.dim(), (2, 16, 1 + 2400 / 64));
        assert_eq!(
            batch.slice(s![1, .., ..]),
            dataset.mel_spectrograms()[1].content().view()
        );
    }

    #[test]
    fn display_summarizes_folder() {
        let dir = tempfile::tempdir().unwrap();
        write_tone(dir.path(), "a.wav", 8000, 80);
        let mut dataset = TuneDataset::new();
        assert_eq!(dataset.to_string(), "no folder loaded.");
        dataset.load(dir.path()).unwrap();
        assert_eq!(
            dataset.to_string(),
            format!("1 files loaded from {}.", dir.path().display())
        );
    }
}

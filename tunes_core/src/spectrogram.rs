use image::{GrayImage, Luma};
use ndarray::Array2;
use std::fmt;
use std::path::{Path, PathBuf};

use crate::audio::mel::mel_spectrogram_db;
use crate::config::MelConfig;
use crate::export::{ensure_destination, output_path};
use crate::{Result, Tune};

/// Decibel-scaled Mel spectrogram of one tune.
///
/// Rows are Mel bins, columns are time frames. The content is computed once
/// from the tune's samples and owned outright, so later edits to the tune
/// do not reach it.
#[derive(Debug, Clone, PartialEq)]
pub struct MelSpectrogram {
    source_path: PathBuf,
    content: Array2<f32>,
    sample_rate: u32,
}

impl MelSpectrogram {
    pub fn from_tune(tune: &Tune, config: &MelConfig) -> Result<Self> {
        let content = mel_spectrogram_db(tune.samples(), tune.sample_rate(), config)?;
        Ok(Self {
            source_path: tune.source_path().to_path_buf(),
            content,
            sample_rate: tune.sample_rate(),
        })
    }

    pub fn source_path(&self) -> &Path {
        &self.source_path
    }

    pub fn content(&self) -> &Array2<f32> {
        &self.content
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// `(mel bins, time frames)`
    pub fn shape(&self) -> (usize, usize) {
        self.content.dim()
    }

    /// Write the content as `<stem>_mel.npy` into `destination`.
    pub fn export(&self, destination: impl AsRef<Path>) -> Result<PathBuf> {
        let destination = destination.as_ref();
        ensure_destination(destination)?;

        let path = output_path(destination, &self.source_path, "_mel", "npy");
        ndarray_npy::write_npy(&path, &self.content)?;
        tracing::debug!(path = %path.display(), "exported mel spectrogram");
        Ok(path)
    }

    /// Render a grayscale `<stem>_mel.png` into `destination`.
    ///
    /// Time runs left to right and low frequencies sit at the bottom; the
    /// loudest bin is white.
    pub fn visualize(&self, destination: impl AsRef<Path>) -> Result<PathBuf> {
        let destination = destination.as_ref();
        ensure_destination(destination)?;

        let (bins, frames) = self.shape();
        let min = self.content.iter().copied().fold(f32::INFINITY, f32::min);
        let max = self.content.iter().copied().fold(f32::NEG_INFINITY, f32::max);
        let range = if max > min { max - min } else { 1.0 };

        let image = GrayImage::from_fn(frames as u32, bins as u32, |x, y| {
            let bin = bins - 1 - y as usize;
            let value = (self.content[[bin, x as usize]] - min) / range;
            Luma([(value.clamp(0.0, 1.0) * 255.0).round() as u8])
        });

        let path = output_path(destination, &self.source_path, "_mel", "png");
        image.save(&path)?;
        tracing::debug!(path = %path.display(), "rendered mel spectrogram");
        Ok(path)
    }
}

impl fmt::Display for MelSpectrogram {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (bins, frames) = self.shape();
        write!(f, "Mel spectrogram with shape ({bins}, {frames})")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::TuneError;
    use std::f32::consts::PI;

    fn chirp_tune() -> Tune {
        let sample_rate = 16_000;
        let samples = (0..sample_rate)
            .map(|i| {
                let t = i as f32 / sample_rate as f32;
                (2.0 * PI * (200.0 + 1800.0 * t) * t).sin()
            })
            .collect();
        Tune::new(samples, sample_rate, "/data/chirp.wav").unwrap()
    }

    fn small_config() -> MelConfig {
        MelConfig {
            n_fft: 512,
            hop_length: 128,
            n_mels: 40,
            ..MelConfig::default()
        }
    }

    #[test]
    fn shape_matches_config() {
        let mel = MelSpectrogram::from_tune(&chirp_tune(), &small_config()).unwrap();
        assert_eq!(mel.shape(), (40, 1 + 16_000 / 128));
        assert_eq!(mel.sample_rate(), 16_000);
        assert_eq!(mel.source_path(), Path::new("/data/chirp.wav"));
    }

    #[test]
    fn minimum_is_zero_db() {
        let mel = MelSpectrogram::from_tune(&chirp_tune(), &small_config()).unwrap();
        let min = mel.content().iter().copied().fold(f32::INFINITY, f32::min);
        assert_eq!(min, 0.0);
    }

    #[test]
    fn later_tune_edits_do_not_leak() {
        let mut tune = chirp_tune();
        let mel = MelSpectrogram::from_tune(&tune, &small_config()).unwrap();
        let before = mel.clone();
        tune.crop(0.1);
        tune.pad(3.0);
        assert_eq!(mel, before);
    }

    #[test]
    fn exports_npy() {
        let dir = tempfile::tempdir().unwrap();
        let mel = MelSpectrogram::from_tune(&chirp_tune(), &small_config()).unwrap();
        let path = mel.export(dir.path()).unwrap();
        assert_eq!(path, dir.path().join("chirp_mel.npy"));

        let loaded: Array2<f32> = ndarray_npy::read_npy(&path).unwrap();
        assert_eq!(&loaded, mel.content());
    }

    #[test]
    fn visualize_writes_png_and_leaves_content() {
        let dir = tempfile::tempdir().unwrap();
        let mel = MelSpectrogram::from_tune(&chirp_tune(), &small_config()).unwrap();
        let before = mel.content().clone();

        let path = mel.visualize(dir.path()).unwrap();
        assert_eq!(path, dir.path().join("chirp_mel.png"));
        assert_eq!(mel.content(), &before);

        let rendered = image::open(&path).unwrap();
        assert_eq!(rendered.width() as usize, mel.shape().1);
        assert_eq!(rendered.height() as usize, mel.shape().0);
    }

    #[test]
    fn export_rejects_file_destination() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("taken");
        std::fs::write(&file, b"").unwrap();
        let mel = MelSpectrogram::from_tune(&chirp_tune(), &small_config()).unwrap();
        assert!(matches!(
            mel.export(&file),
            Err(TuneError::InvalidDestination(_))
        ));
        assert!(matches!(
            mel.visualize(&file),
            Err(TuneError::InvalidDestination(_))
        ));
    }

    #[test]
    fn display_shows_shape() {
        let mel = MelSpectrogram::from_tune(&chirp_tune(), &small_config()).unwrap();
        assert_eq!(mel.to_string(), "Mel spectrogram with shape (40, 126)");
    }
}

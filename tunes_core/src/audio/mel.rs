//! Short-time Fourier transform and Mel projection.
//!
//! Follows librosa's defaults: centered frames with zero padding, a periodic
//! Hann window, Slaney-normalized Mel filters applied to the magnitude
//! spectrum, and decibels referenced to the quietest bin.

use mel_spec::mel::mel;
use ndarray::Array2;
use realfft::RealFftPlanner;
use std::f32::consts::PI;

use crate::config::MelConfig;
use crate::{Result, TuneError};

/// Amplitude floor used before taking the logarithm.
pub const AMIN: f32 = 1e-5;

/// Periodic Hann window of length `size`.
pub fn hann_window(size: usize) -> Vec<f32> {
    (0..size)
        .map(|n| 0.5 - 0.5 * (2.0 * PI * n as f32 / size as f32).cos())
        .collect()
}

/// Magnitude of the centered STFT, shape `(n_fft / 2 + 1, frames)`.
pub fn stft_magnitude(signal: &[f32], n_fft: usize, hop_length: usize) -> Result<Array2<f32>> {
    if n_fft < 2 || hop_length == 0 {
        return Err(TuneError::Spectral(format!(
            "invalid frame sizes: n_fft={n_fft}, hop_length={hop_length}"
        )));
    }

    let window = hann_window(n_fft);

    let pad = n_fft / 2;
    let mut padded = vec![0.0f32; pad];
    padded.extend_from_slice(signal);
    padded.resize(padded.len() + pad, 0.0);
    if padded.len() < n_fft {
        padded.resize(n_fft, 0.0);
    }

    let num_frames = 1 + (padded.len() - n_fft) / hop_length;
    let n_freqs = n_fft / 2 + 1;

    let mut planner = RealFftPlanner::<f32>::new();
    let fft = planner.plan_fft_forward(n_fft);
    let mut frame = fft.make_input_vec();
    let mut spectrum = fft.make_output_vec();

    let mut magnitude = Array2::<f32>::zeros((n_freqs, num_frames));

    for t in 0..num_frames {
        let start = t * hop_length;
        for (i, slot) in frame.iter_mut().enumerate() {
            *slot = padded[start + i] * window[i];
        }

        fft.process(&mut frame, &mut spectrum)
            .map_err(|e| TuneError::Spectral(e.to_string()))?;

        for (k, bin) in spectrum.iter().enumerate() {
            magnitude[[k, t]] = bin.norm();
        }
    }

    Ok(magnitude)
}

/// Slaney Mel filter bank, shape `(n_mels, n_fft / 2 + 1)`.
pub fn mel_filter_bank(sample_rate: u32, config: &MelConfig) -> Array2<f32> {
    mel(
        sample_rate as f64,
        config.n_fft,
        config.n_mels,
        Some(config.fmin as f64),
        Some(config.fmax_for(sample_rate) as f64),
        false,
        true,
    )
    .mapv(|w| w as f32)
}

/// Convert amplitudes to decibels relative to the smallest amplitude.
///
/// The minimum bin maps to exactly 0 dB. With `top_db` the result is
/// floored at `max - top_db`.
pub fn amplitude_to_db(amplitudes: &Array2<f32>, top_db: Option<f32>) -> Array2<f32> {
    let to_db = |a: f32| 20.0 * a.abs().max(AMIN).log10();

    let reference = amplitudes
        .iter()
        .map(|a| a.abs())
        .fold(f32::INFINITY, f32::min);
    if !reference.is_finite() {
        return amplitudes.mapv(|_| 0.0);
    }
    let reference_db = to_db(reference);

    let mut db = amplitudes.mapv(|a| to_db(a) - reference_db);

    if let Some(top_db) = top_db {
        let peak = db.iter().copied().fold(f32::NEG_INFINITY, f32::max);
        let floor = peak - top_db;
        db.mapv_inplace(|v| v.max(floor));
    }

    db
}

/// Decibel-scaled Mel spectrogram of a mono clip, shape `(n_mels, frames)`.
pub fn mel_spectrogram_db(samples: &[f32], sample_rate: u32, config: &MelConfig) -> Result<Array2<f32>> {
    config.validate()?;
    if sample_rate == 0 {
        return Err(TuneError::Spectral("sample rate must be positive".into()));
    }

    let magnitude = stft_magnitude(samples, config.n_fft, config.hop_length)?;
    let filters = mel_filter_bank(sample_rate, config);
    let mel_scaled = filters.dot(&magnitude);

    Ok(amplitude_to_db(&mel_scaled, config.top_db))
}

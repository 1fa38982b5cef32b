use std::path::Path;

use symphonia::core::{
    audio::SampleBuffer,
    codecs::{DecoderOptions, CODEC_TYPE_NULL},
    errors::Error as SymphoniaError,
    formats::FormatOptions,
    io::MediaSourceStream,
    meta::MetadataOptions,
    probe::Hint,
};

use audioadapter_buffers::direct::InterleavedSlice;
use rubato::{Fft, FixedSync, Resampler};

use crate::{Result, TuneError};

/// Mono samples and the rate they are sampled at.
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedAudio {
    pub samples: Vec<f32>,
    pub sample_rate: u32,
}

/// Decode an audio file to mono f32 samples.
///
/// Channels are averaged. With `target_rate` set the clip is resampled,
/// otherwise the file's own rate is kept.
pub fn decode_mono<P: AsRef<Path>>(path: P, target_rate: Option<u32>) -> Result<DecodedAudio> {
    let path = path.as_ref();

    // -------------------------
    // 1) Decode with Symphonia
    // -------------------------
    let file = std::fs::File::open(path).map_err(|e| TuneError::io(path, e))?;

    let mss = MediaSourceStream::new(Box::new(file), Default::default());

    let mut hint = Hint::new();
    if let Some(ext) = path.extension().and_then(|e| e.to_str()) {
        hint.with_extension(ext);
    }

    let probed = symphonia::default::get_probe()
        .format(&hint, mss, &FormatOptions::default(), &MetadataOptions::default())
        .map_err(|e| TuneError::decode(path, format!("unsupported container: {e}")))?;

    let mut format = probed.format;

    let track = format
        .tracks()
        .iter()
        .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
        .ok_or_else(|| TuneError::decode(path, "no supported audio tracks found"))?;

    let track_id = track.id;

    let mut decoder = symphonia::default::get_codecs()
        .make(&track.codec_params, &DecoderOptions::default())
        .map_err(|e| TuneError::decode(path, format!("no decoder for track: {e}")))?;

    let mut interleaved: Vec<f32> = Vec::new();

    // Codec params usually carry the rate; the first decoded buffer is the fallback.
    let mut input_sample_rate: Option<u32> = track.codec_params.sample_rate;
    let mut input_channels: Option<usize> = None;

    loop {
        let packet = match format.next_packet() {
            Ok(p) => p,
            Err(SymphoniaError::ResetRequired) => {
                return Err(TuneError::decode(path, "chained streams are not supported"));
            }
            Err(SymphoniaError::IoError(_)) => break, // end of stream
            Err(e) => return Err(TuneError::decode(path, e)),
        };

        if packet.track_id() != track_id {
            continue;
        }

        let decoded = match decoder.decode(&packet) {
            Ok(d) => d,
            Err(SymphoniaError::IoError(_)) | Err(SymphoniaError::DecodeError(_)) => {
                tracing::warn!(path = %path.display(), "skipping undecodable packet");
                continue;
            }
            Err(SymphoniaError::ResetRequired) => {
                return Err(TuneError::decode(path, "decoder reset required mid-stream"));
            }
            Err(e) => return Err(TuneError::decode(path, e)),
        };

        input_sample_rate.get_or_insert(decoded.spec().rate);
        input_channels.get_or_insert(decoded.spec().channels.count());

        let mut sbuf = SampleBuffer::<f32>::new(decoded.capacity() as u64, *decoded.spec());
        sbuf.copy_interleaved_ref(decoded);

        interleaved.extend_from_slice(sbuf.samples());
    }

    let sr_in = input_sample_rate
        .filter(|&rate| rate > 0)
        .ok_or_else(|| TuneError::decode(path, "could not determine sample rate"))?;
    let ch_in = input_channels
        .filter(|&count| count > 0)
        .ok_or_else(|| TuneError::decode(path, "could not determine channel count"))?;

    if interleaved.is_empty() {
        return Err(TuneError::decode(path, "decoded audio was empty"));
    }

    // -------------------------
    // 2) Downmix to mono
    // -------------------------
    let mono = downmix(interleaved, ch_in);

    // -------------------------
    // 3) Resample (optional)
    // -------------------------
    let samples = match target_rate {
        Some(sr_out) if sr_out != sr_in => {
            tracing::debug!(path = %path.display(), sr_in, sr_out, "resampling");
            resample_mono(&mono, sr_in, sr_out)?
        }
        _ => mono,
    };

    if samples.is_empty() {
        return Err(TuneError::decode(path, "resampled audio was empty"));
    }

    Ok(DecodedAudio {
        samples,
        sample_rate: target_rate.unwrap_or(sr_in),
    })
}

/// Average interleaved frames down to one channel.
pub fn downmix(interleaved: Vec<f32>, channels: usize) -> Vec<f32> {
    if channels <= 1 {
        return interleaved;
    }
    interleaved
        .chunks_exact(channels)
        .map(|frame| frame.iter().sum::<f32>() / channels as f32)
        .collect()
}

/// Resample a whole mono clip with rubato's synchronous FFT resampler.
pub fn resample_mono(mono: &[f32], sr_in: u32, sr_out: u32) -> Result<Vec<f32>> {
    // 1024-frame chunks are plenty for offline clips.
    let chunk_size: usize = 1024;
    let sub_chunks: usize = 1;

    let mut resampler = Fft::<f32>::new(
        sr_in as usize,
        sr_out as usize,
        chunk_size,
        sub_chunks,
        1,
        FixedSync::Input,
    )
    .map_err(resample_err)?;

    let input_len_frames = mono.len();
    let out_len_frames = resampler.process_all_needed_output_len(input_len_frames);

    let mut out = vec![0.0f32; out_len_frames];

    let input_adapter =
        InterleavedSlice::new(mono, 1, input_len_frames).map_err(resample_err)?;
    let mut output_adapter =
        InterleavedSlice::new_mut(&mut out, 1, out_len_frames).map_err(resample_err)?;

    let (_frames_read, frames_written) = resampler
        .process_all_into_buffer(&input_adapter, &mut output_adapter, input_len_frames, None)
        .map_err(resample_err)?;

    out.truncate(frames_written);
    Ok(out)
}

fn resample_err(e: impl std::fmt::Display) -> TuneError {
    TuneError::Resample(e.to_string())
}

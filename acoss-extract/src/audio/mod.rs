//! Audio loading: decode, resample, slice

pub mod decoder;
pub mod resampler;

pub use decoder::{decode_audio_file, DecodedAudio};
pub use resampler::resample;

use acoss_common::{Error, Result};
use std::path::Path;

/// Decode a file to mono samples at `sample_rate`
///
/// `max_seconds` stops decoding early once enough audio is available.
pub fn load_audio(path: &Path, sample_rate: u32, max_seconds: Option<f64>) -> Result<Vec<f32>> {
    let decoded =
        decode_audio_file(path, max_seconds).map_err(|e| Error::Audio(format!("{:#}", e)))?;

    resample(decoded.samples, decoded.sample_rate, sample_rate)
        .map_err(|e| Error::Audio(format!("{}: {:#}", path.display(), e)))
}

/// Keep only the first `end_time` seconds
pub fn slice_audio(mut samples: Vec<f32>, sample_rate: u32, end_time: f64) -> Vec<f32> {
    let end = (end_time.max(0.0) * sample_rate as f64).round() as usize;
    samples.truncate(end);
    samples
}

//! Sample rate conversion
//!
//! High-quality sinc resampling via rubato `SincFixedIn`:
//! - 256-tap filter with BlackmanHarris2 window
//! - 0.95 cutoff frequency to prevent aliasing
//! - Whole signal processed as a single chunk, then flushed
//! - Filter delay trimmed so output sample `i` lines up with input time
//!   `i / target_rate`

use anyhow::{Context, Result};
use rubato::{
    Resampler, SincFixedIn, SincInterpolationParameters, SincInterpolationType, WindowFunction,
};
use tracing::debug;

/// Resample mono samples from `source_rate` to `target_rate`
///
/// Returns the input unchanged when the rates match or the input is empty.
pub fn resample(samples: Vec<f32>, source_rate: u32, target_rate: u32) -> Result<Vec<f32>> {
    if samples.is_empty() || source_rate == target_rate {
        return Ok(samples);
    }
    anyhow::ensure!(source_rate > 0 && target_rate > 0, "Sample rates must be positive");

    let num_frames = samples.len();
    let params = SincInterpolationParameters {
        sinc_len: 256,
        f_cutoff: 0.95,
        interpolation: SincInterpolationType::Linear,
        oversampling_factor: 256,
        window: WindowFunction::BlackmanHarris2,
    };

    let resample_ratio = target_rate as f64 / source_rate as f64;
    let mut resampler = SincFixedIn::<f32>::new(
        resample_ratio,
        1.0, // Fixed ratio
        params,
        num_frames,
        1,
    )
    .context("Failed to create rubato resampler")?;

    let expected_len = (num_frames as f64 * resample_ratio).round() as usize;
    let delay = resampler.output_delay();

    let input_channels = vec![samples];
    let mut resampled = resampler
        .process(&input_channels, None)
        .context("Rubato resampling failed")?
        .into_iter()
        .next()
        .unwrap_or_default();

    // Push the samples still held in the filter out with a zero-padded chunk
    let tail = resampler
        .process_partial(None::<&[Vec<f32>]>, None)
        .context("Rubato flush failed")?
        .into_iter()
        .next()
        .unwrap_or_default();
    resampled.extend(tail);

    resampled.drain(..delay.min(resampled.len()));
    resampled.truncate(expected_len);

    debug!(
        "Resampled {} frames ({} Hz) → {} frames ({} Hz)",
        num_frames,
        source_rate,
        resampled.len(),
        target_rate
    );

    Ok(resampled)
}

//! STFT chroma and chroma energy normalized statistics (CENS)

use crate::dsp::{
    bin_frequency, frequency_to_pitch_class, normalize_l1, normalize_l2, normalize_max, Stft,
    WindowKind,
};
use acoss_common::model::FeatureMatrix;
use acoss_common::Result;

/// Chroma parameters
#[derive(Debug, Clone)]
pub struct ChromaConfig {
    pub frame_size: usize,
    pub hop_size: usize,
    pub min_frequency: f32,
    pub max_frequency: f32,
    /// CENS smoothing window length in frames
    pub cens_window: usize,
    /// CENS temporal downsampling factor
    pub cens_downsample: usize,
}

impl Default for ChromaConfig {
    fn default() -> Self {
        Self {
            frame_size: 4096,
            hop_size: 2048,
            min_frequency: 27.5,
            max_frequency: 5000.0,
            cens_window: 41,
            cens_downsample: 10,
        }
    }
}

/// Power spectrum folded onto 12 pitch classes, frames normalised to max 1
pub fn chroma_stft(samples: &[f32], sample_rate: u32, config: &ChromaConfig) -> Result<FeatureMatrix> {
    let stft = Stft::new(config.frame_size, config.hop_size, WindowKind::Hann);

    // Precompute the pitch class of every bin in range
    let bin_classes: Vec<Option<usize>> = (0..stft.num_bins())
        .map(|bin| {
            let f = bin_frequency(bin, stft.fft_size(), sample_rate);
            if f < config.min_frequency || f > config.max_frequency {
                None
            } else {
                Some(frequency_to_pitch_class(f).round() as usize % 12)
            }
        })
        .collect();

    let spectra = stft.power(samples)?;
    Ok(spectra
        .iter()
        .map(|spectrum| {
            let mut chroma = vec![0.0f32; 12];
            for (power, class) in spectrum.iter().zip(&bin_classes) {
                if let Some(class) = class {
                    chroma[*class] += power;
                }
            }
            normalize_max(&mut chroma);
            chroma
        })
        .collect())
}

/// Quantisation step used by CENS
fn quantize(value: f32) -> f32 {
    match value {
        v if v > 0.4 => 4.0,
        v if v > 0.2 => 3.0,
        v if v > 0.1 => 2.0,
        v if v > 0.05 => 1.0,
        _ => 0.0,
    }
}

/// Convert chroma frames to CENS
pub fn chroma_cens_from_chroma(chroma: &FeatureMatrix, config: &ChromaConfig) -> FeatureMatrix {
    if chroma.is_empty() {
        return Vec::new();
    }

    let quantized: Vec<Vec<f32>> = chroma
        .iter()
        .map(|frame| {
            let mut frame = frame.clone();
            normalize_l1(&mut frame);
            frame.into_iter().map(quantize).collect()
        })
        .collect();

    // Hann smoothing along time, centred, zero beyond the edges
    let window_len = config.cens_window.max(1);
    let window: Vec<f32> = (0..window_len)
        .map(|i| {
            let phase = 2.0 * std::f32::consts::PI * (i + 1) as f32 / (window_len + 1) as f32;
            0.5 * (1.0 - phase.cos())
        })
        .collect();
    let half = window_len / 2;
    let n = quantized.len();

    let step = config.cens_downsample.max(1);
    (0..n)
        .step_by(step)
        .map(|t| {
            let mut frame = vec![0.0f32; 12];
            for (k, w) in window.iter().enumerate() {
                let idx = t as isize + k as isize - half as isize;
                if idx < 0 || idx as usize >= n {
                    continue;
                }
                for (acc, v) in frame.iter_mut().zip(&quantized[idx as usize]) {
                    *acc += w * v;
                }
            }
            normalize_l2(&mut frame);
            frame
        })
        .collect()
}

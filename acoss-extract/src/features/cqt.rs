//! Constant-Q chroma
//!
//! The constant-Q spectrum is approximated by mapping STFT magnitudes onto
//! log-spaced bins with triangular kernels, one kernel per CQ bin. Each CQ
//! bin is then folded to its nearest pitch class.

use crate::dsp::{bin_frequency, normalize_max, Stft, WindowKind};
use acoss_common::model::FeatureMatrix;
use acoss_common::Result;

/// Constant-Q chroma parameters
#[derive(Debug, Clone)]
pub struct CqtConfig {
    pub frame_size: usize,
    pub hop_size: usize,
    /// Centre of the lowest CQ bin (C1)
    pub min_frequency: f32,
    pub octaves: usize,
    /// Must be a multiple of 12
    pub bins_per_octave: usize,
    /// Log compression strength for the processed variant
    pub log_gain: f32,
    /// Temporal median filter length (frames) for the processed variant
    pub median_width: usize,
}

impl Default for CqtConfig {
    fn default() -> Self {
        Self {
            frame_size: 8192,
            hop_size: 2048,
            min_frequency: 32.703,
            octaves: 7,
            bins_per_octave: 36,
            log_gain: 100.0,
            median_width: 9,
        }
    }
}

/// Triangular weights of one CQ bin over a run of FFT bins
struct Kernel {
    first_bin: usize,
    weights: Vec<f32>,
    pitch_class: usize,
}

fn build_kernels(config: &CqtConfig, fft_size: usize, num_bins: usize, sample_rate: u32) -> Vec<Kernel> {
    let per_octave = config.bins_per_octave.max(12);
    let per_semitone = per_octave / 12;
    let nyquist = sample_rate as f32 / 2.0;
    let resolution = bin_frequency(1, fft_size, sample_rate);
    let q_step = 2f32.powf(1.0 / per_octave as f32) - 1.0;

    (0..config.octaves * per_octave)
        .map_while(|k| {
            let centre = config.min_frequency * 2f32.powf(k as f32 / per_octave as f32);
            (centre < nyquist).then_some((k, centre))
        })
        .filter_map(|(k, centre)| {
            let half_width = (centre * q_step).max(resolution);
            let low = ((centre - half_width) / resolution).ceil().max(0.0) as usize;
            let high = (((centre + half_width) / resolution).floor() as usize).min(num_bins - 1);
            if low > high {
                return None;
            }
            let mut weights: Vec<f32> = (low..=high)
                .map(|bin| {
                    let distance = (bin_frequency(bin, fft_size, sample_rate) - centre).abs();
                    (1.0 - distance / half_width).max(0.0)
                })
                .collect();
            let total: f32 = weights.iter().sum();
            if total <= 0.0 {
                return None;
            }
            weights.iter_mut().for_each(|w| *w /= total);
            Some(Kernel {
                first_bin: low,
                weights,
                pitch_class: ((k + per_semitone / 2) / per_semitone) % 12,
            })
        })
        .collect()
}

/// Constant-Q chroma, frames normalised to max 1
pub fn chroma_cqt(samples: &[f32], sample_rate: u32, config: &CqtConfig) -> Result<FeatureMatrix> {
    let stft = Stft::new(config.frame_size, config.hop_size, WindowKind::Hann);
    let kernels = build_kernels(config, stft.fft_size(), stft.num_bins(), sample_rate);

    let spectra = stft.magnitudes(samples)?;
    Ok(spectra
        .iter()
        .map(|spectrum| {
            let mut chroma = vec![0.0f32; 12];
            for kernel in &kernels {
                let energy: f32 = spectrum[kernel.first_bin..]
                    .iter()
                    .zip(&kernel.weights)
                    .map(|(m, w)| m * w)
                    .sum();
                chroma[kernel.pitch_class] += energy;
            }
            normalize_max(&mut chroma);
            chroma
        })
        .collect())
}

/// Log-compressed, median-smoothed constant-Q chroma
///
/// Short transients (shorter than half the median window) are removed from
/// each pitch class before the frames are renormalised.
pub fn chroma_cqt_processed(chroma: &FeatureMatrix, config: &CqtConfig) -> FeatureMatrix {
    let compressed: FeatureMatrix = chroma
        .iter()
        .map(|frame| frame.iter().map(|v| (1.0 + config.log_gain * v).ln()).collect())
        .collect();

    let n = compressed.len();
    let half = config.median_width.max(1) / 2;
    let mut window = Vec::with_capacity(2 * half + 1);
    (0..n)
        .map(|t| {
            let (start, end) = (t.saturating_sub(half), (t + half + 1).min(n));
            let mut frame: Vec<f32> = (0..12)
                .map(|class| {
                    window.clear();
                    window.extend(compressed[start..end].iter().map(|f| f[class]));
                    window.sort_by(|a, b| a.total_cmp(b));
                    window[window.len() / 2]
                })
                .collect();
            normalize_max(&mut frame);
            frame
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::test_signals::{sine, sum_signals};

    fn argmax(frame: &[f32]) -> usize {
        frame
            .iter()
            .enumerate()
            .max_by(|a, b| a.1.total_cmp(b.1))
            .map(|(i, _)| i)
            .unwrap()
    }

    #[test]
    fn test_chroma_cqt_g4() {
        let sample_rate = 22050;
        let chroma = chroma_cqt(&sine(392.0, 2.0, sample_rate), sample_rate, &CqtConfig::default())
            .unwrap();
        assert!(chroma.len() > 4);
        assert_eq!(chroma[3].len(), 12);
        assert_eq!(argmax(&chroma[3]), 7);
        assert_eq!(chroma[3][7], 1.0);
    }

    #[test]
    fn test_chroma_cqt_low_note() {
        // A2, well inside the lowest octaves
        let sample_rate = 22050;
        let chroma = chroma_cqt(&sine(110.0, 2.0, sample_rate), sample_rate, &CqtConfig::default())
            .unwrap();
        assert_eq!(argmax(&chroma[3]), 9);
    }

    #[test]
    fn test_kernels_stop_at_nyquist() {
        let config = CqtConfig::default();
        let stft = Stft::new(config.frame_size, config.hop_size, WindowKind::Hann);
        let full = build_kernels(&config, stft.fft_size(), stft.num_bins(), 22050);
        let low_rate = build_kernels(&config, stft.fft_size(), stft.num_bins(), 4000);
        assert_eq!(full.len(), config.octaves * config.bins_per_octave);
        assert!(low_rate.len() < full.len());
        for kernel in &full {
            let sum: f32 = kernel.weights.iter().sum();
            assert!((sum - 1.0).abs() < 1e-4);
        }
    }

    #[test]
    fn test_processed_removes_transients() {
        let mut chroma = vec![vec![0.1f32; 12]; 30];
        for frame in chroma.iter_mut() {
            frame[0] = 1.0;
        }
        // One-frame burst on D
        chroma[15][2] = 1.0;
        chroma[15][0] = 0.1;

        let processed = chroma_cqt_processed(&chroma, &CqtConfig::default());
        assert_eq!(processed.len(), chroma.len());
        assert_eq!(argmax(&processed[15]), 0);
        assert!(processed[15][2] < 1.0);
        assert!(processed.iter().all(|f| f.len() == 12 && f[0] == 1.0));
    }

    #[test]
    fn test_processed_chord_keeps_pitch_classes() {
        let sample_rate = 22050;
        // C major triad
        let signal = sum_signals(&[
            sine(261.63, 2.0, sample_rate),
            sine(329.63, 2.0, sample_rate),
            sine(392.0, 2.0, sample_rate),
        ]);
        let config = CqtConfig::default();
        let processed = chroma_cqt_processed(&chroma_cqt(&signal, sample_rate, &config).unwrap(), &config);
        let frame = &processed[processed.len() / 2];
        for class in [0, 4, 7] {
            assert!(frame[class] > 0.8, "class {} = {}", class, frame[class]);
        }
        assert!(frame[1] < frame[0]);
    }
}

//! Harmonic pitch class profile
//!
//! Spectral peaks are folded onto 12 pitch classes. Each peak is also treated
//! as a higher harmonic of lower fundamentals so that the profile reflects the
//! perceived pitch rather than the raw partials.

use crate::dsp::{bin_frequency, frequency_to_pitch_class, normalize_max, Stft, WindowKind};
use acoss_common::model::FeatureMatrix;
use acoss_common::Result;
use std::f32::consts::PI;

/// HPCP analysis parameters
#[derive(Debug, Clone)]
pub struct HpcpConfig {
    pub frame_size: usize,
    pub hop_size: usize,
    pub min_frequency: f32,
    pub max_frequency: f32,
    pub max_peaks: usize,
    pub harmonics: usize,
    pub harmonic_decay: f32,
    /// Width of the cos² weighting window in semitones
    pub window_semitones: f32,
}

impl Default for HpcpConfig {
    fn default() -> Self {
        Self {
            frame_size: 4096,
            hop_size: 2048,
            min_frequency: 40.0,
            max_frequency: 5000.0,
            max_peaks: 100,
            harmonics: 8,
            harmonic_decay: 0.6,
            window_semitones: 1.33,
        }
    }
}

/// A spectral peak with interpolated frequency and magnitude
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpectralPeak {
    pub frequency: f32,
    pub magnitude: f32,
}

pub struct HpcpExtractor {
    config: HpcpConfig,
    stft: Stft,
}

impl Default for HpcpExtractor {
    fn default() -> Self {
        Self::new(HpcpConfig::default())
    }
}

impl HpcpExtractor {
    pub fn new(config: HpcpConfig) -> Self {
        let stft = Stft::new(config.frame_size, config.hop_size, WindowKind::Hann);
        Self { config, stft }
    }

    /// HPCP frames (frames x 12), each normalised to a maximum of 1
    pub fn extract(&self, samples: &[f32], sample_rate: u32) -> Result<FeatureMatrix> {
        let spectra = self.stft.magnitudes(samples)?;
        Ok(spectra
            .iter()
            .map(|spectrum| {
                let peaks = self.spectral_peaks(spectrum, sample_rate);
                self.profile_from_peaks(&peaks)
            })
            .collect())
    }

    /// Local maxima within the analysis band, strongest first
    pub fn spectral_peaks(&self, spectrum: &[f32], sample_rate: u32) -> Vec<SpectralPeak> {
        let fft_size = self.stft.fft_size();
        let mut peaks = Vec::new();

        for k in 1..spectrum.len().saturating_sub(1) {
            let (a, b, c) = (spectrum[k - 1], spectrum[k], spectrum[k + 1]);
            if b <= f32::EPSILON || b <= a || b < c {
                continue;
            }

            // Parabolic interpolation of the true peak position
            let denom = a - 2.0 * b + c;
            let offset = if denom.abs() > f32::EPSILON {
                (0.5 * (a - c) / denom).clamp(-0.5, 0.5)
            } else {
                0.0
            };
            let frequency = bin_frequency(k, fft_size, sample_rate)
                + offset * sample_rate as f32 / fft_size as f32;
            if frequency < self.config.min_frequency || frequency > self.config.max_frequency {
                continue;
            }
            let magnitude = b - 0.25 * (a - c) * offset;
            peaks.push(SpectralPeak {
                frequency,
                magnitude,
            });
        }

        peaks.sort_by(|x, y| y.magnitude.total_cmp(&x.magnitude));
        peaks.truncate(self.config.max_peaks);
        peaks
    }

    /// Fold peaks onto 12 pitch classes
    pub fn profile_from_peaks(&self, peaks: &[SpectralPeak]) -> Vec<f32> {
        let mut profile = vec![0.0f32; 12];
        let half_window = self.config.window_semitones / 2.0;

        for peak in peaks {
            let energy = peak.magnitude * peak.magnitude;
            let mut harmonic_weight = 1.0f32;

            for h in 1..=self.config.harmonics {
                let fundamental = peak.frequency / h as f32;
                if fundamental < self.config.min_frequency / 2.0 {
                    break;
                }
                let position = frequency_to_pitch_class(fundamental);

                for (bin, value) in profile.iter_mut().enumerate() {
                    let mut distance = (position - bin as f32).abs();
                    distance = distance.min(12.0 - distance);
                    if distance <= half_window {
                        let w = (PI * distance / self.config.window_semitones).cos();
                        *value += energy * harmonic_weight * w * w;
                    }
                }

                harmonic_weight *= self.config.harmonic_decay;
            }
        }

        normalize_max(&mut profile);
        profile
    }
}

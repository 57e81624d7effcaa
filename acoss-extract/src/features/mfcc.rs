//! HTK-style mel frequency cepstral coefficients

use crate::dsp::mel::{dct2_ortho, MelFilterBank};
use crate::dsp::{Stft, WindowKind};
use acoss_common::model::FeatureMatrix;
use acoss_common::Result;
use std::f32::consts::PI;

/// MFCC parameters (HTK defaults)
#[derive(Debug, Clone)]
pub struct MfccConfig {
    pub frame_seconds: f32,
    pub hop_seconds: f32,
    pub pre_emphasis: f32,
    pub num_bands: usize,
    pub num_coefficients: usize,
    pub low_frequency: f32,
    pub high_frequency: f32,
    pub lifter: usize,
}

impl Default for MfccConfig {
    fn default() -> Self {
        Self {
            frame_seconds: 0.025,
            hop_seconds: 0.010,
            pre_emphasis: 0.97,
            num_bands: 40,
            num_coefficients: 13,
            low_frequency: 0.0,
            high_frequency: 11000.0,
            lifter: 22,
        }
    }
}

/// Compute MFCC frames (frames x `num_coefficients`)
pub fn mfcc_htk(samples: &[f32], sample_rate: u32, config: &MfccConfig) -> Result<FeatureMatrix> {
    let frame_size = ((config.frame_seconds * sample_rate as f32).round() as usize).max(2);
    let hop_size = ((config.hop_seconds * sample_rate as f32).round() as usize).max(1);
    let fft_size = frame_size.next_power_of_two();

    let mut emphasized = Vec::with_capacity(samples.len());
    let mut previous = 0.0f32;
    for &s in samples {
        emphasized.push(s - config.pre_emphasis * previous);
        previous = s;
    }

    let stft = Stft::with_fft_size(frame_size, hop_size, fft_size, WindowKind::Hamming);
    let filter_bank = MelFilterBank::new(
        config.num_bands,
        fft_size,
        sample_rate,
        config.low_frequency,
        config.high_frequency,
    );

    let lifter: Vec<f32> = (0..config.num_coefficients)
        .map(|n| {
            if config.lifter == 0 {
                1.0
            } else {
                let l = config.lifter as f32;
                1.0 + (l / 2.0) * (PI * n as f32 / l).sin()
            }
        })
        .collect();

    let spectra = stft.magnitudes(&emphasized)?;
    Ok(spectra
        .iter()
        .map(|spectrum| {
            let log_energies: Vec<f32> = filter_bank
                .apply(spectrum)
                .into_iter()
                .map(|e| e.max(1e-10).ln())
                .collect();
            dct2_ortho(&log_energies, config.num_coefficients)
                .into_iter()
                .zip(&lifter)
                .map(|(c, l)| c * l)
                .collect()
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::test_signals::sine;

    #[test]
    fn test_shape() {
        let sample_rate = 44100;
        let samples = sine(440.0, 1.0, sample_rate);
        let mfcc = mfcc_htk(&samples, sample_rate, &MfccConfig::default()).unwrap();

        assert!(mfcc.iter().all(|frame| frame.len() == 13));
        assert!(
            (95..=101).contains(&mfcc.len()),
            "expected ~100 frames per second, got {}",
            mfcc.len()
        );
    }

    #[test]
    fn test_values_finite_on_silence() {
        let mfcc = mfcc_htk(&vec![0.0; 16000], 16000, &MfccConfig::default()).unwrap();
        assert!(mfcc.iter().flatten().all(|v| v.is_finite()));
    }

    #[test]
    fn test_louder_signal_raises_c0() {
        let sample_rate = 16000;
        let quiet: Vec<f32> = sine(1000.0, 0.5, sample_rate).iter().map(|s| s * 0.1).collect();
        let loud = sine(1000.0, 0.5, sample_rate);
        let config = MfccConfig::default();

        let c0_quiet = mfcc_htk(&quiet, sample_rate, &config).unwrap()[10][0];
        let c0_loud = mfcc_htk(&loud, sample_rate, &config).unwrap()[10][0];
        assert!(c0_loud > c0_quiet);
    }
}

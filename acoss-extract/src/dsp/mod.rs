//! Signal processing building blocks shared by the feature extractors

pub mod mel;
pub mod stft;

pub use stft::{Stft, WindowKind};

/// Reference tuning frequency (A4)
pub const REFERENCE_FREQUENCY: f32 = 440.0;

/// Pitch class names, C-based
pub const PITCH_CLASSES: [&str; 12] = [
    "C", "C#", "D", "D#", "E", "F", "F#", "G", "G#", "A", "A#", "B",
];

/// Continuous pitch class position in [0, 12) with C = 0
pub fn frequency_to_pitch_class(frequency: f32) -> f32 {
    // A is 9 semitones above C
    let semitones = 12.0 * (frequency / REFERENCE_FREQUENCY).log2() + 9.0;
    semitones.rem_euclid(12.0)
}

/// Centre frequency of an FFT bin
#[inline]
pub fn bin_frequency(bin: usize, fft_size: usize, sample_rate: u32) -> f32 {
    bin as f32 * sample_rate as f32 / fft_size as f32
}

/// Scale a vector so its maximum is 1 (all-zero input stays zero)
pub fn normalize_max(values: &mut [f32]) {
    let max = values.iter().copied().fold(0.0f32, f32::max);
    if max > f32::EPSILON {
        values.iter_mut().for_each(|v| *v /= max);
    }
}

/// Scale a vector to unit L1 norm (all-zero input stays zero)
pub fn normalize_l1(values: &mut [f32]) {
    let sum: f32 = values.iter().map(|v| v.abs()).sum();
    if sum > f32::EPSILON {
        values.iter_mut().for_each(|v| *v /= sum);
    }
}

/// Scale a vector to unit L2 norm (all-zero input stays zero)
pub fn normalize_l2(values: &mut [f32]) {
    let norm = values.iter().map(|v| v * v).sum::<f32>().sqrt();
    if norm > f32::EPSILON {
        values.iter_mut().for_each(|v| *v /= norm);
    }
}

/// Column-wise mean of a frames x bins matrix
pub fn mean_frame(frames: &[Vec<f32>], width: usize) -> Vec<f32> {
    let mut mean = vec![0.0f32; width];
    if frames.is_empty() {
        return mean;
    }
    for frame in frames {
        for (m, v) in mean.iter_mut().zip(frame) {
            *m += v;
        }
    }
    let n = frames.len() as f32;
    mean.iter_mut().for_each(|m| *m /= n);
    mean
}

//! HTK mel scale filter bank and DCT-II

use std::f32::consts::PI;

pub fn hz_to_mel(hz: f32) -> f32 {
    2595.0 * (1.0 + hz / 700.0).log10()
}

pub fn mel_to_hz(mel: f32) -> f32 {
    700.0 * (10f32.powf(mel / 2595.0) - 1.0)
}

/// Triangular filters equally spaced on the HTK mel scale
pub struct MelFilterBank {
    /// One row of bin weights per band
    filters: Vec<Vec<f32>>,
}

impl MelFilterBank {
    pub fn new(
        num_bands: usize,
        fft_size: usize,
        sample_rate: u32,
        low_hz: f32,
        high_hz: f32,
    ) -> Self {
        let num_bins = fft_size / 2 + 1;
        let nyquist = sample_rate as f32 / 2.0;
        let high_hz = high_hz.min(nyquist);
        let low_mel = hz_to_mel(low_hz.max(0.0));
        let high_mel = hz_to_mel(high_hz);

        // Band edges: num_bands + 2 points
        let edges: Vec<f32> = (0..num_bands + 2)
            .map(|i| mel_to_hz(low_mel + (high_mel - low_mel) * i as f32 / (num_bands + 1) as f32))
            .collect();

        let filters = (0..num_bands)
            .map(|band| {
                let (left, center, right) = (edges[band], edges[band + 1], edges[band + 2]);
                (0..num_bins)
                    .map(|bin| {
                        let f = bin as f32 * sample_rate as f32 / fft_size as f32;
                        if f <= left || f >= right {
                            0.0
                        } else if f <= center {
                            (f - left) / (center - left)
                        } else {
                            (right - f) / (right - center)
                        }
                    })
                    .collect()
            })
            .collect();

        Self { filters }
    }

    pub fn num_bands(&self) -> usize {
        self.filters.len()
    }

    /// Band energies for one magnitude spectrum
    pub fn apply(&self, spectrum: &[f32]) -> Vec<f32> {
        self.filters
            .iter()
            .map(|weights| weights.iter().zip(spectrum).map(|(w, s)| w * s).sum())
            .collect()
    }
}

/// Orthonormal DCT-II, keeping the first `num_coefficients` outputs
pub fn dct2_ortho(input: &[f32], num_coefficients: usize) -> Vec<f32> {
    let n = input.len();
    if n == 0 {
        return vec![0.0; num_coefficients];
    }
    let n_f = n as f32;
    (0..num_coefficients)
        .map(|k| {
            let sum: f32 = input
                .iter()
                .enumerate()
                .map(|(i, &x)| x * (PI * k as f32 * (2 * i + 1) as f32 / (2.0 * n_f)).cos())
                .sum();
            let scale = if k == 0 {
                (1.0 / n_f).sqrt()
            } else {
                (2.0 / n_f).sqrt()
            };
            sum * scale
        })
        .collect()
}

//! Short-time Fourier transform over realfft

use acoss_common::{Error, Result};
use realfft::{RealFftPlanner, RealToComplex};
use std::f32::consts::PI;
use std::sync::Arc;

/// Analysis window shape
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WindowKind {
    Hann,
    Hamming,
}

impl WindowKind {
    pub fn coefficients(&self, length: usize) -> Vec<f32> {
        if length <= 1 {
            return vec![1.0; length];
        }
        let denom = length as f32;
        (0..length)
            .map(|i| {
                let phase = 2.0 * PI * i as f32 / denom;
                match self {
                    WindowKind::Hann => 0.5 * (1.0 - phase.cos()),
                    WindowKind::Hamming => 0.54 - 0.46 * phase.cos(),
                }
            })
            .collect()
    }
}

/// Framed magnitude spectrum analyser
///
/// Frames start at sample 0 and advance by `hop_size`; the last partial frame
/// is zero padded. Each frame of `frame_size` samples is windowed and zero
/// padded to `fft_size` before the transform.
pub struct Stft {
    frame_size: usize,
    hop_size: usize,
    fft_size: usize,
    window: Vec<f32>,
    fft: Arc<dyn RealToComplex<f32>>,
}

impl Stft {
    pub fn new(frame_size: usize, hop_size: usize, window: WindowKind) -> Self {
        Self::with_fft_size(frame_size, hop_size, frame_size, window)
    }

    pub fn with_fft_size(
        frame_size: usize,
        hop_size: usize,
        fft_size: usize,
        window: WindowKind,
    ) -> Self {
        let frame_size = frame_size.max(1);
        let fft_size = fft_size.max(frame_size);
        let mut planner = RealFftPlanner::<f32>::new();
        Self {
            frame_size,
            hop_size: hop_size.max(1),
            fft_size,
            window: window.coefficients(frame_size),
            fft: planner.plan_fft_forward(fft_size),
        }
    }

    pub fn frame_size(&self) -> usize {
        self.frame_size
    }

    pub fn hop_size(&self) -> usize {
        self.hop_size
    }

    pub fn fft_size(&self) -> usize {
        self.fft_size
    }

    /// Number of spectrum bins per frame
    pub fn num_bins(&self) -> usize {
        self.fft_size / 2 + 1
    }

    /// Number of frames produced for a signal of `length` samples (at least one)
    pub fn num_frames(&self, length: usize) -> usize {
        if length <= self.frame_size {
            1
        } else {
            1 + (length - self.frame_size).div_ceil(self.hop_size)
        }
    }

    /// Magnitude spectra, one row per frame
    pub fn magnitudes(&self, samples: &[f32]) -> Result<Vec<Vec<f32>>> {
        let frames = self.num_frames(samples.len());
        let mut input = self.fft.make_input_vec();
        let mut output = self.fft.make_output_vec();
        let mut scratch = self.fft.make_scratch_vec();
        let mut spectra = Vec::with_capacity(frames);

        for frame in 0..frames {
            let start = frame * self.hop_size;
            input.iter_mut().for_each(|v| *v = 0.0);
            let end = (start + self.frame_size).min(samples.len());
            if start < end {
                for (i, (&s, &w)) in samples[start..end].iter().zip(&self.window).enumerate() {
                    input[i] = s * w;
                }
            }

            self.fft
                .process_with_scratch(&mut input, &mut output, &mut scratch)
                .map_err(|e| Error::Internal(format!("FFT failed: {}", e)))?;

            spectra.push(output.iter().map(|c| c.norm()).collect());
        }

        Ok(spectra)
    }

    /// Power spectra (squared magnitudes), one row per frame
    pub fn power(&self, samples: &[f32]) -> Result<Vec<Vec<f32>>> {
        let mut spectra = self.magnitudes(samples)?;
        for frame in &mut spectra {
            frame.iter_mut().for_each(|m| *m *= *m);
        }
        Ok(spectra)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_count() {
        let stft = Stft::new(1024, 512, WindowKind::Hann);
        assert_eq!(stft.num_frames(0), 1);
        assert_eq!(stft.num_frames(1024), 1);
        assert_eq!(stft.num_frames(1025), 2);
        assert_eq!(stft.num_frames(2048), 3);
    }

    #[test]
    fn test_sine_peak_bin() {
        let sample_rate = 8000;
        let fft_size = 1024;
        // Exactly bin 64
        let frequency = 64.0 * sample_rate as f32 / fft_size as f32;
        let samples: Vec<f32> = (0..4096)
            .map(|i| (2.0 * PI * frequency * i as f32 / sample_rate as f32).sin())
            .collect();

        let stft = Stft::new(fft_size, 512, WindowKind::Hann);
        let spectra = stft.magnitudes(&samples).unwrap();
        assert_eq!(spectra[0].len(), stft.num_bins());

        let peak = spectra[2]
            .iter()
            .enumerate()
            .max_by(|a, b| a.1.total_cmp(b.1))
            .map(|(i, _)| i)
            .unwrap();
        assert_eq!(peak, 64);
    }

    #[test]
    fn test_zero_padding_to_fft_size() {
        let stft = Stft::with_fft_size(100, 50, 128, WindowKind::Hamming);
        let spectra = stft.magnitudes(&vec![0.1; 300]).unwrap();
        assert_eq!(spectra[0].len(), 65);
        assert_eq!(spectra.len(), stft.num_frames(300));
    }

    #[test]
    fn test_window_shapes() {
        let hann = WindowKind::Hann.coefficients(8);
        assert_eq!(hann[0], 0.0);
        let hamming = WindowKind::Hamming.coefficients(8);
        assert!((hamming[0] - 0.08).abs() < 1e-6);
    }
}

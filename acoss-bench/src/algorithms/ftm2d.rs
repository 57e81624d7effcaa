//! 2D Fourier transform magnitude (FTM2D) cover similarity
//!
//! **Algorithm:**
//! 1. Chroma downsampled by block averaging, frames max-normalised, then
//!    power-compressed to raise contrast
//! 2. Cut into fixed-length patches of frames
//! 3. Magnitude of the 2D DFT of each patch (time x pitch); the magnitude
//!    discards phase along pitch, so it ignores key transpositions
//! 4. Element-wise median over all patches gives one vector per track
//! 5. Distance: Euclidean between the median vectors

use super::{downsample_frames, normalize_max, track_chroma, CoverSimilarity, TrackRepr};
use acoss_common::model::FeatureMatrix;
use acoss_common::{Error, FeatureKind, FeatureSet, Result};
use realfft::num_complex::Complex;
use realfft::{RealFftPlanner, RealToComplex};
use std::f32::consts::PI;
use std::sync::Arc;

/// FTM2D parameters
#[derive(Debug, Clone)]
pub struct Ftm2dConfig {
    /// Frames averaged into one before patching
    pub downsample: usize,
    /// Exponent applied to normalised chroma values
    pub power: f32,
    /// Frames per patch
    pub patch_len: usize,
    /// Frames between patch starts
    pub patch_hop: usize,
    /// Below this many patches at `patch_hop`, patches advance by one frame
    pub min_patches: usize,
}

impl Default for Ftm2dConfig {
    fn default() -> Self {
        Self {
            downsample: 2,
            power: 1.96,
            patch_len: 75,
            patch_hop: 10,
            min_patches: 10,
        }
    }
}

pub struct Ftm2d {
    feature: FeatureKind,
    config: Ftm2dConfig,
    fft: Arc<dyn RealToComplex<f32>>,
    /// exp(-2πi n / 12) for n in 0..12
    pitch_twiddles: Vec<Complex<f32>>,
}

impl Ftm2d {
    pub fn new(feature: FeatureKind, config: Ftm2dConfig) -> Self {
        let config = Ftm2dConfig {
            patch_len: config.patch_len.max(2),
            patch_hop: config.patch_hop.max(1),
            ..config
        };
        let mut planner = RealFftPlanner::<f32>::new();
        let fft = planner.plan_fft_forward(config.patch_len);
        let pitch_twiddles = (0..12)
            .map(|n| Complex::from_polar(1.0, -2.0 * PI * n as f32 / 12.0))
            .collect();
        Self {
            feature,
            config,
            fft,
            pitch_twiddles,
        }
    }

    /// Chroma after downsampling, normalisation, compression and padding
    fn prepare(&self, chroma: &FeatureMatrix) -> FeatureMatrix {
        let mut frames = downsample_frames(chroma, self.config.downsample);
        for frame in frames.iter_mut() {
            normalize_max(frame);
            frame.iter_mut().for_each(|v| *v = v.powf(self.config.power));
        }
        if frames.len() < self.config.patch_len {
            frames.resize(self.config.patch_len, vec![0.0; 12]);
        }
        frames
    }

    fn patch_starts(&self, num_frames: usize) -> Vec<usize> {
        let last = num_frames - self.config.patch_len;
        let hop = if last / self.config.patch_hop + 1 < self.config.min_patches {
            1
        } else {
            self.config.patch_hop
        };
        (0..=last).step_by(hop).collect()
    }

    /// 2D DFT magnitude of one patch, flattened time-bin major
    fn patch_magnitude(&self, patch: &[Vec<f32>]) -> Result<Vec<f32>> {
        let bins = self.config.patch_len / 2 + 1;
        let mut input = self.fft.make_input_vec();
        let mut output = self.fft.make_output_vec();
        let mut scratch = self.fft.make_scratch_vec();

        // Transform along time for each pitch class
        let mut columns: Vec<Vec<Complex<f32>>> = Vec::with_capacity(12);
        for pitch in 0..12 {
            for (slot, frame) in input.iter_mut().zip(patch) {
                *slot = frame[pitch];
            }
            self.fft
                .process_with_scratch(&mut input, &mut output, &mut scratch)
                .map_err(|e| Error::Internal(format!("FFT failed: {}", e)))?;
            columns.push(output.clone());
        }

        // Then along pitch for each time bin
        let mut magnitudes = Vec::with_capacity(bins * 12);
        for bin in 0..bins {
            for q in 0..12 {
                let sum: Complex<f32> = (0..12)
                    .map(|p| columns[p][bin] * self.pitch_twiddles[(p * q) % 12])
                    .sum();
                magnitudes.push(sum.norm());
            }
        }
        Ok(magnitudes)
    }
}

/// Element-wise median of equal-length vectors
fn median_vector(vectors: &[Vec<f32>]) -> Vec<f32> {
    let Some(first) = vectors.first() else {
        return Vec::new();
    };
    let mut column = Vec::with_capacity(vectors.len());
    (0..first.len())
        .map(|i| {
            column.clear();
            column.extend(vectors.iter().map(|v| v[i]));
            column.sort_by(|a, b| a.total_cmp(b));
            let mid = column.len() / 2;
            if column.len() % 2 == 0 {
                0.5 * (column[mid - 1] + column[mid])
            } else {
                column[mid]
            }
        })
        .collect()
}

impl CoverSimilarity for Ftm2d {
    fn name(&self) -> &'static str {
        "ftm2d"
    }

    fn preprocess(&self, track: &FeatureSet) -> Result<TrackRepr> {
        let frames = self.prepare(track_chroma(track, self.feature)?);
        let patches = self
            .patch_starts(frames.len())
            .into_iter()
            .map(|start| self.patch_magnitude(&frames[start..start + self.config.patch_len]))
            .collect::<Result<Vec<_>>>()?;

        Ok(TrackRepr {
            frames: vec![median_vector(&patches)],
            summary: Vec::new(),
        })
    }

    fn distance(&self, query: &TrackRepr, candidate: &TrackRepr) -> f64 {
        let (Some(a), Some(b)) = (query.frames.first(), candidate.frames.first()) else {
            return f64::INFINITY;
        };
        a.iter()
            .zip(b)
            .map(|(x, y)| {
                let d = (*x - *y) as f64;
                d * d
            })
            .sum::<f64>()
            .sqrt()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Deterministic pseudo-random chroma
    fn chroma(frames: usize, seed: u32) -> FeatureMatrix {
        let mut state = seed.wrapping_mul(2654435761).wrapping_add(1);
        (0..frames)
            .map(|_| {
                (0..12)
                    .map(|_| {
                        state = state.wrapping_mul(1664525).wrapping_add(1013904223);
                        (state >> 8) as f32 / (1u32 << 24) as f32
                    })
                    .collect()
            })
            .collect()
    }

    fn track(label: &str, hpcp: FeatureMatrix) -> FeatureSet {
        let mut set = FeatureSet::new("t", label, 44100);
        set.hpcp = Some(hpcp);
        set
    }

    fn rotate(frames: &FeatureMatrix, shift: usize) -> FeatureMatrix {
        frames
            .iter()
            .map(|f| (0..12).map(|i| f[(i + 12 - shift) % 12]).collect())
            .collect()
    }

    #[test]
    fn test_representation_size() {
        let algo = Ftm2d::new(FeatureKind::Hpcp, Ftm2dConfig::default());
        let repr = algo.preprocess(&track("W_1", chroma(400, 1))).unwrap();
        assert_eq!(repr.frames.len(), 1);
        assert_eq!(repr.frames[0].len(), (75 / 2 + 1) * 12);
    }

    #[test]
    fn test_invariant_to_chroma_rotation() {
        let algo = Ftm2d::new(FeatureKind::Hpcp, Ftm2dConfig::default());
        let original = chroma(300, 7);
        let a = algo.preprocess(&track("W_1", original.clone())).unwrap();
        let b = algo.preprocess(&track("W_1", rotate(&original, 5))).unwrap();
        let c = algo.preprocess(&track("W_2", chroma(300, 99))).unwrap();

        let same = algo.distance(&a, &b);
        let other = algo.distance(&a, &c);
        assert!(same < 1e-2, "rotated copy distance {}", same);
        assert!(other > same * 10.0 + 1e-3, "unrelated distance {}", other);
    }

    #[test]
    fn test_symmetric_and_zero_on_self() {
        let algo = Ftm2d::new(FeatureKind::Hpcp, Ftm2dConfig::default());
        let a = algo.preprocess(&track("W_1", chroma(200, 3))).unwrap();
        let b = algo.preprocess(&track("W_2", chroma(260, 4))).unwrap();
        assert_eq!(algo.distance(&a, &a), 0.0);
        assert_eq!(algo.distance(&a, &b), algo.distance(&b, &a));
    }

    #[test]
    fn test_short_track_padded() {
        let algo = Ftm2d::new(FeatureKind::Hpcp, Ftm2dConfig::default());
        let repr = algo.preprocess(&track("W_1", chroma(10, 5))).unwrap();
        assert_eq!(repr.frames[0].len(), (75 / 2 + 1) * 12);
        assert!(repr.frames[0].iter().all(|v| v.is_finite()));
    }

    #[test]
    fn test_patch_hop_for_few_frames() {
        let algo = Ftm2d::new(FeatureKind::Hpcp, Ftm2dConfig::default());
        assert_eq!(algo.patch_starts(80).len(), 6);
        assert_eq!(algo.patch_starts(75 + 200).len(), 21);
    }

    #[test]
    fn test_median_vector() {
        let m = median_vector(&[vec![1.0, 5.0], vec![3.0, 1.0], vec![2.0, 2.0]]);
        assert_eq!(m, vec![2.0, 2.0]);
        let m = median_vector(&[vec![1.0], vec![3.0]]);
        assert_eq!(m, vec![2.0]);
    }
}

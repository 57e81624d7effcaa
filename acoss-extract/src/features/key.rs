//! Global key estimation from pitch class profiles

use crate::dsp::{mean_frame, PITCH_CLASSES};
use acoss_common::model::{FeatureMatrix, KeyEstimate};

/// Krumhansl-Kessler probe tone ratings, tonic first
const MAJOR_PROFILE: [f32; 12] = [
    6.35, 2.23, 3.48, 2.33, 4.38, 4.09, 2.52, 5.19, 2.39, 3.66, 2.29, 2.88,
];
const MINOR_PROFILE: [f32; 12] = [
    6.33, 2.68, 3.52, 5.38, 2.60, 3.53, 2.54, 4.75, 3.98, 2.69, 3.34, 3.17,
];

fn pearson(x: &[f32], y: &[f32]) -> f32 {
    let n = x.len() as f32;
    let mean_x = x.iter().sum::<f32>() / n;
    let mean_y = y.iter().sum::<f32>() / n;
    let (mut cov, mut var_x, mut var_y) = (0.0f32, 0.0f32, 0.0f32);
    for (a, b) in x.iter().zip(y) {
        let (dx, dy) = (a - mean_x, b - mean_y);
        cov += dx * dy;
        var_x += dx * dx;
        var_y += dy * dy;
    }
    if var_x <= f32::EPSILON || var_y <= f32::EPSILON {
        0.0
    } else {
        cov / (var_x.sqrt() * var_y.sqrt())
    }
}

/// Correlate a 12-bin pitch profile against all 24 major/minor keys
pub fn estimate_key_from_profile(profile: &[f32]) -> KeyEstimate {
    let mut best = KeyEstimate {
        key: PITCH_CLASSES[0].to_string(),
        scale: "major".to_string(),
        strength: 0.0,
    };
    let mut best_score = f32::NEG_INFINITY;

    for (scale, template) in [("major", &MAJOR_PROFILE), ("minor", &MINOR_PROFILE)] {
        for tonic in 0..12 {
            let rotated: Vec<f32> = (0..12).map(|i| template[(i + 12 - tonic) % 12]).collect();
            let score = pearson(profile, &rotated);
            if score > best_score {
                best_score = score;
                best = KeyEstimate {
                    key: PITCH_CLASSES[tonic].to_string(),
                    scale: scale.to_string(),
                    strength: score,
                };
            }
        }
    }

    best
}

/// Key of a whole track from its HPCP frames
pub fn estimate_key(hpcp: &FeatureMatrix) -> KeyEstimate {
    let profile = mean_frame(hpcp, 12);
    let estimate = estimate_key_from_profile(&profile);
    tracing::debug!(
        key = %estimate.key,
        scale = %estimate.scale,
        strength = estimate.strength,
        "Key estimated"
    );
    estimate
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::hpcp::HpcpExtractor;
    use crate::features::test_signals::{sine, sum_signals};

    #[test]
    fn test_profiles_identify_themselves() {
        let estimate = estimate_key_from_profile(&MAJOR_PROFILE);
        assert_eq!(estimate.key, "C");
        assert_eq!(estimate.scale, "major");
        assert!((estimate.strength - 1.0).abs() < 1e-5);

        // A minor: rotate the minor profile so its tonic sits on A
        let a_minor: Vec<f32> = (0..12).map(|i| MINOR_PROFILE[(i + 3) % 12]).collect();
        let estimate = estimate_key_from_profile(&a_minor);
        assert_eq!(estimate.key, "A");
        assert_eq!(estimate.scale, "minor");
    }

    #[test]
    fn test_silence_has_zero_strength() {
        let estimate = estimate_key(&vec![vec![0.0; 12]; 4]);
        assert_eq!(estimate.strength, 0.0);
    }

    #[test]
    fn test_c_major_chord() {
        let sample_rate = 22050;
        let chord = sum_signals(&[
            sine(130.81, 3.0, sample_rate),
            sine(261.63, 3.0, sample_rate),
            sine(329.63, 3.0, sample_rate),
            sine(392.00, 3.0, sample_rate),
        ]);
        let hpcp = HpcpExtractor::default().extract(&chord, sample_rate).unwrap();
        let estimate = estimate_key(&hpcp);
        assert_eq!(estimate.key, "C");
        assert_eq!(estimate.scale, "major");
    }
}

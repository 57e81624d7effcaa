//! Cover similarity algorithms
//!
//! Every algorithm turns a track's chroma into a compact representation once,
//! then compares representations pairwise. Lower distance means more likely
//! to be versions of the same work.

pub mod ftm2d;
pub mod serra09;

pub use ftm2d::{Ftm2d, Ftm2dConfig};
pub use serra09::{Serra09, Serra09Config};

use acoss_common::model::FeatureMatrix;
use acoss_common::{Error, FeatureKind, FeatureSet, Result};

/// Preprocessed track, ready for pairwise comparison
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TrackRepr {
    /// Per-frame vectors (or a single flattened vector)
    pub frames: FeatureMatrix,
    /// Whole-track summary, e.g. the global chroma
    pub summary: Vec<f32>,
}

/// A pairwise cover song similarity measure
pub trait CoverSimilarity: Send + Sync {
    /// Algorithm name for reports
    fn name(&self) -> &'static str;

    /// Build the representation of one track
    fn preprocess(&self, track: &FeatureSet) -> Result<TrackRepr>;

    /// Distance of `candidate` from `query`, lower is more similar
    fn distance(&self, query: &TrackRepr, candidate: &TrackRepr) -> f64;
}

pub const ALGORITHMS: [&str; 2] = ["ftm2d", "serra09"];

/// Create an algorithm by name, reading `feature` as its chroma input
pub fn algorithm_by_name(name: &str, feature: FeatureKind) -> Result<Box<dyn CoverSimilarity>> {
    if !feature.is_chroma() {
        let chroma: Vec<&str> = FeatureKind::ALL
            .iter()
            .filter(|kind| kind.is_chroma())
            .map(FeatureKind::as_str)
            .collect();
        return Err(Error::InvalidInput(format!(
            "Feature '{}' is not a chroma feature (use {})",
            feature,
            chroma.join(", ")
        )));
    }

    match name.trim().to_lowercase().as_str() {
        "ftm2d" => Ok(Box::new(Ftm2d::new(feature, Ftm2dConfig::default()))),
        "serra09" => Ok(Box::new(Serra09::new(feature, Serra09Config::default()))),
        other => Err(Error::InvalidInput(format!(
            "Unknown algorithm '{}', supported: {}",
            other,
            ALGORITHMS.join(", ")
        ))),
    }
}

/// Fetch a track's chroma and check every frame has 12 bins
pub(crate) fn track_chroma(track: &FeatureSet, feature: FeatureKind) -> Result<&FeatureMatrix> {
    let chroma = track.chroma(feature)?;
    if let Some(frame) = chroma.iter().find(|frame| frame.len() != 12) {
        return Err(Error::InvalidInput(format!(
            "{} of {}/{} has {} bins per frame, expected 12",
            feature,
            track.label,
            track.track_id,
            frame.len()
        )));
    }
    Ok(chroma)
}

/// Average consecutive blocks of `factor` frames; a partial last block is kept
pub(crate) fn downsample_frames(frames: &FeatureMatrix, factor: usize) -> FeatureMatrix {
    let factor = factor.max(1);
    frames
        .chunks(factor)
        .map(|block| {
            let mut mean = vec![0.0f32; 12];
            for frame in block {
                for (acc, v) in mean.iter_mut().zip(frame) {
                    *acc += v;
                }
            }
            let n = block.len() as f32;
            mean.iter_mut().for_each(|v| *v /= n);
            mean
        })
        .collect()
}

/// Scale a vector so its maximum is 1, leaving all-zero vectors alone
pub(crate) fn normalize_max(values: &mut [f32]) {
    let max = values.iter().copied().fold(0.0f32, f32::max);
    if max > f32::EPSILON {
        values.iter_mut().for_each(|v| *v /= max);
    }
}

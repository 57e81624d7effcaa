//! Serra et al. (2009) cross recurrence quantification
//!
//! **Algorithm:**
//! 1. Chroma downsampled and max-normalised per frame; the global chroma
//!    (sum of frames) is kept as the track summary
//! 2. Candidate transposed to the query key by the optimal transposition
//!    index (OTI) of the two global chromas
//! 3. Delay embedding of both sequences (m frames, τ frames apart)
//! 4. Cross recurrence plot: a cell is set when each point is among the
//!    other's κ fraction of nearest neighbours
//! 5. Qmax: longest locally aligned recurrent path, with gap onset and
//!    extension penalties
//! 6. Distance = sqrt(candidate length) / Qmax, infinite with no recurrence

use super::{downsample_frames, normalize_max, track_chroma, CoverSimilarity, TrackRepr};
use acoss_common::model::FeatureMatrix;
use acoss_common::{FeatureKind, FeatureSet, Result};

/// Serra09 parameters
#[derive(Debug, Clone)]
pub struct Serra09Config {
    pub downsample: usize,
    /// Embedding dimension (frames per embedded vector)
    pub embedding_dimension: usize,
    /// Embedding delay in frames
    pub tau: usize,
    /// Fraction of nearest neighbours counted as recurrent
    pub kappa: f64,
    /// Penalty for starting a disruption in the alignment path
    pub gap_onset: f64,
    /// Penalty for extending a disruption
    pub gap_extension: f64,
}

impl Default for Serra09Config {
    fn default() -> Self {
        Self {
            downsample: 4,
            embedding_dimension: 9,
            tau: 1,
            kappa: 0.095,
            gap_onset: 5.0,
            gap_extension: 0.5,
        }
    }
}

pub struct Serra09 {
    feature: FeatureKind,
    config: Serra09Config,
}

impl Serra09 {
    pub fn new(feature: FeatureKind, config: Serra09Config) -> Self {
        let config = Serra09Config {
            embedding_dimension: config.embedding_dimension.max(1),
            tau: config.tau.max(1),
            ..config
        };
        Self { feature, config }
    }

    /// Concatenate `m` frames spaced `tau` apart into one vector per position
    fn embed(&self, frames: &[Vec<f32>], shift: usize) -> Vec<Vec<f32>> {
        let span = (self.config.embedding_dimension - 1) * self.config.tau;
        if frames.len() <= span {
            return Vec::new();
        }
        (0..frames.len() - span)
            .map(|t| {
                let mut vector = Vec::with_capacity(self.config.embedding_dimension * 12);
                for k in 0..self.config.embedding_dimension {
                    let frame = &frames[t + k * self.config.tau];
                    vector.extend((0..12).map(|i| frame[(i + shift) % 12]));
                }
                vector
            })
            .collect()
    }

    /// Binary cross recurrence plot, rows = query, columns = candidate
    fn cross_recurrence(&self, query: &[Vec<f32>], candidate: &[Vec<f32>]) -> Vec<Vec<bool>> {
        let (n, m) = (query.len(), candidate.len());
        let distances: Vec<Vec<f32>> = query
            .iter()
            .map(|a| {
                candidate
                    .iter()
                    .map(|b| {
                        a.iter()
                            .zip(b)
                            .map(|(x, y)| (x - y) * (x - y))
                            .sum::<f32>()
                            .sqrt()
                    })
                    .collect()
            })
            .collect();

        let row_k = neighbour_count(self.config.kappa, m);
        let col_k = neighbour_count(self.config.kappa, n);
        let row_thresholds: Vec<f32> = distances.iter().map(|row| kth_smallest(row, row_k)).collect();
        let col_thresholds: Vec<f32> = (0..m)
            .map(|j| {
                let column: Vec<f32> = distances.iter().map(|row| row[j]).collect();
                kth_smallest(&column, col_k)
            })
            .collect();

        distances
            .iter()
            .enumerate()
            .map(|(i, row)| {
                row.iter()
                    .enumerate()
                    .map(|(j, &d)| d <= row_thresholds[i] && d <= col_thresholds[j])
                    .collect()
            })
            .collect()
    }

    /// Maximum local alignment score over a recurrence plot
    fn qmax(&self, recurrence: &[Vec<bool>]) -> f64 {
        let n = recurrence.len();
        let m = recurrence.first().map_or(0, Vec::len);
        if n == 0 || m == 0 {
            return 0.0;
        }

        let penalty = |i: usize, j: usize| -> f64 {
            if recurrence[i][j] {
                self.config.gap_onset
            } else {
                self.config.gap_extension
            }
        };

        // Scores offset by two rows/columns so predecessors always exist
        let mut q = vec![vec![0.0f64; m + 2]; n + 2];
        let mut best = 0.0f64;
        for i in 0..n {
            for j in 0..m {
                let (qi, qj) = (i + 2, j + 2);
                let score = if recurrence[i][j] {
                    q[qi - 1][qj - 1].max(q[qi - 2][qj - 1]).max(q[qi - 1][qj - 2]) + 1.0
                } else {
                    let mut s = 0.0f64;
                    if i >= 1 && j >= 1 {
                        s = s.max(q[qi - 1][qj - 1] - penalty(i - 1, j - 1));
                    }
                    if i >= 2 && j >= 1 {
                        s = s.max(q[qi - 2][qj - 1] - penalty(i - 2, j - 1));
                    }
                    if i >= 1 && j >= 2 {
                        s = s.max(q[qi - 1][qj - 2] - penalty(i - 1, j - 2));
                    }
                    s
                };
                q[qi][qj] = score;
                best = best.max(score);
            }
        }
        best
    }
}

fn neighbour_count(kappa: f64, len: usize) -> usize {
    ((kappa * len as f64).round() as usize).clamp(1, len.max(1))
}

/// k-th smallest value (1-based k)
fn kth_smallest(values: &[f32], k: usize) -> f32 {
    if values.is_empty() {
        return f32::NEG_INFINITY;
    }
    let mut copy = values.to_vec();
    let index = k.clamp(1, copy.len()) - 1;
    let (_, kth, _) = copy.select_nth_unstable_by(index, |a, b| a.total_cmp(b));
    *kth
}

/// Rotation of `candidate` (in bins) that best matches `query`
pub fn optimal_transposition_index(query: &[f32], candidate: &[f32]) -> usize {
    let mut best_shift = 0;
    let mut best_score = f32::NEG_INFINITY;
    for shift in 0..12 {
        let score: f32 = (0..12).map(|i| query[i] * candidate[(i + shift) % 12]).sum();
        if score > best_score {
            best_score = score;
            best_shift = shift;
        }
    }
    best_shift
}

impl CoverSimilarity for Serra09 {
    fn name(&self) -> &'static str {
        "serra09"
    }

    fn preprocess(&self, track: &FeatureSet) -> Result<TrackRepr> {
        let mut frames: FeatureMatrix =
            downsample_frames(track_chroma(track, self.feature)?, self.config.downsample);
        frames.iter_mut().for_each(|frame| normalize_max(frame));

        let mut summary = vec![0.0f32; 12];
        for frame in &frames {
            for (acc, v) in summary.iter_mut().zip(frame) {
                *acc += v;
            }
        }
        normalize_max(&mut summary);

        Ok(TrackRepr { frames, summary })
    }

    fn distance(&self, query: &TrackRepr, candidate: &TrackRepr) -> f64 {
        if query.summary.len() != 12 || candidate.summary.len() != 12 {
            return f64::INFINITY;
        }
        let shift = optimal_transposition_index(&query.summary, &candidate.summary);

        let query_embedded = self.embed(&query.frames, 0);
        let candidate_embedded = self.embed(&candidate.frames, shift);
        if query_embedded.is_empty() || candidate_embedded.is_empty() {
            return f64::INFINITY;
        }

        let recurrence = self.cross_recurrence(&query_embedded, &candidate_embedded);
        let qmax = self.qmax(&recurrence);
        if qmax <= 0.0 {
            f64::INFINITY
        } else {
            (candidate_embedded.len() as f64).sqrt() / qmax
        }
    }
}

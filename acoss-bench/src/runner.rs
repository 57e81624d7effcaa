//! Benchmark run: preprocess, pairwise distances, metrics, reports

use crate::algorithms::{CoverSimilarity, TrackRepr};
use crate::dataset::Dataset;
use crate::evaluation::{evaluate, Metrics};
use acoss_common::{Error, FeatureKind, Result};
use chrono::{DateTime, Utc};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::io::Write;
use std::path::Path;
use std::time::Instant;
use uuid::Uuid;

/// Summary of one benchmark run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationReport {
    pub run_id: Uuid,
    pub algorithm: String,
    pub feature: FeatureKind,
    pub num_tracks: usize,
    pub num_queries: usize,
    pub map: f64,
    pub mr1: f64,
    pub mt10: f64,
    pub p_at_10: f64,
    pub elapsed_seconds: f64,
    pub created_at: DateTime<Utc>,
}

impl EvaluationReport {
    pub fn display_string(&self) -> String {
        format!(
            "{} on {}: {} tracks, {} queries, MAP {:.4}, MR1 {:.2}, MT10 {:.3}, P@10 {:.4}",
            self.algorithm,
            self.feature,
            self.num_tracks,
            self.num_queries,
            self.map,
            self.mr1,
            self.mt10,
            self.p_at_10
        )
    }
}

/// Report plus the full distance matrix it was computed from
#[derive(Debug, Clone)]
pub struct BenchmarkRun {
    pub report: EvaluationReport,
    /// `distances[query][candidate]`, dataset order
    pub distances: Vec<Vec<f64>>,
}

/// Run `algorithm` over every ordered pair of tracks and score the result
///
/// `workers <= 0` uses all cores.
pub fn run_benchmark(
    dataset: &Dataset,
    algorithm: &dyn CoverSimilarity,
    feature: FeatureKind,
    workers: i32,
) -> Result<BenchmarkRun> {
    let start = Instant::now();
    let run_id = Uuid::new_v4();
    let tracks = dataset.tracks();
    if tracks.len() < 2 {
        return Err(Error::InvalidInput(format!(
            "Benchmark needs at least two tracks, got {}",
            tracks.len()
        )));
    }

    let mut builder = rayon::ThreadPoolBuilder::new().thread_name(|i| format!("acoss-bench-{}", i));
    if workers > 0 {
        builder = builder.num_threads(workers as usize);
    }
    let pool = builder
        .build()
        .map_err(|e| Error::Internal(format!("Thread pool creation failed: {}", e)))?;

    tracing::info!(
        %run_id,
        algorithm = algorithm.name(),
        tracks = tracks.len(),
        threads = pool.current_num_threads(),
        "Benchmark started"
    );

    let reprs: Vec<TrackRepr> = pool.install(|| {
        tracks
            .par_iter()
            .map(|track| algorithm.preprocess(track))
            .collect::<Result<Vec<_>>>()
    })?;
    tracing::debug!("Preprocessed {} tracks in {:.1}s", reprs.len(), start.elapsed().as_secs_f64());

    let n = reprs.len();
    let distances: Vec<Vec<f64>> = pool.install(|| {
        (0..n)
            .into_par_iter()
            .map(|i| {
                (0..n)
                    .map(|j| {
                        if i == j {
                            0.0
                        } else {
                            algorithm.distance(&reprs[i], &reprs[j])
                        }
                    })
                    .collect()
            })
            .collect()
    });

    let Metrics {
        map,
        mr1,
        mt10,
        p_at_10,
        num_queries,
    } = evaluate(&distances, &dataset.labels())?;

    let report = EvaluationReport {
        run_id,
        algorithm: algorithm.name().to_string(),
        feature,
        num_tracks: n,
        num_queries,
        map,
        mr1,
        mt10,
        p_at_10,
        elapsed_seconds: start.elapsed().as_secs_f64(),
        created_at: Utc::now(),
    };
    tracing::info!(%run_id, "{}", report.display_string());

    Ok(BenchmarkRun { report, distances })
}

/// Write the report as pretty JSON, creating parent directories
pub fn save_report(report: &EvaluationReport, path: &Path) -> Result<()> {
    create_parent(path)?;
    let file = std::fs::File::create(path)?;
    serde_json::to_writer_pretty(std::io::BufWriter::new(file), report)?;
    Ok(())
}

/// Write the distance matrix as CSV with `label/track_id` headers
pub fn save_distance_matrix(dataset: &Dataset, distances: &[Vec<f64>], path: &Path) -> Result<()> {
    if distances.len() != dataset.len() {
        return Err(Error::InvalidInput(format!(
            "Distance matrix has {} rows for {} tracks",
            distances.len(),
            dataset.len()
        )));
    }
    create_parent(path)?;

    let ids: Vec<String> = dataset
        .tracks()
        .iter()
        .map(|t| format!("{}/{}", t.label, t.track_id))
        .collect();

    let mut writer = std::io::BufWriter::new(std::fs::File::create(path)?);
    writeln!(writer, "track,{}", ids.join(","))?;
    for (id, row) in ids.iter().zip(distances) {
        let values: Vec<String> = row.iter().map(|d| d.to_string()).collect();
        writeln!(writer, "{},{}", id, values.join(","))?;
    }
    writer.flush()?;
    Ok(())
}

fn create_parent(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    Ok(())
}

//! Batch feature extraction over an audio collection
//!
//! Scans `audio_dir/<clique>/<track>.<ext>`, writes the collection list,
//! splits it into one batch per worker and runs the batches on a rayon pool.
//! Failures from every batch end up in `extractor_errors.txt`.

use crate::extractor::{compute_features_from_paths, BatchSummary};
use crate::services::file_scanner::FileScanner;
use crate::services::statistics::ProgressStats;
use acoss_common::{utils, Error, ExtractorProfile, Result};
use chrono::Utc;
use rayon::prelude::*;
use std::path::{Path, PathBuf};
use std::time::Instant;
use uuid::Uuid;

pub const COLLECTION_FILE: &str = "collection.txt";
pub const ERRORS_FILE: &str = "extractor_errors.txt";

/// How batches are executed
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum RunMode {
    /// Whole collection on the calling thread
    Single,
    /// One batch per worker on a thread pool
    Parallel,
}

impl std::fmt::Display for RunMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RunMode::Single => write!(f, "single"),
            RunMode::Parallel => write!(f, "parallel"),
        }
    }
}

/// Worker count for a requested value, `<= 0` meaning all cores
pub fn resolve_workers(n_workers: i32) -> usize {
    if n_workers > 0 {
        n_workers as usize
    } else {
        std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1)
    }
}

/// Extract features for every audio file of the profile's format below `audio_dir`
pub fn batch_feature_extractor(
    audio_dir: &Path,
    feature_dir: &Path,
    n_workers: i32,
    profile: &ExtractorProfile,
    mode: RunMode,
) -> Result<BatchSummary> {
    let profile = &profile.clone().validate()?;
    let run_id = Uuid::new_v4();
    let started_at = Utc::now();
    tracing::info!(
        %run_id,
        audio_dir = %audio_dir.display(),
        feature_dir = %feature_dir.display(),
        mode = %mode,
        "Batch extraction started at {}",
        started_at.to_rfc3339()
    );

    let scan = FileScanner::new(&profile.input_audio_format)
        .with_header_check(profile.verify_headers)
        .scan_with_stats(audio_dir)?;
    if scan.files.is_empty() {
        return Err(Error::NotFound(format!(
            "No {} files found in {}",
            profile.input_audio_format,
            audio_dir.display()
        )));
    }
    tracing::info!(
        "{} audio files ({} bytes) found in {} cliques",
        scan.files.len(),
        scan.total_size,
        scan.by_clique.len()
    );

    std::fs::create_dir_all(feature_dir)?;
    let collection: Vec<String> = scan
        .files
        .iter()
        .map(|p| p.display().to_string())
        .collect();
    utils::save_list_to_file(&collection, &feature_dir.join(COLLECTION_FILE))?;

    let summary = run_extraction(&scan.files, feature_dir, n_workers, profile, mode)?;

    if !summary.failures.is_empty() {
        let errors_path = feature_dir.join(ERRORS_FILE);
        utils::save_list_to_file(&summary.error_lines(), &errors_path)?;
        tracing::warn!(
            "{} tracks failed, see {}",
            summary.failed(),
            errors_path.display()
        );
    }

    tracing::info!(
        %run_id,
        processed = summary.processed,
        failed = summary.failed(),
        "Batch extraction finished in {:.1}s",
        (Utc::now() - started_at).num_milliseconds() as f64 / 1000.0
    );
    Ok(summary)
}

/// Run an already resolved list of paths in the requested mode
pub fn run_extraction(
    paths: &[PathBuf],
    feature_dir: &Path,
    n_workers: i32,
    profile: &ExtractorProfile,
    mode: RunMode,
) -> Result<BatchSummary> {
    let start = Instant::now();
    let stats = ProgressStats::new(paths.len());

    let mut summary = match mode {
        RunMode::Single => compute_features_from_paths(paths, feature_dir, profile, &stats)?,
        RunMode::Parallel => {
            let workers = resolve_workers(n_workers);
            let batches = utils::create_audio_path_batches(paths, workers);
            tracing::info!(
                "Running {} batches on {} worker threads",
                batches.len(),
                workers
            );

            let pool = rayon::ThreadPoolBuilder::new()
                .num_threads(workers)
                .thread_name(|i| format!("acoss-extract-{}", i))
                .build()
                .map_err(|e| Error::Internal(format!("Thread pool creation failed: {}", e)))?;

            let partials: Vec<BatchSummary> = pool.install(|| {
                batches
                    .par_iter()
                    .map(|batch| compute_features_from_paths(batch, feature_dir, profile, &stats))
                    .collect::<Result<Vec<_>>>()
            })?;

            partials
                .into_iter()
                .fold(BatchSummary::default(), |mut acc, part| {
                    acc.merge(part);
                    acc
                })
        }
    };

    summary.elapsed_seconds = start.elapsed().as_secs_f64();
    tracing::info!("{}", stats.display_string());
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_resolve_workers() {
        assert_eq!(resolve_workers(3), 3);
        assert!(resolve_workers(-1) >= 1);
        assert!(resolve_workers(0) >= 1);
    }

    #[test]
    fn test_empty_audio_dir_is_not_found() {
        let audio = TempDir::new().unwrap();
        let features = TempDir::new().unwrap();
        let result = batch_feature_extractor(
            audio.path(),
            features.path(),
            2,
            &ExtractorProfile::default(),
            RunMode::Parallel,
        );
        assert!(matches!(result, Err(Error::NotFound(_))));
    }

    #[test]
    fn test_missing_audio_dir() {
        let features = TempDir::new().unwrap();
        let result = batch_feature_extractor(
            Path::new("/nonexistent/audio"),
            features.path(),
            1,
            &ExtractorProfile::default(),
            RunMode::Single,
        );
        assert!(matches!(result, Err(Error::NotFound(_))));
    }

    #[test]
    fn test_failures_written_to_errors_file() {
        let audio = TempDir::new().unwrap();
        let features = TempDir::new().unwrap();
        for (clique, track) in [("W_1", "a"), ("W_1", "b"), ("W_2", "c")] {
            let path = audio.path().join(clique).join(format!("{}.mp3", track));
            std::fs::create_dir_all(path.parent().unwrap()).unwrap();
            std::fs::write(&path, b"garbage").unwrap();
        }

        let summary = batch_feature_extractor(
            audio.path(),
            features.path(),
            2,
            &ExtractorProfile::default(),
            RunMode::Parallel,
        )
        .unwrap();

        assert_eq!(summary.processed, 0);
        assert_eq!(summary.failed(), 3);
        let collection = utils::read_txt_file(&features.path().join(COLLECTION_FILE)).unwrap();
        assert_eq!(collection.len(), 3);
        let errors = utils::read_txt_file(&features.path().join(ERRORS_FILE)).unwrap();
        assert_eq!(errors.len(), 3);
    }

    #[test]
    fn test_header_check_skips_renamed_files() {
        let audio = TempDir::new().unwrap();
        let features = TempDir::new().unwrap();
        let path = audio.path().join("W_1").join("a.mp3");
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, b"garbage").unwrap();

        let profile = ExtractorProfile {
            verify_headers: true,
            ..Default::default()
        };
        let result = batch_feature_extractor(audio.path(), features.path(), 1, &profile, RunMode::Single);
        assert!(matches!(result, Err(Error::NotFound(_))));
        assert!(!features.path().join(COLLECTION_FILE).exists());
    }

    #[test]
    fn test_invalid_profile_rejected_before_scan() {
        let features = TempDir::new().unwrap();
        let profile = ExtractorProfile {
            downsample_audio: true,
            downsample_factor: 0,
            ..Default::default()
        };
        let result = batch_feature_extractor(
            Path::new("/nonexistent/audio"),
            features.path(),
            1,
            &profile,
            RunMode::Single,
        );
        assert!(matches!(result, Err(Error::Config(_))));
    }
}

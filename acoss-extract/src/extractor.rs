//! Per-track feature extraction
//!
//! `compute_features` turns one audio file into a `FeatureSet`. The list
//! variants run it over many files, writing one JSON file per track and
//! recording failures instead of aborting.

use crate::audio::{load_audio, resample, slice_audio};
use crate::features::FeatureComputer;
use crate::services::statistics::ProgressStats;
use acoss_common::{utils, Error, ExtractorProfile, FeatureSet, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Instant;

/// Progress is logged at info level every this many files
const PROGRESS_LOG_INTERVAL: usize = 25;

/// One track that could not be processed
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractionFailure {
    pub path: PathBuf,
    pub error: String,
}

/// Outcome of extracting a list of tracks
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BatchSummary {
    /// Tracks whose feature file was written
    pub processed: usize,
    pub failures: Vec<ExtractionFailure>,
    pub elapsed_seconds: f64,
}

impl BatchSummary {
    pub fn failed(&self) -> usize {
        self.failures.len()
    }

    /// Fold another summary into this one
    ///
    /// Elapsed time keeps the maximum, batches run concurrently.
    pub fn merge(&mut self, other: BatchSummary) {
        self.processed += other.processed;
        self.failures.extend(other.failures);
        self.elapsed_seconds = self.elapsed_seconds.max(other.elapsed_seconds);
    }

    /// Failure lines in the `extractor_errors.txt` format
    pub fn error_lines(&self) -> Vec<String> {
        self.failures
            .iter()
            .map(|f| format!("{}\t{}", f.path.display(), f.error))
            .collect()
    }
}

/// Derive `(track_id, label)` from an audio path
///
/// The track id is the file name with the profile's audio format suffix
/// removed; the label is the name of the containing folder.
pub fn track_identity(audio_path: &Path, input_audio_format: &str) -> Result<(String, String)> {
    let file_name = audio_path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .ok_or_else(|| Error::InvalidInput(format!("No file name in {}", audio_path.display())))?;

    let suffix_len = input_audio_format.len();
    let track_id = if file_name.len() > suffix_len
        && file_name.is_char_boundary(file_name.len() - suffix_len)
        && file_name[file_name.len() - suffix_len..].eq_ignore_ascii_case(input_audio_format)
    {
        file_name[..file_name.len() - suffix_len].to_string()
    } else {
        audio_path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or(file_name)
    };

    let label = audio_path
        .parent()
        .and_then(Path::file_name)
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();

    Ok((track_id, label))
}

/// Compute every feature of `profile` for one audio file
pub fn compute_features(audio_path: &Path, profile: &ExtractorProfile) -> Result<FeatureSet> {
    let profile = profile.clone().validate()?;
    compute_features_with(&FeatureComputer::default(), audio_path, &profile)
}

fn compute_features_with(
    computer: &FeatureComputer,
    audio_path: &Path,
    profile: &ExtractorProfile,
) -> Result<FeatureSet> {
    let mut samples = load_audio(audio_path, profile.sample_rate, profile.endtime)?;
    if samples.is_empty() {
        return Err(Error::Audio(format!(
            "Empty or invalid audio recording file -{}-",
            audio_path.display()
        )));
    }

    if let Some(end_time) = profile.endtime {
        samples = slice_audio(samples, profile.sample_rate, end_time);
    }

    let analysis_rate = profile.analysis_sample_rate();
    if analysis_rate != profile.sample_rate {
        samples = resample(samples, profile.sample_rate, analysis_rate)
            .map_err(|e| Error::Audio(format!("Downsampling {} failed: {:#}", audio_path.display(), e)))?;
    }

    let (track_id, label) = track_identity(audio_path, &profile.input_audio_format)?;
    let mut set = FeatureSet::new(track_id, label, analysis_rate);
    set.duration_seconds = samples.len() as f64 / analysis_rate as f64;

    computer.compute_into(&profile.features, &samples, analysis_rate, &mut set)?;
    Ok(set)
}

/// Extract and save features for every path, recording per-file failures
///
/// Only an invalid profile fails the call as a whole.
pub fn compute_features_from_paths(
    paths: &[PathBuf],
    feature_dir: &Path,
    profile: &ExtractorProfile,
    stats: &ProgressStats,
) -> Result<BatchSummary> {
    let profile = &profile.clone().validate()?;
    let start = Instant::now();
    let computer = FeatureComputer::default();
    let mut summary = BatchSummary::default();

    for path in paths {
        stats.file_started();
        tracing::debug!(path = %path.display(), "Computing features");

        let result = compute_features_with(&computer, path, profile)
            .and_then(|set| set.save(feature_dir));

        let completed = match result {
            Ok(saved) => {
                tracing::trace!(path = %saved.display(), "Feature file written");
                summary.processed += 1;
                stats.file_finished(true)
            }
            Err(e) => {
                tracing::debug!(path = %path.display(), error = %e, "Feature extraction failed");
                summary.failures.push(ExtractionFailure {
                    path: path.clone(),
                    error: e.to_string(),
                });
                stats.file_finished(false)
            }
        };

        if completed % PROGRESS_LOG_INTERVAL == 0 {
            tracing::info!("{}", stats.display_string());
        }
    }

    summary.elapsed_seconds = start.elapsed().as_secs_f64();
    Ok(summary)
}

/// Extract features for the audio paths listed in a text file
///
/// Entries that do not exist on disk are dropped before processing.
pub fn compute_features_from_list_file(
    list_file: &Path,
    feature_dir: &Path,
    profile: &ExtractorProfile,
) -> Result<BatchSummary> {
    let profile = profile.clone().validate()?;
    let entries = utils::read_txt_file(list_file)?;
    let listed = entries.len();
    let paths: Vec<PathBuf> = entries
        .into_iter()
        .map(PathBuf::from)
        .filter(|p| p.exists())
        .collect();

    if paths.is_empty() {
        return Err(Error::InvalidInput(format!(
            "Empty collection txt file -{}-",
            list_file.display()
        )));
    }
    if paths.len() < listed {
        tracing::warn!(
            "{} of {} listed files do not exist and were skipped",
            listed - paths.len(),
            listed
        );
    }

    std::fs::create_dir_all(feature_dir)?;
    let stats = ProgressStats::new(paths.len());
    let summary = compute_features_from_paths(&paths, feature_dir, &profile, &stats)?;

    tracing::info!(
        processed = summary.processed,
        failed = summary.failed(),
        elapsed_seconds = summary.elapsed_seconds,
        "Finished list {}",
        list_file.display()
    );
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_track_identity() {
        let (track, label) =
            track_identity(Path::new("/data/W_163992/P_547131.mp3"), ".mp3").unwrap();
        assert_eq!(track, "P_547131");
        assert_eq!(label, "W_163992");

        let (track, _) = track_identity(Path::new("/data/W_1/P_1.MP3"), ".mp3").unwrap();
        assert_eq!(track, "P_1");

        // Other suffixes fall back to the file stem
        let (track, label) = track_identity(Path::new("W_2/P_2.wav"), ".mp3").unwrap();
        assert_eq!(track, "P_2");
        assert_eq!(label, "W_2");
    }

    #[test]
    fn test_track_identity_without_parent() {
        let (track, label) = track_identity(Path::new("P_3.mp3"), ".mp3").unwrap();
        assert_eq!(track, "P_3");
        assert_eq!(label, "");
    }

    #[test]
    fn test_list_file_with_only_missing_entries_is_error() {
        let dir = TempDir::new().unwrap();
        let list = dir.path().join("collection.txt");
        utils::save_list_to_file(&["/nonexistent/a.mp3", "/nonexistent/b.mp3"], &list).unwrap();

        let result =
            compute_features_from_list_file(&list, &dir.path().join("features"), &ExtractorProfile::default());
        match result {
            Err(Error::InvalidInput(msg)) => assert!(msg.contains("Empty collection txt file")),
            other => panic!("expected empty collection error, got {:?}", other),
        }
    }

    #[test]
    fn test_undecodable_file_recorded_as_failure() {
        let dir = TempDir::new().unwrap();
        let bogus = dir.path().join("W_1").join("broken.mp3");
        std::fs::create_dir_all(bogus.parent().unwrap()).unwrap();
        std::fs::write(&bogus, b"definitely not audio").unwrap();

        let stats = ProgressStats::new(1);
        let summary = compute_features_from_paths(
            &[bogus.clone()],
            &dir.path().join("features"),
            &ExtractorProfile::default(),
            &stats,
        )
        .unwrap();

        assert_eq!(summary.processed, 0);
        assert_eq!(summary.failed(), 1);
        assert_eq!(summary.failures[0].path, bogus);
        assert_eq!(stats.snapshot().failed, 1);
    }

    #[test]
    fn test_invalid_profile_fails_whole_list() {
        let dir = TempDir::new().unwrap();
        let profile = ExtractorProfile {
            features: vec![],
            ..Default::default()
        };
        let stats = ProgressStats::new(1);
        let result = compute_features_from_paths(
            &[dir.path().join("W_1/a.mp3")],
            &dir.path().join("features"),
            &profile,
            &stats,
        );
        assert!(matches!(result, Err(Error::Config(_))));
        assert_eq!(stats.snapshot().started, 0);
    }

    #[test]
    fn test_summary_merge() {
        let mut a = BatchSummary {
            processed: 2,
            failures: vec![],
            elapsed_seconds: 1.0,
        };
        a.merge(BatchSummary {
            processed: 3,
            failures: vec![ExtractionFailure {
                path: PathBuf::from("x.mp3"),
                error: "bad".to_string(),
            }],
            elapsed_seconds: 2.5,
        });
        assert_eq!(a.processed, 5);
        assert_eq!(a.failed(), 1);
        assert_eq!(a.elapsed_seconds, 2.5);
        assert_eq!(a.error_lines(), vec!["x.mp3\tbad".to_string()]);
    }
}

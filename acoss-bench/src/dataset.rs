//! Benchmark dataset: every feature file below a feature directory

use acoss_common::{Error, FeatureSet, Result};
use std::collections::BTreeMap;
use std::path::Path;
use walkdir::WalkDir;

/// Tracks ordered by `(label, track_id)`
#[derive(Debug, Clone, Default)]
pub struct Dataset {
    tracks: Vec<FeatureSet>,
}

impl Dataset {
    /// Build from already loaded tracks, sorting them
    pub fn from_tracks(mut tracks: Vec<FeatureSet>) -> Self {
        tracks.sort_by(|a, b| (&a.label, &a.track_id).cmp(&(&b.label, &b.track_id)));
        Self { tracks }
    }

    pub fn tracks(&self) -> &[FeatureSet] {
        &self.tracks
    }

    pub fn len(&self) -> usize {
        self.tracks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }

    pub fn labels(&self) -> Vec<String> {
        self.tracks.iter().map(|t| t.label.clone()).collect()
    }

    /// Track indices grouped by clique label
    pub fn cliques(&self) -> BTreeMap<String, Vec<usize>> {
        let mut cliques: BTreeMap<String, Vec<usize>> = BTreeMap::new();
        for (index, track) in self.tracks.iter().enumerate() {
            cliques.entry(track.label.clone()).or_default().push(index);
        }
        cliques
    }
}

/// Load every `*.json` feature file below `feature_dir`
///
/// Files that fail to parse are logged and skipped.
pub fn load_features(feature_dir: &Path) -> Result<Dataset> {
    if !feature_dir.is_dir() {
        return Err(Error::NotFound(format!(
            "Feature directory {}",
            feature_dir.display()
        )));
    }

    let mut tracks = Vec::new();
    let mut skipped = 0usize;
    for entry in WalkDir::new(feature_dir).follow_links(false) {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                tracing::warn!("Error accessing entry: {}", e);
                continue;
            }
        };
        let is_json = entry
            .path()
            .extension()
            .map(|ext| ext.eq_ignore_ascii_case("json"))
            .unwrap_or(false);
        if !entry.file_type().is_file() || !is_json {
            continue;
        }

        match FeatureSet::load(entry.path()) {
            Ok(set) => tracks.push(set),
            Err(e) => {
                skipped += 1;
                tracing::warn!("Skipping {}: {}", entry.path().display(), e);
            }
        }
    }

    if tracks.is_empty() {
        return Err(Error::NotFound(format!(
            "No feature files in {}",
            feature_dir.display()
        )));
    }

    let dataset = Dataset::from_tracks(tracks);
    tracing::info!(
        tracks = dataset.len(),
        cliques = dataset.cliques().len(),
        skipped,
        "Loaded features from {}",
        feature_dir.display()
    );
    Ok(dataset)
}

//! Feature file data model
//!
//! One `FeatureSet` is written per track at `<feature_dir>/<label>/<track_id>.json`.

use crate::config::FeatureKind;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Row-major matrix of per-frame feature vectors
pub type FeatureMatrix = Vec<Vec<f32>>;

/// Global key estimate
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeyEstimate {
    /// Tonic pitch class name ("C", "C#", ..., "B")
    pub key: String,
    /// "major" or "minor"
    pub scale: String,
    /// Correlation of the mean pitch profile with the winning key profile
    pub strength: f32,
}

/// Tempo, onset and beat descriptors
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RhythmFeatures {
    pub tempo_bpm: f32,
    /// Onset times in seconds
    pub onset_times: Vec<f32>,
    /// Beat times in seconds
    pub beat_times: Vec<f32>,
}

/// All features computed for one audio track
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureSet {
    pub track_id: String,
    /// Cover clique (work) the track belongs to
    pub label: String,
    pub sample_rate: u32,
    pub duration_seconds: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hpcp: Option<FeatureMatrix>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key_extractor: Option<KeyEstimate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rhythm: Option<RhythmFeatures>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mfcc_htk: Option<FeatureMatrix>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chroma_stft: Option<FeatureMatrix>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chroma_cens: Option<FeatureMatrix>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chroma_cqt: Option<FeatureMatrix>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chroma_cqt_processed: Option<FeatureMatrix>,
}

impl FeatureSet {
    pub fn new(track_id: impl Into<String>, label: impl Into<String>, sample_rate: u32) -> Self {
        Self {
            track_id: track_id.into(),
            label: label.into(),
            sample_rate,
            duration_seconds: 0.0,
            hpcp: None,
            key_extractor: None,
            rhythm: None,
            mfcc_htk: None,
            chroma_stft: None,
            chroma_cens: None,
            chroma_cqt: None,
            chroma_cqt_processed: None,
        }
    }

    /// Whether the given feature was computed for this track
    pub fn has(&self, kind: FeatureKind) -> bool {
        match kind {
            FeatureKind::Hpcp => self.hpcp.is_some(),
            FeatureKind::KeyExtractor => self.key_extractor.is_some(),
            FeatureKind::Rhythm => self.rhythm.is_some(),
            FeatureKind::MfccHtk => self.mfcc_htk.is_some(),
            FeatureKind::ChromaStft => self.chroma_stft.is_some(),
            FeatureKind::ChromaCens => self.chroma_cens.is_some(),
            FeatureKind::ChromaCqt => self.chroma_cqt.is_some(),
            FeatureKind::ChromaCqtProcessed => self.chroma_cqt_processed.is_some(),
        }
    }

    /// Pitch class matrix for a chroma-like feature
    pub fn chroma(&self, kind: FeatureKind) -> Result<&FeatureMatrix> {
        let matrix = match kind {
            FeatureKind::Hpcp => self.hpcp.as_ref(),
            FeatureKind::ChromaStft => self.chroma_stft.as_ref(),
            FeatureKind::ChromaCens => self.chroma_cens.as_ref(),
            FeatureKind::ChromaCqt => self.chroma_cqt.as_ref(),
            FeatureKind::ChromaCqtProcessed => self.chroma_cqt_processed.as_ref(),
            other => {
                return Err(Error::InvalidInput(format!(
                    "{} is not a pitch class feature",
                    other
                )))
            }
        };
        matrix.ok_or_else(|| {
            Error::NotFound(format!(
                "Feature '{}' missing for track {}/{}",
                kind, self.label, self.track_id
            ))
        })
    }

    /// Relative location of this track's feature file inside a feature directory
    pub fn relative_path(&self) -> PathBuf {
        Path::new(&self.label).join(format!("{}.json", self.track_id))
    }

    /// Write as JSON under `feature_dir/<label>/`, creating the clique folder
    pub fn save(&self, feature_dir: &Path) -> Result<PathBuf> {
        let path = feature_dir.join(self.relative_path());
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let file = std::fs::File::create(&path)?;
        serde_json::to_writer(std::io::BufWriter::new(file), self)?;
        Ok(path)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let file = std::fs::File::open(path)?;
        Ok(serde_json::from_reader(std::io::BufReader::new(file))?)
    }
}

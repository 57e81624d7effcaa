//! Configuration loading and extractor profile
//!
//! Config file resolution follows a fixed priority order:
//! 1. Command-line argument (highest priority)
//! 2. `ACOSS_CONFIG` environment variable
//! 3. `<config_dir>/acoss/acoss.toml` if present
//! 4. Built-in defaults (no file)

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::{debug, info};

/// Environment variable naming an explicit config file
pub const CONFIG_ENV_VAR: &str = "ACOSS_CONFIG";

/// Audio features the extractor knows how to compute
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeatureKind {
    /// Harmonic pitch class profile (frames x 12)
    Hpcp,
    /// Global key, scale and strength
    KeyExtractor,
    /// Tempo, onsets and beats
    Rhythm,
    /// HTK-style MFCC (frames x 13)
    MfccHtk,
    /// STFT chroma (frames x 12)
    ChromaStft,
    /// Chroma energy normalized statistics (frames x 12)
    ChromaCens,
    /// Constant-Q chroma (frames x 12)
    ChromaCqt,
    /// Constant-Q chroma after log compression and temporal median smoothing
    ChromaCqtProcessed,
}

impl FeatureKind {
    pub const ALL: [FeatureKind; 8] = [
        FeatureKind::Hpcp,
        FeatureKind::KeyExtractor,
        FeatureKind::Rhythm,
        FeatureKind::MfccHtk,
        FeatureKind::ChromaStft,
        FeatureKind::ChromaCens,
        FeatureKind::ChromaCqt,
        FeatureKind::ChromaCqtProcessed,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            FeatureKind::Hpcp => "hpcp",
            FeatureKind::KeyExtractor => "key_extractor",
            FeatureKind::Rhythm => "rhythm",
            FeatureKind::MfccHtk => "mfcc_htk",
            FeatureKind::ChromaStft => "chroma_stft",
            FeatureKind::ChromaCens => "chroma_cens",
            FeatureKind::ChromaCqt => "chroma_cqt",
            FeatureKind::ChromaCqtProcessed => "chroma_cqt_processed",
        }
    }

    /// Whether the feature is a frames x 12 pitch class matrix
    pub fn is_chroma(&self) -> bool {
        !matches!(
            self,
            FeatureKind::KeyExtractor | FeatureKind::Rhythm | FeatureKind::MfccHtk
        )
    }
}

impl fmt::Display for FeatureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FeatureKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let name = s.trim().trim_matches(|c| c == '\'' || c == '"');
        FeatureKind::ALL
            .iter()
            .copied()
            .find(|kind| kind.as_str() == name)
            .ok_or_else(|| {
                let supported: Vec<&str> = FeatureKind::ALL.iter().map(|k| k.as_str()).collect();
                Error::InvalidInput(format!(
                    "Unknown feature '{}'. Supported features: {}",
                    name,
                    supported.join(", ")
                ))
            })
    }
}

/// Parse a feature list such as `hpcp,mfcc_htk`, `hpcp mfcc_htk` or `['hpcp', 'mfcc_htk']`
pub fn parse_feature_list(input: &str) -> Result<Vec<FeatureKind>> {
    let features = input
        .trim()
        .trim_start_matches('[')
        .trim_end_matches(']')
        .split(|c: char| c == ',' || c.is_whitespace())
        .filter(|s| !s.trim().is_empty())
        .map(FeatureKind::from_str)
        .collect::<Result<Vec<_>>>()?;

    if features.is_empty() {
        return Err(Error::InvalidInput("Feature list is empty".to_string()));
    }
    Ok(features)
}

/// Parameters for a feature extraction run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractorProfile {
    /// Sample rate audio is decoded to before analysis
    pub sample_rate: u32,
    /// Audio file suffix, stripped from file names to build track ids
    pub input_audio_format: String,
    /// Resample to `sample_rate / downsample_factor` before analysis
    pub downsample_audio: bool,
    pub downsample_factor: u32,
    /// Only analyse the first `endtime` seconds
    pub endtime: Option<f64>,
    /// Features to compute, in order
    pub features: Vec<FeatureKind>,
    /// Batch scans skip files whose header is not a known audio container
    pub verify_headers: bool,
}

impl Default for ExtractorProfile {
    fn default() -> Self {
        Self {
            sample_rate: 44100,
            input_audio_format: ".mp3".to_string(),
            downsample_audio: false,
            downsample_factor: 2,
            endtime: None,
            features: vec![
                FeatureKind::Hpcp,
                FeatureKind::KeyExtractor,
                FeatureKind::Rhythm,
                FeatureKind::MfccHtk,
            ],
            verify_headers: false,
        }
    }
}

impl ExtractorProfile {
    /// Check invariants and normalise the audio format suffix to start with a dot
    pub fn validate(mut self) -> Result<Self> {
        if self.sample_rate == 0 {
            return Err(Error::Config("sample_rate must be positive".to_string()));
        }
        if self.downsample_factor == 0 {
            return Err(Error::Config("downsample_factor must be at least 1".to_string()));
        }
        if self.features.is_empty() {
            return Err(Error::Config("features list must not be empty".to_string()));
        }
        if let Some(end) = self.endtime {
            if !(end > 0.0) {
                return Err(Error::Config(format!("endtime must be positive, got {}", end)));
            }
        }

        let format = self.input_audio_format.trim();
        if format.is_empty() || format == "." {
            return Err(Error::Config("input_audio_format must not be empty".to_string()));
        }
        self.input_audio_format = if format.starts_with('.') {
            format.to_string()
        } else {
            format!(".{}", format)
        };

        Ok(self)
    }

    /// Extension without the leading dot, lowercase
    pub fn audio_extension(&self) -> String {
        self.input_audio_format.trim_start_matches('.').to_lowercase()
    }

    /// Sample rate the features are computed at
    pub fn analysis_sample_rate(&self) -> u32 {
        if self.downsample_audio {
            (self.sample_rate / self.downsample_factor.max(1)).max(1)
        } else {
            self.sample_rate
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,
    /// Log file path (appended to); console only when unset
    pub file: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            file: Some(PathBuf::from("acoss.extractor.log")),
        }
    }
}

/// Benchmark defaults
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BenchmarkConfig {
    pub algorithm: String,
    pub feature: FeatureKind,
    /// Worker threads, `<= 0` means all cores
    pub workers: i32,
    pub report_path: Option<PathBuf>,
}

impl Default for BenchmarkConfig {
    fn default() -> Self {
        Self {
            algorithm: "ftm2d".to_string(),
            feature: FeatureKind::Hpcp,
            workers: -1,
            report_path: None,
        }
    }
}

/// Contents of `acoss.toml`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TomlConfig {
    pub profile: ExtractorProfile,
    pub logging: LoggingConfig,
    pub benchmark: BenchmarkConfig,
}

/// Read, parse and validate a TOML config file
pub fn load_toml_config(path: &Path) -> Result<TomlConfig> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| Error::Config(format!("Read {} failed: {}", path.display(), e)))?;
    let mut config: TomlConfig = toml::from_str(&content)?;
    config.profile = config.profile.validate()?;
    debug!("Loaded config from {}", path.display());
    Ok(config)
}

/// Resolve which config file to use, if any
pub fn resolve_config_path(cli_arg: Option<&Path>) -> Option<PathBuf> {
    // Priority 1: Command-line argument
    if let Some(path) = cli_arg {
        return Some(path.to_path_buf());
    }

    // Priority 2: Environment variable
    if let Ok(path) = std::env::var(CONFIG_ENV_VAR) {
        if !path.trim().is_empty() {
            return Some(PathBuf::from(path));
        }
    }

    // Priority 3: User config directory
    dirs::config_dir()
        .map(|d| d.join("acoss").join("acoss.toml"))
        .filter(|p| p.exists())
}

/// Load the resolved config, falling back to built-in defaults when no file is found
pub fn load_config(cli_arg: Option<&Path>) -> Result<TomlConfig> {
    match resolve_config_path(cli_arg) {
        Some(path) => {
            let config = load_toml_config(&path)?;
            info!("Configuration loaded from {}", path.display());
            Ok(config)
        }
        None => Ok(TomlConfig::default()),
    }
}

/// Write config atomically (temp file + rename)
pub fn write_toml_config(config: &TomlConfig, path: &Path) -> Result<()> {
    let content = toml::to_string_pretty(config)
        .map_err(|e| Error::Config(format!("Serialize TOML failed: {}", e)))?;

    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    let temp_path = path.with_extension("toml.tmp");
    std::fs::write(&temp_path, content)?;
    std::fs::rename(&temp_path, path)?;
    Ok(())
}

//! Audio collection scanner
//!
//! Two passes: a sequential directory walk (ignore patterns, symlink loop
//! detection) followed by a parallel header check of every candidate file.
//! Output is sorted so collection lists are reproducible between runs.

use rayon::prelude::*;
use std::collections::{HashMap, HashSet};
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};
use thiserror::Error;
use walkdir::{DirEntry, WalkDir};

/// Scanner errors
#[derive(Debug, Error)]
pub enum ScanError {
    #[error("Path not found: {0}")]
    PathNotFound(PathBuf),

    #[error("Not a directory: {0}")]
    NotADirectory(PathBuf),

    #[error("File access error {0}: {1}")]
    FileAccessError(PathBuf, String),
}

impl From<ScanError> for acoss_common::Error {
    fn from(err: ScanError) -> Self {
        match err {
            ScanError::PathNotFound(path) => {
                acoss_common::Error::NotFound(format!("Audio directory {}", path.display()))
            }
            other => acoss_common::Error::InvalidInput(other.to_string()),
        }
    }
}

/// Scan result with statistics
#[derive(Debug, Clone, Default)]
pub struct ScanResult {
    pub files: Vec<PathBuf>,
    pub total_size: u64,
    /// File count per clique folder
    pub by_clique: HashMap<String, usize>,
}

/// Finds audio files of one format below a root folder
pub struct FileScanner {
    extension: String,
    ignore_patterns: Vec<String>,
    verify_headers: bool,
}

impl FileScanner {
    /// Scanner for files ending in `extension` (with or without the leading dot)
    pub fn new(extension: &str) -> Self {
        Self {
            extension: extension.trim_start_matches('.').to_lowercase(),
            ignore_patterns: vec![
                ".DS_Store".to_string(),
                "Thumbs.db".to_string(),
                ".git".to_string(),
                ".svn".to_string(),
            ],
            verify_headers: false,
        }
    }

    /// Also require a recognised audio container signature in the file header
    pub fn with_header_check(mut self, enabled: bool) -> Self {
        self.verify_headers = enabled;
        self
    }

    pub fn scan(&self, root_path: &Path) -> Result<Vec<PathBuf>, ScanError> {
        if !root_path.exists() {
            return Err(ScanError::PathNotFound(root_path.to_path_buf()));
        }
        if !root_path.is_dir() {
            return Err(ScanError::NotADirectory(root_path.to_path_buf()));
        }

        // Sequential walk: symlink_visited is shared mutable state
        let mut candidate_files = Vec::new();
        let mut symlink_visited = HashSet::new();

        let walker = WalkDir::new(root_path)
            .follow_links(false)
            .into_iter()
            .filter_entry(|e| self.should_process_entry(e, &mut symlink_visited));

        for entry in walker {
            match entry {
                Ok(entry) => {
                    if entry.file_type().is_file() && self.has_extension(entry.path()) {
                        candidate_files.push(entry.path().to_path_buf());
                    }
                }
                Err(e) => {
                    tracing::warn!("Error accessing entry: {}", e);
                }
            }
        }

        tracing::debug!("Walk complete: {} candidate files", candidate_files.len());

        let mut audio_files: Vec<PathBuf> = if self.verify_headers {
            candidate_files
                .par_iter()
                .filter_map(|path| match verify_magic_bytes(path) {
                    Ok(true) => Some(path.clone()),
                    Ok(false) => {
                        tracing::debug!("Skipping {}: unrecognised header", path.display());
                        None
                    }
                    Err(e) => {
                        tracing::warn!("Error verifying {}: {}", path.display(), e);
                        None
                    }
                })
                .collect()
        } else {
            candidate_files
        };

        audio_files.sort();
        Ok(audio_files)
    }

    pub fn scan_with_stats(&self, root_path: &Path) -> Result<ScanResult, ScanError> {
        let files = self.scan(root_path)?;

        let mut total_size = 0u64;
        let mut by_clique = HashMap::new();
        for file in &files {
            match std::fs::metadata(file) {
                Ok(metadata) => total_size += metadata.len(),
                Err(e) => tracing::warn!("Cannot stat {}: {}", file.display(), e),
            }
            let clique = file
                .parent()
                .and_then(Path::file_name)
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();
            *by_clique.entry(clique).or_insert(0) += 1;
        }

        Ok(ScanResult {
            files,
            total_size,
            by_clique,
        })
    }

    fn has_extension(&self, path: &Path) -> bool {
        path.extension()
            .map(|ext| ext.to_string_lossy().to_lowercase() == self.extension)
            .unwrap_or(false)
    }

    fn should_process_entry(&self, entry: &DirEntry, symlink_visited: &mut HashSet<PathBuf>) -> bool {
        let file_name = entry.file_name().to_string_lossy();
        if self
            .ignore_patterns
            .iter()
            .any(|pattern| file_name.contains(pattern.as_str()))
        {
            return false;
        }

        if entry.file_type().is_symlink() {
            if let Ok(canonical) = entry.path().canonicalize() {
                if !symlink_visited.insert(canonical) {
                    tracing::warn!("Symlink loop detected: {}", entry.path().display());
                    return false;
                }
            }
        }

        true
    }
}

/// Check the first bytes for a known audio container signature
fn verify_magic_bytes(path: &Path) -> Result<bool, ScanError> {
    let mut file =
        File::open(path).map_err(|e| ScanError::FileAccessError(path.to_path_buf(), e.to_string()))?;

    let mut buffer = [0u8; 12];
    let bytes_read = file
        .read(&mut buffer)
        .map_err(|e| ScanError::FileAccessError(path.to_path_buf(), e.to_string()))?;
    if bytes_read < 4 {
        return Ok(false);
    }

    let is_audio = match &buffer[..bytes_read] {
        [0xFF, 0xFB, ..] | [0xFF, 0xF3, ..] | [0xFF, 0xF2, ..] => true,
        [b'I', b'D', b'3', ..] => true,
        [b'f', b'L', b'a', b'C', ..] => true,
        [b'O', b'g', b'g', b'S', ..] => true,
        [_, _, _, _, b'f', b't', b'y', b'p', ..] => true,
        [b'R', b'I', b'F', b'F', _, _, _, _, b'W', b'A', b'V', b'E'] => true,
        _ => false,
    };
    Ok(is_audio)
}

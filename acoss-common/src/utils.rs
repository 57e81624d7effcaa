//! List file helpers and path batching

use crate::Result;
use std::io::Write;
use std::path::{Path, PathBuf};

/// Read a text file into its non-empty, trimmed lines
pub fn read_txt_file(path: &Path) -> Result<Vec<String>> {
    let content = std::fs::read_to_string(path)?;
    Ok(content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect())
}

/// Write one entry per line, creating parent directories as needed
pub fn save_list_to_file<S: AsRef<str>>(list: &[S], path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    let mut writer = std::io::BufWriter::new(std::fs::File::create(path)?);
    for entry in list {
        writeln!(writer, "{}", entry.as_ref())?;
    }
    writer.flush()?;
    Ok(())
}

/// Split paths into at most `n_batches` contiguous, non-empty batches of near-equal size
///
/// Earlier batches receive the remainder, so sizes differ by at most one.
pub fn create_audio_path_batches(paths: &[PathBuf], n_batches: usize) -> Vec<Vec<PathBuf>> {
    if paths.is_empty() {
        return Vec::new();
    }

    let n = n_batches.clamp(1, paths.len());
    let base = paths.len() / n;
    let remainder = paths.len() % n;

    let mut batches = Vec::with_capacity(n);
    let mut start = 0;
    for i in 0..n {
        let size = base + usize::from(i < remainder);
        batches.push(paths[start..start + size].to_vec());
        start += size;
    }
    batches
}

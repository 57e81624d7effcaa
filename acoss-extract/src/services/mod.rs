//! Batch services: collection scanning, progress tracking, parallel extraction

pub mod batch_extractor;
pub mod file_scanner;
pub mod statistics;

pub use batch_extractor::{batch_feature_extractor, run_extraction, RunMode};
pub use file_scanner::{FileScanner, ScanError, ScanResult};
pub use statistics::{ProcessingStats, ProgressStats};

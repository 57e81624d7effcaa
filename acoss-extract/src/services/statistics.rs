//! Extraction progress tracking
//!
//! Counters are shared by every worker of a batch run. `snapshot()` gives a
//! serializable copy for logging and summaries.

use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicUsize, Ordering};

/// Point-in-time copy of the progress counters
///
/// Display: "Processing X to Y of Z (F failed)"
/// - X = completed files (successful or failed)
/// - Y = started files
/// - Z = total files in the collection
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessingStats {
    pub completed: usize,
    pub started: usize,
    pub failed: usize,
    pub total: usize,
}

impl ProcessingStats {
    pub fn display_string(&self) -> String {
        format!(
            "Processing {} to {} of {} ({} failed)",
            self.completed, self.started, self.total, self.failed
        )
    }
}

/// Thread-safe progress counters for one extraction run
#[derive(Debug, Default)]
pub struct ProgressStats {
    started: AtomicUsize,
    completed: AtomicUsize,
    failed: AtomicUsize,
    total: AtomicUsize,
}

impl ProgressStats {
    pub fn new(total: usize) -> Self {
        let stats = Self::default();
        stats.total.store(total, Ordering::Relaxed);
        stats
    }

    pub fn file_started(&self) {
        self.started.fetch_add(1, Ordering::Relaxed);
    }

    /// Mark one file finished; returns the number completed so far
    pub fn file_finished(&self, successful: bool) -> usize {
        if !successful {
            self.failed.fetch_add(1, Ordering::Relaxed);
        }
        self.completed.fetch_add(1, Ordering::Relaxed) + 1
    }

    pub fn snapshot(&self) -> ProcessingStats {
        ProcessingStats {
            completed: self.completed.load(Ordering::Relaxed),
            started: self.started.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
            total: self.total.load(Ordering::Relaxed),
        }
    }

    pub fn display_string(&self) -> String {
        self.snapshot().display_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_display_string() {
        let stats = ProgressStats::new(10);
        stats.file_started();
        stats.file_started();
        stats.file_finished(true);
        assert_eq!(stats.display_string(), "Processing 1 to 2 of 10 (0 failed)");

        stats.file_finished(false);
        assert_eq!(stats.snapshot().failed, 1);
        assert_eq!(stats.snapshot().completed, 2);
    }

    #[test]
    fn test_counters_across_threads() {
        let stats = Arc::new(ProgressStats::new(400));
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let stats = Arc::clone(&stats);
                std::thread::spawn(move || {
                    for i in 0..100 {
                        stats.file_started();
                        stats.file_finished(i % 10 != 0);
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        let snapshot = stats.snapshot();
        assert_eq!(snapshot.started, 400);
        assert_eq!(snapshot.completed, 400);
        assert_eq!(snapshot.failed, 40);
    }
}

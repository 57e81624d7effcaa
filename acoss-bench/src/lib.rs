//! acoss-bench library - cover song identification benchmark
//!
//! Loads feature files written by acoss-extract, runs a cover similarity
//! algorithm over every pair of tracks and scores the distance matrix.

pub mod algorithms;
pub mod dataset;
pub mod evaluation;
pub mod runner;

pub use algorithms::{algorithm_by_name, CoverSimilarity, TrackRepr};
pub use dataset::{load_features, Dataset};
pub use evaluation::{evaluate, Metrics};
pub use runner::{run_benchmark, save_distance_matrix, save_report, BenchmarkRun, EvaluationReport};

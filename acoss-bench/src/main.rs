//! acoss-bench - cover song identification benchmark
//!
//! Loads the feature files written by acoss-extract, computes the pairwise
//! distance matrix with the selected algorithm and reports MAP, MR1, MT10
//! and precision at 10.

use std::path::PathBuf;

use acoss_bench::{algorithm_by_name, load_features, run_benchmark, save_distance_matrix, save_report};
use acoss_common::config::load_config;
use acoss_common::logging::init_logging;
use acoss_common::FeatureKind;
use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;

/// Command-line arguments for acoss-bench
#[derive(Parser, Debug)]
#[command(name = "acoss-bench")]
#[command(about = "Benchmark cover song similarity algorithms on extracted features")]
#[command(version)]
struct Args {
    /// Folder with one sub-folder of feature files per clique
    #[arg(short = 'p', long, default_value = "features", env = "ACOSS_FEATURE_DIR")]
    feature_dir: PathBuf,

    /// Similarity algorithm (ftm2d, serra09); defaults to the config value
    #[arg(short = 'a', long)]
    algorithm: Option<String>,

    /// Chroma feature used by the algorithm (hpcp, chroma_stft, chroma_cens, chroma_cqt, chroma_cqt_processed)
    #[arg(short = 'f', long)]
    feature: Option<FeatureKind>,

    /// Number of worker threads, -1 for all cores
    #[arg(short = 'n', long, allow_negative_numbers = true)]
    workers: Option<i32>,

    /// JSON report output path
    #[arg(short = 'o', long)]
    report: Option<PathBuf>,

    /// Also write the distance matrix as CSV
    #[arg(long)]
    matrix: Option<PathBuf>,

    /// TOML config file (falls back to ACOSS_CONFIG, then the user config dir)
    #[arg(short = 'c', long)]
    config: Option<PathBuf>,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let config = load_config(args.config.as_deref()).context("Failed to load configuration")?;
    init_logging(&config.logging).context("Failed to initialize logging")?;

    info!("Starting acoss-bench {}", env!("CARGO_PKG_VERSION"));

    let benchmark = config.benchmark;
    let algorithm_name = args.algorithm.unwrap_or(benchmark.algorithm);
    let feature = args.feature.unwrap_or(benchmark.feature);
    let workers = args.workers.unwrap_or(benchmark.workers);
    let report_path = args.report.or(benchmark.report_path);

    let algorithm = algorithm_by_name(&algorithm_name, feature)?;
    let dataset = load_features(&args.feature_dir)
        .with_context(|| format!("Failed to load features from {}", args.feature_dir.display()))?;

    let run = run_benchmark(&dataset, algorithm.as_ref(), feature, workers)
        .context("Benchmark run failed")?;
    println!("{}", run.report.display_string());

    if let Some(path) = report_path {
        save_report(&run.report, &path)
            .with_context(|| format!("Failed to write report {}", path.display()))?;
        info!("Report written to {}", path.display());
    }
    if let Some(path) = args.matrix {
        save_distance_matrix(&dataset, &run.distances, &path)
            .with_context(|| format!("Failed to write distance matrix {}", path.display()))?;
        info!("Distance matrix written to {}", path.display());
    }

    Ok(())
}

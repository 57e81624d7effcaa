//! acoss-extract - batch audio feature extractor
//!
//! Computes the features named in the extractor profile for every track of a
//! cover song collection (`audio_dir/<clique>/<track>.<ext>`) or of a list
//! file, writing `feature_dir/<clique>/<track>.json`.

use std::path::{Path, PathBuf};

use acoss_common::config::{load_config, parse_feature_list};
use acoss_common::logging::init_logging;
use acoss_extract::{batch_feature_extractor, compute_features_from_list_file, RunMode};
use anyhow::{bail, Context, Result};
use clap::{ArgGroup, Parser};
use tracing::info;

/// Command-line arguments for acoss-extract
#[derive(Parser, Debug)]
#[command(name = "acoss-extract")]
#[command(about = "Audio feature extractor for cover song identification")]
#[command(version)]
#[command(group(
    ArgGroup::new("input")
        .required(true)
        .multiple(true)
        .args(["audio_dir", "list_file"])
))]
struct Args {
    /// Root folder with one sub-folder of audio files per clique
    #[arg(short = 'a', long, env = "ACOSS_AUDIO_DIR")]
    audio_dir: Option<PathBuf>,

    /// Folder the feature files are written to
    #[arg(short = 'p', long, default_value = "features", env = "ACOSS_FEATURE_DIR")]
    feature_dir: PathBuf,

    /// Text file with one audio path per line (instead of scanning a folder)
    #[arg(short = 'l', long)]
    list_file: Option<PathBuf>,

    /// Features to compute, comma or space separated (overrides the profile)
    #[arg(short = 'f', long)]
    feature_list: Option<String>,

    /// Run the whole collection on one thread or in parallel batches
    #[arg(short = 'm', long, value_enum, default_value_t = RunMode::Parallel)]
    run_mode: RunMode,

    /// Number of worker threads, -1 for all cores
    #[arg(short = 'n', long, default_value_t = -1, allow_negative_numbers = true)]
    workers: i32,

    /// TOML config file (falls back to ACOSS_CONFIG, then the user config dir)
    #[arg(short = 'c', long)]
    config: Option<PathBuf>,
}

/// Where the tracks to process come from
#[derive(Debug, PartialEq)]
enum Input<'a> {
    List(&'a Path),
    Collection(&'a Path),
}

impl Args {
    /// The list file wins when both inputs are given
    fn input(&self) -> Result<Input<'_>> {
        match (&self.list_file, &self.audio_dir) {
            (Some(list_file), _) => Ok(Input::List(list_file)),
            (None, Some(audio_dir)) => Ok(Input::Collection(audio_dir)),
            (None, None) => bail!("One of --audio-dir or --list-file is required"),
        }
    }
}

fn main() -> Result<()> {
    let args = Args::parse();
    let input = args.input()?;

    let mut config = load_config(args.config.as_deref()).context("Failed to load configuration")?;
    init_logging(&config.logging).context("Failed to initialize logging")?;

    info!("Starting acoss-extract {}", env!("CARGO_PKG_VERSION"));

    if let Some(list) = &args.feature_list {
        config.profile.features = parse_feature_list(list)?;
    }
    let profile = config.profile.validate()?;

    std::fs::create_dir_all(&args.feature_dir).with_context(|| {
        format!("Failed to create feature dir {}", args.feature_dir.display())
    })?;

    let summary = match input {
        Input::List(list_file) => compute_features_from_list_file(list_file, &args.feature_dir, &profile)
            .with_context(|| format!("Extraction from list {} failed", list_file.display()))?,
        Input::Collection(audio_dir) => {
            batch_feature_extractor(audio_dir, &args.feature_dir, args.workers, &profile, args.run_mode)
                .with_context(|| format!("Batch extraction of {} failed", audio_dir.display()))?
        }
    };

    info!(
        "Extraction finished: {} processed, {} failed in {:.1}s",
        summary.processed,
        summary.failed(),
        summary.elapsed_seconds
    );
    info!("Extraction profile: {}", serde_json::to_string(&profile)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_command_definition() {
        Args::command().debug_assert();
    }

    #[test]
    fn test_input_required() {
        std::env::remove_var("ACOSS_AUDIO_DIR");
        let err = Args::try_parse_from(["acoss-extract", "-n", "2"]).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::MissingRequiredArgument);
    }

    #[test]
    fn test_list_file_wins_over_audio_dir() {
        let args =
            Args::try_parse_from(["acoss-extract", "-a", "audio", "-l", "list.txt"]).unwrap();
        assert_eq!(args.input().unwrap(), Input::List(Path::new("list.txt")));
    }

    #[test]
    fn test_audio_dir_options() {
        let args = Args::try_parse_from([
            "acoss-extract",
            "--audio-dir",
            "audio",
            "-m",
            "single",
            "-n",
            "-1",
            "-f",
            "hpcp,chroma_cqt",
        ])
        .unwrap();
        assert_eq!(args.input().unwrap(), Input::Collection(Path::new("audio")));
        assert_eq!(args.run_mode, RunMode::Single);
        assert_eq!(args.workers, -1);
        assert_eq!(args.feature_list.as_deref(), Some("hpcp,chroma_cqt"));
    }
}

//! Tests for config file resolution and loading
//!
//! Tests that manipulate ACOSS_CONFIG are marked with #[serial]
//! so they do not race on the process environment.

use acoss_common::config::{
    load_config, load_toml_config, resolve_config_path, FeatureKind, TomlConfig, CONFIG_ENV_VAR,
};
use serial_test::serial;
use std::env;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

#[test]
#[serial]
fn test_cli_argument_wins_over_env() {
    env::set_var(CONFIG_ENV_VAR, "/tmp/acoss-env.toml");

    let resolved = resolve_config_path(Some(Path::new("/tmp/acoss-cli.toml")));
    assert_eq!(resolved, Some(PathBuf::from("/tmp/acoss-cli.toml")));

    env::remove_var(CONFIG_ENV_VAR);
}

#[test]
#[serial]
fn test_env_var_used_without_cli_argument() {
    env::set_var(CONFIG_ENV_VAR, "/tmp/acoss-env.toml");

    let resolved = resolve_config_path(None);
    assert_eq!(resolved, Some(PathBuf::from("/tmp/acoss-env.toml")));

    env::remove_var(CONFIG_ENV_VAR);
}

#[cfg(target_os = "linux")]
#[test]
#[serial]
fn test_user_config_dir_fallback() {
    let temp_dir = TempDir::new().unwrap();
    let config_path = temp_dir.path().join("acoss").join("acoss.toml");
    let previous = env::var_os("XDG_CONFIG_HOME");
    env::remove_var(CONFIG_ENV_VAR);
    env::set_var("XDG_CONFIG_HOME", temp_dir.path());

    // Nothing there yet
    assert_eq!(resolve_config_path(None), None);

    std::fs::create_dir_all(config_path.parent().unwrap()).unwrap();
    std::fs::write(&config_path, "[profile]\nsample_rate = 16000\n").unwrap();
    assert_eq!(resolve_config_path(None), Some(config_path.clone()));
    assert_eq!(load_config(None).unwrap().profile.sample_rate, 16000);

    match previous {
        Some(value) => env::set_var("XDG_CONFIG_HOME", value),
        None => env::remove_var("XDG_CONFIG_HOME"),
    }
}

#[test]
fn test_partial_toml_uses_defaults() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("acoss.toml");
    std::fs::write(
        &path,
        r#"
[profile]
sample_rate = 22050
input_audio_format = "wav"
features = ["hpcp", "chroma_cens"]

[logging]
level = "debug"
"#,
    )
    .unwrap();

    let config = load_toml_config(&path).unwrap();
    assert_eq!(config.profile.sample_rate, 22050);
    assert_eq!(config.profile.input_audio_format, ".wav");
    assert_eq!(
        config.profile.features,
        vec![FeatureKind::Hpcp, FeatureKind::ChromaCens]
    );
    assert!(!config.profile.downsample_audio);
    assert_eq!(config.profile.downsample_factor, 2);
    assert!(!config.profile.verify_headers);
    assert_eq!(config.logging.level, "debug");
    assert_eq!(config.benchmark.algorithm, "ftm2d");
}

#[test]
fn test_invalid_profile_rejected() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("acoss.toml");
    std::fs::write(&path, "[profile]\nsample_rate = 0\n").unwrap();

    let err = load_toml_config(&path).unwrap_err();
    assert!(err.to_string().contains("sample_rate"));
}

#[test]
fn test_unknown_feature_in_toml_rejected() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("acoss.toml");
    std::fs::write(&path, "[profile]\nfeatures = [\"crema\"]\n").unwrap();

    assert!(load_toml_config(&path).is_err());
}

#[test]
fn test_missing_explicit_file_is_error() {
    let result = load_config(Some(Path::new("/nonexistent/acoss.toml")));
    assert!(result.is_err());
}

#[test]
fn test_default_config_matches_extractor_profile() {
    let config = TomlConfig::default();
    assert_eq!(config.profile.sample_rate, 44100);
    assert_eq!(config.profile.input_audio_format, ".mp3");
    assert_eq!(config.profile.features.len(), 4);
    assert_eq!(config.logging.file, Some(PathBuf::from("acoss.extractor.log")));
}

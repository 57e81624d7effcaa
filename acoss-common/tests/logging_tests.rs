//! Subscriber installation test
//!
//! The global subscriber can be installed once per process, so everything
//! is checked from a single test in its own test binary.

use acoss_common::config::LoggingConfig;
use acoss_common::logging::init_logging;
use acoss_common::Error;
use tempfile::TempDir;

#[test]
fn test_file_layer_appends_plain_records_and_env_overrides_level() {
    let dir = TempDir::new().unwrap();
    let log_path = dir.path().join("acoss.test.log");
    std::fs::write(&log_path, "earlier run\n").unwrap();

    // Configured level would hide debug records
    std::env::set_var("RUST_LOG", "debug");
    let config = LoggingConfig {
        level: "error".to_string(),
        file: Some(log_path.clone()),
    };
    init_logging(&config).unwrap();

    tracing::debug!(track = "P_1", "debug record from the extractor");
    tracing::info!("info record");

    let content = std::fs::read_to_string(&log_path).unwrap();
    assert!(content.starts_with("earlier run\n"), "file was truncated: {}", content);
    assert!(content.contains("debug record from the extractor"), "{}", content);
    assert!(content.contains("track=\"P_1\"") || content.contains("track=P_1"), "{}", content);
    assert!(content.contains("info record"));
    assert!(content.contains("logging_tests"), "target missing: {}", content);
    assert!(!content.contains('\u{1b}'), "ANSI escape in log file");

    // Second installation is refused
    assert!(matches!(init_logging(&config), Err(Error::Internal(_))));

    std::env::remove_var("RUST_LOG");
}

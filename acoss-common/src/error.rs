//! Common error types for acoss

use thiserror::Error;

/// Common result type for acoss operations
pub type Result<T> = std::result::Result<T, Error>;

/// Common error types across the extractor and benchmark crates
#[derive(Error, Debug)]
pub enum Error {
    /// I/O operation error (wraps std::io::Error)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Feature file (de)serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// TOML parse error
    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    /// Configuration loading or validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Requested resource not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Invalid user input or parameter
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Audio decoding or analysis failure
    #[error("Audio error: {0}")]
    Audio(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

//! # acoss Common Library
//!
//! Shared code for the acoss feature extractor and benchmark including:
//! - Error type
//! - Feature file data model
//! - Extractor profile and TOML configuration
//! - Logging initialization
//! - List file utilities

pub mod config;
pub mod error;
pub mod logging;
pub mod model;
pub mod utils;

pub use config::{ExtractorProfile, FeatureKind};
pub use error::{Error, Result};
pub use model::FeatureSet;

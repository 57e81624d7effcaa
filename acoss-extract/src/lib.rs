//! acoss-extract library interface
//!
//! Audio decoding, DSP building blocks, feature extractors and the batch
//! extraction pipeline behind the `acoss-extract` binary.

pub mod audio;
pub mod dsp;
pub mod extractor;
pub mod features;
pub mod services;

pub use extractor::{
    compute_features, compute_features_from_list_file, compute_features_from_paths, BatchSummary,
    ExtractionFailure,
};
pub use services::{batch_feature_extractor, RunMode};

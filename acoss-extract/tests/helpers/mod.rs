//! Test helper utilities for acoss-extract

pub mod audio_generator;

pub use audio_generator::{generate_test_collection, generate_test_wav, AudioConfig};

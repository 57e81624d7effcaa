//! Audio test fixture generator
//!
//! Writes 16-bit WAV files made of summed sine tones, laid out as a cover
//! song collection (`root/<clique>/<track>.wav`).

#![allow(dead_code)]

use std::path::{Path, PathBuf};

/// Configuration for generated audio
#[derive(Debug, Clone)]
pub struct AudioConfig {
    pub duration_seconds: f64,
    pub sample_rate: u32,
    pub channels: u16,
    /// Tone frequencies mixed at equal amplitude
    pub frequencies: Vec<f32>,
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            duration_seconds: 2.0,
            sample_rate: 22050,
            channels: 2,
            frequencies: vec![440.0],
        }
    }
}

/// Generate a test WAV file with the given configuration
pub fn generate_test_wav(path: &Path, config: &AudioConfig) -> anyhow::Result<PathBuf> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let spec = hound::WavSpec {
        channels: config.channels,
        sample_rate: config.sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };

    let mut writer = hound::WavWriter::create(path, spec)?;
    let total_samples = (config.duration_seconds * config.sample_rate as f64) as usize;
    let amplitude = 0.6 / config.frequencies.len().max(1) as f32;

    for i in 0..total_samples {
        let t = i as f32 / config.sample_rate as f32;
        let value: f32 = config
            .frequencies
            .iter()
            .map(|f| (2.0 * std::f32::consts::PI * f * t).sin())
            .sum::<f32>()
            * amplitude;
        let sample = (value * i16::MAX as f32) as i16;

        for _ in 0..config.channels {
            writer.write_sample(sample)?;
        }
    }

    writer.finalize()?;
    Ok(path.to_path_buf())
}

/// Generate `tracks_per_clique` files for each `(clique, frequencies)` entry
pub fn generate_test_collection(
    root: &Path,
    cliques: &[(&str, Vec<f32>)],
    tracks_per_clique: usize,
    base: &AudioConfig,
) -> anyhow::Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for (clique, frequencies) in cliques {
        for i in 0..tracks_per_clique {
            let config = AudioConfig {
                frequencies: frequencies.clone(),
                // Vary durations so versions are not identical copies
                duration_seconds: base.duration_seconds + 0.25 * i as f64,
                ..base.clone()
            };
            let path = root.join(clique).join(format!("{}_v{}.wav", clique, i + 1));
            files.push(generate_test_wav(&path, &config)?);
        }
    }
    Ok(files)
}

//! Onset, tempo and beat descriptors
//!
//! **Algorithm:**
//! 1. Onset strength: half-wave rectified log-magnitude spectral flux
//! 2. Onsets: adaptive threshold peak picking on the strength envelope
//! 3. Tempo: envelope autocorrelation weighted by a log-Gaussian tempo prior
//! 4. Beats: dynamic programming beat tracker seeded with the tempo period

use crate::dsp::{Stft, WindowKind};
use acoss_common::model::RhythmFeatures;
use acoss_common::Result;

/// Rhythm analysis parameters
#[derive(Debug, Clone)]
pub struct RhythmConfig {
    pub frame_size: usize,
    pub hop_size: usize,
    pub min_bpm: f32,
    pub max_bpm: f32,
    /// Centre of the tempo prior
    pub prior_bpm: f32,
    /// Prior width in octaves
    pub prior_octaves: f32,
    /// Threshold = local mean + delta (on the normalised envelope)
    pub onset_delta: f32,
    pub min_onset_gap_s: f32,
    /// Penalty for deviating from the tempo period between beats
    pub tightness: f32,
}

impl Default for RhythmConfig {
    fn default() -> Self {
        Self {
            frame_size: 2048,
            hop_size: 512,
            min_bpm: 40.0,
            max_bpm: 240.0,
            prior_bpm: 120.0,
            prior_octaves: 1.0,
            onset_delta: 0.07,
            min_onset_gap_s: 0.03,
            tightness: 100.0,
        }
    }
}

pub struct RhythmExtractor {
    config: RhythmConfig,
    stft: Stft,
}

impl Default for RhythmExtractor {
    fn default() -> Self {
        Self::new(RhythmConfig::default())
    }
}

impl RhythmExtractor {
    pub fn new(config: RhythmConfig) -> Self {
        let stft = Stft::new(config.frame_size, config.hop_size, WindowKind::Hann);
        Self { config, stft }
    }

    pub fn extract(&self, samples: &[f32], sample_rate: u32) -> Result<RhythmFeatures> {
        let envelope = self.onset_strength(samples)?;
        let frame_rate = sample_rate as f32 / self.config.hop_size as f32;

        let onset_frames = self.pick_onsets(&envelope, frame_rate);
        let tempo_bpm = self.estimate_tempo(&envelope, frame_rate);
        let beat_frames = if tempo_bpm > 0.0 {
            self.track_beats(&envelope, frame_rate, tempo_bpm)
        } else {
            Vec::new()
        };

        let to_seconds = |frames: Vec<usize>| -> Vec<f32> {
            frames.into_iter().map(|f| f as f32 / frame_rate).collect()
        };

        tracing::debug!(
            tempo_bpm,
            onsets = onset_frames.len(),
            beats = beat_frames.len(),
            "Rhythm features computed"
        );

        Ok(RhythmFeatures {
            tempo_bpm,
            onset_times: to_seconds(onset_frames),
            beat_times: to_seconds(beat_frames),
        })
    }

    /// Spectral flux envelope, one value per STFT frame (first frame is 0)
    pub fn onset_strength(&self, samples: &[f32]) -> Result<Vec<f32>> {
        let spectra = self.stft.magnitudes(samples)?;
        let log_spectra: Vec<Vec<f32>> = spectra
            .into_iter()
            .map(|frame| frame.into_iter().map(|m| (1.0 + 100.0 * m).ln()).collect())
            .collect();

        let mut envelope = Vec::with_capacity(log_spectra.len());
        envelope.push(0.0);
        for pair in log_spectra.windows(2) {
            let flux: f32 = pair[1]
                .iter()
                .zip(&pair[0])
                .map(|(cur, prev)| (cur - prev).max(0.0))
                .sum();
            envelope.push(flux);
        }
        Ok(envelope)
    }

    /// Frame indices of onsets
    pub fn pick_onsets(&self, envelope: &[f32], frame_rate: f32) -> Vec<usize> {
        let max = envelope.iter().copied().fold(0.0f32, f32::max);
        if max <= f32::EPSILON {
            return Vec::new();
        }
        let normalized: Vec<f32> = envelope.iter().map(|v| v / max).collect();

        let mean_radius = ((0.1 * frame_rate).round() as usize).max(1);
        let max_radius = 3;
        let min_gap = ((self.config.min_onset_gap_s * frame_rate).round() as usize).max(1);

        let mut onsets: Vec<usize> = Vec::new();
        for i in 0..normalized.len() {
            let value = normalized[i];

            let lo = i.saturating_sub(max_radius);
            let hi = (i + max_radius + 1).min(normalized.len());
            if normalized[lo..hi].iter().any(|&v| v > value) {
                continue;
            }

            let lo = i.saturating_sub(mean_radius);
            let hi = (i + mean_radius + 1).min(normalized.len());
            let local_mean = normalized[lo..hi].iter().sum::<f32>() / (hi - lo) as f32;
            if value < local_mean + self.config.onset_delta {
                continue;
            }

            if onsets.last().map_or(true, |&last| i - last >= min_gap) {
                onsets.push(i);
            }
        }
        onsets
    }

    /// Tempo in BPM, 0 when the envelope carries no periodicity
    pub fn estimate_tempo(&self, envelope: &[f32], frame_rate: f32) -> f32 {
        let n = envelope.len();
        if n < 4 {
            return 0.0;
        }
        let mean = envelope.iter().sum::<f32>() / n as f32;
        let centered: Vec<f32> = envelope.iter().map(|v| v - mean).collect();

        let min_lag = ((60.0 * frame_rate / self.config.max_bpm).floor() as usize).max(1);
        let max_lag = ((60.0 * frame_rate / self.config.min_bpm).ceil() as usize).min(n - 2);
        if min_lag >= max_lag {
            return 0.0;
        }

        let autocorr = |lag: usize| -> f32 {
            centered[..n - lag]
                .iter()
                .zip(&centered[lag..])
                .map(|(a, b)| a * b)
                .sum::<f32>()
                / (n - lag) as f32
        };
        let values: Vec<f32> = (0..=max_lag + 1).map(|lag| if lag < n { autocorr(lag) } else { 0.0 }).collect();

        let prior = |lag: f32| -> f32 {
            let bpm = 60.0 * frame_rate / lag;
            let octaves = (bpm / self.config.prior_bpm).log2() / self.config.prior_octaves;
            (-0.5 * octaves * octaves).exp()
        };

        let mut best_lag = 0usize;
        let mut best_score = 0.0f32;
        for lag in min_lag..=max_lag {
            let score = values[lag].max(0.0) * prior(lag as f32);
            if score > best_score {
                best_score = score;
                best_lag = lag;
            }
        }
        if best_lag == 0 {
            return 0.0;
        }

        // Parabolic refinement of the winning lag
        let (a, b, c) = (values[best_lag - 1], values[best_lag], values[best_lag + 1]);
        let denom = a - 2.0 * b + c;
        let offset = if denom.abs() > f32::EPSILON {
            (0.5 * (a - c) / denom).clamp(-0.5, 0.5)
        } else {
            0.0
        };

        60.0 * frame_rate / (best_lag as f32 + offset)
    }

    /// Frame indices of beats
    pub fn track_beats(&self, envelope: &[f32], frame_rate: f32, tempo_bpm: f32) -> Vec<usize> {
        let n = envelope.len();
        let period = 60.0 * frame_rate / tempo_bpm;
        if n == 0 || period < 1.0 {
            return Vec::new();
        }

        let std = {
            let mean = envelope.iter().sum::<f32>() / n as f32;
            (envelope.iter().map(|v| (v - mean).powi(2)).sum::<f32>() / n as f32).sqrt()
        };
        if std <= f32::EPSILON {
            return Vec::new();
        }
        let local: Vec<f32> = envelope.iter().map(|v| v / std).collect();

        let mut score = local.clone();
        let mut backlink: Vec<Option<usize>> = vec![None; n];
        let search_start = (period / 2.0).round() as usize;
        let search_end = (2.0 * period).round() as usize;

        for t in 0..n {
            let lo = t.saturating_sub(search_end);
            let hi = t.saturating_sub(search_start.max(1));
            if t < search_start.max(1) {
                continue;
            }
            let mut best: Option<(usize, f32)> = None;
            for prev in lo..=hi {
                let interval = (t - prev) as f32;
                let penalty = self.config.tightness * (interval / period).ln().powi(2);
                let candidate = score[prev] - penalty;
                if best.map_or(true, |(_, s)| candidate > s) {
                    best = Some((prev, candidate));
                }
            }
            if let Some((prev, s)) = best {
                if s > 0.0 {
                    score[t] = local[t] + s;
                    backlink[t] = Some(prev);
                }
            }
        }

        // Best-scoring frame within the final period ends the beat sequence
        let tail_start = n.saturating_sub(period.ceil() as usize);
        let mut end = tail_start;
        for t in tail_start..n {
            if score[t] > score[end] {
                end = t;
            }
        }

        let mut beats = vec![end];
        let mut current = end;
        while let Some(prev) = backlink[current] {
            beats.push(prev);
            current = prev;
        }
        beats.reverse();
        beats
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::test_signals::{click_track, sine};

    #[test]
    fn test_click_track_tempo() {
        let sample_rate = 22050;
        let clicks = click_track(120.0, 10.0, sample_rate);
        let rhythm = RhythmExtractor::default().extract(&clicks, sample_rate).unwrap();
        assert!(
            (rhythm.tempo_bpm - 120.0).abs() < 5.0,
            "expected ~120 BPM, got {}",
            rhythm.tempo_bpm
        );
    }

    #[test]
    fn test_click_track_onsets_and_beats() {
        let sample_rate = 22050;
        let clicks = click_track(120.0, 10.0, sample_rate);
        let rhythm = RhythmExtractor::default().extract(&clicks, sample_rate).unwrap();

        // 20 clicks in 10 seconds
        assert!(
            (17..=21).contains(&rhythm.onset_times.len()),
            "unexpected onset count {}",
            rhythm.onset_times.len()
        );
        assert!(rhythm.beat_times.len() >= 15);
        for pair in rhythm.beat_times.windows(2) {
            let interval = pair[1] - pair[0];
            assert!((interval - 0.5).abs() < 0.1, "beat interval {}", interval);
        }
    }

    #[test]
    fn test_steady_tone_flux_much_weaker_than_clicks() {
        let sample_rate = 22050;
        let extractor = RhythmExtractor::default();

        let tone_envelope = extractor.onset_strength(&sine(440.0, 3.0, sample_rate)).unwrap();
        let click_envelope = extractor
            .onset_strength(&click_track(120.0, 3.0, sample_rate))
            .unwrap();

        // Ignore the zero padded tail frames
        let interior = &tone_envelope[1..tone_envelope.len() - 4];
        let tone_max = interior.iter().copied().fold(0.0f32, f32::max);
        let click_max = click_envelope.iter().copied().fold(0.0f32, f32::max);
        assert!(tone_max < 0.1 * click_max, "tone {} vs clicks {}", tone_max, click_max);
    }

    #[test]
    fn test_silence() {
        let rhythm = RhythmExtractor::default()
            .extract(&vec![0.0; 22050], 22050)
            .unwrap();
        assert_eq!(rhythm.tempo_bpm, 0.0);
        assert!(rhythm.onset_times.is_empty());
        assert!(rhythm.beat_times.is_empty());
    }
}

//! Audio feature extractors
//!
//! Every extractor works on mono f32 samples at the analysis sample rate.
//! `FeatureComputer` runs the features listed in an extractor profile and
//! fills a `FeatureSet`. Features derived from the same intermediate (HPCP,
//! STFT chroma, constant-Q chroma) compute it once per signal.

pub mod chroma;
pub mod cqt;
pub mod hpcp;
pub mod key;
pub mod mfcc;
pub mod rhythm;

use acoss_common::config::FeatureKind;
use acoss_common::model::{FeatureMatrix, FeatureSet};
use acoss_common::{Error, Result};

use chroma::ChromaConfig;
use cqt::CqtConfig;
use hpcp::HpcpExtractor;
use mfcc::MfccConfig;
use rhythm::RhythmExtractor;

/// Computes a list of features over one signal
pub struct FeatureComputer {
    hpcp: HpcpExtractor,
    rhythm: RhythmExtractor,
    mfcc: MfccConfig,
    chroma: ChromaConfig,
    cqt: CqtConfig,
}

impl Default for FeatureComputer {
    fn default() -> Self {
        Self {
            hpcp: HpcpExtractor::default(),
            rhythm: RhythmExtractor::default(),
            mfcc: MfccConfig::default(),
            chroma: ChromaConfig::default(),
            cqt: CqtConfig::default(),
        }
    }
}

impl FeatureComputer {
    /// Compute `features` in order, storing results in `set`
    pub fn compute_into(
        &self,
        features: &[FeatureKind],
        samples: &[f32],
        sample_rate: u32,
        set: &mut FeatureSet,
    ) -> Result<()> {
        if samples.is_empty() {
            return Err(Error::Audio("Cannot compute features of an empty signal".to_string()));
        }

        let mut hpcp_cache: Option<FeatureMatrix> = None;
        let mut chroma_cache: Option<FeatureMatrix> = None;
        let mut cqt_cache: Option<FeatureMatrix> = None;

        for kind in features {
            tracing::trace!(feature = %kind, "Computing feature");
            match kind {
                FeatureKind::Hpcp => {
                    let hpcp = self.cached_hpcp(&mut hpcp_cache, samples, sample_rate)?;
                    set.hpcp = Some(hpcp.clone());
                }
                FeatureKind::KeyExtractor => {
                    let hpcp = self.cached_hpcp(&mut hpcp_cache, samples, sample_rate)?;
                    set.key_extractor = Some(key::estimate_key(hpcp));
                }
                FeatureKind::Rhythm => {
                    set.rhythm = Some(self.rhythm.extract(samples, sample_rate)?);
                }
                FeatureKind::MfccHtk => {
                    set.mfcc_htk = Some(mfcc::mfcc_htk(samples, sample_rate, &self.mfcc)?);
                }
                FeatureKind::ChromaStft => {
                    let chroma = self.cached_chroma(&mut chroma_cache, samples, sample_rate)?;
                    set.chroma_stft = Some(chroma.clone());
                }
                FeatureKind::ChromaCens => {
                    let chroma = self.cached_chroma(&mut chroma_cache, samples, sample_rate)?;
                    set.chroma_cens = Some(chroma::chroma_cens_from_chroma(chroma, &self.chroma));
                }
                FeatureKind::ChromaCqt => {
                    let chroma = self.cached_cqt(&mut cqt_cache, samples, sample_rate)?;
                    set.chroma_cqt = Some(chroma.clone());
                }
                FeatureKind::ChromaCqtProcessed => {
                    let chroma = self.cached_cqt(&mut cqt_cache, samples, sample_rate)?;
                    set.chroma_cqt_processed = Some(cqt::chroma_cqt_processed(chroma, &self.cqt));
                }
            }
        }

        Ok(())
    }

    fn cached_hpcp<'a>(
        &self,
        cache: &'a mut Option<FeatureMatrix>,
        samples: &[f32],
        sample_rate: u32,
    ) -> Result<&'a FeatureMatrix> {
        if cache.is_none() {
            *cache = Some(self.hpcp.extract(samples, sample_rate)?);
        }
        cache
            .as_ref()
            .ok_or_else(|| Error::Internal("HPCP cache empty".to_string()))
    }

    fn cached_chroma<'a>(
        &self,
        cache: &'a mut Option<FeatureMatrix>,
        samples: &[f32],
        sample_rate: u32,
    ) -> Result<&'a FeatureMatrix> {
        if cache.is_none() {
            *cache = Some(chroma::chroma_stft(samples, sample_rate, &self.chroma)?);
        }
        cache
            .as_ref()
            .ok_or_else(|| Error::Internal("chroma cache empty".to_string()))
    }

    fn cached_cqt<'a>(
        &self,
        cache: &'a mut Option<FeatureMatrix>,
        samples: &[f32],
        sample_rate: u32,
    ) -> Result<&'a FeatureMatrix> {
        if cache.is_none() {
            *cache = Some(cqt::chroma_cqt(samples, sample_rate, &self.cqt)?);
        }
        cache
            .as_ref()
            .ok_or_else(|| Error::Internal("constant-Q chroma cache empty".to_string()))
    }
}

#[cfg(test)]
pub(crate) mod test_signals {
    use std::f32::consts::PI;

    pub fn sine(frequency: f32, duration_secs: f32, sample_rate: u32) -> Vec<f32> {
        let num_samples = (duration_secs * sample_rate as f32) as usize;
        (0..num_samples)
            .map(|i| {
                let t = i as f32 / sample_rate as f32;
                (2.0 * PI * frequency * t).sin() * 0.5
            })
            .collect()
    }

    /// Mix equal-length signals, scaled to avoid clipping
    pub fn sum_signals(signals: &[Vec<f32>]) -> Vec<f32> {
        let len = signals.iter().map(Vec::len).min().unwrap_or(0);
        let scale = 1.0 / signals.len().max(1) as f32;
        (0..len)
            .map(|i| signals.iter().map(|s| s[i]).sum::<f32>() * scale)
            .collect()
    }

    /// Unit impulses at a steady tempo, first click at 0.1 s
    pub fn click_track(bpm: f32, duration_secs: f32, sample_rate: u32) -> Vec<f32> {
        let num_samples = (duration_secs * sample_rate as f32) as usize;
        let mut samples = vec![0.0f32; num_samples];
        let interval = 60.0 / bpm;
        let mut t = 0.1f32;
        while t < duration_secs {
            let idx = (t * sample_rate as f32) as usize;
            if idx < num_samples {
                samples[idx] = 1.0;
            }
            t += interval;
        }
        samples
    }
}

#[cfg(test)]
mod tests {
    use super::test_signals::sine;
    use super::*;

    #[test]
    fn test_only_requested_features_present() {
        let computer = FeatureComputer::default();
        let mut set = FeatureSet::new("t", "w", 22050);
        computer
            .compute_into(
                &[FeatureKind::KeyExtractor, FeatureKind::ChromaCens],
                &sine(440.0, 1.0, 22050),
                22050,
                &mut set,
            )
            .unwrap();

        assert!(set.key_extractor.is_some());
        assert!(set.chroma_cens.is_some());
        assert!(set.hpcp.is_none());
        assert!(set.chroma_stft.is_none());
        assert!(set.rhythm.is_none());
    }

    #[test]
    fn test_cqt_variants_share_frames() {
        let computer = FeatureComputer::default();
        let mut set = FeatureSet::new("t", "w", 22050);
        computer
            .compute_into(
                &[FeatureKind::ChromaCqtProcessed, FeatureKind::ChromaCqt],
                &sine(392.0, 2.0, 22050),
                22050,
                &mut set,
            )
            .unwrap();

        let raw = set.chroma_cqt.as_ref().unwrap();
        let processed = set.chroma_cqt_processed.as_ref().unwrap();
        assert_eq!(raw.len(), processed.len());
        assert!(set.chroma_stft.is_none());
        assert_eq!(set.chroma(FeatureKind::ChromaCqtProcessed).unwrap()[3][7], 1.0);
    }

    #[test]
    fn test_empty_signal_rejected() {
        let computer = FeatureComputer::default();
        let mut set = FeatureSet::new("t", "w", 22050);
        let result = computer.compute_into(&[FeatureKind::Hpcp], &[], 22050, &mut set);
        assert!(matches!(result, Err(Error::Audio(_))));
    }
}

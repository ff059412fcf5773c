//! Pitch, jitter and shimmer estimation.
//!
//! No real estimator exists yet. [`PlaceholderProsodyEstimator`] fills the
//! summary with pseudo-random values in plausible human ranges so the rest of
//! the pipeline can be exercised; swap in a real [`ProsodyEstimator`] without
//! touching aggregation or scoring.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

/// Per-submission prosody summary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProsodySummary {
    /// Mean fundamental frequency (Hz)
    pub pitch_mean: f64,
    pub pitch_variance: f64,
    /// Max minus min fundamental frequency (Hz)
    pub pitch_range: f64,
    /// Relative cycle-to-cycle period variation
    pub jitter: f64,
    /// Relative cycle-to-cycle amplitude variation
    pub shimmer: f64,
    /// Syllables per second, when known
    #[serde(default)]
    pub speaking_rate: Option<f64>,
}

pub trait ProsodyEstimator: Send + Sync {
    fn estimate(&self, samples: &[f32], sample_rate: u32) -> Option<ProsodySummary>;

    /// True for estimators whose output is not derived from the signal.
    fn is_placeholder(&self) -> bool {
        false
    }
}

/// UNIMPLEMENTED estimator: output is random and carries no identity signal.
#[derive(Debug, Clone, Default)]
pub struct PlaceholderProsodyEstimator {
    seed: Option<u64>,
}

impl PlaceholderProsodyEstimator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reproducible output, for tests that need stable plumbing.
    pub fn seeded(seed: u64) -> Self {
        Self { seed: Some(seed) }
    }
}

impl ProsodyEstimator for PlaceholderProsodyEstimator {
    fn estimate(&self, samples: &[f32], sample_rate: u32) -> Option<ProsodySummary> {
        if samples.is_empty() || sample_rate == 0 {
            return None;
        }
        let mut rng = match self.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_rng(&mut rand::rng()),
        };
        let pitch_mean = rng.random_range(85.0..255.0);
        let pitch_range = rng.random_range(20.0..120.0);
        Some(ProsodySummary {
            pitch_mean,
            pitch_variance: rng.random_range(50.0..900.0),
            pitch_range,
            jitter: rng.random_range(0.002..0.02),
            shimmer: rng.random_range(0.02..0.1),
            speaking_rate: None,
        })
    }

    fn is_placeholder(&self) -> bool {
        true
    }
}

/// Estimator that never produces a summary; scoring falls back to its
/// neutral pitch similarity.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoProsody;

impl ProsodyEstimator for NoProsody {
    fn estimate(&self, _samples: &[f32], _sample_rate: u32) -> Option<ProsodySummary> {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_placeholder_is_labelled() {
        assert!(PlaceholderProsodyEstimator::new().is_placeholder());
        assert!(!NoProsody.is_placeholder());
    }

    #[test]
    fn test_placeholder_produces_summary_for_audio() {
        let est = PlaceholderProsodyEstimator::seeded(7);
        assert!(est.estimate(&[0.1; 128], 16000).is_some());
        assert!(est.estimate(&[], 16000).is_none());
    }

    #[test]
    fn test_seeded_placeholder_is_stable() {
        let est = PlaceholderProsodyEstimator::seeded(42);
        assert_eq!(est.estimate(&[0.1; 16], 8000), est.estimate(&[0.1; 16], 8000));
    }

    #[test]
    fn test_no_prosody() {
        assert!(NoProsody.estimate(&[0.1; 128], 16000).is_none());
    }
}

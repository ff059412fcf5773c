//! Voice Profile - Statistical summary of one recording
//!
//! Collapses a variable number of frames into a fixed-shape profile of
//! per-descriptor mean and population variance. Accumulation keeps only sums
//! and sums of squares, so partial accumulators built on different workers
//! can be merged in any order.

use super::voice::AudioFrameFeatures;
use crate::audio::prosody::ProsodySummary;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("cannot aggregate an empty frame sequence")]
pub struct EmptyInputError;

// =============================================================================
// Profile
// =============================================================================

/// Mean and population variance of one descriptor.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct DescriptorStats {
    pub mean: f64,
    pub variance: f64,
}

impl DescriptorStats {
    fn from_sums(sum: f64, sum_sq: f64, n: f64) -> Self {
        let mean = sum / n;
        // Cancellation can leave a tiny negative remainder.
        let variance = (sum_sq / n - mean * mean).max(0.0);
        Self { mean, variance }
    }
}

/// Aggregated voice profile of one submission.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregatedVoiceProfile {
    /// Frames that contributed
    pub frame_count: usize,
    /// Of which placeholder frames
    #[serde(default)]
    pub synthetic_frames: usize,
    pub mfcc_mean: Vec<f64>,
    pub mfcc_variance: Vec<f64>,
    pub spectral_centroid: DescriptorStats,
    pub spectral_flatness: DescriptorStats,
    pub spectral_rolloff: DescriptorStats,
    pub spectral_flux: DescriptorStats,
    pub perceptual_spread: DescriptorStats,
    pub perceptual_sharpness: DescriptorStats,
    pub spectral_kurtosis: DescriptorStats,
    pub zcr: DescriptorStats,
    pub rms: DescriptorStats,
    pub energy: DescriptorStats,
    /// Submission-level pitch/jitter/shimmer summary
    #[serde(default)]
    pub prosody: Option<ProsodySummary>,
}

impl AggregatedVoiceProfile {
    /// Attach the submission's prosody summary.
    pub fn with_prosody(mut self, prosody: ProsodySummary) -> Self {
        self.prosody = Some(prosody);
        self
    }

    /// Share of frames that were placeholders.
    pub fn synthetic_ratio(&self) -> f64 {
        if self.frame_count == 0 {
            return 0.0;
        }
        self.synthetic_frames as f64 / self.frame_count as f64
    }
}

// =============================================================================
// Accumulator
// =============================================================================

const SCALARS: usize = 10;

fn scalars(frame: &AudioFrameFeatures) -> [f64; SCALARS] {
    [
        frame.spectral_centroid,
        frame.spectral_flatness,
        frame.spectral_rolloff,
        frame.spectral_flux,
        frame.perceptual_spread,
        frame.perceptual_sharpness,
        frame.spectral_kurtosis,
        frame.zcr,
        frame.rms,
        frame.energy,
    ]
}

/// Running sums over frames.
#[derive(Debug, Clone, Default)]
pub struct ProfileAccumulator {
    count: usize,
    synthetic: usize,
    sum: [f64; SCALARS],
    sum_sq: [f64; SCALARS],
    mfcc_sum: Vec<f64>,
    mfcc_sum_sq: Vec<f64>,
    /// Frames that carried each MFCC index
    mfcc_count: Vec<usize>,
}

impl ProfileAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.count
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    pub fn push(&mut self, frame: &AudioFrameFeatures) {
        self.count += 1;
        if frame.synthetic {
            self.synthetic += 1;
        }
        for (i, v) in scalars(frame).into_iter().enumerate() {
            self.sum[i] += v;
            self.sum_sq[i] += v * v;
        }

        self.grow_mfcc(frame.mfcc.len());
        for (i, &c) in frame.mfcc.iter().enumerate() {
            self.mfcc_sum[i] += c;
            self.mfcc_sum_sq[i] += c * c;
            self.mfcc_count[i] += 1;
        }
    }

    /// Fold another accumulator into this one.
    pub fn merge(&mut self, other: &ProfileAccumulator) {
        self.count += other.count;
        self.synthetic += other.synthetic;
        for i in 0..SCALARS {
            self.sum[i] += other.sum[i];
            self.sum_sq[i] += other.sum_sq[i];
        }

        self.grow_mfcc(other.mfcc_sum.len());
        for i in 0..other.mfcc_sum.len() {
            self.mfcc_sum[i] += other.mfcc_sum[i];
            self.mfcc_sum_sq[i] += other.mfcc_sum_sq[i];
            self.mfcc_count[i] += other.mfcc_count[i];
        }
    }

    pub fn finish(&self) -> Result<AggregatedVoiceProfile, EmptyInputError> {
        if self.count == 0 {
            return Err(EmptyInputError);
        }
        let n = self.count as f64;
        let stats: Vec<DescriptorStats> = (0..SCALARS)
            .map(|i| DescriptorStats::from_sums(self.sum[i], self.sum_sq[i], n))
            .collect();

        let mfcc: Vec<DescriptorStats> = (0..self.mfcc_sum.len())
            .map(|i| {
                DescriptorStats::from_sums(
                    self.mfcc_sum[i],
                    self.mfcc_sum_sq[i],
                    self.mfcc_count[i].max(1) as f64,
                )
            })
            .collect();

        Ok(AggregatedVoiceProfile {
            frame_count: self.count,
            synthetic_frames: self.synthetic,
            mfcc_mean: mfcc.iter().map(|s| s.mean).collect(),
            mfcc_variance: mfcc.iter().map(|s| s.variance).collect(),
            spectral_centroid: stats[0],
            spectral_flatness: stats[1],
            spectral_rolloff: stats[2],
            spectral_flux: stats[3],
            perceptual_spread: stats[4],
            perceptual_sharpness: stats[5],
            spectral_kurtosis: stats[6],
            zcr: stats[7],
            rms: stats[8],
            energy: stats[9],
            prosody: None,
        })
    }

    fn grow_mfcc(&mut self, len: usize) {
        if len > self.mfcc_sum.len() {
            self.mfcc_sum.resize(len, 0.0);
            self.mfcc_sum_sq.resize(len, 0.0);
            self.mfcc_count.resize(len, 0);
        }
    }
}

/// Aggregate frames into a profile. Zero frames is an error.
pub fn aggregate_voice_features(
    frames: &[AudioFrameFeatures],
) -> Result<AggregatedVoiceProfile, EmptyInputError> {
    let mut acc = ProfileAccumulator::new();
    for frame in frames {
        acc.push(frame);
    }
    acc.finish()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame(scale: f64) -> AudioFrameFeatures {
        AudioFrameFeatures {
            mfcc: vec![scale, -scale, 2.0 * scale],
            spectral_centroid: 1000.0 * scale,
            spectral_flatness: 0.1 * scale,
            spectral_rolloff: 0.3,
            spectral_flux: 0.05 * scale,
            perceptual_spread: 0.5,
            perceptual_sharpness: 1.0 + scale,
            spectral_kurtosis: 3.0,
            zcr: 20.0 * scale,
            rms: 0.1 * scale,
            energy: 2.0 * scale,
            synthetic: false,
        }
    }

    #[test]
    fn test_empty_input_is_error() {
        assert_eq!(aggregate_voice_features(&[]), Err(EmptyInputError));
        assert!(ProfileAccumulator::new().finish().is_err());
    }

    #[test]
    fn test_single_frame_has_zero_variance() {
        let profile = aggregate_voice_features(&[frame(0.37)]).unwrap();
        assert_eq!(profile.frame_count, 1);
        assert!((profile.spectral_centroid.mean - 370.0).abs() < 1e-9);
        for stats in [
            profile.spectral_centroid,
            profile.spectral_flatness,
            profile.spectral_rolloff,
            profile.spectral_flux,
            profile.perceptual_spread,
            profile.perceptual_sharpness,
            profile.spectral_kurtosis,
            profile.zcr,
            profile.rms,
            profile.energy,
        ] {
            assert_eq!(stats.variance, 0.0);
        }
        assert!(profile.mfcc_variance.iter().all(|&v| v == 0.0));
    }

    #[test]
    fn test_population_variance() {
        let profile = aggregate_voice_features(&[frame(1.0), frame(3.0)]).unwrap();
        assert_eq!(profile.zcr.mean, 40.0);
        // values 20 and 60: population variance 400
        assert!((profile.zcr.variance - 400.0).abs() < 1e-9);
        assert_eq!(profile.mfcc_mean, vec![2.0, -2.0, 4.0]);
    }

    #[test]
    fn test_variance_never_negative() {
        let frames: Vec<_> = (0..50).map(|_| frame(0.1)).collect();
        let profile = aggregate_voice_features(&frames).unwrap();
        assert!(profile.spectral_flatness.variance >= 0.0);
        assert!(profile.rms.variance >= 0.0);
        assert!(profile.mfcc_variance.iter().all(|&v| v >= 0.0));
    }

    #[test]
    fn test_merge_matches_single_pass() {
        let frames: Vec<_> = [1.0, 2.0, 4.0, 8.0].iter().map(|&s| frame(s)).collect();
        let whole = aggregate_voice_features(&frames).unwrap();

        let mut left = ProfileAccumulator::new();
        left.push(&frames[2]);
        left.push(&frames[3]);
        let mut right = ProfileAccumulator::new();
        right.push(&frames[1]);
        right.push(&frames[0]);
        right.merge(&left);
        let merged = right.finish().unwrap();

        assert_eq!(merged.frame_count, whole.frame_count);
        assert!((merged.energy.mean - whole.energy.mean).abs() < 1e-12);
        assert!((merged.energy.variance - whole.energy.variance).abs() < 1e-9);
        for (a, b) in merged.mfcc_mean.iter().zip(&whole.mfcc_mean) {
            assert!((a - b).abs() < 1e-12);
        }
    }

    #[test]
    fn test_ragged_mfcc_uses_per_index_counts() {
        let mut short = frame(1.0);
        short.mfcc = vec![4.0];
        let profile = aggregate_voice_features(&[short, frame(1.0)]).unwrap();
        assert_eq!(profile.mfcc_mean.len(), 3);
        assert_eq!(profile.mfcc_mean[0], 2.5);
        assert_eq!(profile.mfcc_mean[1], -1.0);
    }

    #[test]
    fn test_synthetic_frames_counted() {
        let mut fake = frame(1.0);
        fake.synthetic = true;
        let profile = aggregate_voice_features(&[fake, frame(1.0)]).unwrap();
        assert_eq!(profile.synthetic_frames, 1);
        assert_eq!(profile.synthetic_ratio(), 0.5);
    }

    #[test]
    fn test_prosody_attached_once() {
        let summary = ProsodySummary {
            pitch_mean: 120.0,
            pitch_variance: 200.0,
            pitch_range: 60.0,
            jitter: 0.01,
            shimmer: 0.05,
            speaking_rate: None,
        };
        let profile = aggregate_voice_features(&[frame(1.0)])
            .unwrap()
            .with_prosody(summary.clone());
        assert_eq!(profile.prosody, Some(summary));
    }
}

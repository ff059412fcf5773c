//! Voice Fingerprint - Per-frame acoustic descriptors
//!
//! Slices a mono recording into overlapping frames and asks the descriptor
//! backend for each frame's spectral shape, loudness and zero-crossing data.
//!
//! # Failure isolation
//!
//! A frame whose descriptors cannot be computed is replaced by a synthetic
//! placeholder frame and processing continues. One bad frame never fails
//! the submission.

use crate::audio::descriptors::{
    Descriptor, DescriptorError, DescriptorExtractor, DescriptorSet, FrameInput,
};
use crate::config::VoiceConfig;
use rand::Rng;
use serde::{Deserialize, Serialize};

// =============================================================================
// Frame Features
// =============================================================================

/// Descriptors for one analysis frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AudioFrameFeatures {
    pub mfcc: Vec<f64>,
    /// Hz
    pub spectral_centroid: f64,
    pub spectral_flatness: f64,
    /// Fraction of the Nyquist frequency
    pub spectral_rolloff: f64,
    pub spectral_flux: f64,
    pub perceptual_spread: f64,
    pub perceptual_sharpness: f64,
    pub spectral_kurtosis: f64,
    /// Zero crossings in the frame
    pub zcr: f64,
    pub rms: f64,
    pub energy: f64,
    /// Placeholder values, not derived from the signal
    #[serde(default)]
    pub synthetic: bool,
}

impl AudioFrameFeatures {
    pub fn from_descriptors(set: &DescriptorSet) -> Result<Self, DescriptorError> {
        Ok(Self {
            mfcc: set.vector(Descriptor::Mfcc)?.to_vec(),
            spectral_centroid: set.scalar(Descriptor::SpectralCentroid)?,
            spectral_flatness: set.scalar(Descriptor::SpectralFlatness)?,
            spectral_rolloff: set.scalar(Descriptor::SpectralRolloff)?,
            spectral_flux: set.scalar(Descriptor::SpectralFlux)?,
            perceptual_spread: set.scalar(Descriptor::PerceptualSpread)?,
            perceptual_sharpness: set.scalar(Descriptor::PerceptualSharpness)?,
            spectral_kurtosis: set.scalar(Descriptor::SpectralKurtosis)?,
            zcr: set.scalar(Descriptor::Zcr)?,
            rms: set.scalar(Descriptor::Rms)?,
            energy: set.scalar(Descriptor::Energy)?,
            synthetic: false,
        })
    }

    /// Stand-in frame with values drawn from typical speech ranges.
    pub fn placeholder<R: Rng>(mfcc_len: usize, rng: &mut R) -> Self {
        Self {
            mfcc: (0..mfcc_len).map(|_| rng.random_range(-20.0..20.0)).collect(),
            spectral_centroid: rng.random_range(500.0..3000.0),
            spectral_flatness: rng.random_range(0.0..0.5),
            spectral_rolloff: rng.random_range(0.1..0.6),
            spectral_flux: rng.random_range(0.0..1.0),
            perceptual_spread: rng.random_range(0.3..0.9),
            perceptual_sharpness: rng.random_range(0.5..2.0),
            spectral_kurtosis: rng.random_range(1.0..10.0),
            zcr: rng.random_range(10.0..100.0),
            rms: rng.random_range(0.01..0.3),
            energy: rng.random_range(0.1..20.0),
            synthetic: true,
        }
    }
}

// =============================================================================
// Frame Extraction
// =============================================================================

/// Number of frames analysed for `sample_count` samples.
pub fn frame_count(sample_count: usize, config: &VoiceConfig) -> usize {
    if config.hop_size == 0 || sample_count < config.frame_size {
        return 0;
    }
    ((sample_count - config.frame_size) / config.hop_size).min(config.max_frames)
}

/// Split `samples` into frames and compute descriptors for each.
///
/// Returns at most `config.max_frames` frames. Backend failures are logged
/// and replaced by placeholder frames drawn from `rng`.
pub fn extract_voice_frames<R: Rng>(
    samples: &[f32],
    sample_rate: u32,
    config: &VoiceConfig,
    extractor: &dyn DescriptorExtractor,
    rng: &mut R,
) -> Vec<AudioFrameFeatures> {
    let count = frame_count(samples.len(), config);
    let available = if config.hop_size == 0 || samples.len() < config.frame_size {
        0
    } else {
        (samples.len() - config.frame_size) / config.hop_size
    };
    if available > count {
        log::debug!(
            "voice frames: capped at {} of {} available frames",
            count,
            available
        );
    }

    let mut frames = Vec::with_capacity(count);
    let mut substituted = 0usize;

    for index in 0..count {
        let start = index * config.hop_size;
        let previous = index
            .checked_sub(1)
            .map(|p| &samples[p * config.hop_size..p * config.hop_size + config.frame_size]);
        let input = FrameInput {
            index,
            samples: &samples[start..start + config.frame_size],
            previous,
            sample_rate,
        };

        let features = extractor
            .extract(&input, &Descriptor::ALL)
            .and_then(|set| AudioFrameFeatures::from_descriptors(&set));

        match features {
            Ok(f) => frames.push(f),
            Err(e) => {
                log::warn!("voice frames: frame {index} failed ({e}), substituting placeholder");
                substituted += 1;
                frames.push(AudioFrameFeatures::placeholder(config.mfcc_coefficients, rng));
            }
        }
    }

    if substituted > 0 {
        log::info!(
            "voice frames: {substituted} of {} frames are placeholders",
            frames.len()
        );
    }

    frames
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::descriptors::{SpectralAnalyzer, StubDescriptors};
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn config() -> VoiceConfig {
        VoiceConfig {
            frame_size: 256,
            hop_size: 128,
            max_frames: 1000,
            mfcc_coefficients: 13,
        }
    }

    #[test]
    fn test_frame_count_formula() {
        let cfg = config();
        assert_eq!(frame_count(100, &cfg), 0);
        assert_eq!(frame_count(256, &cfg), 0);
        assert_eq!(frame_count(384, &cfg), 1);
        assert_eq!(frame_count(256 + 128 * 10, &cfg), 10);
    }

    #[test]
    fn test_frame_cap_bounds_output() {
        let cfg = VoiceConfig {
            max_frames: 5,
            ..config()
        };
        let samples = vec![0.1f32; 256 + 128 * 50];
        let stub = StubDescriptors::new(13);
        let frames = extract_voice_frames(&samples, 16000, &cfg, &stub, &mut rand::rng());
        assert_eq!(frames.len(), 5);
    }

    #[test]
    fn test_short_input_yields_no_frames() {
        let stub = StubDescriptors::new(13);
        let frames = extract_voice_frames(&[0.2; 64], 16000, &config(), &stub, &mut rand::rng());
        assert!(frames.is_empty());
    }

    #[test]
    fn test_failed_frames_are_substituted() {
        let stub = StubDescriptors::new(13).failing_on([1, 3]);
        let samples = vec![0.1f32; 256 + 128 * 6];
        let frames = extract_voice_frames(&samples, 16000, &config(), &stub, &mut rand::rng());

        assert_eq!(frames.len(), 6);
        let synthetic: Vec<usize> = frames
            .iter()
            .enumerate()
            .filter(|(_, f)| f.synthetic)
            .map(|(i, _)| i)
            .collect();
        assert_eq!(synthetic, vec![1, 3]);
        assert!(frames.iter().all(|f| f.mfcc.len() == 13));
    }

    #[test]
    fn test_seeded_substitution_is_reproducible() {
        let stub = StubDescriptors::new(13).failing_on([0, 2]);
        let samples = vec![0.1f32; 256 + 128 * 4];
        let run = |seed| {
            let mut rng = StdRng::seed_from_u64(seed);
            extract_voice_frames(&samples, 16000, &config(), &stub, &mut rng)
        };

        let first = run(42);
        assert_eq!(first, run(42));
        assert_ne!(first[0], run(43)[0]);
        assert_eq!(first[1], run(43)[1]);
    }

    #[test]
    fn test_stub_frames_carry_stub_values() {
        let samples = vec![0.1f32; 256 + 128 * 2];
        let stub = StubDescriptors::new(13);
        let frames = extract_voice_frames(&samples, 16000, &config(), &stub, &mut rand::rng());
        assert_eq!(frames[0].spectral_centroid, 1200.0);
        assert_eq!(frames[1].zcr, 40.0);
        assert!(!frames[0].synthetic);
    }

    #[test]
    fn test_analyzer_frames_from_tone() {
        let samples: Vec<f32> = (0..256 + 128 * 8)
            .map(|i| (i as f32 * 0.2).sin() * 0.3)
            .collect();
        let analyzer = SpectralAnalyzer::new(256, 13);
        let frames =
            extract_voice_frames(&samples, 16000, &config(), &analyzer, &mut rand::rng());
        assert_eq!(frames.len(), 8);
        assert!(frames.iter().all(|f| !f.synthetic && f.rms > 0.0));
    }
}

//! Behavioral Fingerprinting Module
//!
//! Turns raw behavioral input into fixed-shape numeric fingerprints:
//!
//! - **Keystroke**: hold, down-down and flight timings from key transitions,
//!   encoded to a fixed-length vector for the model service
//! - **Voice**: per-frame acoustic descriptors, aggregated into a
//!   mean/variance profile and scored against an enrolled reference
//!
//! # Privacy Model
//!
//! - Keystroke fingerprints capture *how* you type, never which keys form the
//!   password beyond the corrective key count
//! - Raw timing arrays are withheld from the model service in privacy mode
//! - Voice profiles hold statistics only, no audio
//!
//! # Usage
//!
//! ```rust,ignore
//! use biokey_core::fingerprint::{
//!     aggregate_voice_features, compare_profiles, extract_voice_frames,
//! };
//!
//! let analyzer = SpectralAnalyzer::new(512, 13);
//! let frames = extract_voice_frames(&samples, 16000, &config.voice, &analyzer, &mut rand::rng());
//! let profile = aggregate_voice_features(&frames)?;
//! let result = compare_profiles(&profile, &enrolled, &config.scoring);
//! ```

pub mod comparison;
pub mod keystroke;
pub mod profile;
pub mod voice;

pub use comparison::{
    compare_profiles, profile_similarity, DetailedMetrics, EnrolledProfile, MatchVerdict,
    ProfileMatcher, ScoringConfig, SimilarityResult,
};
pub use keystroke::{
    extract_keystroke_features, DerivedKeystrokeFeatures, KeyEvent, KeyTransition,
    KeystrokeFeatureVector, KeystrokeSession, RawTimings,
};
pub use profile::{
    aggregate_voice_features, AggregatedVoiceProfile, DescriptorStats, EmptyInputError,
    ProfileAccumulator,
};
pub use voice::{extract_voice_frames, AudioFrameFeatures};

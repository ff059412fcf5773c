pub mod audio;
pub mod config;
pub mod engine;
pub mod fingerprint;
pub mod service;

// Re-export common types
pub use crate::audio::{
    quick_validate, AudioDecoder, DescriptorExtractor, ProsodyEstimator, WavDecoder,
};
pub use crate::config::BiokeyConfig;
pub use crate::engine::{AuthDecision, Authenticator, VoiceEngine, VoiceError};
pub use crate::fingerprint::{
    aggregate_voice_features, compare_profiles, extract_keystroke_features, extract_voice_frames,
    profile_similarity, AggregatedVoiceProfile, AudioFrameFeatures, EmptyInputError, KeyEvent,
    KeystrokeFeatureVector, KeystrokeSession, ScoringConfig, SimilarityResult,
};
pub use crate::service::{HttpModelService, ModelService, ServiceError};

//! Audio capabilities consumed by the voice pipeline:
//! decoding, per-frame descriptors, prosody estimation and the quick
//! pre-check.

pub mod decode;
pub mod descriptors;
pub mod prosody;
pub mod validate;

pub use decode::{AudioDecoder, DecodeError, DecodedAudio, WavDecoder};
pub use descriptors::{
    Descriptor, DescriptorError, DescriptorExtractor, DescriptorSet, DescriptorValue, FrameInput,
    SpectralAnalyzer, StubDescriptors,
};
pub use prosody::{NoProsody, PlaceholderProsodyEstimator, ProsodyEstimator, ProsodySummary};
pub use validate::quick_validate;

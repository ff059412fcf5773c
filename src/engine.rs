//! Orchestration of the voice and keystroke pipelines.
//!
//! [`VoiceEngine`] runs one submission (decode, frame, aggregate) as a single
//! awaited unit on tokio's blocking pool. [`Authenticator`] talks to the
//! model service and owns the policy that turns transport faults into plain
//! rejections.

use crate::audio::decode::{AudioDecoder, DecodeError, WavDecoder};
use crate::audio::descriptors::{DescriptorExtractor, SpectralAnalyzer};
use crate::audio::prosody::{NoProsody, ProsodyEstimator};
use crate::audio::validate::quick_validate;
use crate::config::{AuthConfig, BiokeyConfig, KeystrokeConfig, ValidationConfig, VoiceConfig};
use crate::fingerprint::comparison::{compare_profiles, ScoringConfig, SimilarityResult};
use crate::fingerprint::keystroke::{extract_keystroke_features, KeystrokeSession};
use crate::fingerprint::profile::{
    aggregate_voice_features, AggregatedVoiceProfile, EmptyInputError,
};
use crate::fingerprint::voice::extract_voice_frames;
use crate::service::{AuthRequest, EnrollmentRequest, ModelService};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;
use tokio::time::Instant;

// =============================================================================
// Voice Engine
// =============================================================================

#[derive(Debug, Error)]
pub enum VoiceError {
    #[error(transparent)]
    Decode(#[from] DecodeError),
    #[error("recording too short for analysis: {0}")]
    EmptyInput(#[from] EmptyInputError),
    #[error("voice processing task failed: {0}")]
    Task(String),
}

/// Voice submission pipeline with swappable capabilities.
#[derive(Clone)]
pub struct VoiceEngine {
    decoder: Arc<dyn AudioDecoder>,
    extractor: Arc<dyn DescriptorExtractor>,
    prosody: Arc<dyn ProsodyEstimator>,
    voice: VoiceConfig,
    validation: ValidationConfig,
    scoring: ScoringConfig,
}

impl VoiceEngine {
    /// WAV decoding, FFT descriptors and no prosody estimation.
    pub fn new(config: &BiokeyConfig) -> Self {
        Self {
            decoder: Arc::new(WavDecoder),
            extractor: Arc::new(SpectralAnalyzer::new(
                config.voice.frame_size,
                config.voice.mfcc_coefficients,
            )),
            prosody: Arc::new(NoProsody),
            voice: config.voice.clone(),
            validation: config.validation.clone(),
            scoring: config.scoring.clone(),
        }
    }

    pub fn with_decoder(mut self, decoder: Arc<dyn AudioDecoder>) -> Self {
        self.decoder = decoder;
        self
    }

    pub fn with_extractor(mut self, extractor: Arc<dyn DescriptorExtractor>) -> Self {
        self.extractor = extractor;
        self
    }

    pub fn with_prosody(mut self, prosody: Arc<dyn ProsodyEstimator>) -> Self {
        self.prosody = prosody;
        self
    }

    /// Cheap pre-check; see [`quick_validate`].
    pub fn quick_check(&self, blob: &[u8]) -> bool {
        quick_validate(blob, self.decoder.as_ref(), &self.validation)
    }

    /// Decode, frame and aggregate one recording.
    pub async fn process(&self, blob: Vec<u8>) -> Result<AggregatedVoiceProfile, VoiceError> {
        let engine = self.clone();
        tokio::task::spawn_blocking(move || engine.process_blocking(&blob))
            .await
            .map_err(|e| VoiceError::Task(e.to_string()))?
    }

    /// Process a recording and score it against an enrolled reference.
    pub async fn verify(
        &self,
        blob: Vec<u8>,
        reference: &AggregatedVoiceProfile,
    ) -> Result<SimilarityResult, VoiceError> {
        let candidate = self.process(blob).await?;
        let result = compare_profiles(&candidate, reference, &self.scoring);
        log::info!(
            "voice verification: similarity {:.3}, confidence {:.3} ({:?})",
            result.overall_similarity,
            result.confidence_score,
            result.verdict
        );
        Ok(result)
    }

    fn process_blocking(&self, blob: &[u8]) -> Result<AggregatedVoiceProfile, VoiceError> {
        let audio = self.decoder.decode(blob)?;
        let frames = extract_voice_frames(
            &audio.samples,
            audio.sample_rate,
            &self.voice,
            self.extractor.as_ref(),
            &mut rand::rng(),
        );
        let mut profile = aggregate_voice_features(&frames)?;

        if self.prosody.is_placeholder() {
            log::warn!(
                "voice processing: prosody estimator is a placeholder, pitch scores carry no signal"
            );
        }
        if let Some(summary) = self.prosody.estimate(&audio.samples, audio.sample_rate) {
            profile = profile.with_prosody(summary);
        }

        log::debug!(
            "voice processing: {} frames ({} synthetic) from {:.2}s of audio",
            profile.frame_count,
            profile.synthetic_frames,
            audio.duration_secs
        );
        Ok(profile)
    }
}

// =============================================================================
// Keystroke Authenticator
// =============================================================================

/// Outcome of an authentication attempt. A transport fault and a genuine
/// mismatch both yield `Rejected`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AuthDecision {
    Accepted,
    Rejected,
}

impl AuthDecision {
    pub fn is_accepted(&self) -> bool {
        matches!(self, Self::Accepted)
    }
}

pub struct Authenticator<S: ModelService> {
    service: S,
    keystroke: KeystrokeConfig,
    auth: AuthConfig,
}

impl<S: ModelService> Authenticator<S> {
    pub fn new(service: S, config: &BiokeyConfig) -> Self {
        Self {
            service,
            keystroke: config.keystroke.clone(),
            auth: config.auth.clone(),
        }
    }

    pub fn service(&self) -> &S {
        &self.service
    }

    /// Build the enrollment payload for one typed sample.
    ///
    /// `sample_count` is the number of enrollment samples submitted for this
    /// identity, this one included.
    pub fn enrollment_request(
        &self,
        session: &KeystrokeSession,
        sample_count: usize,
    ) -> EnrollmentRequest {
        let features = extract_keystroke_features(&session.snapshot(), &self.keystroke);
        EnrollmentRequest {
            raw_timing_arrays: (!self.auth.privacy_mode).then(|| features.raw_timings()),
            derived_features: features.derived(),
            encoded_features: features.encoded,
            sample_count,
        }
    }

    /// Submit one enrollment sample. Returns whether the service stored it;
    /// transport errors are logged and count as not stored.
    pub async fn enroll(&self, session: &KeystrokeSession, sample_count: usize) -> bool {
        let request = self.enrollment_request(session, sample_count);
        match self.service.enroll(&request).await {
            Ok(response) => {
                log::info!(
                    "enrollment sample {sample_count} {}",
                    if response.success { "accepted" } else { "refused" }
                );
                response.success
            }
            Err(e) => {
                log::warn!("enrollment via {} failed: {e}", self.service.name());
                false
            }
        }
    }

    /// Score a typed attempt against the enrolled model.
    ///
    /// Never fails: transport errors become [`AuthDecision::Rejected`]. The
    /// service call is bounded by the configured decision window and every
    /// decision resolves exactly at the end of that window, whatever the
    /// service did. A response arriving after the window is a rejection. The
    /// session is only read, so dropping this future mid-flight leaves it
    /// untouched.
    pub async fn authenticate(
        &self,
        session: &KeystrokeSession,
        claimed_identity: &str,
        fallback_credential: &str,
        voice_similarity: Option<f64>,
    ) -> AuthDecision {
        let deadline = Instant::now() + self.auth.decision_window();

        let features = extract_keystroke_features(&session.snapshot(), &self.keystroke);
        let request = AuthRequest {
            derived_features: features.derived(),
            claimed_identity: claimed_identity.to_string(),
            fallback_credential: fallback_credential.to_string(),
            voice_similarity,
        };

        let outcome = tokio::time::timeout_at(deadline, self.service.authenticate(&request)).await;
        let decision = match outcome {
            Ok(Ok(response)) if response.success && response.authenticated => {
                AuthDecision::Accepted
            }
            Ok(Ok(response)) => {
                log::debug!(
                    "authentication not accepted (mse {:.4}, {} deviations)",
                    response.mse,
                    response.deviations.len()
                );
                AuthDecision::Rejected
            }
            Ok(Err(e)) => {
                log::warn!("authentication via {} failed: {e}", self.service.name());
                AuthDecision::Rejected
            }
            Err(_) => {
                log::warn!(
                    "authentication via {} exceeded the {:?} decision window",
                    self.service.name(),
                    self.auth.decision_window()
                );
                AuthDecision::Rejected
            }
        };
        drop(request);

        tokio::time::sleep_until(deadline).await;
        log::info!("authentication decision for {claimed_identity}: {decision:?}");
        decision
    }
}

use crate::fingerprint::keystroke::{DerivedKeystrokeFeatures, RawTimings};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use zeroize::{Zeroize, ZeroizeOnDrop};

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("service unavailable: {0}")]
    Unavailable(String),
    #[error("network error: {0}")]
    Network(String),
    #[error("invalid response: {0}")]
    InvalidResponse(String),
    #[error("request rejected: {0}")]
    Rejected(String),
}

/// Keystroke enrollment sample.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnrollmentRequest {
    pub encoded_features: Vec<f64>,
    /// Absent in privacy mode
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raw_timing_arrays: Option<RawTimings>,
    pub derived_features: DerivedKeystrokeFeatures,
    pub sample_count: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnrollmentResponse {
    pub success: bool,
}

/// Authentication attempt. The fallback credential is wiped on drop.
#[derive(Clone, Serialize, Deserialize, Zeroize, ZeroizeOnDrop)]
#[serde(rename_all = "camelCase")]
pub struct AuthRequest {
    #[zeroize(skip)]
    pub derived_features: DerivedKeystrokeFeatures,
    pub claimed_identity: String,
    pub fallback_credential: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[zeroize(skip)]
    pub voice_similarity: Option<f64>,
}

impl std::fmt::Debug for AuthRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthRequest")
            .field("derived_features", &self.derived_features)
            .field("claimed_identity", &self.claimed_identity)
            .field("fallback_credential", &"<redacted>")
            .field("voice_similarity", &self.voice_similarity)
            .finish()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthResponse {
    pub success: bool,
    #[serde(default)]
    pub authenticated: bool,
    /// Reconstruction error reported by the anomaly model
    #[serde(default)]
    pub mse: f64,
    #[serde(default)]
    pub deviations: Vec<f64>,
}

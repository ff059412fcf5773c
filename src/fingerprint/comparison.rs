//! Voice Profile Comparison and Matching
//!
//! Scores how closely a candidate voice profile matches an enrolled
//! reference. Raw descriptor distance is dominated by session nuisance
//! (loudness, microphone distance, mood), so each category is normalized on
//! a private copy before distances are taken:
//!
//! - pitch: log of the mean fundamental frequency
//! - tempo: log of the speaking rate, log1p of the zero-crossing rate
//! - spectral/energy: log1p of energy and RMS, log of the spectral centroid
//!
//! Every weight and scale is a field of [`ScoringConfig`]. Scores must match
//! exactly for profiles enrolled under earlier releases, so the defaults are
//! part of the contract.

use super::profile::AggregatedVoiceProfile;
use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};
use statrs::statistics::Statistics;

// =============================================================================
// Scoring Configuration
// =============================================================================

/// Weights of the pitch-normalized composite score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PitchNormalizedWeights {
    pub mfcc: f64,
    pub spectral: f64,
    pub pitch: f64,
}

impl Default for PitchNormalizedWeights {
    fn default() -> Self {
        Self {
            mfcc: 0.7,
            spectral: 0.2,
            pitch: 0.1,
        }
    }
}

/// Weights of the tempo-normalized composite score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TempoNormalizedWeights {
    pub mfcc: f64,
    pub spectral: f64,
    pub temporal: f64,
}

impl Default for TempoNormalizedWeights {
    fn default() -> Self {
        Self {
            mfcc: 0.6,
            spectral: 0.3,
            temporal: 0.1,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoringConfig {
    // Category weights in the overall score
    #[serde(default = "default_mfcc_weight")]
    pub mfcc_weight: f64,
    #[serde(default = "default_spectral_weight")]
    pub spectral_weight: f64,
    #[serde(default = "default_voice_quality_weight")]
    pub voice_quality_weight: f64,
    #[serde(default = "default_temporal_weight")]
    pub temporal_weight: f64,
    #[serde(default = "default_pitch_weight")]
    pub pitch_weight: f64,

    /// MFCC RMS distance at which similarity reaches zero
    #[serde(default = "default_mfcc_scale")]
    pub mfcc_scale: f64,

    // Spectral
    #[serde(default = "default_centroid_weight")]
    pub centroid_weight: f64,
    #[serde(default = "default_centroid_scale")]
    pub centroid_scale: f64,
    #[serde(default = "default_flatness_weight")]
    pub flatness_weight: f64,
    #[serde(default = "default_flatness_scale")]
    pub flatness_scale: f64,
    #[serde(default = "default_rolloff_weight")]
    pub rolloff_weight: f64,
    #[serde(default = "default_rolloff_scale")]
    pub rolloff_scale: f64,

    // Voice quality
    #[serde(default = "default_half")]
    pub spread_weight: f64,
    #[serde(default = "default_half")]
    pub spread_scale: f64,
    #[serde(default = "default_half")]
    pub sharpness_weight: f64,
    #[serde(default = "default_half")]
    pub sharpness_scale: f64,

    // Temporal
    #[serde(default = "default_zcr_weight")]
    pub zcr_weight: f64,
    #[serde(default = "default_zcr_scale")]
    pub zcr_scale: f64,
    #[serde(default = "default_energy_weight")]
    pub energy_weight: f64,
    #[serde(default = "default_energy_scale")]
    pub energy_scale: f64,

    // Pitch
    #[serde(default = "default_pitch_scale")]
    pub pitch_scale: f64,
    /// Pitch similarity used when either profile lacks prosody
    #[serde(default = "default_pitch_neutral")]
    pub pitch_neutral: f64,

    #[serde(default)]
    pub pitch_normalized: PitchNormalizedWeights,
    #[serde(default)]
    pub tempo_normalized: TempoNormalizedWeights,
}

fn default_mfcc_weight() -> f64 {
    0.5
}
fn default_spectral_weight() -> f64 {
    0.25
}
fn default_voice_quality_weight() -> f64 {
    0.15
}
fn default_temporal_weight() -> f64 {
    0.05
}
fn default_pitch_weight() -> f64 {
    0.05
}
fn default_mfcc_scale() -> f64 {
    5.0
}
fn default_centroid_weight() -> f64 {
    0.4
}
fn default_centroid_scale() -> f64 {
    2.0
}
fn default_flatness_weight() -> f64 {
    0.3
}
fn default_flatness_scale() -> f64 {
    0.5
}
fn default_rolloff_weight() -> f64 {
    0.3
}
fn default_rolloff_scale() -> f64 {
    2.0
}
fn default_half() -> f64 {
    0.5
}
fn default_zcr_weight() -> f64 {
    0.6
}
fn default_zcr_scale() -> f64 {
    1.0
}
fn default_energy_weight() -> f64 {
    0.4
}
fn default_energy_scale() -> f64 {
    2.0
}
fn default_pitch_scale() -> f64 {
    1.5
}
fn default_pitch_neutral() -> f64 {
    0.7
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            mfcc_weight: default_mfcc_weight(),
            spectral_weight: default_spectral_weight(),
            voice_quality_weight: default_voice_quality_weight(),
            temporal_weight: default_temporal_weight(),
            pitch_weight: default_pitch_weight(),
            mfcc_scale: default_mfcc_scale(),
            centroid_weight: default_centroid_weight(),
            centroid_scale: default_centroid_scale(),
            flatness_weight: default_flatness_weight(),
            flatness_scale: default_flatness_scale(),
            rolloff_weight: default_rolloff_weight(),
            rolloff_scale: default_rolloff_scale(),
            spread_weight: default_half(),
            spread_scale: default_half(),
            sharpness_weight: default_half(),
            sharpness_scale: default_half(),
            zcr_weight: default_zcr_weight(),
            zcr_scale: default_zcr_scale(),
            energy_weight: default_energy_weight(),
            energy_scale: default_energy_scale(),
            pitch_scale: default_pitch_scale(),
            pitch_neutral: default_pitch_neutral(),
            pitch_normalized: PitchNormalizedWeights::default(),
            tempo_normalized: TempoNormalizedWeights::default(),
        }
    }
}

impl ScoringConfig {
    /// Reject weights or scales that would make scores meaningless.
    pub fn validate(&self) -> Result<()> {
        let weights = [
            ("mfcc_weight", self.mfcc_weight),
            ("spectral_weight", self.spectral_weight),
            ("voice_quality_weight", self.voice_quality_weight),
            ("temporal_weight", self.temporal_weight),
            ("pitch_weight", self.pitch_weight),
            ("centroid_weight", self.centroid_weight),
            ("flatness_weight", self.flatness_weight),
            ("rolloff_weight", self.rolloff_weight),
            ("spread_weight", self.spread_weight),
            ("sharpness_weight", self.sharpness_weight),
            ("zcr_weight", self.zcr_weight),
            ("energy_weight", self.energy_weight),
            ("pitch_normalized.mfcc", self.pitch_normalized.mfcc),
            ("pitch_normalized.spectral", self.pitch_normalized.spectral),
            ("pitch_normalized.pitch", self.pitch_normalized.pitch),
            ("tempo_normalized.mfcc", self.tempo_normalized.mfcc),
            ("tempo_normalized.spectral", self.tempo_normalized.spectral),
            ("tempo_normalized.temporal", self.tempo_normalized.temporal),
        ];
        for (name, w) in weights {
            if !w.is_finite() || w < 0.0 {
                bail!("scoring.{name} must be a non-negative number, got {w}");
            }
        }

        let scales = [
            ("mfcc_scale", self.mfcc_scale),
            ("centroid_scale", self.centroid_scale),
            ("flatness_scale", self.flatness_scale),
            ("rolloff_scale", self.rolloff_scale),
            ("spread_scale", self.spread_scale),
            ("sharpness_scale", self.sharpness_scale),
            ("zcr_scale", self.zcr_scale),
            ("energy_scale", self.energy_scale),
            ("pitch_scale", self.pitch_scale),
        ];
        for (name, s) in scales {
            if !s.is_finite() || s <= 0.0 {
                bail!("scoring.{name} must be positive, got {s}");
            }
        }

        if !(0.0..=1.0).contains(&self.pitch_neutral) {
            bail!("scoring.pitch_neutral must lie in [0, 1]");
        }
        Ok(())
    }
}

// =============================================================================
// Similarity Result
// =============================================================================

/// Verdict derived from overall similarity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MatchVerdict {
    /// Very likely the same speaker (similarity > 0.85)
    SameSpeaker,
    /// Probably the same speaker (0.70 - 0.85)
    LikelySameSpeaker,
    /// Inconclusive (0.40 - 0.70)
    Inconclusive,
    /// Probably different speakers (0.20 - 0.40)
    LikelyDifferentSpeakers,
    /// Very likely different speakers (< 0.20)
    DifferentSpeakers,
}

impl MatchVerdict {
    pub fn from_similarity(similarity: f64) -> Self {
        if similarity > 0.85 {
            Self::SameSpeaker
        } else if similarity > 0.70 {
            Self::LikelySameSpeaker
        } else if similarity > 0.40 {
            Self::Inconclusive
        } else if similarity > 0.20 {
            Self::LikelyDifferentSpeakers
        } else {
            Self::DifferentSpeakers
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            Self::SameSpeaker => "Very likely the same speaker",
            Self::LikelySameSpeaker => "Probably the same speaker",
            Self::Inconclusive => "Results inconclusive",
            Self::LikelyDifferentSpeakers => "Probably different speakers",
            Self::DifferentSpeakers => "Very likely different speakers",
        }
    }
}

/// Raw distances behind the category similarities.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DetailedMetrics {
    /// RMS difference of mean MFCCs; `None` when no coefficients overlap
    pub mfcc_distance: Option<f64>,
    pub mfcc_coefficients_compared: usize,
    pub spectral_distance: f64,
    pub voice_quality_distance: f64,
    pub temporal_distance: f64,
    /// Log-pitch difference; `None` unless both profiles carry prosody
    pub pitch_distance: Option<f64>,
    /// Difference of log1p(RMS mean). Reported only, not scored.
    pub loudness_delta: f64,
    /// Log speaking-rate difference, when both profiles know their rate.
    /// Reported only, not scored.
    pub tempo_delta: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimilarityResult {
    pub overall_similarity: f64,
    /// For callers whose recordings differ in speaking tempo
    pub pitch_normalized_similarity: f64,
    /// For callers whose recordings differ in pitch register
    pub tempo_normalized_similarity: f64,
    pub mfcc_similarity: f64,
    pub spectral_similarity: f64,
    pub voice_quality_similarity: f64,
    pub temporal_similarity: f64,
    pub pitch_similarity: f64,
    /// Agreement across the five categories (1 minus their variance)
    pub confidence_score: f64,
    pub verdict: MatchVerdict,
    pub detailed_metrics: DetailedMetrics,
}

// =============================================================================
// Normalization
// =============================================================================

/// Per-category normalized view of a profile.
#[derive(Debug, Clone)]
struct NormalizedProfile {
    mfcc_mean: Vec<f64>,
    centroid: f64,
    flatness: f64,
    rolloff: f64,
    spread: f64,
    sharpness: f64,
    zcr: f64,
    energy: f64,
    rms: f64,
    pitch: Option<f64>,
    speaking_rate: Option<f64>,
}

fn ln_if_positive(v: f64) -> f64 {
    if v > 0.0 {
        v.ln()
    } else {
        v
    }
}

impl NormalizedProfile {
    fn from_profile(p: &AggregatedVoiceProfile) -> Self {
        let prosody = p.prosody.as_ref();
        Self {
            mfcc_mean: p.mfcc_mean.clone(),
            centroid: ln_if_positive(p.spectral_centroid.mean),
            flatness: p.spectral_flatness.mean,
            rolloff: p.spectral_rolloff.mean,
            spread: p.perceptual_spread.mean,
            sharpness: p.perceptual_sharpness.mean,
            zcr: p.zcr.mean.ln_1p(),
            energy: p.energy.mean.ln_1p(),
            rms: p.rms.mean.ln_1p(),
            pitch: prosody.map(|s| ln_if_positive(s.pitch_mean)),
            speaking_rate: prosody.and_then(|s| s.speaking_rate).map(ln_if_positive),
        }
    }
}

// =============================================================================
// Comparison Functions
// =============================================================================

/// RMS of per-coefficient differences over the shared prefix.
fn mfcc_distance(a: &[f64], b: &[f64]) -> Option<(f64, usize)> {
    let n = a.len().min(b.len());
    if n == 0 {
        return None;
    }
    let sum_sq: f64 = a.iter().zip(b).map(|(x, y)| (x - y) * (x - y)).sum();
    Some(((sum_sq / n as f64).sqrt(), n))
}

fn scaled(delta: f64, scale: f64) -> f64 {
    delta.abs() / scale
}

/// Compare a candidate profile against a reference profile.
///
/// Inputs are never modified. Every similarity lies in `[0, 1]`.
pub fn compare_profiles(
    candidate: &AggregatedVoiceProfile,
    reference: &AggregatedVoiceProfile,
    config: &ScoringConfig,
) -> SimilarityResult {
    let a = NormalizedProfile::from_profile(candidate);
    let b = NormalizedProfile::from_profile(reference);

    // MFCC
    let mfcc = mfcc_distance(&a.mfcc_mean, &b.mfcc_mean);
    let mfcc_similarity = match mfcc {
        Some((d, _)) => (1.0 - d / config.mfcc_scale).max(0.0),
        None => 0.0,
    };

    // Spectral
    let spectral_distance = config.centroid_weight
        * scaled(a.centroid - b.centroid, config.centroid_scale)
        + config.flatness_weight * scaled(a.flatness - b.flatness, config.flatness_scale)
        + config.rolloff_weight * scaled(a.rolloff - b.rolloff, config.rolloff_scale);
    let spectral_similarity = (1.0 - spectral_distance).max(0.0);

    // Voice quality
    let voice_quality_distance = config.spread_weight
        * scaled(a.spread - b.spread, config.spread_scale)
        + config.sharpness_weight * scaled(a.sharpness - b.sharpness, config.sharpness_scale);
    let voice_quality_similarity = (1.0 - voice_quality_distance).max(0.0);

    // Temporal
    let temporal_distance = config.zcr_weight * scaled(a.zcr - b.zcr, config.zcr_scale)
        + config.energy_weight * scaled(a.energy - b.energy, config.energy_scale);
    let temporal_similarity = (1.0 - temporal_distance).max(0.0);

    // Pitch
    let pitch_distance = match (a.pitch, b.pitch) {
        (Some(pa), Some(pb)) => Some((pa - pb).abs()),
        _ => None,
    };
    let pitch_similarity = match pitch_distance {
        Some(d) => (1.0 - d / config.pitch_scale).max(0.0),
        None => config.pitch_neutral,
    };

    let overall_similarity = config.mfcc_weight * mfcc_similarity
        + config.spectral_weight * spectral_similarity
        + config.voice_quality_weight * voice_quality_similarity
        + config.temporal_weight * temporal_similarity
        + config.pitch_weight * pitch_similarity;

    let pn = &config.pitch_normalized;
    let pitch_normalized_similarity =
        pn.mfcc * mfcc_similarity + pn.spectral * spectral_similarity + pn.pitch * pitch_similarity;
    let tn = &config.tempo_normalized;
    let tempo_normalized_similarity = tn.mfcc * mfcc_similarity
        + tn.spectral * spectral_similarity
        + tn.temporal * temporal_similarity;

    let categories = [
        mfcc_similarity,
        spectral_similarity,
        voice_quality_similarity,
        temporal_similarity,
        pitch_similarity,
    ];
    let confidence_score = (1.0 - categories.iter().population_variance()).max(0.0);

    SimilarityResult {
        overall_similarity,
        pitch_normalized_similarity,
        tempo_normalized_similarity,
        mfcc_similarity,
        spectral_similarity,
        voice_quality_similarity,
        temporal_similarity,
        pitch_similarity,
        confidence_score,
        verdict: MatchVerdict::from_similarity(overall_similarity),
        detailed_metrics: DetailedMetrics {
            mfcc_distance: mfcc.map(|(d, _)| d),
            mfcc_coefficients_compared: mfcc.map(|(_, n)| n).unwrap_or(0),
            spectral_distance,
            voice_quality_distance,
            temporal_distance,
            pitch_distance,
            loudness_delta: (a.rms - b.rms).abs(),
            tempo_delta: match (a.speaking_rate, b.speaking_rate) {
                (Some(ra), Some(rb)) => Some((ra - rb).abs()),
                _ => None,
            },
        },
    }
}

/// Single-number comparison kept for older callers; equals
/// `compare_profiles(..).overall_similarity`.
pub fn profile_similarity(
    candidate: &AggregatedVoiceProfile,
    reference: &AggregatedVoiceProfile,
    config: &ScoringConfig,
) -> f64 {
    compare_profiles(candidate, reference, config).overall_similarity
}

// =============================================================================
// Profile Matcher
// =============================================================================

/// A reference profile enrolled under an identity.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnrolledProfile {
    pub identity: String,
    pub profile: AggregatedVoiceProfile,
}

/// Matches candidate profiles against enrolled references.
pub struct ProfileMatcher {
    scoring: ScoringConfig,
    /// Minimum overall similarity to count as a match
    threshold: f64,
    max_results: usize,
}

impl ProfileMatcher {
    pub fn new(scoring: ScoringConfig) -> Self {
        Self {
            scoring,
            threshold: 0.70,
            max_results: 10,
        }
    }

    pub fn with_threshold(mut self, threshold: f64) -> Self {
        self.threshold = threshold.clamp(0.0, 1.0);
        self
    }

    pub fn with_max_results(mut self, max: usize) -> Self {
        self.max_results = max;
        self
    }

    /// Verify a candidate against one claimed reference.
    pub fn verify_match(
        &self,
        candidate: &AggregatedVoiceProfile,
        reference: &AggregatedVoiceProfile,
    ) -> VerificationResult {
        let result = compare_profiles(candidate, reference, &self.scoring);
        VerificationResult {
            matches: result.overall_similarity >= self.threshold,
            similarity: result.overall_similarity,
            confidence: result.confidence_score,
            verdict: result.verdict,
        }
    }

    /// Enrolled identities at or above the threshold, best first.
    pub fn find_matches(
        &self,
        candidate: &AggregatedVoiceProfile,
        enrolled: &[EnrolledProfile],
    ) -> Vec<MatchResult> {
        let mut results: Vec<_> = enrolled
            .iter()
            .map(|e| {
                let result = compare_profiles(candidate, &e.profile, &self.scoring);
                MatchResult {
                    identity: e.identity.clone(),
                    similarity: result.overall_similarity,
                    confidence: result.confidence_score,
                    verdict: result.verdict,
                }
            })
            .filter(|r| r.similarity >= self.threshold)
            .collect();

        results.sort_by(|a, b| {
            b.similarity
                .partial_cmp(&a.similarity)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        results.truncate(self.max_results);
        results
    }

    pub fn find_best_match(
        &self,
        candidate: &AggregatedVoiceProfile,
        enrolled: &[EnrolledProfile],
    ) -> Option<MatchResult> {
        self.find_matches(candidate, enrolled).into_iter().next()
    }
}

impl Default for ProfileMatcher {
    fn default() -> Self {
        Self::new(ScoringConfig::default())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchResult {
    pub identity: String,
    pub similarity: f64,
    pub confidence: f64,
    pub verdict: MatchVerdict,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerificationResult {
    /// Whether similarity reached the threshold
    pub matches: bool,
    pub similarity: f64,
    pub confidence: f64,
    pub verdict: MatchVerdict,
}

// =============================================================================
// Tests
// =============================================================================

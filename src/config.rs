use crate::fingerprint::comparison::ScoringConfig;
use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

const CONFIG_FILE: &str = "biokey.json";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BiokeyConfig {
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    #[serde(default)]
    pub keystroke: KeystrokeConfig,

    #[serde(default)]
    pub voice: VoiceConfig,

    #[serde(default)]
    pub scoring: ScoringConfig,

    #[serde(default)]
    pub validation: ValidationConfig,

    #[serde(default)]
    pub service: ServiceConfig,

    #[serde(default)]
    pub auth: AuthConfig,
}

/// Keystroke feature extraction settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KeystrokeConfig {
    /// Expected password length L; the encoded vector is `3L + 2` long.
    #[serde(default = "default_password_length")]
    pub password_length: usize,
    /// Key whose transitions feed the error signal.
    #[serde(default = "default_corrective_key")]
    pub corrective_key: String,
    /// Floor for the typing span used in the speed calculation (ms).
    #[serde(default = "default_min_span_ms")]
    pub min_span_ms: f64,
}

impl Default for KeystrokeConfig {
    fn default() -> Self {
        Self {
            password_length: default_password_length(),
            corrective_key: default_corrective_key(),
            min_span_ms: default_min_span_ms(),
        }
    }
}

impl KeystrokeConfig {
    /// Length of the encoded feature vector.
    pub fn encoded_len(&self) -> usize {
        if self.password_length == 0 {
            return 0;
        }
        3 * self.password_length + 2
    }
}

/// Voice framing settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VoiceConfig {
    #[serde(default = "default_frame_size")]
    pub frame_size: usize,
    #[serde(default = "default_hop_size")]
    pub hop_size: usize,
    /// Upper bound on frames analysed per submission.
    #[serde(default = "default_max_frames")]
    pub max_frames: usize,
    #[serde(default = "default_mfcc_coefficients")]
    pub mfcc_coefficients: usize,
}

impl Default for VoiceConfig {
    fn default() -> Self {
        Self {
            frame_size: default_frame_size(),
            hop_size: default_hop_size(),
            max_frames: default_max_frames(),
            mfcc_coefficients: default_mfcc_coefficients(),
        }
    }
}

/// Limits for the cheap pre-check on raw audio.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationConfig {
    #[serde(default = "default_min_bytes")]
    pub min_bytes: usize,
    #[serde(default = "default_max_bytes")]
    pub max_bytes: usize,
    #[serde(default = "default_min_duration")]
    pub min_duration_secs: f64,
    #[serde(default = "default_min_samples")]
    pub min_samples: usize,
    /// Number of leading samples used for the silence check.
    #[serde(default = "default_rms_window")]
    pub rms_window: usize,
    #[serde(default = "default_rms_floor")]
    pub rms_floor: f64,
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            min_bytes: default_min_bytes(),
            max_bytes: default_max_bytes(),
            min_duration_secs: default_min_duration(),
            min_samples: default_min_samples(),
            rms_window: default_rms_window(),
            rms_floor: default_rms_floor(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceConfig {
    #[serde(default)]
    pub endpoint: Option<String>,
    #[serde(default, skip_serializing)]
    pub api_key: Option<String>,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            endpoint: None,
            api_key: None,
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl ServiceConfig {
    pub fn from_env() -> Self {
        Self {
            endpoint: std::env::var("BIOKEY_SERVICE_URL").ok(),
            api_key: std::env::var("BIOKEY_SERVICE_API_KEY").ok(),
            timeout_secs: default_timeout_secs(),
        }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    /// When set, raw timing arrays are never sent to the model service.
    #[serde(default = "default_true")]
    pub privacy_mode: bool,
    /// Every authentication decision resolves exactly this long after the
    /// attempt starts. A service answer arriving later counts as a rejection.
    #[serde(default = "default_decision_window")]
    pub decision_window_ms: u64,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            privacy_mode: default_true(),
            decision_window_ms: default_decision_window(),
        }
    }
}

impl AuthConfig {
    pub fn decision_window(&self) -> Duration {
        Duration::from_millis(self.decision_window_ms)
    }
}

// Defaults
fn default_data_dir() -> PathBuf {
    dirs::home_dir()
        .map(|h| h.join(".biokey"))
        .unwrap_or_else(|| PathBuf::from(".biokey"))
}
fn default_password_length() -> usize {
    8
}
fn default_corrective_key() -> String {
    "Backspace".to_string()
}
fn default_min_span_ms() -> f64 {
    1.0
}
fn default_frame_size() -> usize {
    512
}
fn default_hop_size() -> usize {
    256
}
fn default_max_frames() -> usize {
    200
}
fn default_mfcc_coefficients() -> usize {
    13
}
fn default_min_bytes() -> usize {
    1024
}
fn default_max_bytes() -> usize {
    50 * 1024 * 1024
}
fn default_min_duration() -> f64 {
    0.5
}
fn default_min_samples() -> usize {
    512
}
fn default_rms_window() -> usize {
    8192
}
fn default_rms_floor() -> f64 {
    1e-4
}
fn default_timeout_secs() -> u64 {
    15
}
fn default_true() -> bool {
    true
}
fn default_decision_window() -> u64 {
    1500
}

impl Default for BiokeyConfig {
    fn default() -> Self {
        Self::default_with_dir(&default_data_dir())
    }
}

impl BiokeyConfig {
    pub fn load_or_default(data_dir: &Path) -> Result<Self> {
        let config_path = data_dir.join(CONFIG_FILE);

        if config_path.exists() {
            let raw = fs::read_to_string(&config_path)?;
            let mut config: BiokeyConfig = serde_json::from_str(&raw)?;
            config.data_dir = data_dir.to_path_buf();
            if config.service.api_key.is_none() {
                config.service.api_key = std::env::var("BIOKEY_SERVICE_API_KEY").ok();
            }
            config.validate()?;
            return Ok(config);
        }

        let config = Self::default_with_dir(data_dir);
        config.persist()?;
        Ok(config)
    }

    pub fn default_with_dir(data_dir: &Path) -> Self {
        Self {
            data_dir: data_dir.to_path_buf(),
            keystroke: KeystrokeConfig::default(),
            voice: VoiceConfig::default(),
            scoring: ScoringConfig::default(),
            validation: ValidationConfig::default(),
            service: ServiceConfig::from_env(),
            auth: AuthConfig::default(),
        }
    }

    pub fn persist(&self) -> Result<()> {
        fs::create_dir_all(&self.data_dir)?;
        let config_path = self.data_dir.join(CONFIG_FILE);
        let raw = serde_json::to_string_pretty(self)?;
        fs::write(config_path, raw)?;
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.keystroke.password_length == 0 {
            bail!("keystroke.password_length must be at least 1");
        }
        if self.keystroke.min_span_ms <= 0.0 {
            bail!("keystroke.min_span_ms must be positive");
        }
        if self.voice.frame_size == 0 || self.voice.hop_size == 0 {
            bail!("voice.frame_size and voice.hop_size must be non-zero");
        }
        if self.voice.mfcc_coefficients == 0 {
            bail!("voice.mfcc_coefficients must be non-zero");
        }
        if self.validation.min_bytes > self.validation.max_bytes {
            bail!("validation.min_bytes exceeds validation.max_bytes");
        }
        if self.auth.decision_window_ms == 0 {
            bail!("auth.decision_window_ms must be non-zero");
        }
        self.scoring.validate()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_encoded_len() {
        let cfg = KeystrokeConfig::default();
        assert_eq!(cfg.password_length, 8);
        assert_eq!(cfg.encoded_len(), 26);

        let cfg = KeystrokeConfig {
            password_length: 11,
            ..Default::default()
        };
        assert_eq!(cfg.encoded_len(), 35);
    }

    #[test]
    fn test_load_or_default_writes_file() {
        let tmp = TempDir::new().unwrap();
        let config = BiokeyConfig::load_or_default(tmp.path()).unwrap();
        assert!(tmp.path().join(CONFIG_FILE).exists());
        assert_eq!(config.voice.max_frames, 200);
        assert_eq!(config.data_dir, tmp.path());
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let tmp = TempDir::new().unwrap();
        fs::write(
            tmp.path().join(CONFIG_FILE),
            r#"{"voice": {"max_frames": 40}, "scoring": {"mfcc_weight": 0.6}}"#,
        )
        .unwrap();

        let config = BiokeyConfig::load_or_default(tmp.path()).unwrap();
        assert_eq!(config.voice.max_frames, 40);
        assert_eq!(config.voice.hop_size, 256);
        assert_eq!(config.scoring.mfcc_weight, 0.6);
        assert_eq!(config.scoring.spectral_weight, 0.25);
        assert_eq!(config.keystroke.corrective_key, "Backspace");
    }

    #[test]
    fn test_persist_roundtrip() {
        let tmp = TempDir::new().unwrap();
        let mut config = BiokeyConfig::default_with_dir(tmp.path());
        config.auth.privacy_mode = false;
        config.persist().unwrap();

        let loaded = BiokeyConfig::load_or_default(tmp.path()).unwrap();
        assert!(!loaded.auth.privacy_mode);
    }

    #[test]
    fn test_validate_rejects_zero_hop() {
        let mut config = BiokeyConfig::default_with_dir(Path::new("/tmp/unused"));
        config.voice.hop_size = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_zero_decision_window() {
        let mut config = BiokeyConfig::default_with_dir(Path::new("/tmp/unused"));
        assert_eq!(config.auth.decision_window(), Duration::from_millis(1500));
        config.auth.decision_window_ms = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_api_key_not_persisted() {
        let mut config = BiokeyConfig::default_with_dir(Path::new("/tmp/unused"));
        config.service.api_key = Some("secret".into());
        let raw = serde_json::to_string(&config).unwrap();
        assert!(!raw.contains("secret"));
    }
}

//! Cheap pre-check on a raw recording before full processing.
//!
//! This guards latency and obvious mistakes (empty file, silence, huge
//! uploads). It is not a quality or security gate: when the blob cannot be
//! decoded the recording is let through.

use super::decode::AudioDecoder;
use super::descriptors::rms;
use crate::config::ValidationConfig;

pub fn quick_validate(blob: &[u8], decoder: &dyn AudioDecoder, config: &ValidationConfig) -> bool {
    if blob.len() < config.min_bytes || blob.len() > config.max_bytes {
        log::debug!("quick validation: rejected blob of {} bytes", blob.len());
        return false;
    }

    let audio = match decoder.decode(blob) {
        Ok(audio) => audio,
        Err(e) => {
            log::debug!("quick validation: decode failed, accepting: {e}");
            return true;
        }
    };

    if audio.duration_secs < config.min_duration_secs || audio.samples.len() < config.min_samples
    {
        log::debug!(
            "quick validation: too short ({:.2}s, {} samples)",
            audio.duration_secs,
            audio.samples.len()
        );
        return false;
    }

    let window = &audio.samples[..config.rms_window.min(audio.samples.len())];
    if rms(window) < config.rms_floor {
        log::debug!("quick validation: leading window is silent");
        return false;
    }

    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::decode::tests::sine_wav;
    use crate::audio::decode::{DecodeError, DecodedAudio, WavDecoder};

    struct FixedDecoder(DecodedAudio);

    impl AudioDecoder for FixedDecoder {
        fn decode(&self, _bytes: &[u8]) -> Result<DecodedAudio, DecodeError> {
            Ok(self.0.clone())
        }
    }

    #[test]
    fn test_rejects_small_blob() {
        let blob = vec![0u8; 500];
        assert!(!quick_validate(&blob, &WavDecoder, &ValidationConfig::default()));
    }

    #[test]
    fn test_rejects_oversized_blob() {
        let blob = vec![0u8; 60 * 1024 * 1024];
        assert!(!quick_validate(&blob, &WavDecoder, &ValidationConfig::default()));
    }

    #[test]
    fn test_accepts_tone() {
        let blob = sine_wav(200.0, 1.2, 16000, 1);
        assert!(quick_validate(&blob, &WavDecoder, &ValidationConfig::default()));
    }

    #[test]
    fn test_undecodable_is_accepted() {
        let blob = vec![3u8; 4096];
        assert!(quick_validate(&blob, &WavDecoder, &ValidationConfig::default()));
    }

    #[test]
    fn test_rejects_short_recording() {
        let blob = sine_wav(200.0, 0.3, 16000, 1);
        assert!(!quick_validate(&blob, &WavDecoder, &ValidationConfig::default()));
    }

    #[test]
    fn test_rejects_too_few_samples() {
        let decoder = FixedDecoder(DecodedAudio {
            samples: vec![0.3; 400],
            sample_rate: 400,
            duration_secs: 1.0,
        });
        let blob = vec![0u8; 2048];
        assert!(!quick_validate(&blob, &decoder, &ValidationConfig::default()));
    }

    #[test]
    fn test_rejects_silence() {
        let decoder = FixedDecoder(DecodedAudio::new(vec![0.0; 16000], 16000));
        let blob = vec![0u8; 2048];
        assert!(!quick_validate(&blob, &decoder, &ValidationConfig::default()));
    }
}

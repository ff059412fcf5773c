//! Keystroke Fingerprint - Typing rhythm features
//!
//! Turns a stream of key transitions into timing features:
//! - Hold times (press to matching release)
//! - Down-down times (press to next press)
//! - Flight times (release to next press)
//! - Typing speed, error pressure and hold-time spread
//!
//! The encoded vector has a fixed length for a given password length, so
//! short, long or malformed input always produces the same shape.

use crate::config::KeystrokeConfig;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use statrs::statistics::Statistics;

/// Number of scalar features appended after the timing arrays.
const SCALAR_FEATURES: usize = 4;

// =============================================================================
// Key Events
// =============================================================================

/// Direction of a key transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KeyTransition {
    Press,
    Release,
}

/// A single key transition with a monotonic timestamp in milliseconds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeyEvent {
    pub key: String,
    pub transition: KeyTransition,
    pub timestamp_ms: f64,
}

impl KeyEvent {
    pub fn press(key: impl Into<String>, timestamp_ms: f64) -> Self {
        Self {
            key: key.into(),
            transition: KeyTransition::Press,
            timestamp_ms,
        }
    }

    pub fn release(key: impl Into<String>, timestamp_ms: f64) -> Self {
        Self {
            key: key.into(),
            transition: KeyTransition::Release,
            timestamp_ms,
        }
    }

    pub fn is_press(&self) -> bool {
        self.transition == KeyTransition::Press
    }
}

// =============================================================================
// Capture Session
// =============================================================================

/// Event buffer for one capture session.
///
/// Owned by a single caller; extraction works on a borrowed view or a
/// snapshot, so it can be repeated at any point.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KeystrokeSession {
    pub id: String,
    pub started_at: DateTime<Utc>,
    events: Vec<KeyEvent>,
}

impl KeystrokeSession {
    pub fn new() -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            started_at: Utc::now(),
            events: Vec::new(),
        }
    }

    pub fn record(&mut self, event: KeyEvent) {
        self.events.push(event);
    }

    pub fn press(&mut self, key: impl Into<String>, timestamp_ms: f64) {
        self.record(KeyEvent::press(key, timestamp_ms));
    }

    pub fn release(&mut self, key: impl Into<String>, timestamp_ms: f64) {
        self.record(KeyEvent::release(key, timestamp_ms));
    }

    pub fn events(&self) -> &[KeyEvent] {
        &self.events
    }

    /// Copy of the current buffer, detached from later edits.
    pub fn snapshot(&self) -> Vec<KeyEvent> {
        self.events.clone()
    }

    pub fn press_count(&self) -> usize {
        self.events.iter().filter(|e| e.is_press()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Clear the buffer and restart the session clock.
    pub fn reset(&mut self) {
        self.events.clear();
        self.started_at = Utc::now();
    }

    pub fn extract(&self, config: &KeystrokeConfig) -> KeystrokeFeatureVector {
        extract_keystroke_features(&self.events, config)
    }
}

impl Default for KeystrokeSession {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// Feature Vector
// =============================================================================

/// Timing features extracted from one capture.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeystrokeFeatureVector {
    /// Press to matching release (ms), one per matched press
    pub hold_times: Vec<f64>,
    /// Press to next press (ms)
    pub down_down_times: Vec<f64>,
    /// Release to next press (ms)
    pub flight_times: Vec<f64>,
    /// Presses per second over the active span
    pub typing_speed: f64,
    pub mean_flight_time: f64,
    /// Corrective key transitions (press and release each count)
    pub error_signal: f64,
    pub hold_time_std_dev: f64,
    /// Fixed-length encoding, `3L + 2` values
    pub encoded: Vec<f64>,
}

/// Scalar summary sent alongside (or instead of) the raw arrays.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DerivedKeystrokeFeatures {
    pub typing_speed: f64,
    pub mean_flight_time: f64,
    pub error_signal: f64,
    pub hold_time_std_dev: f64,
}

/// Raw timing arrays as sent to the model service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawTimings {
    pub hold_times: Vec<f64>,
    pub down_down_times: Vec<f64>,
    pub up_down_times: Vec<f64>,
}

impl KeystrokeFeatureVector {
    pub fn derived(&self) -> DerivedKeystrokeFeatures {
        DerivedKeystrokeFeatures {
            typing_speed: self.typing_speed,
            mean_flight_time: self.mean_flight_time,
            error_signal: self.error_signal,
            hold_time_std_dev: self.hold_time_std_dev,
        }
    }

    pub fn raw_timings(&self) -> RawTimings {
        RawTimings {
            hold_times: self.hold_times.clone(),
            down_down_times: self.down_down_times.clone(),
            up_down_times: self.flight_times.clone(),
        }
    }
}

// =============================================================================
// Extraction
// =============================================================================

/// Extract timing features from an ordered event stream.
///
/// Total over any input: unmatched presses are skipped for hold times,
/// flight times fall back to the down-down interval, and missing data
/// encodes as zeros.
pub fn extract_keystroke_features(
    events: &[KeyEvent],
    config: &KeystrokeConfig,
) -> KeystrokeFeatureVector {
    let presses: Vec<(usize, &KeyEvent)> = events
        .iter()
        .enumerate()
        .filter(|(_, e)| e.is_press())
        .collect();

    // First release of the same key after each press.
    let releases: Vec<Option<f64>> = presses
        .iter()
        .map(|&(idx, press)| {
            events[idx + 1..]
                .iter()
                .find(|e| !e.is_press() && e.key == press.key)
                .map(|e| e.timestamp_ms)
        })
        .collect();

    let hold_times: Vec<f64> = presses
        .iter()
        .zip(&releases)
        .filter_map(|(&(_, press), release)| release.map(|r| r - press.timestamp_ms))
        .collect();

    let down_down_times: Vec<f64> = presses
        .windows(2)
        .map(|w| w[1].1.timestamp_ms - w[0].1.timestamp_ms)
        .collect();

    let flight_times: Vec<f64> = presses
        .windows(2)
        .zip(&releases)
        .map(|(w, release)| {
            let from = release.unwrap_or(w[0].1.timestamp_ms);
            w[1].1.timestamp_ms - from
        })
        .collect();

    let typing_speed = if presses.is_empty() {
        0.0
    } else {
        let span = [
            down_down_times.iter().sum::<f64>(),
            flight_times.iter().sum::<f64>(),
            hold_times.iter().sum::<f64>(),
        ]
        .into_iter()
        .find(|&s| s > 0.0)
        .unwrap_or(0.0)
        .max(config.min_span_ms);
        presses.len() as f64 / (span / 1000.0)
    };

    let mean_flight_time = mean_or_zero(&flight_times);

    let error_signal = events
        .iter()
        .filter(|e| e.key == config.corrective_key)
        .count() as f64;

    let hold_time_std_dev = if hold_times.is_empty() {
        0.0
    } else {
        hold_times.iter().population_std_dev()
    };

    let l = config.password_length;
    let target = config.encoded_len();
    let mut encoded = Vec::with_capacity(target.max(l * 3 + SCALAR_FEATURES));
    encoded.extend(hold_times.iter().take(l));
    encoded.extend(down_down_times.iter().take(l.saturating_sub(1)));
    encoded.extend(flight_times.iter().take(l.saturating_sub(1)));
    encoded.extend([
        typing_speed,
        mean_flight_time,
        error_signal,
        hold_time_std_dev,
    ]);
    encoded.resize(target, 0.0);

    KeystrokeFeatureVector {
        hold_times,
        down_down_times,
        flight_times,
        typing_speed,
        mean_flight_time,
        error_signal,
        hold_time_std_dev,
        encoded,
    }
}

fn mean_or_zero(values: &[f64]) -> f64 {
    if values.is_empty() {
        0.0
    } else {
        values.iter().sum::<f64>() / values.len() as f64
    }
}

// =============================================================================
// Tests
// =============================================================================

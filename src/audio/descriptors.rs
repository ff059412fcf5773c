//! Per-frame spectral descriptors.
//!
//! The frame extractor asks a [`DescriptorExtractor`] for a list of named
//! descriptors and gets back named scalar or vector results. Two adapters
//! ship with the crate: [`SpectralAnalyzer`] computes everything from the
//! signal with an FFT, and [`StubDescriptors`] returns fixed values for
//! tests that must not depend on signal processing.

use rustfft::num_complex::Complex;
use rustfft::{Fft, FftPlanner};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::f64::consts::PI;
use std::sync::{Arc, RwLock};
use thiserror::Error;

/// Fraction of spectral energy below the rolloff point.
const ROLLOFF_FRACTION: f64 = 0.85;
/// Number of Bark bands used for perceptual descriptors.
const BARK_BANDS: usize = 24;
/// Floor applied before taking logarithms of spectral energy.
const LOG_FLOOR: f64 = 1e-10;

// =============================================================================
// Descriptor names and values
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Descriptor {
    Mfcc,
    SpectralCentroid,
    SpectralFlatness,
    SpectralRolloff,
    SpectralFlux,
    PerceptualSpread,
    PerceptualSharpness,
    SpectralKurtosis,
    Zcr,
    Rms,
    Energy,
}

impl Descriptor {
    pub const ALL: [Descriptor; 11] = [
        Descriptor::Mfcc,
        Descriptor::SpectralCentroid,
        Descriptor::SpectralFlatness,
        Descriptor::SpectralRolloff,
        Descriptor::SpectralFlux,
        Descriptor::PerceptualSpread,
        Descriptor::PerceptualSharpness,
        Descriptor::SpectralKurtosis,
        Descriptor::Zcr,
        Descriptor::Rms,
        Descriptor::Energy,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Self::Mfcc => "mfcc",
            Self::SpectralCentroid => "spectralCentroid",
            Self::SpectralFlatness => "spectralFlatness",
            Self::SpectralRolloff => "spectralRolloff",
            Self::SpectralFlux => "spectralFlux",
            Self::PerceptualSpread => "perceptualSpread",
            Self::PerceptualSharpness => "perceptualSharpness",
            Self::SpectralKurtosis => "spectralKurtosis",
            Self::Zcr => "zcr",
            Self::Rms => "rms",
            Self::Energy => "energy",
        }
    }
}

impl std::fmt::Display for Descriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DescriptorValue {
    Scalar(f64),
    Vector(Vec<f64>),
}

impl DescriptorValue {
    fn is_finite(&self) -> bool {
        match self {
            Self::Scalar(v) => v.is_finite(),
            Self::Vector(v) => v.iter().all(|x| x.is_finite()),
        }
    }
}

/// Named results for one frame.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DescriptorSet {
    values: HashMap<Descriptor, DescriptorValue>,
}

impl DescriptorSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, descriptor: Descriptor, value: DescriptorValue) {
        self.values.insert(descriptor, value);
    }

    pub fn get(&self, descriptor: Descriptor) -> Option<&DescriptorValue> {
        self.values.get(&descriptor)
    }

    pub fn scalar(&self, descriptor: Descriptor) -> Result<f64, DescriptorError> {
        match self.values.get(&descriptor) {
            Some(DescriptorValue::Scalar(v)) => Ok(*v),
            Some(DescriptorValue::Vector(_)) => Err(DescriptorError::WrongShape(descriptor)),
            None => Err(DescriptorError::Missing(descriptor)),
        }
    }

    pub fn vector(&self, descriptor: Descriptor) -> Result<&[f64], DescriptorError> {
        match self.values.get(&descriptor) {
            Some(DescriptorValue::Vector(v)) => Ok(v),
            Some(DescriptorValue::Scalar(_)) => Err(DescriptorError::WrongShape(descriptor)),
            None => Err(DescriptorError::Missing(descriptor)),
        }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum DescriptorError {
    #[error("empty frame")]
    EmptyFrame,
    #[error("invalid sample rate: {0}")]
    InvalidSampleRate(u32),
    #[error("descriptor {0} missing from result")]
    Missing(Descriptor),
    #[error("descriptor {0} has the wrong shape")]
    WrongShape(Descriptor),
    #[error("descriptor {0} is not finite")]
    NonFinite(Descriptor),
    #[error("descriptor backend failed: {0}")]
    Backend(String),
}

/// One analysis frame handed to a descriptor backend.
#[derive(Debug, Clone, Copy)]
pub struct FrameInput<'a> {
    /// Position of the frame in the submission
    pub index: usize,
    pub samples: &'a [f32],
    /// Preceding frame, used for flux
    pub previous: Option<&'a [f32]>,
    pub sample_rate: u32,
}

/// Descriptor computation capability.
pub trait DescriptorExtractor: Send + Sync {
    fn extract(
        &self,
        frame: &FrameInput<'_>,
        requested: &[Descriptor],
    ) -> Result<DescriptorSet, DescriptorError>;
}

// =============================================================================
// FFT-backed analyzer
// =============================================================================

type MelBank = Arc<Vec<Vec<f64>>>;

/// Production descriptor backend built on rustfft.
///
/// Mel filter banks are built once per sample rate and shared by every
/// frame analysed afterwards.
pub struct SpectralAnalyzer {
    fft_size: usize,
    fft: Arc<dyn Fft<f64>>,
    window: Vec<f64>,
    mfcc_coefficients: usize,
    mel_bands: usize,
    mel_banks: RwLock<HashMap<u32, MelBank>>,
}

impl SpectralAnalyzer {
    pub fn new(fft_size: usize, mfcc_coefficients: usize) -> Self {
        let fft_size = fft_size.max(2);
        let mut planner = FftPlanner::new();
        let fft = planner.plan_fft_forward(fft_size);
        Self {
            fft_size,
            fft,
            window: hann_window(fft_size),
            mfcc_coefficients,
            mel_bands: 26.max(mfcc_coefficients),
            mel_banks: RwLock::new(HashMap::new()),
        }
    }

    fn mel_bank(&self, sample_rate: u32) -> MelBank {
        let cached = self
            .mel_banks
            .read()
            .ok()
            .and_then(|banks| banks.get(&sample_rate).cloned());
        if let Some(bank) = cached {
            return bank;
        }

        let bank = Arc::new(mel_filter_bank(
            self.mel_bands,
            self.fft_size,
            sample_rate as f64,
            0.0,
            sample_rate as f64 / 2.0,
        ));
        if let Ok(mut banks) = self.mel_banks.write() {
            banks.insert(sample_rate, Arc::clone(&bank));
        }
        bank
    }

    /// Magnitude spectrum of the first `fft_size / 2 + 1` bins.
    fn magnitudes(&self, samples: &[f32]) -> Vec<f64> {
        let mut buffer: Vec<Complex<f64>> = (0..self.fft_size)
            .map(|i| {
                let s = samples.get(i).copied().unwrap_or(0.0) as f64;
                Complex::new(s * self.window[i], 0.0)
            })
            .collect();
        self.fft.process(&mut buffer);
        buffer[..self.fft_size / 2 + 1]
            .iter()
            .map(|c| c.norm())
            .collect()
    }

    fn mfcc(&self, power: &[f64], sample_rate: u32) -> Vec<f64> {
        let bank = self.mel_bank(sample_rate);
        let log_energies: Vec<f64> = bank
            .iter()
            .map(|filter| {
                let e: f64 = filter.iter().zip(power).map(|(w, p)| w * p).sum();
                e.max(LOG_FLOOR).ln()
            })
            .collect();

        let m = log_energies.len() as f64;
        (0..self.mfcc_coefficients)
            .map(|i| {
                log_energies
                    .iter()
                    .enumerate()
                    .map(|(j, &e)| e * (PI * i as f64 * (j as f64 + 0.5) / m).cos())
                    .sum()
            })
            .collect()
    }
}

impl DescriptorExtractor for SpectralAnalyzer {
    fn extract(
        &self,
        frame: &FrameInput<'_>,
        requested: &[Descriptor],
    ) -> Result<DescriptorSet, DescriptorError> {
        if frame.samples.is_empty() {
            return Err(DescriptorError::EmptyFrame);
        }
        if frame.sample_rate == 0 {
            return Err(DescriptorError::InvalidSampleRate(frame.sample_rate));
        }

        let mags = self.magnitudes(frame.samples);
        let power: Vec<f64> = mags.iter().map(|m| m * m).collect();
        let bin_hz = frame.sample_rate as f64 / self.fft_size as f64;

        let mut perceptual: Option<(f64, f64)> = None;
        let mut set = DescriptorSet::new();
        for &descriptor in requested {
            let value = match descriptor {
                Descriptor::Mfcc => DescriptorValue::Vector(self.mfcc(&power, frame.sample_rate)),
                Descriptor::SpectralCentroid => {
                    DescriptorValue::Scalar(spectral_centroid(&mags, bin_hz))
                }
                Descriptor::SpectralFlatness => DescriptorValue::Scalar(spectral_flatness(&power)),
                Descriptor::SpectralRolloff => DescriptorValue::Scalar(spectral_rolloff(&power)),
                Descriptor::SpectralFlux => {
                    let flux = match frame.previous {
                        Some(prev) => spectral_flux(&mags, &self.magnitudes(prev)),
                        None => 0.0,
                    };
                    DescriptorValue::Scalar(flux)
                }
                Descriptor::PerceptualSpread | Descriptor::PerceptualSharpness => {
                    let (spread, sharpness) = *perceptual.get_or_insert_with(|| {
                        perceptual_spread_sharpness(&bark_loudness(&power, bin_hz))
                    });
                    if descriptor == Descriptor::PerceptualSpread {
                        DescriptorValue::Scalar(spread)
                    } else {
                        DescriptorValue::Scalar(sharpness)
                    }
                }
                Descriptor::SpectralKurtosis => DescriptorValue::Scalar(spectral_kurtosis(&mags)),
                Descriptor::Zcr => DescriptorValue::Scalar(zero_crossings(frame.samples)),
                Descriptor::Rms => DescriptorValue::Scalar(rms(frame.samples)),
                Descriptor::Energy => DescriptorValue::Scalar(energy(frame.samples)),
            };
            if !value.is_finite() {
                return Err(DescriptorError::NonFinite(descriptor));
            }
            set.insert(descriptor, value);
        }
        Ok(set)
    }
}

fn hann_window(n: usize) -> Vec<f64> {
    (0..n)
        .map(|i| 0.5 - 0.5 * (2.0 * PI * i as f64 / n as f64).cos())
        .collect()
}

fn hz_to_mel(hz: f64) -> f64 {
    2595.0 * (1.0 + hz / 700.0).log10()
}

fn mel_to_hz(mel: f64) -> f64 {
    700.0 * (10.0_f64.powf(mel / 2595.0) - 1.0)
}

/// Triangular mel filters, `[num_mels][fft_size / 2 + 1]`.
fn mel_filter_bank(
    num_mels: usize,
    fft_size: usize,
    sample_rate: f64,
    low_freq: f64,
    high_freq: f64,
) -> Vec<Vec<f64>> {
    let half_fft = fft_size / 2 + 1;
    let low_mel = hz_to_mel(low_freq);
    let step = (hz_to_mel(high_freq) - low_mel) / (num_mels + 1) as f64;

    let mut bins: Vec<usize> = (0..num_mels + 2)
        .map(|i| {
            let hz = mel_to_hz(low_mel + i as f64 * step);
            ((hz * fft_size as f64 / sample_rate).round() as usize).min(half_fft - 1)
        })
        .collect();
    for i in 1..bins.len() {
        if bins[i] <= bins[i - 1] {
            bins[i] = bins[i - 1] + 1;
        }
    }

    (0..num_mels)
        .map(|m| {
            let mut filter = vec![0.0; half_fft];
            let (left, center, right) = (bins[m], bins[m + 1], bins[m + 2]);
            for (k, w) in filter
                .iter_mut()
                .enumerate()
                .take(center.min(half_fft))
                .skip(left)
            {
                *w = (k - left) as f64 / (center - left) as f64;
            }
            for (k, w) in filter
                .iter_mut()
                .enumerate()
                .take(right.min(half_fft - 1) + 1)
                .skip(center)
            {
                *w = (right - k) as f64 / (right - center) as f64;
            }
            filter
        })
        .collect()
}

fn spectral_centroid(mags: &[f64], bin_hz: f64) -> f64 {
    let total: f64 = mags.iter().sum();
    if total <= 0.0 {
        return 0.0;
    }
    mags.iter()
        .enumerate()
        .map(|(k, m)| k as f64 * bin_hz * m)
        .sum::<f64>()
        / total
}

fn spectral_flatness(power: &[f64]) -> f64 {
    let n = power.len() as f64;
    let log_mean = power.iter().map(|p| (p + LOG_FLOOR).ln()).sum::<f64>() / n;
    let arith_mean = power.iter().map(|p| p + LOG_FLOOR).sum::<f64>() / n;
    log_mean.exp() / arith_mean
}

/// Rolloff point as a fraction of the Nyquist frequency.
fn spectral_rolloff(power: &[f64]) -> f64 {
    let total: f64 = power.iter().sum();
    if total <= 0.0 || power.len() < 2 {
        return 0.0;
    }
    let threshold = total * ROLLOFF_FRACTION;
    let mut cumulative = 0.0;
    for (k, p) in power.iter().enumerate() {
        cumulative += p;
        if cumulative >= threshold {
            return k as f64 / (power.len() - 1) as f64;
        }
    }
    1.0
}

fn spectral_flux(current: &[f64], previous: &[f64]) -> f64 {
    current
        .iter()
        .zip(previous)
        .map(|(c, p)| (c - p).max(0.0).powi(2))
        .sum::<f64>()
        .sqrt()
}

fn spectral_kurtosis(mags: &[f64]) -> f64 {
    let total: f64 = mags.iter().sum();
    if total <= 0.0 || mags.len() < 2 {
        return 0.0;
    }
    let last = (mags.len() - 1) as f64;
    let position = |k: usize| k as f64 / last;
    let mu1 = mags
        .iter()
        .enumerate()
        .map(|(k, m)| position(k) * m)
        .sum::<f64>()
        / total;
    let moment = |order: i32| {
        mags.iter()
            .enumerate()
            .map(|(k, m)| (position(k) - mu1).powi(order) * m)
            .sum::<f64>()
            / total
    };
    let mu2 = moment(2);
    if mu2 <= f64::EPSILON {
        return 0.0;
    }
    moment(4) / (mu2 * mu2)
}

fn bark(hz: f64) -> f64 {
    13.0 * (0.00076 * hz).atan() + 3.5 * (hz / 7500.0).powi(2).atan()
}

/// Specific loudness per Bark band.
fn bark_loudness(power: &[f64], bin_hz: f64) -> [f64; BARK_BANDS] {
    let mut bands = [0.0; BARK_BANDS];
    for (k, p) in power.iter().enumerate() {
        let band = (bark(k as f64 * bin_hz).floor() as usize).min(BARK_BANDS - 1);
        bands[band] += p;
    }
    bands.map(|e| e.powf(0.23))
}

fn perceptual_spread_sharpness(loudness: &[f64; BARK_BANDS]) -> (f64, f64) {
    let total: f64 = loudness.iter().sum();
    if total <= 0.0 {
        return (0.0, 0.0);
    }
    let max = loudness.iter().copied().fold(0.0, f64::max);
    let spread = ((total - max) / total).powi(2);

    let weighted: f64 = loudness
        .iter()
        .enumerate()
        .map(|(b, n)| {
            let z = (b + 1) as f64;
            let g = if z < 15.0 {
                1.0
            } else {
                0.066 * (0.171 * z).exp()
            };
            z * g * n
        })
        .sum();
    (spread, 0.11 * weighted / total)
}

fn zero_crossings(samples: &[f32]) -> f64 {
    samples
        .windows(2)
        .filter(|w| (w[0] >= 0.0) != (w[1] >= 0.0))
        .count() as f64
}

pub(crate) fn energy(samples: &[f32]) -> f64 {
    samples.iter().map(|&s| (s as f64) * (s as f64)).sum()
}

pub(crate) fn rms(samples: &[f32]) -> f64 {
    if samples.is_empty() {
        return 0.0;
    }
    (energy(samples) / samples.len() as f64).sqrt()
}

// =============================================================================
// Deterministic test double
// =============================================================================

/// Fixed-value backend for tests and dry runs.
///
/// Returns the same descriptor values for every frame and fails on the
/// configured frame indices.
#[derive(Debug, Clone)]
pub struct StubDescriptors {
    values: DescriptorSet,
    fail_on: HashSet<usize>,
}

impl StubDescriptors {
    pub fn new(mfcc_coefficients: usize) -> Self {
        let mut values = DescriptorSet::new();
        values.insert(
            Descriptor::Mfcc,
            DescriptorValue::Vector((0..mfcc_coefficients).map(|i| -(i as f64) * 0.5).collect()),
        );
        for (descriptor, value) in [
            (Descriptor::SpectralCentroid, 1200.0),
            (Descriptor::SpectralFlatness, 0.2),
            (Descriptor::SpectralRolloff, 0.4),
            (Descriptor::SpectralFlux, 0.05),
            (Descriptor::PerceptualSpread, 0.6),
            (Descriptor::PerceptualSharpness, 1.1),
            (Descriptor::SpectralKurtosis, 3.0),
            (Descriptor::Zcr, 40.0),
            (Descriptor::Rms, 0.1),
            (Descriptor::Energy, 5.12),
        ] {
            values.insert(descriptor, DescriptorValue::Scalar(value));
        }
        Self {
            values,
            fail_on: HashSet::new(),
        }
    }

    pub fn with_value(mut self, descriptor: Descriptor, value: DescriptorValue) -> Self {
        self.values.insert(descriptor, value);
        self
    }

    pub fn failing_on(mut self, indices: impl IntoIterator<Item = usize>) -> Self {
        self.fail_on.extend(indices);
        self
    }
}

impl DescriptorExtractor for StubDescriptors {
    fn extract(
        &self,
        frame: &FrameInput<'_>,
        requested: &[Descriptor],
    ) -> Result<DescriptorSet, DescriptorError> {
        if self.fail_on.contains(&frame.index) {
            return Err(DescriptorError::Backend(format!(
                "scripted failure at frame {}",
                frame.index
            )));
        }
        let mut perceptual: Option<(f64, f64)> = None;
        let mut set = DescriptorSet::new();
        for &descriptor in requested {
            let value = self
                .values
                .get(descriptor)
                .cloned()
                .ok_or(DescriptorError::Missing(descriptor))?;
            set.insert(descriptor, value);
        }
        Ok(set)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::PI as PI32;

    fn sine(freq: f32, sample_rate: u32, len: usize) -> Vec<f32> {
        (0..len)
            .map(|i| (2.0 * PI32 * freq * i as f32 / sample_rate as f32).sin() * 0.5)
            .collect()
    }

    fn frame(samples: &[f32]) -> FrameInput<'_> {
        FrameInput {
            index: 0,
            samples,
            previous: None,
            sample_rate: 16000,
        }
    }

    #[test]
    fn test_analyzer_returns_all_requested() {
        let analyzer = SpectralAnalyzer::new(512, 13);
        let samples = sine(440.0, 16000, 512);
        let set = analyzer.extract(&frame(&samples), &Descriptor::ALL).unwrap();

        assert_eq!(set.len(), Descriptor::ALL.len());
        assert_eq!(set.vector(Descriptor::Mfcc).unwrap().len(), 13);
    }

    #[test]
    fn test_centroid_tracks_frequency() {
        let analyzer = SpectralAnalyzer::new(512, 13);
        let low = sine(300.0, 16000, 512);
        let high = sine(3000.0, 16000, 512);

        let c_low = analyzer
            .extract(&frame(&low), &[Descriptor::SpectralCentroid])
            .unwrap()
            .scalar(Descriptor::SpectralCentroid)
            .unwrap();
        let c_high = analyzer
            .extract(&frame(&high), &[Descriptor::SpectralCentroid])
            .unwrap()
            .scalar(Descriptor::SpectralCentroid)
            .unwrap();

        assert!(c_low < c_high);
        assert!((c_low - 300.0).abs() < 150.0);
    }

    #[test]
    fn test_time_domain_descriptors() {
        let samples = vec![0.5f32, -0.5, 0.5, -0.5];
        assert_eq!(zero_crossings(&samples), 3.0);
        assert!((rms(&samples) - 0.5).abs() < 1e-12);
        assert!((energy(&samples) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_rolloff_is_fraction_of_nyquist() {
        let analyzer = SpectralAnalyzer::new(512, 13);
        let samples = sine(4000.0, 16000, 512);
        let rolloff = analyzer
            .extract(&frame(&samples), &[Descriptor::SpectralRolloff])
            .unwrap()
            .scalar(Descriptor::SpectralRolloff)
            .unwrap();
        assert!((0.0..=1.0).contains(&rolloff));
        assert!((rolloff - 0.5).abs() < 0.05);
    }

    #[test]
    fn test_silence_is_finite() {
        let analyzer = SpectralAnalyzer::new(256, 13);
        let silence = vec![0.0f32; 256];
        let set = analyzer.extract(&frame(&silence), &Descriptor::ALL).unwrap();
        assert_eq!(set.scalar(Descriptor::Rms).unwrap(), 0.0);
        assert_eq!(set.scalar(Descriptor::SpectralCentroid).unwrap(), 0.0);
    }

    #[test]
    fn test_analyzer_rejects_empty_frame() {
        let analyzer = SpectralAnalyzer::new(256, 13);
        let err = analyzer.extract(&frame(&[]), &Descriptor::ALL).unwrap_err();
        assert_eq!(err, DescriptorError::EmptyFrame);
    }

    #[test]
    fn test_flux_uses_previous_frame() {
        let analyzer = SpectralAnalyzer::new(512, 13);
        let quiet = vec![0.0f32; 512];
        let loud = sine(440.0, 16000, 512);
        let input = FrameInput {
            index: 1,
            samples: &loud,
            previous: Some(&quiet),
            sample_rate: 16000,
        };
        let flux = analyzer
            .extract(&input, &[Descriptor::SpectralFlux])
            .unwrap()
            .scalar(Descriptor::SpectralFlux)
            .unwrap();
        assert!(flux > 0.0);
    }

    #[test]
    fn test_mel_filter_bank_shape() {
        let bank = mel_filter_bank(26, 512, 16000.0, 0.0, 8000.0);
        assert_eq!(bank.len(), 26);
        assert!(bank.iter().all(|f| f.len() == 257));
        assert!(bank.iter().flatten().all(|&w| w >= 0.0));
    }

    #[test]
    fn test_mel_bank_built_once_per_rate() {
        let analyzer = SpectralAnalyzer::new(512, 13);
        let first = analyzer.mel_bank(16000);
        assert!(Arc::ptr_eq(&first, &analyzer.mel_bank(16000)));
        assert!(!Arc::ptr_eq(&first, &analyzer.mel_bank(44100)));
        assert_eq!(first.len(), 26);

        let samples = sine(440.0, 16000, 512);
        analyzer.extract(&frame(&samples), &Descriptor::ALL).unwrap();
        assert_eq!(analyzer.mel_banks.read().unwrap().len(), 2);
    }

    #[test]
    fn test_perceptual_pair_matches_bark_loudness() {
        let analyzer = SpectralAnalyzer::new(512, 13);
        let samples = sine(1000.0, 16000, 512);
        let set = analyzer
            .extract(
                &frame(&samples),
                &[Descriptor::PerceptualSpread, Descriptor::PerceptualSharpness],
            )
            .unwrap();

        let power: Vec<f64> = analyzer.magnitudes(&samples).iter().map(|m| m * m).collect();
        let (spread, sharpness) =
            perceptual_spread_sharpness(&bark_loudness(&power, 16000.0 / 512.0));
        assert_eq!(set.scalar(Descriptor::PerceptualSpread).unwrap(), spread);
        assert_eq!(set.scalar(Descriptor::PerceptualSharpness).unwrap(), sharpness);
    }

    #[test]
    fn test_stub_scripted_failure() {
        let stub = StubDescriptors::new(13).failing_on([2]);
        let samples = vec![0.1f32; 64];
        let mut input = frame(&samples);
        assert!(stub.extract(&input, &Descriptor::ALL).is_ok());

        input.index = 2;
        assert!(matches!(
            stub.extract(&input, &Descriptor::ALL),
            Err(DescriptorError::Backend(_))
        ));
    }

    #[test]
    fn test_descriptor_set_shape_errors() {
        let stub = StubDescriptors::new(4);
        let samples = vec![0.1f32; 64];
        let set = stub.extract(&frame(&samples), &Descriptor::ALL).unwrap();
        assert_eq!(
            set.scalar(Descriptor::Mfcc),
            Err(DescriptorError::WrongShape(Descriptor::Mfcc))
        );
        assert_eq!(
            set.vector(Descriptor::Rms),
            Err(DescriptorError::WrongShape(Descriptor::Rms))
        );
    }
}

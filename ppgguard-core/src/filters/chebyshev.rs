//! Chebyshev Type II bandpass with zero-phase application
//!
//! Design follows the analog-prototype route: Type II lowpass prototype with
//! equiripple stopband, lowpass-to-bandpass transform, bilinear transform with
//! prewarped band edges, then pole/zero pairing into second-order sections.
//! The band edges are where the stopband attenuation is first reached.
//!
//! Filtering runs the cascade forward and backward over an odd-reflected
//! extension of the signal, with each section started from its steady state.
//! The net phase shift is zero and the magnitude response is squared.

use core::f64::consts::PI;
use num_complex::Complex64;

use super::{ensure_finite, BandSpec};
use crate::constants::filters::{CHEBYSHEV_MAX_ORDER, CHEBYSHEV_ORDER, CHEBYSHEV_STOPBAND_DB};
use crate::errors::{FilterError, FilterResult};

/// Bilinear transform constant (2 * fs with fs normalized to 2)
const BILINEAR_K: f64 = 4.0;

/// Zero-phase Chebyshev II bandpass with the default design
///
/// Empty input yields empty output and a single sample passes through.
pub fn bandpass_chebyshev2(
    signal: &[f64],
    sample_rate: f64,
    low_hz: f64,
    high_hz: f64,
) -> FilterResult<Vec<f64>> {
    ChebyshevBandpass::design(
        CHEBYSHEV_ORDER,
        CHEBYSHEV_STOPBAND_DB,
        BandSpec::new(low_hz, high_hz),
        sample_rate,
    )?
    .apply(signal)
}

/// A single second-order section
///
/// H(z) = (b0 + b1 z^-1 + b2 z^-2) / (1 + a1 z^-1 + a2 z^-2),
/// run in Direct Form II Transposed.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Biquad {
    b: [f64; 3],
    a: [f64; 2],
}

impl Biquad {
    /// Section from numerator `[b0, b1, b2]` and denominator `[a1, a2]`
    pub fn new(b: [f64; 3], a: [f64; 2]) -> Self {
        Self { b, a }
    }

    /// Numerator coefficients
    pub fn numerator(&self) -> &[f64; 3] {
        &self.b
    }

    /// Denominator coefficients (a0 = 1 implied)
    pub fn denominator(&self) -> &[f64; 2] {
        &self.a
    }

    /// Poles strictly inside the unit circle
    pub fn is_stable(&self) -> bool {
        self.a[1].abs() < 1.0 && self.a[0].abs() < 1.0 + self.a[1]
    }

    /// Gain at DC
    fn dc_gain(&self) -> f64 {
        (self.b[0] + self.b[1] + self.b[2]) / (1.0 + self.a[0] + self.a[1])
    }

    /// State that a unit step input holds constant
    fn steady_state(&self) -> [f64; 2] {
        let [b0, b1, b2] = self.b;
        let [a1, a2] = self.a;
        let bb0 = b1 - a1 * b0;
        let bb1 = b2 - a2 * b0;
        let z0 = (bb0 + bb1) / (1.0 + a1 + a2);
        [z0, bb1 - a2 * z0]
    }

    fn run(&self, samples: &mut [f64], mut state: [f64; 2]) {
        for x in samples.iter_mut() {
            let input = *x;
            let output = self.b[0] * input + state[0];
            state[0] = self.b[1] * input - self.a[0] * output + state[1];
            state[1] = self.b[2] * input - self.a[1] * output;
            *x = output;
        }
    }

    fn response(&self, z_inv: Complex64) -> Complex64 {
        let z_inv2 = z_inv * z_inv;
        let num = self.b[0] + self.b[1] * z_inv + self.b[2] * z_inv2;
        let den = 1.0 + self.a[0] * z_inv + self.a[1] * z_inv2;
        num / den
    }
}

/// Cascade of second-order sections
#[derive(Debug, Clone, PartialEq)]
pub struct SosFilter {
    sections: Vec<Biquad>,
}

impl SosFilter {
    /// Cascade in application order
    pub fn new(sections: Vec<Biquad>) -> Self {
        Self { sections }
    }

    /// Sections in application order
    pub fn sections(&self) -> &[Biquad] {
        &self.sections
    }

    /// Every section stable
    pub fn is_stable(&self) -> bool {
        self.sections.iter().all(Biquad::is_stable)
    }

    /// Samples reflected onto each end before forward-backward filtering
    pub fn pad_len(&self) -> usize {
        3 * (2 * self.sections.len() + 1)
    }

    /// Shortest signal [`SosFilter::filtfilt`] accepts
    pub fn min_len(&self) -> usize {
        self.pad_len() + 1
    }

    /// Complex response at `freq_hz`
    pub fn frequency_response(&self, freq_hz: f64, sample_rate: f64) -> Complex64 {
        let omega = 2.0 * PI * freq_hz / sample_rate;
        let z_inv = Complex64::new(omega.cos(), -omega.sin());
        self.sections
            .iter()
            .fold(Complex64::new(1.0, 0.0), |acc, s| acc * s.response(z_inv))
    }

    /// Magnitude response in dB at `freq_hz`
    pub fn magnitude_response_db(&self, freq_hz: f64, sample_rate: f64) -> f64 {
        20.0 * self.frequency_response(freq_hz, sample_rate).norm().log10()
    }

    /// Single causal pass from zero state
    pub fn filter(&self, signal: &[f64]) -> Vec<f64> {
        let mut out = signal.to_vec();
        for section in &self.sections {
            section.run(&mut out, [0.0; 2]);
        }
        out
    }

    /// Zero-phase forward-backward filtering
    pub fn filtfilt(&self, signal: &[f64]) -> FilterResult<Vec<f64>> {
        let n = signal.len();
        let pad = self.pad_len();
        if n <= pad {
            return Err(FilterError::InsufficientSamples {
                required: self.min_len(),
                available: n,
            });
        }

        let first = signal[0];
        let last = signal[n - 1];
        let mut ext = Vec::with_capacity(n + 2 * pad);
        ext.extend((1..=pad).rev().map(|i| 2.0 * first - signal[i]));
        ext.extend_from_slice(signal);
        ext.extend((0..pad).map(|i| 2.0 * last - signal[n - 2 - i]));

        let zi = self.steady_states();

        self.run_from(&mut ext, &zi);
        ext.reverse();
        self.run_from(&mut ext, &zi);
        ext.reverse();

        Ok(ext[pad..pad + n].to_vec())
    }

    /// Per-section initial state for a unit step through the whole cascade
    fn steady_states(&self) -> Vec<[f64; 2]> {
        let mut scale = 1.0;
        self.sections
            .iter()
            .map(|s| {
                let [z0, z1] = s.steady_state();
                let zi = [scale * z0, scale * z1];
                scale *= s.dc_gain();
                zi
            })
            .collect()
    }

    fn run_from(&self, samples: &mut [f64], zi: &[[f64; 2]]) {
        let x0 = samples.first().copied().unwrap_or(0.0);
        for (section, state) in self.sections.iter().zip(zi) {
            section.run(samples, [state[0] * x0, state[1] * x0]);
        }
    }
}

/// Designed Chebyshev Type II bandpass
#[derive(Debug, Clone, PartialEq)]
pub struct ChebyshevBandpass {
    order: usize,
    stopband_db: f64,
    band: BandSpec,
    sample_rate: f64,
    sos: SosFilter,
}

impl ChebyshevBandpass {
    /// Design a bandpass from a lowpass prototype of even `order`
    ///
    /// The resulting cascade has `order` sections.
    pub fn design(
        order: usize,
        stopband_db: f64,
        band: BandSpec,
        sample_rate: f64,
    ) -> FilterResult<Self> {
        if order == 0 || order % 2 != 0 || order > CHEBYSHEV_MAX_ORDER {
            return Err(FilterError::InvalidOrder { order });
        }
        band.validate_open(sample_rate)?;
        if !stopband_db.is_finite() || stopband_db <= 0.0 {
            return Err(FilterError::InvalidAttenuation { db: stopband_db });
        }

        let (zeros, poles, gain) = prototype(order, stopband_db);
        let (zeros, poles) = lowpass_to_bandpass(&zeros, &poles, band, sample_rate);
        let (zeros, poles, gain) = bilinear(&zeros, &poles, gain);
        let sos = pair_sections(&zeros, &poles, gain).ok_or(FilterError::InvalidBand {
            low_hz: band.low_hz,
            high_hz: band.high_hz,
            nyquist_hz: sample_rate / 2.0,
        })?;

        Ok(Self {
            order,
            stopband_db,
            band,
            sample_rate,
            sos,
        })
    }

    /// Prototype order
    pub fn order(&self) -> usize {
        self.order
    }

    /// Stopband attenuation in dB
    pub fn stopband_db(&self) -> f64 {
        self.stopband_db
    }

    /// Passband
    pub fn band(&self) -> BandSpec {
        self.band
    }

    /// Sample rate the design is bound to
    pub fn sample_rate(&self) -> f64 {
        self.sample_rate
    }

    /// Underlying cascade
    pub fn sos(&self) -> &SosFilter {
        &self.sos
    }

    /// Filter one channel
    ///
    /// Empty stays empty and a single sample is returned unfiltered. Anything
    /// else shorter than [`SosFilter::min_len`] is rejected.
    pub fn apply(&self, signal: &[f64]) -> FilterResult<Vec<f64>> {
        if signal.is_empty() {
            return Ok(Vec::new());
        }
        ensure_finite(signal)?;
        if signal.len() == 1 {
            return Ok(signal.to_vec());
        }
        self.sos.filtfilt(signal)
    }
}

/// Analog Type II lowpass prototype with unit stopband edge
fn prototype(order: usize, stopband_db: f64) -> (Vec<Complex64>, Vec<Complex64>, f64) {
    let n = order as f64;
    let eps = 1.0 / (10f64.powf(0.1 * stopband_db) - 1.0).sqrt();
    let mu = (1.0 / eps).asinh() / n;

    let ms: Vec<f64> = (0..order).map(|i| -n + 1.0 + 2.0 * i as f64).collect();

    let zeros: Vec<Complex64> = ms
        .iter()
        .map(|m| Complex64::new(0.0, 1.0 / (m * PI / (2.0 * n)).sin()))
        .collect();

    let poles: Vec<Complex64> = ms
        .iter()
        .map(|m| {
            let q = -Complex64::from_polar(1.0, PI * m / (2.0 * n));
            let warped = Complex64::new(mu.sinh() * q.re, mu.cosh() * q.im);
            warped.inv()
        })
        .collect();

    let num: Complex64 = poles.iter().map(|p| -*p).product();
    let den: Complex64 = zeros.iter().map(|z| -*z).product();
    (zeros, poles, (num / den).re)
}

/// Map the prototype onto the prewarped analog band
fn lowpass_to_bandpass(
    zeros: &[Complex64],
    poles: &[Complex64],
    band: BandSpec,
    sample_rate: f64,
) -> (Vec<Complex64>, Vec<Complex64>) {
    let w1 = prewarp(band.low_hz, sample_rate);
    let w2 = prewarp(band.high_hz, sample_rate);
    let bw = w2 - w1;
    let wo2 = w1 * w2;

    let split = |r: &Complex64| {
        let half = *r * (bw / 2.0);
        let root = (half * half - wo2).sqrt();
        [half + root, half - root]
    };

    (
        zeros.iter().flat_map(&split).collect(),
        poles.iter().flat_map(&split).collect(),
    )
}

fn prewarp(freq_hz: f64, sample_rate: f64) -> f64 {
    BILINEAR_K * (PI * freq_hz / sample_rate).tan()
}

fn bilinear(
    zeros: &[Complex64],
    poles: &[Complex64],
    gain: f64,
) -> (Vec<Complex64>, Vec<Complex64>, f64) {
    let map = |s: &Complex64| (BILINEAR_K + *s) / (BILINEAR_K - *s);
    let num: Complex64 = zeros.iter().map(|z| BILINEAR_K - *z).product();
    let den: Complex64 = poles.iter().map(|p| BILINEAR_K - *p).product();
    (
        zeros.iter().map(map).collect(),
        poles.iter().map(map).collect(),
        gain * (num / den).re,
    )
}

/// Pair each upper-half-plane pole with its nearest zero
///
/// Poles furthest from the origin come first. The overall gain is folded into
/// the first section's numerator.
fn pair_sections(zeros: &[Complex64], poles: &[Complex64], gain: f64) -> Option<SosFilter> {
    let mut upper_poles: Vec<Complex64> = poles.iter().copied().filter(|p| p.im > 0.0).collect();
    upper_poles.sort_by(|a, b| b.norm().total_cmp(&a.norm()));
    let mut upper_zeros: Vec<Complex64> = zeros.iter().copied().filter(|z| z.im > 0.0).collect();

    if upper_poles.is_empty() || upper_poles.len() != upper_zeros.len() {
        return None;
    }

    let mut sections = Vec::with_capacity(upper_poles.len());
    for p in upper_poles {
        let (idx, _) = upper_zeros
            .iter()
            .enumerate()
            .min_by(|(_, a), (_, b)| (**a - p).norm().total_cmp(&(**b - p).norm()))?;
        let z = upper_zeros.swap_remove(idx);
        sections.push(Biquad::new(
            [1.0, -2.0 * z.re, z.norm_sqr()],
            [-2.0 * p.re, p.norm_sqr()],
        ));
    }

    if let Some(first) = sections.first_mut() {
        first.b.iter_mut().for_each(|c| *c *= gain);
    }
    Some(SosFilter::new(sections))
}

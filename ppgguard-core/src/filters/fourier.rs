//! Frequency-domain bandpass and spectrum view
//!
//! The mask is brick-wall: bins outside the band are exactly zero, at the cost
//! of ringing that the Chebyshev path does not have.

use rustfft::{num_complex::Complex64, FftPlanner};

use super::{ensure_finite, BandSpec};
use crate::errors::FilterResult;

/// Zero every bin whose absolute frequency lies outside `[low_hz, high_hz]`
///
/// The DC bin is kept whenever `low_hz > 0`, so the baseline survives even
/// though it lies below the passband. Returns the real part of the inverse
/// transform. Empty input gives empty output and a single sample passes
/// through.
pub fn bandpass_fourier_mask(
    signal: &[f64],
    sample_rate: f64,
    low_hz: f64,
    high_hz: f64,
) -> FilterResult<Vec<f64>> {
    let band = BandSpec::new(low_hz, high_hz);
    band.validate_mask(sample_rate)?;
    if signal.is_empty() {
        return Ok(Vec::new());
    }
    ensure_finite(signal)?;
    if signal.len() == 1 {
        return Ok(signal.to_vec());
    }

    let n = signal.len();
    let mut planner = FftPlanner::<f64>::new();
    let forward = planner.plan_fft_forward(n);
    let inverse = planner.plan_fft_inverse(n);

    let mut buffer: Vec<Complex64> = signal.iter().map(|&x| Complex64::new(x, 0.0)).collect();
    forward.process(&mut buffer);

    let dc = buffer[0];
    for (k, bin) in buffer.iter_mut().enumerate() {
        let freq = bin_frequency(k, n, sample_rate).abs();
        if freq < band.low_hz || freq > band.high_hz {
            *bin = Complex64::new(0.0, 0.0);
        }
    }
    if band.low_hz > 0.0 {
        buffer[0] = dc;
    }

    inverse.process(&mut buffer);
    let scale = 1.0 / n as f64;
    Ok(buffer.iter().map(|c| c.re * scale).collect())
}

/// Magnitude of the non-negative half spectrum as `(frequency_hz, magnitude)`
///
/// Magnitudes are normalized by the signal length.
pub fn magnitude_spectrum(signal: &[f64], sample_rate: f64) -> FilterResult<Vec<(f64, f64)>> {
    super::validate_rate(sample_rate)?;
    if signal.is_empty() {
        return Ok(Vec::new());
    }
    ensure_finite(signal)?;

    let n = signal.len();
    let mut buffer: Vec<Complex64> = signal.iter().map(|&x| Complex64::new(x, 0.0)).collect();
    FftPlanner::<f64>::new()
        .plan_fft_forward(n)
        .process(&mut buffer);

    let scale = 1.0 / n as f64;
    Ok(buffer
        .iter()
        .take(n / 2 + 1)
        .enumerate()
        .map(|(k, c)| (bin_frequency(k, n, sample_rate), c.norm() * scale))
        .collect())
}

/// Signed frequency of FFT bin `k` (negative above Nyquist)
fn bin_frequency(k: usize, n: usize, sample_rate: f64) -> f64 {
    let k = if k <= n / 2 { k as f64 } else { k as f64 - n as f64 };
    k * sample_rate / n as f64
}

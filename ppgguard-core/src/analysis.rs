//! Reference beat-level PPG analysis
//!
//! A plain implementation of [`PpgAnalysis`]: Chebyshev heart-rate bandpass and
//! unit normalization for cleaning, refractory-limited local maxima for peaks,
//! peak-to-peak beats, and per-beat correlation against the mean beat as the
//! quality trace.

use crate::constants::filters::{CHEBYSHEV_ORDER, CHEBYSHEV_STOPBAND_DB};
use crate::errors::{AnalysisError, AnalysisResult};
use crate::filters::{normalize_unit, BandSpec, ChebyshevBandpass};
use crate::traits::PpgAnalysis;

/// Shortest beat-to-beat interval accepted, in seconds (200 bpm)
pub const MIN_BEAT_INTERVAL_SECS: f64 = 0.3;

/// Peak height threshold on the unit-normalized signal
pub const PEAK_HEIGHT_THRESHOLD: f64 = 0.5;

/// Built-in [`PpgAnalysis`] implementation
#[derive(Debug, Clone)]
pub struct BasicPpgAnalysis {
    band: BandSpec,
    min_beat_interval_secs: f64,
    peak_threshold: f64,
}

impl Default for BasicPpgAnalysis {
    fn default() -> Self {
        Self {
            band: BandSpec::HEART_RATE,
            min_beat_interval_secs: MIN_BEAT_INTERVAL_SECS,
            peak_threshold: PEAK_HEIGHT_THRESHOLD,
        }
    }
}

impl BasicPpgAnalysis {
    /// Defaults: heart-rate band, 0.3 s refractory period, 0.5 threshold
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the cleaning passband
    pub fn band(mut self, band: BandSpec) -> Self {
        self.band = band;
        self
    }

    /// Set the refractory period between peaks
    pub fn min_beat_interval_secs(mut self, secs: f64) -> Self {
        self.min_beat_interval_secs = secs;
        self
    }

    /// Set the peak height threshold (cleaned signal is in `[0, 1]`)
    pub fn peak_threshold(mut self, threshold: f64) -> Self {
        self.peak_threshold = threshold;
        self
    }

    fn beats<'a>(&self, cleaned: &'a [f64], peaks: &[usize]) -> AnalysisResult<Vec<&'a [f64]>> {
        if peaks.len() < 2 {
            return Err(AnalysisError::TooFewPeaks {
                required: 2,
                found: peaks.len(),
            });
        }
        let len = cleaned.len();
        for pair in peaks.windows(2) {
            if pair[0] >= pair[1] {
                return Err(AnalysisError::InvalidPeak { index: pair[1], len });
            }
        }
        if let Some(&last) = peaks.last() {
            if last >= len {
                return Err(AnalysisError::InvalidPeak { index: last, len });
            }
        }
        Ok(peaks.windows(2).map(|p| &cleaned[p[0]..p[1]]).collect())
    }
}

impl PpgAnalysis for BasicPpgAnalysis {
    type Error = AnalysisError;

    fn clean(&self, signal: &[f64], sample_rate: f64) -> AnalysisResult<Vec<f64>> {
        let filter =
            ChebyshevBandpass::design(CHEBYSHEV_ORDER, CHEBYSHEV_STOPBAND_DB, self.band, sample_rate)?;
        let filtered = filter.apply(signal)?;
        Ok(normalize_unit(&filtered)?)
    }

    fn find_peaks(&self, cleaned: &[f64], sample_rate: f64) -> AnalysisResult<Vec<usize>> {
        let refractory = (self.min_beat_interval_secs * sample_rate).ceil().max(1.0) as usize;
        let mut peaks: Vec<usize> = Vec::new();

        for i in 1..cleaned.len().saturating_sub(1) {
            let x = cleaned[i];
            let is_peak = x > cleaned[i - 1] && x >= cleaned[i + 1] && x >= self.peak_threshold;
            if !is_peak {
                continue;
            }
            match peaks.last_mut() {
                Some(last) if i - *last < refractory => {
                    if x > cleaned[*last] {
                        *last = i;
                    }
                }
                _ => peaks.push(i),
            }
        }
        Ok(peaks)
    }

    fn segment(
        &self,
        cleaned: &[f64],
        peaks: &[usize],
        _sample_rate: f64,
    ) -> AnalysisResult<Vec<Vec<f64>>> {
        Ok(self
            .beats(cleaned, peaks)?
            .into_iter()
            .map(<[f64]>::to_vec)
            .collect())
    }

    fn quality(
        &self,
        cleaned: &[f64],
        peaks: &[usize],
        _sample_rate: f64,
    ) -> AnalysisResult<Vec<f64>> {
        let beats = self.beats(cleaned, peaks)?;
        let width = beats.iter().map(|b| b.len()).min().unwrap_or(0);
        if width < 2 {
            return Ok(vec![0.0; beats.len()]);
        }

        let mut template = vec![0.0; width];
        for beat in &beats {
            for (t, v) in template.iter_mut().zip(beat.iter()) {
                *t += v;
            }
        }
        let count = beats.len() as f64;
        template.iter_mut().for_each(|t| *t /= count);

        Ok(beats
            .iter()
            .map(|beat| correlation(&beat[..width], &template))
            .collect())
    }
}

/// Pearson correlation; 0 when either side is constant
fn correlation(a: &[f64], b: &[f64]) -> f64 {
    let n = a.len().min(b.len());
    if n == 0 {
        return 0.0;
    }
    let mean_a = a[..n].iter().sum::<f64>() / n as f64;
    let mean_b = b[..n].iter().sum::<f64>() / n as f64;
    let (mut cov, mut var_a, mut var_b) = (0.0, 0.0, 0.0);
    for (x, y) in a[..n].iter().zip(&b[..n]) {
        let dx = x - mean_a;
        let dy = y - mean_b;
        cov += dx * dy;
        var_a += dx * dx;
        var_b += dy * dy;
    }
    let denom = (var_a * var_b).sqrt();
    if denom == 0.0 {
        0.0
    } else {
        cov / denom
    }
}

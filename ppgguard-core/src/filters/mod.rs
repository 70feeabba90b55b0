//! Filter bank
//!
//! Pure, deterministic transforms over one channel at a time:
//!
//! - [`bandpass_chebyshev2`]: zero-phase Chebyshev Type II bandpass
//! - [`moving_average`]: unweighted sliding mean, valid mode
//! - [`bandpass_fourier_mask`]: brick-wall frequency-domain bandpass
//! - [`normalize`]: min-max rescale
//!
//! [`FilterBank`] runs the configured set over a channel and collects the
//! results in a [`FilteredChannelSet`]. A variant whose filter fails is logged
//! and left absent; the other variants are unaffected.

mod chebyshev;
mod fourier;
mod moving_average;
mod normalize;

pub use chebyshev::{bandpass_chebyshev2, Biquad, ChebyshevBandpass, SosFilter};
pub use fourier::{bandpass_fourier_mask, magnitude_spectrum};
pub use moving_average::moving_average;
pub use normalize::{normalize, normalize_unit};

use core::fmt;
use serde::{Deserialize, Serialize};

use crate::constants::filters::{
    CHEBYSHEV_ORDER, CHEBYSHEV_STOPBAND_DB, EXPLORATORY_BAND_HIGH_HZ, EXPLORATORY_BAND_LOW_HZ,
    HEART_RATE_BAND_HIGH_HZ, HEART_RATE_BAND_LOW_HZ, MOVING_AVERAGE_WINDOW,
};
use crate::errors::{FilterError, FilterResult};
use crate::measurement::Channel;

/// Passband edges in Hz
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BandSpec {
    /// Lower edge
    pub low_hz: f64,
    /// Upper edge
    pub high_hz: f64,
}

impl BandSpec {
    /// Cardiac fundamental and harmonics, 0.5 to 8 Hz
    pub const HEART_RATE: BandSpec = BandSpec::new(HEART_RATE_BAND_LOW_HZ, HEART_RATE_BAND_HIGH_HZ);

    /// Wide inspection band, 0.01 to 15 Hz
    pub const EXPLORATORY: BandSpec =
        BandSpec::new(EXPLORATORY_BAND_LOW_HZ, EXPLORATORY_BAND_HIGH_HZ);

    /// Band from its edges
    pub const fn new(low_hz: f64, high_hz: f64) -> Self {
        Self { low_hz, high_hz }
    }

    fn invalid(&self, sample_rate: f64) -> FilterError {
        FilterError::InvalidBand {
            low_hz: self.low_hz,
            high_hz: self.high_hz,
            nyquist_hz: sample_rate / 2.0,
        }
    }

    /// IIR design needs `0 < low < high < nyquist`
    pub(crate) fn validate_open(&self, sample_rate: f64) -> FilterResult<()> {
        validate_rate(sample_rate)?;
        let nyquist = sample_rate / 2.0;
        let ok = self.low_hz.is_finite()
            && self.high_hz.is_finite()
            && self.low_hz > 0.0
            && self.low_hz < self.high_hz
            && self.high_hz < nyquist;
        if ok {
            Ok(())
        } else {
            Err(self.invalid(sample_rate))
        }
    }

    /// A spectral mask only needs `0 <= low <= high`
    pub(crate) fn validate_mask(&self, sample_rate: f64) -> FilterResult<()> {
        validate_rate(sample_rate)?;
        let ok = self.low_hz.is_finite()
            && self.high_hz.is_finite()
            && self.low_hz >= 0.0
            && self.low_hz <= self.high_hz;
        if ok {
            Ok(())
        } else {
            Err(self.invalid(sample_rate))
        }
    }
}

impl Default for BandSpec {
    fn default() -> Self {
        Self::HEART_RATE
    }
}

pub(crate) fn validate_rate(sample_rate: f64) -> FilterResult<()> {
    if sample_rate.is_finite() && sample_rate > 0.0 {
        Ok(())
    } else {
        Err(FilterError::InvalidSampleRate {
            rate_hz: sample_rate,
        })
    }
}

pub(crate) fn ensure_finite(signal: &[f64]) -> FilterResult<()> {
    if signal.iter().all(|x| x.is_finite()) {
        Ok(())
    } else {
        Err(FilterError::NonFiniteInput)
    }
}

/// Which transform produced a series
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterVariant {
    /// Unfiltered samples
    Raw,
    /// Moving average
    MovingAverage,
    /// Chebyshev II bandpass
    Chebyshev,
    /// Fourier-mask bandpass
    Fourier,
}

impl FilterVariant {
    /// Every variant, in persisted order
    pub const ALL: [FilterVariant; 4] = [
        FilterVariant::Raw,
        FilterVariant::MovingAverage,
        FilterVariant::Chebyshev,
        FilterVariant::Fourier,
    ];

    /// Tag used in SQI keys
    pub fn tag(&self) -> &'static str {
        match self {
            Self::Raw => "raw",
            Self::MovingAverage => "movavg",
            Self::Chebyshev => "cheby",
            Self::Fourier => "fourier",
        }
    }

    /// Parse an SQI key tag
    pub fn from_tag(tag: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|v| v.tag() == tag)
    }

    /// Suffix of the persisted signal key (`redFilteredCheby`, `irMeasure`, ...)
    pub fn signal_suffix(&self) -> &'static str {
        match self {
            Self::Raw => "Measure",
            Self::MovingAverage => "FilteredMA",
            Self::Chebyshev => "FilteredCheby",
            Self::Fourier => "FilteredFourier",
        }
    }

    /// Persisted signal key for a channel
    pub fn signal_key(&self, channel: Channel) -> String {
        format!("{}{}", channel.tag(), self.signal_suffix())
    }

    /// Inverse of [`FilterVariant::signal_key`]
    pub fn parse_signal_key(key: &str) -> Option<(Channel, Self)> {
        Channel::ALL.into_iter().find_map(|channel| {
            let rest = key.strip_prefix(channel.tag())?;
            Self::ALL
                .into_iter()
                .find(|v| v.signal_suffix() == rest)
                .map(|v| (channel, v))
        })
    }
}

impl fmt::Display for FilterVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

/// All series derived from one channel
///
/// Series share a time axis but not a length: the moving average is
/// `window - 1` samples shorter than `raw`.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FilteredChannelSet {
    /// Samples as decoded
    pub raw: Vec<f64>,
    /// Moving-average output, absent if the filter failed or was disabled
    pub moving_average: Option<Vec<f64>>,
    /// Chebyshev output, absent if the filter failed or was disabled
    pub chebyshev: Option<Vec<f64>>,
    /// Fourier-mask output, absent unless enabled
    pub fourier: Option<Vec<f64>>,
}

impl FilteredChannelSet {
    /// Set holding only the raw series
    pub fn from_raw(raw: Vec<f64>) -> Self {
        Self {
            raw,
            ..Self::default()
        }
    }

    /// One series, if present
    pub fn variant(&self, variant: FilterVariant) -> Option<&[f64]> {
        match variant {
            FilterVariant::Raw => Some(&self.raw),
            FilterVariant::MovingAverage => self.moving_average.as_deref(),
            FilterVariant::Chebyshev => self.chebyshev.as_deref(),
            FilterVariant::Fourier => self.fourier.as_deref(),
        }
    }

    /// Store one series
    pub fn set_variant(&mut self, variant: FilterVariant, series: Vec<f64>) {
        match variant {
            FilterVariant::Raw => self.raw = series,
            FilterVariant::MovingAverage => self.moving_average = Some(series),
            FilterVariant::Chebyshev => self.chebyshev = Some(series),
            FilterVariant::Fourier => self.fourier = Some(series),
        }
    }

    /// Present series, in [`FilterVariant::ALL`] order
    pub fn variants(&self) -> impl Iterator<Item = (FilterVariant, &[f64])> + '_ {
        FilterVariant::ALL
            .into_iter()
            .filter_map(move |v| self.variant(v).map(|s| (v, s)))
    }

    /// Number of present series, raw included
    pub fn variant_count(&self) -> usize {
        self.variants().count()
    }
}

/// What the filter bank runs on each channel
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterBankConfig {
    /// Chebyshev prototype order (even)
    pub chebyshev_order: usize,
    /// Chebyshev stopband attenuation in dB
    pub chebyshev_stopband_db: f64,
    /// Chebyshev passband
    pub chebyshev_band: BandSpec,
    /// Moving-average window; `None` disables the variant
    pub moving_average_window: Option<usize>,
    /// Fourier-mask passband; `None` disables the variant
    pub fourier_band: Option<BandSpec>,
}

impl Default for FilterBankConfig {
    fn default() -> Self {
        Self {
            chebyshev_order: CHEBYSHEV_ORDER,
            chebyshev_stopband_db: CHEBYSHEV_STOPBAND_DB,
            chebyshev_band: BandSpec::HEART_RATE,
            moving_average_window: Some(MOVING_AVERAGE_WINDOW),
            fourier_band: None,
        }
    }
}

/// Runs the configured filters over one channel
#[derive(Debug, Clone, Default)]
pub struct FilterBank {
    config: FilterBankConfig,
}

impl FilterBank {
    /// Bank with the given configuration
    pub fn new(config: FilterBankConfig) -> Self {
        Self { config }
    }

    /// Active configuration
    pub fn config(&self) -> &FilterBankConfig {
        &self.config
    }

    /// Design the Chebyshev bandpass for a sample rate
    pub fn chebyshev(&self, sample_rate: f64) -> FilterResult<ChebyshevBandpass> {
        ChebyshevBandpass::design(
            self.config.chebyshev_order,
            self.config.chebyshev_stopband_db,
            self.config.chebyshev_band,
            sample_rate,
        )
    }

    /// Filter one channel
    ///
    /// Never fails as a whole: a variant whose filter errors is logged and left
    /// absent.
    pub fn apply(&self, channel: Channel, samples: &[i64], sample_rate: f64) -> FilteredChannelSet {
        let raw: Vec<f64> = samples.iter().map(|&s| s as f64).collect();
        let mut set = FilteredChannelSet::from_raw(raw);

        if let Some(window) = self.config.moving_average_window {
            let smoothed = moving_average(&set.raw, window);
            set.moving_average = keep(channel, FilterVariant::MovingAverage, smoothed);
        }

        let cheby = self
            .chebyshev(sample_rate)
            .and_then(|filter| filter.apply(&set.raw));
        set.chebyshev = keep(channel, FilterVariant::Chebyshev, cheby);

        if let Some(band) = self.config.fourier_band {
            let fourier = bandpass_fourier_mask(&set.raw, sample_rate, band.low_hz, band.high_hz);
            set.fourier = keep(channel, FilterVariant::Fourier, fourier);
        }

        set
    }
}

fn keep(
    channel: Channel,
    variant: FilterVariant,
    result: FilterResult<Vec<f64>>,
) -> Option<Vec<f64>> {
    match result {
        Ok(series) => Some(series),
        Err(e) => {
            log_warn!("{} {} filter failed, variant dropped: {}", channel, variant, e);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core::f64::consts::PI;

    fn ppg(n: usize, fs: f64) -> Vec<i64> {
        (0..n)
            .map(|i| {
                let t = i as f64 / fs;
                (-(50_000.0 + 800.0 * (2.0 * PI * 1.2 * t).sin())).round() as i64
            })
            .collect()
    }

    #[test]
    fn variant_tags_round_trip() {
        for v in FilterVariant::ALL {
            assert_eq!(FilterVariant::from_tag(v.tag()), Some(v));
        }
        assert_eq!(FilterVariant::from_tag("median"), None);
    }

    #[test]
    fn signal_keys() {
        assert_eq!(FilterVariant::Raw.signal_key(Channel::Red), "redMeasure");
        assert_eq!(FilterVariant::MovingAverage.signal_key(Channel::Ir), "irFilteredMA");
        assert_eq!(FilterVariant::Chebyshev.signal_key(Channel::Red), "redFilteredCheby");
        assert_eq!(
            FilterVariant::parse_signal_key("irFilteredFourier"),
            Some((Channel::Ir, FilterVariant::Fourier))
        );
        assert_eq!(FilterVariant::parse_signal_key("greenMeasure"), None);
    }

    #[test]
    fn default_bank_produces_three_variants() {
        let bank = FilterBank::default();
        let set = bank.apply(Channel::Ir, &ppg(1000, 100.0), 100.0);
        assert_eq!(set.raw.len(), 1000);
        assert_eq!(set.moving_average.as_ref().map(Vec::len), Some(991));
        assert_eq!(set.chebyshev.as_ref().map(Vec::len), Some(1000));
        assert!(set.fourier.is_none());
        assert_eq!(set.variant_count(), 3);
    }

    #[test]
    fn fourier_variant_when_enabled() {
        let config = FilterBankConfig {
            fourier_band: Some(BandSpec::HEART_RATE),
            ..FilterBankConfig::default()
        };
        let set = FilterBank::new(config).apply(Channel::Red, &ppg(500, 100.0), 100.0);
        assert_eq!(set.fourier.as_ref().map(Vec::len), Some(500));
        assert_eq!(set.variant_count(), 4);
    }

    #[test]
    fn failing_variant_is_absent() {
        // 2 Hz sampling puts the 8 Hz edge above Nyquist
        let set = FilterBank::default().apply(Channel::Ir, &[1, 2, 3, 4], 2.0);
        assert!(set.chebyshev.is_none());
        assert_eq!(set.raw, vec![1.0, 2.0, 3.0, 4.0]);
        // window of 10 over 4 samples is empty, not absent
        assert_eq!(set.moving_average, Some(Vec::new()));
    }

    #[test]
    fn config_defaults_from_empty_document() {
        let config: FilterBankConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config, FilterBankConfig::default());
    }
}

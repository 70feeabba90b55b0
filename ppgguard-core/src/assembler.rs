//! Measurement assembler
//!
//! Builds the record handed to storage once the gate accepts. Shape invariants
//! are checked here, before anything is written:
//!
//! - the IR raw series is not empty
//! - the red raw series, when present, matches the IR length
//! - Chebyshev and Fourier series match their channel's raw length
//! - the moving average is no longer than the raw series
//! - the sampling rate equals IR sample count over duration
//!
//! Persisted form (document stores):
//!
//! ```json
//! {
//!   "sensorConfig": "Default",
//!   "capturedAt": 1700000000,
//!   "timestamp": "14/11/2023 22:13:20",
//!   "durationMs": 10000,
//!   "measureTime": 10.0,
//!   "measureFrequency": 100.0,
//!   "signals": { "irMeasure": "-50012,-50030,...", "irFilteredCheby": "...", ... },
//!   "sqi": { "ir_cheby_kurt": -1.35, ... }
//! }
//! ```

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::constants::quality::SAMPLING_RATE_TOLERANCE;
use crate::constants::sensors::{MS_PER_SECOND, SERIES_DELIMITER};
use crate::errors::{AssemblyError, AssemblyResult};
use crate::filters::{FilterVariant, FilteredChannelSet};
use crate::measurement::{sampling_rate, Channel, SensorConfig};
use crate::sqi::SqiRecord;
use crate::time::CaptureTime;

/// A gated measurement ready for storage
///
/// Only constructible through [`assemble`], so every instance satisfies the
/// shape invariants.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(into = "StoredMeasurement", try_from = "StoredMeasurement")]
pub struct AcceptedMeasurement {
    sensor_config: SensorConfig,
    captured_at: CaptureTime,
    duration_ms: u32,
    sampling_rate: f64,
    red: Option<FilteredChannelSet>,
    ir: FilteredChannelSet,
    sqi: SqiRecord,
}

/// Validate and bundle an accepted measurement
///
/// Assigns no identifier; numbering belongs to the store.
pub fn assemble(
    sensor_config: SensorConfig,
    captured_at: CaptureTime,
    duration_ms: u32,
    sampling_rate_hz: f64,
    red: Option<FilteredChannelSet>,
    ir: FilteredChannelSet,
    sqi: SqiRecord,
) -> AssemblyResult<AcceptedMeasurement> {
    if duration_ms == 0 {
        return Err(AssemblyError::MalformedRecord {
            reason: "duration must be positive".into(),
        });
    }
    if ir.raw.is_empty() {
        return Err(AssemblyError::MalformedRecord {
            reason: "IR channel has no samples".into(),
        });
    }

    let expected = ir.raw.len();
    check_channel(Channel::Ir, &ir, expected)?;
    if let Some(red) = &red {
        check_channel(Channel::Red, red, expected)?;
    }

    let derived = sampling_rate(expected, duration_ms);
    let tolerance = SAMPLING_RATE_TOLERANCE * derived.abs().max(1.0);
    if !sampling_rate_hz.is_finite() || (sampling_rate_hz - derived).abs() > tolerance {
        return Err(AssemblyError::InconsistentSamplingRate {
            given: sampling_rate_hz,
            derived,
        });
    }

    Ok(AcceptedMeasurement {
        sensor_config,
        captured_at,
        duration_ms,
        sampling_rate: sampling_rate_hz,
        red,
        ir,
        sqi,
    })
}

fn check_channel(channel: Channel, set: &FilteredChannelSet, expected: usize) -> AssemblyResult<()> {
    let mismatch = |found: usize| AssemblyError::ChannelLengthMismatch {
        channel,
        expected,
        found,
    };

    if set.raw.len() != expected {
        return Err(mismatch(set.raw.len()));
    }
    for series in [&set.chebyshev, &set.fourier].into_iter().flatten() {
        if series.len() != expected {
            return Err(mismatch(series.len()));
        }
    }
    if let Some(ma) = &set.moving_average {
        if ma.len() > expected {
            return Err(mismatch(ma.len()));
        }
    }
    Ok(())
}

impl AcceptedMeasurement {
    /// Configuration the device was running
    pub fn sensor_config(&self) -> SensorConfig {
        self.sensor_config
    }

    /// Capture instant
    pub fn captured_at(&self) -> CaptureTime {
        self.captured_at
    }

    /// Capture duration in milliseconds
    pub fn duration_ms(&self) -> u32 {
        self.duration_ms
    }

    /// Capture duration in seconds
    pub fn duration_secs(&self) -> f64 {
        f64::from(self.duration_ms) / MS_PER_SECOND
    }

    /// Sampling rate in Hz
    pub fn sampling_rate(&self) -> f64 {
        self.sampling_rate
    }

    /// Series of one channel, `None` for red in IR-only mode
    pub fn channel(&self, channel: Channel) -> Option<&FilteredChannelSet> {
        match channel {
            Channel::Red => self.red.as_ref(),
            Channel::Ir => Some(&self.ir),
        }
    }

    /// Signal quality indices
    pub fn sqi(&self) -> &SqiRecord {
        &self.sqi
    }

    /// Every stored series with its persisted key
    pub fn signals(&self) -> impl Iterator<Item = (String, &[f64])> + '_ {
        Channel::ALL.into_iter().flat_map(move |channel| {
            self.channel(channel)
                .into_iter()
                .flat_map(move |set| set.variants())
                .map(move |(variant, series)| (variant.signal_key(channel), series))
        })
    }
}

/// Render a series as one delimited string
pub fn encode_series(series: &[f64]) -> String {
    let mut out = String::with_capacity(series.len() * 8);
    for (i, v) in series.iter().enumerate() {
        if i > 0 {
            out.push(SERIES_DELIMITER);
        }
        out.push_str(&v.to_string());
    }
    out
}

/// Parse a delimited series string
pub fn decode_series(text: &str) -> AssemblyResult<Vec<f64>> {
    let text = text.trim();
    if text.is_empty() {
        return Ok(Vec::new());
    }
    text.split(SERIES_DELIMITER)
        .map(|item| {
            item.trim()
                .parse::<f64>()
                .map_err(|_| AssemblyError::MalformedRecord {
                    reason: format!("series value '{item}' is not a number"),
                })
        })
        .collect()
}

/// Document form of [`AcceptedMeasurement`]
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StoredMeasurement {
    sensor_config: SensorConfig,
    captured_at: CaptureTime,
    /// Human-readable capture time, informational only
    #[serde(default)]
    timestamp: String,
    duration_ms: u32,
    #[serde(default)]
    measure_time: f64,
    measure_frequency: f64,
    signals: BTreeMap<String, String>,
    sqi: SqiRecord,
}

impl From<AcceptedMeasurement> for StoredMeasurement {
    fn from(m: AcceptedMeasurement) -> Self {
        let signals = m
            .signals()
            .map(|(key, series)| (key, encode_series(series)))
            .collect();
        Self {
            sensor_config: m.sensor_config,
            captured_at: m.captured_at,
            timestamp: m.captured_at.formatted(),
            duration_ms: m.duration_ms,
            measure_time: m.duration_secs(),
            measure_frequency: m.sampling_rate,
            signals,
            sqi: m.sqi,
        }
    }
}

impl TryFrom<StoredMeasurement> for AcceptedMeasurement {
    type Error = AssemblyError;

    fn try_from(doc: StoredMeasurement) -> AssemblyResult<Self> {
        let mut red: Option<FilteredChannelSet> = None;
        let mut ir: Option<FilteredChannelSet> = None;

        for (key, text) in &doc.signals {
            let (channel, variant) =
                FilterVariant::parse_signal_key(key).ok_or_else(|| AssemblyError::MalformedRecord {
                    reason: format!("unknown signal key '{key}'"),
                })?;
            let slot = match channel {
                Channel::Red => &mut red,
                Channel::Ir => &mut ir,
            };
            slot.get_or_insert_with(FilteredChannelSet::default)
                .set_variant(variant, decode_series(text)?);
        }

        let ir = ir.ok_or_else(|| AssemblyError::MalformedRecord {
            reason: "no IR signals".into(),
        })?;

        assemble(
            doc.sensor_config,
            doc.captured_at,
            doc.duration_ms,
            doc.measure_frequency,
            red,
            ir,
            doc.sqi,
        )
    }
}

//! Signal quality indices
//!
//! Distribution shape of every series in a measurement: skewness and excess
//! (Fisher) kurtosis, both with the population (biased) moment estimators.
//! A normal distribution scores 0 on both.
//!
//! A statistic that cannot be computed is flagged in the record with its
//! [`ScoringError`]; it is never replaced by a placeholder value.
//!
//! Persisted as a flat map keyed `{channel}_{variant}_{skew|kurt}`:
//!
//! ```json
//! { "red_cheby_skew": 0.02, "red_cheby_kurt": -1.35, "ir_raw_kurt": "degenerate_distribution" }
//! ```

use core::fmt;
use heapless::FnvIndexMap;
use serde::de::{self, Deserializer};
use serde::ser::{SerializeMap, Serializer};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::constants::quality::DEGENERATE_RELATIVE_STDDEV;
use crate::errors::{ScoringError, ScoringResult};
use crate::filters::{FilterVariant, FilteredChannelSet};
use crate::measurement::Channel;

/// Entries one record can hold: every channel crossed with every variant
pub const SQI_CAPACITY: usize = 8;

/// Which moment a value describes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Statistic {
    /// Third standardized moment
    Skewness,
    /// Fourth standardized moment minus 3
    Kurtosis,
}

impl Statistic {
    /// Both statistics
    pub const ALL: [Statistic; 2] = [Statistic::Skewness, Statistic::Kurtosis];

    /// Suffix in persisted keys
    pub fn tag(&self) -> &'static str {
        match self {
            Self::Skewness => "skew",
            Self::Kurtosis => "kurt",
        }
    }

    fn from_tag(tag: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|s| s.tag() == tag)
    }
}

/// One scored series: a channel and the transform applied to it
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SqiKey {
    /// Channel
    pub channel: Channel,
    /// Transform
    pub variant: FilterVariant,
}

impl SqiKey {
    /// Key from its parts
    pub const fn new(channel: Channel, variant: FilterVariant) -> Self {
        Self { channel, variant }
    }

    /// Persisted field name for one statistic, e.g. `red_cheby_kurt`
    pub fn field(&self, statistic: Statistic) -> String {
        format!("{}_{}", self, statistic.tag())
    }

    /// Inverse of [`SqiKey::field`]
    pub fn parse_field(field: &str) -> Option<(Self, Statistic)> {
        let mut parts = field.split('_');
        let channel = Channel::from_tag(parts.next()?)?;
        let variant = FilterVariant::from_tag(parts.next()?)?;
        let statistic = Statistic::from_tag(parts.next()?)?;
        if parts.next().is_some() {
            return None;
        }
        Some((Self::new(channel, variant), statistic))
    }
}

impl fmt::Display for SqiKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}_{}", self.channel, self.variant)
    }
}

/// Skewness and excess kurtosis of one series
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DistributionShape {
    /// Third standardized moment
    pub skewness: f64,
    /// Fourth standardized moment minus 3
    pub kurtosis: f64,
}

impl DistributionShape {
    /// Value of one statistic
    pub fn get(&self, statistic: Statistic) -> f64 {
        match statistic {
            Statistic::Skewness => self.skewness,
            Statistic::Kurtosis => self.kurtosis,
        }
    }
}

/// Skewness and excess kurtosis in one pass over the central moments
pub fn distribution_shape(signal: &[f64]) -> ScoringResult<DistributionShape> {
    if signal.is_empty() {
        return Err(ScoringError::EmptySignal);
    }
    if signal.iter().any(|x| !x.is_finite()) {
        return Err(ScoringError::NonFiniteInput);
    }

    let n = signal.len() as f64;
    let mean = signal.iter().sum::<f64>() / n;
    let (mut m2, mut m3, mut m4) = (0.0, 0.0, 0.0);
    for &x in signal {
        let d = x - mean;
        let d2 = d * d;
        m2 += d2;
        m3 += d2 * d;
        m4 += d2 * d2;
    }
    m2 /= n;
    m3 /= n;
    m4 /= n;

    let scale = signal.iter().fold(0.0_f64, |acc, x| acc.max(x.abs()));
    if m2.sqrt() <= DEGENERATE_RELATIVE_STDDEV * scale {
        return Err(ScoringError::DegenerateDistribution);
    }

    Ok(DistributionShape {
        skewness: m3 / m2.powf(1.5),
        kurtosis: m4 / (m2 * m2) - 3.0,
    })
}

/// Population skewness
pub fn skewness(signal: &[f64]) -> ScoringResult<f64> {
    distribution_shape(signal).map(|s| s.skewness)
}

/// Population excess kurtosis
pub fn excess_kurtosis(signal: &[f64]) -> ScoringResult<f64> {
    distribution_shape(signal).map(|s| s.kurtosis)
}

/// SQI values for one measurement
///
/// Tracks which channels were scored so a missing entry can be told apart
/// from a channel that was never captured.
#[derive(Debug, Clone, Default)]
pub struct SqiRecord {
    shapes: FnvIndexMap<SqiKey, DistributionShape, SQI_CAPACITY>,
    failures: heapless::Vec<(SqiKey, ScoringError), SQI_CAPACITY>,
    channels: heapless::Vec<Channel, 2>,
}

// Shape lookup is by key, so insertion order does not matter
impl PartialEq for SqiRecord {
    fn eq(&self, other: &Self) -> bool {
        self.shapes.len() == other.shapes.len()
            && self
                .shapes
                .iter()
                .all(|(k, v)| other.shapes.get(k) == Some(v))
            && self.failures == other.failures
            && self.channels == other.channels
    }
}

impl SqiRecord {
    /// Empty record
    pub fn new() -> Self {
        Self::default()
    }

    /// Record that `channel` was captured and scored
    pub fn mark_channel(&mut self, channel: Channel) {
        if self.channels.contains(&channel) {
            return;
        }
        let pos = self
            .channels
            .iter()
            .position(|c| *c > channel)
            .unwrap_or(self.channels.len());
        let inserted = self.channels.insert(pos, channel);
        debug_assert!(inserted.is_ok(), "capacity equals the number of channels");
    }

    /// Store a computed shape, replacing any earlier value or failure
    pub fn insert(&mut self, key: SqiKey, shape: DistributionShape) {
        self.mark_channel(key.channel);
        self.failures.retain(|(k, _)| *k != key);
        if self.shapes.insert(key, shape).is_err() {
            log_warn!("SQI record full, dropping {}", key);
        }
    }

    /// Flag a statistic that could not be computed
    pub fn flag(&mut self, key: SqiKey, error: ScoringError) {
        self.mark_channel(key.channel);
        self.shapes.remove(&key);
        self.failures.retain(|(k, _)| *k != key);
        let pos = self
            .failures
            .iter()
            .position(|(k, _)| *k > key)
            .unwrap_or(self.failures.len());
        if self.failures.insert(pos, (key, error)).is_err() {
            log_warn!("SQI record full, dropping failure for {}", key);
        }
    }

    /// Shape of one series, if it was computed
    pub fn shape(&self, key: SqiKey) -> Option<&DistributionShape> {
        self.shapes.get(&key)
    }

    /// One statistic, if it was computed
    pub fn get(&self, channel: Channel, variant: FilterVariant, statistic: Statistic) -> Option<f64> {
        self.shape(SqiKey::new(channel, variant))
            .map(|s| s.get(statistic))
    }

    /// Why a series has no shape, if it was flagged
    pub fn failure(&self, key: SqiKey) -> Option<ScoringError> {
        self.failures
            .iter()
            .find(|(k, _)| *k == key)
            .map(|(_, e)| *e)
    }

    /// Flagged series
    pub fn failures(&self) -> &[(SqiKey, ScoringError)] {
        &self.failures
    }

    /// Computed shapes, in insertion order
    pub fn shapes(&self) -> impl Iterator<Item = (&SqiKey, &DistributionShape)> {
        self.shapes.iter()
    }

    /// Channels that were scored
    pub fn channels(&self) -> &[Channel] {
        &self.channels
    }

    /// Whether `channel` was scored
    pub fn has_channel(&self, channel: Channel) -> bool {
        self.channels.contains(&channel)
    }

    /// Number of computed shapes
    pub fn len(&self) -> usize {
        self.shapes.len()
    }

    /// No shape computed
    pub fn is_empty(&self) -> bool {
        self.shapes.is_empty()
    }
}

#[derive(Serialize, Deserialize)]
#[serde(untagged)]
enum StoredStat {
    Value(f64),
    Undefined(String),
}

fn failure_tag(error: ScoringError) -> &'static str {
    match error {
        ScoringError::EmptySignal => "empty_signal",
        ScoringError::NonFiniteInput => "non_finite_input",
        ScoringError::DegenerateDistribution => "degenerate_distribution",
    }
}

fn failure_from_tag(tag: &str) -> Option<ScoringError> {
    match tag {
        "empty_signal" => Some(ScoringError::EmptySignal),
        "non_finite_input" => Some(ScoringError::NonFiniteInput),
        "degenerate_distribution" => Some(ScoringError::DegenerateDistribution),
        _ => None,
    }
}

impl Serialize for SqiRecord {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let entries = 2 * (self.shapes.len() + self.failures.len());
        let mut map = serializer.serialize_map(Some(entries))?;
        for (key, shape) in &self.shapes {
            for statistic in Statistic::ALL {
                map.serialize_entry(&key.field(statistic), &shape.get(statistic))?;
            }
        }
        for (key, error) in &self.failures {
            for statistic in Statistic::ALL {
                map.serialize_entry(&key.field(statistic), failure_tag(*error))?;
            }
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for SqiRecord {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let flat = BTreeMap::<String, StoredStat>::deserialize(deserializer)?;

        let mut values: BTreeMap<SqiKey, (Option<f64>, Option<f64>)> = BTreeMap::new();
        let mut record = SqiRecord::new();

        for (field, stat) in flat {
            let (key, statistic) = SqiKey::parse_field(&field)
                .ok_or_else(|| de::Error::custom(format!("unknown SQI field '{field}'")))?;
            match stat {
                StoredStat::Value(v) => {
                    let slot = values.entry(key).or_default();
                    match statistic {
                        Statistic::Skewness => slot.0 = Some(v),
                        Statistic::Kurtosis => slot.1 = Some(v),
                    }
                }
                StoredStat::Undefined(tag) => {
                    let error = failure_from_tag(&tag).ok_or_else(|| {
                        de::Error::custom(format!("unknown SQI failure '{tag}' for '{field}'"))
                    })?;
                    record.flag(key, error);
                }
            }
        }

        for (key, pair) in values {
            match pair {
                (Some(skewness), Some(kurtosis)) => {
                    record.insert(key, DistributionShape { skewness, kurtosis })
                }
                _ => {
                    return Err(de::Error::custom(format!(
                        "SQI entry '{key}' needs both skew and kurt"
                    )))
                }
            }
        }

        Ok(record)
    }
}

/// Computes an [`SqiRecord`] from filtered channel sets
#[derive(Debug, Clone, Copy, Default)]
pub struct QualityScorer;

impl QualityScorer {
    /// New scorer
    pub fn new() -> Self {
        Self
    }

    /// Score every present series of every channel supplied
    ///
    /// Each failure is flagged on its own entry; scoring carries on with the
    /// rest.
    pub fn score<'a, I>(&self, channels: I) -> SqiRecord
    where
        I: IntoIterator<Item = (Channel, &'a FilteredChannelSet)>,
    {
        let mut record = SqiRecord::new();
        for (channel, set) in channels {
            record.mark_channel(channel);
            for (variant, series) in set.variants() {
                let key = SqiKey::new(channel, variant);
                match distribution_shape(series) {
                    Ok(shape) => record.insert(key, shape),
                    Err(e) => {
                        log_debug!("{} not scored: {}", key, e);
                        record.flag(key, e);
                    }
                }
            }
        }
        record
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(channel: Channel, variant: FilterVariant) -> SqiKey {
        SqiKey::new(channel, variant)
    }

    #[test]
    fn symmetric_distribution_has_zero_skew() {
        let s = distribution_shape(&[1.0, 2.0, 3.0, 4.0, 5.0]).unwrap();
        assert!(s.skewness.abs() < 1e-12);
        // Uniform-like: m4/m2^2 = 6.8/4 = 1.7
        assert!((s.kurtosis - (1.7 - 3.0)).abs() < 1e-12);
    }

    #[test]
    fn right_tail_is_positive_skew() {
        let s = distribution_shape(&[0.0, 0.0, 0.0, 0.0, 10.0]).unwrap();
        assert!(s.skewness > 1.0);
        assert!(s.kurtosis > -1.0);
    }

    #[test]
    fn two_point_distribution_kurtosis() {
        // Symmetric two-point: excess kurtosis is exactly -2
        let x: Vec<f64> = (0..100).map(|i| if i % 2 == 0 { 1.0 } else { -1.0 }).collect();
        assert!((excess_kurtosis(&x).unwrap() + 2.0).abs() < 1e-12);
        assert!(skewness(&x).unwrap().abs() < 1e-12);
    }

    #[test]
    fn failures() {
        assert_eq!(distribution_shape(&[]), Err(ScoringError::EmptySignal));
        assert_eq!(distribution_shape(&[1.0, f64::NAN]), Err(ScoringError::NonFiniteInput));
        assert_eq!(
            distribution_shape(&[5.0, 5.0, 5.0]),
            Err(ScoringError::DegenerateDistribution)
        );
        assert_eq!(
            distribution_shape(&[0.1, 0.1, 0.1]),
            Err(ScoringError::DegenerateDistribution)
        );
        assert_eq!(distribution_shape(&[0.0]), Err(ScoringError::DegenerateDistribution));
    }

    #[test]
    fn field_names() {
        let k = key(Channel::Red, FilterVariant::Chebyshev);
        assert_eq!(k.field(Statistic::Kurtosis), "red_cheby_kurt");
        assert_eq!(
            SqiKey::parse_field("ir_movavg_skew"),
            Some((key(Channel::Ir, FilterVariant::MovingAverage), Statistic::Skewness))
        );
        assert_eq!(SqiKey::parse_field("ir_movavg"), None);
        assert_eq!(SqiKey::parse_field("ir_movavg_skew_x"), None);
        assert_eq!(SqiKey::parse_field("green_raw_skew"), None);
    }

    #[test]
    fn scorer_covers_every_present_variant() {
        let ramp: Vec<f64> = (0..50).map(|i| (i * i % 17) as f64).collect();
        let set = FilteredChannelSet {
            raw: ramp.clone(),
            moving_average: Some(ramp.clone()),
            chebyshev: Some(ramp),
            fourier: None,
        };
        let record = QualityScorer::new().score([(Channel::Red, &set), (Channel::Ir, &set)]);
        assert_eq!(record.len(), 6);
        assert!(record.failures().is_empty());
        assert_eq!(record.channels(), &[Channel::Red, Channel::Ir]);
        assert!(record
            .get(Channel::Ir, FilterVariant::Chebyshev, Statistic::Kurtosis)
            .is_some());
        assert!(record
            .get(Channel::Ir, FilterVariant::Fourier, Statistic::Kurtosis)
            .is_none());
    }

    #[test]
    fn scorer_flags_degenerate_and_continues() {
        let set = FilteredChannelSet {
            raw: vec![3.0; 40],
            moving_average: Some(vec![3.0; 31]),
            chebyshev: Some((0..40).map(|i| f64::from(i % 5)).collect()),
            fourier: None,
        };
        let record = QualityScorer::new().score([(Channel::Ir, &set)]);
        assert_eq!(record.len(), 1);
        assert_eq!(
            record.failure(key(Channel::Ir, FilterVariant::Raw)),
            Some(ScoringError::DegenerateDistribution)
        );
        assert!(record.shape(key(Channel::Ir, FilterVariant::Chebyshev)).is_some());
        assert!(record.has_channel(Channel::Ir));
        assert!(!record.has_channel(Channel::Red));
    }

    #[test]
    fn insert_clears_earlier_failure() {
        let k = key(Channel::Red, FilterVariant::Raw);
        let mut record = SqiRecord::new();
        record.flag(k, ScoringError::EmptySignal);
        record.insert(k, DistributionShape { skewness: 0.5, kurtosis: 1.0 });
        assert_eq!(record.failure(k), None);
        assert_eq!(record.get(Channel::Red, FilterVariant::Raw, Statistic::Skewness), Some(0.5));
    }

    #[test]
    fn flat_json_shape() {
        let mut record = SqiRecord::new();
        record.insert(
            key(Channel::Red, FilterVariant::Chebyshev),
            DistributionShape { skewness: 0.25, kurtosis: -1.5 },
        );
        record.flag(key(Channel::Ir, FilterVariant::Raw), ScoringError::DegenerateDistribution);

        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["red_cheby_skew"], 0.25);
        assert_eq!(json["red_cheby_kurt"], -1.5);
        assert_eq!(json["ir_raw_kurt"], "degenerate_distribution");

        let back: SqiRecord = serde_json::from_value(json).unwrap();
        assert_eq!(back, record);
    }

    #[test]
    fn rejects_half_entries() {
        let json = serde_json::json!({ "red_raw_skew": 0.1 });
        assert!(serde_json::from_value::<SqiRecord>(json).is_err());
        let json = serde_json::json!({ "red_raw_mean": 0.1 });
        assert!(serde_json::from_value::<SqiRecord>(json).is_err());
    }

    #[test]
    fn equality_ignores_insertion_order() {
        let shape = |skewness, kurtosis| DistributionShape { skewness, kurtosis };
        let red = key(Channel::Red, FilterVariant::Chebyshev);
        let ir = key(Channel::Ir, FilterVariant::Chebyshev);

        let mut a = SqiRecord::new();
        a.insert(red, shape(0.1, -1.3));
        a.insert(ir, shape(-0.2, 0.4));

        let mut b = SqiRecord::new();
        b.insert(ir, shape(-0.2, 0.4));
        b.insert(red, shape(0.1, -1.3));
        assert_eq!(a, b);

        b.insert(ir, shape(-0.2, 0.5));
        assert_ne!(a, b);

        let mut c = a.clone();
        c.flag(key(Channel::Red, FilterVariant::Raw), ScoringError::EmptySignal);
        assert_ne!(a, c);
    }
}

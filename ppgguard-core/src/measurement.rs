//! Measurement data model
//!
//! A [`RawMeasurement`] is created once per inbound message and never mutated.
//! Samples are stored with restored polarity: the device reports inverted light
//! absorption and the decoder negates every value.

use core::fmt;
use core::str::FromStr;
use serde::{de, Deserialize, Deserializer, Serialize, Serializer};

use crate::constants::sensors::{MS_PER_SECOND, SENSOR_CONFIG_COUNT};
use crate::errors::{DecodeError, DecodeResult};
use crate::time::CaptureTime;

/// Optical channel of the sensor
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Channel {
    /// Red LED channel (absent in IR-only mode)
    Red,
    /// Infrared LED channel (always present)
    Ir,
}

impl Channel {
    /// Both channels, red first
    pub const ALL: [Channel; 2] = [Channel::Red, Channel::Ir];

    /// Short tag used in persisted keys (`red`, `ir`)
    pub fn tag(&self) -> &'static str {
        match self {
            Self::Red => "red",
            Self::Ir => "ir",
        }
    }

    /// Parse a persisted tag
    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "red" => Some(Self::Red),
            "ir" => Some(Self::Ir),
            _ => None,
        }
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

/// Acquisition configuration the device was running
///
/// Closed set; the integer code is what the device sends as the optional first
/// payload field, the name is what persisted records are grouped under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub enum SensorConfig {
    /// Device power-on defaults
    #[default]
    Default,
    /// 800 Hz ADC rate, 4-sample averaging
    Hz800Avg4,
    /// 1000 Hz ADC rate, 8-sample averaging
    Hz1000Avg8,
    /// 1600 Hz ADC rate, 8-sample averaging
    Hz1600Avg8,
    /// 1600 Hz ADC rate, 16-sample averaging
    Hz1600Avg16,
}

impl SensorConfig {
    /// Every configuration, in code order
    pub const ALL: [SensorConfig; SENSOR_CONFIG_COUNT] = [
        SensorConfig::Default,
        SensorConfig::Hz800Avg4,
        SensorConfig::Hz1000Avg8,
        SensorConfig::Hz1600Avg8,
        SensorConfig::Hz1600Avg16,
    ];

    /// Look up a payload code
    pub fn from_code(code: i64) -> DecodeResult<Self> {
        usize::try_from(code)
            .ok()
            .and_then(|idx| Self::ALL.get(idx).copied())
            .ok_or(DecodeError::UnknownSensorConfig { code })
    }

    /// Payload code
    pub fn code(&self) -> u8 {
        match self {
            Self::Default => 0,
            Self::Hz800Avg4 => 1,
            Self::Hz1000Avg8 => 2,
            Self::Hz1600Avg8 => 3,
            Self::Hz1600Avg16 => 4,
        }
    }

    /// Display name, also the storage grouping key
    pub fn name(&self) -> &'static str {
        match self {
            Self::Default => "Default",
            Self::Hz800Avg4 => "800 Hz - 4 samples",
            Self::Hz1000Avg8 => "1000 Hz - 8 samples",
            Self::Hz1600Avg8 => "1600 Hz - 8 samples",
            Self::Hz1600Avg16 => "1600 Hz - 16 samples",
        }
    }

    /// Look up a display name
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|c| c.name() == name)
    }
}

impl fmt::Display for SensorConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for SensorConfig {
    type Err = DecodeError;

    /// Accepts either the display name or the numeric code
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if let Some(config) = Self::from_name(s) {
            return Ok(config);
        }
        match s.parse::<i64>() {
            Ok(code) => Self::from_code(code),
            Err(_) => Err(DecodeError::malformed(format!(
                "unknown sensor configuration '{s}'"
            ))),
        }
    }
}

impl Serialize for SensorConfig {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.name())
    }
}

impl<'de> Deserialize<'de> for SensorConfig {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let name = String::deserialize(deserializer)?;
        Self::from_name(&name)
            .ok_or_else(|| de::Error::custom(format!("unknown sensor configuration '{name}'")))
    }
}

/// One decoded device message
///
/// Invariants, enforced by [`RawMeasurement::new`]:
/// - `ir_samples` is never empty
/// - `red_samples` is empty (IR-only mode) or as long as `ir_samples`
/// - `duration_ms` is positive
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawMeasurement {
    captured_at: CaptureTime,
    duration_ms: u32,
    sensor_config: SensorConfig,
    red_samples: Vec<i64>,
    ir_samples: Vec<i64>,
}

impl RawMeasurement {
    /// Build a measurement from samples that already have restored polarity
    pub fn new(
        captured_at: CaptureTime,
        duration_ms: u32,
        sensor_config: SensorConfig,
        red_samples: Vec<i64>,
        ir_samples: Vec<i64>,
    ) -> DecodeResult<Self> {
        if duration_ms == 0 {
            return Err(DecodeError::malformed("duration must be positive"));
        }
        if ir_samples.is_empty() {
            return Err(DecodeError::malformed("IR channel has no samples"));
        }
        if !red_samples.is_empty() && red_samples.len() != ir_samples.len() {
            return Err(DecodeError::malformed(format!(
                "red channel has {} samples, IR has {}",
                red_samples.len(),
                ir_samples.len()
            )));
        }
        Ok(Self {
            captured_at,
            duration_ms,
            sensor_config,
            red_samples,
            ir_samples,
        })
    }

    /// Capture instant
    pub fn captured_at(&self) -> CaptureTime {
        self.captured_at
    }

    /// Capture duration in milliseconds
    pub fn duration_ms(&self) -> u32 {
        self.duration_ms
    }

    /// Configuration the device was running
    pub fn sensor_config(&self) -> SensorConfig {
        self.sensor_config
    }

    /// Red samples; empty in IR-only mode
    pub fn red_samples(&self) -> &[i64] {
        &self.red_samples
    }

    /// IR samples; never empty
    pub fn ir_samples(&self) -> &[i64] {
        &self.ir_samples
    }

    /// Whether the red channel was captured
    pub fn has_red(&self) -> bool {
        !self.red_samples.is_empty()
    }

    /// Samples of one channel, `None` for red in IR-only mode
    pub fn samples(&self, channel: Channel) -> Option<&[i64]> {
        match channel {
            Channel::Red if self.has_red() => Some(&self.red_samples),
            Channel::Red => None,
            Channel::Ir => Some(&self.ir_samples),
        }
    }

    /// Channels present in this measurement
    pub fn channels(&self) -> impl Iterator<Item = Channel> + '_ {
        Channel::ALL
            .into_iter()
            .filter(move |c| self.samples(*c).is_some())
    }

    /// Sampling rate in Hz, derived from the IR sample count and duration
    pub fn sampling_rate(&self) -> f64 {
        sampling_rate(self.ir_samples.len(), self.duration_ms)
    }
}

/// `sample_count / (duration_ms / 1000)`
///
/// Never stored independently of the series it was computed from.
pub fn sampling_rate(sample_count: usize, duration_ms: u32) -> f64 {
    if duration_ms == 0 {
        return 0.0;
    }
    sample_count as f64 / (f64::from(duration_ms) / MS_PER_SECOND)
}

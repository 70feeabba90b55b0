//! Message decoder
//!
//! Turns one `;`-delimited device payload into a [`RawMeasurement`].
//!
//! Recognized layouts:
//!
//! | Fields | Layout |
//! |--------|--------|
//! | 3 | `timestamp;durationMs;[ir]` |
//! | 4 | `timestamp;durationMs;[red];[ir]` |
//! | 4 | `code;timestamp;durationMs;[ir]` |
//! | 5 | `code;timestamp;durationMs;[red];[ir]` |
//!
//! The two four-field layouts are told apart by the third field: a sample
//! literal starts with `[`, a duration never does. A red literal of `[]` is the
//! IR-only mode. Every sample is negated to restore waveform orientation.
//!
//! ```rust
//! use ppgguard_core::decode;
//!
//! let m = decode("1700000000;2000;[1,2,3,4];[5,6,7,8]").unwrap();
//! assert_eq!(m.ir_samples(), &[-5, -6, -7, -8]);
//! assert_eq!(m.red_samples(), &[-1, -2, -3, -4]);
//! assert_eq!(m.sampling_rate(), 2.0);
//! ```

use crate::constants::sensors::{
    MAX_PAYLOAD_FIELDS, MIN_PAYLOAD_FIELDS, PAYLOAD_DELIMITER, SERIES_DELIMITER,
};
use crate::errors::{DecodeError, DecodeResult};
use crate::measurement::{RawMeasurement, SensorConfig};
use crate::time::CaptureTime;

/// Decode with [`SensorConfig::Default`] for unprefixed payloads
pub fn decode(payload: &str) -> DecodeResult<RawMeasurement> {
    MessageDecoder::new().decode(payload)
}

/// Payload decoder
///
/// Payloads without a configuration prefix are tagged with the decoder's
/// active configuration, i.e. the one last sent to the device.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MessageDecoder {
    active_config: SensorConfig,
}

impl MessageDecoder {
    /// Decoder that tags unprefixed payloads as [`SensorConfig::Default`]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the configuration used for unprefixed payloads
    pub fn with_active_config(mut self, config: SensorConfig) -> Self {
        self.active_config = config;
        self
    }

    /// Record that the device was switched to `config`
    pub fn set_active_config(&mut self, config: SensorConfig) {
        self.active_config = config;
    }

    /// Configuration used for unprefixed payloads
    pub fn active_config(&self) -> SensorConfig {
        self.active_config
    }

    /// Decode one payload
    pub fn decode(&self, payload: &str) -> DecodeResult<RawMeasurement> {
        let fields: Vec<&str> = payload.trim().split(PAYLOAD_DELIMITER).map(str::trim).collect();

        if fields.len() < MIN_PAYLOAD_FIELDS {
            return Err(DecodeError::InsufficientFields {
                required: MIN_PAYLOAD_FIELDS,
                found: fields.len(),
            });
        }
        if fields.len() > MAX_PAYLOAD_FIELDS {
            return Err(DecodeError::malformed(format!(
                "expected at most {MAX_PAYLOAD_FIELDS} fields, found {}",
                fields.len()
            )));
        }

        let (config, rest) = match fields.len() {
            3 => (self.active_config, &fields[..]),
            4 if fields[2].starts_with('[') => (self.active_config, &fields[..]),
            _ => (parse_config_code(fields[0])?, &fields[1..]),
        };

        let captured_at = parse_timestamp(rest[0])?;
        let duration_ms = parse_duration(rest[1])?;
        let (red, ir) = match rest.len() {
            3 => (Vec::new(), parse_series(rest[2], "ir")?),
            _ => (parse_series(rest[2], "red")?, parse_series(rest[3], "ir")?),
        };

        RawMeasurement::new(
            captured_at,
            duration_ms,
            config,
            invert(red, "red")?,
            invert(ir, "ir")?,
        )
    }
}

fn parse_config_code(field: &str) -> DecodeResult<SensorConfig> {
    let code = field
        .parse::<i64>()
        .map_err(|_| DecodeError::malformed(format!("sensor config code '{field}' is not an integer")))?;
    SensorConfig::from_code(code)
}

fn parse_timestamp(field: &str) -> DecodeResult<CaptureTime> {
    field
        .parse::<i64>()
        .map(CaptureTime::from_epoch_seconds)
        .map_err(|_| DecodeError::malformed(format!("timestamp '{field}' is not an integer")))
}

fn parse_duration(field: &str) -> DecodeResult<u32> {
    let ms = field
        .parse::<i64>()
        .map_err(|_| DecodeError::malformed(format!("duration '{field}' is not an integer")))?;
    if ms <= 0 {
        return Err(DecodeError::malformed(format!("duration {ms} ms is not positive")));
    }
    u32::try_from(ms).map_err(|_| DecodeError::malformed(format!("duration {ms} ms out of range")))
}

/// Parse an integer array literal such as `[1, 2, -3]`
fn parse_series(field: &str, channel: &str) -> DecodeResult<Vec<i64>> {
    let inner = field
        .strip_prefix('[')
        .and_then(|s| s.strip_suffix(']'))
        .ok_or_else(|| DecodeError::malformed(format!("{channel} samples are not a [..] literal")))?
        .trim();

    if inner.is_empty() {
        return Ok(Vec::new());
    }

    inner
        .split(SERIES_DELIMITER)
        .enumerate()
        .map(|(idx, item)| {
            let item = item.trim();
            item.parse::<i64>().map_err(|_| {
                DecodeError::malformed(format!("{channel} sample {idx} ('{item}') is not an integer"))
            })
        })
        .collect()
}

fn invert(samples: Vec<i64>, channel: &str) -> DecodeResult<Vec<i64>> {
    samples
        .into_iter()
        .map(|s| {
            s.checked_neg()
                .ok_or_else(|| DecodeError::malformed(format!("{channel} sample {s} cannot be negated")))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::DecodeErrorKind;
    use crate::measurement::Channel;

    #[test]
    fn decodes_both_channels() {
        let m = decode("1700000000;2000;[1,2,3,4];[5,6,7,8]").unwrap();
        assert_eq!(m.captured_at().epoch_seconds(), 1_700_000_000);
        assert_eq!(m.duration_ms(), 2000);
        assert_eq!(m.ir_samples(), &[-5, -6, -7, -8]);
        assert_eq!(m.red_samples(), &[-1, -2, -3, -4]);
        assert_eq!(m.sampling_rate(), 2.0);
        assert_eq!(m.sensor_config(), SensorConfig::Default);
    }

    #[test]
    fn decodes_ir_only() {
        let m = decode("1700000000;1000;[10, 20, 30]").unwrap();
        assert!(!m.has_red());
        assert_eq!(m.ir_samples(), &[-10, -20, -30]);
        assert_eq!(m.sampling_rate(), 3.0);
    }

    #[test]
    fn empty_red_literal_is_ir_only() {
        let m = decode("1700000000;1000;[];[1,2]").unwrap();
        assert!(!m.has_red());
        assert_eq!(m.samples(Channel::Ir), Some(&[-1, -2][..]));
    }

    #[test]
    fn decodes_config_prefix() {
        let m = decode("3;1700000000;1000;[1,2];[3,4]").unwrap();
        assert_eq!(m.sensor_config(), SensorConfig::Hz1600Avg8);
        assert_eq!(m.red_samples(), &[-1, -2]);

        let m = decode("1;1700000000;1000;[7,8,9]").unwrap();
        assert_eq!(m.sensor_config(), SensorConfig::Hz800Avg4);
        assert!(!m.has_red());
    }

    #[test]
    fn unprefixed_payload_uses_active_config() {
        let decoder = MessageDecoder::new().with_active_config(SensorConfig::Hz1000Avg8);
        let m = decoder.decode("1700000000;1000;[1,2];[3,4]").unwrap();
        assert_eq!(m.sensor_config(), SensorConfig::Hz1000Avg8);

        // An explicit prefix wins over the active configuration
        let m = decoder.decode("0;1700000000;1000;[1,2];[3,4]").unwrap();
        assert_eq!(m.sensor_config(), SensorConfig::Default);
    }

    #[test]
    fn unknown_config_code() {
        let err = decode("9;1700000000;1000;[1];[2]").unwrap_err();
        assert_eq!(err, DecodeError::UnknownSensorConfig { code: 9 });
    }

    #[test]
    fn too_few_fields() {
        let err = decode("1700000000;2000").unwrap_err();
        assert_eq!(err, DecodeError::InsufficientFields { required: 3, found: 2 });
        assert_eq!(decode("").unwrap_err().kind(), DecodeErrorKind::InsufficientFields);
    }

    #[test]
    fn malformed_payloads() {
        let cases = [
            "1;2;3;4;5;6",
            "abc;2000;[1]",
            "1700000000;2000;1,2,3",
            "1700000000;2000;[1,x,3]",
            "1700000000;0;[1]",
            "1700000000;-5;[1]",
            "1700000000;2000;[]",
            "1700000000;2000;[1,2];[1,2,3]",
            "1700000000;2000;[1,2];[]",
            "1700000000;2000;[-9223372036854775808]",
            "x;1700000000;2000;[1]",
        ];
        for payload in cases {
            let err = decode(payload).unwrap_err();
            assert_eq!(err.kind(), DecodeErrorKind::MalformedMessage, "{payload}");
        }
    }

    #[test]
    fn tolerates_whitespace() {
        let m = decode(" 1700000000 ; 2000 ; [ 1 , 2 ] ; [3, 4]\n").unwrap();
        assert_eq!(m.red_samples(), &[-1, -2]);
        assert_eq!(m.ir_samples(), &[-3, -4]);
    }
}

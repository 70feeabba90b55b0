//! Sensor Configuration and Payload Layout
//!
//! The device reports one measurement per message as a `;`-delimited line.
//! An optional leading integer selects the acquisition configuration the
//! device was running.

/// Field delimiter of the device payload.
pub const PAYLOAD_DELIMITER: char = ';';

/// Delimiter between values inside a persisted series string.
pub const SERIES_DELIMITER: char = ',';

/// Number of known sensor configurations.
pub const SENSOR_CONFIG_COUNT: usize = 5;

/// Fewest fields in any payload layout (`timestamp;durationMs;ir`).
pub const MIN_PAYLOAD_FIELDS: usize = 3;

/// Most fields in any payload layout (`code;timestamp;durationMs;red;ir`).
pub const MAX_PAYLOAD_FIELDS: usize = 5;

/// Milliseconds per second.
pub const MS_PER_SECOND: f64 = 1000.0;

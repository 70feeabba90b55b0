//! Constants for PPGGuard Core
//!
//! Centralized numeric parameters for the pipeline. Call sites refer to these
//! presets by name instead of carrying their own literal bands and windows.
//!
//! ## Organization
//!
//! - **Filters**: Chebyshev design, passband presets, moving-average windows
//! - **Quality**: gate bounds and degeneracy tolerance
//! - **Sensors**: device configuration codes and payload layout

/// Filter design parameters and named passband presets.
pub mod filters;

/// Quality gate bounds and statistic tolerances.
pub mod quality;

/// Sensor configuration codes and payload layout limits.
pub mod sensors;

pub use filters::{
    CHEBYSHEV_ORDER, CHEBYSHEV_STOPBAND_DB, HEART_RATE_BAND_HIGH_HZ, HEART_RATE_BAND_LOW_HZ,
    MOVING_AVERAGE_WINDOW, MOVING_AVERAGE_WINDOW_SHORT,
};

pub use quality::{GATE_KURTOSIS_MAX, GATE_KURTOSIS_MIN};

pub use sensors::{PAYLOAD_DELIMITER, SENSOR_CONFIG_COUNT};

//! Filter Design Parameters
//!
//! Two passbands are in use. The heart-rate band isolates the cardiac
//! fundamental and its first harmonics and is the one the quality gate scores.
//! The exploratory band is a wide view used when inspecting baseline wander.

// ===== CHEBYSHEV TYPE II =====

/// Order of the Chebyshev Type II lowpass prototype.
///
/// The bandpass transform doubles it, giving four second-order sections.
pub const CHEBYSHEV_ORDER: usize = 4;

/// Minimum stopband attenuation (dB).
///
/// The band edges are the frequencies where this attenuation is first reached.
pub const CHEBYSHEV_STOPBAND_DB: f64 = 40.0;

/// Largest supported prototype order.
pub const CHEBYSHEV_MAX_ORDER: usize = 12;

// ===== PASSBAND PRESETS =====

/// Heart-rate band lower edge (Hz). 30 bpm.
pub const HEART_RATE_BAND_LOW_HZ: f64 = 0.5;

/// Heart-rate band upper edge (Hz).
///
/// Keeps the dicrotic notch harmonics of a 200 bpm pulse.
pub const HEART_RATE_BAND_HIGH_HZ: f64 = 8.0;

/// Exploratory band lower edge (Hz).
pub const EXPLORATORY_BAND_LOW_HZ: f64 = 0.01;

/// Exploratory band upper edge (Hz).
pub const EXPLORATORY_BAND_HIGH_HZ: f64 = 15.0;

// ===== MOVING AVERAGE =====

/// Default moving-average window (samples).
pub const MOVING_AVERAGE_WINDOW: usize = 10;

/// Shorter moving-average window (samples), used for high-rate captures.
pub const MOVING_AVERAGE_WINDOW_SHORT: usize = 7;

// ===== NORMALIZATION =====

/// Default lower bound of the min-max normalization range.
pub const NORMALIZE_RANGE_MIN: f64 = 0.0;

/// Default upper bound of the min-max normalization range.
pub const NORMALIZE_RANGE_MAX: f64 = 1.0;

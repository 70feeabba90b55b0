//! Quality Gate Thresholds
//!
//! Bandpassed physiological PPG is close to normally distributed. Strongly
//! positive excess kurtosis means spiky noise or motion artifact; strongly
//! negative means a clipped or flat signal.

/// Lower bound (exclusive) on Chebyshev-filtered excess kurtosis.
pub const GATE_KURTOSIS_MIN: f64 = -2.0;

/// Upper bound (exclusive) on Chebyshev-filtered excess kurtosis.
pub const GATE_KURTOSIS_MAX: f64 = 5.0;

/// Relative standard deviation under which a series counts as constant.
///
/// Measured against the largest absolute sample, so rounding residue on a
/// constant series (e.g. `[0.1, 0.1, 0.1]`) is still caught.
pub const DEGENERATE_RELATIVE_STDDEV: f64 = 1e-12;

/// Relative tolerance when checking a stored sampling rate against the
/// rate derived from sample count and duration.
pub const SAMPLING_RATE_TOLERANCE: f64 = 1e-9;

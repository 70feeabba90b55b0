//! Min-max normalization

use crate::constants::filters::{NORMALIZE_RANGE_MAX, NORMALIZE_RANGE_MIN};
use crate::errors::{FilterError, FilterResult};

/// Rescale into `[0, 1]`
pub fn normalize_unit(signal: &[f64]) -> FilterResult<Vec<f64>> {
    normalize(signal, NORMALIZE_RANGE_MIN, NORMALIZE_RANGE_MAX)
}

/// Rescale so the minimum maps to `range_min` and the maximum to `range_max`
///
/// A constant signal maps to `range_min` everywhere.
pub fn normalize(signal: &[f64], range_min: f64, range_max: f64) -> FilterResult<Vec<f64>> {
    if !range_min.is_finite() || !range_max.is_finite() || range_min > range_max {
        return Err(FilterError::InvalidRange {
            min: range_min,
            max: range_max,
        });
    }
    if signal.is_empty() {
        return Ok(Vec::new());
    }
    super::ensure_finite(signal)?;

    let (lo, hi) = signal
        .iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &x| {
            (lo.min(x), hi.max(x))
        });

    if hi == lo {
        return Ok(vec![range_min; signal.len()]);
    }

    let span = hi - lo;
    let target = range_max - range_min;
    Ok(signal
        .iter()
        .map(|&x| {
            if x == hi {
                range_max
            } else {
                range_min + (x - lo) / span * target
            }
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_extremes_to_range() {
        let y = normalize_unit(&[2.0, 4.0, 6.0]).unwrap();
        assert_eq!(y, vec![0.0, 0.5, 1.0]);

        let y = normalize(&[-1.0, 0.0, 1.0], -10.0, 10.0).unwrap();
        assert_eq!(y, vec![-10.0, 0.0, 10.0]);
    }

    #[test]
    fn constant_signal_fills_with_range_min() {
        assert_eq!(normalize_unit(&[5.0, 5.0, 5.0]).unwrap(), vec![0.0, 0.0, 0.0]);
        assert_eq!(normalize(&[5.0, 5.0], 2.0, 3.0).unwrap(), vec![2.0, 2.0]);
    }

    #[test]
    fn idempotent() {
        let x = [0.3, -7.1, 12.9, 4.4, 4.4, -0.01];
        let once = normalize_unit(&x).unwrap();
        let twice = normalize_unit(&once).unwrap();
        assert_eq!(once, twice);
    }

    #[test]
    fn empty_and_invalid() {
        assert!(normalize_unit(&[]).unwrap().is_empty());
        assert_eq!(normalize_unit(&[f64::NAN]), Err(FilterError::NonFiniteInput));
        assert_eq!(
            normalize(&[1.0, 2.0], 1.0, 0.0),
            Err(FilterError::InvalidRange { min: 1.0, max: 0.0 })
        );
    }
}

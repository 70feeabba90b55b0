//! Unweighted moving average, valid-convolution mode

use crate::errors::{FilterError, FilterResult};

/// Sliding mean over `window` samples
///
/// Output has `len - window + 1` samples; it is empty when the signal is
/// shorter than the window.
pub fn moving_average(signal: &[f64], window: usize) -> FilterResult<Vec<f64>> {
    if window == 0 {
        return Err(FilterError::InvalidWindow { window });
    }
    if signal.len() < window {
        return Ok(Vec::new());
    }
    super::ensure_finite(signal)?;

    let scale = 1.0 / window as f64;
    Ok(signal
        .windows(window)
        .map(|w| w.iter().sum::<f64>() * scale)
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn valid_mode_length() {
        let x: Vec<f64> = (0..20).map(f64::from).collect();
        assert_eq!(moving_average(&x, 10).unwrap().len(), 11);
        assert_eq!(moving_average(&x, 7).unwrap().len(), 14);
        assert_eq!(moving_average(&x, 20).unwrap().len(), 1);
    }

    #[test]
    fn computes_mean() {
        let y = moving_average(&[1.0, 2.0, 3.0, 4.0], 2).unwrap();
        assert_eq!(y, vec![1.5, 2.5, 3.5]);
    }

    #[test]
    fn window_of_one_is_identity() {
        let x = [3.0, -1.0, 4.0];
        assert_eq!(moving_average(&x, 1).unwrap(), x.to_vec());
    }

    #[test]
    fn shorter_than_window_is_empty() {
        assert!(moving_average(&[1.0, 2.0], 10).unwrap().is_empty());
        assert!(moving_average(&[], 10).unwrap().is_empty());
    }

    #[test]
    fn zero_window_rejected() {
        assert_eq!(
            moving_average(&[1.0], 0),
            Err(FilterError::InvalidWindow { window: 0 })
        );
    }

    #[test]
    fn non_finite_rejected() {
        assert_eq!(
            moving_average(&[1.0, f64::INFINITY, 2.0], 2),
            Err(FilterError::NonFiniteInput)
        );
    }
}

//! Property tests for the filter and scoring functions

use ppgguard_core::filters::{bandpass_fourier_mask, moving_average, normalize, normalize_unit};
use ppgguard_core::sqi::distribution_shape;
use proptest::prelude::*;

fn signal() -> impl Strategy<Value = Vec<f64>> {
    prop::collection::vec(-1.0e5f64..1.0e5, 1..400)
}

proptest! {
    #[test]
    fn moving_average_length(xs in signal(), window in 1usize..50) {
        let out = moving_average(&xs, window).unwrap();
        let expected = if xs.len() < window { 0 } else { xs.len() - window + 1 };
        prop_assert_eq!(out.len(), expected);
    }

    #[test]
    fn moving_average_stays_within_input_range(xs in signal(), window in 1usize..20) {
        let lo = xs.iter().copied().fold(f64::INFINITY, f64::min);
        let hi = xs.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        let tol = 1e-9 * hi.abs().max(lo.abs()).max(1.0);
        for v in moving_average(&xs, window).unwrap() {
            prop_assert!(v >= lo - tol && v <= hi + tol);
        }
    }

    #[test]
    fn normalize_unit_is_idempotent(xs in signal()) {
        let once = normalize_unit(&xs).unwrap();
        let twice = normalize_unit(&once).unwrap();
        prop_assert_eq!(once, twice);
    }

    #[test]
    fn normalize_hits_requested_range(xs in signal(), lo in -10.0f64..0.0, span in 0.5f64..10.0) {
        let out = normalize(&xs, lo, lo + span).unwrap();
        prop_assert_eq!(out.len(), xs.len());
        for v in &out {
            prop_assert!(*v >= lo - 1e-9 && *v <= lo + span + 1e-9);
        }
    }

    #[test]
    fn fourier_mask_keeps_mean_with_open_low_edge(xs in prop::collection::vec(-100.0f64..100.0, 2..300)) {
        let out = bandpass_fourier_mask(&xs, 100.0, 0.0, 8.0).unwrap();
        prop_assert_eq!(out.len(), xs.len());
        let mean_in = xs.iter().sum::<f64>() / xs.len() as f64;
        let mean_out = out.iter().sum::<f64>() / out.len() as f64;
        prop_assert!((mean_in - mean_out).abs() < 1e-6, "{} vs {}", mean_in, mean_out);
    }

    #[test]
    fn shape_is_scale_and_shift_invariant(
        xs in prop::collection::vec(-100.0f64..100.0, 8..200),
        scale in 0.5f64..50.0,
        shift in -1.0e3f64..1.0e3,
    ) {
        let Ok(base) = distribution_shape(&xs) else { return Ok(()); };
        let moved: Vec<f64> = xs.iter().map(|x| x * scale + shift).collect();
        let Ok(shape) = distribution_shape(&moved) else { return Ok(()); };
        prop_assert!((base.skewness - shape.skewness).abs() < 1e-6);
        prop_assert!((base.kurtosis - shape.kurtosis).abs() < 1e-6);
    }

    #[test]
    fn excess_kurtosis_lower_bound(xs in prop::collection::vec(-100.0f64..100.0, 4..200)) {
        if let Ok(shape) = distribution_shape(&xs) {
            prop_assert!(shape.kurtosis >= -2.0 - 1e-9);
        }
    }
}

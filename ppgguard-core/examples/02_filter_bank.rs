//! Filter Bank Example
//!
//! Applies each filter to a pulse riding on a large baseline with a slow
//! respiratory drift and prints how much of the baseline survives.
//!
//! ## Running the Example
//!
//! ```bash
//! cargo run --example 02_filter_bank
//! ```

use std::f64::consts::PI;

use ppgguard_core::filters::{
    bandpass_fourier_mask, magnitude_spectrum, moving_average, normalize_unit, ChebyshevBandpass,
};
use ppgguard_core::BandSpec;

const RATE: f64 = 100.0;

fn summary(name: &str, xs: &[f64]) {
    let mean = xs.iter().sum::<f64>() / xs.len() as f64;
    let min = xs.iter().copied().fold(f64::INFINITY, f64::min);
    let max = xs.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    println!(
        "  {name:<14} len {:>4}  mean {mean:>10.2}  range [{min:>10.2}, {max:>10.2}]",
        xs.len()
    );
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("PPGGuard Filter Bank Example");
    println!("============================\n");

    let signal: Vec<f64> = (0..2000)
        .map(|i| {
            let t = i as f64 / RATE;
            -(50_000.0
                + 300.0 * (2.0 * PI * 0.2 * t).sin()
                + 800.0 * (2.0 * PI * 1.2 * t).sin()
                + 150.0 * (2.0 * PI * 2.4 * t + 0.3).sin())
        })
        .collect();

    let filter = ChebyshevBandpass::design(4, 40.0, BandSpec::HEART_RATE, RATE)?;
    println!(
        "Chebyshev II: order {}, {} dB stopband, {} second-order sections",
        filter.order(),
        filter.stopband_db(),
        filter.sos().sections().len()
    );
    for f in [0.2, 0.5, 1.2, 2.4, 8.0, 20.0] {
        println!(
            "  |H({f:>4} Hz)| = {:>7.2} dB",
            filter.sos().magnitude_response_db(f, RATE)
        );
    }
    println!();

    summary("raw", &signal);
    summary("moving avg", &moving_average(&signal, 10)?);
    let cheby = filter.apply(&signal)?;
    summary("chebyshev", &cheby);
    summary("fourier", &bandpass_fourier_mask(&signal, RATE, 0.5, 8.0)?);
    summary("normalized", &normalize_unit(&cheby)?);

    let peak = magnitude_spectrum(&cheby, RATE)?
        .into_iter()
        .skip(1)
        .fold((0.0, 0.0), |best, bin| if bin.1 > best.1 { bin } else { best });
    println!("\nDominant frequency after filtering: {:.2} Hz", peak.0);

    Ok(())
}

//! Decode and Gate Example
//!
//! Runs two synthetic device payloads through the pipeline: a clean pulse
//! that passes the quality gate and a capture ruined by motion artifacts that
//! does not.
//!
//! ## What You'll Learn
//!
//! - Decoding the device wire format
//! - Reading the signal quality indices of every filtered series
//! - Why the gate rejected a measurement
//!
//! ## Running the Example
//!
//! ```bash
//! cargo run --example 01_decode_and_gate
//! ```

use std::f64::consts::PI;

use ppgguard_core::{
    decode, Channel, FilterVariant, GateDecision, Pipeline, PipelineConfig, Statistic,
};

fn series(samples: impl Iterator<Item = i64>) -> String {
    let items: Vec<String> = samples.map(|s| s.to_string()).collect();
    format!("[{}]", items.join(","))
}

fn pulse(baseline: f64, amplitude: f64) -> impl Iterator<Item = i64> {
    (0..1000).map(move |i| {
        let t = i as f64 / 100.0;
        (baseline
            + amplitude * (2.0 * PI * 1.2 * t).sin()
            + 0.2 * amplitude * (2.0 * PI * 2.4 * t + 0.3).sin())
        .round() as i64
    })
}

fn main() {
    println!("PPGGuard Decode and Gate Example");
    println!("================================\n");

    let clean = format!(
        "1700000000;10000;{};{}",
        series(pulse(42_000.0, 500.0)),
        series(pulse(50_000.0, 800.0))
    );
    // Same red channel, IR hit by a 20000-count spike every 5 seconds
    let spikes = (0..1000).map(|i| if i % 500 == 250 { 70_000 } else { 50_000 });
    let noisy = format!(
        "1;1700000000;10000;{};{}",
        series(pulse(42_000.0, 500.0)),
        series(spikes)
    );

    let pipeline = Pipeline::new(PipelineConfig::default());

    for (name, payload) in [("clean", clean), ("artifact", noisy)] {
        let measurement = match decode(&payload) {
            Ok(m) => m,
            Err(e) => {
                println!("{name}: decode failed: {e}");
                continue;
            }
        };
        println!(
            "{name}: {} samples/channel at {:.1} Hz, config '{}', captured {}",
            measurement.ir_samples().len(),
            measurement.sampling_rate(),
            measurement.sensor_config(),
            measurement.captured_at()
        );

        let evaluation = pipeline.evaluate(&measurement);
        for channel in Channel::ALL {
            for variant in FilterVariant::ALL {
                let skew = evaluation.sqi.get(channel, variant, Statistic::Skewness);
                let kurt = evaluation.sqi.get(channel, variant, Statistic::Kurtosis);
                if let (Some(skew), Some(kurt)) = (skew, kurt) {
                    println!("  {channel:>3} {variant:<8} skew {skew:>7.3}  kurt {kurt:>7.3}");
                }
            }
        }

        match evaluation.decision {
            GateDecision::Accept => println!("  -> accepted\n"),
            GateDecision::Reject(reason) => println!("  -> rejected: {reason}\n"),
        }
    }
}

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use ppgguard_core::{
    decode, BandSpec, Channel, FilterBank, FilterBankConfig, Pipeline, PipelineConfig,
    QualityScorer,
};
use std::f64::consts::PI;

fn pulse(n: usize) -> Vec<i64> {
    (0..n)
        .map(|i| {
            let t = i as f64 / 100.0;
            (50_000.0 + 800.0 * (2.0 * PI * 1.2 * t).sin() + 150.0 * (2.0 * PI * 2.4 * t).sin())
                .round() as i64
        })
        .collect()
}

fn payload(n: usize) -> String {
    let items: Vec<String> = pulse(n).iter().map(i64::to_string).collect();
    let list = format!("[{}]", items.join(","));
    format!("1700000000;{};{};{}", n * 10, list, list)
}

fn benchmark_filter_bank(c: &mut Criterion) {
    let mut group = c.benchmark_group("filter_bank");
    let config = FilterBankConfig {
        fourier_band: Some(BandSpec::HEART_RATE),
        ..FilterBankConfig::default()
    };
    let bank = FilterBank::new(config);

    for n in [500usize, 1000, 4000] {
        let samples = pulse(n);
        group.bench_with_input(BenchmarkId::new("apply", n), &samples, |b, samples| {
            b.iter(|| black_box(bank.apply(Channel::Ir, samples, 100.0)));
        });

        let set = bank.apply(Channel::Ir, &samples, 100.0);
        group.bench_with_input(BenchmarkId::new("score", n), &set, |b, set| {
            b.iter(|| black_box(QualityScorer::new().score([(Channel::Ir, set)])));
        });
    }
    group.finish();
}

fn benchmark_pipeline(c: &mut Criterion) {
    let pipeline = Pipeline::new(PipelineConfig::default());
    let text = payload(1000);

    c.bench_function("decode_1000", |b| b.iter(|| black_box(decode(&text))));

    let Ok(measurement) = decode(&text) else {
        return;
    };
    c.bench_function("evaluate_1000", |b| {
        b.iter(|| black_box(pipeline.evaluate(&measurement)))
    });
}

criterion_group!(benches, benchmark_filter_bank, benchmark_pipeline);
criterion_main!(benches);

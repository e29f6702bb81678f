//! Benchmarks for churnfeat-math window kernels.
#![allow(missing_docs)]

use criterion::{BenchmarkId, Criterion, Throughput, black_box, criterion_group, criterion_main};
use churnfeat_math::{TrailingMean, Window, rolling_mean};
use rand::Rng;

fn random_values(n: usize) -> Vec<f64> {
    let mut rng = rand::thread_rng();
    (0..n).map(|_| rng.r#gen::<f64>() * 80.0 + 2.5).collect()
}

/// Strictly increasing day numbers with random gaps of up to four days.
fn gapped_keys(n: usize) -> Vec<i64> {
    let mut rng = rand::thread_rng();
    let mut day = 16_000_i64;
    (0..n)
        .map(|_| {
            day += rng.gen_range(1..=4);
            day
        })
        .collect()
}

fn bench_span_mean(c: &mut Criterion) {
    let mut group = c.benchmark_group("span_mean");

    for width in [2_i64, 7, 30] {
        let size = 10_000;
        group.throughput(Throughput::Elements(size as u64));
        group.bench_with_input(BenchmarkId::new("width", width), &width, |b, &width| {
            let keys = gapped_keys(size);
            let values = random_values(size);
            let mean = TrailingMean::new(Window::Span { width, zero_fill: false }).unwrap();
            b.iter(|| mean.apply(black_box(&keys), black_box(&values)).unwrap());
        });
    }

    group.finish();
}

fn bench_rolling_mean(c: &mut Criterion) {
    let mut group = c.benchmark_group("rolling_mean");

    for size in [365, 3650, 36500] {
        group.throughput(Throughput::Elements(size as u64));
        group.bench_with_input(BenchmarkId::from_parameter(size), &size, |b, &size| {
            let values = random_values(size);
            b.iter(|| rolling_mean(black_box(&values), 7, 7).unwrap());
        });
    }

    group.finish();
}

criterion_group!(benches, bench_span_mean, bench_rolling_mean);
criterion_main!(benches);

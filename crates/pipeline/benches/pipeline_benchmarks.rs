//! Benchmarks for the end-to-end churnfeat pipeline.
#![allow(missing_docs)]

use chrono::{Duration, TimeZone, Utc};
use churnfeat_pipeline::{AsOfJoiner, FeaturePipeline, PipelineConfig};
use churnfeat_primitives::{Date, EntityId, GeoPoint, Label, TripRecord, WindowedFeature};
use criterion::{BenchmarkId, Criterion, Throughput, black_box, criterion_group, criterion_main};
use rand::Rng;

/// Random trips over a grid of pickup cells and a month of days.
fn random_trips(n: usize, cells: usize) -> Vec<TripRecord> {
    let mut rng = rand::thread_rng();
    let start = Utc.with_ymd_and_hms(2015, 7, 1, 0, 0, 0).unwrap();
    (0..n)
        .map(|i| {
            let cell = rng.gen_range(0..cells) as f64;
            TripRecord {
                trip_id: Some(i.to_string()),
                pickup_at: Some(start + Duration::minutes(rng.gen_range(0..30 * 24 * 60))),
                pickup: Some(GeoPoint::new(-74.0 + cell * 0.001, 40.75)),
                dropoff: None,
                amount: Some(rng.r#gen::<f64>() * 60.0 + 2.5),
            }
        })
        .collect()
}

fn bench_pipeline(c: &mut Criterion) {
    let mut group = c.benchmark_group("pipeline");
    group.sample_size(20);

    for parallel in [false, true] {
        let size = 50_000;
        let records = random_trips(size, 500);
        let pipeline =
            FeaturePipeline::new(PipelineConfig { parallel, ..PipelineConfig::default() }).unwrap();

        group.throughput(Throughput::Elements(size as u64));
        group.bench_with_input(
            BenchmarkId::new("parallel", parallel),
            &records,
            |b, records| {
                b.iter(|| pipeline.run_records(black_box(records.clone())).unwrap());
            },
        );
    }

    group.finish();
}

fn bench_asof_join(c: &mut Criterion) {
    let mut group = c.benchmark_group("asof_join");
    let mut rng = rand::thread_rng();
    let base = Date::from_ymd_opt(2015, 1, 1).unwrap();

    for entities in [10_u64, 100, 1000] {
        let features: Vec<WindowedFeature> = (0..entities)
            .flat_map(|e| (0..365).step_by(3).map(move |d| (e, d)))
            .map(|(e, d)| {
                WindowedFeature::new(EntityId(e), base + Duration::days(d), rng.r#gen(), 1)
            })
            .collect();
        let labels: Vec<Label> = (0..entities)
            .flat_map(|e| (0..365).map(move |d| Label::new(EntityId(e), base + Duration::days(d), 0.0)))
            .collect();

        group.throughput(Throughput::Elements(labels.len() as u64));
        group.bench_with_input(BenchmarkId::from_parameter(entities), &entities, |b, _| {
            let joiner = AsOfJoiner::default();
            b.iter(|| joiner.join(black_box(&labels), black_box(&features)).unwrap());
        });
    }

    group.finish();
}

criterion_group!(benches, bench_pipeline, bench_asof_join);
criterion_main!(benches);

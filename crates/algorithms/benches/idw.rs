//! Benchmarks for IDW gridding and the full pipeline

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use zonalreg_algorithms::interpolation::{idw, IdwParams, IdwSearch};
use zonalreg_algorithms::pipeline::{Pipeline, PipelineConfig};
use zonalreg_core::{PointStore, SamplePoint, Zone};

fn create_points(n: usize) -> Vec<SamplePoint> {
    // Deterministic scatter over [0, 100]² with a smooth trend plus a
    // wrapped-index pattern
    (0..n)
        .map(|i| {
            let x = ((i * 37) % 1000) as f64 / 10.0;
            let y = ((i * 91 + 13) % 1000) as f64 / 10.0;
            let value = 0.05 * x + 0.02 * y + ((i * 7) % 11) as f64 / 10.0;
            SamplePoint::new(x, y, value)
        })
        .collect()
}

fn create_zones(per_side: usize) -> Vec<Zone> {
    let size = 100.0 / per_side as f64;
    let mut zones = Vec::with_capacity(per_side * per_side);
    for i in 0..per_side {
        for j in 0..per_side {
            let (x0, y0) = (i as f64 * size, j as f64 * size);
            zones.push(Zone::new(
                format!("z{}_{}", i, j),
                vec![(x0, y0), (x0 + size, y0), (x0 + size, y0 + size), (x0, y0 + size)],
                (i + 2 * j) as f64 + ((i * j) % 3) as f64,
            ));
        }
    }
    zones
}

fn bench_idw_global(c: &mut Criterion) {
    let mut group = c.benchmark_group("idw_global");
    group.sample_size(20);

    for n in [100, 1000, 5000].iter() {
        let store = PointStore::load(create_points(*n)).unwrap();

        group.bench_with_input(BenchmarkId::from_parameter(n), n, |b, _| {
            b.iter(|| idw(black_box(&store), IdwParams::default()).unwrap())
        });
    }

    group.finish();
}

fn bench_idw_nearest(c: &mut Criterion) {
    let mut group = c.benchmark_group("idw_max_points_12");
    group.sample_size(20);

    for n in [1000, 5000, 20000].iter() {
        let store = PointStore::load(create_points(*n)).unwrap();
        let params = IdwParams {
            search: IdwSearch {
                max_points: Some(12),
                ..IdwSearch::default()
            },
            ..IdwParams::default()
        };

        group.bench_with_input(BenchmarkId::from_parameter(n), n, |b, _| {
            b.iter(|| idw(black_box(&store), params).unwrap())
        });
    }

    group.finish();
}

fn bench_pipeline_cached(c: &mut Criterion) {
    let mut pipeline = Pipeline::new(create_points(1000), create_zones(10)).unwrap();
    let config = PipelineConfig::default();
    // prime the cache so only aggregation and regression are measured
    pipeline.run(&config).unwrap();

    c.bench_function("pipeline_cached_100_zones", |b| {
        b.iter(|| pipeline.run(black_box(&config)).unwrap())
    });
}

criterion_group!(benches, bench_idw_global, bench_idw_nearest, bench_pipeline_cached);
criterion_main!(benches);

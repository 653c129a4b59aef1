//! Benchmarks for the per-pixel kernel and the batch index pass

use std::collections::BTreeMap;

use bandwise_algorithms::prelude::*;
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

fn create_band(size: usize, base: f64) -> Raster<f64> {
    let mut r = Raster::new(size, size);
    r.set_transform(GeoTransform::new(0.0, size as f64, 1.0, -1.0));
    for row in 0..size {
        for col in 0..size {
            let v = base + ((row * 7 + col * 13) % 200) as f64 / 1000.0;
            r.set(row, col, v).unwrap();
        }
    }
    r
}

fn create_scene(size: usize) -> Image {
    Image::from_planes(
        "bench",
        vec![
            ("blue", create_band(size, 0.04)),
            ("green", create_band(size, 0.07)),
            ("red", create_band(size, 0.05)),
            ("nir", create_band(size, 0.30)),
            ("swir1", create_band(size, 0.15)),
            ("swir2", create_band(size, 0.08)),
        ],
    )
    .unwrap()
}

fn bench_ndvi(c: &mut Criterion) {
    let mut group = c.benchmark_group("kernel/ndvi");
    for size in [256, 512, 1024, 2048] {
        let scene = create_scene(size);
        group.bench_with_input(BenchmarkId::from_parameter(size), &size, |b, _| {
            b.iter(|| ndvi(black_box(&scene), "ndvi").unwrap())
        });
    }
    group.finish();
}

fn bench_index_batch(c: &mut Criterion) {
    let mut requests = BTreeMap::new();
    for index in SpectralIndex::ALL {
        if index.required_bands().contains(&BandId::Lwir) {
            continue;
        }
        requests.insert(index.name().to_string(), format!("{}_out", index));
    }
    let cfg = IndexConfig::default();

    let mut group = c.benchmark_group("kernel/index_batch");
    for size in [256, 512, 1024] {
        let scene = create_scene(size);
        group.bench_with_input(BenchmarkId::from_parameter(size), &size, |b, _| {
            b.iter(|| {
                indices(
                    black_box(&scene),
                    &requests,
                    &cfg,
                    &Dictionary::new(),
                    &KernelOptions::default(),
                )
                .unwrap()
            })
        });
    }
    group.finish();
}

fn bench_modes(c: &mut Criterion) {
    let scene = create_scene(1024);
    let mapping = validate(&scene, &[BandId::Red, BandId::Nir, BandId::Swir1]).unwrap();
    let planes = mapping.planes(&scene);
    let kernel = pixel_fn(1, |s, out| out[0] = (s[1] - s[0]) / (s[1] + s[0] + s[2]));

    let mut group = c.benchmark_group("kernel/mode");
    group.bench_function("sequential", |b| {
        b.iter(|| evaluate(black_box(&planes), &kernel, CONTINUOUS_NODATA, &KernelOptions::sequential()).unwrap())
    });
    group.bench_function("parallel", |b| {
        b.iter(|| evaluate(black_box(&planes), &kernel, CONTINUOUS_NODATA, &KernelOptions::default()).unwrap())
    });
    group.finish();
}

criterion_group!(benches, bench_ndvi, bench_index_batch, bench_modes);
criterion_main!(benches);

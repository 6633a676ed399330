//! Benchmarks for label map construction, valuation and conversion

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use obia_algorithms::attributes::{shape_attributes, statistics_attributes, ShapeParams, StatisticsParams};
use obia_algorithms::conversion::{
    binary_image_to_label_map, label_image_to_label_map, label_map_to_label_image,
    label_map_to_vector_data, BinaryImageParams,
};
use obia_core::{GeoTransform, LabelMap, Raster};
use obia_parallel::ProcessingMode;

/// Blocky label raster: 16x16 tiles split by background every seventh column
fn create_labels(size: usize) -> Raster<u32> {
    let tiles = size.div_ceil(16);
    let mut r = Raster::from_fn(size, size, |(row, col)| {
        if col % 7 == 0 {
            0
        } else {
            ((row / 16) * tiles + col / 16) as u32 + 1
        }
    });
    r.set_transform(GeoTransform::new(0.0, size as f64, 1.0, -1.0));
    r
}

fn create_feature(size: usize) -> Raster<f64> {
    Raster::from_fn(size, size, |(row, col)| ((row * 7 + col * 13) % 200) as f64)
}

fn bench_labelize(c: &mut Criterion) {
    let mut group = c.benchmark_group("labelmap/labelize");
    for size in [256, 512, 1024] {
        let labels = create_labels(size);
        group.bench_with_input(BenchmarkId::from_parameter(size), &size, |b, _| {
            b.iter(|| label_image_to_label_map(black_box(&labels), 0).unwrap())
        });
    }
    group.finish();
}

fn bench_binary_components(c: &mut Criterion) {
    let mut group = c.benchmark_group("labelmap/binary_components");
    for size in [256, 512, 1024] {
        let binary = Raster::from_fn(size, size, |(row, col)| u8::from((row * 3 + col * 5) % 4 != 0));
        group.bench_with_input(BenchmarkId::from_parameter(size), &size, |b, _| {
            b.iter(|| {
                let map: LabelMap<u32> =
                    binary_image_to_label_map(black_box(&binary), &BinaryImageParams::default()).unwrap();
                map
            })
        });
    }
    group.finish();
}

fn bench_shape(c: &mut Criterion) {
    let mut group = c.benchmark_group("labelmap/shape");
    for size in [256, 512, 1024] {
        let map = label_image_to_label_map(&create_labels(size), 0).unwrap();
        let params = ShapeParams {
            compute_perimeter: true,
            compute_feret_diameter: true,
            mode: ProcessingMode::Parallel,
        };
        group.bench_with_input(BenchmarkId::from_parameter(size), &size, |b, _| {
            b.iter(|| {
                let mut m = map.clone();
                shape_attributes(black_box(&mut m), &params).unwrap();
                m
            })
        });
    }
    group.finish();
}

fn bench_statistics(c: &mut Criterion) {
    let mut group = c.benchmark_group("labelmap/statistics");
    for size in [256, 512, 1024] {
        let map = label_image_to_label_map(&create_labels(size), 0).unwrap();
        let feature = create_feature(size);
        let params = StatisticsParams::default();
        group.bench_with_input(BenchmarkId::from_parameter(size), &size, |b, _| {
            b.iter(|| {
                let mut m = map.clone();
                statistics_attributes(black_box(&mut m), &feature, &params).unwrap();
                m
            })
        });
    }
    group.finish();
}

fn bench_rasterize(c: &mut Criterion) {
    let mut group = c.benchmark_group("labelmap/rasterize");
    for size in [256, 512, 1024] {
        let map = label_image_to_label_map(&create_labels(size), 0).unwrap();
        group.bench_with_input(BenchmarkId::from_parameter(size), &size, |b, _| {
            b.iter(|| label_map_to_label_image(black_box(&map), ProcessingMode::Parallel).unwrap())
        });
    }
    group.finish();
}

fn bench_vectorize(c: &mut Criterion) {
    let mut group = c.benchmark_group("labelmap/vectorize");
    group.sample_size(20);
    for size in [256, 512] {
        let map = label_image_to_label_map(&create_labels(size), 0).unwrap();
        group.bench_with_input(BenchmarkId::from_parameter(size), &size, |b, _| {
            b.iter(|| label_map_to_vector_data(black_box(&map)).unwrap())
        });
    }
    group.finish();
}

criterion_group!(
    benches,
    bench_labelize,
    bench_binary_components,
    bench_shape,
    bench_statistics,
    bench_rasterize,
    bench_vectorize
);
criterion_main!(benches);

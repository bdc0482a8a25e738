//! Benchmark raster statistics and difference kernels against their scalar
//! references.
//!
//! Run with: `cargo bench --bench statistic_benchmark`

#![allow(clippy::cast_possible_truncation)]

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use rastersimd_core::memory::{align_hi, AlignedBuffer, SIMD_ALIGN};
use rastersimd_core::{difference, simd, statistic, Raster};

const SIZES: [(usize, usize); 3] = [(64, 64), (640, 480), (1920, 1080)];

/// Aligned image with a deterministic texture.
fn generate_image(width: usize, height: usize, seed: usize) -> (AlignedBuffer<u8>, usize) {
    let stride = align_hi(width, SIMD_ALIGN);
    let mut buffer = AlignedBuffer::new(stride * height).expect("bench allocation");
    for (i, v) in buffer.iter_mut().enumerate() {
        *v = ((i * 31 + seed * 7) ^ (i >> 5)) as u8;
    }
    (buffer, stride)
}

fn bench_get_statistic(c: &mut Criterion) {
    let mut group = c.benchmark_group("get_statistic");
    for (width, height) in SIZES {
        let (buffer, stride) = generate_image(width, height, 0);
        let image = Raster::new(buffer.as_slice(), stride, width, height).expect("bench raster");
        let id = format!("{width}x{height}");
        group.throughput(Throughput::Bytes((width * height) as u64));

        group.bench_with_input(BenchmarkId::new("dispatch", &id), &image, |bencher, image| {
            bencher.iter(|| statistic::get_statistic(black_box(image)));
        });
        group.bench_with_input(BenchmarkId::new("scalar", &id), &image, |bencher, image| {
            bencher.iter(|| statistic::scalar::get_statistic(black_box(image)));
        });
    }
    group.finish();
}

fn bench_col_sums(c: &mut Criterion) {
    let mut group = c.benchmark_group("get_col_sums");
    for (width, height) in SIZES {
        let (buffer, stride) = generate_image(width, height, 1);
        let image = Raster::new(buffer.as_slice(), stride, width, height).expect("bench raster");
        let mut sums = vec![0u32; width];
        let id = format!("{width}x{height}");
        group.throughput(Throughput::Bytes((width * height) as u64));

        group.bench_function(BenchmarkId::new("dispatch", &id), |bencher| {
            bencher.iter(|| statistic::get_col_sums(black_box(&image), &mut sums));
        });
        group.bench_function(BenchmarkId::new("scalar", &id), |bencher| {
            bencher.iter(|| statistic::scalar::get_col_sums(black_box(&image), &mut sums));
        });
    }
    group.finish();
}

fn bench_abs_difference(c: &mut Criterion) {
    let mut group = c.benchmark_group("abs_difference_sum");
    for (width, height) in SIZES {
        let (a, stride) = generate_image(width, height, 2);
        let (b, _) = generate_image(width, height, 3);
        let a = Raster::new(a.as_slice(), stride, width, height).expect("bench raster");
        let b = Raster::new(b.as_slice(), stride, width, height).expect("bench raster");
        let id = format!("{width}x{height}");
        group.throughput(Throughput::Bytes((2 * width * height) as u64));

        group.bench_function(BenchmarkId::new("dispatch", &id), |bencher| {
            bencher.iter(|| difference::abs_difference_sum(black_box(&a), black_box(&b)));
        });
        group.bench_function(BenchmarkId::new("sums_3x3", &id), |bencher| {
            bencher.iter(|| difference::abs_difference_sums_3x3(black_box(&a), black_box(&b)));
        });
        group.bench_function(BenchmarkId::new("scalar", &id), |bencher| {
            bencher.iter(|| difference::scalar::abs_difference_sum(black_box(&a), black_box(&b)));
        });
    }
    group.finish();
}

fn report_level(_: &mut Criterion) {
    simd::warmup_simd_cache();
    println!("SIMD level: {:?}", simd::simd_level());
}

criterion_group!(benches, report_level, bench_get_statistic, bench_col_sums, bench_abs_difference);
criterion_main!(benches);

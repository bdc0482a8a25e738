//! Benchmark neural vector kernels, convolutions and pooling.
//!
//! Run with: `cargo bench --bench neural_benchmark`

#![allow(clippy::cast_precision_loss)]

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use rastersimd_core::neural::{self, convolution, pooling};
use rastersimd_core::{Raster, RasterMut};

fn generate_vector(len: usize, seed: f32) -> Vec<f32> {
    (0..len).map(|i| (seed + i as f32 * 0.1).sin()).collect()
}

fn bench_activations(c: &mut Criterion) {
    let mut group = c.benchmark_group("activations");
    for len in [256, 4096, 65536] {
        let src = generate_vector(len, 0.0);
        let mut dst = vec![0.0f32; len];
        group.throughput(Throughput::Elements(len as u64));

        group.bench_function(BenchmarkId::new("rough_sigmoid", len), |bencher| {
            bencher.iter(|| neural::neural_rough_sigmoid(black_box(&src), 1.0, &mut dst));
        });
        group.bench_function(BenchmarkId::new("rough_sigmoid_scalar", len), |bencher| {
            bencher.iter(|| neural::scalar::neural_rough_sigmoid(black_box(&src), 1.0, &mut dst));
        });
        group.bench_function(BenchmarkId::new("rough_tanh", len), |bencher| {
            bencher.iter(|| neural::neural_rough_tanh(black_box(&src), 1.0, &mut dst));
        });
        group.bench_function(BenchmarkId::new("relu", len), |bencher| {
            bencher.iter(|| neural::neural_relu(black_box(&src), 0.1, &mut dst));
        });
        group.bench_function(BenchmarkId::new("product_sum", len), |bencher| {
            bencher.iter(|| neural::neural_product_sum(black_box(&src), black_box(&dst)));
        });
    }
    group.finish();
}

fn bench_convolution(c: &mut Criterion) {
    let mut group = c.benchmark_group("convolution");
    let (width, height) = (128, 128);
    let weights = generate_vector(25, 2.0);
    for core in [convolution::ConvolutionCore::Core3x3, convolution::ConvolutionCore::Core5x5] {
        let k = core.size();
        let src = generate_vector((width + k - 1) * (height + k - 1), 1.0);
        let src = Raster::packed(&src, width + k - 1, height + k - 1).expect("bench raster");
        let mut dst = vec![0.0f32; width * height];
        let mut back = vec![0.0f32; (width + k - 1) * (height + k - 1)];
        let grad = generate_vector(width * height, 3.0);
        let grad = Raster::packed(&grad, width, height).expect("bench raster");
        let weights = &weights[..core.area()];
        group.throughput(Throughput::Elements((width * height) as u64));

        group.bench_function(BenchmarkId::new("forward", k), |bencher| {
            let mut dst = RasterMut::packed(&mut dst, width, height).expect("bench raster");
            bencher.iter(|| convolution::add_convolution_forward(core, black_box(&src), weights, &mut dst));
        });
        group.bench_function(BenchmarkId::new("backward", k), |bencher| {
            let mut back = RasterMut::packed(&mut back, width + k - 1, height + k - 1).expect("bench raster");
            bencher.iter(|| convolution::add_convolution_backward(core, black_box(&grad), weights, &mut back));
        });
        group.bench_function(BenchmarkId::new("sum", k), |bencher| {
            let mut sums = vec![0.0f32; core.area()];
            bencher.iter(|| convolution::add_convolution_sum(core, black_box(&src), &grad, &mut sums));
        });
    }
    group.finish();
}

fn bench_pooling(c: &mut Criterion) {
    let mut group = c.benchmark_group("pooling");
    let (width, height) = (256, 256);
    let src = generate_vector(width * height, 4.0);
    let src = Raster::packed(&src, width, height).expect("bench raster");
    group.throughput(Throughput::Elements((width * height) as u64));

    group.bench_function("1x1_max_3x3", |bencher| {
        let mut out = vec![0.0f32; width * height];
        let mut dst = RasterMut::packed(&mut out, width, height).expect("bench raster");
        bencher.iter(|| pooling::pooling_1x1_max_3x3(black_box(&src), &mut dst));
    });
    group.bench_function("2x2_max_2x2", |bencher| {
        let mut out = vec![0.0f32; width * height / 4];
        let mut dst = RasterMut::packed(&mut out, width / 2, height / 2).expect("bench raster");
        bencher.iter(|| pooling::pooling_2x2_max_2x2(black_box(&src), &mut dst));
    });
    group.bench_function("2x2_max_3x3", |bencher| {
        let mut out = vec![0.0f32; width * height / 4];
        let mut dst = RasterMut::packed(&mut out, width / 2, height / 2).expect("bench raster");
        bencher.iter(|| pooling::pooling_2x2_max_3x3(black_box(&src), &mut dst));
    });
    group.finish();
}

criterion_group!(benches, bench_activations, bench_convolution, bench_pooling);
criterion_main!(benches);

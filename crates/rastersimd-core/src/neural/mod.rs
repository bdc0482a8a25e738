//! Float vector primitives for small neural networks.
//!
//! # Module Structure
//!
//! - `scalar`: Reference definitions of every kernel
//! - `convolution`: Forward, backward and weight-sum 2D convolutions
//! - `pooling`: Max pooling over 2x2 and 3x3 windows
//!
//! Vector kernels take plain slices. Activations marked "rough" are
//! polynomial approximations; vector builds additionally use hardware
//! reciprocal estimates and agree with `scalar` to about 1e-3.

use crate::simd::{simd_level, SimdLevel};
use crate::view::{Raster, RasterMut};

pub mod convolution;
pub mod pooling;
pub mod scalar;

#[cfg(target_arch = "x86_64")]
mod avx2;
#[cfg(target_arch = "x86_64")]
mod avx512;
#[cfg(target_arch = "aarch64")]
mod neon;
#[cfg(target_arch = "x86_64")]
mod sse41;

/// Dispatches an element-wise `(src, parameter, dst)` kernel.
macro_rules! dispatch_activation {
    ($kernel:ident, $scalar:ident, $src:expr, $param:expr, $dst:expr) => {
        match simd_level() {
            // SAFETY: slice lengths are checked by the caller; every ISA handles
            // any length. See simd/mod.rs Conditions 1-3.
            #[cfg(target_arch = "x86_64")]
            SimdLevel::Avx512 => unsafe { avx512::$kernel($src, $param, $dst) },
            #[cfg(target_arch = "x86_64")]
            SimdLevel::Avx2 => unsafe { avx2::$kernel($src, $param, $dst) },
            #[cfg(target_arch = "x86_64")]
            SimdLevel::Sse41 => unsafe { sse41::$kernel($src, $param, $dst) },
            #[cfg(target_arch = "aarch64")]
            SimdLevel::Neon => neon::$kernel($src, $param, $dst),
            _ => scalar::$scalar($src, $param, $dst),
        }
    };
}

fn check_lengths(src: usize, dst: usize) {
    assert_eq!(src, dst, "vector lengths differ");
}

/// Dot product of two equally long vectors.
///
/// # Panics
///
/// Panics when the lengths differ.
#[must_use]
pub fn neural_product_sum(a: &[f32], b: &[f32]) -> f32 {
    check_lengths(a.len(), b.len());
    match simd_level() {
        // SAFETY: equal lengths checked above. See simd/mod.rs Conditions 1-3.
        #[cfg(target_arch = "x86_64")]
        SimdLevel::Avx512 => unsafe { avx512::product_sum(a, b) },
        #[cfg(target_arch = "x86_64")]
        SimdLevel::Avx2 => unsafe { avx2::product_sum(a, b) },
        #[cfg(target_arch = "x86_64")]
        SimdLevel::Sse41 => unsafe { sse41::product_sum(a, b) },
        #[cfg(target_arch = "aarch64")]
        SimdLevel::Neon => neon::product_sum(a, b),
        _ => scalar::neural_product_sum(a, b),
    }
}

/// `dst[i] += src[i] * value`.
///
/// # Panics
///
/// Panics when the lengths differ.
pub fn neural_add_vector_multiplied_by_value(src: &[f32], value: f32, dst: &mut [f32]) {
    check_lengths(src.len(), dst.len());
    dispatch_activation!(add_multiplied, neural_add_vector_multiplied_by_value, src, value, dst);
}

/// `dst[i] += src[i]`.
///
/// # Panics
///
/// Panics when the lengths differ.
pub fn neural_add_vector(src: &[f32], dst: &mut [f32]) {
    check_lengths(src.len(), dst.len());
    match simd_level() {
        // SAFETY: equal lengths checked above. See simd/mod.rs Conditions 1-3.
        #[cfg(target_arch = "x86_64")]
        SimdLevel::Avx512 => unsafe { avx512::add_vector(src, dst) },
        #[cfg(target_arch = "x86_64")]
        SimdLevel::Avx2 => unsafe { avx2::add_vector(src, dst) },
        #[cfg(target_arch = "x86_64")]
        SimdLevel::Sse41 => unsafe { sse41::add_vector(src, dst) },
        #[cfg(target_arch = "aarch64")]
        SimdLevel::Neon => neon::add_vector(src, dst),
        _ => scalar::neural_add_vector(src, dst),
    }
}

/// `dst[i] += value`.
pub fn neural_add_value(value: f32, dst: &mut [f32]) {
    match simd_level() {
        // SAFETY: single buffer. See simd/mod.rs Conditions 1-3.
        #[cfg(target_arch = "x86_64")]
        SimdLevel::Avx512 => unsafe { avx512::add_value(value, dst) },
        #[cfg(target_arch = "x86_64")]
        SimdLevel::Avx2 => unsafe { avx2::add_value(value, dst) },
        #[cfg(target_arch = "x86_64")]
        SimdLevel::Sse41 => unsafe { sse41::add_value(value, dst) },
        #[cfg(target_arch = "aarch64")]
        SimdLevel::Neon => neon::add_value(value, dst),
        _ => scalar::neural_add_value(value, dst),
    }
}

/// `dst[i] = rough_sigmoid(src[i] * slope)`; see [`scalar::rough_sigmoid`].
///
/// # Panics
///
/// Panics when the lengths differ.
pub fn neural_rough_sigmoid(src: &[f32], slope: f32, dst: &mut [f32]) {
    check_lengths(src.len(), dst.len());
    dispatch_activation!(rough_sigmoid, neural_rough_sigmoid, src, slope, dst);
}

/// `dst[i] = rough_sigmoid2(src[i] * slope)`; see [`scalar::rough_sigmoid2`].
///
/// # Panics
///
/// Panics when the lengths differ.
pub fn neural_rough_sigmoid2(src: &[f32], slope: f32, dst: &mut [f32]) {
    check_lengths(src.len(), dst.len());
    dispatch_activation!(rough_sigmoid2, neural_rough_sigmoid2, src, slope, dst);
}

/// `dst[i] *= slope * (1 - src[i]) * src[i]` where `src` holds sigmoid outputs.
///
/// # Panics
///
/// Panics when the lengths differ.
pub fn neural_derivative_sigmoid(src: &[f32], slope: f32, dst: &mut [f32]) {
    check_lengths(src.len(), dst.len());
    dispatch_activation!(derivative_sigmoid, neural_derivative_sigmoid, src, slope, dst);
}

/// `dst[i] = rough_tanh(src[i] * slope)`; see [`scalar::rough_tanh`].
///
/// # Panics
///
/// Panics when the lengths differ.
pub fn neural_rough_tanh(src: &[f32], slope: f32, dst: &mut [f32]) {
    check_lengths(src.len(), dst.len());
    dispatch_activation!(rough_tanh, neural_rough_tanh, src, slope, dst);
}

/// `dst[i] *= slope * (1 - src[i]^2)` where `src` holds tanh outputs.
///
/// # Panics
///
/// Panics when the lengths differ.
pub fn neural_derivative_tanh(src: &[f32], slope: f32, dst: &mut [f32]) {
    check_lengths(src.len(), dst.len());
    dispatch_activation!(derivative_tanh, neural_derivative_tanh, src, slope, dst);
}

/// Leaky ReLU: `max(src[i] * slope, src[i])`. `slope` must lie in `[0, 1]`.
///
/// # Panics
///
/// Panics when the lengths differ.
pub fn neural_relu(src: &[f32], slope: f32, dst: &mut [f32]) {
    check_lengths(src.len(), dst.len());
    debug_assert!((0.0..=1.0).contains(&slope), "relu slope {slope} outside [0, 1]");
    dispatch_activation!(relu, neural_relu, src, slope, dst);
}

/// `dst[i] *= src[i] > 0 ? 1 : slope`.
///
/// # Panics
///
/// Panics when the lengths differ.
pub fn neural_derivative_relu(src: &[f32], slope: f32, dst: &mut [f32]) {
    check_lengths(src.len(), dst.len());
    debug_assert!((0.0..=1.0).contains(&slope), "relu slope {slope} outside [0, 1]");
    dispatch_activation!(derivative_relu, neural_derivative_relu, src, slope, dst);
}

/// `dst[i] = src[i]^exponent` for positive `src[i]`.
///
/// Vector builds evaluate `exp2(exponent * log2(x))` with fifth-degree
/// polynomials (relative error below 1e-5 for moderate results).
///
/// # Panics
///
/// Panics when the lengths differ.
pub fn neural_pow(src: &[f32], exponent: f32, dst: &mut [f32]) {
    check_lengths(src.len(), dst.len());
    match simd_level() {
        // SAFETY: equal lengths checked above. See simd/mod.rs Conditions 1-3.
        #[cfg(target_arch = "x86_64")]
        SimdLevel::Avx512 | SimdLevel::Avx2 => unsafe { avx2::pow(src, exponent, dst) },
        #[cfg(target_arch = "x86_64")]
        SimdLevel::Sse41 => unsafe { sse41::pow(src, exponent, dst) },
        _ => scalar::neural_pow(src, exponent, dst),
    }
}

/// Momentum update: `d[i] = a * d[i] + b * x[i]; w[i] += d[i]`.
///
/// # Panics
///
/// Panics when the three lengths differ.
pub fn neural_update_weights(x: &[f32], a: f32, b: f32, d: &mut [f32], w: &mut [f32]) {
    check_lengths(x.len(), d.len());
    check_lengths(x.len(), w.len());
    match simd_level() {
        // SAFETY: equal lengths checked above. See simd/mod.rs Conditions 1-3.
        #[cfg(target_arch = "x86_64")]
        SimdLevel::Avx512 => unsafe { avx512::update_weights(x, a, b, d, w) },
        #[cfg(target_arch = "x86_64")]
        SimdLevel::Avx2 => unsafe { avx2::update_weights(x, a, b, d, w) },
        #[cfg(target_arch = "x86_64")]
        SimdLevel::Sse41 => unsafe { sse41::update_weights(x, a, b, d, w) },
        #[cfg(target_arch = "aarch64")]
        SimdLevel::Neon => neon::update_weights(x, a, b, d, w),
        _ => scalar::neural_update_weights(x, a, b, d, w),
    }
}

/// AdaGrad step over a batch of `batch` samples:
///
/// ```text
/// d = delta[i] / batch
/// gradient[i] += d * d
/// weight[i] -= alpha * d / sqrt(gradient[i] + epsilon)
/// ```
///
/// # Panics
///
/// Panics when the lengths differ or `batch` is zero.
pub fn neural_adaptive_gradient_update(
    delta: &[f32],
    batch: usize,
    alpha: f32,
    epsilon: f32,
    gradient: &mut [f32],
    weight: &mut [f32],
) {
    check_lengths(delta.len(), gradient.len());
    check_lengths(delta.len(), weight.len());
    assert!(batch > 0, "adaptive gradient batch must be positive");
    match simd_level() {
        // SAFETY: equal lengths checked above. See simd/mod.rs Conditions 1-3.
        #[cfg(target_arch = "x86_64")]
        SimdLevel::Avx512 => unsafe {
            avx512::adaptive_gradient_update(delta, batch, alpha, epsilon, gradient, weight);
        },
        #[cfg(target_arch = "x86_64")]
        SimdLevel::Avx2 => unsafe {
            avx2::adaptive_gradient_update(delta, batch, alpha, epsilon, gradient, weight);
        },
        #[cfg(target_arch = "x86_64")]
        SimdLevel::Sse41 => unsafe {
            sse41::adaptive_gradient_update(delta, batch, alpha, epsilon, gradient, weight);
        },
        #[cfg(target_arch = "aarch64")]
        SimdLevel::Neon => neon::adaptive_gradient_update(delta, batch, alpha, epsilon, gradient, weight),
        _ => scalar::neural_adaptive_gradient_update(delta, batch, alpha, epsilon, gradient, weight),
    }
}

/// Converts bytes to floats in `[0, 1]`: `v / 255`, or `(255 - v) / 255`
/// with `inversion`.
///
/// # Panics
///
/// Panics when the raster sizes differ.
pub fn neural_convert(src: &Raster<'_, u8>, dst: &mut RasterMut<'_, f32>, inversion: bool) {
    assert!(src.same_size(&dst.as_raster()), "convert between rasters of different sizes");
    match simd_level() {
        // SAFETY: sizes checked above; vector bodies stop at the last full
        // step and convert the rest per pixel. See simd/mod.rs Conditions 1-3.
        #[cfg(target_arch = "x86_64")]
        SimdLevel::Avx512 | SimdLevel::Avx2 => unsafe { avx2::convert(src, dst, inversion) },
        #[cfg(target_arch = "x86_64")]
        SimdLevel::Sse41 => unsafe { sse41::convert(src, dst, inversion) },
        #[cfg(target_arch = "aarch64")]
        SimdLevel::Neon => neon::convert(src, dst, inversion),
        _ => scalar::neural_convert(src, dst, inversion),
    }
}

#[cfg(test)]
mod neural_tests;

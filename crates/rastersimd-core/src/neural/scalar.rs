//! Scalar reference implementations for the neural family.
//!
//! The activation approximations here are the per-element definitions; the
//! vector kernels use hardware reciprocal estimates and stay within a few
//! thousandths of them.

use crate::memory::align_lo;
use crate::simd::{Loader, Storer};
use crate::view::{Raster, RasterMut};

/// Maximal absolute error against the exact sigmoid: 0.002294.
#[inline]
#[must_use]
pub fn rough_sigmoid(value: f32) -> f32 {
    let x = value.abs();
    let x2 = x * x;
    let e = 1.0 + x + x2 * 0.5417 + x2 * x2 * 0.1460;
    1.0 / (1.0 + if value > 0.0 { 1.0 / e } else { e })
}

/// Maximal absolute error against the exact sigmoid: 0.001721.
///
/// Approximates `exp(-x)` as `(1 - x/128)^128`, clamped from below.
#[inline]
#[must_use]
pub fn rough_sigmoid2(value: f32) -> f32 {
    let e1 = (1.0 - value * 0.007_812_5).max(0.5);
    let e2 = e1 * e1;
    let e4 = e2 * e2;
    let e8 = e4 * e4;
    let e16 = e8 * e8;
    let e32 = e16 * e16;
    let e64 = e32 * e32;
    1.0 / (1.0 + e64 * e64)
}

/// Sigmoid derivative expressed through the function value.
#[inline]
#[must_use]
pub fn derivative_sigmoid(function: f32) -> f32 {
    (1.0 - function) * function
}

/// Maximal absolute error against the exact tanh: 0.001514.
#[inline]
#[must_use]
pub fn rough_tanh(value: f32) -> f32 {
    let x = value.abs();
    let x2 = x * x;
    let pe = 1.0 + x + x2 * 0.5658 + x2 * x2 * 0.1430;
    let ne = 1.0 / pe;
    let sign = if value > 0.0 { 1.0 } else { -1.0 };
    sign * (pe - ne) / (pe + ne)
}

/// Tanh derivative expressed through the function value.
#[inline]
#[must_use]
pub fn derivative_tanh(function: f32) -> f32 {
    1.0 - function * function
}

/// `basis^exponent` through `exp(ln(basis) * exponent)`.
#[inline]
#[must_use]
pub fn pow(basis: f32, exponent: f32) -> f32 {
    (basis.ln() * exponent).exp()
}

fn map(src: &[f32], dst: &mut [f32], f: impl Fn(f32) -> f32) {
    for (d, &s) in dst.iter_mut().zip(src) {
        *d = f(s);
    }
}

fn scale_by(src: &[f32], dst: &mut [f32], f: impl Fn(f32) -> f32) {
    for (d, &s) in dst.iter_mut().zip(src) {
        *d *= f(s);
    }
}

/// `v / 255`, or `(255 - v) / 255` with `inversion`.
///
/// Full 16-pixel blocks are streamed through [`Loader`]/[`Storer`], which
/// keeps every block access on a block boundary; the remainder is converted
/// per pixel.
pub fn neural_convert(src: &Raster<'_, u8>, dst: &mut RasterMut<'_, f32>, inversion: bool) {
    assert!(src.same_size(&dst.as_raster()), "convert between rasters of different sizes");
    if src.is_aligned(16) && dst.is_aligned(16) {
        convert_body::<true>(src, dst, inversion);
    } else {
        convert_body::<false>(src, dst, inversion);
    }
}

fn convert_body<const ALIGN: bool>(src: &Raster<'_, u8>, dst: &mut RasterMut<'_, f32>, inversion: bool) {
    let width = src.width();
    let body = align_lo(width, 16);
    let convert = |v: u8| f32::from(if inversion { 255 - v } else { v }) / 255.0;
    for y in 0..src.height() {
        let (src_row, dst_row) = (src.row(y), dst.row_mut(y));
        let (dst_body, dst_tail) = dst_row.split_at_mut(body);
        let mut loader = Loader::<u8, 16, ALIGN>::new(&src_row[..body]);
        let mut storer = Storer::<f32, 4, ALIGN>::new(dst_body);
        while loader.remaining() > 0 {
            let bytes = loader.next_block();
            for quad in bytes.chunks_exact(4) {
                storer.store(&[convert(quad[0]), convert(quad[1]), convert(quad[2]), convert(quad[3])]);
            }
        }
        storer.flush();
        for (d, &s) in dst_tail.iter_mut().zip(&src_row[body..]) {
            *d = convert(s);
        }
    }
}

/// Dot product with four interleaved partial sums.
#[must_use]
pub fn neural_product_sum(a: &[f32], b: &[f32]) -> f32 {
    let size = a.len().min(b.len());
    let body = align_lo(size, 4);
    let mut sums = [0.0f32; 4];
    for (qa, qb) in a[..body].chunks_exact(4).zip(b[..body].chunks_exact(4)) {
        for ((sum, &x), &y) in sums.iter_mut().zip(qa).zip(qb) {
            *sum += x * y;
        }
    }
    for (&x, &y) in a[body..size].iter().zip(&b[body..size]) {
        sums[0] += x * y;
    }
    sums[0] + sums[1] + sums[2] + sums[3]
}

/// `dst[i] += src[i] * value`.
pub fn neural_add_vector_multiplied_by_value(src: &[f32], value: f32, dst: &mut [f32]) {
    for (d, &s) in dst.iter_mut().zip(src) {
        *d += s * value;
    }
}

/// `dst[i] += src[i]`.
pub fn neural_add_vector(src: &[f32], dst: &mut [f32]) {
    for (d, &s) in dst.iter_mut().zip(src) {
        *d += s;
    }
}

/// `dst[i] += value`.
pub fn neural_add_value(value: f32, dst: &mut [f32]) {
    for d in dst {
        *d += value;
    }
}

/// `dst[i] = rough_sigmoid(src[i] * slope)`.
pub fn neural_rough_sigmoid(src: &[f32], slope: f32, dst: &mut [f32]) {
    map(src, dst, |s| rough_sigmoid(s * slope));
}

/// `dst[i] = rough_sigmoid2(src[i] * slope)`.
pub fn neural_rough_sigmoid2(src: &[f32], slope: f32, dst: &mut [f32]) {
    map(src, dst, |s| rough_sigmoid2(s * slope));
}

/// `dst[i] *= slope * (1 - src[i]) * src[i]`.
pub fn neural_derivative_sigmoid(src: &[f32], slope: f32, dst: &mut [f32]) {
    scale_by(src, dst, |s| slope * derivative_sigmoid(s));
}

/// `dst[i] = rough_tanh(src[i] * slope)`.
pub fn neural_rough_tanh(src: &[f32], slope: f32, dst: &mut [f32]) {
    map(src, dst, |s| rough_tanh(s * slope));
}

/// `dst[i] *= slope * (1 - src[i]^2)`.
pub fn neural_derivative_tanh(src: &[f32], slope: f32, dst: &mut [f32]) {
    scale_by(src, dst, |s| slope * derivative_tanh(s));
}

/// `max(src[i] * slope, src[i])` for `slope` in `[0, 1]`.
pub fn neural_relu(src: &[f32], slope: f32, dst: &mut [f32]) {
    if slope == 0.0 {
        map(src, dst, |s| s.max(0.0));
    } else {
        map(src, dst, |s| (s * slope).max(s));
    }
}

/// `dst[i] *= 1` where `src[i] > 0`, `dst[i] *= slope` elsewhere.
pub fn neural_derivative_relu(src: &[f32], slope: f32, dst: &mut [f32]) {
    scale_by(src, dst, |s| if s > 0.0 { 1.0 } else { slope });
}

/// `dst[i] = src[i]^exponent`.
pub fn neural_pow(src: &[f32], exponent: f32, dst: &mut [f32]) {
    map(src, dst, |s| pow(s, exponent));
}

/// Momentum step: `d[i] = a * d[i] + b * x[i]; w[i] += d[i]`.
pub fn neural_update_weights(x: &[f32], a: f32, b: f32, d: &mut [f32], w: &mut [f32]) {
    for ((d, w), &x) in d.iter_mut().zip(w.iter_mut()).zip(x) {
        *d = a * *d + b * x;
        *w += *d;
    }
}

/// AdaGrad step with an exact square root.
#[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation)] // 1/batch rounded to f32
pub fn neural_adaptive_gradient_update(
    delta: &[f32],
    batch: usize,
    alpha: f32,
    epsilon: f32,
    gradient: &mut [f32],
    weight: &mut [f32],
) {
    let norm = (1.0 / batch as f64) as f32;
    for ((g, w), &delta) in gradient.iter_mut().zip(weight.iter_mut()).zip(delta) {
        let d = delta * norm;
        *g += d * d;
        *w -= alpha * d / (*g + epsilon).sqrt();
    }
}

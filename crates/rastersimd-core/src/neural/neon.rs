//! ARM NEON neural kernels (four f32 lanes per vector).
//!
//! Reciprocals and reciprocal square roots take the hardware estimate plus
//! one Newton-Raphson step.

use std::arch::aarch64::*;

use super::scalar;
use crate::memory::align_lo;
use crate::simd::neon::F;
use crate::view::{Raster, RasterMut};

const QF: usize = 4 * F;

#[inline(always)]
unsafe fn reciprocal(value: float32x4_t) -> float32x4_t {
    let estimate = vrecpeq_f32(value);
    vmulq_f32(vrecpsq_f32(value, estimate), estimate)
}

#[inline(always)]
unsafe fn reciprocal_sqrt(value: float32x4_t) -> float32x4_t {
    let estimate = vrsqrteq_f32(value);
    vmulq_f32(vrsqrtsq_f32(vmulq_f32(value, estimate), estimate), estimate)
}

fn map(src: &[f32], dst: &mut [f32], vector: impl Fn(float32x4_t) -> float32x4_t, scalar: impl Fn(f32) -> f32) {
    let body = align_lo(dst.len(), F);
    let (s, d) = (src.as_ptr(), dst.as_mut_ptr());
    let mut i = 0;
    while i < body {
        // SAFETY: `i + F <= body <= len` for both slices.
        // Reason: NEON intrinsics on raw slice pointers for throughput.
        unsafe { vst1q_f32(d.add(i), vector(vld1q_f32(s.add(i)))) };
        i += F;
    }
    for (d, &s) in dst[body..].iter_mut().zip(&src[body..]) {
        *d = scalar(s);
    }
}

fn update(
    src: &[f32],
    dst: &mut [f32],
    vector: impl Fn(float32x4_t, float32x4_t) -> float32x4_t,
    scalar: impl Fn(f32, f32) -> f32,
) {
    let body = align_lo(dst.len(), F);
    let (s, d) = (src.as_ptr(), dst.as_mut_ptr());
    let mut i = 0;
    while i < body {
        // SAFETY: `i + F <= body <= len` for both slices.
        // Reason: NEON intrinsics on raw slice pointers for throughput.
        unsafe { vst1q_f32(d.add(i), vector(vld1q_f32(s.add(i)), vld1q_f32(d.add(i)))) };
        i += F;
    }
    for (d, &s) in dst[body..].iter_mut().zip(&src[body..]) {
        *d = scalar(s, *d);
    }
}

pub(crate) fn product_sum(a: &[f32], b: &[f32]) -> f32 {
    let size = a.len();
    let partial = align_lo(size, F);
    let full = align_lo(size, QF);
    let (pa, pb) = (a.as_ptr(), b.as_ptr());
    let mut i = 0;
    // SAFETY: Every load covers `i..i + F` with `i + F <= partial <= len`.
    // Reason: NEON intrinsics on raw slice pointers for throughput.
    let mut sum = unsafe {
        let mut sums = [vdupq_n_f32(0.0); 4];
        while i < full {
            for (k, acc) in sums.iter_mut().enumerate() {
                let offset = i + k * F;
                *acc = vmlaq_f32(*acc, vld1q_f32(pa.add(offset)), vld1q_f32(pb.add(offset)));
            }
            i += QF;
        }
        let mut total = vaddq_f32(vaddq_f32(sums[0], sums[1]), vaddq_f32(sums[2], sums[3]));
        while i < partial {
            total = vmlaq_f32(total, vld1q_f32(pa.add(i)), vld1q_f32(pb.add(i)));
            i += F;
        }
        vaddvq_f32(total)
    };
    for (&x, &y) in a[i..].iter().zip(&b[i..]) {
        sum += x * y;
    }
    sum
}

pub(crate) fn add_multiplied(src: &[f32], value: f32, dst: &mut [f32]) {
    // SAFETY: NEON is always available on aarch64; `update` bounds every load.
    unsafe {
        let k = vdupq_n_f32(value);
        update(src, dst, |s, d| vmlaq_f32(d, s, k), |s, d| d + s * value);
    }
}

pub(crate) fn add_vector(src: &[f32], dst: &mut [f32]) {
    // SAFETY: NEON is always available on aarch64.
    update(src, dst, |s, d| unsafe { vaddq_f32(d, s) }, |s, d| d + s);
}

pub(crate) fn add_value(value: f32, dst: &mut [f32]) {
    let body = align_lo(dst.len(), F);
    let d = dst.as_mut_ptr();
    // SAFETY: `i + F <= body <= len`.
    // Reason: NEON intrinsics on raw slice pointers for throughput.
    unsafe {
        let k = vdupq_n_f32(value);
        let mut i = 0;
        while i < body {
            vst1q_f32(d.add(i), vaddq_f32(vld1q_f32(d.add(i)), k));
            i += F;
        }
    }
    for d in &mut dst[body..] {
        *d += value;
    }
}

pub(crate) fn rough_sigmoid(src: &[f32], slope: f32, dst: &mut [f32]) {
    // SAFETY: NEON is always available on aarch64; `map` bounds every load.
    unsafe {
        let k = vdupq_n_f32(slope);
        let one = vdupq_n_f32(1.0);
        let (a, b) = (vdupq_n_f32(0.5417), vdupq_n_f32(0.1460));
        let vector = |s| {
            let value = vmulq_f32(s, k);
            let x = vabsq_f32(value);
            let x2 = vmulq_f32(x, x);
            let x4 = vmulq_f32(x2, x2);
            let series = vaddq_f32(vaddq_f32(one, x), vmlaq_f32(vmulq_f32(x4, b), x2, a));
            let positive = vcgtq_f32(value, vdupq_n_f32(0.0));
            let exp = vbslq_f32(positive, reciprocal(series), series);
            reciprocal(vaddq_f32(one, exp))
        };
        map(src, dst, vector, |s| scalar::rough_sigmoid(s * slope));
    }
}

pub(crate) fn rough_sigmoid2(src: &[f32], slope: f32, dst: &mut [f32]) {
    // SAFETY: NEON is always available on aarch64; `map` bounds every load.
    unsafe {
        let k = vdupq_n_f32(slope * 0.007_812_5);
        let one = vdupq_n_f32(1.0);
        let half = vdupq_n_f32(0.5);
        let vector = |s| {
            let mut e = vmaxq_f32(half, vmlsq_f32(one, s, k));
            for _ in 0..7 {
                e = vmulq_f32(e, e);
            }
            reciprocal(vaddq_f32(one, e))
        };
        map(src, dst, vector, |s| scalar::rough_sigmoid2(s * slope));
    }
}

pub(crate) fn derivative_sigmoid(src: &[f32], slope: f32, dst: &mut [f32]) {
    // SAFETY: NEON is always available on aarch64; `update` bounds every load.
    unsafe {
        let k = vdupq_n_f32(slope);
        let one = vdupq_n_f32(1.0);
        let vector = |s, d| vmulq_f32(vmulq_f32(d, k), vmulq_f32(vsubq_f32(one, s), s));
        update(src, dst, vector, |s, d| d * slope * scalar::derivative_sigmoid(s));
    }
}

pub(crate) fn rough_tanh(src: &[f32], slope: f32, dst: &mut [f32]) {
    // SAFETY: NEON is always available on aarch64; `map` bounds every load.
    unsafe {
        let k = vdupq_n_f32(slope);
        let one = vdupq_n_f32(1.0);
        let (a, b) = (vdupq_n_f32(0.5658), vdupq_n_f32(0.1430));
        let vector = |s| {
            let value = vmulq_f32(s, k);
            let x = vabsq_f32(value);
            let x2 = vmulq_f32(x, x);
            let x4 = vmulq_f32(x2, x2);
            let pe = vaddq_f32(vaddq_f32(one, x), vmlaq_f32(vmulq_f32(x4, b), x2, a));
            let ne = reciprocal(pe);
            let magnitude = vmulq_f32(vsubq_f32(pe, ne), reciprocal(vaddq_f32(pe, ne)));
            let negative = vcltq_f32(value, vdupq_n_f32(0.0));
            vbslq_f32(negative, vnegq_f32(magnitude), magnitude)
        };
        map(src, dst, vector, |s| scalar::rough_tanh(s * slope));
    }
}

pub(crate) fn derivative_tanh(src: &[f32], slope: f32, dst: &mut [f32]) {
    // SAFETY: NEON is always available on aarch64; `update` bounds every load.
    unsafe {
        let k = vdupq_n_f32(slope);
        let one = vdupq_n_f32(1.0);
        let vector = |s, d| vmulq_f32(vmulq_f32(d, k), vmlsq_f32(one, s, s));
        update(src, dst, vector, |s, d| d * slope * scalar::derivative_tanh(s));
    }
}

pub(crate) fn relu(src: &[f32], slope: f32, dst: &mut [f32]) {
    // SAFETY: NEON is always available on aarch64; `map` bounds every load.
    unsafe {
        let k = vdupq_n_f32(slope);
        if slope == 0.0 {
            map(src, dst, |s| vmaxq_f32(vdupq_n_f32(0.0), s), |s| s.max(0.0));
        } else {
            map(src, dst, |s| vmaxq_f32(vmulq_f32(k, s), s), |s| (s * slope).max(s));
        }
    }
}

pub(crate) fn derivative_relu(src: &[f32], slope: f32, dst: &mut [f32]) {
    // SAFETY: NEON is always available on aarch64; `update` bounds every load.
    unsafe {
        let k = vdupq_n_f32(slope);
        let one = vdupq_n_f32(1.0);
        let vector = |s, d| vmulq_f32(vbslq_f32(vcgtq_f32(s, vdupq_n_f32(0.0)), one, k), d);
        update(src, dst, vector, |s, d| d * if s > 0.0 { 1.0 } else { slope });
    }
}

pub(crate) fn update_weights(x: &[f32], a: f32, b: f32, d: &mut [f32], w: &mut [f32]) {
    let body = align_lo(x.len(), F);
    let (px, pd, pw) = (x.as_ptr(), d.as_mut_ptr(), w.as_mut_ptr());
    // SAFETY: `i + F <= body <= len` for all three slices.
    // Reason: NEON intrinsics on raw slice pointers for throughput.
    unsafe {
        let (ka, kb) = (vdupq_n_f32(a), vdupq_n_f32(b));
        let mut i = 0;
        while i < body {
            let step = vmlaq_f32(vmulq_f32(kb, vld1q_f32(px.add(i))), ka, vld1q_f32(pd.add(i)));
            vst1q_f32(pd.add(i), step);
            vst1q_f32(pw.add(i), vaddq_f32(vld1q_f32(pw.add(i)), step));
            i += F;
        }
    }
    scalar::neural_update_weights(&x[body..], a, b, &mut d[body..], &mut w[body..]);
}

#[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation)] // 1/batch rounded to f32
pub(crate) fn adaptive_gradient_update(
    delta: &[f32],
    batch: usize,
    alpha: f32,
    epsilon: f32,
    gradient: &mut [f32],
    weight: &mut [f32],
) {
    let body = align_lo(delta.len(), F);
    let (pd, pg, pw) = (delta.as_ptr(), gradient.as_mut_ptr(), weight.as_mut_ptr());
    // SAFETY: `i + F <= body <= len` for all three slices.
    // Reason: NEON intrinsics on raw slice pointers for throughput.
    unsafe {
        let norm = vdupq_n_f32((1.0 / batch as f64) as f32);
        let (ka, ke) = (vdupq_n_f32(alpha), vdupq_n_f32(epsilon));
        let mut i = 0;
        while i < body {
            let d = vmulq_f32(vld1q_f32(pd.add(i)), norm);
            let g = vmlaq_f32(vld1q_f32(pg.add(i)), d, d);
            vst1q_f32(pg.add(i), g);
            let step = vmulq_f32(vmulq_f32(ka, d), reciprocal_sqrt(vaddq_f32(g, ke)));
            vst1q_f32(pw.add(i), vsubq_f32(vld1q_f32(pw.add(i)), step));
            i += F;
        }
    }
    scalar::neural_adaptive_gradient_update(
        &delta[body..],
        batch,
        alpha,
        epsilon,
        &mut gradient[body..],
        &mut weight[body..],
    );
}

pub(crate) fn convert(src: &Raster<'_, u8>, dst: &mut RasterMut<'_, f32>, inversion: bool) {
    const STEP: usize = 4 * F;
    let width = src.width();
    let body = align_lo(width, STEP);
    for y in 0..src.height() {
        let s = src.row(y).as_ptr();
        let row = dst.row_mut(y);
        let d = row.as_mut_ptr();
        // SAFETY: Each step reads 16 bytes and writes 16 floats at
        // `col + STEP <= body <= width`.
        // Reason: NEON intrinsics on raw row pointers for throughput.
        unsafe {
            let k = vdupq_n_f32(255.0);
            let mut col = 0;
            while col < body {
                let mut bytes = vld1q_u8(s.add(col));
                if inversion {
                    bytes = vmvnq_u8(bytes);
                }
                let words = [vmovl_u8(vget_low_u8(bytes)), vmovl_u8(vget_high_u8(bytes))];
                for (half, &word) in words.iter().enumerate() {
                    let lo = vcvtq_f32_u32(vmovl_u16(vget_low_u16(word)));
                    let hi = vcvtq_f32_u32(vmovl_u16(vget_high_u16(word)));
                    let out = d.add(col + half * 2 * F);
                    vst1q_f32(out, vdivq_f32(lo, k));
                    vst1q_f32(out.add(F), vdivq_f32(hi, k));
                }
                col += STEP;
            }
        }
        for (d, &v) in row[body..].iter_mut().zip(&src.row(y)[body..]) {
            let v = if inversion { 255 - v } else { v };
            *d = f32::from(v) / 255.0;
        }
    }
}

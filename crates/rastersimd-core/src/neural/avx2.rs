//! AVX2 neural kernels (eight f32 lanes per vector).

// SAFETY: byte pointers are reinterpreted as vector pointers for loads; the
// aligned form is used only when the selector proved 32-byte alignment.
#![allow(clippy::cast_ptr_alignment)]

use std::arch::x86_64::*;

use super::scalar;
use crate::memory::{align_lo, is_aligned_ptr};
use crate::simd::x86_avx2::{extract_sum_ps, load_ps, store_ps, A, F};
use crate::view::{Raster, RasterMut};

const QF: usize = 4 * F;

const LOG2_POLY: [f32; 6] = [3.115_79, -3.324_199, 2.598_845_2, -1.231_530_3, 0.318_213_37, -0.034_436_006];
const EXP2_POLY: [f32; 6] = [0.999_999_94, 0.693_153_1, 0.240_153_61, 0.055_826_318, 0.008_989_34, 0.001_877_576_7];

#[inline(always)]
fn aligned(p: *const f32) -> bool {
    is_aligned_ptr(p, A)
}

#[target_feature(enable = "avx2")]
#[inline]
unsafe fn map<const ALIGN: bool>(
    src: &[f32],
    dst: &mut [f32],
    vector: impl Fn(__m256) -> __m256,
    scalar: impl Fn(f32) -> f32,
) {
    let body = align_lo(dst.len(), F);
    let (s, d) = (src.as_ptr(), dst.as_mut_ptr());
    let mut i = 0;
    while i < body {
        store_ps::<ALIGN>(d.add(i), vector(load_ps::<ALIGN>(s.add(i))));
        i += F;
    }
    for (d, &s) in dst[body..].iter_mut().zip(&src[body..]) {
        *d = scalar(s);
    }
}

#[target_feature(enable = "avx2")]
#[inline]
unsafe fn update<const ALIGN: bool>(
    src: &[f32],
    dst: &mut [f32],
    vector: impl Fn(__m256, __m256) -> __m256,
    scalar: impl Fn(f32, f32) -> f32,
) {
    let body = align_lo(dst.len(), F);
    let (s, d) = (src.as_ptr(), dst.as_mut_ptr());
    let mut i = 0;
    while i < body {
        let value = vector(load_ps::<ALIGN>(s.add(i)), load_ps::<ALIGN>(d.add(i)));
        store_ps::<ALIGN>(d.add(i), value);
        i += F;
    }
    for (d, &s) in dst[body..].iter_mut().zip(&src[body..]) {
        *d = scalar(s, *d);
    }
}

macro_rules! select_map {
    ($kernel:ident, $src:expr, $dst:expr, $vector:expr, $scalar:expr) => {
        if aligned($src.as_ptr()) && aligned($dst.as_ptr()) {
            $kernel::<true>($src, $dst, $vector, $scalar)
        } else {
            $kernel::<false>($src, $dst, $vector, $scalar)
        }
    };
}

#[target_feature(enable = "avx2")]
pub(crate) unsafe fn product_sum(a: &[f32], b: &[f32]) -> f32 {
    if aligned(a.as_ptr()) && aligned(b.as_ptr()) {
        product_sum_body::<true>(a, b)
    } else {
        product_sum_body::<false>(a, b)
    }
}

#[target_feature(enable = "avx2")]
#[inline]
unsafe fn product_sum_body<const ALIGN: bool>(a: &[f32], b: &[f32]) -> f32 {
    let size = a.len();
    let partial = align_lo(size, F);
    let full = align_lo(size, QF);
    let (pa, pb) = (a.as_ptr(), b.as_ptr());
    let mut sum = 0.0;
    let mut i = 0;
    if partial != 0 {
        let mut sums = [_mm256_setzero_ps(); 4];
        while i < full {
            for (k, acc) in sums.iter_mut().enumerate() {
                let offset = i + k * F;
                let product = _mm256_mul_ps(load_ps::<ALIGN>(pa.add(offset)), load_ps::<ALIGN>(pb.add(offset)));
                *acc = _mm256_add_ps(*acc, product);
            }
            i += QF;
        }
        let mut total = _mm256_add_ps(_mm256_add_ps(sums[0], sums[1]), _mm256_add_ps(sums[2], sums[3]));
        while i < partial {
            let product = _mm256_mul_ps(load_ps::<ALIGN>(pa.add(i)), load_ps::<ALIGN>(pb.add(i)));
            total = _mm256_add_ps(total, product);
            i += F;
        }
        sum += extract_sum_ps(total);
    }
    for (&x, &y) in a[i..].iter().zip(&b[i..]) {
        sum += x * y;
    }
    sum
}

#[target_feature(enable = "avx2")]
pub(crate) unsafe fn add_multiplied(src: &[f32], value: f32, dst: &mut [f32]) {
    let k = _mm256_set1_ps(value);
    let vector = |s: __m256, d: __m256| _mm256_add_ps(d, _mm256_mul_ps(k, s));
    let scalar = |s: f32, d: f32| d + s * value;
    select_map!(update, src, dst, vector, scalar);
}

#[target_feature(enable = "avx2")]
pub(crate) unsafe fn add_vector(src: &[f32], dst: &mut [f32]) {
    let vector = |s: __m256, d: __m256| _mm256_add_ps(d, s);
    let scalar = |s: f32, d: f32| d + s;
    select_map!(update, src, dst, vector, scalar);
}

#[target_feature(enable = "avx2")]
pub(crate) unsafe fn add_value(value: f32, dst: &mut [f32]) {
    if aligned(dst.as_ptr()) {
        add_value_body::<true>(value, dst);
    } else {
        add_value_body::<false>(value, dst);
    }
}

#[target_feature(enable = "avx2")]
#[inline]
unsafe fn add_value_body<const ALIGN: bool>(value: f32, dst: &mut [f32]) {
    let body = align_lo(dst.len(), F);
    let k = _mm256_set1_ps(value);
    let d = dst.as_mut_ptr();
    let mut i = 0;
    while i < body {
        store_ps::<ALIGN>(d.add(i), _mm256_add_ps(load_ps::<ALIGN>(d.add(i)), k));
        i += F;
    }
    for d in &mut dst[body..] {
        *d += value;
    }
}

#[target_feature(enable = "avx2")]
pub(crate) unsafe fn rough_sigmoid(src: &[f32], slope: f32, dst: &mut [f32]) {
    let k = _mm256_set1_ps(slope);
    let sign = _mm256_set1_ps(-0.0);
    let one = _mm256_set1_ps(1.0);
    let (a, b) = (_mm256_set1_ps(0.5417), _mm256_set1_ps(0.1460));
    let vector = |s: __m256| {
        let value = _mm256_mul_ps(s, k);
        let x = _mm256_andnot_ps(sign, value);
        let x2 = _mm256_mul_ps(x, x);
        let x4 = _mm256_mul_ps(x2, x2);
        let series = _mm256_add_ps(_mm256_add_ps(one, x), _mm256_add_ps(_mm256_mul_ps(x2, a), _mm256_mul_ps(x4, b)));
        let positive = _mm256_cmp_ps(value, _mm256_setzero_ps(), _CMP_GT_OQ);
        let exp = _mm256_blendv_ps(series, _mm256_rcp_ps(series), positive);
        _mm256_rcp_ps(_mm256_add_ps(one, exp))
    };
    let scalar = |s: f32| scalar::rough_sigmoid(s * slope);
    select_map!(map, src, dst, vector, scalar);
}

#[target_feature(enable = "avx2")]
pub(crate) unsafe fn rough_sigmoid2(src: &[f32], slope: f32, dst: &mut [f32]) {
    let k = _mm256_set1_ps(slope * 0.007_812_5);
    let one = _mm256_set1_ps(1.0);
    let half = _mm256_set1_ps(0.5);
    let vector = |s: __m256| {
        let mut e = _mm256_max_ps(half, _mm256_sub_ps(one, _mm256_mul_ps(s, k)));
        for _ in 0..7 {
            e = _mm256_mul_ps(e, e);
        }
        _mm256_rcp_ps(_mm256_add_ps(one, e))
    };
    let scalar = |s: f32| scalar::rough_sigmoid2(s * slope);
    select_map!(map, src, dst, vector, scalar);
}

#[target_feature(enable = "avx2")]
pub(crate) unsafe fn derivative_sigmoid(src: &[f32], slope: f32, dst: &mut [f32]) {
    let k = _mm256_set1_ps(slope);
    let one = _mm256_set1_ps(1.0);
    let vector = |s: __m256, d: __m256| _mm256_mul_ps(_mm256_mul_ps(d, k), _mm256_mul_ps(_mm256_sub_ps(one, s), s));
    let scalar = |s: f32, d: f32| d * slope * scalar::derivative_sigmoid(s);
    select_map!(update, src, dst, vector, scalar);
}

#[target_feature(enable = "avx2")]
pub(crate) unsafe fn rough_tanh(src: &[f32], slope: f32, dst: &mut [f32]) {
    let k = _mm256_set1_ps(slope);
    let sign = _mm256_set1_ps(-0.0);
    let one = _mm256_set1_ps(1.0);
    let (a, b) = (_mm256_set1_ps(0.5658), _mm256_set1_ps(0.1430));
    let vector = |s: __m256| {
        let value = _mm256_mul_ps(s, k);
        let x = _mm256_andnot_ps(sign, value);
        let x2 = _mm256_mul_ps(x, x);
        let x4 = _mm256_mul_ps(x2, x2);
        let pe = _mm256_add_ps(_mm256_add_ps(one, x), _mm256_add_ps(_mm256_mul_ps(x2, a), _mm256_mul_ps(x4, b)));
        let ne = _mm256_rcp_ps(pe);
        let magnitude = _mm256_mul_ps(_mm256_sub_ps(pe, ne), _mm256_rcp_ps(_mm256_add_ps(pe, ne)));
        let negative = _mm256_cmp_ps(_mm256_setzero_ps(), value, _CMP_GT_OQ);
        _mm256_xor_ps(magnitude, _mm256_and_ps(sign, negative))
    };
    let scalar = |s: f32| scalar::rough_tanh(s * slope);
    select_map!(map, src, dst, vector, scalar);
}

#[target_feature(enable = "avx2")]
pub(crate) unsafe fn derivative_tanh(src: &[f32], slope: f32, dst: &mut [f32]) {
    let k = _mm256_set1_ps(slope);
    let one = _mm256_set1_ps(1.0);
    let vector = |s: __m256, d: __m256| _mm256_mul_ps(_mm256_mul_ps(d, k), _mm256_sub_ps(one, _mm256_mul_ps(s, s)));
    let scalar = |s: f32, d: f32| d * slope * scalar::derivative_tanh(s);
    select_map!(update, src, dst, vector, scalar);
}

#[target_feature(enable = "avx2")]
pub(crate) unsafe fn relu(src: &[f32], slope: f32, dst: &mut [f32]) {
    let k = _mm256_set1_ps(slope);
    if slope == 0.0 {
        let vector = |s: __m256| _mm256_max_ps(_mm256_setzero_ps(), s);
        select_map!(map, src, dst, vector, |s: f32| s.max(0.0));
    } else {
        let vector = |s: __m256| _mm256_max_ps(_mm256_mul_ps(k, s), s);
        select_map!(map, src, dst, vector, |s: f32| (s * slope).max(s));
    }
}

#[target_feature(enable = "avx2")]
pub(crate) unsafe fn derivative_relu(src: &[f32], slope: f32, dst: &mut [f32]) {
    let k = _mm256_set1_ps(slope);
    let rest = _mm256_set1_ps(1.0 - slope);
    let vector = |s: __m256, d: __m256| {
        let positive = _mm256_cmp_ps(s, _mm256_setzero_ps(), _CMP_GT_OQ);
        _mm256_mul_ps(_mm256_add_ps(k, _mm256_and_ps(positive, rest)), d)
    };
    let scalar = |s: f32, d: f32| d * if s > 0.0 { 1.0 } else { slope };
    select_map!(update, src, dst, vector, scalar);
}

#[target_feature(enable = "avx2")]
#[inline]
unsafe fn poly5(x: __m256, c: &[f32; 6]) -> __m256 {
    let mut p = _mm256_set1_ps(c[5]);
    for &coefficient in c[..5].iter().rev() {
        p = _mm256_add_ps(_mm256_mul_ps(p, x), _mm256_set1_ps(coefficient));
    }
    p
}

#[target_feature(enable = "avx2")]
#[inline]
unsafe fn log2_ps(x: __m256) -> __m256 {
    let one = _mm256_set1_ps(1.0);
    let bits = _mm256_castps_si256(x);
    let exponent = _mm256_cvtepi32_ps(_mm256_sub_epi32(_mm256_srli_epi32(bits, 23), _mm256_set1_epi32(127)));
    let mantissa = _mm256_or_ps(_mm256_castsi256_ps(_mm256_and_si256(bits, _mm256_set1_epi32(0x007F_FFFF))), one);
    _mm256_add_ps(exponent, _mm256_mul_ps(poly5(mantissa, &LOG2_POLY), _mm256_sub_ps(mantissa, one)))
}

#[target_feature(enable = "avx2")]
#[inline]
unsafe fn exp2_ps(x: __m256) -> __m256 {
    let x = _mm256_max_ps(_mm256_min_ps(x, _mm256_set1_ps(128.0)), _mm256_set1_ps(-126.999_99));
    let whole = _mm256_floor_ps(x);
    let fraction = _mm256_sub_ps(x, whole);
    let scale = _mm256_slli_epi32(_mm256_add_epi32(_mm256_cvttps_epi32(whole), _mm256_set1_epi32(127)), 23);
    _mm256_mul_ps(poly5(fraction, &EXP2_POLY), _mm256_castsi256_ps(scale))
}

/// `src^exponent` for positive `src`.
#[target_feature(enable = "avx2")]
pub(crate) unsafe fn pow(src: &[f32], exponent: f32, dst: &mut [f32]) {
    let e = _mm256_set1_ps(exponent);
    let vector = |s: __m256| exp2_ps(_mm256_mul_ps(log2_ps(s), e));
    let scalar = |s: f32| scalar::pow(s, exponent);
    select_map!(map, src, dst, vector, scalar);
}

#[target_feature(enable = "avx2")]
pub(crate) unsafe fn update_weights(x: &[f32], a: f32, b: f32, d: &mut [f32], w: &mut [f32]) {
    if aligned(x.as_ptr()) && aligned(d.as_ptr()) && aligned(w.as_ptr()) {
        update_weights_body::<true>(x, a, b, d, w);
    } else {
        update_weights_body::<false>(x, a, b, d, w);
    }
}

#[target_feature(enable = "avx2")]
#[inline]
unsafe fn update_weights_body<const ALIGN: bool>(x: &[f32], a: f32, b: f32, d: &mut [f32], w: &mut [f32]) {
    let body = align_lo(x.len(), F);
    let (ka, kb) = (_mm256_set1_ps(a), _mm256_set1_ps(b));
    let (px, pd, pw) = (x.as_ptr(), d.as_mut_ptr(), w.as_mut_ptr());
    let mut i = 0;
    while i < body {
        let momentum = _mm256_mul_ps(ka, load_ps::<ALIGN>(pd.add(i)));
        let step = _mm256_add_ps(momentum, _mm256_mul_ps(kb, load_ps::<ALIGN>(px.add(i))));
        store_ps::<ALIGN>(pd.add(i), step);
        store_ps::<ALIGN>(pw.add(i), _mm256_add_ps(load_ps::<ALIGN>(pw.add(i)), step));
        i += F;
    }
    scalar::neural_update_weights(&x[body..], a, b, &mut d[body..], &mut w[body..]);
}

#[target_feature(enable = "avx2")]
pub(crate) unsafe fn adaptive_gradient_update(
    delta: &[f32],
    batch: usize,
    alpha: f32,
    epsilon: f32,
    gradient: &mut [f32],
    weight: &mut [f32],
) {
    if aligned(delta.as_ptr()) && aligned(gradient.as_ptr()) && aligned(weight.as_ptr()) {
        adaptive_gradient_update_body::<true>(delta, batch, alpha, epsilon, gradient, weight);
    } else {
        adaptive_gradient_update_body::<false>(delta, batch, alpha, epsilon, gradient, weight);
    }
}

#[target_feature(enable = "avx2")]
#[inline]
#[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation)] // 1/batch rounded to f32
unsafe fn adaptive_gradient_update_body<const ALIGN: bool>(
    delta: &[f32],
    batch: usize,
    alpha: f32,
    epsilon: f32,
    gradient: &mut [f32],
    weight: &mut [f32],
) {
    let body = align_lo(delta.len(), F);
    let norm = _mm256_set1_ps((1.0 / batch as f64) as f32);
    let (ka, ke) = (_mm256_set1_ps(alpha), _mm256_set1_ps(epsilon));
    let (pd, pg, pw) = (delta.as_ptr(), gradient.as_mut_ptr(), weight.as_mut_ptr());
    let mut i = 0;
    while i < body {
        let d = _mm256_mul_ps(load_ps::<ALIGN>(pd.add(i)), norm);
        let g = _mm256_add_ps(load_ps::<ALIGN>(pg.add(i)), _mm256_mul_ps(d, d));
        store_ps::<ALIGN>(pg.add(i), g);
        let step = _mm256_mul_ps(_mm256_mul_ps(ka, d), _mm256_rsqrt_ps(_mm256_add_ps(g, ke)));
        store_ps::<ALIGN>(pw.add(i), _mm256_sub_ps(load_ps::<ALIGN>(pw.add(i)), step));
        i += F;
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

/// Pixels converted per step: one 16-byte load widened into two f32 vectors.
const CONVERT_STEP: usize = 2 * F;

#[target_feature(enable = "avx2")]
pub(crate) unsafe fn convert(src: &Raster<'_, u8>, dst: &mut RasterMut<'_, f32>, inversion: bool) {
    match (src.is_aligned(A) && dst.is_aligned(A), inversion) {
        (true, true) => convert_body::<true, true>(src, dst),
        (true, false) => convert_body::<true, false>(src, dst),
        (false, true) => convert_body::<false, true>(src, dst),
        (false, false) => convert_body::<false, false>(src, dst),
    }
}

#[target_feature(enable = "avx2")]
#[inline]
unsafe fn convert_body<const ALIGN: bool, const INVERSION: bool>(src: &Raster<'_, u8>, dst: &mut RasterMut<'_, f32>) {
    let width = src.width();
    let body = align_lo(width, CONVERT_STEP);
    let k = _mm256_set1_ps(255.0);
    let ones = _mm_set1_epi8(-1);
    for y in 0..src.height() {
        let s = src.row(y).as_ptr();
        let row = dst.row_mut(y);
        let d = row.as_mut_ptr();
        let mut col = 0;
        while col < body {
            let mut bytes = if ALIGN {
                _mm_load_si128(s.add(col).cast())
            } else {
                _mm_loadu_si128(s.add(col).cast())
            };
            if INVERSION {
                bytes = _mm_sub_epi8(ones, bytes);
            }
            let lo = _mm256_cvtepi32_ps(_mm256_cvtepu8_epi32(bytes));
            let hi = _mm256_cvtepi32_ps(_mm256_cvtepu8_epi32(_mm_srli_si128(bytes, 8)));
            store_ps::<ALIGN>(d.add(col), _mm256_div_ps(lo, k));
            store_ps::<ALIGN>(d.add(col + F), _mm256_div_ps(hi, k));
            col += CONVERT_STEP;
        }
        let tail = &src.row(y)[body..];
        for (d, &v) in row[body..].iter_mut().zip(tail) {
            let v = if INVERSION { 255 - v } else { v };
            *d = f32::from(v) / 255.0;
        }
    }
}

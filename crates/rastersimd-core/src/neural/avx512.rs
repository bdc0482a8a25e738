//! AVX-512 neural kernels (sixteen f32 lanes per vector).
//!
//! The remainder of every vector is processed with masked loads and stores,
//! so there is no scalar tail and no minimal length.

use std::arch::x86_64::*;

use crate::memory::{align_lo, is_aligned_ptr};
use crate::simd::tail::tail_mask_16;
use crate::simd::x86_avx512::{load_masked_ps, load_ps, store_masked_ps, store_ps, A, F};

const QF: usize = 4 * F;

#[inline(always)]
fn aligned(p: *const f32) -> bool {
    is_aligned_ptr(p, A)
}

#[target_feature(enable = "avx512f")]
#[inline]
unsafe fn map<const ALIGN: bool>(src: &[f32], dst: &mut [f32], vector: impl Fn(__m512) -> __m512) {
    let size = dst.len();
    let body = align_lo(size, F);
    let (s, d) = (src.as_ptr(), dst.as_mut_ptr());
    let mut i = 0;
    while i < body {
        store_ps::<ALIGN>(d.add(i), vector(load_ps::<ALIGN>(s.add(i))));
        i += F;
    }
    if body != size {
        let tail = tail_mask_16(size - body);
        store_masked_ps(d.add(body), tail, vector(load_masked_ps(s.add(body), tail)));
    }
}

#[target_feature(enable = "avx512f")]
#[inline]
unsafe fn update<const ALIGN: bool>(src: &[f32], dst: &mut [f32], vector: impl Fn(__m512, __m512) -> __m512) {
    let size = dst.len();
    let body = align_lo(size, F);
    let (s, d) = (src.as_ptr(), dst.as_mut_ptr());
    let mut i = 0;
    while i < body {
        let value = vector(load_ps::<ALIGN>(s.add(i)), load_ps::<ALIGN>(d.add(i)));
        store_ps::<ALIGN>(d.add(i), value);
        i += F;
    }
    if body != size {
        let tail = tail_mask_16(size - body);
        let value = vector(load_masked_ps(s.add(body), tail), load_masked_ps(d.add(body), tail));
        store_masked_ps(d.add(body), tail, value);
    }
}

macro_rules! select_map {
    ($kernel:ident, $src:expr, $dst:expr, $vector:expr) => {
        if aligned($src.as_ptr()) && aligned($dst.as_ptr()) {
            $kernel::<true>($src, $dst, $vector)
        } else {
            $kernel::<false>($src, $dst, $vector)
        }
    };
}

#[target_feature(enable = "avx512f")]
pub(crate) unsafe fn product_sum(a: &[f32], b: &[f32]) -> f32 {
    if aligned(a.as_ptr()) && aligned(b.as_ptr()) {
        product_sum_body::<true>(a, b)
    } else {
        product_sum_body::<false>(a, b)
    }
}

#[target_feature(enable = "avx512f")]
#[inline]
unsafe fn product_sum_body<const ALIGN: bool>(a: &[f32], b: &[f32]) -> f32 {
    let size = a.len();
    let partial = align_lo(size, F);
    let full = align_lo(size, QF);
    let (pa, pb) = (a.as_ptr(), b.as_ptr());
    let mut sums = [_mm512_setzero_ps(); 4];
    let mut i = 0;
    while i < full {
        for (k, acc) in sums.iter_mut().enumerate() {
            let offset = i + k * F;
            *acc = _mm512_fmadd_ps(load_ps::<ALIGN>(pa.add(offset)), load_ps::<ALIGN>(pb.add(offset)), *acc);
        }
        i += QF;
    }
    let mut total = _mm512_add_ps(_mm512_add_ps(sums[0], sums[1]), _mm512_add_ps(sums[2], sums[3]));
    while i < partial {
        total = _mm512_fmadd_ps(load_ps::<ALIGN>(pa.add(i)), load_ps::<ALIGN>(pb.add(i)), total);
        i += F;
    }
    if partial != size {
        let tail = tail_mask_16(size - partial);
        total = _mm512_fmadd_ps(load_masked_ps(pa.add(partial), tail), load_masked_ps(pb.add(partial), tail), total);
    }
    _mm512_reduce_add_ps(total)
}

#[target_feature(enable = "avx512f")]
pub(crate) unsafe fn add_multiplied(src: &[f32], value: f32, dst: &mut [f32]) {
    let k = _mm512_set1_ps(value);
    select_map!(update, src, dst, |s: __m512, d: __m512| _mm512_fmadd_ps(k, s, d));
}

#[target_feature(enable = "avx512f")]
pub(crate) unsafe fn add_vector(src: &[f32], dst: &mut [f32]) {
    select_map!(update, src, dst, |s: __m512, d: __m512| _mm512_add_ps(d, s));
}

#[target_feature(enable = "avx512f")]
pub(crate) unsafe fn add_value(value: f32, dst: &mut [f32]) {
    let k = _mm512_set1_ps(value);
    let vector = |d: __m512| _mm512_add_ps(d, k);
    if aligned(dst.as_ptr()) {
        in_place::<true>(dst, vector);
    } else {
        in_place::<false>(dst, vector);
    }
}

#[target_feature(enable = "avx512f")]
#[inline]
unsafe fn in_place<const ALIGN: bool>(dst: &mut [f32], vector: impl Fn(__m512) -> __m512) {
    let size = dst.len();
    let body = align_lo(size, F);
    let d = dst.as_mut_ptr();
    let mut i = 0;
    while i < body {
        store_ps::<ALIGN>(d.add(i), vector(load_ps::<ALIGN>(d.add(i))));
        i += F;
    }
    if body != size {
        let tail = tail_mask_16(size - body);
        store_masked_ps(d.add(body), tail, vector(load_masked_ps(d.add(body), tail)));
    }
}

#[target_feature(enable = "avx512f")]
pub(crate) unsafe fn rough_sigmoid(src: &[f32], slope: f32, dst: &mut [f32]) {
    let k = _mm512_set1_ps(slope);
    let one = _mm512_set1_ps(1.0);
    let (a, b) = (_mm512_set1_ps(0.5417), _mm512_set1_ps(0.1460));
    let vector = |s: __m512| {
        let value = _mm512_mul_ps(s, k);
        let x = _mm512_abs_ps(value);
        let x2 = _mm512_mul_ps(x, x);
        let x4 = _mm512_mul_ps(x2, x2);
        let series = _mm512_add_ps(_mm512_add_ps(one, x), _mm512_fmadd_ps(x2, a, _mm512_mul_ps(x4, b)));
        let positive = _mm512_cmp_ps_mask(value, _mm512_setzero_ps(), _CMP_GT_OQ);
        let exp = _mm512_mask_blend_ps(positive, series, _mm512_rcp14_ps(series));
        _mm512_rcp14_ps(_mm512_add_ps(one, exp))
    };
    select_map!(map, src, dst, vector);
}

#[target_feature(enable = "avx512f")]
pub(crate) unsafe fn rough_sigmoid2(src: &[f32], slope: f32, dst: &mut [f32]) {
    let k = _mm512_set1_ps(slope * 0.007_812_5);
    let one = _mm512_set1_ps(1.0);
    let half = _mm512_set1_ps(0.5);
    let vector = |s: __m512| {
        let mut e = _mm512_max_ps(half, _mm512_sub_ps(one, _mm512_mul_ps(s, k)));
        for _ in 0..7 {
            e = _mm512_mul_ps(e, e);
        }
        _mm512_rcp14_ps(_mm512_add_ps(one, e))
    };
    select_map!(map, src, dst, vector);
}

#[target_feature(enable = "avx512f")]
pub(crate) unsafe fn derivative_sigmoid(src: &[f32], slope: f32, dst: &mut [f32]) {
    let k = _mm512_set1_ps(slope);
    let one = _mm512_set1_ps(1.0);
    let vector = |s: __m512, d: __m512| _mm512_mul_ps(_mm512_mul_ps(d, k), _mm512_mul_ps(_mm512_sub_ps(one, s), s));
    select_map!(update, src, dst, vector);
}

#[target_feature(enable = "avx512f")]
pub(crate) unsafe fn rough_tanh(src: &[f32], slope: f32, dst: &mut [f32]) {
    let k = _mm512_set1_ps(slope);
    let zero = _mm512_setzero_ps();
    let one = _mm512_set1_ps(1.0);
    let (a, b) = (_mm512_set1_ps(0.5658), _mm512_set1_ps(0.1430));
    let vector = |s: __m512| {
        let value = _mm512_mul_ps(s, k);
        let x = _mm512_abs_ps(value);
        let x2 = _mm512_mul_ps(x, x);
        let x4 = _mm512_mul_ps(x2, x2);
        let pe = _mm512_add_ps(_mm512_add_ps(one, x), _mm512_fmadd_ps(x2, a, _mm512_mul_ps(x4, b)));
        let ne = _mm512_rcp14_ps(pe);
        let magnitude = _mm512_mul_ps(_mm512_sub_ps(pe, ne), _mm512_rcp14_ps(_mm512_add_ps(pe, ne)));
        let negative = _mm512_cmp_ps_mask(value, zero, _CMP_LT_OQ);
        _mm512_mask_sub_ps(magnitude, negative, zero, magnitude)
    };
    select_map!(map, src, dst, vector);
}

#[target_feature(enable = "avx512f")]
pub(crate) unsafe fn derivative_tanh(src: &[f32], slope: f32, dst: &mut [f32]) {
    let k = _mm512_set1_ps(slope);
    let one = _mm512_set1_ps(1.0);
    let vector = |s: __m512, d: __m512| _mm512_mul_ps(_mm512_mul_ps(d, k), _mm512_sub_ps(one, _mm512_mul_ps(s, s)));
    select_map!(update, src, dst, vector);
}

#[target_feature(enable = "avx512f")]
pub(crate) unsafe fn relu(src: &[f32], slope: f32, dst: &mut [f32]) {
    let k = _mm512_set1_ps(slope);
    if slope == 0.0 {
        select_map!(map, src, dst, |s: __m512| _mm512_max_ps(_mm512_setzero_ps(), s));
    } else {
        select_map!(map, src, dst, |s: __m512| _mm512_max_ps(_mm512_mul_ps(k, s), s));
    }
}

#[target_feature(enable = "avx512f")]
pub(crate) unsafe fn derivative_relu(src: &[f32], slope: f32, dst: &mut [f32]) {
    let k = _mm512_set1_ps(slope);
    let one = _mm512_set1_ps(1.0);
    let vector = |s: __m512, d: __m512| {
        let positive = _mm512_cmp_ps_mask(s, _mm512_setzero_ps(), _CMP_GT_OQ);
        _mm512_mul_ps(_mm512_mask_blend_ps(positive, k, one), d)
    };
    select_map!(update, src, dst, vector);
}

#[target_feature(enable = "avx512f")]
pub(crate) unsafe fn update_weights(x: &[f32], a: f32, b: f32, d: &mut [f32], w: &mut [f32]) {
    if aligned(x.as_ptr()) && aligned(d.as_ptr()) && aligned(w.as_ptr()) {
        update_weights_body::<true>(x, a, b, d, w);
    } else {
        update_weights_body::<false>(x, a, b, d, w);
    }
}

#[target_feature(enable = "avx512f")]
#[inline]
unsafe fn update_weights_step(ka: __m512, kb: __m512, x: __m512, d: __m512, w: __m512) -> (__m512, __m512) {
    let step = _mm512_fmadd_ps(ka, d, _mm512_mul_ps(kb, x));
    (step, _mm512_add_ps(w, step))
}

#[target_feature(enable = "avx512f")]
#[inline]
unsafe fn update_weights_body<const ALIGN: bool>(x: &[f32], a: f32, b: f32, d: &mut [f32], w: &mut [f32]) {
    let size = x.len();
    let body = align_lo(size, F);
    let (ka, kb) = (_mm512_set1_ps(a), _mm512_set1_ps(b));
    let (px, pd, pw) = (x.as_ptr(), d.as_mut_ptr(), w.as_mut_ptr());
    let mut i = 0;
    while i < body {
        let (step, weight) = update_weights_step(
            ka,
            kb,
            load_ps::<ALIGN>(px.add(i)),
            load_ps::<ALIGN>(pd.add(i)),
            load_ps::<ALIGN>(pw.add(i)),
        );
        store_ps::<ALIGN>(pd.add(i), step);
        store_ps::<ALIGN>(pw.add(i), weight);
        i += F;
    }
    if body != size {
        let tail = tail_mask_16(size - body);
        let (step, weight) = update_weights_step(
            ka,
            kb,
            load_masked_ps(px.add(body), tail),
            load_masked_ps(pd.add(body), tail),
            load_masked_ps(pw.add(body), tail),
        );
        store_masked_ps(pd.add(body), tail, step);
        store_masked_ps(pw.add(body), tail, weight);
    }
}

#[target_feature(enable = "avx512f")]
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

#[target_feature(enable = "avx512f")]
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
    let size = delta.len();
    let body = align_lo(size, F);
    let norm = _mm512_set1_ps((1.0 / batch as f64) as f32);
    let (ka, ke) = (_mm512_set1_ps(alpha), _mm512_set1_ps(epsilon));
    let step = |d: __m512, g: __m512, w: __m512| {
        let d = _mm512_mul_ps(d, norm);
        let g = _mm512_fmadd_ps(d, d, g);
        let w = _mm512_sub_ps(w, _mm512_mul_ps(_mm512_mul_ps(ka, d), _mm512_rsqrt14_ps(_mm512_add_ps(g, ke))));
        (g, w)
    };
    let (pd, pg, pw) = (delta.as_ptr(), gradient.as_mut_ptr(), weight.as_mut_ptr());
    let mut i = 0;
    while i < body {
        let (g, w) = step(
            load_ps::<ALIGN>(pd.add(i)),
            load_ps::<ALIGN>(pg.add(i)),
            load_ps::<ALIGN>(pw.add(i)),
        );
        store_ps::<ALIGN>(pg.add(i), g);
        store_ps::<ALIGN>(pw.add(i), w);
        i += F;
    }
    if body != size {
        let tail = tail_mask_16(size - body);
        let (g, w) = step(
            load_masked_ps(pd.add(body), tail),
            load_masked_ps(pg.add(body), tail),
            load_masked_ps(pw.add(body), tail),
        );
        store_masked_ps(pg.add(body), tail, g);
        store_masked_ps(pw.add(body), tail, w);
    }
}

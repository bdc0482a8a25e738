//! SSE4.1 convolution row kernels.
//!
//! Source rows are read at every column offset of the core, so only the
//! output row takes part in the alignment selection.

use std::arch::x86_64::*;

use super::scalar;
use crate::memory::{align_lo, is_aligned_ptr};
use crate::simd::x86_sse41::{extract_sum_ps, load_ps, store_ps, A, F};

/// Largest supported core has 25 weights.
const MAX_WEIGHTS: usize = 25;

#[target_feature(enable = "sse4.1")]
pub(crate) unsafe fn add_correlation_row<const K: usize>(rows: &[&[f32]; K], weights: &[f32], dst: &mut [f32]) {
    // Row-pointer selector: sources always use `loadu`, so only `dst` is checked.
    if is_aligned_ptr(dst.as_ptr(), A) {
        add_correlation_row_body::<K, true>(rows, weights, dst);
    } else {
        add_correlation_row_body::<K, false>(rows, weights, dst);
    }
}

#[target_feature(enable = "sse4.1")]
#[inline]
unsafe fn add_correlation_row_body<const K: usize, const ALIGN: bool>(
    rows: &[&[f32]; K],
    weights: &[f32],
    dst: &mut [f32],
) {
    let body = align_lo(dst.len(), F);
    let mut core = [_mm_setzero_ps(); MAX_WEIGHTS];
    for (v, &weight) in core.iter_mut().zip(weights) {
        *v = _mm_set1_ps(weight);
    }
    let d = dst.as_mut_ptr();
    let mut col = 0;
    while col < body {
        let mut sum = load_ps::<ALIGN>(d.add(col));
        for (dy, row) in rows.iter().enumerate() {
            let p = row.as_ptr().add(col);
            for dx in 0..K {
                sum = _mm_add_ps(sum, _mm_mul_ps(_mm_loadu_ps(p.add(dx)), core[dy * K + dx]));
            }
        }
        store_ps::<ALIGN>(d.add(col), sum);
        col += F;
    }
    let tails: [&[f32]; K] = std::array::from_fn(|i| &rows[i][body..]);
    scalar::add_correlation_row::<K>(&tails, weights, &mut dst[body..]);
}

#[target_feature(enable = "sse4.1")]
pub(crate) unsafe fn add_correlation_row_sums<const K: usize>(rows: &[&[f32]; K], dst: &[f32], sums: &mut [f32]) {
    // Row-pointer selector: sources always use `loadu`, so only `dst` is checked.
    if is_aligned_ptr(dst.as_ptr(), A) {
        add_correlation_row_sums_body::<K, true>(rows, dst, sums);
    } else {
        add_correlation_row_sums_body::<K, false>(rows, dst, sums);
    }
}

#[target_feature(enable = "sse4.1")]
#[inline]
unsafe fn add_correlation_row_sums_body<const K: usize, const ALIGN: bool>(
    rows: &[&[f32]; K],
    dst: &[f32],
    sums: &mut [f32],
) {
    let body = align_lo(dst.len(), F);
    let mut partial = [_mm_setzero_ps(); MAX_WEIGHTS];
    let d = dst.as_ptr();
    let mut col = 0;
    while col < body {
        let gradient = load_ps::<ALIGN>(d.add(col));
        for (dy, row) in rows.iter().enumerate() {
            let p = row.as_ptr().add(col);
            for dx in 0..K {
                let i = dy * K + dx;
                partial[i] = _mm_add_ps(partial[i], _mm_mul_ps(_mm_loadu_ps(p.add(dx)), gradient));
            }
        }
        col += F;
    }
    for (sum, &vector) in sums.iter_mut().zip(&partial) {
        *sum += extract_sum_ps(vector);
    }
    let tails: [&[f32]; K] = std::array::from_fn(|i| &rows[i][body..]);
    scalar::add_correlation_row_sums::<K>(&tails, &dst[body..], sums);
}

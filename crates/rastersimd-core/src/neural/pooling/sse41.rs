//! SSE4.1 max pooling row kernels.
//!
//! Windows overlap and stride by one or two floats, so every access is
//! unaligned.

use std::arch::x86_64::*;

use super::scalar;
use crate::simd::x86_sse41::F;

/// Even lanes of `a:b`.
const EVEN: i32 = 0b10_00_10_00;
/// Odd lanes of `a:b`.
const ODD: i32 = 0b11_01_11_01;

#[target_feature(enable = "sse4.1")]
pub(crate) unsafe fn max_rows(rows: &[&[f32]], out: &mut [f32]) {
    let (first, rest) = match rows.split_first() {
        Some(split) => split,
        None => return,
    };
    let o = out.as_mut_ptr();
    let mut col = 0;
    while col + F <= out.len() {
        let mut max = _mm_loadu_ps(first.as_ptr().add(col));
        for row in rest {
            max = _mm_max_ps(max, _mm_loadu_ps(row.as_ptr().add(col)));
        }
        _mm_storeu_ps(o.add(col), max);
        col += F;
    }
    scalar::max_rows(rows, out, col);
}

#[target_feature(enable = "sse4.1")]
pub(crate) unsafe fn max_neighbors(row: &[f32], out: &mut [f32]) {
    if out.is_empty() {
        return;
    }
    scalar::max_neighbors(row, &mut out[..1], 0);
    let (r, o) = (row.as_ptr(), out.as_mut_ptr());
    let mut col = 1;
    while col + F < row.len() {
        let left = _mm_loadu_ps(r.add(col - 1));
        let center = _mm_loadu_ps(r.add(col));
        let right = _mm_loadu_ps(r.add(col + 1));
        _mm_storeu_ps(o.add(col), _mm_max_ps(_mm_max_ps(left, center), right));
        col += F;
    }
    scalar::max_neighbors(row, out, col);
}

#[target_feature(enable = "sse4.1")]
pub(crate) unsafe fn max_pairs(row: &[f32], out: &mut [f32]) {
    let (r, o) = (row.as_ptr(), out.as_mut_ptr());
    let mut col = 0;
    while 2 * (col + F) <= row.len() && col + F <= out.len() {
        let lo = _mm_loadu_ps(r.add(2 * col));
        let hi = _mm_loadu_ps(r.add(2 * col + F));
        let max = _mm_max_ps(_mm_shuffle_ps::<EVEN>(lo, hi), _mm_shuffle_ps::<ODD>(lo, hi));
        _mm_storeu_ps(o.add(col), max);
        col += F;
    }
    scalar::max_pairs(row, out, col);
}

#[target_feature(enable = "sse4.1")]
pub(crate) unsafe fn max_triples(row: &[f32], out: &mut [f32]) {
    let (r, o) = (row.as_ptr(), out.as_mut_ptr());
    let mut col = 0;
    while 2 * (col + F) + 2 <= row.len() && col + F <= out.len() {
        let lo = _mm_loadu_ps(r.add(2 * col));
        let hi = _mm_loadu_ps(r.add(2 * col + F));
        let next_lo = _mm_loadu_ps(r.add(2 * col + 2));
        let next_hi = _mm_loadu_ps(r.add(2 * col + 2 + F));
        let pairs = _mm_max_ps(_mm_shuffle_ps::<EVEN>(lo, hi), _mm_shuffle_ps::<ODD>(lo, hi));
        let max = _mm_max_ps(pairs, _mm_shuffle_ps::<EVEN>(next_lo, next_hi));
        _mm_storeu_ps(o.add(col), max);
        col += F;
    }
    scalar::max_triples(row, out, col);
}

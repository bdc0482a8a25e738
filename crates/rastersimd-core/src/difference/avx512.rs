//! AVX-512 absolute difference kernels.
//!
//! Mask comparisons produce predicate registers directly, which then drive
//! zero-masked loads, so unselected pixels contribute `|0 - 0|`.

// SAFETY: `index as i8` reinterprets the mask byte for the signed broadcast.
#![allow(clippy::cast_possible_wrap)]

use std::arch::x86_64::*;

use crate::memory::align_lo;
use crate::simd::tail::tail_mask_64;
use crate::simd::x86_avx512::{extract_u64_sum, load_masked_u8, load_si512, A};
use crate::view::Raster;

/// Selector for [`abs_difference_sum_body`].
#[target_feature(enable = "avx512f,avx512bw")]
pub(crate) unsafe fn abs_difference_sum(a: &Raster<'_, u8>, b: &Raster<'_, u8>) -> u64 {
    if a.is_aligned(A) && b.is_aligned(A) {
        abs_difference_sum_body::<true>(a, b)
    } else {
        abs_difference_sum_body::<false>(a, b)
    }
}

#[target_feature(enable = "avx512f,avx512bw")]
#[inline]
unsafe fn abs_difference_sum_body<const ALIGN: bool>(a: &Raster<'_, u8>, b: &Raster<'_, u8>) -> u64 {
    let width = a.width();
    let body = align_lo(width, A);
    let tail = tail_mask_64(width - body);
    let mut sum = _mm512_setzero_si512();
    for y in 0..a.height() {
        let (row_a, row_b) = (a.row(y).as_ptr(), b.row(y).as_ptr());
        let mut col = 0;
        while col < body {
            let va = load_si512::<ALIGN, _>(row_a.add(col));
            let vb = load_si512::<ALIGN, _>(row_b.add(col));
            sum = _mm512_add_epi64(sum, _mm512_sad_epu8(va, vb));
            col += A;
        }
        if body != width {
            let va = load_masked_u8(row_a.add(body), tail);
            let vb = load_masked_u8(row_b.add(body), tail);
            sum = _mm512_add_epi64(sum, _mm512_sad_epu8(va, vb));
        }
    }
    extract_u64_sum(sum)
}

/// Selector for [`abs_difference_sum_masked_body`].
#[target_feature(enable = "avx512f,avx512bw")]
pub(crate) unsafe fn abs_difference_sum_masked(
    a: &Raster<'_, u8>,
    b: &Raster<'_, u8>,
    mask: &Raster<'_, u8>,
    index: u8,
) -> u64 {
    if a.is_aligned(A) && b.is_aligned(A) && mask.is_aligned(A) {
        abs_difference_sum_masked_body::<true>(a, b, mask, index)
    } else {
        abs_difference_sum_masked_body::<false>(a, b, mask, index)
    }
}

#[target_feature(enable = "avx512f,avx512bw")]
#[inline]
unsafe fn abs_difference_sum_masked_body<const ALIGN: bool>(
    a: &Raster<'_, u8>,
    b: &Raster<'_, u8>,
    mask: &Raster<'_, u8>,
    index: u8,
) -> u64 {
    let width = a.width();
    let body = align_lo(width, A);
    let tail = tail_mask_64(width - body);
    let index = _mm512_set1_epi8(index as i8);
    let mut sum = _mm512_setzero_si512();
    for y in 0..a.height() {
        let (row_a, row_b) = (a.row(y).as_ptr(), b.row(y).as_ptr());
        let row_mask = mask.row(y).as_ptr();
        let mut col = 0;
        while col < body {
            let select = _mm512_cmpeq_epi8_mask(load_si512::<ALIGN, _>(row_mask.add(col)), index);
            let va = load_masked_u8(row_a.add(col), select);
            let vb = load_masked_u8(row_b.add(col), select);
            sum = _mm512_add_epi64(sum, _mm512_sad_epu8(va, vb));
            col += A;
        }
        if body != width {
            let select = _mm512_cmpeq_epi8_mask(load_masked_u8(row_mask.add(body), tail), index) & tail;
            let va = load_masked_u8(row_a.add(body), select);
            let vb = load_masked_u8(row_b.add(body), select);
            sum = _mm512_add_epi64(sum, _mm512_sad_epu8(va, vb));
        }
    }
    extract_u64_sum(sum)
}

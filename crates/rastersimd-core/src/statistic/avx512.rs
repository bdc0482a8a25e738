//! AVX-512 statistics kernels (64 bytes per vector).
//!
//! The tail is a predicated load of the remaining `width - body` bytes, so
//! these kernels accept rows narrower than one vector.

use std::arch::x86_64::*;

use super::Statistic;
use crate::memory::align_lo;
use crate::simd::tail::tail_mask_64;
use crate::simd::x86_avx512::{
    correlation_u8, extract_u64_sum, horizontal_sum32, load_masked_u8, load_si512, reduce_max_u8,
    reduce_min_u8, A,
};
use crate::view::Raster;

/// Selector for [`get_statistic_body`].
#[target_feature(enable = "avx512f,avx512bw")]
pub(crate) unsafe fn get_statistic(src: &Raster<'_, u8>) -> Statistic {
    if src.is_aligned(A) {
        get_statistic_body::<true>(src)
    } else {
        get_statistic_body::<false>(src)
    }
}

#[target_feature(enable = "avx512f,avx512bw")]
#[inline]
unsafe fn get_statistic_body<const ALIGN: bool>(src: &Raster<'_, u8>) -> Statistic {
    let width = src.width();
    let body = align_lo(width, A);
    let tail = tail_mask_64(width - body);
    let zero = _mm512_setzero_si512();
    let mut min = _mm512_set1_epi8(-1);
    let mut max = zero;
    let mut sum = zero;
    for y in 0..src.height() {
        let row = src.row(y).as_ptr();
        let mut col = 0;
        while col < body {
            let value = load_si512::<ALIGN, _>(row.add(col));
            min = _mm512_min_epu8(min, value);
            max = _mm512_max_epu8(max, value);
            sum = _mm512_add_epi64(sum, _mm512_sad_epu8(value, zero));
            col += A;
        }
        if body != width {
            let value = load_masked_u8(row.add(body), tail);
            min = _mm512_mask_min_epu8(min, tail, min, value);
            max = _mm512_mask_max_epu8(max, tail, max, value);
            sum = _mm512_add_epi64(sum, _mm512_sad_epu8(value, zero));
        }
    }
    Statistic::from_parts(
        reduce_min_u8(min),
        reduce_max_u8(max),
        extract_u64_sum(sum),
        src.area(),
    )
}

/// Selector for [`value_sum_body`].
#[target_feature(enable = "avx512f,avx512bw")]
pub(crate) unsafe fn value_sum(src: &Raster<'_, u8>) -> u64 {
    if src.is_aligned(A) {
        value_sum_body::<true>(src)
    } else {
        value_sum_body::<false>(src)
    }
}

#[target_feature(enable = "avx512f,avx512bw")]
#[inline]
unsafe fn value_sum_body<const ALIGN: bool>(src: &Raster<'_, u8>) -> u64 {
    let width = src.width();
    let body = align_lo(width, A);
    let tail = tail_mask_64(width - body);
    let zero = _mm512_setzero_si512();
    let mut sum = zero;
    for y in 0..src.height() {
        let row = src.row(y).as_ptr();
        let mut col = 0;
        while col < body {
            let value = load_si512::<ALIGN, _>(row.add(col));
            sum = _mm512_add_epi64(sum, _mm512_sad_epu8(value, zero));
            col += A;
        }
        if body != width {
            let value = load_masked_u8(row.add(body), tail);
            sum = _mm512_add_epi64(sum, _mm512_sad_epu8(value, zero));
        }
    }
    extract_u64_sum(sum)
}

/// Selector for [`square_sum_body`].
#[target_feature(enable = "avx512f,avx512bw")]
pub(crate) unsafe fn square_sum(src: &Raster<'_, u8>) -> u64 {
    if src.is_aligned(A) {
        square_sum_body::<true>(src)
    } else {
        square_sum_body::<false>(src)
    }
}

#[target_feature(enable = "avx512f,avx512bw")]
#[inline]
unsafe fn square_sum_body<const ALIGN: bool>(src: &Raster<'_, u8>) -> u64 {
    let width = src.width();
    let body = align_lo(width, A);
    let tail = tail_mask_64(width - body);
    let mut total = _mm512_setzero_si512();
    for y in 0..src.height() {
        let row = src.row(y).as_ptr();
        let mut row_sum = _mm512_setzero_si512();
        let mut col = 0;
        while col < body {
            let value = load_si512::<ALIGN, _>(row.add(col));
            row_sum = _mm512_add_epi32(row_sum, correlation_u8(value, value));
            col += A;
        }
        if body != width {
            let value = load_masked_u8(row.add(body), tail);
            row_sum = _mm512_add_epi32(row_sum, correlation_u8(value, value));
        }
        total = _mm512_add_epi64(total, horizontal_sum32(row_sum));
    }
    extract_u64_sum(total)
}

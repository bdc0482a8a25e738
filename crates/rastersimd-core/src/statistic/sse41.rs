//! SSE4.1 statistics kernels (16 bytes per vector).
//!
//! Tails reload the last full vector at `width - A` and mask off the bytes
//! the body already covered; min/max need no mask since re-reading a pixel
//! cannot change them.

// SAFETY: Numeric casts in this file are intentional and safe:
// - u64 -> u32 casts: per-row sums of at most 65535 * 255 fit in u32
#![allow(clippy::cast_possible_truncation)]

use std::arch::x86_64::*;

use super::Statistic;
use crate::memory::{align_hi, align_lo};
use crate::simd::scratch::ColumnSums;
pub(crate) use crate::simd::x86_sse41::A;
use crate::simd::x86_sse41::{
    abs_difference_u8, correlation_u8, extract_u64_sum, horizontal_sum32, load_si128, reduce_max_u8, reduce_min_u8, right_not_zero_si128, square_u8, store_si128, HA,
};
use crate::view::Raster;

/// Selector for [`get_statistic_body`].
#[target_feature(enable = "sse4.1")]
pub(crate) unsafe fn get_statistic(src: &Raster<'_, u8>) -> Statistic {
    if src.is_aligned(A) {
        get_statistic_body::<true>(src)
    } else {
        get_statistic_body::<false>(src)
    }
}

#[target_feature(enable = "sse4.1")]
#[inline]
unsafe fn get_statistic_body<const ALIGN: bool>(src: &Raster<'_, u8>) -> Statistic {
    let width = src.width();
    let body = align_lo(width, A);
    let tail_mask = right_not_zero_si128(width - body);
    let zero = _mm_setzero_si128();
    let mut min = _mm_set1_epi8(-1);
    let mut max = zero;
    let mut sum = zero;
    for y in 0..src.height() {
        let row = src.row(y).as_ptr();
        let mut col = 0;
        while col < body {
            let value = load_si128::<ALIGN, _>(row.add(col));
            min = _mm_min_epu8(min, value);
            max = _mm_max_epu8(max, value);
            sum = _mm_add_epi64(sum, _mm_sad_epu8(value, zero));
            col += A;
        }
        if body != width {
            let value = load_si128::<false, _>(row.add(width - A));
            min = _mm_min_epu8(min, value);
            max = _mm_max_epu8(max, value);
            sum = _mm_add_epi64(sum, _mm_sad_epu8(_mm_and_si128(value, tail_mask), zero));
        }
    }
    Statistic::from_parts(
        reduce_min_u8(min),
        reduce_max_u8(max),
        extract_u64_sum(sum),
        src.area(),
    )
}

/// Selector for [`get_row_sums_body`].
#[target_feature(enable = "sse4.1")]
pub(crate) unsafe fn get_row_sums(src: &Raster<'_, u8>, sums: &mut [u32]) {
    if src.is_aligned(A) {
        get_row_sums_body::<true>(src, sums);
    } else {
        get_row_sums_body::<false>(src, sums);
    }
}

#[target_feature(enable = "sse4.1")]
#[inline]
unsafe fn get_row_sums_body<const ALIGN: bool>(src: &Raster<'_, u8>, sums: &mut [u32]) {
    let width = src.width();
    let body = align_lo(width, A);
    let tail_mask = right_not_zero_si128(width - body);
    let zero = _mm_setzero_si128();
    for (y, out) in sums.iter_mut().enumerate().take(src.height()) {
        let row = src.row(y).as_ptr();
        let mut sum = zero;
        let mut col = 0;
        while col < body {
            sum = _mm_add_epi64(sum, _mm_sad_epu8(load_si128::<ALIGN, _>(row.add(col)), zero));
            col += A;
        }
        if body != width {
            let value = _mm_and_si128(load_si128::<false, _>(row.add(width - A)), tail_mask);
            sum = _mm_add_epi64(sum, _mm_sad_epu8(value, zero));
        }
        *out = extract_u64_sum(sum) as u32;
    }
}

/// Adds 16 bytes to 16 u16 column accumulators.
#[inline(always)]
unsafe fn sum16<const ALIGN: bool>(value: __m128i, sums16: *mut u16) {
    let zero = _mm_setzero_si128();
    let lo = _mm_add_epi16(load_si128::<ALIGN, _>(sums16), _mm_unpacklo_epi8(value, zero));
    store_si128::<ALIGN, _>(sums16, lo);
    let hi_ptr = sums16.add(HA);
    let hi = _mm_add_epi16(load_si128::<ALIGN, _>(hi_ptr), _mm_unpackhi_epi8(value, zero));
    store_si128::<ALIGN, _>(hi_ptr, hi);
}

/// Adds 8 u16 partials to 8 u32 column accumulators.
#[inline(always)]
unsafe fn sum32(value: __m128i, sums32: *mut u32) {
    let zero = _mm_setzero_si128();
    let lo = _mm_add_epi32(load_si128::<true, _>(sums32), _mm_unpacklo_epi16(value, zero));
    store_si128::<true, _>(sums32, lo);
    let hi_ptr = sums32.add(HA / 2);
    let hi = _mm_add_epi32(load_si128::<true, _>(hi_ptr), _mm_unpackhi_epi16(value, zero));
    store_si128::<true, _>(hi_ptr, hi);
}

/// Folds the u16 partials of one 128-row step into the u32 totals.
#[inline(always)]
unsafe fn fold_step(buffer: &mut ColumnSums, width: usize) {
    let padded = align_hi(width, A);
    let sums16 = buffer.sums16.as_slice().as_ptr();
    let sums32 = buffer.sums32.as_mut_slice().as_mut_ptr();
    let mut col = 0;
    while col < padded {
        sum32(load_si128::<true, _>(sums16.add(col)), sums32.add(col));
        col += HA;
    }
}

/// Selector for [`get_col_sums_body`].
#[target_feature(enable = "sse4.1")]
pub(crate) unsafe fn get_col_sums(src: &Raster<'_, u8>, sums: &mut [u32]) {
    if src.is_aligned(A) {
        get_col_sums_body::<true>(src, sums);
    } else {
        get_col_sums_body::<false>(src, sums);
    }
}

#[target_feature(enable = "sse4.1")]
#[inline]
unsafe fn get_col_sums_body<const ALIGN: bool>(src: &Raster<'_, u8>, sums: &mut [u32]) {
    let (width, height) = (src.width(), src.height());
    let body = align_lo(width, A);
    let tail_mask = right_not_zero_si128(width - body);
    let mut buffer = ColumnSums::new(width, A);
    for start in (0..height).step_by(ColumnSums::STEP) {
        buffer.sums16.fill(0);
        let sums16 = buffer.sums16.as_mut_slice().as_mut_ptr();
        for y in start..(start + ColumnSums::STEP).min(height) {
            let row = src.row(y).as_ptr();
            let mut col = 0;
            while col < body {
                sum16::<true>(load_si128::<ALIGN, _>(row.add(col)), sums16.add(col));
                col += A;
            }
            if body != width {
                let value = _mm_and_si128(load_si128::<false, _>(row.add(width - A)), tail_mask);
                sum16::<false>(value, sums16.add(width - A));
            }
        }
        fold_step(&mut buffer, width);
    }
    sums[..width].copy_from_slice(&buffer.sums32.as_slice()[..width]);
}

/// Selector for [`get_abs_dy_row_sums_body`].
#[target_feature(enable = "sse4.1")]
pub(crate) unsafe fn get_abs_dy_row_sums(src: &Raster<'_, u8>, sums: &mut [u32]) {
    if src.is_aligned(A) {
        get_abs_dy_row_sums_body::<true>(src, sums);
    } else {
        get_abs_dy_row_sums_body::<false>(src, sums);
    }
}

#[target_feature(enable = "sse4.1")]
#[inline]
unsafe fn get_abs_dy_row_sums_body<const ALIGN: bool>(src: &Raster<'_, u8>, sums: &mut [u32]) {
    let (width, height) = (src.width(), src.height());
    let body = align_lo(width, A);
    let tail_mask = right_not_zero_si128(width - body);
    let zero = _mm_setzero_si128();
    for (y, out) in sums[..height - 1].iter_mut().enumerate() {
        let (upper, lower) = (src.row(y).as_ptr(), src.row(y + 1).as_ptr());
        let mut sum = zero;
        let mut col = 0;
        while col < body {
            let a = load_si128::<ALIGN, _>(upper.add(col));
            let b = load_si128::<ALIGN, _>(lower.add(col));
            sum = _mm_add_epi64(sum, _mm_sad_epu8(a, b));
            col += A;
        }
        if body != width {
            let a = _mm_and_si128(load_si128::<false, _>(upper.add(width - A)), tail_mask);
            let b = _mm_and_si128(load_si128::<false, _>(lower.add(width - A)), tail_mask);
            sum = _mm_add_epi64(sum, _mm_sad_epu8(a, b));
        }
        *out = extract_u64_sum(sum) as u32;
    }
    sums[height - 1] = 0;
}

/// Selector for [`get_abs_dx_col_sums_body`].
#[target_feature(enable = "sse4.1")]
pub(crate) unsafe fn get_abs_dx_col_sums(src: &Raster<'_, u8>, sums: &mut [u32]) {
    if src.is_aligned(A) {
        get_abs_dx_col_sums_body::<true>(src, sums);
    } else {
        get_abs_dx_col_sums_body::<false>(src, sums);
    }
}

/// Column sums of horizontal gradients over the first `width - 1` columns.
/// The `col + 1` loads are always unaligned.
#[target_feature(enable = "sse4.1")]
#[inline]
unsafe fn get_abs_dx_col_sums_body<const ALIGN: bool>(src: &Raster<'_, u8>, sums: &mut [u32]) {
    let (width, height) = (src.width() - 1, src.height());
    let body = align_lo(width, A);
    let tail_mask = right_not_zero_si128(width - body);
    let mut buffer = ColumnSums::new(width, A);
    for start in (0..height).step_by(ColumnSums::STEP) {
        buffer.sums16.fill(0);
        let sums16 = buffer.sums16.as_mut_slice().as_mut_ptr();
        for y in start..(start + ColumnSums::STEP).min(height) {
            let row = src.row(y).as_ptr();
            let mut col = 0;
            while col < body {
                let a = load_si128::<ALIGN, _>(row.add(col));
                let b = load_si128::<false, _>(row.add(col + 1));
                sum16::<true>(abs_difference_u8(a, b), sums16.add(col));
                col += A;
            }
            if body != width {
                let a = load_si128::<false, _>(row.add(width - A));
                let b = load_si128::<false, _>(row.add(width - A + 1));
                let value = _mm_and_si128(abs_difference_u8(a, b), tail_mask);
                sum16::<false>(value, sums16.add(width - A));
            }
        }
        fold_step(&mut buffer, width);
    }
    sums[..width].copy_from_slice(&buffer.sums32.as_slice()[..width]);
    sums[width] = 0;
}

/// Selector for [`value_sum_body`].
#[target_feature(enable = "sse4.1")]
pub(crate) unsafe fn value_sum(src: &Raster<'_, u8>) -> u64 {
    if src.is_aligned(A) {
        value_sum_body::<true>(src)
    } else {
        value_sum_body::<false>(src)
    }
}

#[target_feature(enable = "sse4.1")]
#[inline]
unsafe fn value_sum_body<const ALIGN: bool>(src: &Raster<'_, u8>) -> u64 {
    let width = src.width();
    let body = align_lo(width, A);
    let tail_mask = right_not_zero_si128(width - body);
    let zero = _mm_setzero_si128();
    let mut sum = zero;
    for y in 0..src.height() {
        let row = src.row(y).as_ptr();
        let mut col = 0;
        while col < body {
            sum = _mm_add_epi64(sum, _mm_sad_epu8(load_si128::<ALIGN, _>(row.add(col)), zero));
            col += A;
        }
        if body != width {
            let value = _mm_and_si128(load_si128::<false, _>(row.add(width - A)), tail_mask);
            sum = _mm_add_epi64(sum, _mm_sad_epu8(value, zero));
        }
    }
    extract_u64_sum(sum)
}

/// Selector for [`square_sum_body`].
#[target_feature(enable = "sse4.1")]
pub(crate) unsafe fn square_sum(src: &Raster<'_, u8>) -> u64 {
    if src.is_aligned(A) {
        square_sum_body::<true>(src)
    } else {
        square_sum_body::<false>(src)
    }
}

/// Squares accumulate per row in u32 lanes, then widen into the u64 total.
#[target_feature(enable = "sse4.1")]
#[inline]
unsafe fn square_sum_body<const ALIGN: bool>(src: &Raster<'_, u8>) -> u64 {
    let width = src.width();
    let body = align_lo(width, A);
    let tail_mask = right_not_zero_si128(width - body);
    let mut total = _mm_setzero_si128();
    for y in 0..src.height() {
        let row = src.row(y).as_ptr();
        let mut row_sum = _mm_setzero_si128();
        let mut col = 0;
        while col < body {
            row_sum = _mm_add_epi32(row_sum, square_u8(load_si128::<ALIGN, _>(row.add(col))));
            col += A;
        }
        if body != width {
            let value = _mm_and_si128(load_si128::<false, _>(row.add(width - A)), tail_mask);
            row_sum = _mm_add_epi32(row_sum, square_u8(value));
        }
        total = _mm_add_epi64(total, horizontal_sum32(row_sum));
    }
    extract_u64_sum(total)
}

/// Selector for [`value_square_sum_body`].
#[target_feature(enable = "sse4.1")]
pub(crate) unsafe fn value_square_sum(src: &Raster<'_, u8>) -> (u64, u64) {
    if src.is_aligned(A) {
        value_square_sum_body::<true>(src)
    } else {
        value_square_sum_body::<false>(src)
    }
}

#[target_feature(enable = "sse4.1")]
#[inline]
unsafe fn value_square_sum_body<const ALIGN: bool>(src: &Raster<'_, u8>) -> (u64, u64) {
    let width = src.width();
    let body = align_lo(width, A);
    let tail_mask = right_not_zero_si128(width - body);
    let zero = _mm_setzero_si128();
    let mut values = zero;
    let mut squares = zero;
    for y in 0..src.height() {
        let row = src.row(y).as_ptr();
        let mut row_square = zero;
        let mut col = 0;
        while col < body {
            let value = load_si128::<ALIGN, _>(row.add(col));
            values = _mm_add_epi64(values, _mm_sad_epu8(value, zero));
            row_square = _mm_add_epi32(row_square, square_u8(value));
            col += A;
        }
        if body != width {
            let value = _mm_and_si128(load_si128::<false, _>(row.add(width - A)), tail_mask);
            values = _mm_add_epi64(values, _mm_sad_epu8(value, zero));
            row_square = _mm_add_epi32(row_square, square_u8(value));
        }
        squares = _mm_add_epi64(squares, horizontal_sum32(row_square));
    }
    (extract_u64_sum(values), extract_u64_sum(squares))
}

/// Selector for [`correlation_sum_body`].
#[target_feature(enable = "sse4.1")]
pub(crate) unsafe fn correlation_sum(a: &Raster<'_, u8>, b: &Raster<'_, u8>) -> u64 {
    if a.is_aligned(A) && b.is_aligned(A) {
        correlation_sum_body::<true>(a, b)
    } else {
        correlation_sum_body::<false>(a, b)
    }
}

#[target_feature(enable = "sse4.1")]
#[inline]
unsafe fn correlation_sum_body<const ALIGN: bool>(a: &Raster<'_, u8>, b: &Raster<'_, u8>) -> u64 {
    let width = a.width();
    let body = align_lo(width, A);
    let tail_mask = right_not_zero_si128(width - body);
    let mut total = _mm_setzero_si128();
    for y in 0..a.height() {
        let (row_a, row_b) = (a.row(y).as_ptr(), b.row(y).as_ptr());
        let mut row_sum = _mm_setzero_si128();
        let mut col = 0;
        while col < body {
            let va = load_si128::<ALIGN, _>(row_a.add(col));
            let vb = load_si128::<ALIGN, _>(row_b.add(col));
            row_sum = _mm_add_epi32(row_sum, correlation_u8(va, vb));
            col += A;
        }
        if body != width {
            let va = _mm_and_si128(load_si128::<false, _>(row_a.add(width - A)), tail_mask);
            let vb = load_si128::<false, _>(row_b.add(width - A));
            row_sum = _mm_add_epi32(row_sum, correlation_u8(va, vb));
        }
        total = _mm_add_epi64(total, horizontal_sum32(row_sum));
    }
    extract_u64_sum(total)
}

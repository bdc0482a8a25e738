//! AVX2 statistics kernels (32 bytes per vector).

// SAFETY: Numeric casts in this file are intentional and safe:
// - u64 -> u32 casts: per-row sums of at most 65535 * 255 fit in u32
#![allow(clippy::cast_possible_truncation)]

use std::arch::x86_64::*;

use super::Statistic;
use crate::memory::align_lo;
pub(crate) use crate::simd::x86_avx2::A;
use crate::simd::x86_avx2::{
    correlation_u8, extract_u64_sum, horizontal_sum32, load_si256, reduce_max_u8, reduce_min_u8, right_not_zero_si256,
};
use crate::view::Raster;

/// Selector for [`get_statistic_body`].
#[target_feature(enable = "avx2")]
pub(crate) unsafe fn get_statistic(src: &Raster<'_, u8>) -> Statistic {
    if src.is_aligned(A) {
        get_statistic_body::<true>(src)
    } else {
        get_statistic_body::<false>(src)
    }
}

#[target_feature(enable = "avx2")]
#[inline]
unsafe fn get_statistic_body<const ALIGN: bool>(src: &Raster<'_, u8>) -> Statistic {
    let width = src.width();
    let body = align_lo(width, A);
    let tail_mask = right_not_zero_si256(width - body);
    let zero = _mm256_setzero_si256();
    let mut min = _mm256_set1_epi8(-1);
    let mut max = zero;
    let mut sum = zero;
    for y in 0..src.height() {
        let row = src.row(y).as_ptr();
        let mut col = 0;
        while col < body {
            let value = load_si256::<ALIGN, _>(row.add(col));
            min = _mm256_min_epu8(min, value);
            max = _mm256_max_epu8(max, value);
            sum = _mm256_add_epi64(sum, _mm256_sad_epu8(value, zero));
            col += A;
        }
        if body != width {
            let value = load_si256::<false, _>(row.add(width - A));
            min = _mm256_min_epu8(min, value);
            max = _mm256_max_epu8(max, value);
            let masked = _mm256_and_si256(value, tail_mask);
            sum = _mm256_add_epi64(sum, _mm256_sad_epu8(masked, zero));
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
#[target_feature(enable = "avx2")]
pub(crate) unsafe fn get_row_sums(src: &Raster<'_, u8>, sums: &mut [u32]) {
    if src.is_aligned(A) {
        get_row_sums_body::<true>(src, sums);
    } else {
        get_row_sums_body::<false>(src, sums);
    }
}

#[target_feature(enable = "avx2")]
#[inline]
unsafe fn get_row_sums_body<const ALIGN: bool>(src: &Raster<'_, u8>, sums: &mut [u32]) {
    let width = src.width();
    let body = align_lo(width, A);
    let tail_mask = right_not_zero_si256(width - body);
    let zero = _mm256_setzero_si256();
    for (y, out) in sums.iter_mut().enumerate().take(src.height()) {
        let row = src.row(y).as_ptr();
        let mut sum = zero;
        let mut col = 0;
        while col < body {
            let value = load_si256::<ALIGN, _>(row.add(col));
            sum = _mm256_add_epi64(sum, _mm256_sad_epu8(value, zero));
            col += A;
        }
        if body != width {
            let value = _mm256_and_si256(load_si256::<false, _>(row.add(width - A)), tail_mask);
            sum = _mm256_add_epi64(sum, _mm256_sad_epu8(value, zero));
        }
        *out = extract_u64_sum(sum) as u32;
    }
}

/// Selector for [`get_abs_dy_row_sums_body`].
#[target_feature(enable = "avx2")]
pub(crate) unsafe fn get_abs_dy_row_sums(src: &Raster<'_, u8>, sums: &mut [u32]) {
    if src.is_aligned(A) {
        get_abs_dy_row_sums_body::<true>(src, sums);
    } else {
        get_abs_dy_row_sums_body::<false>(src, sums);
    }
}

#[target_feature(enable = "avx2")]
#[inline]
unsafe fn get_abs_dy_row_sums_body<const ALIGN: bool>(src: &Raster<'_, u8>, sums: &mut [u32]) {
    let (width, height) = (src.width(), src.height());
    let body = align_lo(width, A);
    let tail_mask = right_not_zero_si256(width - body);
    for (y, out) in sums[..height - 1].iter_mut().enumerate() {
        let (upper, lower) = (src.row(y).as_ptr(), src.row(y + 1).as_ptr());
        let mut sum = _mm256_setzero_si256();
        let mut col = 0;
        while col < body {
            let a = load_si256::<ALIGN, _>(upper.add(col));
            let b = load_si256::<ALIGN, _>(lower.add(col));
            sum = _mm256_add_epi64(sum, _mm256_sad_epu8(a, b));
            col += A;
        }
        if body != width {
            let a = _mm256_and_si256(load_si256::<false, _>(upper.add(width - A)), tail_mask);
            let b = _mm256_and_si256(load_si256::<false, _>(lower.add(width - A)), tail_mask);
            sum = _mm256_add_epi64(sum, _mm256_sad_epu8(a, b));
        }
        *out = extract_u64_sum(sum) as u32;
    }
    sums[height - 1] = 0;
}

/// Selector for [`value_sum_body`].
#[target_feature(enable = "avx2")]
pub(crate) unsafe fn value_sum(src: &Raster<'_, u8>) -> u64 {
    if src.is_aligned(A) {
        value_sum_body::<true>(src)
    } else {
        value_sum_body::<false>(src)
    }
}

#[target_feature(enable = "avx2")]
#[inline]
unsafe fn value_sum_body<const ALIGN: bool>(src: &Raster<'_, u8>) -> u64 {
    let width = src.width();
    let body = align_lo(width, A);
    let tail_mask = right_not_zero_si256(width - body);
    let zero = _mm256_setzero_si256();
    let mut sum = zero;
    for y in 0..src.height() {
        let row = src.row(y).as_ptr();
        let mut col = 0;
        while col < body {
            let value = load_si256::<ALIGN, _>(row.add(col));
            sum = _mm256_add_epi64(sum, _mm256_sad_epu8(value, zero));
            col += A;
        }
        if body != width {
            let value = _mm256_and_si256(load_si256::<false, _>(row.add(width - A)), tail_mask);
            sum = _mm256_add_epi64(sum, _mm256_sad_epu8(value, zero));
        }
    }
    extract_u64_sum(sum)
}

/// Selector for [`square_sum_body`].
#[target_feature(enable = "avx2")]
pub(crate) unsafe fn square_sum(src: &Raster<'_, u8>) -> u64 {
    if src.is_aligned(A) {
        square_sum_body::<true>(src)
    } else {
        square_sum_body::<false>(src)
    }
}

#[target_feature(enable = "avx2")]
#[inline]
unsafe fn square_sum_body<const ALIGN: bool>(src: &Raster<'_, u8>) -> u64 {
    let width = src.width();
    let body = align_lo(width, A);
    let tail_mask = right_not_zero_si256(width - body);
    let mut total = _mm256_setzero_si256();
    for y in 0..src.height() {
        let row = src.row(y).as_ptr();
        let mut row_sum = _mm256_setzero_si256();
        let mut col = 0;
        while col < body {
            let value = load_si256::<ALIGN, _>(row.add(col));
            row_sum = _mm256_add_epi32(row_sum, correlation_u8(value, value));
            col += A;
        }
        if body != width {
            let value = _mm256_and_si256(load_si256::<false, _>(row.add(width - A)), tail_mask);
            row_sum = _mm256_add_epi32(row_sum, correlation_u8(value, value));
        }
        total = _mm256_add_epi64(total, horizontal_sum32(row_sum));
    }
    extract_u64_sum(total)
}

/// Selector for [`value_square_sum_body`].
#[target_feature(enable = "avx2")]
pub(crate) unsafe fn value_square_sum(src: &Raster<'_, u8>) -> (u64, u64) {
    if src.is_aligned(A) {
        value_square_sum_body::<true>(src)
    } else {
        value_square_sum_body::<false>(src)
    }
}

#[target_feature(enable = "avx2")]
#[inline]
unsafe fn value_square_sum_body<const ALIGN: bool>(src: &Raster<'_, u8>) -> (u64, u64) {
    let width = src.width();
    let body = align_lo(width, A);
    let tail_mask = right_not_zero_si256(width - body);
    let zero = _mm256_setzero_si256();
    let mut values = zero;
    let mut squares = zero;
    for y in 0..src.height() {
        let row = src.row(y).as_ptr();
        let mut row_square = zero;
        let mut col = 0;
        while col < body {
            let value = load_si256::<ALIGN, _>(row.add(col));
            values = _mm256_add_epi64(values, _mm256_sad_epu8(value, zero));
            row_square = _mm256_add_epi32(row_square, correlation_u8(value, value));
            col += A;
        }
        if body != width {
            let value = _mm256_and_si256(load_si256::<false, _>(row.add(width - A)), tail_mask);
            values = _mm256_add_epi64(values, _mm256_sad_epu8(value, zero));
            row_square = _mm256_add_epi32(row_square, correlation_u8(value, value));
        }
        squares = _mm256_add_epi64(squares, horizontal_sum32(row_square));
    }
    (extract_u64_sum(values), extract_u64_sum(squares))
}

/// Selector for [`correlation_sum_body`].
#[target_feature(enable = "avx2")]
pub(crate) unsafe fn correlation_sum(a: &Raster<'_, u8>, b: &Raster<'_, u8>) -> u64 {
    if a.is_aligned(A) && b.is_aligned(A) {
        correlation_sum_body::<true>(a, b)
    } else {
        correlation_sum_body::<false>(a, b)
    }
}

#[target_feature(enable = "avx2")]
#[inline]
unsafe fn correlation_sum_body<const ALIGN: bool>(a: &Raster<'_, u8>, b: &Raster<'_, u8>) -> u64 {
    let width = a.width();
    let body = align_lo(width, A);
    let tail_mask = right_not_zero_si256(width - body);
    let mut total = _mm256_setzero_si256();
    for y in 0..a.height() {
        let (row_a, row_b) = (a.row(y).as_ptr(), b.row(y).as_ptr());
        let mut row_sum = _mm256_setzero_si256();
        let mut col = 0;
        while col < body {
            let va = load_si256::<ALIGN, _>(row_a.add(col));
            let vb = load_si256::<ALIGN, _>(row_b.add(col));
            row_sum = _mm256_add_epi32(row_sum, correlation_u8(va, vb));
            col += A;
        }
        if body != width {
            let va = _mm256_and_si256(load_si256::<false, _>(row_a.add(width - A)), tail_mask);
            let vb = load_si256::<false, _>(row_b.add(width - A));
            row_sum = _mm256_add_epi32(row_sum, correlation_u8(va, vb));
        }
        total = _mm256_add_epi64(total, horizontal_sum32(row_sum));
    }
    extract_u64_sum(total)
}

//! AVX2 absolute difference kernels.

// SAFETY: `index as i8` reinterprets the mask byte for the signed broadcast.
#![allow(clippy::cast_possible_wrap)]

use std::arch::x86_64::*;

use crate::memory::align_lo;
pub(crate) use crate::simd::x86_avx2::A;
use crate::simd::x86_avx2::{extract_u64_sum, load_si256, right_not_zero_si256};
use crate::view::Raster;

/// Selector for [`abs_difference_sum_body`].
#[target_feature(enable = "avx2")]
pub(crate) unsafe fn abs_difference_sum(a: &Raster<'_, u8>, b: &Raster<'_, u8>) -> u64 {
    if a.is_aligned(A) && b.is_aligned(A) {
        abs_difference_sum_body::<true>(a, b)
    } else {
        abs_difference_sum_body::<false>(a, b)
    }
}

#[target_feature(enable = "avx2")]
#[inline]
unsafe fn abs_difference_sum_body<const ALIGN: bool>(a: &Raster<'_, u8>, b: &Raster<'_, u8>) -> u64 {
    let width = a.width();
    let body = align_lo(width, A);
    let tail_mask = right_not_zero_si256(width - body);
    let mut sum = _mm256_setzero_si256();
    for y in 0..a.height() {
        let (row_a, row_b) = (a.row(y).as_ptr(), b.row(y).as_ptr());
        let mut col = 0;
        while col < body {
            let va = load_si256::<ALIGN, _>(row_a.add(col));
            let vb = load_si256::<ALIGN, _>(row_b.add(col));
            sum = _mm256_add_epi64(sum, _mm256_sad_epu8(va, vb));
            col += A;
        }
        if body != width {
            let va = _mm256_and_si256(load_si256::<false, _>(row_a.add(width - A)), tail_mask);
            let vb = _mm256_and_si256(load_si256::<false, _>(row_b.add(width - A)), tail_mask);
            sum = _mm256_add_epi64(sum, _mm256_sad_epu8(va, vb));
        }
    }
    extract_u64_sum(sum)
}

/// Selector for [`abs_difference_sum_masked_body`].
#[target_feature(enable = "avx2")]
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

#[target_feature(enable = "avx2")]
#[inline]
unsafe fn abs_difference_sum_masked_body<const ALIGN: bool>(
    a: &Raster<'_, u8>,
    b: &Raster<'_, u8>,
    mask: &Raster<'_, u8>,
    index: u8,
) -> u64 {
    let width = a.width();
    let body = align_lo(width, A);
    let tail_mask = right_not_zero_si256(width - body);
    let index = _mm256_set1_epi8(index as i8);
    let mut sum = _mm256_setzero_si256();
    for y in 0..a.height() {
        let (row_a, row_b) = (a.row(y).as_ptr(), b.row(y).as_ptr());
        let row_mask = mask.row(y).as_ptr();
        let mut col = 0;
        while col < body {
            let select = _mm256_cmpeq_epi8(load_si256::<ALIGN, _>(row_mask.add(col)), index);
            let va = _mm256_and_si256(load_si256::<ALIGN, _>(row_a.add(col)), select);
            let vb = _mm256_and_si256(load_si256::<ALIGN, _>(row_b.add(col)), select);
            sum = _mm256_add_epi64(sum, _mm256_sad_epu8(va, vb));
            col += A;
        }
        if body != width {
            let col = width - A;
            let select = _mm256_and_si256(
                _mm256_cmpeq_epi8(load_si256::<false, _>(row_mask.add(col)), index),
                tail_mask,
            );
            let va = _mm256_and_si256(load_si256::<false, _>(row_a.add(col)), select);
            let vb = _mm256_and_si256(load_si256::<false, _>(row_b.add(col)), select);
            sum = _mm256_add_epi64(sum, _mm256_sad_epu8(va, vb));
        }
    }
    extract_u64_sum(sum)
}

/// Adds the nine shifted differences of one `current` vector.
///
/// `rows` point at column 0 of the background rows above, at and below the
/// current row; `col` is the interior column, so `rows[i] + col` is the
/// `dx = -1` neighbour.
#[target_feature(enable = "avx2")]
#[inline]
unsafe fn accumulate_3x3<const ALIGN: bool, const SELECT: bool>(
    current: __m256i,
    rows: &[*const u8; 3],
    col: usize,
    select: __m256i,
    sums: &mut [__m256i; 9],
) {
    for (dy, &row) in rows.iter().enumerate() {
        let row = row.add(col);
        let neighbours = [
            load_si256::<ALIGN, _>(row),
            load_si256::<false, _>(row.add(1)),
            load_si256::<false, _>(row.add(2)),
        ];
        for (dx, value) in neighbours.into_iter().enumerate() {
            let value = if SELECT {
                _mm256_and_si256(value, select)
            } else {
                value
            };
            let sum = &mut sums[dy * 3 + dx];
            *sum = _mm256_add_epi64(*sum, _mm256_sad_epu8(current, value));
        }
    }
}

/// Selector for [`abs_difference_sums_3x3_body`]. Only the background loads
/// can be aligned; current and mask reads start one pixel in.
#[target_feature(enable = "avx2")]
pub(crate) unsafe fn abs_difference_sums_3x3(
    current: &Raster<'_, u8>,
    background: &Raster<'_, u8>,
    mask: Option<&Raster<'_, u8>>,
    index: u8,
) -> [u64; 9] {
    match (background.is_aligned(A), mask.is_some()) {
        (true, true) => abs_difference_sums_3x3_body::<true, true>(current, background, mask, index),
        (false, true) => abs_difference_sums_3x3_body::<false, true>(current, background, mask, index),
        (true, false) => abs_difference_sums_3x3_body::<true, false>(current, background, mask, index),
        (false, false) => {
            abs_difference_sums_3x3_body::<false, false>(current, background, mask, index)
        }
    }
}

#[target_feature(enable = "avx2")]
#[inline]
unsafe fn abs_difference_sums_3x3_body<const ALIGN: bool, const MASKED: bool>(
    current: &Raster<'_, u8>,
    background: &Raster<'_, u8>,
    mask: Option<&Raster<'_, u8>>,
    index: u8,
) -> [u64; 9] {
    let width = current.width() - 2;
    let body = align_lo(width, A);
    let tail_mask = right_not_zero_si256(width - body);
    let index = _mm256_set1_epi8(index as i8);
    let all = _mm256_set1_epi8(-1);
    let mut sums = [_mm256_setzero_si256(); 9];
    for y in 1..current.height() - 1 {
        let row = current.row(y).as_ptr().add(1);
        let row_mask = mask.map_or(std::ptr::null(), |mask| mask.row(y).as_ptr().add(1));
        let rows = [
            background.row(y - 1).as_ptr(),
            background.row(y).as_ptr(),
            background.row(y + 1).as_ptr(),
        ];
        let mut col = 0;
        while col < body {
            let mut value = load_si256::<false, _>(row.add(col));
            let mut select = all;
            if MASKED {
                select = _mm256_cmpeq_epi8(load_si256::<false, _>(row_mask.add(col)), index);
                value = _mm256_and_si256(value, select);
            }
            accumulate_3x3::<ALIGN, MASKED>(value, &rows, col, select, &mut sums);
            col += A;
        }
        if body != width {
            let col = width - A;
            let mut select = tail_mask;
            if MASKED {
                let hits = _mm256_cmpeq_epi8(load_si256::<false, _>(row_mask.add(col)), index);
                select = _mm256_and_si256(select, hits);
            }
            let value = _mm256_and_si256(load_si256::<false, _>(row.add(col)), select);
            accumulate_3x3::<false, true>(value, &rows, col, select, &mut sums);
        }
    }
    let mut totals = [0u64; 9];
    for (total, sum) in totals.iter_mut().zip(sums) {
        *total = extract_u64_sum(sum);
    }
    totals
}

//! ARM NEON statistics kernels (16 bytes per vector).

// SAFETY: Numeric casts in this file are intentional and safe:
// - u64 -> u32 casts: per-row sums of at most 65535 * 255 fit in u32
#![allow(clippy::cast_possible_truncation)]

use std::arch::aarch64::*;

use super::Statistic;
use crate::memory::align_lo;
pub(crate) use crate::simd::neon::A;
use crate::simd::neon::{
    accumulate_u8, extract_u64_sum, reduce_max_u8, reduce_min_u8, right_not_zero_u8, square_u8,
};
use crate::view::Raster;

pub(crate) fn get_statistic(src: &Raster<'_, u8>) -> Statistic {
    let width = src.width();
    let body = align_lo(width, A);
    let tail_mask = right_not_zero_u8(width - body);
    // SAFETY: Every load covers `col..col + A` with `col + A <= width`, or the
    // last full vector at `width - A`; the caller guarantees `width >= A`.
    // Reason: NEON intrinsics on raw row pointers for throughput.
    unsafe {
        let mut min = vdupq_n_u8(u8::MAX);
        let mut max = vdupq_n_u8(0);
        let mut sum = vdupq_n_u64(0);
        for y in 0..src.height() {
            let row = src.row(y).as_ptr();
            let mut col = 0;
            while col < body {
                let value = vld1q_u8(row.add(col));
                min = vminq_u8(min, value);
                max = vmaxq_u8(max, value);
                sum = accumulate_u8(sum, value);
                col += A;
            }
            if body != width {
                let value = vld1q_u8(row.add(width - A));
                min = vminq_u8(min, value);
                max = vmaxq_u8(max, value);
                sum = accumulate_u8(sum, vandq_u8(value, tail_mask));
            }
        }
        Statistic::from_parts(
            reduce_min_u8(min),
            reduce_max_u8(max),
            extract_u64_sum(sum),
            src.area(),
        )
    }
}

pub(crate) fn get_row_sums(src: &Raster<'_, u8>, sums: &mut [u32]) {
    let width = src.width();
    let body = align_lo(width, A);
    let tail_mask = right_not_zero_u8(width - body);
    for (y, out) in sums.iter_mut().enumerate().take(src.height()) {
        let row = src.row(y).as_ptr();
        // SAFETY: Loads stay inside the row as in `get_statistic`.
        // Reason: NEON intrinsics on raw row pointers for throughput.
        let sum = unsafe {
            let mut sum = vdupq_n_u64(0);
            let mut col = 0;
            while col < body {
                sum = accumulate_u8(sum, vld1q_u8(row.add(col)));
                col += A;
            }
            if body != width {
                sum = accumulate_u8(sum, vandq_u8(vld1q_u8(row.add(width - A)), tail_mask));
            }
            sum
        };
        *out = extract_u64_sum(sum) as u32;
    }
}

pub(crate) fn value_sum(src: &Raster<'_, u8>) -> u64 {
    let width = src.width();
    let body = align_lo(width, A);
    let tail_mask = right_not_zero_u8(width - body);
    // SAFETY: Loads stay inside each row as in `get_statistic`.
    // Reason: NEON intrinsics on raw row pointers for throughput.
    let sum = unsafe {
        let mut sum = vdupq_n_u64(0);
        for y in 0..src.height() {
            let row = src.row(y).as_ptr();
            let mut col = 0;
            while col < body {
                sum = accumulate_u8(sum, vld1q_u8(row.add(col)));
                col += A;
            }
            if body != width {
                sum = accumulate_u8(sum, vandq_u8(vld1q_u8(row.add(width - A)), tail_mask));
            }
        }
        sum
    };
    extract_u64_sum(sum)
}

pub(crate) fn square_sum(src: &Raster<'_, u8>) -> u64 {
    let width = src.width();
    let body = align_lo(width, A);
    let tail_mask = right_not_zero_u8(width - body);
    // SAFETY: Loads stay inside each row as in `get_statistic`.
    // Reason: NEON intrinsics on raw row pointers for throughput.
    let total = unsafe {
        let mut total = vdupq_n_u64(0);
        for y in 0..src.height() {
            let row = src.row(y).as_ptr();
            let mut row_sum = vdupq_n_u32(0);
            let mut col = 0;
            while col < body {
                row_sum = vaddq_u32(row_sum, square_u8(vld1q_u8(row.add(col))));
                col += A;
            }
            if body != width {
                let value = vandq_u8(vld1q_u8(row.add(width - A)), tail_mask);
                row_sum = vaddq_u32(row_sum, square_u8(value));
            }
            total = vpadalq_u32(total, row_sum);
        }
        total
    };
    extract_u64_sum(total)
}

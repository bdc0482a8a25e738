//! ARM NEON absolute difference kernels.

use std::arch::aarch64::*;

use crate::memory::align_lo;
pub(crate) use crate::simd::neon::A;
use crate::simd::neon::{accumulate_u8, extract_u64_sum, right_not_zero_u8};
use crate::view::Raster;

pub(crate) fn abs_difference_sum(a: &Raster<'_, u8>, b: &Raster<'_, u8>) -> u64 {
    let width = a.width();
    let body = align_lo(width, A);
    let tail_mask = right_not_zero_u8(width - body);
    // SAFETY: Loads cover `col..col + A` with `col + A <= width`, or the last
    // full vector at `width - A`; the caller guarantees `width >= A`.
    // Reason: NEON intrinsics on raw row pointers for throughput.
    let sum = unsafe {
        let mut sum = vdupq_n_u64(0);
        for y in 0..a.height() {
            let (row_a, row_b) = (a.row(y).as_ptr(), b.row(y).as_ptr());
            let mut col = 0;
            while col < body {
                let diff = vabdq_u8(vld1q_u8(row_a.add(col)), vld1q_u8(row_b.add(col)));
                sum = accumulate_u8(sum, diff);
                col += A;
            }
            if body != width {
                let diff = vabdq_u8(vld1q_u8(row_a.add(width - A)), vld1q_u8(row_b.add(width - A)));
                sum = accumulate_u8(sum, vandq_u8(diff, tail_mask));
            }
        }
        sum
    };
    extract_u64_sum(sum)
}

pub(crate) fn abs_difference_sum_masked(
    a: &Raster<'_, u8>,
    b: &Raster<'_, u8>,
    mask: &Raster<'_, u8>,
    index: u8,
) -> u64 {
    let width = a.width();
    let body = align_lo(width, A);
    let tail_mask = right_not_zero_u8(width - body);
    // SAFETY: Same bounds as `abs_difference_sum`; the mask has the same size.
    // Reason: NEON intrinsics on raw row pointers for throughput.
    let sum = unsafe {
        let index = vdupq_n_u8(index);
        let mut sum = vdupq_n_u64(0);
        for y in 0..a.height() {
            let (row_a, row_b) = (a.row(y).as_ptr(), b.row(y).as_ptr());
            let row_mask = mask.row(y).as_ptr();
            let mut col = 0;
            while col < body {
                let select = vceqq_u8(vld1q_u8(row_mask.add(col)), index);
                let diff = vabdq_u8(vld1q_u8(row_a.add(col)), vld1q_u8(row_b.add(col)));
                sum = accumulate_u8(sum, vandq_u8(diff, select));
                col += A;
            }
            if body != width {
                let col = width - A;
                let select = vandq_u8(vceqq_u8(vld1q_u8(row_mask.add(col)), index), tail_mask);
                let diff = vabdq_u8(vld1q_u8(row_a.add(col)), vld1q_u8(row_b.add(col)));
                sum = accumulate_u8(sum, vandq_u8(diff, select));
            }
        }
        sum
    };
    extract_u64_sum(sum)
}

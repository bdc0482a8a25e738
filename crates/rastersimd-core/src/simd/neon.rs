//! ARM NEON helpers for aarch64.
//!
//! NEON loads and stores have no aligned form, so NEON kernels keep a single
//! code path and skip the alignment selector.

use std::arch::aarch64::*;

use super::tail;

/// Bytes per 128-bit vector.
pub(crate) const A: usize = 16;
/// 16-bit lanes per vector.
pub(crate) const HA: usize = 8;
/// f32 lanes per vector.
pub(crate) const F: usize = 4;

/// Byte mask keeping the last `count` bytes of a vector.
#[inline]
pub(crate) fn right_not_zero_u8(count: usize) -> uint8x16_t {
    // SAFETY: the mask slice is exactly 16 bytes long.
    unsafe { vld1q_u8(tail::right_not_zero(count, A).as_ptr()) }
}

#[inline]
pub(crate) fn reduce_min_u8(value: uint8x16_t) -> u8 {
    // SAFETY: NEON is always available on aarch64.
    unsafe { vminvq_u8(value) }
}

#[inline]
pub(crate) fn reduce_max_u8(value: uint8x16_t) -> u8 {
    // SAFETY: NEON is always available on aarch64.
    unsafe { vmaxvq_u8(value) }
}

/// Pairwise-widens 16 bytes into the running u64 lanes.
#[inline]
pub(crate) fn accumulate_u8(sum: uint64x2_t, value: uint8x16_t) -> uint64x2_t {
    // SAFETY: NEON is always available on aarch64.
    unsafe { vpadalq_u32(sum, vpaddlq_u16(vpaddlq_u8(value))) }
}

/// Sum of squares of 16 bytes as four u32 lanes.
#[inline]
pub(crate) fn square_u8(value: uint8x16_t) -> uint32x4_t {
    correlation_u8(value, value)
}

/// Sum of products of 16 byte pairs as four u32 lanes.
#[inline]
pub(crate) fn correlation_u8(a: uint8x16_t, b: uint8x16_t) -> uint32x4_t {
    // SAFETY: NEON is always available on aarch64.
    unsafe {
        let lo = vmull_u8(vget_low_u8(a), vget_low_u8(b));
        let hi = vmull_u8(vget_high_u8(a), vget_high_u8(b));
        vaddq_u32(vpaddlq_u16(lo), vpaddlq_u16(hi))
    }
}

#[inline]
pub(crate) fn extract_u64_sum(value: uint64x2_t) -> u64 {
    // SAFETY: NEON is always available on aarch64.
    unsafe { vaddvq_u64(value) }
}

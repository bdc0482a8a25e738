//! 128-bit x86 load/store and reduction helpers.
//!
//! Everything here only needs SSE2, which every x86_64 CPU has, so the
//! helpers are plain `#[inline(always)]` functions that inline into the
//! SSE4.1/AVX2 kernels without feature mismatches.

// SAFETY: Pointer casts in this file reinterpret element pointers as vector
// pointers for load/store intrinsics. Alignment is either guaranteed by the
// caller (ALIGN = true) or not required (unaligned intrinsic forms).
#![allow(clippy::cast_ptr_alignment)]
#![allow(clippy::cast_possible_truncation)]

use std::arch::x86_64::*;

use super::tail;

/// Bytes per 128-bit vector.
pub(crate) const A: usize = 16;
/// 16-bit lanes per vector.
pub(crate) const HA: usize = 8;
/// f32 lanes per vector.
pub(crate) const F: usize = 4;

/// Loads 16 bytes, aligned form when `ALIGN`.
#[inline(always)]
pub(crate) unsafe fn load_si128<const ALIGN: bool, T>(p: *const T) -> __m128i {
    if ALIGN {
        _mm_load_si128(p.cast())
    } else {
        _mm_loadu_si128(p.cast())
    }
}

/// Stores 16 bytes, aligned form when `ALIGN`.
#[inline(always)]
pub(crate) unsafe fn store_si128<const ALIGN: bool, T>(p: *mut T, value: __m128i) {
    if ALIGN {
        _mm_store_si128(p.cast(), value);
    } else {
        _mm_storeu_si128(p.cast(), value);
    }
}

#[inline(always)]
pub(crate) unsafe fn load_ps<const ALIGN: bool>(p: *const f32) -> __m128 {
    if ALIGN {
        _mm_load_ps(p)
    } else {
        _mm_loadu_ps(p)
    }
}

#[inline(always)]
pub(crate) unsafe fn store_ps<const ALIGN: bool>(p: *mut f32, value: __m128) {
    if ALIGN {
        _mm_store_ps(p, value);
    } else {
        _mm_storeu_ps(p, value);
    }
}

/// Byte mask keeping the last `count` bytes of a vector.
#[inline(always)]
pub(crate) unsafe fn right_not_zero_si128(count: usize) -> __m128i {
    _mm_loadu_si128(tail::right_not_zero(count, A).as_ptr().cast())
}

/// Lane mask keeping the last `count` f32 lanes of a vector.
#[inline(always)]
pub(crate) unsafe fn right_not_zero_ps(count: usize) -> __m128 {
    _mm_castsi128_ps(right_not_zero_si128(count * 4))
}

/// `|a - b|` per unsigned byte.
#[inline(always)]
pub(crate) unsafe fn abs_difference_u8(a: __m128i, b: __m128i) -> __m128i {
    _mm_or_si128(_mm_subs_epu8(a, b), _mm_subs_epu8(b, a))
}

/// Widens four u32 lanes into two u64 pair sums.
#[inline(always)]
pub(crate) unsafe fn horizontal_sum32(value: __m128i) -> __m128i {
    let zero = _mm_setzero_si128();
    _mm_add_epi64(
        _mm_unpacklo_epi32(value, zero),
        _mm_unpackhi_epi32(value, zero),
    )
}

#[inline(always)]
pub(crate) unsafe fn extract_u64_sum(value: __m128i) -> u64 {
    let mut lanes = [0u64; 2];
    _mm_storeu_si128(lanes.as_mut_ptr().cast(), value);
    lanes[0].wrapping_add(lanes[1])
}

#[inline(always)]
pub(crate) unsafe fn extract_u32_sum(value: __m128i) -> u32 {
    let mut lanes = [0u32; 4];
    _mm_storeu_si128(lanes.as_mut_ptr().cast(), value);
    lanes
        .iter()
        .fold(0u32, |acc, &lane| acc.wrapping_add(lane))
}

/// Sum of the four lanes, `(l0 + l1) + (l2 + l3)`.
#[inline(always)]
pub(crate) unsafe fn extract_sum_ps(value: __m128) -> f32 {
    let mut lanes = [0.0f32; 4];
    _mm_storeu_ps(lanes.as_mut_ptr(), value);
    (lanes[0] + lanes[1]) + (lanes[2] + lanes[3])
}

#[inline(always)]
pub(crate) unsafe fn reduce_min_u8(value: __m128i) -> u8 {
    let mut lanes = [0u8; A];
    _mm_storeu_si128(lanes.as_mut_ptr().cast(), value);
    lanes.iter().copied().min().unwrap_or(u8::MAX)
}

#[inline(always)]
pub(crate) unsafe fn reduce_max_u8(value: __m128i) -> u8 {
    let mut lanes = [0u8; A];
    _mm_storeu_si128(lanes.as_mut_ptr().cast(), value);
    lanes.iter().copied().max().unwrap_or(0)
}

/// Sum of squares of 16 bytes as four u32 lanes.
#[inline(always)]
pub(crate) unsafe fn square_u8(value: __m128i) -> __m128i {
    correlation_u8(value, value)
}

/// Sum of products of 16 byte pairs as four u32 lanes.
#[inline(always)]
pub(crate) unsafe fn correlation_u8(a: __m128i, b: __m128i) -> __m128i {
    let zero = _mm_setzero_si128();
    let lo = _mm_madd_epi16(_mm_unpacklo_epi8(a, zero), _mm_unpacklo_epi8(b, zero));
    let hi = _mm_madd_epi16(_mm_unpackhi_epi8(a, zero), _mm_unpackhi_epi8(b, zero));
    _mm_add_epi32(lo, hi)
}

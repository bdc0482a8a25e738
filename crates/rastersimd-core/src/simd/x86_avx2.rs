//! 256-bit x86 load/store and reduction helpers.
//!
//! All functions require runtime AVX2 detection before calling.

// SAFETY: Pointer casts reinterpret element pointers as vector pointers for
// load/store intrinsics; alignment is guaranteed by the caller when ALIGN.
#![allow(clippy::cast_ptr_alignment)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_possible_wrap)]

use std::arch::x86_64::*;

use super::tail;

/// Bytes per 256-bit vector.
pub(crate) const A: usize = 32;
/// 16-bit lanes per vector.
pub(crate) const HA: usize = 16;
/// f32 lanes per vector.
pub(crate) const F: usize = 8;

#[target_feature(enable = "avx2")]
#[inline]
pub(crate) unsafe fn load_si256<const ALIGN: bool, T>(p: *const T) -> __m256i {
    if ALIGN {
        _mm256_load_si256(p.cast())
    } else {
        _mm256_loadu_si256(p.cast())
    }
}

#[target_feature(enable = "avx2")]
#[inline]
pub(crate) unsafe fn store_si256<const ALIGN: bool, T>(p: *mut T, value: __m256i) {
    if ALIGN {
        _mm256_store_si256(p.cast(), value);
    } else {
        _mm256_storeu_si256(p.cast(), value);
    }
}

#[target_feature(enable = "avx2")]
#[inline]
pub(crate) unsafe fn load_ps<const ALIGN: bool>(p: *const f32) -> __m256 {
    if ALIGN {
        _mm256_load_ps(p)
    } else {
        _mm256_loadu_ps(p)
    }
}

#[target_feature(enable = "avx2")]
#[inline]
pub(crate) unsafe fn store_ps<const ALIGN: bool>(p: *mut f32, value: __m256) {
    if ALIGN {
        _mm256_store_ps(p, value);
    } else {
        _mm256_storeu_ps(p, value);
    }
}

/// Byte mask keeping the last `count` bytes of a vector.
#[target_feature(enable = "avx2")]
#[inline]
pub(crate) unsafe fn right_not_zero_si256(count: usize) -> __m256i {
    _mm256_loadu_si256(tail::right_not_zero(count, A).as_ptr().cast())
}

/// Lane mask keeping the last `count` f32 lanes of a vector.
#[target_feature(enable = "avx2")]
#[inline]
pub(crate) unsafe fn right_not_zero_ps(count: usize) -> __m256 {
    _mm256_castsi256_ps(right_not_zero_si256(count * 4))
}

/// Predicate for `_mm256_maskload_ps`/`_mm256_maskstore_ps` selecting the
/// first `count` f32 lanes.
#[target_feature(enable = "avx2")]
#[inline]
pub(crate) unsafe fn first_lanes_mask(count: usize) -> __m256i {
    _mm256_loadu_si256(tail::left_not_zero(count * 4, A).as_ptr().cast())
}

#[target_feature(enable = "avx2")]
#[inline]
pub(crate) unsafe fn abs_difference_u8(a: __m256i, b: __m256i) -> __m256i {
    _mm256_or_si256(_mm256_subs_epu8(a, b), _mm256_subs_epu8(b, a))
}

/// Widens eight u32 lanes into four u64 pair sums.
#[target_feature(enable = "avx2")]
#[inline]
pub(crate) unsafe fn horizontal_sum32(value: __m256i) -> __m256i {
    let zero = _mm256_setzero_si256();
    _mm256_add_epi64(
        _mm256_unpacklo_epi32(value, zero),
        _mm256_unpackhi_epi32(value, zero),
    )
}

#[target_feature(enable = "avx2")]
#[inline]
pub(crate) unsafe fn extract_u64_sum(value: __m256i) -> u64 {
    let mut lanes = [0u64; 4];
    _mm256_storeu_si256(lanes.as_mut_ptr().cast(), value);
    lanes
        .iter()
        .fold(0u64, |acc, &lane| acc.wrapping_add(lane))
}

#[target_feature(enable = "avx2")]
#[inline]
pub(crate) unsafe fn extract_u32_sum(value: __m256i) -> u32 {
    let mut lanes = [0u32; 8];
    _mm256_storeu_si256(lanes.as_mut_ptr().cast(), value);
    lanes
        .iter()
        .fold(0u32, |acc, &lane| acc.wrapping_add(lane))
}

#[target_feature(enable = "avx2")]
#[inline]
pub(crate) unsafe fn extract_sum_ps(value: __m256) -> f32 {
    let lo = _mm256_castps256_ps128(value);
    let hi = _mm256_extractf128_ps(value, 1);
    super::x86_sse41::extract_sum_ps(_mm_add_ps(lo, hi))
}

#[target_feature(enable = "avx2")]
#[inline]
pub(crate) unsafe fn reduce_min_u8(value: __m256i) -> u8 {
    let mut lanes = [0u8; A];
    _mm256_storeu_si256(lanes.as_mut_ptr().cast(), value);
    lanes.iter().copied().min().unwrap_or(u8::MAX)
}

#[target_feature(enable = "avx2")]
#[inline]
pub(crate) unsafe fn reduce_max_u8(value: __m256i) -> u8 {
    let mut lanes = [0u8; A];
    _mm256_storeu_si256(lanes.as_mut_ptr().cast(), value);
    lanes.iter().copied().max().unwrap_or(0)
}

/// Sum of products of 32 byte pairs as eight u32 lanes.
#[target_feature(enable = "avx2")]
#[inline]
pub(crate) unsafe fn correlation_u8(a: __m256i, b: __m256i) -> __m256i {
    let zero = _mm256_setzero_si256();
    let lo = _mm256_madd_epi16(
        _mm256_unpacklo_epi8(a, zero),
        _mm256_unpacklo_epi8(b, zero),
    );
    let hi = _mm256_madd_epi16(
        _mm256_unpackhi_epi8(a, zero),
        _mm256_unpackhi_epi8(b, zero),
    );
    _mm256_add_epi32(lo, hi)
}

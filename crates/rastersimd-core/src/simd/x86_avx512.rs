//! 512-bit x86 load/store helpers.
//!
//! AVX-512 exposes predicate registers, so tails use masked loads and stores
//! at `body` instead of the overlapping final vector the narrower ISAs use.
//!
//! All functions require runtime AVX-512F + AVX-512BW detection before calling.

// SAFETY: Pointer casts reinterpret element pointers as the pointer types the
// intrinsics take; alignment is guaranteed by the caller when ALIGN.
#![allow(clippy::cast_ptr_alignment)]

use std::arch::x86_64::*;

/// Bytes per 512-bit vector.
pub(crate) const A: usize = 64;
/// 16-bit lanes per vector.
pub(crate) const HA: usize = 32;
/// f32 lanes per vector.
pub(crate) const F: usize = 16;

#[target_feature(enable = "avx512f")]
#[inline]
pub(crate) unsafe fn load_si512<const ALIGN: bool, T>(p: *const T) -> __m512i {
    if ALIGN {
        _mm512_load_epi32(p.cast())
    } else {
        _mm512_loadu_epi32(p.cast())
    }
}

#[target_feature(enable = "avx512f")]
#[inline]
pub(crate) unsafe fn store_si512<const ALIGN: bool, T>(p: *mut T, value: __m512i) {
    if ALIGN {
        _mm512_store_epi32(p.cast(), value);
    } else {
        _mm512_storeu_epi32(p.cast(), value);
    }
}

#[target_feature(enable = "avx512f")]
#[inline]
pub(crate) unsafe fn load_ps<const ALIGN: bool>(p: *const f32) -> __m512 {
    if ALIGN {
        _mm512_load_ps(p)
    } else {
        _mm512_loadu_ps(p)
    }
}

#[target_feature(enable = "avx512f")]
#[inline]
pub(crate) unsafe fn store_ps<const ALIGN: bool>(p: *mut f32, value: __m512) {
    if ALIGN {
        _mm512_store_ps(p, value);
    } else {
        _mm512_storeu_ps(p, value);
    }
}

/// Loads the first lanes selected by `mask`, zeroing the rest. Unselected
/// bytes are never touched.
#[target_feature(enable = "avx512bw")]
#[inline]
pub(crate) unsafe fn load_masked_u8(p: *const u8, mask: __mmask64) -> __m512i {
    _mm512_maskz_loadu_epi8(mask, p.cast())
}

#[target_feature(enable = "avx512bw")]
#[inline]
pub(crate) unsafe fn load_masked_i16(p: *const i16, mask: __mmask32) -> __m512i {
    _mm512_maskz_loadu_epi16(mask, p)
}

#[target_feature(enable = "avx512bw")]
#[inline]
pub(crate) unsafe fn store_masked_i16(p: *mut i16, mask: __mmask32, value: __m512i) {
    _mm512_mask_storeu_epi16(p, mask, value);
}

#[target_feature(enable = "avx512f")]
#[inline]
pub(crate) unsafe fn load_masked_ps(p: *const f32, mask: __mmask16) -> __m512 {
    _mm512_maskz_loadu_ps(mask, p)
}

#[target_feature(enable = "avx512f")]
#[inline]
pub(crate) unsafe fn store_masked_ps(p: *mut f32, mask: __mmask16, value: __m512) {
    _mm512_mask_storeu_ps(p, mask, value);
}

#[target_feature(enable = "avx512f")]
#[inline]
#[allow(clippy::cast_sign_loss)] // lanes hold non-negative sums
pub(crate) unsafe fn extract_u64_sum(value: __m512i) -> u64 {
    _mm512_reduce_add_epi64(value) as u64
}

/// Widens sixteen u32 lanes into eight u64 pair sums.
#[target_feature(enable = "avx512f")]
#[inline]
pub(crate) unsafe fn horizontal_sum32(value: __m512i) -> __m512i {
    let zero = _mm512_setzero_si512();
    _mm512_add_epi64(
        _mm512_unpacklo_epi32(value, zero),
        _mm512_unpackhi_epi32(value, zero),
    )
}

#[target_feature(enable = "avx512f")]
#[inline]
pub(crate) unsafe fn reduce_min_u8(value: __m512i) -> u8 {
    let mut lanes = [0u8; A];
    _mm512_storeu_epi32(lanes.as_mut_ptr().cast(), value);
    lanes.iter().copied().min().unwrap_or(u8::MAX)
}

#[target_feature(enable = "avx512f")]
#[inline]
pub(crate) unsafe fn reduce_max_u8(value: __m512i) -> u8 {
    let mut lanes = [0u8; A];
    _mm512_storeu_epi32(lanes.as_mut_ptr().cast(), value);
    lanes.iter().copied().max().unwrap_or(0)
}

/// Sum of products of 64 byte pairs as sixteen u32 lanes.
#[target_feature(enable = "avx512bw")]
#[inline]
pub(crate) unsafe fn correlation_u8(a: __m512i, b: __m512i) -> __m512i {
    let zero = _mm512_setzero_si512();
    let lo = _mm512_madd_epi16(
        _mm512_unpacklo_epi8(a, zero),
        _mm512_unpacklo_epi8(b, zero),
    );
    let hi = _mm512_madd_epi16(
        _mm512_unpackhi_epi8(a, zero),
        _mm512_unpackhi_epi8(b, zero),
    );
    _mm512_add_epi32(lo, hi)
}

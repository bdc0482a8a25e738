//! Conversions between f32 and bf16 slices.
//!
//! Narrowing rounds to nearest with ties to even, matching
//! [`half::bf16::from_f32`], so the vector and scalar paths agree bit for
//! bit. Widening is exact.

use half::bf16;

use super::scalar;
use crate::simd::{simd_level, SimdLevel};

/// Rounds every element of `src` to bf16.
///
/// # Panics
///
/// Panics when `src` and `dst` differ in length.
pub fn float32_to_bfloat16(src: &[f32], dst: &mut [bf16]) {
    assert_eq!(src.len(), dst.len(), "conversion between slices of different lengths");
    match simd_level() {
        #[cfg(target_arch = "x86_64")]
        // SAFETY: The loop uses SSE2 only and stays within both slices.
        SimdLevel::Avx512 | SimdLevel::Avx2 | SimdLevel::Sse41 => unsafe { super::sse41::convert(src, dst) },
        _ => scalar::convert(src, dst),
    }
}

/// Widens every element of `src` to f32.
///
/// # Panics
///
/// Panics when `src` and `dst` differ in length.
pub fn bfloat16_to_float32(src: &[bf16], dst: &mut [f32]) {
    assert_eq!(src.len(), dst.len(), "conversion between slices of different lengths");
    match simd_level() {
        #[cfg(target_arch = "x86_64")]
        // SAFETY: The loop uses SSE2 only and stays within both slices.
        SimdLevel::Avx512 | SimdLevel::Avx2 | SimdLevel::Sse41 => unsafe { super::sse41::convert(src, dst) },
        _ => scalar::convert(src, dst),
    }
}

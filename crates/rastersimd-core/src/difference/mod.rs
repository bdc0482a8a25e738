//! Absolute difference reducers between byte rasters.
//!
//! Sums are accumulated with sum-of-absolute-differences instructions into
//! 64-bit lanes, so no intermediate width limits apply. Masked variants only
//! count pixels whose mask byte equals `index`.

use crate::simd::{simd_level, SimdLevel};
use crate::view::Raster;

pub mod scalar;

#[cfg(target_arch = "x86_64")]
mod avx2;
#[cfg(target_arch = "x86_64")]
mod avx512;
#[cfg(target_arch = "aarch64")]
mod neon;
#[cfg(target_arch = "x86_64")]
mod sse41;

/// Sum of `|a - b|` over every pixel.
///
/// # Panics
///
/// Panics when the raster sizes differ.
#[must_use]
pub fn abs_difference_sum(a: &Raster<'_, u8>, b: &Raster<'_, u8>) -> u64 {
    assert!(a.same_size(b), "difference of rasters with different sizes");
    match simd_level() {
        // SAFETY: Masked AVX-512 tails need no minimum width; narrower ISAs are
        // width-guarded. See simd/mod.rs Conditions 1-3.
        #[cfg(target_arch = "x86_64")]
        SimdLevel::Avx512 => unsafe { avx512::abs_difference_sum(a, b) },
        #[cfg(target_arch = "x86_64")]
        SimdLevel::Avx2 if a.width() >= avx2::A => unsafe { avx2::abs_difference_sum(a, b) },
        #[cfg(target_arch = "x86_64")]
        SimdLevel::Avx2 | SimdLevel::Sse41 if a.width() >= sse41::A => unsafe {
            sse41::abs_difference_sum(a, b)
        },
        #[cfg(target_arch = "aarch64")]
        SimdLevel::Neon if a.width() >= neon::A => neon::abs_difference_sum(a, b),
        _ => scalar::abs_difference_sum(a, b),
    }
}

/// Sum of `|a - b|` over pixels where `mask == index`.
///
/// # Panics
///
/// Panics when the raster sizes differ.
#[must_use]
pub fn abs_difference_sum_masked(
    a: &Raster<'_, u8>,
    b: &Raster<'_, u8>,
    mask: &Raster<'_, u8>,
    index: u8,
) -> u64 {
    assert!(
        a.same_size(b) && a.same_size(mask),
        "difference of rasters with different sizes"
    );
    match simd_level() {
        // SAFETY: Masked AVX-512 tails need no minimum width; narrower ISAs are
        // width-guarded. See simd/mod.rs Conditions 1-3.
        #[cfg(target_arch = "x86_64")]
        SimdLevel::Avx512 => unsafe { avx512::abs_difference_sum_masked(a, b, mask, index) },
        #[cfg(target_arch = "x86_64")]
        SimdLevel::Avx2 if a.width() >= avx2::A => unsafe {
            avx2::abs_difference_sum_masked(a, b, mask, index)
        },
        #[cfg(target_arch = "x86_64")]
        SimdLevel::Avx2 | SimdLevel::Sse41 if a.width() >= sse41::A => unsafe {
            sse41::abs_difference_sum_masked(a, b, mask, index)
        },
        #[cfg(target_arch = "aarch64")]
        SimdLevel::Neon if a.width() >= neon::A => {
            neon::abs_difference_sum_masked(a, b, mask, index)
        }
        _ => scalar::abs_difference_sum_masked(a, b, mask, index),
    }
}

/// Nine sums of `|current(y, x) - background(y + dy, x + dx)|` over the
/// interior `[1, height - 1) x [1, width - 1)`, indexed `(dy + 1) * 3 + (dx + 1)`.
///
/// # Panics
///
/// Panics when the sizes differ or either dimension is 2 or less.
#[must_use]
pub fn abs_difference_sums_3x3(current: &Raster<'_, u8>, background: &Raster<'_, u8>) -> [u64; 9] {
    check_3x3(current, background);
    match simd_level() {
        // SAFETY: interior width >= vector width checked by the guard. See simd/mod.rs Conditions 1-3.
        #[cfg(target_arch = "x86_64")]
        SimdLevel::Avx512 | SimdLevel::Avx2 if current.width() >= avx2::A + 2 => unsafe {
            avx2::abs_difference_sums_3x3(current, background, None, 0)
        },
        #[cfg(target_arch = "x86_64")]
        SimdLevel::Avx512 | SimdLevel::Avx2 | SimdLevel::Sse41
            if current.width() >= sse41::A + 2 =>
        unsafe { sse41::abs_difference_sums_3x3(current, background, None, 0) },
        _ => scalar::abs_difference_sums_3x3(current, background),
    }
}

/// [`abs_difference_sums_3x3`] over interior pixels where `mask == index`.
///
/// # Panics
///
/// Panics when the sizes differ or either dimension is 2 or less.
#[must_use]
pub fn abs_difference_sums_3x3_masked(
    current: &Raster<'_, u8>,
    background: &Raster<'_, u8>,
    mask: &Raster<'_, u8>,
    index: u8,
) -> [u64; 9] {
    check_3x3(current, background);
    assert!(current.same_size(mask), "mask size differs from the image");
    match simd_level() {
        // SAFETY: interior width >= vector width checked by the guard. See simd/mod.rs Conditions 1-3.
        #[cfg(target_arch = "x86_64")]
        SimdLevel::Avx512 | SimdLevel::Avx2 if current.width() >= avx2::A + 2 => unsafe {
            avx2::abs_difference_sums_3x3(current, background, Some(mask), index)
        },
        #[cfg(target_arch = "x86_64")]
        SimdLevel::Avx512 | SimdLevel::Avx2 | SimdLevel::Sse41
            if current.width() >= sse41::A + 2 =>
        unsafe { sse41::abs_difference_sums_3x3(current, background, Some(mask), index) },
        _ => scalar::abs_difference_sums_3x3_masked(current, background, mask, index),
    }
}

fn check_3x3(current: &Raster<'_, u8>, background: &Raster<'_, u8>) {
    assert!(
        current.same_size(background),
        "difference of rasters with different sizes"
    );
    assert!(
        current.width() > 2 && current.height() > 2,
        "3x3 difference sums need at least a 3x3 raster"
    );
}

#[cfg(test)]
mod difference_tests;

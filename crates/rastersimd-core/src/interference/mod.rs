//! Saturating updates of signed 16-bit interference statistics.
//!
//! Each kernel is one body generic over `INCREMENT`: incrementing clamps from
//! above with `min(s + v, saturation)`, decrementing clamps from below with
//! `max(s - v, saturation)`. Values never wrap. Masked variants leave pixels
//! whose mask byte differs from `index` untouched.

use crate::simd::{simd_level, SimdLevel};
use crate::view::{Raster, RasterMut};

pub mod scalar;

#[cfg(target_arch = "x86_64")]
mod avx2;
#[cfg(target_arch = "x86_64")]
mod avx512;
#[cfg(target_arch = "aarch64")]
mod neon;
#[cfg(target_arch = "x86_64")]
mod sse41;

/// `s = min(s + increment, saturation)` for every pixel.
pub fn interference_increment(statistic: &mut RasterMut<'_, i16>, increment: u8, saturation: i16) {
    change::<true>(statistic, increment, saturation);
}

/// `s = min(s + increment, saturation)` where `mask == index`.
///
/// # Panics
///
/// Panics when the mask size differs from the statistic size.
pub fn interference_increment_masked(
    statistic: &mut RasterMut<'_, i16>,
    increment: u8,
    saturation: i16,
    mask: &Raster<'_, u8>,
    index: u8,
) {
    change_masked::<true>(statistic, increment, saturation, mask, index);
}

/// `s = max(s - decrement, saturation)` for every pixel.
pub fn interference_decrement(statistic: &mut RasterMut<'_, i16>, decrement: u8, saturation: i16) {
    change::<false>(statistic, decrement, saturation);
}

/// `s = max(s - decrement, saturation)` where `mask == index`.
///
/// # Panics
///
/// Panics when the mask size differs from the statistic size.
pub fn interference_decrement_masked(
    statistic: &mut RasterMut<'_, i16>,
    decrement: u8,
    saturation: i16,
    mask: &Raster<'_, u8>,
    index: u8,
) {
    change_masked::<false>(statistic, decrement, saturation, mask, index);
}

fn change<const INCREMENT: bool>(statistic: &mut RasterMut<'_, i16>, value: u8, saturation: i16) {
    match simd_level() {
        // SAFETY: Masked AVX-512 tails need no minimum width; narrower ISAs are
        // width-guarded. See simd/mod.rs Conditions 1-3.
        #[cfg(target_arch = "x86_64")]
        SimdLevel::Avx512 => unsafe { avx512::change::<INCREMENT>(statistic, value, saturation) },
        #[cfg(target_arch = "x86_64")]
        SimdLevel::Avx2 if statistic.width() >= avx2::HA => unsafe {
            avx2::change::<INCREMENT>(statistic, value, saturation);
        },
        #[cfg(target_arch = "x86_64")]
        SimdLevel::Avx2 | SimdLevel::Sse41 if statistic.width() >= sse41::HA => unsafe {
            sse41::change::<INCREMENT>(statistic, value, saturation);
        },
        #[cfg(target_arch = "aarch64")]
        SimdLevel::Neon if statistic.width() >= neon::HA => {
            neon::change::<INCREMENT>(statistic, value, saturation);
        }
        _ => scalar::change::<INCREMENT>(statistic, value, saturation),
    }
}

fn change_masked<const INCREMENT: bool>(
    statistic: &mut RasterMut<'_, i16>,
    value: u8,
    saturation: i16,
    mask: &Raster<'_, u8>,
    index: u8,
) {
    assert!(
        statistic.width() == mask.width() && statistic.height() == mask.height(),
        "mask size differs from the statistic"
    );
    match simd_level() {
        // SAFETY: Masked AVX-512 tails need no minimum width; narrower ISAs are
        // width-guarded. See simd/mod.rs Conditions 1-3.
        #[cfg(target_arch = "x86_64")]
        SimdLevel::Avx512 => unsafe {
            avx512::change_masked::<INCREMENT>(statistic, value, saturation, mask, index);
        },
        #[cfg(target_arch = "x86_64")]
        SimdLevel::Avx2 if statistic.width() >= avx2::HA => unsafe {
            avx2::change_masked::<INCREMENT>(statistic, value, saturation, mask, index);
        },
        #[cfg(target_arch = "x86_64")]
        SimdLevel::Avx2 | SimdLevel::Sse41 if statistic.width() >= sse41::HA => unsafe {
            sse41::change_masked::<INCREMENT>(statistic, value, saturation, mask, index);
        },
        #[cfg(target_arch = "aarch64")]
        SimdLevel::Neon if statistic.width() >= neon::HA => {
            neon::change_masked::<INCREMENT>(statistic, value, saturation, mask, index);
        }
        _ => scalar::change_masked::<INCREMENT>(statistic, value, saturation, mask, index),
    }
}

#[cfg(test)]
mod interference_tests;

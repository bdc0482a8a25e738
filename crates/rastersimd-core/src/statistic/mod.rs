//! Row/column statistics reducers over single-channel byte rasters.
//!
//! Every public function checks its buffer contract, then dispatches on
//! [`simd_level`] to the widest kernel whose vector fits in one row. Inside
//! each ISA kernel a selector picks the aligned body only when every buffer's
//! pointer and byte stride are aligned to that ISA's vector width.
//!
//! Moment reducers only exist in [`scalar`]: their row accumulators switch
//! between 32-bit and 64-bit sums depending on how large the image is.

#![allow(clippy::doc_markdown)]

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

/// Min, max and rounded average of a byte raster.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Statistic {
    /// Smallest pixel value.
    pub min: u8,
    /// Largest pixel value.
    pub max: u8,
    /// `(sum + area/2) / area`.
    pub average: u8,
}

impl Statistic {
    #[allow(clippy::cast_possible_truncation)] // average of bytes is a byte
    pub(crate) fn from_parts(min: u8, max: u8, sum: u64, area: usize) -> Self {
        let area = area as u64;
        Self {
            min,
            max,
            average: ((sum + area / 2) / area) as u8,
        }
    }
}

/// Raw moments of a binary region.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Moments {
    /// Number of selected pixels.
    pub area: u64,
    /// Sum of x.
    pub x: u64,
    /// Sum of y.
    pub y: u64,
    /// Sum of x*x.
    pub xx: u64,
    /// Sum of x*y.
    pub xy: u64,
    /// Sum of y*y.
    pub yy: u64,
}

/// Raw moments of a region weighted by pixel values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ObjectMoments {
    /// Number of selected pixels.
    pub n: u64,
    /// Sum of weights.
    pub s: u64,
    /// Sum of weight*x.
    pub sx: u64,
    /// Sum of weight*y.
    pub sy: u64,
    /// Sum of weight*x*x.
    pub sxx: u64,
    /// Sum of weight*x*y.
    pub sxy: u64,
    /// Sum of weight*y*y.
    pub syy: u64,
}

impl ObjectMoments {
    /// Folds the x-only sums of row `y` into the totals.
    pub(crate) fn accumulate_row(&mut self, y: u64, n: u32, s: u32, sx: u64, sxx: u64) {
        let s = u64::from(s);
        self.n += u64::from(n);
        self.s += s;
        self.sx += sx;
        self.sy += s * y;
        self.sxx += sxx;
        self.sxy += sx * y;
        self.syy += s * y * y;
    }
}

// =============================================================================
// Dispatch
// =============================================================================

/// Min, max and rounded average in one pass.
///
/// # Panics
///
/// Panics when the raster is empty.
#[must_use]
pub fn get_statistic(src: &Raster<'_, u8>) -> Statistic {
    assert!(src.area() > 0, "statistic of an empty raster");
    match simd_level() {
        // SAFETY: Masked AVX-512 tails need no minimum width. See simd/mod.rs Conditions 1-3.
        #[cfg(target_arch = "x86_64")]
        SimdLevel::Avx512 => unsafe { avx512::get_statistic(src) },
        #[cfg(target_arch = "x86_64")]
        SimdLevel::Avx2 if src.width() >= avx2::A => unsafe { avx2::get_statistic(src) },
        #[cfg(target_arch = "x86_64")]
        SimdLevel::Avx2 | SimdLevel::Sse41 if src.width() >= sse41::A => unsafe {
            sse41::get_statistic(src)
        },
        #[cfg(target_arch = "aarch64")]
        SimdLevel::Neon if src.width() >= neon::A => neon::get_statistic(src),
        _ => scalar::get_statistic(src),
    }
}

/// Moments of the pixels where `mask == index`.
#[must_use]
pub fn get_moments(mask: &Raster<'_, u8>, index: u8) -> Moments {
    scalar::get_moments(mask, index)
}

/// Moments weighted by `src`, restricted to `mask == index` when a mask is given.
///
/// With only a mask the result equals the mask moments and `s == n`.
///
/// # Panics
///
/// Panics when both rasters are `None` or their sizes differ.
#[must_use]
pub fn get_object_moments(
    src: Option<&Raster<'_, u8>>,
    mask: Option<&Raster<'_, u8>>,
    index: u8,
) -> ObjectMoments {
    if let (Some(src), Some(mask)) = (src, mask) {
        assert!(src.same_size(mask), "source and mask sizes differ");
    }
    scalar::get_object_moments(src, mask, index)
}

/// Sum of each row into `sums[..height]`.
///
/// # Panics
///
/// Panics when `sums` is shorter than the raster height.
pub fn get_row_sums(src: &Raster<'_, u8>, sums: &mut [u32]) {
    assert!(sums.len() >= src.height(), "row sums buffer too short");
    match simd_level() {
        // SAFETY: width >= vector width checked by the guard. See simd/mod.rs Conditions 1-3.
        #[cfg(target_arch = "x86_64")]
        SimdLevel::Avx512 | SimdLevel::Avx2 if src.width() >= avx2::A => unsafe {
            avx2::get_row_sums(src, sums);
        },
        #[cfg(target_arch = "x86_64")]
        SimdLevel::Avx512 | SimdLevel::Avx2 | SimdLevel::Sse41 if src.width() >= sse41::A => unsafe {
            sse41::get_row_sums(src, sums);
        },
        #[cfg(target_arch = "aarch64")]
        SimdLevel::Neon if src.width() >= neon::A => neon::get_row_sums(src, sums),
        _ => scalar::get_row_sums(src, sums),
    }
}

/// Sum of each column into `sums[..width]`.
///
/// # Panics
///
/// Panics when `sums` is shorter than the raster width.
pub fn get_col_sums(src: &Raster<'_, u8>, sums: &mut [u32]) {
    assert!(sums.len() >= src.width(), "column sums buffer too short");
    match simd_level() {
        // SAFETY: width >= vector width checked by the guard. See simd/mod.rs Conditions 1-3.
        #[cfg(target_arch = "x86_64")]
        SimdLevel::Avx512 | SimdLevel::Avx2 | SimdLevel::Sse41 if src.width() >= sse41::A => unsafe {
            sse41::get_col_sums(src, sums);
        },
        _ => scalar::get_col_sums(src, sums),
    }
}

/// Per-row sums of `|src[y+1][x] - src[y][x]|`; `sums[height-1]` is zero.
///
/// # Panics
///
/// Panics when the raster is empty or `sums` is shorter than its height.
pub fn get_abs_dy_row_sums(src: &Raster<'_, u8>, sums: &mut [u32]) {
    assert!(src.area() > 0, "row sums of an empty raster");
    assert!(sums.len() >= src.height(), "row sums buffer too short");
    match simd_level() {
        // SAFETY: width >= vector width checked by the guard. See simd/mod.rs Conditions 1-3.
        #[cfg(target_arch = "x86_64")]
        SimdLevel::Avx512 | SimdLevel::Avx2 if src.width() >= avx2::A => unsafe {
            avx2::get_abs_dy_row_sums(src, sums);
        },
        #[cfg(target_arch = "x86_64")]
        SimdLevel::Avx512 | SimdLevel::Avx2 | SimdLevel::Sse41 if src.width() >= sse41::A => unsafe {
            sse41::get_abs_dy_row_sums(src, sums);
        },
        _ => scalar::get_abs_dy_row_sums(src, sums),
    }
}

/// Per-column sums of `|src[y][x+1] - src[y][x]|`; `sums[width-1]` is zero.
///
/// # Panics
///
/// Panics when the raster is empty or `sums` is shorter than its width.
pub fn get_abs_dx_col_sums(src: &Raster<'_, u8>, sums: &mut [u32]) {
    assert!(src.area() > 0, "column sums of an empty raster");
    assert!(sums.len() >= src.width(), "column sums buffer too short");
    match simd_level() {
        // SAFETY: width - 1 >= vector width checked by the guard. See simd/mod.rs Conditions 1-3.
        #[cfg(target_arch = "x86_64")]
        SimdLevel::Avx512 | SimdLevel::Avx2 | SimdLevel::Sse41 if src.width() > sse41::A => unsafe {
            sse41::get_abs_dx_col_sums(src, sums);
        },
        _ => scalar::get_abs_dx_col_sums(src, sums),
    }
}

/// Sum of all pixels.
#[must_use]
pub fn value_sum(src: &Raster<'_, u8>) -> u64 {
    match simd_level() {
        // SAFETY: Masked AVX-512 tails need no minimum width; narrower ISAs are
        // width-guarded. See simd/mod.rs Conditions 1-3.
        #[cfg(target_arch = "x86_64")]
        SimdLevel::Avx512 => unsafe { avx512::value_sum(src) },
        #[cfg(target_arch = "x86_64")]
        SimdLevel::Avx2 if src.width() >= avx2::A => unsafe { avx2::value_sum(src) },
        #[cfg(target_arch = "x86_64")]
        SimdLevel::Avx2 | SimdLevel::Sse41 if src.width() >= sse41::A => unsafe {
            sse41::value_sum(src)
        },
        #[cfg(target_arch = "aarch64")]
        SimdLevel::Neon if src.width() >= neon::A => neon::value_sum(src),
        _ => scalar::value_sum(src),
    }
}

/// Sum of squared pixels.
///
/// # Panics
///
/// Panics when the raster is 65536 or more pixels wide.
#[must_use]
pub fn square_sum(src: &Raster<'_, u8>) -> u64 {
    assert!(src.width() < 0x10000, "squared sums need width < 65536");
    match simd_level() {
        // SAFETY: Masked AVX-512 tails need no minimum width; narrower ISAs are
        // width-guarded. See simd/mod.rs Conditions 1-3.
        #[cfg(target_arch = "x86_64")]
        SimdLevel::Avx512 => unsafe { avx512::square_sum(src) },
        #[cfg(target_arch = "x86_64")]
        SimdLevel::Avx2 if src.width() >= avx2::A => unsafe { avx2::square_sum(src) },
        #[cfg(target_arch = "x86_64")]
        SimdLevel::Avx2 | SimdLevel::Sse41 if src.width() >= sse41::A => unsafe {
            sse41::square_sum(src)
        },
        #[cfg(target_arch = "aarch64")]
        SimdLevel::Neon if src.width() >= neon::A => neon::square_sum(src),
        _ => scalar::square_sum(src),
    }
}

/// `(sum, squared sum)` of all pixels in one pass.
///
/// # Panics
///
/// Panics when the raster is 65536 or more pixels wide.
#[must_use]
pub fn value_square_sum(src: &Raster<'_, u8>) -> (u64, u64) {
    assert!(src.width() < 0x10000, "squared sums need width < 65536");
    match simd_level() {
        // SAFETY: width >= vector width checked by the guard. See simd/mod.rs Conditions 1-3.
        #[cfg(target_arch = "x86_64")]
        SimdLevel::Avx512 | SimdLevel::Avx2 if src.width() >= avx2::A => unsafe {
            avx2::value_square_sum(src)
        },
        #[cfg(target_arch = "x86_64")]
        SimdLevel::Avx512 | SimdLevel::Avx2 | SimdLevel::Sse41 if src.width() >= sse41::A => unsafe {
            sse41::value_square_sum(src)
        },
        _ => scalar::value_square_sum(src),
    }
}

/// Sum of `a * b` over all pixel pairs.
///
/// # Panics
///
/// Panics when the sizes differ or the rasters are 65536 or more pixels wide.
#[must_use]
pub fn correlation_sum(a: &Raster<'_, u8>, b: &Raster<'_, u8>) -> u64 {
    assert!(a.same_size(b), "correlation of rasters with different sizes");
    assert!(a.width() < 0x10000, "squared sums need width < 65536");
    match simd_level() {
        // SAFETY: width >= vector width checked by the guard. See simd/mod.rs Conditions 1-3.
        #[cfg(target_arch = "x86_64")]
        SimdLevel::Avx512 | SimdLevel::Avx2 if a.width() >= avx2::A => unsafe {
            avx2::correlation_sum(a, b)
        },
        #[cfg(target_arch = "x86_64")]
        SimdLevel::Avx512 | SimdLevel::Avx2 | SimdLevel::Sse41 if a.width() >= sse41::A => unsafe {
            sse41::correlation_sum(a, b)
        },
        _ => scalar::correlation_sum(a, b),
    }
}

//! Small square 2D convolutions accumulated into float rasters.
//!
//! For a `k x k` core and an output of `w x h`:
//!
//! - forward reads a `(w + k - 1) x (h + k - 1)` source and adds the
//!   correlation with the weights to every output pixel;
//! - backward scatters a `w x h` source through the weights into a
//!   `(w + k - 1) x (h + k - 1)` destination;
//! - sum accumulates the `k * k` weight gradients from a forward source and
//!   the output gradient.
//!
//! Backward picks between two equivalent strategies by image area, see
//! [`ConvolutionConfig`](crate::config::ConvolutionConfig).

use smallvec::SmallVec;

use crate::config;
use crate::simd::{simd_level, RowWindow, SimdLevel};
use crate::view::{Raster, RasterMut};

pub mod scalar;

#[cfg(target_arch = "x86_64")]
mod avx2;
#[cfg(target_arch = "x86_64")]
mod sse41;

/// Square convolution core size.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConvolutionCore {
    /// 2x2 weights.
    Core2x2,
    /// 3x3 weights.
    Core3x3,
    /// 4x4 weights.
    Core4x4,
    /// 5x5 weights.
    Core5x5,
}

impl ConvolutionCore {
    /// Side length `k` of the core.
    #[must_use]
    pub const fn size(self) -> usize {
        match self {
            Self::Core2x2 => 2,
            Self::Core3x3 => 3,
            Self::Core4x4 => 4,
            Self::Core5x5 => 5,
        }
    }

    /// Number of weights, `k * k`.
    #[must_use]
    pub const fn area(self) -> usize {
        self.size() * self.size()
    }

    /// Core with side length `size`, if supported.
    #[must_use]
    pub const fn from_size(size: usize) -> Option<Self> {
        match size {
            2 => Some(Self::Core2x2),
            3 => Some(Self::Core3x3),
            4 => Some(Self::Core4x4),
            5 => Some(Self::Core5x5),
            _ => None,
        }
    }
}

/// Row kernel shared by every ISA: `K` source rows, a row of weights or
/// gradients, and the output.
type CorrelationRow<const K: usize> = unsafe fn(&[&[f32]; K], &[f32], &mut [f32]);

fn correlation_row<const K: usize>() -> CorrelationRow<K> {
    match simd_level() {
        #[cfg(target_arch = "x86_64")]
        SimdLevel::Avx512 | SimdLevel::Avx2 => avx2::add_correlation_row::<K>,
        #[cfg(target_arch = "x86_64")]
        SimdLevel::Sse41 => sse41::add_correlation_row::<K>,
        _ => scalar::add_correlation_row::<K>,
    }
}

fn correlation_row_sums<const K: usize>() -> CorrelationRow<K> {
    match simd_level() {
        #[cfg(target_arch = "x86_64")]
        SimdLevel::Avx512 | SimdLevel::Avx2 => avx2::add_correlation_row_sums::<K>,
        #[cfg(target_arch = "x86_64")]
        SimdLevel::Sse41 => sse41::add_correlation_row_sums::<K>,
        _ => scalar::add_correlation_row_sums::<K>,
    }
}

/// Calls `$f::<K>` with `K` bound to the side length of `$core`.
macro_rules! with_core {
    ($core:expr, $f:ident($($arg:expr),*)) => {
        match $core {
            ConvolutionCore::Core2x2 => $f::<2>($($arg),*),
            ConvolutionCore::Core3x3 => $f::<3>($($arg),*),
            ConvolutionCore::Core4x4 => $f::<4>($($arg),*),
            ConvolutionCore::Core5x5 => $f::<5>($($arg),*),
        }
    };
}

fn check_extents(core: ConvolutionCore, large: (usize, usize), small: (usize, usize), weights: usize) {
    let k = core.size();
    assert_eq!(weights, core.area(), "{k}x{k} core needs {} weights", core.area());
    assert!(
        large.0 == small.0 + k - 1 && large.1 == small.1 + k - 1,
        "{k}x{k} convolution needs a source larger by {} in each dimension",
        k - 1
    );
}

/// Forward convolution: `dst(y, x) += sum(w[dy * k + dx] * src(y + dy, x + dx))`.
///
/// # Panics
///
/// Panics when `weights` does not hold `k * k` values or `src` is not
/// `(w + k - 1) x (h + k - 1)` for a `w x h` destination.
pub fn add_convolution_forward(
    core: ConvolutionCore,
    src: &Raster<'_, f32>,
    weights: &[f32],
    dst: &mut RasterMut<'_, f32>,
) {
    check_extents(
        core,
        (src.width(), src.height()),
        (dst.width(), dst.height()),
        weights.len(),
    );
    with_core!(core, forward(src, weights, dst));
}

fn forward<const K: usize>(src: &Raster<'_, f32>, weights: &[f32], dst: &mut RasterMut<'_, f32>) {
    let kernel = correlation_row::<K>();
    for y in 0..dst.height() {
        let rows: [&[f32]; K] = std::array::from_fn(|i| src.row(y + i));
        // SAFETY: The kernel matches `simd_level()`; every row holds at least
        // `dst.width() + K - 1` elements. See simd/mod.rs Conditions 1-3.
        unsafe { kernel(&rows, weights, dst.row_mut(y)) };
    }
}

/// Backward convolution: `dst(y + dy, x + dx) += w[dy * k + dx] * src(y, x)`.
///
/// # Panics
///
/// Panics when `weights` does not hold `k * k` values or `dst` is not
/// `(w + k - 1) x (h + k - 1)` for a `w x h` source.
pub fn add_convolution_backward(
    core: ConvolutionCore,
    src: &Raster<'_, f32>,
    weights: &[f32],
    dst: &mut RasterMut<'_, f32>,
) {
    check_extents(
        core,
        (dst.width(), dst.height()),
        (src.width(), src.height()),
        weights.len(),
    );
    let tuning = &config::current().convolution;
    let min_area = if core == ConvolutionCore::Core5x5 {
        tuning.back_window_min_area_5x5
    } else {
        tuning.back_window_min_area
    };
    let area = src.width() * src.height();
    if area < min_area {
        tracing::trace!(?core, area, min_area, "backward convolution: per-offset accumulation");
        backward_per_offset(core, src, weights, dst);
    } else {
        tracing::trace!(?core, area, min_area, "backward convolution: row window");
        with_core!(core, backward_window(src, weights, dst));
    }
}

/// Adds each source row, scaled by one weight, at every core offset.
fn backward_per_offset(core: ConvolutionCore, src: &Raster<'_, f32>, weights: &[f32], dst: &mut RasterMut<'_, f32>) {
    let k = core.size();
    let width = src.width();
    for (i, &weight) in weights.iter().enumerate() {
        let (dy, dx) = (i / k, i % k);
        for y in 0..src.height() {
            let out = &mut dst.row_mut(y + dy)[dx..dx + width];
            super::neural_add_vector_multiplied_by_value(src.row(y), weight, out);
        }
    }
}

/// Turns the scatter into a forward correlation with reversed weights over a
/// window of zero-padded source rows.
fn backward_window<const K: usize>(src: &Raster<'_, f32>, weights: &[f32], dst: &mut RasterMut<'_, f32>) {
    const LANES: usize = 16;
    let reversed: SmallVec<[f32; 25]> = weights.iter().rev().copied().collect();
    let mut window = RowWindow::<f32>::new(K, src.width(), K - 1, LANES);
    let kernel = correlation_row::<K>();
    for y in 0..dst.height() {
        window.push_row((y < src.height()).then(|| src.row(y)));
        let rows: [&[f32]; K] = std::array::from_fn(|i| window.row(i));
        // SAFETY: Window rows hold `width + 2 * (K - 1)` elements or more,
        // covering `dst.width() + K - 1`. See simd/mod.rs Conditions 1-3.
        unsafe { kernel(&rows, &reversed, dst.row_mut(y)) };
    }
}

/// Weight gradients: `sums[dy * k + dx] += sum(src(y + dy, x + dx) * dst(y, x))`.
///
/// # Panics
///
/// Panics when `sums` does not hold `k * k` values or `src` is not
/// `(w + k - 1) x (h + k - 1)` for a `w x h` `dst`.
pub fn add_convolution_sum(core: ConvolutionCore, src: &Raster<'_, f32>, dst: &Raster<'_, f32>, sums: &mut [f32]) {
    check_extents(
        core,
        (src.width(), src.height()),
        (dst.width(), dst.height()),
        sums.len(),
    );
    with_core!(core, sum(src, dst, sums));
}

fn sum<const K: usize>(src: &Raster<'_, f32>, dst: &Raster<'_, f32>, sums: &mut [f32]) {
    let kernel = correlation_row_sums::<K>();
    for y in 0..dst.height() {
        let rows: [&[f32]; K] = std::array::from_fn(|i| src.row(y + i));
        // SAFETY: The kernel matches `simd_level()`; every row holds at least
        // `dst.width() + K - 1` elements. See simd/mod.rs Conditions 1-3.
        unsafe { kernel(&rows, dst.row(y), sums) };
    }
}

//! Max pooling of float rasters.
//!
//! Each output row is produced in two passes: the source rows under the
//! window are reduced into a vertical-max scratch row, then the scratch row
//! is reduced horizontally with the pooling stride. Windows that reach past
//! the right or bottom edge are clipped; `pooling_1x1_max_3x3` also clips at
//! the top and left.

use smallvec::SmallVec;

use crate::simd::scratch::AlignedScratch;
use crate::simd::{simd_level, SimdLevel};
use crate::view::{Raster, RasterMut};

pub mod scalar;

#[cfg(target_arch = "x86_64")]
mod sse41;

type RowsKernel = unsafe fn(&[&[f32]], &mut [f32]);
type RowKernel = unsafe fn(&[f32], &mut [f32]);

struct PoolingKernels {
    max_rows: RowsKernel,
    max_neighbors: RowKernel,
    max_pairs: RowKernel,
    max_triples: RowKernel,
}

impl PoolingKernels {
    fn select() -> Self {
        match simd_level() {
            #[cfg(target_arch = "x86_64")]
            SimdLevel::Avx512 | SimdLevel::Avx2 | SimdLevel::Sse41 => Self {
                max_rows: sse41::max_rows,
                max_neighbors: sse41::max_neighbors,
                max_pairs: sse41::max_pairs,
                max_triples: sse41::max_triples,
            },
            _ => Self {
                max_rows: |rows, out| scalar::max_rows(rows, out, 0),
                max_neighbors: |row, out| scalar::max_neighbors(row, out, 0),
                max_pairs: |row, out| scalar::max_pairs(row, out, 0),
                max_triples: |row, out| scalar::max_triples(row, out, 0),
            },
        }
    }
}

fn check_output(src: &Raster<'_, f32>, dst: &RasterMut<'_, f32>, width: usize, height: usize) {
    assert!(
        dst.width() == width && dst.height() == height,
        "pooling {}x{} needs a {width}x{height} output, got {}x{}",
        src.width(),
        src.height(),
        dst.width(),
        dst.height()
    );
}

/// 3x3 max filter with stride 1. The output has the size of the input.
///
/// # Panics
///
/// Panics when `src` and `dst` differ in size.
pub fn pooling_1x1_max_3x3(src: &Raster<'_, f32>, dst: &mut RasterMut<'_, f32>) {
    check_output(src, dst, src.width(), src.height());
    let kernels = PoolingKernels::select();
    let mut vertical = AlignedScratch::<f32>::zeroed(src.width());
    for y in 0..src.height() {
        let rows: SmallVec<[&[f32]; 3]> = (y.saturating_sub(1)..(y + 2).min(src.height()))
            .map(|r| src.row(r))
            .collect();
        // SAFETY: The kernels match `simd_level()`; the scratch and output
        // rows are `src.width()` long. See simd/mod.rs Conditions 1-3.
        unsafe {
            (kernels.max_rows)(&rows, vertical.as_mut_slice());
            (kernels.max_neighbors)(vertical.as_slice(), dst.row_mut(y));
        }
    }
}

/// 2x2 max pooling with stride 2. The output is
/// `ceil(w / 2) x ceil(h / 2)`.
///
/// # Panics
///
/// Panics when `dst` does not have that size.
pub fn pooling_2x2_max_2x2(src: &Raster<'_, f32>, dst: &mut RasterMut<'_, f32>) {
    check_output(src, dst, src.width().div_ceil(2), src.height().div_ceil(2));
    let kernels = PoolingKernels::select();
    pool_strided(src, dst, 2, kernels.max_rows, kernels.max_pairs);
}

/// 3x3 max pooling with stride 2. The output is `floor(w / 2) x floor(h / 2)`:
/// windows start at every even position that leaves at least one more
/// column or row to its right or below.
///
/// # Panics
///
/// Panics when `dst` does not have that size.
pub fn pooling_2x2_max_3x3(src: &Raster<'_, f32>, dst: &mut RasterMut<'_, f32>) {
    check_output(src, dst, src.width() / 2, src.height() / 2);
    let kernels = PoolingKernels::select();
    pool_strided(src, dst, 3, kernels.max_rows, kernels.max_triples);
}

fn pool_strided(
    src: &Raster<'_, f32>,
    dst: &mut RasterMut<'_, f32>,
    size: usize,
    max_rows: RowsKernel,
    horizontal: RowKernel,
) {
    let mut vertical = AlignedScratch::<f32>::zeroed(src.width());
    for y in 0..dst.height() {
        let top = 2 * y;
        let rows: SmallVec<[&[f32]; 3]> = (top..(top + size).min(src.height()))
            .map(|r| src.row(r))
            .collect();
        // SAFETY: The kernels match `simd_level()`; the scratch row is
        // `src.width()` long and the output row covers the windows that
        // start inside it. See simd/mod.rs Conditions 1-3.
        unsafe {
            max_rows(&rows, vertical.as_mut_slice());
            horizontal(vertical.as_slice(), dst.row_mut(y));
        }
    }
}

#[cfg(test)]
mod pooling_tests;

//! Scalar max pooling.
//!
//! Row kernels work on one vertically reduced row. Their `first` argument
//! lets the vector builds hand over the remainder columns.

use crate::view::{Raster, RasterMut};

/// Maximum of `row[start..start + len]`, clipped to the row end.
#[inline]
fn window_max(row: &[f32], start: usize, len: usize) -> f32 {
    let end = (start + len).min(row.len());
    row[start..end].iter().copied().fold(f32::NEG_INFINITY, f32::max)
}

/// `out[x] = max(rows[i][x])` for `x >= first`.
pub(crate) fn max_rows(rows: &[&[f32]], out: &mut [f32], first: usize) {
    for (x, o) in out.iter_mut().enumerate().skip(first) {
        *o = rows.iter().map(|row| row[x]).fold(f32::NEG_INFINITY, f32::max);
    }
}

/// `out[x] = max(row[x - 1], row[x], row[x + 1])`, clipped at both ends.
pub(crate) fn max_neighbors(row: &[f32], out: &mut [f32], first: usize) {
    for (x, o) in out.iter_mut().enumerate().skip(first) {
        let start = x.saturating_sub(1);
        *o = window_max(row, start, x + 2 - start);
    }
}

/// `out[x] = max(row[2x], row[2x + 1])`, clipped at the row end.
pub(crate) fn max_pairs(row: &[f32], out: &mut [f32], first: usize) {
    for (x, o) in out.iter_mut().enumerate().skip(first) {
        *o = window_max(row, 2 * x, 2);
    }
}

/// `out[x] = max(row[2x], row[2x + 1], row[2x + 2])`, clipped at the row end.
pub(crate) fn max_triples(row: &[f32], out: &mut [f32], first: usize) {
    for (x, o) in out.iter_mut().enumerate().skip(first) {
        *o = window_max(row, 2 * x, 3);
    }
}

/// Maximum over the source window `[y0, y0 + size) x [x0, x0 + size)`
/// clipped to the raster.
fn raster_window_max(src: &Raster<'_, f32>, y0: usize, x0: usize, size: usize) -> f32 {
    let y1 = (y0 + size).min(src.height());
    (y0..y1)
        .map(|y| window_max(src.row(y), x0, size))
        .fold(f32::NEG_INFINITY, f32::max)
}

/// Reference 3x3 max filter with stride 1; windows are clipped at the borders.
pub fn pooling_1x1_max_3x3(src: &Raster<'_, f32>, dst: &mut RasterMut<'_, f32>) {
    for y in 0..dst.height() {
        let y0 = y.saturating_sub(1);
        let rows = y + 2 - y0;
        for (x, d) in dst.row_mut(y).iter_mut().enumerate() {
            let x0 = x.saturating_sub(1);
            let cols = x + 2 - x0;
            let y1 = (y0 + rows).min(src.height());
            *d = (y0..y1)
                .map(|r| window_max(src.row(r), x0, cols))
                .fold(f32::NEG_INFINITY, f32::max);
        }
    }
}

/// Reference 2x2 max pooling with stride 2; an odd last row or column pools
/// a narrower window.
pub fn pooling_2x2_max_2x2(src: &Raster<'_, f32>, dst: &mut RasterMut<'_, f32>) {
    for y in 0..dst.height() {
        for (x, d) in dst.row_mut(y).iter_mut().enumerate() {
            *d = raster_window_max(src, 2 * y, 2 * x, 2);
        }
    }
}

/// Reference 3x3 max pooling with stride 2; the last window in each
/// direction is clipped to the raster.
pub fn pooling_2x2_max_3x3(src: &Raster<'_, f32>, dst: &mut RasterMut<'_, f32>) {
    for y in 0..dst.height() {
        for (x, d) in dst.row_mut(y).iter_mut().enumerate() {
            *d = raster_window_max(src, 2 * y, 2 * x, 3);
        }
    }
}

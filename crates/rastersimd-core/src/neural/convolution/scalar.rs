//! Scalar convolution kernels.
//!
//! The row kernels are shared by every vector build for its remainder
//! columns, so they accumulate in the same order as the vector bodies.

use super::ConvolutionCore;
use crate::view::{Raster, RasterMut};

/// `dst[x] += sum(weights[dy * K + dx] * rows[dy][x + dx])`.
pub(crate) fn add_correlation_row<const K: usize>(rows: &[&[f32]; K], weights: &[f32], dst: &mut [f32]) {
    for (x, d) in dst.iter_mut().enumerate() {
        let mut sum = *d;
        for (row, core) in rows.iter().zip(weights.chunks_exact(K)) {
            for (&value, &weight) in row[x..x + K].iter().zip(core) {
                sum += value * weight;
            }
        }
        *d = sum;
    }
}

/// `sums[dy * K + dx] += sum(rows[dy][x + dx] * dst[x])`.
pub(crate) fn add_correlation_row_sums<const K: usize>(rows: &[&[f32]; K], dst: &[f32], sums: &mut [f32]) {
    for (row, core_sums) in rows.iter().zip(sums.chunks_exact_mut(K)) {
        for (dx, sum) in core_sums.iter_mut().enumerate() {
            let mut total = 0.0;
            for (&value, &d) in row[dx..].iter().zip(dst) {
                total += value * d;
            }
            *sum += total;
        }
    }
}

/// Reference forward convolution: `dst(y, x) += sum(w[dy * k + dx] * src(y + dy, x + dx))`.
pub fn add_convolution_forward(
    core: ConvolutionCore,
    src: &Raster<'_, f32>,
    weights: &[f32],
    dst: &mut RasterMut<'_, f32>,
) {
    let k = core.size();
    for y in 0..dst.height() {
        let out = dst.row_mut(y);
        for (x, d) in out.iter_mut().enumerate() {
            for dy in 0..k {
                let row = &src.row(y + dy)[x..x + k];
                for (&value, &weight) in row.iter().zip(&weights[dy * k..(dy + 1) * k]) {
                    *d += value * weight;
                }
            }
        }
    }
}

/// Reference backward convolution: scatters `w[dy * k + dx] * src(y, x)`
/// into `dst(y + dy, x + dx)`.
pub fn add_convolution_backward(
    core: ConvolutionCore,
    src: &Raster<'_, f32>,
    weights: &[f32],
    dst: &mut RasterMut<'_, f32>,
) {
    let k = core.size();
    for y in 0..src.height() {
        let row = src.row(y);
        for dy in 0..k {
            let out = dst.row_mut(y + dy);
            for (dx, &weight) in weights[dy * k..(dy + 1) * k].iter().enumerate() {
                for (d, &value) in out[dx..].iter_mut().zip(row) {
                    *d += weight * value;
                }
            }
        }
    }
}

/// Reference weight gradient: `sums[dy * k + dx] += sum(src(y + dy, x + dx) * dst(y, x))`.
pub fn add_convolution_sum(core: ConvolutionCore, src: &Raster<'_, f32>, dst: &Raster<'_, f32>, sums: &mut [f32]) {
    let k = core.size();
    for y in 0..dst.height() {
        let out = dst.row(y);
        for dy in 0..k {
            let row = src.row(y + dy);
            for (dx, sum) in sums[dy * k..(dy + 1) * k].iter_mut().enumerate() {
                *sum += row[dx..].iter().zip(out).map(|(&s, &d)| s * d).sum::<f32>();
            }
        }
    }
}

//! Scalar reference implementations for the statistics family.
//!
//! These functions serve as:
//! - Fallback on platforms without SIMD support
//! - Reference implementations for testing SIMD correctness
//! - The only implementation of the moment reducers, whose row accumulators
//!   already adapt their width to the image size

#![allow(clippy::cast_possible_truncation)]

use super::{Moments, ObjectMoments, Statistic};
use crate::view::Raster;

/// One-pass min, max and rounded average.
#[must_use]
pub fn get_statistic(src: &Raster<'_, u8>) -> Statistic {
    let mut min = u8::MAX;
    let mut max = u8::MIN;
    let mut sum = 0u64;
    for y in 0..src.height() {
        for &value in src.row(y) {
            min = min.min(value);
            max = max.max(value);
            sum += u64::from(value);
        }
    }
    Statistic::from_parts(min, max, sum, src.area())
}

/// Per-row sums.
pub fn get_row_sums(src: &Raster<'_, u8>, sums: &mut [u32]) {
    for (y, sum) in sums.iter_mut().enumerate().take(src.height()) {
        *sum = src.row(y).iter().map(|&v| u32::from(v)).sum();
    }
}

/// Per-column sums.
pub fn get_col_sums(src: &Raster<'_, u8>, sums: &mut [u32]) {
    let sums = &mut sums[..src.width()];
    sums.fill(0);
    for y in 0..src.height() {
        for (sum, &value) in sums.iter_mut().zip(src.row(y)) {
            *sum += u32::from(value);
        }
    }
}

/// Per-row sums of `|src[y+1][x] - src[y][x]|`; the last entry is zero.
pub fn get_abs_dy_row_sums(src: &Raster<'_, u8>, sums: &mut [u32]) {
    let height = src.height();
    for (y, out) in sums[..height - 1].iter_mut().enumerate() {
        *out = src
            .row(y)
            .iter()
            .zip(src.row(y + 1))
            .map(|(&a, &b)| u32::from(a.abs_diff(b)))
            .sum();
    }
    sums[height - 1] = 0;
}

/// Per-column sums of `|src[y][x+1] - src[y][x]|`; the last entry is zero.
pub fn get_abs_dx_col_sums(src: &Raster<'_, u8>, sums: &mut [u32]) {
    let width = src.width();
    let sums = &mut sums[..width];
    sums.fill(0);
    for y in 0..src.height() {
        let row = src.row(y);
        for (sum, pair) in sums.iter_mut().zip(row.windows(2)) {
            *sum += u32::from(pair[0].abs_diff(pair[1]));
        }
    }
    sums[width - 1] = 0;
}

/// Sum of all pixels.
#[must_use]
pub fn value_sum(src: &Raster<'_, u8>) -> u64 {
    (0..src.height())
        .map(|y| src.row(y).iter().map(|&v| u64::from(v)).sum::<u64>())
        .sum()
}

/// Sum of squared pixels.
#[must_use]
pub fn square_sum(src: &Raster<'_, u8>) -> u64 {
    (0..src.height())
        .map(|y| {
            src.row(y)
                .iter()
                .map(|&v| u64::from(v) * u64::from(v))
                .sum::<u64>()
        })
        .sum()
}

/// Sum and squared sum in one pass.
#[must_use]
pub fn value_square_sum(src: &Raster<'_, u8>) -> (u64, u64) {
    let mut value = 0u64;
    let mut square = 0u64;
    for y in 0..src.height() {
        for &v in src.row(y) {
            value += u64::from(v);
            square += u64::from(v) * u64::from(v);
        }
    }
    (value, square)
}

/// Sum of `a * b` over every pixel pair.
#[must_use]
pub fn correlation_sum(a: &Raster<'_, u8>, b: &Raster<'_, u8>) -> u64 {
    (0..a.height())
        .map(|y| {
            a.row(y)
                .iter()
                .zip(b.row(y))
                .map(|(&a, &b)| u64::from(a) * u64::from(b))
                .sum::<u64>()
        })
        .sum()
}

// =============================================================================
// Moments
// =============================================================================

/// True when second-order row sums (`x*x*value` summed over a row, `x*y*value`
/// and `y*y*value`) stay below `u32::MAX` for every row of the image.
#[must_use]
pub(crate) fn second_row_sum_enough_32bit(width: usize, height: usize, value: u32) -> bool {
    let (w, h, v) = (width as u128, height as u128, u128::from(value));
    below(&[v, w, w, w], 0x3_0000_0000)
        && below(&[v, w, w, h], 0x2_0000_0000)
        && below(&[v, w, h, h], 0x1_0000_0000)
}

/// True when first-order row sums (`x*value` and `y*value`) stay below `u32::MAX`.
#[must_use]
pub(crate) fn first_row_sum_enough_32bit(width: usize, height: usize, value: u32) -> bool {
    let (w, h, v) = (width as u128, height as u128, u128::from(value));
    below(&[v, w, w], 0x2_0000_0000) && below(&[v, w, h], 0x1_0000_0000)
}

/// `product(factors) < limit`; an overflowing product is never below.
fn below(factors: &[u128], limit: u128) -> bool {
    factors
        .iter()
        .try_fold(1u128, |acc, &f| acc.checked_mul(f))
        .is_some_and(|product| product < limit)
}

/// Selected pixels of row `y` as `(column, weight)` pairs.
///
/// With a mask only pixels equal to `index` are yielded; without a source
/// every selected pixel weighs 1.
fn selected<'a>(
    src: Option<&'a [u8]>,
    mask: Option<&'a [u8]>,
    index: u8,
    width: usize,
) -> impl Iterator<Item = (u32, u32)> + 'a {
    (0..width).filter_map(move |x| {
        if let Some(mask) = mask {
            if mask[x] != index {
                return None;
            }
        }
        let weight = src.map_or(1, |src| u32::from(src[x]));
        Some((x as u32, weight))
    })
}

/// Moments of the pixels where `mask == index`.
#[must_use]
pub fn get_moments(mask: &Raster<'_, u8>, index: u8) -> Moments {
    let (width, height) = (mask.width(), mask.height());
    let object = if second_row_sum_enough_32bit(width, height, 1) {
        object_moments_small(None, Some(mask), index)
    } else {
        object_moments_large(None, Some(mask), index)
    };
    Moments {
        area: object.n,
        x: object.sx,
        y: object.sy,
        xx: object.sxx,
        xy: object.sxy,
        yy: object.syy,
    }
}

/// Weighted object moments.
///
/// # Panics
///
/// Panics when both `src` and `mask` are `None`.
#[must_use]
pub fn get_object_moments(
    src: Option<&Raster<'_, u8>>,
    mask: Option<&Raster<'_, u8>>,
    index: u8,
) -> ObjectMoments {
    assert!(
        src.is_some() || mask.is_some(),
        "object moments need a source or a mask"
    );
    let (width, height) = dimensions(src, mask);
    let value = if src.is_some() { 255 } else { 1 };
    if second_row_sum_enough_32bit(width, height, value) {
        object_moments_small(src, mask, index)
    } else if first_row_sum_enough_32bit(width, height, value) {
        object_moments_medium(src, mask, index)
    } else {
        object_moments_large(src, mask, index)
    }
}

fn rows<'a>(raster: Option<&Raster<'a, u8>>, y: usize) -> Option<&'a [u8]> {
    raster.map(|raster| raster.row(y))
}

/// Every row accumulator fits in u32.
fn object_moments_small(
    src: Option<&Raster<'_, u8>>,
    mask: Option<&Raster<'_, u8>>,
    index: u8,
) -> ObjectMoments {
    let (width, height) = dimensions(src, mask);
    let mut moments = ObjectMoments::default();
    for y in 0..height {
        let (mut n, mut s, mut sx, mut sxx) = (0u32, 0u32, 0u32, 0u32);
        for (x, w) in selected(rows(src, y), rows(mask, y), index, width) {
            n += 1;
            s += w;
            sx += w * x;
            sxx += w * x * x;
        }
        moments.accumulate_row(y as u64, n, s, u64::from(sx), u64::from(sxx));
    }
    moments
}

/// First-order row sums fit in u32, second-order ones are widened per pixel.
fn object_moments_medium(
    src: Option<&Raster<'_, u8>>,
    mask: Option<&Raster<'_, u8>>,
    index: u8,
) -> ObjectMoments {
    let (width, height) = dimensions(src, mask);
    let mut moments = ObjectMoments::default();
    for y in 0..height {
        let (mut n, mut s, mut sx, mut sxx) = (0u32, 0u32, 0u32, 0u64);
        for (x, w) in selected(rows(src, y), rows(mask, y), index, width) {
            n += 1;
            s += w;
            sx += w * x;
            sxx += u64::from(w * x) * u64::from(x);
        }
        moments.accumulate_row(y as u64, n, s, u64::from(sx), sxx);
    }
    moments
}

/// Only pixel counts and plain weight sums stay in u32.
fn object_moments_large(
    src: Option<&Raster<'_, u8>>,
    mask: Option<&Raster<'_, u8>>,
    index: u8,
) -> ObjectMoments {
    let (width, height) = dimensions(src, mask);
    let mut moments = ObjectMoments::default();
    for y in 0..height {
        let (mut n, mut s, mut sx, mut sxx) = (0u32, 0u32, 0u64, 0u64);
        for (x, w) in selected(rows(src, y), rows(mask, y), index, width) {
            let (x, w64) = (u64::from(x), u64::from(w));
            n += 1;
            s += w;
            sx += w64 * x;
            sxx += w64 * x * x;
        }
        moments.accumulate_row(y as u64, n, s, sx, sxx);
    }
    moments
}

fn dimensions(src: Option<&Raster<'_, u8>>, mask: Option<&Raster<'_, u8>>) -> (usize, usize) {
    src.or(mask)
        .map_or((0, 0), |raster| (raster.width(), raster.height()))
}

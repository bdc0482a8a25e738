//! Scalar reference implementations for the absolute difference family.

use crate::view::Raster;

/// Sum of `|a - b|`.
#[must_use]
pub fn abs_difference_sum(a: &Raster<'_, u8>, b: &Raster<'_, u8>) -> u64 {
    (0..a.height())
        .map(|y| row_sum(a.row(y), b.row(y), None, 0))
        .sum()
}

/// Sum of `|a - b|` where `mask == index`.
#[must_use]
pub fn abs_difference_sum_masked(
    a: &Raster<'_, u8>,
    b: &Raster<'_, u8>,
    mask: &Raster<'_, u8>,
    index: u8,
) -> u64 {
    (0..a.height())
        .map(|y| row_sum(a.row(y), b.row(y), Some(mask.row(y)), index))
        .sum()
}

fn row_sum(a: &[u8], b: &[u8], mask: Option<&[u8]>, index: u8) -> u64 {
    a.iter()
        .zip(b)
        .enumerate()
        .filter(|&(x, _)| mask.map_or(true, |mask| mask[x] == index))
        .map(|(_, (&a, &b))| u64::from(a.abs_diff(b)))
        .sum()
}

/// Nine shifted difference sums over the interior; entry `(dy + 1) * 3 + (dx + 1)`
/// compares `current(y, x)` with `background(y + dy, x + dx)`.
#[must_use]
pub fn abs_difference_sums_3x3(current: &Raster<'_, u8>, background: &Raster<'_, u8>) -> [u64; 9] {
    sums_3x3(current, background, None, 0)
}

/// [`abs_difference_sums_3x3`] restricted to interior pixels where `mask == index`.
#[must_use]
pub fn abs_difference_sums_3x3_masked(
    current: &Raster<'_, u8>,
    background: &Raster<'_, u8>,
    mask: &Raster<'_, u8>,
    index: u8,
) -> [u64; 9] {
    sums_3x3(current, background, Some(mask), index)
}

fn sums_3x3(
    current: &Raster<'_, u8>,
    background: &Raster<'_, u8>,
    mask: Option<&Raster<'_, u8>>,
    index: u8,
) -> [u64; 9] {
    let (width, height) = (current.width(), current.height());
    let mut sums = [0u64; 9];
    for y in 1..height - 1 {
        let row = current.row(y);
        let selected = mask.map(|mask| mask.row(y));
        for x in 1..width - 1 {
            if selected.is_some_and(|selected| selected[x] != index) {
                continue;
            }
            for (dy, neighbour_row) in (y - 1..=y + 1).enumerate() {
                let neighbours = &background.row(neighbour_row)[x - 1..=x + 1];
                for (dx, &value) in neighbours.iter().enumerate() {
                    sums[dy * 3 + dx] += u64::from(row[x].abs_diff(value));
                }
            }
        }
    }
    sums
}

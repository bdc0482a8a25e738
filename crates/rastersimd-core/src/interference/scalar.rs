//! Scalar reference implementations for the interference family.

use crate::view::{Raster, RasterMut};

/// `min(s + value, saturation)` when incrementing, `max(s - value, saturation)` otherwise.
#[inline]
#[must_use]
#[allow(clippy::cast_possible_truncation)] // clamped into the i16 range before narrowing
pub fn interference_change<const INCREMENT: bool>(s: i16, value: u8, saturation: i16) -> i16 {
    let (s, value, saturation) = (i32::from(s), i32::from(value), i32::from(saturation));
    let changed = if INCREMENT {
        (s + value).min(saturation)
    } else {
        (s - value).max(saturation)
    };
    changed as i16
}

pub(crate) fn change<const INCREMENT: bool>(statistic: &mut RasterMut<'_, i16>, value: u8, saturation: i16) {
    for y in 0..statistic.height() {
        for s in statistic.row_mut(y) {
            *s = interference_change::<INCREMENT>(*s, value, saturation);
        }
    }
}

pub(crate) fn change_masked<const INCREMENT: bool>(
    statistic: &mut RasterMut<'_, i16>,
    value: u8,
    saturation: i16,
    mask: &Raster<'_, u8>,
    index: u8,
) {
    for y in 0..statistic.height() {
        let selected = mask.row(y);
        for (s, &m) in statistic.row_mut(y).iter_mut().zip(selected) {
            if m == index {
                *s = interference_change::<INCREMENT>(*s, value, saturation);
            }
        }
    }
}

/// `s = min(s + increment, saturation)`.
pub fn interference_increment(statistic: &mut RasterMut<'_, i16>, increment: u8, saturation: i16) {
    change::<true>(statistic, increment, saturation);
}

/// `s = min(s + increment, saturation)` where `mask == index`.
pub fn interference_increment_masked(
    statistic: &mut RasterMut<'_, i16>,
    increment: u8,
    saturation: i16,
    mask: &Raster<'_, u8>,
    index: u8,
) {
    change_masked::<true>(statistic, increment, saturation, mask, index);
}

/// `s = max(s - decrement, saturation)`.
pub fn interference_decrement(statistic: &mut RasterMut<'_, i16>, decrement: u8, saturation: i16) {
    change::<false>(statistic, decrement, saturation);
}

/// `s = max(s - decrement, saturation)` where `mask == index`.
pub fn interference_decrement_masked(
    statistic: &mut RasterMut<'_, i16>,
    decrement: u8,
    saturation: i16,
    mask: &Raster<'_, u8>,
    index: u8,
) {
    change_masked::<false>(statistic, decrement, saturation, mask, index);
}

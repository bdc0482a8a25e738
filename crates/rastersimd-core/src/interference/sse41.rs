//! SSE4.1 interference kernels (eight i16 lanes per vector).

use std::arch::x86_64::*;

use crate::memory::align_lo;
use crate::simd::x86_sse41::{load_si128, right_not_zero_si128, store_si128, A};
pub(crate) use crate::simd::x86_sse41::HA;
use crate::view::{Raster, RasterMut};

#[inline(always)]
unsafe fn change_vector<const INCREMENT: bool>(s: __m128i, value: __m128i, saturation: __m128i) -> __m128i {
    if INCREMENT {
        _mm_min_epi16(_mm_adds_epi16(s, value), saturation)
    } else {
        _mm_max_epi16(_mm_subs_epi16(s, value), saturation)
    }
}

/// Widens eight mask bytes at `m` into an i16 lane select for `index`.
#[inline(always)]
unsafe fn select_lanes(m: *const u8, index: __m128i) -> __m128i {
    let eq = _mm_cmpeq_epi8(_mm_loadl_epi64(m.cast()), index);
    _mm_unpacklo_epi8(eq, eq)
}

/// Selector for [`change_body`].
#[target_feature(enable = "sse4.1")]
pub(crate) unsafe fn change<const INCREMENT: bool>(statistic: &mut RasterMut<'_, i16>, value: u8, saturation: i16) {
    if statistic.is_aligned(A) {
        change_body::<true, INCREMENT>(statistic, value, saturation);
    } else {
        change_body::<false, INCREMENT>(statistic, value, saturation);
    }
}

#[target_feature(enable = "sse4.1")]
#[inline]
unsafe fn change_body<const ALIGN: bool, const INCREMENT: bool>(
    statistic: &mut RasterMut<'_, i16>,
    value: u8,
    saturation: i16,
) {
    let width = statistic.width();
    let body = align_lo(width, HA);
    let tail_mask = right_not_zero_si128((width - body) * 2);
    let value = _mm_set1_epi16(i16::from(value));
    let saturation = _mm_set1_epi16(saturation);
    for y in 0..statistic.height() {
        let row = statistic.row_mut(y).as_mut_ptr();
        let mut col = 0;
        while col < body {
            let p = row.add(col);
            store_si128::<ALIGN, _>(p, change_vector::<INCREMENT>(load_si128::<ALIGN, _>(p), value, saturation));
            col += HA;
        }
        if body != width {
            let p = row.add(width - HA);
            let s = load_si128::<false, _>(p);
            let changed = change_vector::<INCREMENT>(s, value, saturation);
            store_si128::<false, _>(p, _mm_blendv_epi8(s, changed, tail_mask));
        }
    }
}

/// Selector for [`change_masked_body`]. Mask rows are read eight bytes at a
/// time, so only the statistic alignment picks the body.
#[target_feature(enable = "sse4.1")]
pub(crate) unsafe fn change_masked<const INCREMENT: bool>(
    statistic: &mut RasterMut<'_, i16>,
    value: u8,
    saturation: i16,
    mask: &Raster<'_, u8>,
    index: u8,
) {
    if statistic.is_aligned(A) {
        change_masked_body::<true, INCREMENT>(statistic, value, saturation, mask, index);
    } else {
        change_masked_body::<false, INCREMENT>(statistic, value, saturation, mask, index);
    }
}

#[target_feature(enable = "sse4.1")]
#[inline]
#[allow(clippy::cast_possible_wrap)] // index is compared bitwise
unsafe fn change_masked_body<const ALIGN: bool, const INCREMENT: bool>(
    statistic: &mut RasterMut<'_, i16>,
    value: u8,
    saturation: i16,
    mask: &Raster<'_, u8>,
    index: u8,
) {
    let width = statistic.width();
    let body = align_lo(width, HA);
    let tail_mask = right_not_zero_si128((width - body) * 2);
    let value = _mm_set1_epi16(i16::from(value));
    let saturation = _mm_set1_epi16(saturation);
    let index = _mm_set1_epi8(index as i8);
    for y in 0..statistic.height() {
        let row = statistic.row_mut(y).as_mut_ptr();
        let m = mask.row(y).as_ptr();
        let mut col = 0;
        while col < body {
            let p = row.add(col);
            let s = load_si128::<ALIGN, _>(p);
            let changed = change_vector::<INCREMENT>(s, value, saturation);
            store_si128::<ALIGN, _>(p, _mm_blendv_epi8(s, changed, select_lanes(m.add(col), index)));
            col += HA;
        }
        if body != width {
            let col = width - HA;
            let p = row.add(col);
            let s = load_si128::<false, _>(p);
            let changed = change_vector::<INCREMENT>(s, value, saturation);
            let select = _mm_and_si128(select_lanes(m.add(col), index), tail_mask);
            store_si128::<false, _>(p, _mm_blendv_epi8(s, changed, select));
        }
    }
}

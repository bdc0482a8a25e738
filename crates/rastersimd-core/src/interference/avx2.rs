//! AVX2 interference kernels (sixteen i16 lanes per vector).

use std::arch::x86_64::*;

use crate::memory::align_lo;
pub(crate) use crate::simd::x86_avx2::HA;
use crate::simd::x86_avx2::{load_si256, right_not_zero_si256, store_si256, A};
use crate::view::{Raster, RasterMut};

#[target_feature(enable = "avx2")]
#[inline]
unsafe fn change_vector<const INCREMENT: bool>(s: __m256i, value: __m256i, saturation: __m256i) -> __m256i {
    if INCREMENT {
        _mm256_min_epi16(_mm256_adds_epi16(s, value), saturation)
    } else {
        _mm256_max_epi16(_mm256_subs_epi16(s, value), saturation)
    }
}

/// Widens sixteen mask bytes at `m` into an i16 lane select for `index`.
#[target_feature(enable = "avx2")]
#[inline]
unsafe fn select_lanes(m: *const u8, index: __m128i) -> __m256i {
    _mm256_cvtepi8_epi16(_mm_cmpeq_epi8(_mm_loadu_si128(m.cast()), index))
}

/// Selector for [`change_body`].
#[target_feature(enable = "avx2")]
pub(crate) unsafe fn change<const INCREMENT: bool>(statistic: &mut RasterMut<'_, i16>, value: u8, saturation: i16) {
    if statistic.is_aligned(A) {
        change_body::<true, INCREMENT>(statistic, value, saturation);
    } else {
        change_body::<false, INCREMENT>(statistic, value, saturation);
    }
}

#[target_feature(enable = "avx2")]
#[inline]
unsafe fn change_body<const ALIGN: bool, const INCREMENT: bool>(
    statistic: &mut RasterMut<'_, i16>,
    value: u8,
    saturation: i16,
) {
    let width = statistic.width();
    let body = align_lo(width, HA);
    let tail_mask = right_not_zero_si256((width - body) * 2);
    let value = _mm256_set1_epi16(i16::from(value));
    let saturation = _mm256_set1_epi16(saturation);
    for y in 0..statistic.height() {
        let row = statistic.row_mut(y).as_mut_ptr();
        let mut col = 0;
        while col < body {
            let p = row.add(col);
            store_si256::<ALIGN, _>(p, change_vector::<INCREMENT>(load_si256::<ALIGN, _>(p), value, saturation));
            col += HA;
        }
        if body != width {
            let p = row.add(width - HA);
            let s = load_si256::<false, _>(p);
            let changed = change_vector::<INCREMENT>(s, value, saturation);
            store_si256::<false, _>(p, _mm256_blendv_epi8(s, changed, tail_mask));
        }
    }
}

/// Selector for [`change_masked_body`].
#[target_feature(enable = "avx2")]
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

#[target_feature(enable = "avx2")]
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
    let tail_mask = right_not_zero_si256((width - body) * 2);
    let value = _mm256_set1_epi16(i16::from(value));
    let saturation = _mm256_set1_epi16(saturation);
    let index = _mm_set1_epi8(index as i8);
    for y in 0..statistic.height() {
        let row = statistic.row_mut(y).as_mut_ptr();
        let m = mask.row(y).as_ptr();
        let mut col = 0;
        while col < body {
            let p = row.add(col);
            let s = load_si256::<ALIGN, _>(p);
            let changed = change_vector::<INCREMENT>(s, value, saturation);
            store_si256::<ALIGN, _>(p, _mm256_blendv_epi8(s, changed, select_lanes(m.add(col), index)));
            col += HA;
        }
        if body != width {
            let col = width - HA;
            let p = row.add(col);
            let s = load_si256::<false, _>(p);
            let changed = change_vector::<INCREMENT>(s, value, saturation);
            let select = _mm256_and_si256(select_lanes(m.add(col), index), tail_mask);
            store_si256::<false, _>(p, _mm256_blendv_epi8(s, changed, select));
        }
    }
}

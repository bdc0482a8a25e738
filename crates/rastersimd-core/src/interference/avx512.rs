//! AVX-512BW interference kernels. Tails use lane masks, so any width works.

use std::arch::x86_64::*;

use crate::memory::align_lo;
use crate::simd::tail::tail_mask_32;
use crate::simd::x86_avx512::{load_masked_i16, load_masked_u8, load_si512, store_masked_i16, store_si512, A, HA};
use crate::view::{Raster, RasterMut};

#[target_feature(enable = "avx512f,avx512bw")]
#[inline]
unsafe fn change_vector<const INCREMENT: bool>(s: __m512i, value: __m512i, saturation: __m512i) -> __m512i {
    if INCREMENT {
        _mm512_min_epi16(_mm512_adds_epi16(s, value), saturation)
    } else {
        _mm512_max_epi16(_mm512_subs_epi16(s, value), saturation)
    }
}

/// Selector for [`change_body`].
#[target_feature(enable = "avx512f,avx512bw")]
pub(crate) unsafe fn change<const INCREMENT: bool>(statistic: &mut RasterMut<'_, i16>, value: u8, saturation: i16) {
    if statistic.is_aligned(A) {
        change_body::<true, INCREMENT>(statistic, value, saturation);
    } else {
        change_body::<false, INCREMENT>(statistic, value, saturation);
    }
}

#[target_feature(enable = "avx512f,avx512bw")]
#[inline]
unsafe fn change_body<const ALIGN: bool, const INCREMENT: bool>(
    statistic: &mut RasterMut<'_, i16>,
    value: u8,
    saturation: i16,
) {
    let width = statistic.width();
    let body = align_lo(width, HA);
    let tail = tail_mask_32(width - body);
    let value = _mm512_set1_epi16(i16::from(value));
    let saturation = _mm512_set1_epi16(saturation);
    for y in 0..statistic.height() {
        let row = statistic.row_mut(y).as_mut_ptr();
        let mut col = 0;
        while col < body {
            let p = row.add(col);
            store_si512::<ALIGN, _>(p, change_vector::<INCREMENT>(load_si512::<ALIGN, _>(p), value, saturation));
            col += HA;
        }
        if tail != 0 {
            let p = row.add(body);
            let changed = change_vector::<INCREMENT>(load_masked_i16(p, tail), value, saturation);
            store_masked_i16(p, tail, changed);
        }
    }
}

/// Selector for [`change_masked_body`].
#[target_feature(enable = "avx512f,avx512bw")]
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

#[target_feature(enable = "avx512f,avx512bw")]
#[inline]
unsafe fn change_masked_body<const ALIGN: bool, const INCREMENT: bool>(
    statistic: &mut RasterMut<'_, i16>,
    value: u8,
    saturation: i16,
    mask: &Raster<'_, u8>,
    index: u8,
) {
    let width = statistic.width();
    let body = align_lo(width, HA);
    let tail = tail_mask_32(width - body);
    let value = _mm512_set1_epi16(i16::from(value));
    let saturation = _mm512_set1_epi16(saturation);
    let index = _mm512_set1_epi16(i16::from(index));
    for y in 0..statistic.height() {
        let row = statistic.row_mut(y).as_mut_ptr();
        let m = mask.row(y).as_ptr();
        let mut col = 0;
        while col < body {
            let p = row.add(col);
            let s = load_si512::<ALIGN, _>(p);
            let selected = _mm512_cvtepu8_epi16(_mm256_loadu_si256(m.add(col).cast()));
            let select = _mm512_cmpeq_epi16_mask(selected, index);
            let changed = change_vector::<INCREMENT>(s, value, saturation);
            store_si512::<ALIGN, _>(p, _mm512_mask_mov_epi16(s, select, changed));
            col += HA;
        }
        if tail != 0 {
            let p = row.add(body);
            let bytes = _mm512_castsi512_si256(load_masked_u8(m.add(body), u64::from(tail)));
            let select = _mm512_cmpeq_epi16_mask(_mm512_cvtepu8_epi16(bytes), index);
            let changed = change_vector::<INCREMENT>(load_masked_i16(p, tail), value, saturation);
            store_masked_i16(p, tail & select, changed);
        }
    }
}

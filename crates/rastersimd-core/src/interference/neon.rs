//! ARM NEON interference kernels.

use std::arch::aarch64::*;

use crate::memory::align_lo;
pub(crate) use crate::simd::neon::HA;
use crate::simd::neon::right_not_zero_u8;
use crate::view::{Raster, RasterMut};

#[inline]
fn change_vector<const INCREMENT: bool>(s: int16x8_t, value: int16x8_t, saturation: int16x8_t) -> int16x8_t {
    // SAFETY: NEON is always available on aarch64.
    unsafe {
        if INCREMENT {
            vminq_s16(vqaddq_s16(s, value), saturation)
        } else {
            vmaxq_s16(vqsubq_s16(s, value), saturation)
        }
    }
}

pub(crate) fn change<const INCREMENT: bool>(statistic: &mut RasterMut<'_, i16>, value: u8, saturation: i16) {
    let width = statistic.width();
    let body = align_lo(width, HA);
    // SAFETY: NEON is always available on aarch64.
    let tail_mask = unsafe { vreinterpretq_u16_u8(right_not_zero_u8((width - body) * 2)) };
    for y in 0..statistic.height() {
        let row = statistic.row_mut(y).as_mut_ptr();
        // SAFETY: Loads and stores cover `col..col + HA` with `col + HA <= width`,
        // or the last full vector at `width - HA`; the caller guarantees `width >= HA`.
        // Reason: NEON intrinsics on raw row pointers for throughput.
        unsafe {
            let value = vdupq_n_s16(i16::from(value));
            let saturation = vdupq_n_s16(saturation);
            let mut col = 0;
            while col < body {
                let p = row.add(col);
                vst1q_s16(p, change_vector::<INCREMENT>(vld1q_s16(p), value, saturation));
                col += HA;
            }
            if body != width {
                let p = row.add(width - HA);
                let s = vld1q_s16(p);
                let changed = change_vector::<INCREMENT>(s, value, saturation);
                vst1q_s16(p, vbslq_s16(tail_mask, changed, s));
            }
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
    let width = statistic.width();
    let body = align_lo(width, HA);
    // SAFETY: NEON is always available on aarch64.
    let tail_mask = unsafe { vreinterpretq_u16_u8(right_not_zero_u8((width - body) * 2)) };
    for y in 0..statistic.height() {
        let row = statistic.row_mut(y).as_mut_ptr();
        let m = mask.row(y).as_ptr();
        // SAFETY: Same bounds as `change`; mask rows have the statistic width
        // and are read eight bytes at a time.
        // Reason: NEON intrinsics on raw row pointers for throughput.
        unsafe {
            let value = vdupq_n_s16(i16::from(value));
            let saturation = vdupq_n_s16(saturation);
            let index = vdup_n_u8(index);
            let select_lanes = |col: usize| {
                let eq = vceq_u8(vld1_u8(m.add(col)), index);
                vreinterpretq_u16_s16(vmovl_s8(vreinterpret_s8_u8(eq)))
            };
            let mut col = 0;
            while col < body {
                let p = row.add(col);
                let s = vld1q_s16(p);
                let changed = change_vector::<INCREMENT>(s, value, saturation);
                vst1q_s16(p, vbslq_s16(select_lanes(col), changed, s));
                col += HA;
            }
            if body != width {
                let col = width - HA;
                let p = row.add(col);
                let s = vld1q_s16(p);
                let changed = change_vector::<INCREMENT>(s, value, saturation);
                let select = vandq_u16(select_lanes(col), tail_mask);
                vst1q_s16(p, vbslq_s16(select, changed, s));
            }
        }
    }
}

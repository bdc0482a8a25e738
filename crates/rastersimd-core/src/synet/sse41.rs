//! SSE Synet loops.
//!
//! Every loop moves eight elements per step, two f32 vectors, so a bf16
//! operand fills exactly one 128-bit register. Only SSE2 instructions are
//! used; the loops are selected together with the other 128-bit kernels.

use std::arch::x86_64::*;

use half::bf16;

use super::scalar;
use super::TensorElement;

/// Elements per step.
const DF: usize = 8;

/// Element types with an eight-lane vector load and store.
pub(crate) trait Lanes8: TensorElement {
    /// Loads eight elements as two f32 vectors.
    unsafe fn load8(p: *const Self) -> (__m128, __m128);

    /// Stores two f32 vectors as eight elements.
    unsafe fn store8(p: *mut Self, lo: __m128, hi: __m128);
}

impl Lanes8 for f32 {
    #[inline(always)]
    unsafe fn load8(p: *const Self) -> (__m128, __m128) {
        (_mm_loadu_ps(p), _mm_loadu_ps(p.add(4)))
    }

    #[inline(always)]
    unsafe fn store8(p: *mut Self, lo: __m128, hi: __m128) {
        _mm_storeu_ps(p, lo);
        _mm_storeu_ps(p.add(4), hi);
    }
}

impl Lanes8 for bf16 {
    #[inline(always)]
    unsafe fn load8(p: *const Self) -> (__m128, __m128) {
        let raw = _mm_loadu_si128(p.cast::<__m128i>());
        let zero = _mm_setzero_si128();
        (
            _mm_castsi128_ps(_mm_unpacklo_epi16(zero, raw)),
            _mm_castsi128_ps(_mm_unpackhi_epi16(zero, raw)),
        )
    }

    #[inline(always)]
    unsafe fn store8(p: *mut Self, lo: __m128, hi: __m128) {
        let packed = _mm_packs_epi32(round_to_bf16(lo), round_to_bf16(hi));
        _mm_storeu_si128(p.cast::<__m128i>(), packed);
    }
}

/// Rounds each lane to the nearest bf16, ties to even, and returns the 16
/// result bits sign-extended to 32 so that a signed pack keeps them intact.
/// NaN lanes are truncated and made quiet.
#[inline(always)]
unsafe fn round_to_bf16(value: __m128) -> __m128i {
    let bits = _mm_castps_si128(value);
    let upper = _mm_srli_epi32::<16>(bits);
    let lsb = _mm_and_si128(upper, _mm_set1_epi32(1));
    let rounded = _mm_srli_epi32::<16>(_mm_add_epi32(_mm_add_epi32(bits, _mm_set1_epi32(0x7FFF)), lsb));
    let nan = _mm_castps_si128(_mm_cmpunord_ps(value, value));
    let quiet = _mm_or_si128(upper, _mm_set1_epi32(0x40));
    let result = _mm_or_si128(_mm_and_si128(nan, quiet), _mm_andnot_si128(nan, rounded));
    _mm_srai_epi32::<16>(_mm_slli_epi32::<16>(result))
}

#[inline(always)]
unsafe fn norm_bias_ps<const NORM: bool, const BIAS: bool>(value: __m128, norm: __m128, bias: __m128) -> __m128 {
    let scaled = if NORM { _mm_mul_ps(value, norm) } else { value };
    if BIAS {
        _mm_add_ps(scaled, bias)
    } else {
        scaled
    }
}

pub(crate) unsafe fn scale_broadcast<S: Lanes8, D: Lanes8, const NORM: bool, const BIAS: bool>(
    src: &[S],
    norm: f32,
    bias: f32,
    dst: &mut [D],
) {
    let len = src.len().min(dst.len());
    let (n, b) = (_mm_set1_ps(norm), _mm_set1_ps(bias));
    let (s, d) = (src.as_ptr(), dst.as_mut_ptr());
    let mut i = 0;
    while i + DF <= len {
        let (lo, hi) = S::load8(s.add(i));
        D::store8(
            d.add(i),
            norm_bias_ps::<NORM, BIAS>(lo, n, b),
            norm_bias_ps::<NORM, BIAS>(hi, n, b),
        );
        i += DF;
    }
    scalar::scale_broadcast::<S, D, NORM, BIAS>(&src[i..], norm, bias, &mut dst[i..]);
}

pub(crate) unsafe fn scale_elementwise<S: Lanes8, D: Lanes8, const NORM: bool, const BIAS: bool>(
    src: &[S],
    norm: &[f32],
    bias: &[f32],
    dst: &mut [D],
) {
    let len = src.len().min(dst.len());
    let (s, d) = (src.as_ptr(), dst.as_mut_ptr());
    let mut i = 0;
    while i + DF <= len {
        let (n0, n1) = if NORM {
            f32::load8(norm.as_ptr().add(i))
        } else {
            (_mm_setzero_ps(), _mm_setzero_ps())
        };
        let (b0, b1) = if BIAS {
            f32::load8(bias.as_ptr().add(i))
        } else {
            (_mm_setzero_ps(), _mm_setzero_ps())
        };
        let (lo, hi) = S::load8(s.add(i));
        D::store8(
            d.add(i),
            norm_bias_ps::<NORM, BIAS>(lo, n0, b0),
            norm_bias_ps::<NORM, BIAS>(hi, n1, b1),
        );
        i += DF;
    }
    let norm = if NORM { &norm[i..] } else { norm };
    let bias = if BIAS { &bias[i..] } else { bias };
    scalar::scale_elementwise::<S, D, NORM, BIAS>(&src[i..], norm, bias, &mut dst[i..]);
}

pub(crate) unsafe fn add<A: Lanes8, B: Lanes8, D: Lanes8>(a: &[A], b: &[B], dst: &mut [D]) {
    let len = a.len().min(b.len()).min(dst.len());
    let d = dst.as_mut_ptr();
    let mut i = 0;
    while i + DF <= len {
        let (a0, a1) = A::load8(a.as_ptr().add(i));
        let (b0, b1) = B::load8(b.as_ptr().add(i));
        D::store8(d.add(i), _mm_add_ps(a0, b0), _mm_add_ps(a1, b1));
        i += DF;
    }
    scalar::add(&a[i..], &b[i..], &mut dst[i..]);
}

pub(crate) unsafe fn convert<S: Lanes8, D: Lanes8>(src: &[S], dst: &mut [D]) {
    let len = src.len().min(dst.len());
    let d = dst.as_mut_ptr();
    let mut i = 0;
    while i + DF <= len {
        let (lo, hi) = S::load8(src.as_ptr().add(i));
        D::store8(d.add(i), lo, hi);
        i += DF;
    }
    scalar::convert(&src[i..], &mut dst[i..]);
}

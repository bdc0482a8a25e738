//! Scalar Synet loops over one contiguous run of elements.

use super::TensorElement;

#[inline(always)]
pub(crate) fn norm_bias<const NORM: bool, const BIAS: bool>(value: f32, norm: f32, bias: f32) -> f32 {
    let scaled = if NORM { value * norm } else { value };
    if BIAS {
        scaled + bias
    } else {
        scaled
    }
}

/// `dst[i] = src[i] * norm + bias` with one norm and bias for the run.
pub(crate) fn scale_broadcast<S: TensorElement, D: TensorElement, const NORM: bool, const BIAS: bool>(
    src: &[S],
    norm: f32,
    bias: f32,
    dst: &mut [D],
) {
    for (d, &s) in dst.iter_mut().zip(src) {
        *d = D::from_f32(norm_bias::<NORM, BIAS>(s.to_f32(), norm, bias));
    }
}

/// `dst[i] = src[i] * norm[i] + bias[i]`. A disabled term's slice is not read.
pub(crate) fn scale_elementwise<S: TensorElement, D: TensorElement, const NORM: bool, const BIAS: bool>(
    src: &[S],
    norm: &[f32],
    bias: &[f32],
    dst: &mut [D],
) {
    for (i, (d, &s)) in dst.iter_mut().zip(src).enumerate() {
        let n = if NORM { norm[i] } else { 1.0 };
        let b = if BIAS { bias[i] } else { 0.0 };
        *d = D::from_f32(norm_bias::<NORM, BIAS>(s.to_f32(), n, b));
    }
}

/// `dst[i] = a[i] + b[i]`.
pub(crate) fn add<A: TensorElement, B: TensorElement, D: TensorElement>(a: &[A], b: &[B], dst: &mut [D]) {
    for ((d, &x), &y) in dst.iter_mut().zip(a).zip(b) {
        *d = D::from_f32(x.to_f32() + y.to_f32());
    }
}

/// `dst[i] = src[i]` converted between element types.
pub(crate) fn convert<S: TensorElement, D: TensorElement>(src: &[S], dst: &mut [D]) {
    for (d, &s) in dst.iter_mut().zip(src) {
        *d = D::from_f32(s.to_f32());
    }
}

//! Tests for the neural vector primitives.

use super::*;
use crate::memory::AlignedBuffer;
use crate::testing::{assert_close, random_f32, random_image, TestImage, BOUNDARY_WIDTHS};

/// Lengths around every f32 vector boundary (4, 8 and 16 lanes).
const LENGTHS: [usize; 14] = [0, 1, 3, 4, 5, 7, 8, 9, 15, 16, 17, 33, 64, 101];

/// Agreement between hardware reciprocal estimates and exact division.
const ROUGH_TOLERANCE: f32 = 2e-3;

/// Vector stored `offset` elements into an aligned buffer.
struct TestVector {
    buffer: AlignedBuffer<f32>,
    offset: usize,
}

impl TestVector {
    fn random(len: usize, offset: usize, seed: u64, lo: f32, hi: f32) -> Self {
        let mut data = vec![0.0; offset];
        data.extend(random_f32(len, seed, lo, hi));
        Self {
            buffer: AlignedBuffer::from_slice(&data).unwrap(),
            offset,
        }
    }

    fn filled(len: usize, offset: usize, value: f32) -> Self {
        let data = vec![value; offset + len];
        Self {
            buffer: AlignedBuffer::from_slice(&data).unwrap(),
            offset,
        }
    }

    fn as_slice(&self) -> &[f32] {
        &self.buffer[self.offset..]
    }

    fn as_mut_slice(&mut self) -> &mut [f32] {
        &mut self.buffer[self.offset..]
    }
}

fn sigmoid(x: f32) -> f32 {
    1.0 / (1.0 + (-x).exp())
}

/// Runs a dispatched `(src, parameter, dst)` kernel against its scalar
/// reference for every length and both alignments.
fn check_activation(
    kernel: fn(&[f32], f32, &mut [f32]),
    reference: fn(&[f32], f32, &mut [f32]),
    parameter: f32,
    (lo, hi): (f32, f32),
    tolerance: f32,
) {
    for &len in &LENGTHS {
        for offset in [0, 1] {
            let src = TestVector::random(len, offset, len as u64, lo, hi);
            let mut actual = TestVector::random(len, offset, len as u64 + 1, -1.0, 1.0);
            let mut expected = TestVector::random(len, 0, len as u64 + 1, -1.0, 1.0);
            kernel(src.as_slice(), parameter, actual.as_mut_slice());
            reference(src.as_slice(), parameter, expected.as_mut_slice());
            assert_close(actual.as_slice(), expected.as_slice(), tolerance);
        }
    }
}

#[test]
fn test_rough_sigmoid_stays_within_documented_error() {
    for i in -2000..=2000 {
        let x = i as f32 * 0.005;
        assert!((scalar::rough_sigmoid(x) - sigmoid(x)).abs() < 0.0025, "x = {x}");
        assert!((scalar::rough_sigmoid2(x) - sigmoid(x)).abs() < 0.0018, "x = {x}");
        assert!((scalar::rough_tanh(x) - x.tanh()).abs() < 0.0016, "x = {x}");
    }
}

#[test]
fn test_activation_edge_values() {
    assert!((scalar::rough_sigmoid(0.0) - 0.5).abs() < 1e-6);
    assert!((scalar::rough_sigmoid2(0.0) - 0.5).abs() < 1e-6);
    assert_eq!(scalar::rough_sigmoid2(1000.0), 1.0);
    assert!(scalar::rough_sigmoid2(-1000.0) < 1e-30);
    assert!(scalar::rough_tanh(20.0) > 0.999);
    assert!(scalar::rough_tanh(-20.0) < -0.999);
    assert_eq!(scalar::derivative_sigmoid(0.5), 0.25);
    assert_eq!(scalar::derivative_tanh(0.0), 1.0);
}

#[test]
fn test_activations_match_scalar() {
    check_activation(neural_rough_sigmoid, scalar::neural_rough_sigmoid, 1.3, (-8.0, 8.0), ROUGH_TOLERANCE);
    check_activation(neural_rough_sigmoid2, scalar::neural_rough_sigmoid2, 0.9, (-8.0, 8.0), ROUGH_TOLERANCE);
    check_activation(neural_rough_tanh, scalar::neural_rough_tanh, 1.1, (-5.0, 5.0), ROUGH_TOLERANCE);
    check_activation(neural_derivative_sigmoid, scalar::neural_derivative_sigmoid, 2.0, (0.0, 1.0), 1e-6);
    check_activation(neural_derivative_tanh, scalar::neural_derivative_tanh, 0.5, (-1.0, 1.0), 1e-6);
}

#[test]
fn test_relu_family_matches_scalar() {
    for slope in [0.0, 0.1, 0.5, 1.0] {
        check_activation(neural_relu, scalar::neural_relu, slope, (-4.0, 4.0), 1e-6);
        check_activation(neural_derivative_relu, scalar::neural_derivative_relu, slope, (-4.0, 4.0), 1e-6);
    }
}

#[test]
fn test_relu_values() {
    let src = [-2.0, -0.5, 0.0, 0.5, 2.0];
    let mut dst = [9.0; 5];
    neural_relu(&src, 0.0, &mut dst);
    assert_eq!(dst, [0.0, 0.0, 0.0, 0.5, 2.0]);
    neural_relu(&src, 0.25, &mut dst);
    assert_eq!(dst, [-0.5, -0.125, 0.0, 0.5, 2.0]);

    let mut gradient = [4.0; 5];
    neural_derivative_relu(&src, 0.25, &mut gradient);
    assert_eq!(gradient, [1.0, 1.0, 1.0, 4.0, 4.0]);
}

#[test]
fn test_pow_is_close_to_powf() {
    for exponent in [2.0f32, 0.5, 1.5, -0.75] {
        for &len in &LENGTHS {
            for offset in [0, 1] {
                let src = TestVector::random(len, offset, len as u64, 0.05, 20.0);
                let mut dst = TestVector::filled(len, offset, 0.0);
                neural_pow(src.as_slice(), exponent, dst.as_mut_slice());
                let expected: Vec<f32> = src.as_slice().iter().map(|v| v.powf(exponent)).collect();
                for (i, (&a, &e)) in dst.as_slice().iter().zip(&expected).enumerate() {
                    assert!(
                        ((a - e) / e).abs() < 1e-4,
                        "exponent {exponent} len {len} element {i}: got {a}, expected {e}"
                    );
                }
            }
        }
    }
}

#[test]
fn test_product_sum_matches_f64_reference() {
    for &len in &LENGTHS {
        for offset in [0, 1] {
            let a = TestVector::random(len, offset, len as u64, -1.0, 1.0);
            let b = TestVector::random(len, 0, len as u64 + 5, -1.0, 1.0);
            let expected: f64 = a
                .as_slice()
                .iter()
                .zip(b.as_slice())
                .map(|(&x, &y)| f64::from(x) * f64::from(y))
                .sum();
            let actual = f64::from(neural_product_sum(a.as_slice(), b.as_slice()));
            assert!((actual - expected).abs() < 1e-4, "len {len}: {actual} vs {expected}");
        }
    }
}

#[test]
fn test_product_sum_of_empty_vectors_is_zero() {
    assert_eq!(neural_product_sum(&[], &[]), 0.0);
}

#[test]
fn test_vector_additions_match_scalar() {
    for &len in &LENGTHS {
        for offset in [0, 1] {
            let src = TestVector::random(len, offset, len as u64, -3.0, 3.0);
            let mut actual = TestVector::random(len, offset, len as u64 + 2, -3.0, 3.0);
            let mut expected = TestVector::random(len, 0, len as u64 + 2, -3.0, 3.0);

            neural_add_vector_multiplied_by_value(src.as_slice(), 0.7, actual.as_mut_slice());
            scalar::neural_add_vector_multiplied_by_value(src.as_slice(), 0.7, expected.as_mut_slice());
            assert_close(actual.as_slice(), expected.as_slice(), 1e-6);

            neural_add_vector(src.as_slice(), actual.as_mut_slice());
            scalar::neural_add_vector(src.as_slice(), expected.as_mut_slice());
            assert_close(actual.as_slice(), expected.as_slice(), 1e-6);

            neural_add_value(-1.25, actual.as_mut_slice());
            scalar::neural_add_value(-1.25, expected.as_mut_slice());
            assert_close(actual.as_slice(), expected.as_slice(), 1e-6);
        }
    }
}

#[test]
fn test_update_weights_matches_scalar() {
    for &len in &LENGTHS {
        for offset in [0, 1] {
            let x = TestVector::random(len, offset, len as u64, -1.0, 1.0);
            let mut d = TestVector::random(len, offset, len as u64 + 1, -1.0, 1.0);
            let mut w = TestVector::random(len, offset, len as u64 + 2, -1.0, 1.0);
            let mut expected_d = TestVector::random(len, 0, len as u64 + 1, -1.0, 1.0);
            let mut expected_w = TestVector::random(len, 0, len as u64 + 2, -1.0, 1.0);
            neural_update_weights(x.as_slice(), 0.9, 0.01, d.as_mut_slice(), w.as_mut_slice());
            scalar::neural_update_weights(
                x.as_slice(),
                0.9,
                0.01,
                expected_d.as_mut_slice(),
                expected_w.as_mut_slice(),
            );
            assert_close(d.as_slice(), expected_d.as_slice(), 1e-6);
            assert_close(w.as_slice(), expected_w.as_slice(), 1e-6);
        }
    }
}

#[test]
fn test_adaptive_gradient_update_matches_scalar() {
    for &len in &LENGTHS {
        for offset in [0, 1] {
            let delta = TestVector::random(len, offset, len as u64, -4.0, 4.0);
            let mut gradient = TestVector::random(len, offset, len as u64 + 1, 0.0, 2.0);
            let mut weight = TestVector::random(len, offset, len as u64 + 2, -1.0, 1.0);
            let mut expected_gradient = TestVector::random(len, 0, len as u64 + 1, 0.0, 2.0);
            let mut expected_weight = TestVector::random(len, 0, len as u64 + 2, -1.0, 1.0);
            neural_adaptive_gradient_update(
                delta.as_slice(),
                4,
                0.1,
                1e-4,
                gradient.as_mut_slice(),
                weight.as_mut_slice(),
            );
            scalar::neural_adaptive_gradient_update(
                delta.as_slice(),
                4,
                0.1,
                1e-4,
                expected_gradient.as_mut_slice(),
                expected_weight.as_mut_slice(),
            );
            assert_close(gradient.as_slice(), expected_gradient.as_slice(), 1e-6);
            assert_close(weight.as_slice(), expected_weight.as_slice(), 1e-3);
        }
    }
}

#[test]
fn test_adaptive_gradient_single_step() {
    let mut gradient = [0.0f32];
    let mut weight = [1.0f32];
    neural_adaptive_gradient_update(&[2.0], 2, 0.5, 0.0, &mut gradient, &mut weight);
    assert_eq!(gradient[0], 1.0);
    assert!((weight[0] - 0.5).abs() < 1e-3);
}

#[test]
fn test_convert_matches_scalar() {
    for &width in &BOUNDARY_WIDTHS {
        for offset in [0, 1] {
            for inversion in [false, true] {
                let src = random_image(width, 3, offset, width as u64);
                let mut actual = TestImage::<f32>::new(width, 3, offset);
                let mut expected = TestImage::<f32>::new(width, 3, 0);
                neural_convert(&src.view(), &mut actual.view_mut(), inversion);
                scalar::neural_convert(&src.view(), &mut expected.view_mut(), inversion);
                assert_close(&actual.pixels(), &expected.pixels(), 1e-6);
            }
        }
    }
}

#[test]
fn test_convert_endpoints() {
    let src = TestImage::from_slice(2, 1, 0, &[0u8, 255]);
    let mut dst = TestImage::<f32>::new(2, 1, 0);
    neural_convert(&src.view(), &mut dst.view_mut(), false);
    assert_eq!(dst.pixels(), vec![0.0, 1.0]);
    neural_convert(&src.view(), &mut dst.view_mut(), true);
    assert_eq!(dst.pixels(), vec![1.0, 0.0]);
}

#[test]
#[should_panic(expected = "vector lengths differ")]
fn test_length_mismatch_panics() {
    let mut dst = [0.0f32; 3];
    neural_add_vector(&[1.0, 2.0], &mut dst);
}

#[test]
#[should_panic(expected = "different sizes")]
fn test_convert_size_mismatch_panics() {
    let src = TestImage::<u8>::new(4, 2, 0);
    let mut dst = TestImage::<f32>::new(5, 2, 0);
    neural_convert(&src.view(), &mut dst.view_mut(), false);
}

// =============================================================================
// Per-ISA kernels
// =============================================================================

#[cfg(target_arch = "x86_64")]
type Activation = unsafe fn(&[f32], f32, &mut [f32]);

/// Element-wise kernels of one x86 ISA and their scalar references.
#[cfg(target_arch = "x86_64")]
fn isa_activations(isa: SimdLevel) -> [(&'static str, Activation, fn(&[f32], f32, &mut [f32]), f32); 8] {
    macro_rules! table {
        ($isa:ident) => {
            [
                ("rough_sigmoid", $isa::rough_sigmoid, scalar::neural_rough_sigmoid, ROUGH_TOLERANCE),
                ("rough_sigmoid2", $isa::rough_sigmoid2, scalar::neural_rough_sigmoid2, ROUGH_TOLERANCE),
                ("rough_tanh", $isa::rough_tanh, scalar::neural_rough_tanh, ROUGH_TOLERANCE),
                ("derivative_sigmoid", $isa::derivative_sigmoid, scalar::neural_derivative_sigmoid, 1e-6),
                ("derivative_tanh", $isa::derivative_tanh, scalar::neural_derivative_tanh, 1e-6),
                ("relu", $isa::relu, scalar::neural_relu, 1e-6),
                ("derivative_relu", $isa::derivative_relu, scalar::neural_derivative_relu, 1e-6),
                ("add_multiplied", $isa::add_multiplied, scalar::neural_add_vector_multiplied_by_value, 1e-6),
            ]
        };
    }
    if isa == SimdLevel::Avx2 {
        return table!(avx2);
    }
    table!(sse41)
}

#[cfg(target_arch = "x86_64")]
fn detected_x86_isas() -> Vec<SimdLevel> {
    let level = crate::simd::detected_simd_level();
    [SimdLevel::Sse41, SimdLevel::Avx2]
        .into_iter()
        .filter(|&isa| level.includes(isa))
        .collect()
}

#[cfg(target_arch = "x86_64")]
#[test]
fn test_isa_activations_match_scalar() {
    for isa in detected_x86_isas() {
        for (name, kernel, reference, tolerance) in isa_activations(isa) {
            for &len in &LENGTHS {
                for offset in [0, 1] {
                    let src = TestVector::random(len, offset, len as u64, -6.0, 6.0);
                    let mut actual = TestVector::random(len, offset, len as u64 + 1, 0.0, 1.0);
                    let mut expected = TestVector::random(len, 0, len as u64 + 1, 0.0, 1.0);
                    // SAFETY: the ISA was reported by runtime detection; the kernels accept any length.
                    unsafe { kernel(src.as_slice(), 0.8, actual.as_mut_slice()) };
                    reference(src.as_slice(), 0.8, expected.as_mut_slice());
                    for (i, (&a, &e)) in actual.as_slice().iter().zip(expected.as_slice()).enumerate() {
                        assert!(
                            (a - e).abs() <= tolerance * e.abs().max(1.0),
                            "{isa:?} {name} len {len} offset {offset} element {i}: got {a}, expected {e}"
                        );
                    }
                }
            }
        }
    }
}

#[cfg(target_arch = "x86_64")]
#[test]
fn test_isa_vector_ops_match_scalar() {
    for isa in detected_x86_isas() {
        for &len in &LENGTHS {
            for offset in [0, 1] {
                let a = TestVector::random(len, offset, len as u64, -1.0, 1.0);
                let b = TestVector::random(len, offset, len as u64 + 3, -1.0, 1.0);
                let mut actual = TestVector::random(len, offset, len as u64 + 4, -2.0, 2.0);
                let mut expected = TestVector::random(len, 0, len as u64 + 4, -2.0, 2.0);
                let mut powers = TestVector::filled(len, offset, 0.0);
                let positive: Vec<f32> = a.as_slice().iter().map(|v| v.abs() + 0.05).collect();
                let expected_sum = scalar::neural_product_sum(a.as_slice(), b.as_slice());
                scalar::neural_add_vector(a.as_slice(), expected.as_mut_slice());
                scalar::neural_add_value(0.5, expected.as_mut_slice());

                // SAFETY: the ISA was reported by runtime detection; lengths are equal.
                let sum = unsafe {
                    if isa == SimdLevel::Avx2 {
                        avx2::add_vector(a.as_slice(), actual.as_mut_slice());
                        avx2::add_value(0.5, actual.as_mut_slice());
                        avx2::pow(&positive, 1.5, powers.as_mut_slice());
                        avx2::product_sum(a.as_slice(), b.as_slice())
                    } else {
                        sse41::add_vector(a.as_slice(), actual.as_mut_slice());
                        sse41::add_value(0.5, actual.as_mut_slice());
                        sse41::pow(&positive, 1.5, powers.as_mut_slice());
                        sse41::product_sum(a.as_slice(), b.as_slice())
                    }
                };
                assert!((sum - expected_sum).abs() < 1e-4, "{isa:?} len {len}: {sum} vs {expected_sum}");
                assert_close(actual.as_slice(), expected.as_slice(), 1e-6);
                for (&p, &v) in powers.as_slice().iter().zip(&positive) {
                    assert!(((p - v.powf(1.5)) / v.powf(1.5)).abs() < 1e-4, "{isa:?} pow({v})");
                }
            }
        }
    }
}

#[cfg(target_arch = "x86_64")]
#[test]
fn test_isa_weight_updates_match_scalar() {
    for isa in detected_x86_isas() {
        for &len in &LENGTHS {
            for offset in [0, 1] {
                let x = TestVector::random(len, offset, len as u64, -1.0, 1.0);
                let mut d = TestVector::random(len, offset, len as u64 + 1, -1.0, 1.0);
                let mut w = TestVector::random(len, offset, len as u64 + 2, -1.0, 1.0);
                let mut g = TestVector::random(len, offset, len as u64 + 3, 0.0, 2.0);
                let mut expected_d = TestVector::random(len, 0, len as u64 + 1, -1.0, 1.0);
                let mut expected_w = TestVector::random(len, 0, len as u64 + 2, -1.0, 1.0);
                let mut expected_g = TestVector::random(len, 0, len as u64 + 3, 0.0, 2.0);

                scalar::neural_update_weights(
                    x.as_slice(),
                    0.9,
                    0.01,
                    expected_d.as_mut_slice(),
                    expected_w.as_mut_slice(),
                );
                scalar::neural_adaptive_gradient_update(
                    x.as_slice(),
                    2,
                    0.1,
                    1e-4,
                    expected_g.as_mut_slice(),
                    expected_w.as_mut_slice(),
                );
                // SAFETY: the ISA was reported by runtime detection; lengths are equal.
                unsafe {
                    if isa == SimdLevel::Avx2 {
                        avx2::update_weights(x.as_slice(), 0.9, 0.01, d.as_mut_slice(), w.as_mut_slice());
                        avx2::adaptive_gradient_update(x.as_slice(), 2, 0.1, 1e-4, g.as_mut_slice(), w.as_mut_slice());
                    } else {
                        sse41::update_weights(x.as_slice(), 0.9, 0.01, d.as_mut_slice(), w.as_mut_slice());
                        sse41::adaptive_gradient_update(x.as_slice(), 2, 0.1, 1e-4, g.as_mut_slice(), w.as_mut_slice());
                    }
                }
                assert_close(d.as_slice(), expected_d.as_slice(), 1e-6);
                assert_close(g.as_slice(), expected_g.as_slice(), 1e-6);
                assert_close(w.as_slice(), expected_w.as_slice(), 1e-3);
            }
        }
    }
}

#[cfg(target_arch = "x86_64")]
#[test]
fn test_isa_convert_matches_scalar() {
    for isa in detected_x86_isas() {
        for &width in &BOUNDARY_WIDTHS {
            for inversion in [false, true] {
                let src = random_image(width, 3, 1, 500 + width as u64);
                let mut actual = TestImage::<f32>::new(width, 3, 1);
                let mut expected = TestImage::<f32>::new(width, 3, 0);
                scalar::neural_convert(&src.view(), &mut expected.view_mut(), inversion);
                // SAFETY: the ISA was reported by runtime detection; sizes match.
                unsafe {
                    if isa == SimdLevel::Avx2 {
                        avx2::convert(&src.view(), &mut actual.view_mut(), inversion);
                    } else {
                        sse41::convert(&src.view(), &mut actual.view_mut(), inversion);
                    }
                }
                assert_eq!(actual.pixels(), expected.pixels(), "{isa:?} width {width}");
            }
        }
    }
}

//! Tests for the absolute difference family.

use super::*;
use crate::testing::{random_image, TestImage, BOUNDARY_WIDTHS};

#[cfg(target_arch = "x86_64")]
use crate::simd::detected_simd_level;

#[test]
fn test_ramp_against_zeros() {
    let ramp: Vec<u8> = (0..=16).collect();
    let zeros = [0u8; 17];
    let a = Raster::packed(&ramp, 17, 1).unwrap();
    let b = Raster::packed(&zeros, 17, 1).unwrap();
    assert_eq!(abs_difference_sum(&a, &b), 136);
    assert_eq!(abs_difference_sum(&b, &a), 136);
}

#[test]
fn test_identical_rasters_sum_to_zero() {
    for &width in &BOUNDARY_WIDTHS {
        let image = random_image(width, 4, 1, width as u64);
        let copy = TestImage::from_slice(width, 4, 0, &image.pixels());
        assert_eq!(abs_difference_sum(&image.view(), &copy.view()), 0, "width {width}");
    }
}

#[test]
fn test_sums_match_scalar_at_every_boundary_width() {
    for &width in &BOUNDARY_WIDTHS {
        for offset in [0, 1] {
            let a = random_image(width, 6, offset, width as u64);
            let b = random_image(width, 6, offset, width as u64 + 7);
            let mask_data: Vec<u8> = a.pixels().iter().map(|&v| v & 1).collect();
            let mask = TestImage::from_slice(width, 6, offset, &mask_data);
            let (a, b, mask) = (a.view(), b.view(), mask.view());

            assert_eq!(
                abs_difference_sum(&a, &b),
                scalar::abs_difference_sum(&a, &b),
                "width {width} offset {offset}"
            );
            assert_eq!(
                abs_difference_sum_masked(&a, &b, &mask, 1),
                scalar::abs_difference_sum_masked(&a, &b, &mask, 1),
                "masked width {width} offset {offset}"
            );
        }
    }
}

#[test]
fn test_masked_sum_with_absent_index_is_zero() {
    let a = random_image(40, 3, 0, 1);
    let b = random_image(40, 3, 0, 2);
    let mask = TestImage::from_fn(40, 3, 0, |_, _| 5u8);
    assert_eq!(abs_difference_sum_masked(&a.view(), &b.view(), &mask.view(), 4), 0);
    assert_eq!(
        abs_difference_sum_masked(&a.view(), &b.view(), &mask.view(), 5),
        abs_difference_sum(&a.view(), &b.view())
    );
}

#[test]
fn test_3x3_sums_match_scalar() {
    for width in [3usize, 17, 18, 19, 33, 34, 35, 66, 100] {
        for offset in [0, 1] {
            let current = random_image(width, 7, offset, width as u64);
            let background = random_image(width, 7, offset, width as u64 + 3);
            let mask_data: Vec<u8> = current.pixels().iter().map(|&v| v % 3).collect();
            let mask = TestImage::from_slice(width, 7, 1 - offset, &mask_data);
            let (current, background, mask) = (current.view(), background.view(), mask.view());

            assert_eq!(
                abs_difference_sums_3x3(&current, &background),
                scalar::abs_difference_sums_3x3(&current, &background),
                "width {width} offset {offset}"
            );
            assert_eq!(
                abs_difference_sums_3x3_masked(&current, &background, &mask, 2),
                scalar::abs_difference_sums_3x3_masked(&current, &background, &mask, 2),
                "masked width {width} offset {offset}"
            );
        }
    }
}

#[test]
fn test_3x3_center_of_identical_images_is_zero() {
    let image = random_image(50, 9, 0, 11);
    let sums = abs_difference_sums_3x3(&image.view(), &image.view());
    assert_eq!(sums[4], 0);
    assert!(sums.iter().enumerate().all(|(i, &s)| i == 4 || s > 0));
}

#[test]
fn test_3x3_shifted_background_matches_on_the_shift() {
    // background(y, x + 1) == current(y, x): only dy = 0, dx = +1 vanishes
    let (width, height) = (40, 6);
    let current = TestImage::from_fn(width, height, 0, |x, y| ((x * 7 + y * 13) % 251) as u8);
    let background = TestImage::from_fn(width, height, 0, |x, y| ((x.saturating_sub(1) * 7 + y * 13) % 251) as u8);
    let sums = abs_difference_sums_3x3(&current.view(), &background.view());
    assert_eq!(sums[5], 0);
}

#[test]
#[should_panic(expected = "3x3 raster")]
fn test_3x3_rejects_thin_rasters() {
    let data = [0u8; 8];
    let a = Raster::packed(&data, 4, 2).unwrap();
    let _ = abs_difference_sums_3x3(&a, &a);
}

#[test]
#[should_panic(expected = "different sizes")]
fn test_size_mismatch_panics() {
    let data = [0u8; 16];
    let a = Raster::packed(&data, 4, 4).unwrap();
    let b = Raster::packed(&data, 8, 2).unwrap();
    let _ = abs_difference_sum(&a, &b);
}

// =============================================================================
// Per-ISA kernels
// =============================================================================

#[cfg(target_arch = "x86_64")]
#[test]
fn test_isa_kernels_match_scalar() {
    let level = detected_simd_level();
    for &width in &BOUNDARY_WIDTHS {
        for offset in [0, 1] {
            let a = random_image(width, 5, offset, 300 + width as u64);
            let b = random_image(width, 5, offset, 400 + width as u64);
            let mask_data: Vec<u8> = a.pixels().iter().map(|&v| v % 3).collect();
            let mask = TestImage::from_slice(width, 5, offset, &mask_data);
            let (a, b, mask) = (a.view(), b.view(), mask.view());

            let sum = scalar::abs_difference_sum(&a, &b);
            let masked = scalar::abs_difference_sum_masked(&a, &b, &mask, 1);
            let sums = (width > 2).then(|| scalar::abs_difference_sums_3x3(&a, &b));
            let sums_masked = (width > 2).then(|| scalar::abs_difference_sums_3x3_masked(&a, &b, &mask, 2));

            if level.includes(SimdLevel::Sse41) && width >= sse41::A {
                // SAFETY: SSE4.1 detected; width >= 16.
                unsafe {
                    assert_eq!(sse41::abs_difference_sum(&a, &b), sum, "sse41 width {width}");
                    assert_eq!(sse41::abs_difference_sum_masked(&a, &b, &mask, 1), masked, "sse41 width {width}");
                }
            }
            if level.includes(SimdLevel::Sse41) && width >= sse41::A + 2 {
                // SAFETY: SSE4.1 detected; the interior holds a full vector.
                unsafe {
                    assert_eq!(Some(sse41::abs_difference_sums_3x3(&a, &b, None, 0)), sums);
                    assert_eq!(Some(sse41::abs_difference_sums_3x3(&a, &b, Some(&mask), 2)), sums_masked);
                }
            }
            if level.includes(SimdLevel::Avx2) && width >= avx2::A {
                // SAFETY: AVX2 detected; width >= 32.
                unsafe {
                    assert_eq!(avx2::abs_difference_sum(&a, &b), sum, "avx2 width {width}");
                    assert_eq!(avx2::abs_difference_sum_masked(&a, &b, &mask, 1), masked, "avx2 width {width}");
                }
            }
            if level.includes(SimdLevel::Avx2) && width >= avx2::A + 2 {
                // SAFETY: AVX2 detected; the interior holds a full vector.
                unsafe {
                    assert_eq!(Some(avx2::abs_difference_sums_3x3(&a, &b, None, 0)), sums);
                    assert_eq!(Some(avx2::abs_difference_sums_3x3(&a, &b, Some(&mask), 2)), sums_masked);
                }
            }
        }
    }
}

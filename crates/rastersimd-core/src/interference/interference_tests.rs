//! Tests for the interference family.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use super::*;
use crate::testing::{random_bytes, TestImage, BOUNDARY_WIDTHS};

#[cfg(target_arch = "x86_64")]
use crate::simd::detected_simd_level;

fn random_statistic(width: usize, height: usize, offset: usize, seed: u64) -> TestImage<i16> {
    let mut rng = StdRng::seed_from_u64(seed);
    TestImage::from_fn(width, height, offset, |_, _| rng.gen())
}

fn mask_image(width: usize, height: usize, offset: usize, seed: u64) -> TestImage<u8> {
    let data: Vec<u8> = random_bytes(width * height, seed).iter().map(|v| v % 3).collect();
    TestImage::from_slice(width, height, offset, &data)
}

#[test]
fn test_change_clamps_at_saturation() {
    assert_eq!(scalar::interference_change::<true>(10, 5, 12), 12);
    assert_eq!(scalar::interference_change::<true>(10, 1, 12), 11);
    assert_eq!(scalar::interference_change::<true>(i16::MAX, 255, i16::MAX), i16::MAX);
    assert_eq!(scalar::interference_change::<false>(-10, 5, -12), -12);
    assert_eq!(scalar::interference_change::<false>(i16::MIN, 255, i16::MIN), i16::MIN);
    // Already past the limit: the result is pulled back to it.
    assert_eq!(scalar::interference_change::<true>(20, 0, 12), 12);
}

#[test]
fn test_increment_never_wraps() {
    for &width in &BOUNDARY_WIDTHS {
        let mut image = TestImage::from_fn(width, 3, 1, |_, _| i16::MAX - 3);
        interference_increment(&mut image.view_mut(), 200, i16::MAX);
        assert!(image.pixels().iter().all(|&s| s == i16::MAX), "width {width}");

        let mut image = TestImage::from_fn(width, 3, 0, |_, _| i16::MIN + 3);
        interference_decrement(&mut image.view_mut(), 200, i16::MIN);
        assert!(image.pixels().iter().all(|&s| s == i16::MIN), "width {width}");
    }
}

#[test]
fn test_repeated_increments_stop_at_saturation() {
    let mut image = TestImage::<i16>::new(37, 2, 0);
    for _ in 0..100 {
        interference_increment(&mut image.view_mut(), 16, 1000);
    }
    assert!(image.pixels().iter().all(|&s| s == 1000));
    for _ in 0..100 {
        interference_decrement(&mut image.view_mut(), 16, -40);
    }
    assert!(image.pixels().iter().all(|&s| s == -40));
}

#[test]
fn test_masked_change_only_touches_selected_pixels() {
    for &width in &BOUNDARY_WIDTHS {
        let mask = TestImage::from_fn(width, 4, 0, |x, y| u8::from((x + y) % 2 == 0));
        let mut image = TestImage::from_fn(width, 4, 1, |_, _| 100i16);
        interference_increment_masked(&mut image.view_mut(), 7, 104, &mask.view(), 1);
        let view = image.view();
        for y in 0..4 {
            for (x, &s) in view.row(y).iter().enumerate() {
                let expected = if (x + y) % 2 == 0 { 104 } else { 100 };
                assert_eq!(s, expected, "width {width} at ({x}, {y})");
            }
        }
    }
}

#[test]
fn test_masked_change_leaves_out_of_range_pixels_alone() {
    // Unselected pixels above the saturation must not be clamped.
    let mask = TestImage::from_fn(40, 2, 0, |_, _| 0u8);
    let mut image = TestImage::from_fn(40, 2, 0, |_, _| 500i16);
    interference_increment_masked(&mut image.view_mut(), 1, 10, &mask.view(), 1);
    assert!(image.pixels().iter().all(|&s| s == 500));
    interference_decrement_masked(&mut image.view_mut(), 1, 900, &mask.view(), 1);
    assert!(image.pixels().iter().all(|&s| s == 500));
}

#[test]
fn test_changes_match_scalar_at_every_boundary_width() {
    for &width in &BOUNDARY_WIDTHS {
        for offset in [0, 1] {
            let seed = width as u64 * 2 + offset as u64;
            let mask = mask_image(width, 5, 1 - offset, seed);
            let mask = mask.view();
            for (increment, saturation) in [(true, 300i16), (false, -300)] {
                let mut actual = random_statistic(width, 5, offset, seed);
                let mut expected = random_statistic(width, 5, 0, seed);
                if increment {
                    interference_increment(&mut actual.view_mut(), 77, saturation);
                    scalar::interference_increment(&mut expected.view_mut(), 77, saturation);
                } else {
                    interference_decrement(&mut actual.view_mut(), 77, saturation);
                    scalar::interference_decrement(&mut expected.view_mut(), 77, saturation);
                }
                assert_eq!(actual.pixels(), expected.pixels(), "width {width} offset {offset}");

                let mut actual = random_statistic(width, 5, offset, seed);
                let mut expected = random_statistic(width, 5, 0, seed);
                if increment {
                    interference_increment_masked(&mut actual.view_mut(), 77, saturation, &mask, 2);
                    scalar::interference_increment_masked(&mut expected.view_mut(), 77, saturation, &mask, 2);
                } else {
                    interference_decrement_masked(&mut actual.view_mut(), 77, saturation, &mask, 2);
                    scalar::interference_decrement_masked(&mut expected.view_mut(), 77, saturation, &mask, 2);
                }
                assert_eq!(
                    actual.pixels(),
                    expected.pixels(),
                    "masked width {width} offset {offset}"
                );
            }
        }
    }
}

#[test]
#[should_panic(expected = "mask size differs")]
fn test_masked_change_with_wrong_mask_size_panics() {
    let mask = TestImage::<u8>::new(10, 3, 0);
    let mut image = TestImage::<i16>::new(11, 3, 0);
    interference_increment_masked(&mut image.view_mut(), 1, 10, &mask.view(), 0);
}

#[cfg(target_arch = "x86_64")]
#[test]
fn test_isa_kernels_match_scalar() {
    let level = detected_simd_level();
    for &width in BOUNDARY_WIDTHS.iter().filter(|&&w| w >= 8) {
        for offset in [0, 1] {
            let mask = mask_image(width, 4, offset, width as u64);
            let mask = mask.view();
            let mut expected = random_statistic(width, 4, 0, width as u64);
            scalar::change_masked::<true>(&mut expected.view_mut(), 9, 2000, &mask, 1);
            let expected = expected.pixels();
            let run = |kernel: &dyn Fn(&mut RasterMut<'_, i16>)| {
                let mut actual = random_statistic(width, 4, offset, width as u64);
                kernel(&mut actual.view_mut());
                actual.pixels()
            };
            if level.includes(SimdLevel::Sse41) {
                // SAFETY: SSE4.1 detected; width >= 8.
                let actual = run(&|s| unsafe { sse41::change_masked::<true>(s, 9, 2000, &mask, 1) });
                assert_eq!(actual, expected, "sse41 width {width} offset {offset}");
            }
            if level.includes(SimdLevel::Avx2) && width >= 16 {
                // SAFETY: AVX2 detected; width >= 16.
                let actual = run(&|s| unsafe { avx2::change_masked::<true>(s, 9, 2000, &mask, 1) });
                assert_eq!(actual, expected, "avx2 width {width} offset {offset}");
            }
            if level.includes(SimdLevel::Avx512) {
                // SAFETY: AVX-512F/BW detected; masked tails accept any width.
                let actual = run(&|s| unsafe { avx512::change_masked::<true>(s, 9, 2000, &mask, 1) });
                assert_eq!(actual, expected, "avx512 width {width} offset {offset}");
            }
        }
    }
}

#[cfg(target_arch = "x86_64")]
#[test]
fn test_avx512_kernels_accept_narrow_rows() {
    if !detected_simd_level().includes(SimdLevel::Avx512) {
        return;
    }
    for width in [1usize, 5, 7] {
        let mut actual = random_statistic(width, 3, 1, width as u64);
        let mut expected = random_statistic(width, 3, 0, width as u64);
        // SAFETY: AVX-512F/BW detected.
        unsafe { avx512::change::<false>(&mut actual.view_mut(), 50, -100) };
        scalar::change::<false>(&mut expected.view_mut(), 50, -100);
        assert_eq!(actual.pixels(), expected.pixels(), "width {width}");
    }
}

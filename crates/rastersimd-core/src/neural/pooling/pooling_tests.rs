//! Tests for max pooling.

use super::*;
use crate::testing::{random_f32, TestImage};

fn random_raster(width: usize, height: usize, offset: usize, seed: u64) -> TestImage<f32> {
    let data = random_f32(width * height, seed, -10.0, 10.0);
    TestImage::from_slice(width, height, offset, &data)
}

const SIZES: [(usize, usize); 7] = [(2, 2), (3, 3), (4, 5), (7, 2), (9, 9), (17, 6), (33, 4)];

#[test]
fn test_1x1_max_3x3_matches_scalar() {
    for (width, height) in SIZES.into_iter().chain([(1, 1), (1, 4), (5, 1)]) {
        for offset in [0, 1] {
            let src = random_raster(width, height, offset, (width * 31 + height) as u64);
            let mut actual = TestImage::<f32>::new(width, height, offset);
            let mut expected = TestImage::<f32>::new(width, height, 0);
            pooling_1x1_max_3x3(&src.view(), &mut actual.view_mut());
            scalar::pooling_1x1_max_3x3(&src.view(), &mut expected.view_mut());
            assert_eq!(actual.pixels(), expected.pixels(), "{width}x{height} offset {offset}");
        }
    }
}

#[test]
fn test_2x2_max_2x2_matches_scalar() {
    for (width, height) in SIZES.into_iter().chain([(1, 1), (1, 3), (3, 1)]) {
        for offset in [0, 1] {
            let src = random_raster(width, height, offset, (width * 17 + height) as u64);
            let (w, h) = (width.div_ceil(2), height.div_ceil(2));
            let mut actual = TestImage::<f32>::new(w, h, offset);
            let mut expected = TestImage::<f32>::new(w, h, 0);
            pooling_2x2_max_2x2(&src.view(), &mut actual.view_mut());
            scalar::pooling_2x2_max_2x2(&src.view(), &mut expected.view_mut());
            assert_eq!(actual.pixels(), expected.pixels(), "{width}x{height} offset {offset}");
        }
    }
}

#[test]
fn test_2x2_max_3x3_matches_scalar() {
    for (width, height) in SIZES {
        for offset in [0, 1] {
            let src = random_raster(width, height, offset, (width * 13 + height) as u64);
            let (w, h) = (width / 2, height / 2);
            let mut actual = TestImage::<f32>::new(w, h, offset);
            let mut expected = TestImage::<f32>::new(w, h, 0);
            pooling_2x2_max_3x3(&src.view(), &mut actual.view_mut());
            scalar::pooling_2x2_max_3x3(&src.view(), &mut expected.view_mut());
            assert_eq!(actual.pixels(), expected.pixels(), "{width}x{height} offset {offset}");
        }
    }
}

#[test]
fn test_1x1_max_3x3_clips_at_borders() {
    // 1 2 3
    // 4 5 6
    let src = TestImage::from_slice(3, 2, 0, &[1.0f32, 2.0, 3.0, 4.0, 5.0, 6.0]);
    let mut dst = TestImage::<f32>::new(3, 2, 0);
    pooling_1x1_max_3x3(&src.view(), &mut dst.view_mut());
    assert_eq!(dst.pixels(), vec![5.0, 6.0, 6.0, 5.0, 6.0, 6.0]);
}

#[test]
fn test_2x2_max_2x2_odd_edges() {
    // 1 9 2
    // 3 4 8
    // 7 0 5
    let src = TestImage::from_slice(3, 3, 0, &[1.0f32, 9.0, 2.0, 3.0, 4.0, 8.0, 7.0, 0.0, 5.0]);
    let mut dst = TestImage::<f32>::new(2, 2, 0);
    pooling_2x2_max_2x2(&src.view(), &mut dst.view_mut());
    assert_eq!(dst.pixels(), vec![9.0, 8.0, 7.0, 5.0]);
}

#[test]
fn test_2x2_max_3x3_overlapping_windows() {
    // Values increase left to right and top to bottom, so each window's
    // maximum sits at its clipped bottom-right corner.
    let (width, height) = (6, 5);
    let src = TestImage::from_fn(width, height, 0, |x, y| (y * width + x) as f32);
    let mut dst = TestImage::<f32>::new(3, 2, 0);
    pooling_2x2_max_3x3(&src.view(), &mut dst.view_mut());
    assert_eq!(dst.pixels(), vec![14.0, 16.0, 17.0, 26.0, 28.0, 29.0]);
}

#[test]
fn test_negative_values_survive() {
    let src = TestImage::from_fn(9, 4, 1, |_, _| -3.5f32);
    let mut dst = TestImage::<f32>::new(5, 2, 0);
    pooling_2x2_max_2x2(&src.view(), &mut dst.view_mut());
    assert!(dst.pixels().iter().all(|&v| v == -3.5));
}

#[test]
#[should_panic(expected = "needs a 2x2 output")]
fn test_wrong_output_size_panics() {
    let src = TestImage::<f32>::new(4, 5, 0);
    let mut dst = TestImage::<f32>::new(2, 3, 0);
    pooling_2x2_max_3x3(&src.view(), &mut dst.view_mut());
}

//! Tests for `view` module

use super::error::Error;
use super::view::*;

#[test]
fn test_raster_rows_skip_padding() {
    let data: Vec<u8> = (0..20).collect();
    let raster = Raster::new(&data, 8, 5, 2).unwrap();
    assert_eq!(raster.row(0), &[0, 1, 2, 3, 4]);
    assert_eq!(raster.row(1), &[8, 9, 10, 11, 12]);
    assert_eq!(raster.area(), 10);
    assert_eq!(raster.stride_bytes(), 8);
}

#[test]
fn test_last_row_needs_only_width() {
    // (height - 1) * stride + width = 13 elements.
    let data = vec![0u8; 13];
    assert!(Raster::new(&data, 8, 5, 2).is_ok());
    let err = Raster::new(&data[..12], 8, 5, 2).unwrap_err();
    assert!(matches!(
        err,
        Error::RasterExtent {
            required: 13,
            actual: 12,
            ..
        }
    ));
}

#[test]
fn test_stride_below_width_rejected() {
    let data = vec![0u8; 64];
    let err = Raster::new(&data, 4, 5, 2).unwrap_err();
    assert!(matches!(err, Error::InvalidStride { stride: 4, width: 5 }));
}

#[test]
fn test_overflowing_extent_rejected() {
    // 2 * stride wraps to 0, so an unchecked extent would claim 1 element.
    let stride = usize::MAX / 2 + 1;
    let mut data = vec![0u8; 1];
    let err = Raster::new(&data, stride, 1, 3).unwrap_err();
    assert!(matches!(err, Error::RasterOverflow { height: 3, .. }));
    let err = RasterMut::new(&mut data, stride, 1, 3).unwrap_err();
    assert!(matches!(err, Error::RasterOverflow { width: 1, .. }));
    // A single row never multiplies the stride.
    assert!(Raster::new(&data, stride, 1, 1).is_ok());
}

#[test]
fn test_empty_raster() {
    let raster = Raster::<u8>::new(&[], 0, 0, 0).unwrap();
    assert_eq!(raster.area(), 0);
}

#[test]
fn test_alignment_accounts_for_stride_bytes() {
    let buffer = crate::memory::AlignedBuffer::<f32>::new(64).unwrap();
    // 16 floats = 64 bytes per row.
    assert!(Raster::new(&buffer, 16, 10, 4).unwrap().is_aligned(64));
    // 12 floats = 48 bytes: rows after the first are misaligned.
    assert!(!Raster::new(&buffer, 12, 10, 4).unwrap().is_aligned(64));
    assert!(Raster::new(&buffer, 12, 10, 4).unwrap().is_aligned(16));
    // Offset base pointer.
    assert!(!Raster::new(&buffer[1..], 16, 10, 3).unwrap().is_aligned(16));
}

#[test]
fn test_raster_mut_fill_keeps_padding() {
    let mut data = vec![9i16; 12];
    let mut raster = RasterMut::new(&mut data, 4, 3, 3).unwrap();
    raster.fill(1);
    raster.row_mut(2)[0] = 5;
    assert_eq!(raster.as_raster().row(2), &[5, 1, 1]);
    assert_eq!(data, vec![1, 1, 1, 9, 1, 1, 1, 9, 5, 1, 1, 9]);
}

#[test]
fn test_same_size() {
    let a = vec![0u8; 12];
    let b = vec![0.0f32; 40];
    let small = Raster::packed(&a, 4, 3).unwrap();
    let wide = Raster::new(&b, 10, 4, 3).unwrap();
    assert!(small.same_size(&wide));
    assert!(!small.same_size(&Raster::packed(&a, 3, 4).unwrap()));
}

//! Shared fixtures for unit tests.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::memory::{align_hi, AlignedBuffer, Element, SIMD_ALIGN};
use crate::view::{Raster, RasterMut};

/// Widths around every vector boundary up to 64 bytes, plus a long row.
pub(crate) const BOUNDARY_WIDTHS: [usize; 13] = [1, 3, 15, 16, 17, 31, 32, 33, 63, 64, 65, 100, 257];

pub(crate) fn random_bytes(len: usize, seed: u64) -> Vec<u8> {
    let mut rng = StdRng::seed_from_u64(seed);
    (0..len).map(|_| rng.gen()).collect()
}

pub(crate) fn random_f32(len: usize, seed: u64, lo: f32, hi: f32) -> Vec<f32> {
    let mut rng = StdRng::seed_from_u64(seed);
    (0..len).map(|_| rng.gen_range(lo..hi)).collect()
}

/// Raster stored in an aligned allocation, starting `offset` elements in.
///
/// With `offset == 0` the view is vector-aligned for every ISA; any other
/// offset makes it unaligned, which exercises the `ALIGN = false` bodies.
pub(crate) struct TestImage<T: Element> {
    buffer: AlignedBuffer<T>,
    offset: usize,
    stride: usize,
    width: usize,
    height: usize,
}

impl<T: Element> TestImage<T> {
    pub(crate) fn new(width: usize, height: usize, offset: usize) -> Self {
        let lanes = SIMD_ALIGN / std::mem::size_of::<T>();
        let stride = align_hi(width.max(1), lanes);
        let buffer = AlignedBuffer::new(offset + stride * height).expect("test allocation");
        Self {
            buffer,
            offset,
            stride,
            width,
            height,
        }
    }

    pub(crate) fn from_fn(
        width: usize,
        height: usize,
        offset: usize,
        mut f: impl FnMut(usize, usize) -> T,
    ) -> Self {
        let mut image = Self::new(width, height, offset);
        for y in 0..height {
            let start = offset + y * image.stride;
            for x in 0..width {
                image.buffer[start + x] = f(x, y);
            }
        }
        image
    }

    pub(crate) fn from_slice(width: usize, height: usize, offset: usize, data: &[T]) -> Self {
        Self::from_fn(width, height, offset, |x, y| data[y * width + x])
    }

    pub(crate) fn view(&self) -> Raster<'_, T> {
        Raster::new(&self.buffer[self.offset..], self.stride, self.width, self.height)
            .expect("valid test raster")
    }

    pub(crate) fn view_mut(&mut self) -> RasterMut<'_, T> {
        RasterMut::new(
            &mut self.buffer[self.offset..],
            self.stride,
            self.width,
            self.height,
        )
        .expect("valid test raster")
    }

    /// Valid pixels in row-major order, padding dropped.
    pub(crate) fn pixels(&self) -> Vec<T> {
        let view = self.view();
        (0..self.height).flat_map(|y| view.row(y).to_vec()).collect()
    }
}

/// Random byte image.
pub(crate) fn random_image(width: usize, height: usize, offset: usize, seed: u64) -> TestImage<u8> {
    let data = random_bytes(width * height, seed);
    TestImage::from_slice(width, height, offset, &data)
}

pub(crate) fn assert_close(actual: &[f32], expected: &[f32], tolerance: f32) {
    assert_eq!(actual.len(), expected.len());
    for (i, (a, e)) in actual.iter().zip(expected).enumerate() {
        assert!(
            (a - e).abs() <= tolerance * e.abs().max(1.0),
            "element {i}: got {a}, expected {e}"
        );
    }
}

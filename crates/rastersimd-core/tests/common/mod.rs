//! Raster fixtures shared by the integration tests.

#![allow(dead_code)]

use rastersimd_core::memory::{align_hi, AlignedBuffer, Element, SIMD_ALIGN};
use rastersimd_core::{Raster, RasterMut};

/// Owned raster whose placement is chosen by the test.
pub struct Image<T: Element> {
    buffer: AlignedBuffer<T>,
    offset: usize,
    stride: usize,
    pub width: usize,
    pub height: usize,
}

impl<T: Element> Image<T> {
    /// Base pointer and byte stride both aligned to [`SIMD_ALIGN`].
    pub fn aligned(width: usize, height: usize, pixels: &[T]) -> Self {
        let lanes = SIMD_ALIGN / std::mem::size_of::<T>();
        Self::place(width, height, 0, align_hi(width.max(1), lanes), pixels)
    }

    /// Base pointer one element past an aligned address and an odd stride,
    /// so no row is vector-aligned.
    pub fn unaligned(width: usize, height: usize, pixels: &[T]) -> Self {
        Self::place(width, height, 1, width | 1, pixels)
    }

    fn place(width: usize, height: usize, offset: usize, stride: usize, pixels: &[T]) -> Self {
        assert_eq!(pixels.len(), width * height);
        let mut buffer = AlignedBuffer::new(offset + stride * height + 1).expect("test allocation");
        for (y, row) in pixels.chunks_exact(width.max(1)).enumerate().take(height) {
            let start = offset + y * stride;
            buffer[start..start + width].copy_from_slice(row);
        }
        Self {
            buffer,
            offset,
            stride,
            width,
            height,
        }
    }

    pub fn view(&self) -> Raster<'_, T> {
        Raster::new(&self.buffer[self.offset..], self.stride, self.width, self.height).expect("valid raster")
    }

    pub fn view_mut(&mut self) -> RasterMut<'_, T> {
        RasterMut::new(&mut self.buffer[self.offset..], self.stride, self.width, self.height)
            .expect("valid raster")
    }

    /// Valid pixels in row-major order.
    pub fn pixels(&self) -> Vec<T> {
        let view = self.view();
        (0..self.height).flat_map(|y| view.row(y).to_vec()).collect()
    }
}

/// Deterministic pseudo-random bytes.
pub fn bytes(len: usize, seed: u64) -> Vec<u8> {
    use rand::{Rng, SeedableRng};
    let mut rng = rand::rngs::StdRng::seed_from_u64(seed);
    (0..len).map(|_| rng.gen()).collect()
}

/// Deterministic pseudo-random floats in `[lo, hi)`.
pub fn floats(len: usize, seed: u64, lo: f32, hi: f32) -> Vec<f32> {
    use rand::{Rng, SeedableRng};
    let mut rng = rand::rngs::StdRng::seed_from_u64(seed);
    (0..len).map(|_| rng.gen_range(lo..hi)).collect()
}

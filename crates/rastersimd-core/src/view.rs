//! Borrowed 2-D raster views.
//!
//! A raster is `(data, stride, width, height)`: row `y` starts at element
//! `y * stride` and holds `width` valid elements. Strides are expressed in
//! elements; alignment checks convert them to bytes. Views are validated once
//! at construction so kernels can iterate with raw pointers afterwards.

use std::mem::size_of;

use crate::error::{Error, Result};
use crate::memory;

/// Minimum slice length for a `width x height` raster with `stride`, or
/// `None` when it does not fit in `usize`.
#[inline]
fn required_len(stride: usize, width: usize, height: usize) -> Option<usize> {
    if height == 0 || width == 0 {
        Some(0)
    } else {
        (height - 1).checked_mul(stride)?.checked_add(width)
    }
}

fn validate(len: usize, stride: usize, width: usize, height: usize) -> Result<()> {
    if stride < width {
        return Err(Error::InvalidStride { stride, width });
    }
    let Some(required) = required_len(stride, width, height) else {
        return Err(Error::RasterOverflow { width, height, stride });
    };
    if len < required {
        return Err(Error::RasterExtent {
            width,
            height,
            stride,
            required,
            actual: len,
        });
    }
    Ok(())
}

/// Read-only raster view.
#[derive(Debug, Clone, Copy)]
pub struct Raster<'a, T> {
    data: &'a [T],
    stride: usize,
    width: usize,
    height: usize,
}

impl<'a, T: Copy> Raster<'a, T> {
    /// Creates a view of `height` rows of `width` elements, `stride` elements apart.
    pub fn new(data: &'a [T], stride: usize, width: usize, height: usize) -> Result<Self> {
        validate(data.len(), stride, width, height)?;
        Ok(Self {
            data,
            stride,
            width,
            height,
        })
    }

    /// Creates a view whose rows are tightly packed (`stride == width`).
    pub fn packed(data: &'a [T], width: usize, height: usize) -> Result<Self> {
        Self::new(data, width, width, height)
    }

    /// Row width in elements.
    #[inline]
    #[must_use]
    pub fn width(&self) -> usize {
        self.width
    }

    /// Number of rows.
    #[inline]
    #[must_use]
    pub fn height(&self) -> usize {
        self.height
    }

    /// Row stride in elements.
    #[inline]
    #[must_use]
    pub fn stride(&self) -> usize {
        self.stride
    }

    /// Row stride in bytes.
    #[inline]
    #[must_use]
    pub fn stride_bytes(&self) -> usize {
        self.stride * size_of::<T>()
    }

    /// Total number of pixels (`width * height`).
    #[inline]
    #[must_use]
    pub fn area(&self) -> usize {
        self.width * self.height
    }

    /// Returns true when the base pointer and the byte stride are both
    /// multiples of `align`.
    #[inline]
    #[must_use]
    pub fn is_aligned(&self, align: usize) -> bool {
        memory::is_aligned_ptr(self.data.as_ptr(), align)
            && memory::is_aligned(self.stride_bytes(), align)
    }

    /// Returns the `width` valid elements of row `y`.
    #[inline]
    #[must_use]
    pub fn row(&self, y: usize) -> &'a [T] {
        let start = y * self.stride;
        &self.data[start..start + self.width]
    }

    /// Pointer to the first element.
    #[inline]
    #[must_use]
    pub fn as_ptr(&self) -> *const T {
        self.data.as_ptr()
    }

    /// Underlying slice.
    #[inline]
    #[must_use]
    pub fn data(&self) -> &'a [T] {
        self.data
    }

    /// Returns true when both views have the same width and height.
    #[inline]
    #[must_use]
    pub fn same_size<U>(&self, other: &Raster<'_, U>) -> bool {
        self.width == other.width && self.height == other.height
    }
}

/// Mutable raster view.
#[derive(Debug)]
pub struct RasterMut<'a, T> {
    data: &'a mut [T],
    stride: usize,
    width: usize,
    height: usize,
}

impl<'a, T: Copy> RasterMut<'a, T> {
    /// Creates a mutable view of `height` rows of `width` elements, `stride` elements apart.
    pub fn new(data: &'a mut [T], stride: usize, width: usize, height: usize) -> Result<Self> {
        validate(data.len(), stride, width, height)?;
        Ok(Self {
            data,
            stride,
            width,
            height,
        })
    }

    /// Creates a mutable view whose rows are tightly packed.
    pub fn packed(data: &'a mut [T], width: usize, height: usize) -> Result<Self> {
        Self::new(data, width, width, height)
    }

    /// Row width in elements.
    #[inline]
    #[must_use]
    pub fn width(&self) -> usize {
        self.width
    }

    /// Number of rows.
    #[inline]
    #[must_use]
    pub fn height(&self) -> usize {
        self.height
    }

    /// Row stride in elements.
    #[inline]
    #[must_use]
    pub fn stride(&self) -> usize {
        self.stride
    }

    /// Row stride in bytes.
    #[inline]
    #[must_use]
    pub fn stride_bytes(&self) -> usize {
        self.stride * size_of::<T>()
    }

    /// Returns true when the base pointer and the byte stride are both
    /// multiples of `align`.
    #[inline]
    #[must_use]
    pub fn is_aligned(&self, align: usize) -> bool {
        memory::is_aligned_ptr(self.data.as_ptr(), align)
            && memory::is_aligned(self.stride_bytes(), align)
    }

    /// Returns the `width` valid elements of row `y`.
    #[inline]
    #[must_use]
    pub fn row(&self, y: usize) -> &[T] {
        let start = y * self.stride;
        &self.data[start..start + self.width]
    }

    /// Returns the `width` valid elements of row `y` for writing.
    #[inline]
    pub fn row_mut(&mut self, y: usize) -> &mut [T] {
        let start = y * self.stride;
        &mut self.data[start..start + self.width]
    }

    /// Pointer to the first element.
    #[inline]
    #[must_use]
    pub fn as_ptr(&self) -> *const T {
        self.data.as_ptr()
    }

    /// Mutable pointer to the first element.
    #[inline]
    pub fn as_mut_ptr(&mut self) -> *mut T {
        self.data.as_mut_ptr()
    }

    /// Reborrows as a read-only view.
    #[inline]
    #[must_use]
    pub fn as_raster(&self) -> Raster<'_, T> {
        Raster {
            data: self.data,
            stride: self.stride,
            width: self.width,
            height: self.height,
        }
    }

    /// Sets every valid element to `value`, leaving row padding untouched.
    pub fn fill(&mut self, value: T) {
        for y in 0..self.height {
            self.row_mut(y).fill(value);
        }
    }
}

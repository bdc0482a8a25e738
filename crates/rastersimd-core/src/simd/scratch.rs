//! Per-call scratch buffers.
//!
//! Scratch memory is owned by one kernel call: allocated on entry, released
//! on return, never shared. Its start is aligned to [`SIMD_ALIGN`] and its
//! row strides are vector multiples, so kernels may use aligned accesses on
//! it regardless of how the caller's buffers are aligned.

use std::mem::size_of;

use crate::memory::{align_hi, Element, SIMD_ALIGN};

/// Zero-initialized scratch slice whose first element is `SIMD_ALIGN`-aligned.
pub(crate) struct AlignedScratch<T: Element> {
    storage: Vec<T>,
    offset: usize,
    len: usize,
}

impl<T: Element> AlignedScratch<T> {
    pub(crate) fn zeroed(len: usize) -> Self {
        let slack = SIMD_ALIGN / size_of::<T>();
        let storage = vec![T::default(); len + slack];
        let addr = storage.as_ptr() as usize;
        let offset = (align_hi(addr, SIMD_ALIGN) - addr) / size_of::<T>();
        Self {
            storage,
            offset,
            len,
        }
    }

    #[inline]
    pub(crate) fn as_slice(&self) -> &[T] {
        &self.storage[self.offset..self.offset + self.len]
    }

    #[inline]
    pub(crate) fn as_mut_slice(&mut self) -> &mut [T] {
        &mut self.storage[self.offset..self.offset + self.len]
    }

    #[inline]
    pub(crate) fn fill(&mut self, value: T) {
        self.as_mut_slice().fill(value);
    }
}

/// Sliding window over the last `depth` rows of an image.
///
/// Rows live in one aligned arena and are addressed through a rotating head
/// index. [`RowWindow::push_row`] overwrites the oldest row and makes it the
/// newest; no row is ever reallocated. Each row holds `lead` zero elements,
/// then the pushed data, then zero padding up to a vector-multiple stride,
/// which lets stencil kernels read `lead` elements to the left and right of
/// a row without bounds checks.
pub struct RowWindow<T: Element> {
    arena: AlignedScratch<T>,
    depth: usize,
    stride: usize,
    lead: usize,
    width: usize,
    head: usize,
}

impl<T: Element> RowWindow<T> {
    /// Creates a zeroed window of `depth` rows able to hold `width` elements
    /// with `lead` elements of zero padding on both sides.
    ///
    /// `lanes` is the vector width in elements the stride is rounded to.
    #[must_use]
    pub fn new(depth: usize, width: usize, lead: usize, lanes: usize) -> Self {
        assert!(depth > 0, "row window needs at least one row");
        let stride = align_hi(width + 2 * lead, lanes.max(1));
        Self {
            arena: AlignedScratch::zeroed(depth * stride),
            depth,
            stride,
            lead,
            width,
            head: 0,
        }
    }

    /// Number of rows in the window.
    #[inline]
    #[must_use]
    pub fn depth(&self) -> usize {
        self.depth
    }

    /// Elements between row starts.
    #[inline]
    #[must_use]
    pub fn stride(&self) -> usize {
        self.stride
    }

    /// Replaces the oldest row with `src` (or zeros when `None`), which becomes the newest row.
    pub fn push_row(&mut self, src: Option<&[T]>) {
        let start = self.head * self.stride + self.lead;
        let slot = &mut self.arena.as_mut_slice()[start..start + self.width];
        match src {
            Some(src) => slot.copy_from_slice(&src[..self.width]),
            None => slot.fill(T::default()),
        }
        self.head = (self.head + 1) % self.depth;
    }

    /// Row `i` of the window, oldest first, including its padding.
    #[inline]
    #[must_use]
    pub fn row(&self, i: usize) -> &[T] {
        let physical = (self.head + i) % self.depth;
        let start = physical * self.stride;
        &self.arena.as_slice()[start..start + self.stride]
    }

    /// All rows, oldest first.
    pub fn rows(&self) -> impl Iterator<Item = &[T]> + '_ {
        (0..self.depth).map(move |i| self.row(i))
    }
}

/// Column accumulators for the column-sum reducers.
///
/// Byte columns are first summed into 16-bit lanes for at most
/// [`ColumnSums::STEP`] rows (255 * 128 fits in u16), then folded into the
/// 32-bit totals.
pub(crate) struct ColumnSums {
    pub(crate) sums16: AlignedScratch<u16>,
    pub(crate) sums32: AlignedScratch<u32>,
}

impl ColumnSums {
    pub(crate) const STEP: usize = 128;

    pub(crate) fn new(width: usize, lanes: usize) -> Self {
        let width = align_hi(width, lanes);
        Self {
            sums16: AlignedScratch::zeroed(width),
            sums32: AlignedScratch::zeroed(width),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scratch_is_aligned_and_zeroed() {
        for len in [1usize, 7, 64, 1000] {
            let scratch = AlignedScratch::<f32>::zeroed(len);
            assert_eq!(scratch.as_slice().len(), len);
            assert_eq!(scratch.as_slice().as_ptr() as usize % SIMD_ALIGN, 0);
            assert!(scratch.as_slice().iter().all(|&v| v == 0.0));
        }
    }

    #[test]
    fn test_row_window_rotates_oldest_first() {
        let mut window = RowWindow::<f32>::new(3, 4, 2, 4);
        assert_eq!(window.stride(), 8);
        window.push_row(Some(&[1.0; 4]));
        window.push_row(Some(&[2.0; 4]));
        window.push_row(Some(&[3.0; 4]));
        let firsts: Vec<f32> = window.rows().map(|row| row[2]).collect();
        assert_eq!(firsts, vec![1.0, 2.0, 3.0]);

        window.push_row(None);
        let firsts: Vec<f32> = window.rows().map(|row| row[2]).collect();
        assert_eq!(firsts, vec![2.0, 3.0, 0.0]);
    }

    #[test]
    fn test_row_window_keeps_padding_zero() {
        let mut window = RowWindow::<f32>::new(2, 3, 1, 4);
        window.push_row(Some(&[5.0, 6.0, 7.0]));
        let newest = window.row(1);
        assert_eq!(&newest[..5], &[0.0, 5.0, 6.0, 7.0, 0.0]);
        assert!(newest[5..].iter().all(|&v| v == 0.0));
    }
}

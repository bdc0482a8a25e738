//! Aligned memory primitives.
//!
//! Kernels pick their fastest load/store form only when every buffer they
//! touch starts on a vector boundary and every row stride is a multiple of it.
//! This module provides the rounding helpers used to split an iteration range
//! into a vector body and a tail, the alignment predicates used by runtime
//! selectors, and [`AlignedBuffer`], an owned zero-initialized allocation that
//! satisfies those predicates.
//!
//! # Usage
//!
//! ```rust
//! use rastersimd_core::memory::{align_hi, AlignedBuffer, SIMD_ALIGN};
//!
//! let width = 37;
//! let stride = align_hi(width, SIMD_ALIGN);
//! let image = AlignedBuffer::<u8>::new(stride * 10)?;
//! assert!(rastersimd_core::memory::is_aligned_ptr(image.as_ptr(), SIMD_ALIGN));
//! # Ok::<(), rastersimd_core::Error>(())
//! ```

use std::alloc::{alloc_zeroed, dealloc, Layout};
use std::fmt;
use std::ops::{Deref, DerefMut};
use std::ptr::NonNull;

use crate::error::{Error, Result};

/// Widest vector register alignment used by any kernel (AVX-512).
pub const SIMD_ALIGN: usize = 64;

/// Rounds `value` down to a multiple of the power-of-two `align`.
#[inline]
#[must_use]
pub const fn align_lo(value: usize, align: usize) -> usize {
    debug_assert!(align.is_power_of_two());
    value & !(align - 1)
}

/// Rounds `value` up to a multiple of the power-of-two `align`.
#[inline]
#[must_use]
pub const fn align_hi(value: usize, align: usize) -> usize {
    debug_assert!(align.is_power_of_two());
    (value + align - 1) & !(align - 1)
}

/// Returns true when `value` (a byte offset or stride) is a multiple of `align`.
#[inline]
#[must_use]
pub const fn is_aligned(value: usize, align: usize) -> bool {
    value & (align - 1) == 0
}

/// Returns true when `ptr` lies on an `align`-byte boundary.
#[inline]
#[must_use]
pub fn is_aligned_ptr<T>(ptr: *const T, align: usize) -> bool {
    is_aligned(ptr as usize, align)
}

mod sealed {
    pub trait Sealed {}
}

/// Plain numeric element types storable in an [`AlignedBuffer`].
///
/// Every implementor is valid for the all-zero bit pattern, which is what
/// [`AlignedBuffer`] relies on when it hands out zero-filled memory.
pub trait Element: Copy + Default + sealed::Sealed + 'static {}

macro_rules! impl_element {
    ($($ty:ty),* $(,)?) => {
        $(
            impl sealed::Sealed for $ty {}
            impl Element for $ty {}
        )*
    };
}

impl_element!(u8, i8, u16, i16, u32, i32, u64, i64, f32, f64, half::bf16);

/// Owned, zero-initialized, over-aligned element buffer.
///
/// The allocation is released when the buffer is dropped, including during
/// unwinding.
pub struct AlignedBuffer<T: Element> {
    ptr: NonNull<T>,
    len: usize,
    layout: Layout,
}

impl<T: Element> AlignedBuffer<T> {
    /// Allocates `len` zeroed elements aligned to [`SIMD_ALIGN`].
    pub fn new(len: usize) -> Result<Self> {
        Self::with_alignment(len, SIMD_ALIGN)
    }

    /// Allocates `len` zeroed elements aligned to `align` bytes.
    ///
    /// `align` must be a power of two. It is raised to the natural alignment
    /// of `T` when smaller.
    pub fn with_alignment(len: usize, align: usize) -> Result<Self> {
        if !align.is_power_of_two() {
            return Err(Error::InvalidAlignment(align));
        }
        let align = align.max(std::mem::align_of::<T>());
        let bytes = len
            .checked_mul(std::mem::size_of::<T>())
            .ok_or(Error::Allocation { bytes: usize::MAX, align })?;
        let layout =
            Layout::from_size_align(bytes, align).map_err(|_| Error::Allocation { bytes, align })?;

        if bytes == 0 {
            return Ok(Self {
                ptr: NonNull::dangling(),
                len,
                layout,
            });
        }

        // SAFETY: `alloc_zeroed` requires a valid non-zero layout.
        // - Condition 1: `bytes > 0` is checked above.
        // - Condition 2: `Layout::from_size_align` validated size and alignment.
        // Reason: Over-aligned raster storage cannot be expressed through `Vec`.
        let raw = unsafe { alloc_zeroed(layout) };
        let ptr = NonNull::new(raw.cast::<T>()).ok_or(Error::Allocation { bytes, align })?;
        tracing::trace!(bytes, align, "aligned buffer allocated");
        Ok(Self { ptr, len, layout })
    }

    /// Allocates an aligned copy of `data`.
    pub fn from_slice(data: &[T]) -> Result<Self> {
        let mut buffer = Self::new(data.len())?;
        buffer.copy_from_slice(data);
        Ok(buffer)
    }

    /// Number of elements.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.len
    }

    /// Returns true when the buffer holds no elements.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Alignment of the allocation in bytes.
    #[inline]
    #[must_use]
    pub fn alignment(&self) -> usize {
        self.layout.align()
    }

    /// Borrows the elements as a slice.
    #[inline]
    #[must_use]
    pub fn as_slice(&self) -> &[T] {
        // SAFETY: `ptr` is valid for `len` initialized elements.
        // - Condition 1: The allocation holds `len * size_of::<T>()` zeroed bytes, and
        //   zero is a valid `T` for every `Element`.
        // - Condition 2: For `len == 0` the dangling pointer is non-null and aligned.
        // Reason: Slice access to an owned raw allocation.
        unsafe { std::slice::from_raw_parts(self.ptr.as_ptr(), self.len) }
    }

    /// Borrows the elements as a mutable slice.
    #[inline]
    #[must_use]
    pub fn as_mut_slice(&mut self) -> &mut [T] {
        // SAFETY: Same invariants as `as_slice`; `&mut self` guarantees uniqueness.
        unsafe { std::slice::from_raw_parts_mut(self.ptr.as_ptr(), self.len) }
    }
}

impl<T: Element> Drop for AlignedBuffer<T> {
    fn drop(&mut self) {
        if self.layout.size() != 0 {
            // SAFETY: `dealloc` requires the original pointer/layout pair.
            // - Condition 1: `self.ptr` was produced by `alloc_zeroed(self.layout)`.
            // - Condition 2: Zero-size buffers never allocated and are skipped above.
            // Reason: Manual deallocation is needed for raw-memory RAII.
            unsafe {
                dealloc(self.ptr.as_ptr().cast::<u8>(), self.layout);
            }
        }
    }
}

impl<T: Element> Deref for AlignedBuffer<T> {
    type Target = [T];

    fn deref(&self) -> &[T] {
        self.as_slice()
    }
}

impl<T: Element> DerefMut for AlignedBuffer<T> {
    fn deref_mut(&mut self) -> &mut [T] {
        self.as_mut_slice()
    }
}

impl<T: Element + fmt::Debug> fmt::Debug for AlignedBuffer<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AlignedBuffer")
            .field("len", &self.len)
            .field("align", &self.layout.align())
            .finish_non_exhaustive()
    }
}

// SAFETY: `AlignedBuffer` owns its allocation exclusively.
// - Condition 1: No aliasing references are stored, only pointer + layout metadata.
// - Condition 2: `Element` types are plain numeric values with no thread affinity.
// Reason: Heap allocations are not thread-affine; ownership transfer across threads is sound.
unsafe impl<T: Element> Send for AlignedBuffer<T> {}

// SAFETY: Shared access only hands out `&[T]`, which is `Sync` for plain numeric `T`.
unsafe impl<T: Element> Sync for AlignedBuffer<T> {}

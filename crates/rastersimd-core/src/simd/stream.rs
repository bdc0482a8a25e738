//! Block streaming helpers with cross-block realignment.
//!
//! Some vector units can only address memory at block boundaries. Reading a
//! block that starts mid-boundary then means loading the two aligned blocks it
//! straddles and splicing them. [`Loader`] does this with one carry block: each
//! call fetches a single new aligned block and combines it with the one kept
//! from the previous call. [`Storer`] is the write-side twin. It completes an
//! aligned block with the head of each new vector, keeps the tail as carry, and
//! needs an explicit [`Storer::flush`] to emit the final partial block.
//!
//! With `ALIGN = true` the slice must start on a block boundary and both
//! helpers degrade to plain block copies.

use crate::memory::Element;

/// Element offset of `ptr` inside its `LANES`-element block.
#[inline]
fn block_offset<T, const LANES: usize>(ptr: *const T) -> usize {
    let block_bytes = LANES * std::mem::size_of::<T>();
    (ptr as usize % block_bytes) / std::mem::size_of::<T>()
}

/// Sequential block reader.
#[derive(Debug)]
pub struct Loader<'a, T: Element, const LANES: usize, const ALIGN: bool> {
    src: &'a [T],
    offset: usize,
    index: usize,
    carry: [T; LANES],
}

impl<'a, T: Element, const LANES: usize, const ALIGN: bool> Loader<'a, T, LANES, ALIGN> {
    /// Starts streaming `src` from its first element.
    #[must_use]
    pub fn new(src: &'a [T]) -> Self {
        let offset = if ALIGN {
            0
        } else {
            block_offset::<T, LANES>(src.as_ptr())
        };
        debug_assert!(
            !ALIGN || block_offset::<T, LANES>(src.as_ptr()) == 0,
            "aligned loader over a misaligned slice"
        );
        let mut loader = Self {
            src,
            offset,
            index: 0,
            carry: [T::default(); LANES],
        };
        if offset != 0 {
            loader.carry = loader.aligned_block(0);
        }
        loader
    }

    /// Reads aligned block `k`, i.e. source elements `[k*LANES - offset, (k+1)*LANES - offset)`.
    /// Positions outside the slice read as zero and never reach the caller.
    fn aligned_block(&self, k: usize) -> [T; LANES] {
        let mut block = [T::default(); LANES];
        let base = k * LANES;
        for (lane, slot) in block.iter_mut().enumerate() {
            if let Some(pos) = (base + lane).checked_sub(self.offset) {
                if let Some(&value) = self.src.get(pos) {
                    *slot = value;
                }
            }
        }
        block
    }

    /// Returns the next `LANES` source elements.
    ///
    /// # Panics
    ///
    /// Panics when fewer than `LANES` elements remain.
    pub fn next_block(&mut self) -> [T; LANES] {
        let start = self.index * LANES;
        assert!(start + LANES <= self.src.len(), "loader read past the end");
        self.index += 1;
        if self.offset == 0 {
            let mut out = [T::default(); LANES];
            out.copy_from_slice(&self.src[start..start + LANES]);
            return out;
        }
        let next = self.aligned_block(self.index);
        let mut out = [T::default(); LANES];
        let split = LANES - self.offset;
        out[..split].copy_from_slice(&self.carry[self.offset..]);
        out[split..].copy_from_slice(&next[..self.offset]);
        self.carry = next;
        out
    }

    /// Number of whole blocks left.
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.src.len() / LANES - self.index
    }
}

/// Sequential block writer.
#[derive(Debug)]
#[must_use = "call `flush` to write the final partial block"]
pub struct Storer<'a, T: Element, const LANES: usize, const ALIGN: bool> {
    dst: &'a mut [T],
    offset: usize,
    index: usize,
    carry: [T; LANES],
}

impl<'a, T: Element, const LANES: usize, const ALIGN: bool> Storer<'a, T, LANES, ALIGN> {
    /// Starts streaming into `dst` from its first element.
    pub fn new(dst: &'a mut [T]) -> Self {
        let offset = if ALIGN {
            0
        } else {
            block_offset::<T, LANES>(dst.as_ptr())
        };
        debug_assert!(
            !ALIGN || block_offset::<T, LANES>(dst.as_ptr()) == 0,
            "aligned storer over a misaligned slice"
        );
        Self {
            dst,
            offset,
            index: 0,
            carry: [T::default(); LANES],
        }
    }

    /// Queues the next `LANES` destination elements.
    ///
    /// Writes every destination block that is now complete. The last
    /// `offset` elements stay in the carry until the next call or `flush`.
    ///
    /// # Panics
    ///
    /// Panics when fewer than `LANES` destination elements remain.
    pub fn store(&mut self, block: &[T; LANES]) {
        let start = self.index * LANES;
        assert!(start + LANES <= self.dst.len(), "storer wrote past the end");
        self.index += 1;
        if self.offset == 0 {
            self.dst[start..start + LANES].copy_from_slice(block);
            return;
        }
        let split = LANES - self.offset;
        if start >= self.offset {
            // Head of this aligned block comes from the previous vector.
            self.dst[start - self.offset..start].copy_from_slice(&self.carry[split..]);
        }
        self.dst[start..start + split].copy_from_slice(&block[..split]);
        self.carry[split..].copy_from_slice(&block[split..]);
    }

    /// Writes the carried tail of the last stored vector.
    pub fn flush(self) {
        if self.offset == 0 || self.index == 0 {
            return;
        }
        let end = self.index * LANES;
        let split = LANES - self.offset;
        self.dst[end - self.offset..end].copy_from_slice(&self.carry[split..]);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_loader_realigns_every_offset() {
        let data: Vec<u8> = (0..=255u8).collect();
        for offset in 0..16 {
            let src = &data[offset..offset + 64];
            let mut loader = Loader::<u8, 16, false>::new(src);
            assert_eq!(loader.remaining(), 4);
            for k in 0..4 {
                let block = loader.next_block();
                assert_eq!(&block[..], &src[k * 16..k * 16 + 16], "offset={offset} k={k}");
            }
            assert_eq!(loader.remaining(), 0);
        }
    }

    #[test]
    fn test_storer_realigns_every_offset() {
        let blocks: Vec<[u8; 16]> = (0..3u8)
            .map(|k| std::array::from_fn(|i| k * 16 + i as u8 + 1))
            .collect();
        let expected: Vec<u8> = blocks.iter().flatten().copied().collect();
        for shift in 0..16 {
            let mut backing = vec![0u8; 96];
            let base = (16 - backing.as_ptr() as usize % 16) % 16;
            let start = base + shift;
            {
                let mut storer = Storer::<u8, 16, false>::new(&mut backing[start..start + 48]);
                for block in &blocks {
                    storer.store(block);
                }
                storer.flush();
            }
            assert_eq!(&backing[start..start + 48], &expected[..], "shift={shift}");
            assert!(backing[..start].iter().all(|&b| b == 0));
            assert!(backing[start + 48..].iter().all(|&b| b == 0));
        }
    }

    #[test]
    fn test_storer_without_flush_leaves_tail_unwritten() {
        let mut backing = vec![0u16; 64];
        let misalign = (backing.as_ptr() as usize % 16) / 2;
        let start = (8 - misalign) % 8 + 1;
        let block = [7u16; 8];
        {
            let dst = &mut backing[start..start + 8];
            let mut storer = Storer::<u16, 8, false>::new(dst);
            storer.store(&block);
            std::mem::forget(storer);
        }
        let written = backing[start..start + 8].iter().filter(|&&v| v == 7).count();
        assert_eq!(written, 7);
        let mut backing2 = vec![0u16; 64];
        {
            let dst = &mut backing2[start..start + 8];
            let mut storer = Storer::<u16, 8, false>::new(dst);
            storer.store(&block);
            storer.flush();
        }
        assert!(backing2[start..start + 8].iter().all(|&v| v == 7));
    }

    #[test]
    fn test_aligned_mode_copies_blocks() {
        let src = crate::memory::AlignedBuffer::<f32>::from_slice(&[1.0; 32]).unwrap();
        let mut dst = crate::memory::AlignedBuffer::<f32>::new(32).unwrap();
        let mut loader = Loader::<f32, 4, true>::new(&src);
        let mut storer = Storer::<f32, 4, true>::new(&mut dst);
        while loader.remaining() > 0 {
            storer.store(&loader.next_block());
        }
        storer.flush();
        assert!(dst.iter().all(|&v| (v - 1.0).abs() < f32::EPSILON));
    }
}

//! Tail-mask construction.
//!
//! Every kernel splits a row into `body = align_lo(width, V)` full vectors and
//! a remainder of `width - body` elements. The remainder is handled by one
//! final vector placed at `width - V` (overlapping the body) whose lanes that
//! were already processed are masked off. When `width` is a multiple of `V`
//! the tail step is skipped entirely.
//!
//! Two mask flavors are provided:
//! - bit masks (`tail_mask_*`) for ISAs with predicate registers (AVX-512),
//!   selecting the first `count` lanes of a masked load/store;
//! - byte masks (`right_not_zero`, `left_not_zero`) loaded into ordinary
//!   vectors and applied with a bitwise AND.

/// Zeros, then 0xFF, then zeros. Windows of this table form every byte mask.
static MASK_TABLE: [u8; 192] = {
    let mut table = [0u8; 192];
    let mut i = 64;
    while i < 128 {
        table[i] = 0xFF;
        i += 1;
    }
    table
};

/// Largest vector width, in bytes, a byte mask can describe.
pub const MAX_MASK_BYTES: usize = 64;

/// Bit mask selecting the first `count` lanes of a 64-lane vector.
#[inline]
#[must_use]
pub const fn tail_mask_64(count: usize) -> u64 {
    debug_assert!(count <= 64);
    if count >= 64 {
        u64::MAX
    } else {
        (1u64 << count) - 1
    }
}

/// Bit mask selecting the first `count` lanes of a 32-lane vector.
#[inline]
#[must_use]
#[allow(clippy::cast_possible_truncation)] // count <= 32 keeps the value within u32
pub const fn tail_mask_32(count: usize) -> u32 {
    tail_mask_64(if count > 32 { 32 } else { count }) as u32
}

/// Bit mask selecting the first `count` lanes of a 16-lane vector.
#[inline]
#[must_use]
#[allow(clippy::cast_possible_truncation)] // count <= 16 keeps the value within u16
pub const fn tail_mask_16(count: usize) -> u16 {
    tail_mask_64(if count > 16 { 16 } else { count }) as u16
}

/// `vector` bytes whose LAST `count` bytes are 0xFF and the rest zero.
///
/// Applied to the overlapping final vector at `width - vector`, this keeps
/// exactly the `count = width - body` elements the body loop did not cover.
#[inline]
#[must_use]
pub fn right_not_zero(count: usize, vector: usize) -> &'static [u8] {
    assert!(vector <= MAX_MASK_BYTES && count <= vector);
    let start = 64 - (vector - count);
    &MASK_TABLE[start..start + vector]
}

/// `vector` bytes whose FIRST `count` bytes are 0xFF and the rest zero.
#[inline]
#[must_use]
pub fn left_not_zero(count: usize, vector: usize) -> &'static [u8] {
    assert!(vector <= MAX_MASK_BYTES && count <= vector);
    let start = 128 - count;
    &MASK_TABLE[start..start + vector]
}

/// Number of leftover elements after the vector body of `width`.
#[inline]
#[must_use]
pub const fn tail_len(width: usize, lanes: usize) -> usize {
    width - crate::memory::align_lo(width, lanes)
}

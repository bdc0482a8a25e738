//! SIMD infrastructure shared by every kernel family.
//!
//! # Module Structure
//!
//! - `dispatch`: Runtime SIMD level detection, capped by configuration
//! - `tail`: Tail-mask construction for partial final vectors
//! - `stream`: `Loader`/`Storer` block streaming with realignment
//! - `scratch`: Per-call aligned scratch memory and the `RowWindow` ring
//! - `x86_sse41`, `x86_avx2`, `x86_avx512`: x86_64 load/store helpers
//! - `neon`: aarch64 helpers
//!
//! # Kernel layout
//!
//! Every raster family module (`statistic`, `difference`, `interference`,
//! `neural`) follows the same shape: a `scalar` reference, one file per ISA holding
//! bodies generic over `const ALIGN: bool`, and public entry points that
//! `match simd_level()` and pick the aligned body only when every buffer's
//! pointer and byte stride are vector-aligned. `synet` operators instead bind
//! one worker per ISA when they are constructed.
#![allow(clippy::doc_markdown)] // Contains ISA/architecture nomenclature in docs.

// =============================================================================
// Shared submodules
// =============================================================================

mod dispatch;
pub(crate) mod scratch;
pub mod stream;
pub mod tail;

pub use dispatch::{detected_simd_level, simd_level, warmup_simd_cache, SimdLevel};
pub use scratch::RowWindow;
pub use stream::{Loader, Storer};

// =============================================================================
// Unsafe Invariants Reference
// =============================================================================
// SAFETY: Shared invariants for SIMD unsafe blocks in this module tree and in
// every per-ISA kernel file.
// - Condition 1: All pointer arithmetic is derived from validated raster views
//   or slices; loop bounds prove each vector access lies inside the row
//   (body: `col + V <= width`; tail: one vector at `width - V`, `width >= V`).
// - Condition 2: Target-featured functions are called only after `simd_level()`
//   reported the matching level, which implies runtime feature detection.
// - Condition 3: Aligned load/store forms are used only when the selector
//   proved pointer and byte stride alignment for every buffer involved.
// Reason: Intrinsics and pointer math are required for hot-path SIMD performance.

// =============================================================================
// ISA helper submodules
// =============================================================================

#[cfg(target_arch = "x86_64")]
pub(crate) mod x86_sse41;

#[cfg(target_arch = "x86_64")]
pub(crate) mod x86_avx2;

#[cfg(target_arch = "x86_64")]
pub(crate) mod x86_avx512;

#[cfg(target_arch = "aarch64")]
pub(crate) mod neon;

// =============================================================================
// Tests (separate files per project rules)
// =============================================================================

#[cfg(test)]
mod dispatch_tests;

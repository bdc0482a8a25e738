//! # rastersimd-core
//!
//! Runtime-dispatched SIMD kernels for raster statistics, image difference
//! measures, small neural network primitives and bf16 tensor operations.
//!
//! ## Features
//!
//! - **One entry point per operation**: every kernel picks AVX-512, AVX2,
//!   SSE4.1, NEON or scalar code at run time
//! - **Alignment-aware bodies**: aligned loads and stores when every buffer
//!   allows them, unaligned otherwise, with identical results
//! - **Exact tails**: partial final vectors use masks or scalar remainders,
//!   never reading or writing past a row
//! - **Layered configuration**: cap the SIMD level or tune convolution
//!   strategies from TOML or `RASTERSIMD_*` variables
//!
//! ## Quick Start
//!
//! ```rust
//! use rastersimd_core::statistic::get_statistic;
//! use rastersimd_core::Raster;
//!
//! fn main() -> Result<(), rastersimd_core::Error> {
//!     let pixels = vec![128u8; 64];
//!     let image = Raster::packed(&pixels, 8, 8)?;
//!     let stats = get_statistic(&image);
//!     assert_eq!((stats.min, stats.max, stats.average), (128, 128, 128));
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
// Clippy lints configured in workspace Cargo.toml [workspace.lints.clippy]
#![cfg_attr(
    test,
    allow(
        clippy::cast_possible_truncation,
        clippy::cast_precision_loss,
        clippy::cast_sign_loss,
        clippy::cast_lossless,
        clippy::float_cmp,
        clippy::uninlined_format_args,
        clippy::manual_assert
    )
)]

pub mod config;
pub mod difference;
pub mod error;
pub mod interference;
pub mod memory;
pub mod neural;
pub mod simd;
pub mod statistic;
pub mod synet;
#[cfg(test)]
mod testing;
pub mod view;
#[cfg(test)]
mod view_tests;

pub use config::KernelConfig;
pub use error::{Error, Result};
pub use memory::{AlignedBuffer, Element, SIMD_ALIGN};
pub use simd::{simd_level, SimdLevel};
pub use statistic::{Moments, Statistic};
pub use view::{Raster, RasterMut};

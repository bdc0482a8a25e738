//! Runtime SIMD level detection.
//!
//! This module provides:
//! - `SimdLevel` enum for representing detected SIMD capability
//! - `simd_level()` for cached runtime detection, capped by configuration
//! - `warmup_simd_cache()` for eliminating cold-start latency

use serde::{Deserialize, Serialize};

use crate::config;

// =============================================================================
// Cached SIMD Level Detection
// =============================================================================

/// SIMD capability level detected at runtime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SimdLevel {
    /// AVX-512F + AVX-512BW available (x86_64 only).
    Avx512,
    /// AVX2 + FMA available (x86_64 only).
    Avx2,
    /// SSE4.1 available (x86_64 only).
    Sse41,
    /// NEON available (aarch64, always true).
    Neon,
    /// Scalar fallback.
    Scalar,
}

impl SimdLevel {
    /// Width in bytes of one vector register at this level.
    #[must_use]
    pub const fn vector_bytes(self) -> usize {
        match self {
            Self::Avx512 => 64,
            Self::Avx2 => 32,
            Self::Sse41 | Self::Neon => 16,
            Self::Scalar => 1,
        }
    }

    /// Returns true when a CPU running at `self` can also run kernels written for `other`.
    #[must_use]
    pub const fn includes(self, other: SimdLevel) -> bool {
        matches!(
            (self, other),
            (_, Self::Scalar)
                | (Self::Avx512, Self::Avx512 | Self::Avx2 | Self::Sse41)
                | (Self::Avx2, Self::Avx2 | Self::Sse41)
                | (Self::Sse41, Self::Sse41)
                | (Self::Neon, Self::Neon)
        )
    }
}

/// Cached detected level.
static DETECTED_LEVEL: std::sync::OnceLock<SimdLevel> = std::sync::OnceLock::new();

/// Cached effective level - detected once at first use, then capped by config.
static SIMD_LEVEL: std::sync::OnceLock<SimdLevel> = std::sync::OnceLock::new();

/// Detects the best available SIMD level for the current CPU.
fn detect_simd_level() -> SimdLevel {
    #[cfg(target_arch = "x86_64")]
    {
        let avx2 = is_x86_feature_detected!("avx2") && is_x86_feature_detected!("fma");
        if avx2 && is_x86_feature_detected!("avx512f") && is_x86_feature_detected!("avx512bw") {
            return SimdLevel::Avx512;
        }
        if avx2 {
            return SimdLevel::Avx2;
        }
        if is_x86_feature_detected!("sse4.1") {
            return SimdLevel::Sse41;
        }
    }

    #[cfg(target_arch = "aarch64")]
    {
        return SimdLevel::Neon;
    }

    #[allow(unreachable_code)]
    SimdLevel::Scalar
}

/// Applies an optional configured cap to the detected level.
pub(crate) fn capped_level(detected: SimdLevel, cap: Option<SimdLevel>) -> SimdLevel {
    match cap {
        None => detected,
        Some(cap) if cap == detected => detected,
        Some(cap) if detected.includes(cap) => {
            tracing::info!(?detected, ?cap, "SIMD level capped by configuration");
            cap
        }
        Some(cap) => {
            tracing::warn!(
                ?detected,
                ?cap,
                "configured SIMD level is not supported by this CPU, using detected level"
            );
            detected
        }
    }
}

/// Returns the SIMD level supported by the CPU, ignoring configuration.
#[inline]
#[must_use]
pub fn detected_simd_level() -> SimdLevel {
    *DETECTED_LEVEL.get_or_init(detect_simd_level)
}

/// Returns the cached SIMD level used by every kernel.
///
/// The configured cap is applied on the first call only; see
/// [`config::install`](crate::config::install).
#[inline]
#[must_use]
pub fn simd_level() -> SimdLevel {
    *SIMD_LEVEL.get_or_init(|| {
        let detected = detected_simd_level();
        let level = capped_level(detected, config::current().simd.max_level);
        tracing::debug!(?detected, ?level, "SIMD level selected");
        level
    })
}

/// Warms up SIMD caches to eliminate cold-start latency.
///
/// Call this at application startup, after installing any configuration,
/// so the first kernel call is as fast as subsequent ones.
///
/// # Example
///
/// ```
/// use rastersimd_core::simd::warmup_simd_cache;
/// warmup_simd_cache();
/// ```
#[inline]
pub fn warmup_simd_cache() {
    let _ = simd_level();
    let width = 256;
    let pixels = vec![1u8; width * 2];
    let floats = vec![0.5f32; width];
    let mut acc = vec![0.0f32; width];
    if let Ok(image) = crate::view::Raster::packed(&pixels, width, 2) {
        for _ in 0..3 {
            let _ = crate::statistic::get_statistic(&image);
            crate::neural::neural_add_vector(&floats, &mut acc);
        }
    }
}

//! Tests for SIMD level detection and configuration capping.

use super::dispatch::capped_level;
use super::{detected_simd_level, simd_level, warmup_simd_cache, SimdLevel};

// ============================================================================
// Level Ordering
// ============================================================================

#[test]
fn test_levels_include_narrower_x86_levels() {
    assert!(SimdLevel::Avx512.includes(SimdLevel::Avx2));
    assert!(SimdLevel::Avx512.includes(SimdLevel::Sse41));
    assert!(SimdLevel::Avx2.includes(SimdLevel::Sse41));
    assert!(!SimdLevel::Sse41.includes(SimdLevel::Avx2));
    assert!(!SimdLevel::Neon.includes(SimdLevel::Sse41));
    for level in [
        SimdLevel::Avx512,
        SimdLevel::Avx2,
        SimdLevel::Sse41,
        SimdLevel::Neon,
        SimdLevel::Scalar,
    ] {
        assert!(level.includes(SimdLevel::Scalar), "{level:?}");
    }
}

#[test]
fn test_vector_bytes() {
    assert_eq!(SimdLevel::Avx512.vector_bytes(), 64);
    assert_eq!(SimdLevel::Avx2.vector_bytes(), 32);
    assert_eq!(SimdLevel::Sse41.vector_bytes(), 16);
    assert_eq!(SimdLevel::Neon.vector_bytes(), 16);
    assert_eq!(SimdLevel::Scalar.vector_bytes(), 1);
}

// ============================================================================
// Capping
// ============================================================================

#[test]
fn test_cap_below_detected_level_applies() {
    assert_eq!(
        capped_level(SimdLevel::Avx512, Some(SimdLevel::Sse41)),
        SimdLevel::Sse41
    );
    assert_eq!(
        capped_level(SimdLevel::Neon, Some(SimdLevel::Scalar)),
        SimdLevel::Scalar
    );
}

#[test]
fn test_cap_above_detected_level_is_ignored() {
    assert_eq!(
        capped_level(SimdLevel::Sse41, Some(SimdLevel::Avx512)),
        SimdLevel::Sse41
    );
    assert_eq!(
        capped_level(SimdLevel::Neon, Some(SimdLevel::Avx2)),
        SimdLevel::Neon
    );
    assert_eq!(capped_level(SimdLevel::Avx2, None), SimdLevel::Avx2);
}

#[test]
fn test_effective_level_is_supported_by_cpu() {
    warmup_simd_cache();
    assert!(detected_simd_level().includes(simd_level()));
}

#[test]
fn test_level_serializes_lowercase() {
    let text = toml::to_string(&std::collections::BTreeMap::from([(
        "level",
        SimdLevel::Avx512,
    )]))
    .unwrap();
    assert_eq!(text.trim(), "level = \"avx512\"");
}

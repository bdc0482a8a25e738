//! Layered kernel configuration.
//!
//! Sources are merged in order: built-in defaults, an optional TOML file, then
//! `RASTERSIMD_*` environment variables (`__` separates sections, so
//! `RASTERSIMD_SIMD__MAX_LEVEL=avx2` sets `simd.max_level`).
//!
//! ```toml
//! [simd]
//! max_level = "avx2"
//!
//! [convolution]
//! back_window_min_area = 1024
//! back_window_min_area_5x5 = 2048
//! ```

use std::path::Path;
use std::sync::OnceLock;

use figment::providers::{Env, Format, Serialized, Toml};
use figment::Figment;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::simd::SimdLevel;

/// Default config file looked up by [`KernelConfig::load`].
pub const DEFAULT_CONFIG_FILE: &str = "rastersimd.toml";

/// Environment variable prefix.
pub const ENV_PREFIX: &str = "RASTERSIMD_";

/// Top-level kernel configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct KernelConfig {
    /// Instruction-set selection.
    pub simd: SimdConfig,
    /// Convolution strategy tuning.
    pub convolution: ConvolutionConfig,
}

/// Instruction-set selection.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimdConfig {
    /// Highest instruction set kernels may use. `None` uses whatever the CPU
    /// supports. A cap above the detected level has no effect.
    pub max_level: Option<SimdLevel>,
}

/// Convolution strategy tuning.
///
/// Backward convolutions switch from per-offset accumulation to the sliding
/// row window once `width * height` reaches these areas. The two strategies
/// produce the same values; only their speed differs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConvolutionConfig {
    /// Window threshold for 2x2, 3x3 and 4x4 cores.
    pub back_window_min_area: usize,
    /// Window threshold for 5x5 cores.
    pub back_window_min_area_5x5: usize,
}

impl Default for ConvolutionConfig {
    fn default() -> Self {
        Self {
            back_window_min_area: 1024,
            back_window_min_area_5x5: 2048,
        }
    }
}

impl KernelConfig {
    /// Loads defaults, `rastersimd.toml` from the working directory when
    /// present, then environment overrides.
    pub fn load() -> Result<Self> {
        Self::from_file(DEFAULT_CONFIG_FILE)
    }

    /// Loads defaults, the given TOML file when it exists, then environment
    /// overrides.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let config: Self = Figment::from(Serialized::defaults(Self::default()))
            .merge(Toml::file(path))
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
            .extract()?;
        config.validate()?;
        tracing::debug!(path = %path.display(), ?config, "kernel configuration loaded");
        Ok(config)
    }

    /// Parses a TOML document on top of the defaults (no environment layer).
    pub fn from_toml_str(text: &str) -> Result<Self> {
        let config: Self = Figment::from(Serialized::defaults(Self::default()))
            .merge(Toml::string(text))
            .extract()?;
        config.validate()?;
        Ok(config)
    }

    /// Renders the configuration as a TOML document.
    pub fn to_toml_string(&self) -> Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    fn validate(&self) -> Result<()> {
        if self.convolution.back_window_min_area == 0
            || self.convolution.back_window_min_area_5x5 == 0
        {
            return Err(Error::Config(
                "convolution window thresholds must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

static INSTALLED: OnceLock<KernelConfig> = OnceLock::new();
static DEFAULT: OnceLock<KernelConfig> = OnceLock::new();

/// Installs the process-wide configuration.
///
/// Only the first call takes effect; later calls return `false`. Install
/// before the first kernel call so the SIMD level cap is honored.
///
/// The SIMD level is read once, by the first kernel call or
/// [`warmup_simd_cache`](crate::simd::warmup_simd_cache). A later install
/// still changes the convolution thresholds, but dispatch keeps the cached
/// level and `simd.max_level` has no effect.
pub fn install(config: KernelConfig) -> bool {
    let installed = INSTALLED.set(config).is_ok();
    if !installed {
        tracing::warn!("kernel configuration already installed, ignoring new value");
    }
    installed
}

/// Returns the installed configuration, or the defaults when none was installed.
#[must_use]
pub fn current() -> &'static KernelConfig {
    INSTALLED
        .get()
        .unwrap_or_else(|| DEFAULT.get_or_init(KernelConfig::default))
}

//! Small tensor operations over f32 and bf16 data.
//!
//! # Module Structure
//!
//! - `bfloat16`: Slice conversions between f32 and bf16
//! - `scale`: `dst = src * norm + bias` per channel ([`SynetScale16b`])
//! - `add`: `dst = a + b` with optional per-channel broadcast ([`SynetAdd16b`])
//!
//! Operators are built from a parameter set. Construction picks one loop for
//! the (element types, instruction set) combination and returns `None` when
//! the parameters are unsupported; `forward` may then be called any number of
//! times.

use half::bf16;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

pub mod add;
pub mod bfloat16;
pub mod scale;

mod scalar;
#[cfg(target_arch = "x86_64")]
mod sse41;

pub use add::{AddOperand, AddParam, SynetAdd16b};
pub use bfloat16::{bfloat16_to_float32, float32_to_bfloat16};
pub use scale::{ScaleParam, SynetScale16b};

/// Memory layout of a tensor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TensorFormat {
    /// Channel-major: every channel stores a contiguous spatial plane.
    #[default]
    Nchw,
    /// Spatial-major: every pixel stores its channels contiguously.
    Nhwc,
}

/// Element type of a tensor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TensorData {
    /// 32-bit IEEE float.
    #[default]
    F32,
    /// bfloat16: the upper half of an f32.
    Bf16,
}

/// Read-only tensor data.
#[derive(Debug, Clone, Copy)]
pub enum TensorRef<'a> {
    /// f32 elements.
    F32(&'a [f32]),
    /// bf16 elements.
    Bf16(&'a [bf16]),
}

impl TensorRef<'_> {
    /// Element type.
    #[must_use]
    pub fn data_type(&self) -> TensorData {
        match self {
            Self::F32(_) => TensorData::F32,
            Self::Bf16(_) => TensorData::Bf16,
        }
    }

    /// Number of elements.
    #[must_use]
    pub fn len(&self) -> usize {
        match self {
            Self::F32(data) => data.len(),
            Self::Bf16(data) => data.len(),
        }
    }

    /// Returns `true` when the tensor holds no elements.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<'a> From<&'a [f32]> for TensorRef<'a> {
    fn from(data: &'a [f32]) -> Self {
        Self::F32(data)
    }
}

impl<'a> From<&'a [bf16]> for TensorRef<'a> {
    fn from(data: &'a [bf16]) -> Self {
        Self::Bf16(data)
    }
}

/// Writable tensor data.
#[derive(Debug)]
pub enum TensorMut<'a> {
    /// f32 elements.
    F32(&'a mut [f32]),
    /// bf16 elements.
    Bf16(&'a mut [bf16]),
}

impl TensorMut<'_> {
    /// Element type.
    #[must_use]
    pub fn data_type(&self) -> TensorData {
        match self {
            Self::F32(_) => TensorData::F32,
            Self::Bf16(_) => TensorData::Bf16,
        }
    }

    /// Number of elements.
    #[must_use]
    pub fn len(&self) -> usize {
        match self {
            Self::F32(data) => data.len(),
            Self::Bf16(data) => data.len(),
        }
    }

    /// Returns `true` when the tensor holds no elements.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<'a> From<&'a mut [f32]> for TensorMut<'a> {
    fn from(data: &'a mut [f32]) -> Self {
        Self::F32(data)
    }
}

impl<'a> From<&'a mut [bf16]> for TensorMut<'a> {
    fn from(data: &'a mut [bf16]) -> Self {
        Self::Bf16(data)
    }
}

/// Element types a Synet loop is instantiated for. Arithmetic is always
/// carried out in f32.
pub(crate) trait TensorElement: Copy + 'static {
    const DATA: TensorData;

    fn to_f32(self) -> f32;

    fn from_f32(value: f32) -> Self;

    fn slice<'a>(tensor: TensorRef<'a>) -> Option<&'a [Self]>;

    fn slice_mut<'a>(tensor: TensorMut<'a>) -> Option<&'a mut [Self]>;
}

impl TensorElement for f32 {
    const DATA: TensorData = TensorData::F32;

    #[inline(always)]
    fn to_f32(self) -> f32 {
        self
    }

    #[inline(always)]
    fn from_f32(value: f32) -> Self {
        value
    }

    fn slice<'a>(tensor: TensorRef<'a>) -> Option<&'a [Self]> {
        match tensor {
            TensorRef::F32(data) => Some(data),
            TensorRef::Bf16(_) => None,
        }
    }

    fn slice_mut<'a>(tensor: TensorMut<'a>) -> Option<&'a mut [Self]> {
        match tensor {
            TensorMut::F32(data) => Some(data),
            TensorMut::Bf16(_) => None,
        }
    }
}

impl TensorElement for bf16 {
    const DATA: TensorData = TensorData::Bf16;

    #[inline(always)]
    fn to_f32(self) -> f32 {
        f32::from(self)
    }

    /// Rounds to nearest, ties to even; NaN stays NaN.
    #[inline(always)]
    fn from_f32(value: f32) -> Self {
        bf16::from_f32(value)
    }

    fn slice<'a>(tensor: TensorRef<'a>) -> Option<&'a [Self]> {
        match tensor {
            TensorRef::Bf16(data) => Some(data),
            TensorRef::F32(_) => None,
        }
    }

    fn slice_mut<'a>(tensor: TensorMut<'a>) -> Option<&'a mut [Self]> {
        match tensor {
            TensorMut::Bf16(data) => Some(data),
            TensorMut::F32(_) => None,
        }
    }
}

/// Unwraps a tensor argument as `T`, checking its element count.
pub(crate) fn typed<'a, T: TensorElement>(name: &str, tensor: TensorRef<'a>, len: usize) -> Result<&'a [T]> {
    let found = tensor.data_type();
    let data = T::slice(tensor).ok_or_else(|| {
        Error::TensorType(format!("{name} holds {found:?}, operator expects {:?}", T::DATA))
    })?;
    check_len(name, data.len(), len)?;
    Ok(data)
}

/// Unwraps a writable tensor argument as `T`, checking its element count.
pub(crate) fn typed_mut<'a, T: TensorElement>(
    name: &str,
    tensor: TensorMut<'a>,
    len: usize,
) -> Result<&'a mut [T]> {
    let found = tensor.data_type();
    let data = T::slice_mut(tensor).ok_or_else(|| {
        Error::TensorType(format!("{name} holds {found:?}, operator expects {:?}", T::DATA))
    })?;
    check_len(name, data.len(), len)?;
    Ok(data)
}

pub(crate) fn check_len(name: &str, actual: usize, expected: usize) -> Result<()> {
    if actual == expected {
        Ok(())
    } else {
        Err(Error::TensorShape(format!(
            "{name} holds {actual} elements, operator expects {expected}"
        )))
    }
}

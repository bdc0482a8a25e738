//! Per-channel affine transform: `dst = src * norm[c] + bias[c]`.

use half::bf16;
use serde::{Deserialize, Serialize};

use super::{check_len, scalar, typed, typed_mut, TensorData, TensorElement, TensorFormat, TensorMut, TensorRef};
use crate::error::Result;
use crate::simd::{simd_level, SimdLevel};

/// Parameters of a [`SynetScale16b`] operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScaleParam {
    /// Number of channels, `C`.
    pub channels: usize,
    /// Elements per channel, `H * W`.
    pub spatial: usize,
    /// Source element type.
    pub src_type: TensorData,
    /// Destination element type.
    pub dst_type: TensorData,
    /// Layout of source and destination.
    pub format: TensorFormat,
    /// Multiply by `norm[c]`.
    pub norm: bool,
    /// Add `bias[c]`.
    pub bias: bool,
}

impl ScaleParam {
    /// Elements in the source and destination tensors.
    #[must_use]
    pub fn size(&self) -> usize {
        self.channels * self.spatial
    }

    fn rejection(&self) -> Option<&'static str> {
        if self.channels == 0 || self.spatial == 0 {
            Some("empty tensor")
        } else if !self.norm && !self.bias {
            Some("neither norm nor bias enabled")
        } else {
            None
        }
    }
}

type ScaleWorker = fn(&ScaleParam, TensorRef<'_>, &[f32], &[f32], TensorMut<'_>) -> Result<()>;

/// Per-channel scale and shift of an f32 or bf16 tensor.
///
/// # Example
///
/// ```
/// use rastersimd_core::synet::{ScaleParam, SynetScale16b, TensorData, TensorFormat, TensorMut, TensorRef};
///
/// let param = ScaleParam {
///     channels: 2,
///     spatial: 3,
///     src_type: TensorData::F32,
///     dst_type: TensorData::F32,
///     format: TensorFormat::Nchw,
///     norm: true,
///     bias: true,
/// };
/// let scale = SynetScale16b::new(param).expect("supported parameters");
/// let src = [1.0f32, 2.0, 3.0, 1.0, 2.0, 3.0];
/// let mut dst = [0.0f32; 6];
/// scale
///     .forward(TensorRef::F32(&src), &[2.0, -1.0], &[0.5, 0.0], TensorMut::F32(&mut dst))
///     .unwrap();
/// assert_eq!(dst, [2.5, 4.5, 6.5, -1.0, -2.0, -3.0]);
/// ```
#[derive(Debug, Clone)]
pub struct SynetScale16b {
    param: ScaleParam,
    worker: ScaleWorker,
}

impl SynetScale16b {
    /// Builds the operator, or returns `None` for unsupported parameters:
    /// an empty tensor, or both `norm` and `bias` disabled.
    #[must_use]
    pub fn new(param: ScaleParam) -> Option<Self> {
        if let Some(reason) = param.rejection() {
            tracing::debug!(?param, reason, "SynetScale16b rejected parameters");
            return None;
        }
        Some(Self {
            param,
            worker: select_worker(&param),
        })
    }

    /// Parameters the operator was built with.
    #[must_use]
    pub fn param(&self) -> &ScaleParam {
        &self.param
    }

    /// Writes `src * norm + bias` into `dst`. `norm` and `bias` hold one
    /// value per channel; a disabled term is not read and may be empty.
    ///
    /// # Errors
    ///
    /// Returns [`Error::TensorType`](crate::Error::TensorType) when a tensor's
    /// element type differs from the parameters and
    /// [`Error::TensorShape`](crate::Error::TensorShape) when an argument has
    /// the wrong number of elements.
    pub fn forward(&self, src: TensorRef<'_>, norm: &[f32], bias: &[f32], dst: TensorMut<'_>) -> Result<()> {
        if self.param.norm {
            check_len("norm", norm.len(), self.param.channels)?;
        }
        if self.param.bias {
            check_len("bias", bias.len(), self.param.channels)?;
        }
        (self.worker)(&self.param, src, norm, bias, dst)
    }
}

/// Walks the tensor in contiguous runs: one per channel for NCHW with that
/// channel's norm and bias, one per pixel for NHWC with the full vectors.
fn scale_layout<S, D>(
    param: &ScaleParam,
    src: &[S],
    norm: &[f32],
    bias: &[f32],
    dst: &mut [D],
    broadcast: impl Fn(&[S], f32, f32, &mut [D]),
    elementwise: impl Fn(&[S], &[f32], &[f32], &mut [D]),
) {
    match param.format {
        TensorFormat::Nchw => {
            let runs = src.chunks_exact(param.spatial).zip(dst.chunks_exact_mut(param.spatial));
            for (c, (s, d)) in runs.enumerate() {
                let n = if param.norm { norm[c] } else { 1.0 };
                let b = if param.bias { bias[c] } else { 0.0 };
                broadcast(s, n, b, d);
            }
        }
        TensorFormat::Nhwc => {
            let runs = src.chunks_exact(param.channels).zip(dst.chunks_exact_mut(param.channels));
            for (s, d) in runs {
                elementwise(s, norm, bias, d);
            }
        }
    }
}

fn scale_scalar<S: TensorElement, D: TensorElement, const NORM: bool, const BIAS: bool>(
    param: &ScaleParam,
    src: TensorRef<'_>,
    norm: &[f32],
    bias: &[f32],
    dst: TensorMut<'_>,
) -> Result<()> {
    let src = typed::<S>("src", src, param.size())?;
    let dst = typed_mut::<D>("dst", dst, param.size())?;
    scale_layout(
        param,
        src,
        norm,
        bias,
        dst,
        scalar::scale_broadcast::<S, D, NORM, BIAS>,
        scalar::scale_elementwise::<S, D, NORM, BIAS>,
    );
    Ok(())
}

#[cfg(target_arch = "x86_64")]
fn scale_sse41<S: super::sse41::Lanes8, D: super::sse41::Lanes8, const NORM: bool, const BIAS: bool>(
    param: &ScaleParam,
    src: TensorRef<'_>,
    norm: &[f32],
    bias: &[f32],
    dst: TensorMut<'_>,
) -> Result<()> {
    use super::sse41;

    let src = typed::<S>("src", src, param.size())?;
    let dst = typed_mut::<D>("dst", dst, param.size())?;
    // SAFETY: The loops use SSE2 only and stay within the runs they are
    // given; NHWC runs and the checked norm/bias vectors are `channels` long.
    scale_layout(
        param,
        src,
        norm,
        bias,
        dst,
        |s, n, b, d| unsafe { sse41::scale_broadcast::<S, D, NORM, BIAS>(s, n, b, d) },
        |s, n, b, d| unsafe { sse41::scale_elementwise::<S, D, NORM, BIAS>(s, n, b, d) },
    );
    Ok(())
}

/// Instantiates `$worker` for the parameter's element types.
macro_rules! by_types {
    ($worker:ident, $param:expr, $norm:tt, $bias:tt) => {
        match ($param.src_type, $param.dst_type) {
            (TensorData::F32, TensorData::F32) => $worker::<f32, f32, $norm, $bias> as ScaleWorker,
            (TensorData::F32, TensorData::Bf16) => $worker::<f32, bf16, $norm, $bias> as ScaleWorker,
            (TensorData::Bf16, TensorData::F32) => $worker::<bf16, f32, $norm, $bias> as ScaleWorker,
            (TensorData::Bf16, TensorData::Bf16) => $worker::<bf16, bf16, $norm, $bias> as ScaleWorker,
        }
    };
}

/// Instantiates the loop family of the current SIMD level.
macro_rules! by_level {
    ($param:expr, $norm:tt, $bias:tt) => {
        match simd_level() {
            #[cfg(target_arch = "x86_64")]
            SimdLevel::Avx512 | SimdLevel::Avx2 | SimdLevel::Sse41 => by_types!(scale_sse41, $param, $norm, $bias),
            _ => by_types!(scale_scalar, $param, $norm, $bias),
        }
    };
}

fn select_worker(param: &ScaleParam) -> ScaleWorker {
    match (param.norm, param.bias) {
        (true, true) => by_level!(param, true, true),
        (true, false) => by_level!(param, true, false),
        // Rejected in `new`; bias-only covers it.
        (false, _) => by_level!(param, false, true),
    }
}

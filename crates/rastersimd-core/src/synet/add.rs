//! Element-wise addition: `dst = a + b`, with `b` either a full tensor or
//! one value per channel.

use half::bf16;
use serde::{Deserialize, Serialize};

use super::{scalar, typed, typed_mut, TensorData, TensorElement, TensorFormat, TensorMut, TensorRef};
use crate::error::Result;
use crate::simd::{simd_level, SimdLevel};

/// Shape of the second operand relative to the first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AddOperand {
    /// `b` has the shape of `a`.
    #[default]
    Full,
    /// `b` holds one value per channel, broadcast over batch and space.
    PerChannel,
}

/// Parameters of a [`SynetAdd16b`] operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddParam {
    /// Number of images, `N`.
    pub batch: usize,
    /// Number of channels, `C`.
    pub channels: usize,
    /// Elements per channel, `H * W`.
    pub spatial: usize,
    /// Element type of `a`.
    pub a_type: TensorData,
    /// Element type of `b`.
    pub b_type: TensorData,
    /// Element type of `dst`.
    pub dst_type: TensorData,
    /// Layout of `a` and `dst`.
    pub format: TensorFormat,
    /// Shape of `b`.
    pub operand: AddOperand,
}

impl AddParam {
    /// Derives the parameters from tensor shapes. `a_shape` starts with the
    /// batch dimension; the channel axis is the second one for NCHW and the
    /// last one for NHWC. `b_shape` must equal `a_shape`, or be `[C]`, or
    /// have `a_shape`'s rank with every dimension but the channel axis
    /// equal to 1.
    ///
    /// Returns `None` for any other pair of shapes.
    #[must_use]
    pub fn from_shapes(
        a_shape: &[usize],
        b_shape: &[usize],
        format: TensorFormat,
        a_type: TensorData,
        b_type: TensorData,
        dst_type: TensorData,
    ) -> Option<Self> {
        let rank = a_shape.len();
        if rank < 2 {
            tracing::debug!(?a_shape, "SynetAdd16b needs at least batch and channel dimensions");
            return None;
        }
        let axis = match format {
            TensorFormat::Nchw => 1,
            TensorFormat::Nhwc => rank - 1,
        };
        let channels = a_shape[axis];
        let spatial = a_shape[1..]
            .iter()
            .enumerate()
            .filter(|&(i, _)| i + 1 != axis)
            .map(|(_, &dim)| dim)
            .product();
        let per_channel = b_shape == [channels]
            || (b_shape.len() == rank
                && b_shape
                    .iter()
                    .enumerate()
                    .all(|(i, &dim)| if i == axis { dim == channels } else { dim == 1 }));
        let operand = if b_shape == a_shape {
            AddOperand::Full
        } else if per_channel {
            AddOperand::PerChannel
        } else {
            tracing::debug!(?a_shape, ?b_shape, ?format, "SynetAdd16b cannot broadcast shapes");
            return None;
        };
        Some(Self {
            batch: a_shape[0],
            channels,
            spatial,
            a_type,
            b_type,
            dst_type,
            format,
            operand,
        })
    }

    /// Elements in `a` and `dst`.
    #[must_use]
    pub fn size(&self) -> usize {
        self.batch * self.channels * self.spatial
    }

    /// Elements in `b`.
    #[must_use]
    pub fn b_size(&self) -> usize {
        match self.operand {
            AddOperand::Full => self.size(),
            AddOperand::PerChannel => self.channels,
        }
    }
}

type AddWorker = fn(&AddParam, TensorRef<'_>, TensorRef<'_>, TensorMut<'_>) -> Result<()>;

/// Addition of two f32 or bf16 tensors.
#[derive(Debug, Clone)]
pub struct SynetAdd16b {
    param: AddParam,
    worker: AddWorker,
}

impl SynetAdd16b {
    /// Builds the operator, or returns `None` when the tensor is empty.
    #[must_use]
    pub fn new(param: AddParam) -> Option<Self> {
        if param.size() == 0 {
            tracing::debug!(?param, "SynetAdd16b rejected empty tensor");
            return None;
        }
        Some(Self {
            param,
            worker: select_worker(&param),
        })
    }

    /// Parameters the operator was built with.
    #[must_use]
    pub fn param(&self) -> &AddParam {
        &self.param
    }

    /// Writes `a + b` into `dst`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::TensorType`](crate::Error::TensorType) when a tensor's
    /// element type differs from the parameters and
    /// [`Error::TensorShape`](crate::Error::TensorShape) when a tensor has
    /// the wrong number of elements.
    pub fn forward(&self, a: TensorRef<'_>, b: TensorRef<'_>, dst: TensorMut<'_>) -> Result<()> {
        (self.worker)(&self.param, a, b, dst)
    }
}

/// Full operands are added in one run. A per-channel `b` is broadcast over
/// each channel plane for NCHW and added to each pixel's channels for NHWC.
fn add_layout<A, B: TensorElement, D>(
    param: &AddParam,
    a: &[A],
    b: &[B],
    dst: &mut [D],
    full: impl Fn(&[A], &[B], &mut [D]),
    broadcast: impl Fn(&[A], f32, &mut [D]),
) {
    match (param.operand, param.format) {
        (AddOperand::Full, _) => full(a, b, dst),
        (AddOperand::PerChannel, TensorFormat::Nchw) => {
            let runs = a.chunks_exact(param.spatial).zip(dst.chunks_exact_mut(param.spatial));
            for (run, (x, d)) in runs.enumerate() {
                broadcast(x, b[run % param.channels].to_f32(), d);
            }
        }
        (AddOperand::PerChannel, TensorFormat::Nhwc) => {
            let runs = a.chunks_exact(param.channels).zip(dst.chunks_exact_mut(param.channels));
            for (x, d) in runs {
                full(x, b, d);
            }
        }
    }
}

fn add_scalar<A: TensorElement, B: TensorElement, D: TensorElement>(
    param: &AddParam,
    a: TensorRef<'_>,
    b: TensorRef<'_>,
    dst: TensorMut<'_>,
) -> Result<()> {
    let a = typed::<A>("a", a, param.size())?;
    let b = typed::<B>("b", b, param.b_size())?;
    let dst = typed_mut::<D>("dst", dst, param.size())?;
    add_layout(
        param,
        a,
        b,
        dst,
        scalar::add::<A, B, D>,
        |x, value, d| scalar::scale_broadcast::<A, D, false, true>(x, 1.0, value, d),
    );
    Ok(())
}

#[cfg(target_arch = "x86_64")]
fn add_sse41<A: super::sse41::Lanes8, B: super::sse41::Lanes8, D: super::sse41::Lanes8>(
    param: &AddParam,
    a: TensorRef<'_>,
    b: TensorRef<'_>,
    dst: TensorMut<'_>,
) -> Result<()> {
    use super::sse41;

    let a = typed::<A>("a", a, param.size())?;
    let b = typed::<B>("b", b, param.b_size())?;
    let dst = typed_mut::<D>("dst", dst, param.size())?;
    // SAFETY: The loops use SSE2 only and process the shortest of the
    // slices they are given.
    add_layout(
        param,
        a,
        b,
        dst,
        |x, y, d| unsafe { sse41::add::<A, B, D>(x, y, d) },
        |x, value, d| unsafe { sse41::scale_broadcast::<A, D, false, true>(x, 1.0, value, d) },
    );
    Ok(())
}

/// Instantiates `$worker` for the parameter's element types.
macro_rules! by_types {
    ($worker:ident, $param:expr) => {
        match ($param.a_type, $param.b_type, $param.dst_type) {
            (TensorData::F32, TensorData::F32, TensorData::F32) => $worker::<f32, f32, f32> as AddWorker,
            (TensorData::F32, TensorData::F32, TensorData::Bf16) => $worker::<f32, f32, bf16> as AddWorker,
            (TensorData::F32, TensorData::Bf16, TensorData::F32) => $worker::<f32, bf16, f32> as AddWorker,
            (TensorData::F32, TensorData::Bf16, TensorData::Bf16) => $worker::<f32, bf16, bf16> as AddWorker,
            (TensorData::Bf16, TensorData::F32, TensorData::F32) => $worker::<bf16, f32, f32> as AddWorker,
            (TensorData::Bf16, TensorData::F32, TensorData::Bf16) => $worker::<bf16, f32, bf16> as AddWorker,
            (TensorData::Bf16, TensorData::Bf16, TensorData::F32) => $worker::<bf16, bf16, f32> as AddWorker,
            (TensorData::Bf16, TensorData::Bf16, TensorData::Bf16) => $worker::<bf16, bf16, bf16> as AddWorker,
        }
    };
}

fn select_worker(param: &AddParam) -> AddWorker {
    match simd_level() {
        #[cfg(target_arch = "x86_64")]
        SimdLevel::Avx512 | SimdLevel::Avx2 | SimdLevel::Sse41 => by_types!(add_sse41, param),
        _ => by_types!(add_scalar, param),
    }
}

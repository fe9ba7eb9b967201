//! Reduction axes shared by every overlap loss.
//!
//! Losses sum their overlap statistics over an [`Axis`] selection before
//! taking a ratio. The reduced axes are dropped and whatever remains is
//! flattened in row-major order, so every loss returns a `Tensor<B, 1>`:
//! one value per sample for [`Axis::Sample`], a single value for
//! [`Axis::All`].

use burn::{
    config::Config,
    tensor::{backend::Backend, Tensor},
};

use crate::error::{LossError, LossResult};

/// Axes over which overlap statistics are summed.
///
/// Segmentation maps are channels-last: `[batch, *spatial, channels]`.
#[derive(Config, Debug, PartialEq, Eq)]
pub enum Axis {
    /// Every axis, batch included. The result has a single element.
    All,
    /// Every axis except the batch axis. The result has one element per sample.
    Sample,
    /// Every axis except batch (first) and channels (last).
    Spatial,
    /// An explicit list of axes. An empty list performs no reduction.
    Dims(Vec<usize>),
}

impl Default for Axis {
    fn default() -> Self {
        Self::Sample
    }
}

impl Axis {
    /// Resolve the selection into a sorted list of concrete axes for a tensor of `rank`.
    ///
    /// # Errors
    ///
    /// Fails when an explicit axis is out of range or repeated, or when `rank`
    /// cannot hold the axes the selection excludes.
    pub fn resolve(&self, rank: usize) -> LossResult<Vec<usize>> {
        match self {
            Self::All => Ok((0..rank).collect()),
            Self::Sample => {
                if rank < 1 {
                    return Err(LossError::RankTooSmall {
                        variant: "Sample",
                        rank,
                        required: 1,
                    });
                }
                Ok((1..rank).collect())
            }
            Self::Spatial => {
                if rank < 2 {
                    return Err(LossError::RankTooSmall {
                        variant: "Spatial",
                        rank,
                        required: 2,
                    });
                }
                Ok((1..rank - 1).collect())
            }
            Self::Dims(dims) => {
                let mut resolved = Vec::with_capacity(dims.len());
                for &axis in dims {
                    if axis >= rank {
                        return Err(LossError::AxisOutOfRange { axis, rank });
                    }
                    if resolved.contains(&axis) {
                        return Err(LossError::DuplicateAxis { axis });
                    }
                    resolved.push(axis);
                }
                resolved.sort_unstable();
                Ok(resolved)
            }
        }
    }

    /// Resolve the selection, panicking with the resolution error.
    pub(crate) fn dims_for(&self, rank: usize) -> Vec<usize> {
        self.resolve(rank).unwrap_or_else(|err| panic!("{err}"))
    }
}

/// Sum `tensor` over `dims`, keeping the reduced axes with size 1.
pub(crate) fn sum_keepdim<B: Backend, const D: usize>(
    tensor: Tensor<B, D>,
    dims: &[usize],
) -> Tensor<B, D> {
    dims.iter().fold(tensor, |acc, &dim| acc.sum_dim(dim))
}

/// Sum `tensor` over `dims` and flatten the remaining axes.
pub(crate) fn sum_over<B: Backend, const D: usize>(
    tensor: Tensor<B, D>,
    dims: &[usize],
) -> Tensor<B, 1> {
    flatten(sum_keepdim(tensor, dims))
}

/// Flatten a tensor of any rank into one dimension.
pub(crate) fn flatten<B: Backend, const D: usize>(tensor: Tensor<B, D>) -> Tensor<B, 1> {
    tensor.flatten::<1>(0, D - 1)
}

pub(crate) fn assert_same_shape<B: Backend, const D: usize>(
    targets: &Tensor<B, D>,
    predictions: &Tensor<B, D>,
) {
    let pred_dims = predictions.dims();
    let target_dims = targets.dims();
    assert_eq!(
        pred_dims, target_dims,
        "Shape of predictions ({pred_dims:?}) must match targets ({target_dims:?})"
    );
}

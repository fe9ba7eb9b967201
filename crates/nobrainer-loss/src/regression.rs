//! Mean squared and mean absolute error.
//!
//! Both average the element-wise error over the last axis and keep every
//! other axis:
//!
//! - `mean_squared_error`: `mean_last((x - y)²)`
//! - `mean_absolute_error`: `mean_last(|x - y|)`

use burn::tensor::{backend::Backend, Tensor};

use crate::axis::{assert_same_shape, flatten};

/// Mean squared error over the last axis.
///
/// # Shapes
///
/// - y_true: `[...dims, channels]`
/// - y_pred: `[...dims, channels]`
/// - output: `[...dims]`, flattened
pub fn mean_squared_error<B: Backend, const D: usize>(
    y_true: Tensor<B, D>,
    y_pred: Tensor<B, D>,
) -> Tensor<B, 1> {
    assert_same_shape(&y_true, &y_pred);

    let error = y_pred - y_true;
    flatten((error.clone() * error).mean_dim(D - 1))
}

/// Mean absolute error over the last axis.
///
/// # Shapes
///
/// - y_true: `[...dims, channels]`
/// - y_pred: `[...dims, channels]`
/// - output: `[...dims]`, flattened
pub fn mean_absolute_error<B: Backend, const D: usize>(
    y_true: Tensor<B, D>,
    y_pred: Tensor<B, D>,
) -> Tensor<B, 1> {
    assert_same_shape(&y_true, &y_pred);

    flatten((y_pred - y_true).abs().mean_dim(D - 1))
}

//! Segmentation losses for volumetric neuroimaging models.
//!
//! This crate provides the overlap and divergence losses used to train 3D
//! segmentation networks on brain MRI, written against the Burn deep learning
//! framework. Every loss is backend-agnostic, batch-aware and configurable over
//! the axes it reduces.
//!
//! ## Loss Families
//!
//! ### Overlap Losses
//! - **[`dice`] / [`DiceLoss`]**: Sørensen-Dice distance, `1 - 2|X∩Y| / (|X|+|Y|)`
//! - **[`jaccard`] / [`JaccardLoss`]**: Jaccard distance (1 - IoU)
//! - **[`generalized_dice`] / [`GeneralizedDiceLoss`]**: multi-class Dice with
//!   inverse squared volume weighting per class
//! - **[`tversky`] / [`TverskyLoss`]**: Dice/Jaccard generalization with separate
//!   false positive and false negative weights
//!
//! ### Likelihood Losses
//! - **[`binary_focal`] / [`BinaryFocalLoss`]**: binary cross-entropy modulated by
//!   `(1 - p)^gamma` to down-weight easy voxels
//! - **[`variational`] / [`VariationalLoss`]**: negative evidence lower bound for
//!   Bayesian networks, with [`gaussian_kl_divergence`] for the KL term
//! - **[`binary_crossentropy`]**, **[`mean_squared_error`]**,
//!   **[`mean_absolute_error`]**: generic element losses averaged over the last axis
//!
//! ## Shapes and Axes
//!
//! Segmentation maps are channels-last, `[batch, *spatial, channels]`. Each loss
//! sums its statistics over an [`Axis`] selection and returns a `Tensor<B, 1>`
//! holding the values for the axes left over: one value per sample for
//! [`Axis::Sample`], a single value for [`Axis::All`].
//!
//! ## Registry
//!
//! [`get`] resolves case-sensitive names through static tables. Lowercase names
//! (`"dice"`) give the raw [`LossFunction`]; capitalized names (`"Dice"`) give a
//! default-configured [`LossInstance`] whose `forward` returns the batch mean.
//!
//! ## Usage Example
//!
//! ```rust
//! use burn::{nn::loss::Reduction, prelude::*};
//! use nobrainer_loss::{dice, Axis, DiceLossConfig};
//!
//! fn overlap<B: Backend>(y_true: Tensor<B, 5>, y_pred: Tensor<B, 5>) -> Tensor<B, 1> {
//!     let per_sample = dice(y_true.clone(), y_pred.clone(), &Axis::Sample, 1e-7);
//!
//!     let loss = DiceLossConfig::new().with_axis(Axis::Sample).init();
//!     per_sample + loss.forward(y_true, y_pred, Reduction::Mean)
//! }
//! ```

mod axis;
mod crossentropy;
mod dice;
mod error;
mod focal;
mod generalized_dice;
mod jaccard;
mod registry;
mod regression;
mod tversky;
mod variational;

pub use axis::Axis;
pub use crossentropy::binary_crossentropy;
pub use dice::{dice, DiceLoss, DiceLossConfig};
pub use error::{LossError, LossResult};
pub use focal::{binary_focal, BinaryFocalLoss, BinaryFocalLossConfig};
pub use generalized_dice::{generalized_dice, GeneralizedDiceLoss, GeneralizedDiceLossConfig};
pub use jaccard::{jaccard, JaccardLoss, JaccardLossConfig};
pub use registry::{get, Loss, LossFunction, LossInstance};
pub use regression::{mean_absolute_error, mean_squared_error};
pub use tversky::{tversky, TverskyLoss, TverskyLossConfig};
pub use variational::{
    gaussian_kl_divergence, variational, VariationalLoss, VariationalLossConfig,
};

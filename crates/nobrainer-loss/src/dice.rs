//! Dice loss.
//!
//! The Sørensen-Dice distance between a reference and a prediction, summed
//! over the configured axes:
//!
//! ```text
//! Dice = (2 * Σ(x * y) + ε) / (Σx + Σy + ε)
//! Loss = 1 - Dice
//! ```
//!
//! The smoothing term `ε` makes two empty masks a perfect match (loss 0)
//! instead of `0 / 0`.

use burn::{
    config::Config,
    module::{Content, DisplaySettings, Ignored, Module, ModuleDisplay},
    nn::loss::Reduction,
    tensor::{backend::Backend, Tensor},
};

use crate::axis::{assert_same_shape, sum_over, Axis};

/// Compute the Dice loss of `y_pred` against `y_true`.
///
/// # Shapes
///
/// - y_true: `[...dims]`
/// - y_pred: `[...dims]` (same shape as `y_true`)
/// - output: the axes not selected by `axis`, flattened
pub fn dice<B: Backend, const D: usize>(
    y_true: Tensor<B, D>,
    y_pred: Tensor<B, D>,
    axis: &Axis,
    smooth: f64,
) -> Tensor<B, 1> {
    assert_same_shape(&y_true, &y_pred);
    let dims = axis.dims_for(D);

    let intersection = sum_over(y_true.clone() * y_pred.clone(), &dims);
    let summation = sum_over(y_true, &dims) + sum_over(y_pred, &dims);

    let coefficient =
        intersection.mul_scalar(2.0).add_scalar(smooth) / summation.add_scalar(smooth);
    coefficient.neg().add_scalar(1.0)
}

/// Configuration for creating a [Dice loss](DiceLoss).
#[derive(Config, Debug)]
pub struct DiceLossConfig {
    /// Axes summed before the ratio is taken. Default: every axis but batch.
    #[config(default = "Axis::Sample")]
    pub axis: Axis,
    /// Smoothing added to numerator and denominator. Default: 1e-7
    #[config(default = 1e-7)]
    pub smooth: f64,
}

impl DiceLossConfig {
    /// Initialize [Dice loss](DiceLoss).
    pub fn init(&self) -> DiceLoss {
        self.assertions();
        DiceLoss {
            axis: Ignored(self.axis.clone()),
            smooth: self.smooth,
        }
    }

    fn assertions(&self) {
        assert!(
            self.smooth > 0.0,
            "Smoothing for DiceLoss must be positive, got {}",
            self.smooth
        );
    }
}

/// Dice loss with a fixed reduction axis.
#[derive(Module, Clone, Debug)]
#[module(custom_display)]
pub struct DiceLoss {
    /// Axes summed before the ratio is taken.
    pub axis: Ignored<Axis>,
    /// Smoothing added to numerator and denominator.
    pub smooth: f64,
}

impl Default for DiceLoss {
    fn default() -> Self {
        Self::new()
    }
}

impl ModuleDisplay for DiceLoss {
    fn custom_settings(&self) -> Option<DisplaySettings> {
        DisplaySettings::new()
            .with_new_line_after_attribute(false)
            .optional()
    }

    fn custom_content(&self, content: Content) -> Option<Content> {
        content
            .add("axis", &self.axis)
            .add("smooth", &self.smooth)
            .optional()
    }
}

impl DiceLoss {
    /// Create a new Dice loss with default configuration.
    pub fn new() -> Self {
        DiceLossConfig::new().init()
    }

    /// Compute the criterion with reduction over the per-sample losses.
    ///
    /// # Shapes
    ///
    /// - y_true: `[...dims]`
    /// - y_pred: `[...dims]`
    /// - output: `[1]`
    pub fn forward<B: Backend, const D: usize>(
        &self,
        y_true: Tensor<B, D>,
        y_pred: Tensor<B, D>,
        reduction: Reduction,
    ) -> Tensor<B, 1> {
        let loss = self.forward_no_reduction(y_true, y_pred);
        match reduction {
            Reduction::Mean | Reduction::Auto => loss.mean(),
            Reduction::Sum => loss.sum(),
        }
    }

    /// Compute the criterion without reduction.
    ///
    /// # Shapes
    ///
    /// - y_true: `[...dims]`
    /// - y_pred: `[...dims]`
    /// - output: the axes not selected by the configured axis, flattened
    pub fn forward_no_reduction<B: Backend, const D: usize>(
        &self,
        y_true: Tensor<B, D>,
        y_pred: Tensor<B, D>,
    ) -> Tensor<B, 1> {
        dice(y_true, y_pred, &self.axis.0, self.smooth)
    }
}

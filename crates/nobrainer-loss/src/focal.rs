//! Binary focal loss.
//!
//! Binary cross-entropy with each term scaled by how wrong the prediction is,
//! so that easy, confidently classified voxels contribute little:
//!
//! ```text
//! p    = clamp(y_pred, ε, 1 - ε)
//! Loss = -Σ [ a₁ t (1 - p)^γ ln p + a₀ (1 - t) p^γ ln(1 - p) ]
//! ```
//!
//! `(a₁, a₀)` is `(α, 1 - α)` when class balancing is enabled and `(1, 1)`
//! otherwise. With `γ = 0` and no balancing the loss is the binary
//! cross-entropy summed over the reduction axes.

use burn::{
    config::Config,
    module::{Content, DisplaySettings, Ignored, Module, ModuleDisplay},
    nn::loss::Reduction,
    tensor::{backend::Backend, Tensor},
};

use crate::axis::{assert_same_shape, sum_over, Axis};

/// Compute the binary focal loss of `y_pred` against `y_true`.
///
/// # Shapes
///
/// - y_true: `[...dims]`, labels in `[0, 1]`
/// - y_pred: `[...dims]`, probabilities
/// - output: the axes not selected by `axis`, flattened
pub fn binary_focal<B: Backend, const D: usize>(
    y_true: Tensor<B, D>,
    y_pred: Tensor<B, D>,
    axis: &Axis,
    gamma: f64,
    alpha: Option<f64>,
    epsilon: f64,
) -> Tensor<B, 1> {
    assert_same_shape(&y_true, &y_pred);
    let dims = axis.dims_for(D);

    let p = y_pred.clamp(epsilon, 1.0 - epsilon);
    let q = p.clone().neg().add_scalar(1.0);
    let (positive_weight, negative_weight) = alpha.map_or((1.0, 1.0), |a| (a, 1.0 - a));

    let positive = y_true.clone() * q.clone().powf_scalar(gamma) * p.clone().log();
    let negative = y_true.neg().add_scalar(1.0) * p.powf_scalar(gamma) * q.log();

    let loss = positive.mul_scalar(positive_weight) + negative.mul_scalar(negative_weight);
    sum_over(loss.neg(), &dims)
}

/// Configuration for creating a [binary focal loss](BinaryFocalLoss).
#[derive(Config, Debug)]
pub struct BinaryFocalLossConfig {
    /// Axes summed per sample. Default: every axis but batch.
    #[config(default = "Axis::Sample")]
    pub axis: Axis,
    /// Focusing parameter. Default: 2.0
    #[config(default = 2.0)]
    pub gamma: f64,
    /// Weight of the positive class, the negative class gets `1 - alpha`.
    /// Default: no class balancing.
    pub alpha: Option<f64>,
    /// Predictions are clamped to `[epsilon, 1 - epsilon]`. Default: 1e-7
    #[config(default = 1e-7)]
    pub epsilon: f64,
}

impl BinaryFocalLossConfig {
    /// Initialize [binary focal loss](BinaryFocalLoss).
    pub fn init(&self) -> BinaryFocalLoss {
        self.assertions();
        BinaryFocalLoss {
            axis: Ignored(self.axis.clone()),
            gamma: self.gamma,
            alpha: self.alpha,
            epsilon: self.epsilon,
        }
    }

    fn assertions(&self) {
        assert!(
            self.gamma >= 0.0,
            "Gamma for BinaryFocalLoss must be non-negative, got {}",
            self.gamma
        );
        if let Some(alpha) = self.alpha {
            assert!(
                (0.0..=1.0).contains(&alpha),
                "Alpha for BinaryFocalLoss must be in [0, 1], got {alpha}"
            );
        }
        assert!(
            self.epsilon > 0.0 && self.epsilon < 0.5,
            "Epsilon for BinaryFocalLoss must be in (0, 0.5), got {}",
            self.epsilon
        );
    }
}

/// Binary focal loss with fixed axis and focusing parameters.
#[derive(Module, Clone, Debug)]
#[module(custom_display)]
pub struct BinaryFocalLoss {
    /// Axes the per-voxel loss is summed over.
    pub axis: Ignored<Axis>,
    /// Focusing exponent.
    pub gamma: f64,
    /// Weight of the positive class, if balanced.
    pub alpha: Option<f64>,
    /// Prediction clamping bound.
    pub epsilon: f64,
}

impl Default for BinaryFocalLoss {
    fn default() -> Self {
        Self::new()
    }
}

impl ModuleDisplay for BinaryFocalLoss {
    fn custom_settings(&self) -> Option<DisplaySettings> {
        DisplaySettings::new()
            .with_new_line_after_attribute(false)
            .optional()
    }

    fn custom_content(&self, content: Content) -> Option<Content> {
        content
            .add("axis", &self.axis)
            .add("gamma", &self.gamma)
            .add("alpha", &self.alpha)
            .add("epsilon", &self.epsilon)
            .optional()
    }
}

impl BinaryFocalLoss {
    /// Create a new binary focal loss with default configuration.
    pub fn new() -> Self {
        BinaryFocalLossConfig::new().init()
    }

    /// Compute the criterion with reduction over the per-sample losses.
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
    pub fn forward_no_reduction<B: Backend, const D: usize>(
        &self,
        y_true: Tensor<B, D>,
        y_pred: Tensor<B, D>,
    ) -> Tensor<B, 1> {
        binary_focal(
            y_true,
            y_pred,
            &self.axis.0,
            self.gamma,
            self.alpha,
            self.epsilon,
        )
    }
}

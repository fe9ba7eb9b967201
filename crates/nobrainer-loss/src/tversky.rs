//! Tversky loss.
//!
//! Weighs false positives and false negatives separately:
//!
//! ```text
//! TP = Σ(y_pred * y_true)
//! FP = Σ(y_pred * (1 - y_true))
//! FN = Σ((1 - y_pred) * y_true)
//! Loss = 1 - (TP + ε) / (TP + α FP + β FN + ε)
//! ```
//!
//! `α = β = 0.5` gives the Dice loss and `α = β = 1` the Jaccard loss. Any
//! other choice makes the loss depend on which argument is the reference.

use burn::{
    config::Config,
    module::{Content, DisplaySettings, Ignored, Module, ModuleDisplay},
    nn::loss::Reduction,
    tensor::{backend::Backend, Tensor},
};

use crate::axis::{assert_same_shape, sum_over, Axis};

/// Compute the Tversky loss of `y_pred` against `y_true`.
///
/// `alpha` weighs false positives and `beta` false negatives.
pub fn tversky<B: Backend, const D: usize>(
    y_true: Tensor<B, D>,
    y_pred: Tensor<B, D>,
    axis: &Axis,
    alpha: f64,
    beta: f64,
    smooth: f64,
) -> Tensor<B, 1> {
    assert_same_shape(&y_true, &y_pred);
    let dims = axis.dims_for(D);

    let true_positives = sum_over(y_pred.clone() * y_true.clone(), &dims);
    let false_positives = sum_over(y_pred.clone() * y_true.clone().neg().add_scalar(1.0), &dims);
    let false_negatives = sum_over(y_pred.neg().add_scalar(1.0) * y_true, &dims);

    let denominator = true_positives.clone()
        + false_positives.mul_scalar(alpha)
        + false_negatives.mul_scalar(beta);
    let index = true_positives.add_scalar(smooth) / denominator.add_scalar(smooth);
    index.neg().add_scalar(1.0)
}

/// Configuration for creating a [Tversky loss](TverskyLoss).
#[derive(Config, Debug)]
pub struct TverskyLossConfig {
    /// Axes summed before the ratio is taken. Default: every axis but batch.
    #[config(default = "Axis::Sample")]
    pub axis: Axis,
    /// Weight of false positives. Default: 0.5
    #[config(default = 0.5)]
    pub alpha: f64,
    /// Weight of false negatives. Default: 0.5
    #[config(default = 0.5)]
    pub beta: f64,
    /// Smoothing added to numerator and denominator. Default: 1e-7
    #[config(default = 1e-7)]
    pub smooth: f64,
}

impl TverskyLossConfig {
    /// Initialize [Tversky loss](TverskyLoss).
    pub fn init(&self) -> TverskyLoss {
        self.assertions();
        TverskyLoss {
            axis: Ignored(self.axis.clone()),
            alpha: self.alpha,
            beta: self.beta,
            smooth: self.smooth,
        }
    }

    fn assertions(&self) {
        assert!(
            self.alpha >= 0.0 && self.beta >= 0.0,
            "Alpha and beta for TverskyLoss must be non-negative, got alpha={} beta={}",
            self.alpha,
            self.beta
        );
        assert!(
            self.smooth > 0.0,
            "Smoothing for TverskyLoss must be positive, got {}",
            self.smooth
        );
    }
}

/// Tversky loss with fixed axis and error weights.
#[derive(Module, Clone, Debug)]
#[module(custom_display)]
pub struct TverskyLoss {
    /// Axes summed before the ratio is taken.
    pub axis: Ignored<Axis>,
    /// Weight of false positives.
    pub alpha: f64,
    /// Weight of false negatives.
    pub beta: f64,
    /// Smoothing added to numerator and denominator.
    pub smooth: f64,
}

impl Default for TverskyLoss {
    fn default() -> Self {
        Self::new()
    }
}

impl ModuleDisplay for TverskyLoss {
    fn custom_settings(&self) -> Option<DisplaySettings> {
        DisplaySettings::new()
            .with_new_line_after_attribute(false)
            .optional()
    }

    fn custom_content(&self, content: Content) -> Option<Content> {
        content
            .add("axis", &self.axis)
            .add("alpha", &self.alpha)
            .add("beta", &self.beta)
            .add("smooth", &self.smooth)
            .optional()
    }
}

impl TverskyLoss {
    /// Create a new Tversky loss with default configuration.
    pub fn new() -> Self {
        TverskyLossConfig::new().init()
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
        tversky(
            y_true,
            y_pred,
            &self.axis.0,
            self.alpha,
            self.beta,
            self.smooth,
        )
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;
    use burn::tensor::{ElementConversion, TensorData};

    use super::*;
    use crate::tests::{overlapping_masks, to_vec, TestBackend};

    #[test]
    fn tversky_balanced_weights_reduce_to_dice() {
        let (x, y) = overlapping_masks();

        let tversky = to_vec(tversky(x.clone(), y.clone(), &Axis::Sample, 0.5, 0.5, 1e-7));
        let dice = to_vec(crate::dice(x, y, &Axis::Sample, 1e-7));

        for (t, d) in tversky.iter().zip(&dice) {
            assert_relative_eq!(*t, *d, max_relative = 1e-5, epsilon = 1e-6);
        }
    }

    #[test]
    fn tversky_unit_weights_reduce_to_jaccard() {
        let (x, y) = overlapping_masks();

        let tversky = to_vec(tversky(x.clone(), y.clone(), &Axis::Sample, 1.0, 1.0, 1e-7));
        let jaccard = to_vec(crate::jaccard(x, y, &Axis::Sample, 1e-7));

        for (t, j) in tversky.iter().zip(&jaccard) {
            assert_relative_eq!(*t, *j, max_relative = 1e-5, epsilon = 1e-6);
        }
    }

    #[test]
    fn tversky_unbalanced_weights_are_asymmetric() {
        let device = Default::default();
        let reference =
            Tensor::<TestBackend, 1>::from_data(TensorData::from([1.0, 1.0, 1.0, 0.0]), &device);
        let prediction =
            Tensor::<TestBackend, 1>::from_data(TensorData::from([1.0, 0.0, 0.0, 0.0]), &device);

        // TP = 1, FP = 0, FN = 2
        let forward = tversky(reference.clone(), prediction.clone(), &Axis::All, 0.3, 0.7, 1e-7)
            .into_scalar()
            .elem::<f32>();
        // Swapped roles: TP = 1, FP = 2, FN = 0
        let backward = tversky(prediction, reference, &Axis::All, 0.3, 0.7, 1e-7)
            .into_scalar()
            .elem::<f32>();

        assert_relative_eq!(forward, 1.0 - 1.0 / 2.4, max_relative = 1e-5);
        assert_relative_eq!(backward, 1.0 - 1.0 / 1.6, max_relative = 1e-5);
    }

    #[test]
    fn tversky_identical_inputs_returns_zero() {
        let (x, _) = overlapping_masks();

        for value in to_vec(tversky(x.clone(), x, &Axis::Sample, 0.3, 0.7, 1e-7)) {
            assert!(value.abs() < 1e-7);
        }
    }

    #[test]
    fn tversky_loss_uses_configured_weights() {
        let (x, y) = overlapping_masks();
        let loss = TverskyLossConfig::new().with_alpha(0.3).with_beta(0.7).init();

        let values = to_vec(tversky(x.clone(), y.clone(), &Axis::Sample, 0.3, 0.7, 1e-7));
        let expected = values.iter().sum::<f32>() / values.len() as f32;
        let forward = loss.forward(x, y, Reduction::Mean).into_scalar().elem::<f32>();

        assert_relative_eq!(forward, expected, max_relative = 1e-5);
    }

    #[test]
    #[should_panic = "Alpha and beta for TverskyLoss must be non-negative"]
    fn tversky_loss_config_negative_alpha_panics() {
        let _loss = TverskyLossConfig::new().with_alpha(-0.1).init();
    }
}

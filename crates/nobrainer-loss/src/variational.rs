//! Variational (negative ELBO) loss for Bayesian segmentation networks.
//!
//! A variational network learns a posterior over its weights. Training
//! minimizes the negative evidence lower bound: the negative log-likelihood of
//! the labels plus the KL divergence between weight posteriors and prior,
//! spread over the examples of one epoch:
//!
//! ```text
//! Loss = NLL(y_true, y_pred) + KL(q ‖ p) / n_examples
//! ```
//!
//! The likelihood is Bernoulli per voxel, so the NLL is binary cross-entropy
//! summed over the reduction axes.

use burn::{
    config::Config,
    module::{Content, DisplaySettings, Ignored, Module, ModuleDisplay},
    nn::loss::Reduction,
    tensor::{backend::Backend, Tensor},
};

use crate::{
    axis::{assert_same_shape, sum_over, Axis},
    crossentropy,
};

/// Closed-form `KL(N(loc, scale²) ‖ N(0, 1))` summed over every element.
///
/// # Shapes
///
/// - loc: `[...dims]`
/// - scale: `[...dims]`, strictly positive
/// - output: `[1]`
pub fn gaussian_kl_divergence<B: Backend, const D: usize>(
    loc: Tensor<B, D>,
    scale: Tensor<B, D>,
) -> Tensor<B, 1> {
    let loc_dims = loc.dims();
    let scale_dims = scale.dims();
    assert_eq!(
        loc_dims, scale_dims,
        "Shape of loc ({loc_dims:?}) must match scale ({scale_dims:?})"
    );

    let variance = scale.clone().powf_scalar(2.0);
    let kl = (variance + loc.powf_scalar(2.0))
        .sub_scalar(1.0)
        .mul_scalar(0.5)
        - scale.log();
    kl.sum()
}

/// Compute the negative ELBO of `y_pred` against `y_true`.
///
/// `kl` holds the summed KL divergence of the network's variational layers,
/// for example from [`gaussian_kl_divergence`].
///
/// # Shapes
///
/// - y_true: `[...dims]`
/// - y_pred: `[...dims]`
/// - kl: `[1]`
/// - output: the axes not selected by `axis`, flattened
pub fn variational<B: Backend, const D: usize>(
    y_true: Tensor<B, D>,
    y_pred: Tensor<B, D>,
    kl: Tensor<B, 1>,
    n_examples: usize,
    axis: &Axis,
    epsilon: f64,
) -> Tensor<B, 1> {
    assert_same_shape(&y_true, &y_pred);
    assert!(n_examples > 0, "Number of examples must be positive");
    let kl_dims = kl.dims();
    assert_eq!(
        kl_dims,
        [1],
        "KL divergence must hold a single value, got shape {kl_dims:?}"
    );
    let dims = axis.dims_for(D);

    let neg_log_likelihood = sum_over(crossentropy::elementwise(y_true, y_pred, epsilon), &dims);
    neg_log_likelihood + kl.div_scalar(n_examples as f64)
}

/// Configuration for creating a [variational loss](VariationalLoss).
#[derive(Config, Debug)]
pub struct VariationalLossConfig {
    /// Number of training examples the KL term is spread over.
    pub n_examples: usize,
    /// Axes the log-likelihood is summed over. Default: every axis but batch.
    #[config(default = "Axis::Sample")]
    pub axis: Axis,
    /// Predictions are clamped to `[epsilon, 1 - epsilon]`. Default: 1e-7
    #[config(default = 1e-7)]
    pub epsilon: f64,
}

impl VariationalLossConfig {
    /// Initialize [variational loss](VariationalLoss).
    pub fn init(&self) -> VariationalLoss {
        self.assertions();
        VariationalLoss {
            n_examples: self.n_examples,
            axis: Ignored(self.axis.clone()),
            epsilon: self.epsilon,
        }
    }

    fn assertions(&self) {
        assert!(
            self.n_examples > 0,
            "Number of examples for VariationalLoss must be positive, got {}",
            self.n_examples
        );
        assert!(
            self.epsilon > 0.0 && self.epsilon < 0.5,
            "Epsilon for VariationalLoss must be in (0, 0.5), got {}",
            self.epsilon
        );
    }
}

/// Negative ELBO with a fixed dataset size.
#[derive(Module, Clone, Debug)]
#[module(custom_display)]
pub struct VariationalLoss {
    /// Number of training examples the KL term is spread over.
    pub n_examples: usize,
    /// Axes the log-likelihood is summed over.
    pub axis: Ignored<Axis>,
    /// Prediction clamping bound.
    pub epsilon: f64,
}

impl ModuleDisplay for VariationalLoss {
    fn custom_settings(&self) -> Option<DisplaySettings> {
        DisplaySettings::new()
            .with_new_line_after_attribute(false)
            .optional()
    }

    fn custom_content(&self, content: Content) -> Option<Content> {
        content
            .add("n_examples", &self.n_examples)
            .add("axis", &self.axis)
            .add("epsilon", &self.epsilon)
            .optional()
    }
}

impl VariationalLoss {
    /// Compute the criterion with reduction over the per-sample losses.
    pub fn forward<B: Backend, const D: usize>(
        &self,
        y_true: Tensor<B, D>,
        y_pred: Tensor<B, D>,
        kl: Tensor<B, 1>,
        reduction: Reduction,
    ) -> Tensor<B, 1> {
        let loss = self.forward_no_reduction(y_true, y_pred, kl);
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
        kl: Tensor<B, 1>,
    ) -> Tensor<B, 1> {
        variational(
            y_true,
            y_pred,
            kl,
            self.n_examples,
            &self.axis.0,
            self.epsilon,
        )
    }
}

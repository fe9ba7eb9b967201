//! Jaccard (IoU) loss.
//!
//! ```text
//! IoU = (Σ(x * y) + ε) / (Σx + Σy - Σ(x * y) + ε)
//! Loss = 1 - IoU
//! ```

use burn::{
    config::Config,
    module::{Content, DisplaySettings, Ignored, Module, ModuleDisplay},
    nn::loss::Reduction,
    tensor::{backend::Backend, Tensor},
};

use crate::axis::{assert_same_shape, sum_over, Axis};

/// Compute the Jaccard loss of `y_pred` against `y_true`.
///
/// # Shapes
///
/// - y_true: `[...dims]`
/// - y_pred: `[...dims]` (same shape as `y_true`)
/// - output: the axes not selected by `axis`, flattened
pub fn jaccard<B: Backend, const D: usize>(
    y_true: Tensor<B, D>,
    y_pred: Tensor<B, D>,
    axis: &Axis,
    smooth: f64,
) -> Tensor<B, 1> {
    assert_same_shape(&y_true, &y_pred);
    let dims = axis.dims_for(D);

    let intersection = sum_over(y_true.clone() * y_pred.clone(), &dims);
    let union = sum_over(y_true, &dims) + sum_over(y_pred, &dims) - intersection.clone();

    let iou = intersection.add_scalar(smooth) / union.add_scalar(smooth);
    iou.neg().add_scalar(1.0)
}

/// Configuration for creating a [Jaccard loss](JaccardLoss).
#[derive(Config, Debug)]
pub struct JaccardLossConfig {
    /// Axes summed before the ratio is taken. Default: every axis but batch.
    #[config(default = "Axis::Sample")]
    pub axis: Axis,
    /// Smoothing added to numerator and denominator. Default: 1e-7
    #[config(default = 1e-7)]
    pub smooth: f64,
}

impl JaccardLossConfig {
    /// Initialize [Jaccard loss](JaccardLoss).
    pub fn init(&self) -> JaccardLoss {
        self.assertions();
        JaccardLoss {
            axis: Ignored(self.axis.clone()),
            smooth: self.smooth,
        }
    }

    fn assertions(&self) {
        assert!(
            self.smooth > 0.0,
            "Smoothing for JaccardLoss must be positive, got {}",
            self.smooth
        );
    }
}

/// Jaccard loss with a fixed reduction axis.
#[derive(Module, Clone, Debug)]
#[module(custom_display)]
pub struct JaccardLoss {
    /// Axes the intersection and union are summed over.
    pub axis: Ignored<Axis>,
    /// Smoothing added to numerator and denominator.
    pub smooth: f64,
}

impl Default for JaccardLoss {
    fn default() -> Self {
        Self::new()
    }
}

impl ModuleDisplay for JaccardLoss {
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

impl JaccardLoss {
    /// Create a new Jaccard loss with default configuration.
    pub fn new() -> Self {
        JaccardLossConfig::new().init()
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
        jaccard(y_true, y_pred, &self.axis.0, self.smooth)
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;
    use burn::tensor::{ElementConversion, TensorData};

    use super::*;
    use crate::tests::{mask_counts, overlapping_masks, to_vec, TestBackend};

    fn vector(values: [f32; 4]) -> Tensor<TestBackend, 1> {
        Tensor::from_data(TensorData::from(values), &Default::default())
    }

    #[test]
    fn jaccard_identical_masks_returns_zero() {
        for fill in [0.0, 1.0] {
            let x = vector([fill; 4]);
            let out = jaccard(x.clone(), x, &Axis::All, 1e-7);

            assert!(out.into_scalar().elem::<f32>().abs() < 1e-7, "fill {fill}");
        }
    }

    #[test]
    fn jaccard_partial_overlap_matches_jaccard_distance() {
        // Jaccard distance (c_tf + c_ft) / (c_tt + c_tf + c_ft) = 2 / 4
        let out = jaccard(
            vector([0.0, 0.0, 1.0, 1.0]),
            vector([1.0, 1.0, 1.0, 1.0]),
            &Axis::All,
            1e-7,
        );

        assert_relative_eq!(out.into_scalar().elem::<f32>(), 0.5, max_relative = 1e-6);
    }

    #[test]
    fn jaccard_disjoint_masks_returns_one() {
        let out = jaccard(
            vector([0.0, 0.0, 1.0, 1.0]),
            vector([1.0, 1.0, 0.0, 0.0]),
            &Axis::All,
            1e-7,
        );

        assert_relative_eq!(out.into_scalar().elem::<f32>(), 1.0, max_relative = 1e-6);
    }

    #[test]
    fn jaccard_per_sample_matches_voxel_counts() {
        let (x, y) = overlapping_masks();
        let expected: Vec<f32> = mask_counts(&x, &y)
            .into_iter()
            .map(|(tt, tf, ft)| ((tf + ft) / (tt + tf + ft)) as f32)
            .collect();

        let out = to_vec(jaccard(x, y, &Axis::Dims(vec![1, 2, 3, 4]), 1e-7));

        for (actual, expected) in out.iter().zip(&expected) {
            assert_relative_eq!(*actual, *expected, max_relative = 1e-5, epsilon = 1e-6);
        }
    }

    #[test]
    fn jaccard_loss_forward_is_symmetric_mean() {
        let (x, y) = overlapping_masks();
        let loss = JaccardLoss::new();

        let expected: f32 = to_vec(jaccard(x.clone(), y.clone(), &Axis::Sample, 1e-7))
            .iter()
            .sum::<f32>()
            / 4.0;
        let forward = loss
            .forward(x.clone(), y.clone(), Reduction::Auto)
            .into_scalar()
            .elem::<f32>();
        let swapped = loss.forward(y, x, Reduction::Auto).into_scalar().elem::<f32>();

        assert_relative_eq!(forward, expected, max_relative = 1e-5);
        assert_relative_eq!(swapped, expected, max_relative = 1e-5);
    }

    #[test]
    fn jaccard_is_never_below_dice() {
        let (x, y) = overlapping_masks();

        let jaccards = to_vec(jaccard(x.clone(), y.clone(), &Axis::Sample, 1e-7));
        let dices = to_vec(crate::dice(x, y, &Axis::Sample, 1e-7));

        for (j, d) in jaccards.iter().zip(&dices) {
            assert!(j + 1e-6 >= *d, "jaccard {j} < dice {d}");
        }
    }

    #[test]
    #[should_panic = "Smoothing for JaccardLoss must be positive"]
    fn jaccard_loss_config_negative_smoothing_panics() {
        let _loss = JaccardLossConfig::new().with_smooth(-1.0).init();
    }

    #[test]
    fn jaccard_loss_display_names_the_loss() {
        let loss = JaccardLossConfig::new().with_smooth(1e-5).init();

        let display = format!("{loss}");
        assert!(display.starts_with("JaccardLoss {"), "got {display}");
        assert!(display.contains("smooth: 0.00001"), "got {display}");
    }
}

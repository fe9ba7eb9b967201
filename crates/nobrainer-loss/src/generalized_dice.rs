//! Generalized Dice loss for multi-class segmentation.
//!
//! Each class contributes to the overlap ratio with a weight inversely
//! proportional to the squared volume of its reference, so small structures
//! are not drowned out by large ones:
//!
//! ```text
//! w_c  = 1 / (Σ y_true_c)²
//! GD   = 2 Σ_c w_c Σ(x_c * y_c) / Σ_c w_c Σ(x_c + y_c)
//! Loss = 1 - GD
//! ```
//!
//! Classes whose reference is empty, or so small that its weight overflows,
//! get weight `ε` instead of infinity. When the denominator vanishes (both
//! inputs empty) or the score is otherwise not finite, the score is taken as
//! a perfect match.
//!
//! Summing large volumes in single precision leaves the fully disjoint case a
//! little short of exactly 1; callers comparing against 1 should allow an
//! absolute tolerance around 1e-3.

use burn::{
    config::Config,
    module::{Content, DisplaySettings, Ignored, Module, ModuleDisplay},
    nn::loss::Reduction,
    tensor::{backend::Backend, Tensor},
};

use crate::axis::{assert_same_shape, flatten, sum_keepdim, Axis};

/// Compute the generalized Dice loss of `y_pred` against `y_true`.
///
/// # Shapes
///
/// - y_true: `[batch, *spatial, channels]`
/// - y_pred: `[batch, *spatial, channels]`
/// - output: the axes not selected by `axis`, without channels, flattened.
///   `[batch]` for [`Axis::Spatial`].
///
/// # Panics
///
/// Panics when the tensors have rank below 2 or when `axis` selects the
/// channel axis.
pub fn generalized_dice<B: Backend, const D: usize>(
    y_true: Tensor<B, D>,
    y_pred: Tensor<B, D>,
    axis: &Axis,
    epsilon: f64,
) -> Tensor<B, 1> {
    assert_same_shape(&y_true, &y_pred);
    assert!(
        D >= 2,
        "Generalized Dice requires tensors of rank >= 2 [batch, ..., channels], got rank {D}"
    );
    let channels = D - 1;
    let dims = axis.dims_for(D);
    assert!(
        !dims.contains(&channels),
        "Generalized Dice must not reduce the channel axis {channels}, got axes {dims:?}"
    );

    let volume_sq = sum_keepdim(y_true.clone(), &dims).powf_scalar(2.0);
    let empty = volume_sq.clone().equal_elem(0.0);
    let weights = volume_sq
        .mask_fill(empty.clone(), 1.0)
        .recip()
        .mask_fill(empty, epsilon);
    // Subnormal squared volumes overflow the reciprocal.
    let overflow = weights.clone().is_inf();
    let weights = weights.mask_fill(overflow, epsilon);

    let intersection = sum_keepdim(y_true.clone() * y_pred.clone(), &dims);
    let summation = sum_keepdim(y_true + y_pred, &dims);

    let numerator = (weights.clone() * intersection)
        .sum_dim(channels)
        .mul_scalar(2.0);
    let denominator = (weights * summation).sum_dim(channels);

    let degenerate = denominator.clone().equal_elem(0.0);
    let score = (numerator / denominator.mask_fill(degenerate.clone(), 1.0))
        .mask_fill(degenerate, 1.0);
    let undefined = score.clone().is_nan();
    let score = score.mask_fill(undefined, 1.0);
    let unbounded = score.clone().is_inf();
    let score = score.mask_fill(unbounded, 1.0);

    flatten(score.neg().add_scalar(1.0))
}

/// Configuration for creating a [Generalized Dice loss](GeneralizedDiceLoss).
#[derive(Config, Debug)]
pub struct GeneralizedDiceLossConfig {
    /// Axes summed per class. Default: the spatial axes.
    #[config(default = "Axis::Spatial")]
    pub axis: Axis,
    /// Weight given to classes with an empty reference. Default: 1e-7
    #[config(default = 1e-7)]
    pub epsilon: f64,
}

impl GeneralizedDiceLossConfig {
    /// Initialize [Generalized Dice loss](GeneralizedDiceLoss).
    pub fn init(&self) -> GeneralizedDiceLoss {
        self.assertions();
        GeneralizedDiceLoss {
            axis: Ignored(self.axis.clone()),
            epsilon: self.epsilon,
        }
    }

    fn assertions(&self) {
        assert!(
            self.epsilon > 0.0,
            "Epsilon for GeneralizedDiceLoss must be positive, got {}",
            self.epsilon
        );
    }
}

/// Generalized Dice loss with a fixed reduction axis.
#[derive(Module, Clone, Debug)]
#[module(custom_display)]
pub struct GeneralizedDiceLoss {
    /// Axes summed per class.
    pub axis: Ignored<Axis>,
    /// Weight given to classes with an empty reference.
    pub epsilon: f64,
}

impl Default for GeneralizedDiceLoss {
    fn default() -> Self {
        Self::new()
    }
}

impl ModuleDisplay for GeneralizedDiceLoss {
    fn custom_settings(&self) -> Option<DisplaySettings> {
        DisplaySettings::new()
            .with_new_line_after_attribute(false)
            .optional()
    }

    fn custom_content(&self, content: Content) -> Option<Content> {
        content
            .add("axis", &self.axis)
            .add("epsilon", &self.epsilon)
            .optional()
    }
}

impl GeneralizedDiceLoss {
    /// Create a new generalized Dice loss with default configuration.
    pub fn new() -> Self {
        GeneralizedDiceLossConfig::new().init()
    }

    /// Compute the criterion with reduction over the per-sample losses.
    ///
    /// # Shapes
    ///
    /// - y_true: `[batch, *spatial, channels]`
    /// - y_pred: `[batch, *spatial, channels]`
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
    /// - y_true: `[batch, *spatial, channels]`
    /// - y_pred: `[batch, *spatial, channels]`
    /// - output: `[batch]` for the default axis
    pub fn forward_no_reduction<B: Backend, const D: usize>(
        &self,
        y_true: Tensor<B, D>,
        y_pred: Tensor<B, D>,
    ) -> Tensor<B, 1> {
        generalized_dice(y_true, y_pred, &self.axis.0, self.epsilon)
    }
}

#[cfg(test)]
mod tests {
    use approx::{assert_abs_diff_eq, assert_relative_eq};
    use burn::tensor::{ElementConversion, TensorData};

    use super::*;
    use crate::tests::{overlapping_masks, to_vec, volume, TestBackend};

    const SHAPE: [usize; 5] = [3, 4, 4, 4, 5];

    #[test]
    fn generalized_dice_empty_inputs_returns_zeros() {
        let x = volume(SHAPE, |_| 0.0);

        let out = to_vec(generalized_dice(x.clone(), x, &Axis::Spatial, 1e-7));

        assert_eq!(out, vec![0.0; SHAPE[0]]);
    }

    #[test]
    fn generalized_dice_identical_full_inputs_returns_zeros() {
        let x = volume(SHAPE, |_| 1.0);

        let out = to_vec(generalized_dice(x.clone(), x, &Axis::Spatial, 1e-7));

        assert_eq!(out.len(), SHAPE[0]);
        for value in out {
            assert_abs_diff_eq!(value, 0.0, epsilon = 1e-6);
        }
    }

    #[test]
    fn generalized_dice_disjoint_inputs_returns_ones() {
        let x = volume(SHAPE, |_| 1.0);
        let y = volume(SHAPE, |_| 0.0);

        let forward = to_vec(generalized_dice(x.clone(), y.clone(), &Axis::Spatial, 1e-7));
        let backward = to_vec(generalized_dice(y, x, &Axis::Spatial, 1e-7));

        for value in forward.into_iter().chain(backward) {
            assert_abs_diff_eq!(value, 1.0, epsilon = 1e-3);
        }
    }

    #[test]
    fn generalized_dice_weights_classes_by_inverse_squared_volume() {
        let device = Default::default();
        // Class 0 covers three voxels (weight 1/9), class 1 covers one (weight 1).
        let y_true = Tensor::<TestBackend, 3>::from_data(
            TensorData::from([[[1.0, 0.0], [1.0, 0.0], [1.0, 0.0], [0.0, 1.0]]]),
            &device,
        );
        let y_pred = Tensor::<TestBackend, 3>::from_data(
            TensorData::from([[[1.0, 0.0], [1.0, 0.0], [0.0, 1.0], [0.0, 1.0]]]),
            &device,
        );

        let out = generalized_dice(y_true, y_pred, &Axis::Spatial, 1e-7);

        // 2 (2/9 + 1) / (5/9 + 3) = 22 / 32
        assert_relative_eq!(
            out.into_scalar().elem::<f32>(),
            1.0 - 22.0 / 32.0,
            max_relative = 1e-5
        );
    }

    #[test]
    fn generalized_dice_tiny_reference_volume_stays_finite() {
        let device = Default::default();
        // Class 1 has a reference volume of 1e-20, whose square is subnormal.
        let y_true = Tensor::<TestBackend, 3>::from_data(
            TensorData::from([[[1.0, 1e-20], [1.0, 0.0], [0.0, 0.0]]]),
            &device,
        );
        let y_pred = Tensor::<TestBackend, 3>::from_data(
            TensorData::from([[[1.0, 0.5], [0.0, 0.0], [0.0, 0.0]]]),
            &device,
        );

        let out = generalized_dice(y_true, y_pred, &Axis::Spatial, 1e-7)
            .into_scalar()
            .elem::<f32>();

        // Class 1 falls back to weight 1e-7: 1 - 2 (1/4) / (3/4)
        assert!(out.is_finite(), "got {out}");
        assert_relative_eq!(out, 1.0 / 3.0, max_relative = 1e-4);
    }

    #[test]
    fn generalized_dice_single_class_is_close_to_dice() {
        let (x, y) = overlapping_masks();

        let generalized = to_vec(generalized_dice(x.clone(), y.clone(), &Axis::Spatial, 1e-7));
        let dice = to_vec(crate::dice(x, y, &Axis::Sample, 1e-7));

        for (gd, d) in generalized.iter().zip(&dice) {
            assert_relative_eq!(*gd, *d, max_relative = 1e-2, epsilon = 1e-6);
        }
    }

    #[test]
    fn generalized_dice_loss_matches_functional_mean() {
        let x = volume(SHAPE, |[b, i, _, _, c]| if (b + i + c) % 2 == 0 { 1.0 } else { 0.0 });
        let y = volume(SHAPE, |[_, i, j, _, c]| if (i + j + c) % 3 == 0 { 1.0 } else { 0.0 });
        let loss = GeneralizedDiceLossConfig::new()
            .with_axis(Axis::Dims(vec![1, 2, 3]))
            .init();

        let functional = to_vec(generalized_dice(x.clone(), y.clone(), &Axis::Spatial, 1e-7));
        let expected = functional.iter().sum::<f32>() / functional.len() as f32;
        let forward = loss.forward(x, y, Reduction::Auto).into_scalar().elem::<f32>();

        assert_relative_eq!(forward, expected, max_relative = 1e-5);
    }

    #[test]
    #[should_panic = "must not reduce the channel axis"]
    fn generalized_dice_reducing_channels_panics() {
        let x = volume(SHAPE, |_| 1.0);

        let _out = generalized_dice(x.clone(), x, &Axis::Sample, 1e-7);
    }

    #[test]
    #[should_panic = "Epsilon for GeneralizedDiceLoss must be positive"]
    fn generalized_dice_loss_config_zero_epsilon_panics() {
        let _loss = GeneralizedDiceLossConfig::new().with_epsilon(0.0).init();
    }
}

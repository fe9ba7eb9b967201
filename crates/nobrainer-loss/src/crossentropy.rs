use burn::tensor::{backend::Backend, Tensor};

use crate::axis::{assert_same_shape, flatten};

/// Binary cross-entropy averaged over the last axis.
///
/// Predictions are probabilities, clamped to `[epsilon, 1 - epsilon]` before the
/// logarithm. Targets can be hard or soft labels in `[0, 1]`.
///
/// `L = -mean_last(y * ln(p) + (1 - y) * ln(1 - p))`
///
/// # Shapes
///
/// - y_true: `[...dims, channels]`
/// - y_pred: `[...dims, channels]`
/// - output: `[...dims]`, flattened
pub fn binary_crossentropy<B: Backend, const D: usize>(
    y_true: Tensor<B, D>,
    y_pred: Tensor<B, D>,
    epsilon: f64,
) -> Tensor<B, 1> {
    assert_same_shape(&y_true, &y_pred);

    flatten(elementwise(y_true, y_pred, epsilon).mean_dim(D - 1))
}

/// Unreduced binary cross-entropy, `-(y * ln(p) + (1 - y) * ln(1 - p))`.
pub(crate) fn elementwise<B: Backend, const D: usize>(
    y_true: Tensor<B, D>,
    y_pred: Tensor<B, D>,
    epsilon: f64,
) -> Tensor<B, D> {
    let p = y_pred.clamp(epsilon, 1.0 - epsilon);
    let log_p = p.clone().log();
    let log_one_minus_p = p.neg().add_scalar(1.0).log();

    let one_minus_target = y_true.clone().neg().add_scalar(1.0);
    -(y_true * log_p + one_minus_target * log_one_minus_p)
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;
    use burn::tensor::TensorData;

    use super::*;
    use crate::tests::{to_vec, TestBackend};

    #[test]
    fn binary_crossentropy_hard_labels() {
        let device = Default::default();
        let y_true =
            Tensor::<TestBackend, 1>::from_data(TensorData::from([0.0, 1.0, 0.0, 1.0]), &device);
        let y_pred =
            Tensor::<TestBackend, 1>::from_data(TensorData::from([0.1, 0.9, 0.3, 0.8]), &device);

        let out = to_vec(binary_crossentropy(y_true, y_pred, 1e-7));

        let expected =
            -((0.9_f32).ln() + (0.9_f32).ln() + (0.7_f32).ln() + (0.8_f32).ln()) / 4.0;
        assert_eq!(out.len(), 1);
        assert_relative_eq!(out[0], expected, max_relative = 1e-5);
    }

    #[test]
    fn binary_crossentropy_keeps_leading_axes() {
        let device = Default::default();
        let y_true = Tensor::<TestBackend, 2>::from_data(
            TensorData::from([[0.0, 1.0], [0.2, 0.9]]),
            &device,
        );
        let y_pred = Tensor::<TestBackend, 2>::from_data(
            TensorData::from([[0.1, 0.9], [0.3, 0.8]]),
            &device,
        );

        let out = to_vec(binary_crossentropy(y_true, y_pred, 1e-7));

        assert_eq!(out.len(), 2);
        assert!(out.iter().all(|value| value.is_finite() && *value > 0.0));
    }

    #[test]
    fn binary_crossentropy_clamps_saturated_predictions() {
        let device = Default::default();
        let y_true = Tensor::<TestBackend, 1>::from_data(TensorData::from([1.0, 0.0]), &device);
        let y_pred = Tensor::<TestBackend, 1>::from_data(TensorData::from([0.0, 1.0]), &device);

        let out = to_vec(binary_crossentropy(y_true, y_pred, 1e-7));

        // Both terms are close to -ln(1e-7) ≈ 16.1 instead of infinite.
        assert!(out[0].is_finite());
        assert!((15.0..17.0).contains(&out[0]), "got {}", out[0]);
    }

    #[test]
    #[should_panic = "Shape of predictions"]
    fn binary_crossentropy_mismatched_shapes_panics() {
        let device = Default::default();
        let y_true = Tensor::<TestBackend, 1>::from_data(TensorData::from([1.0, 0.0]), &device);
        let y_pred = Tensor::<TestBackend, 1>::from_data(TensorData::from([0.5]), &device);

        let _out = binary_crossentropy(y_true, y_pred, 1e-7);
    }
}

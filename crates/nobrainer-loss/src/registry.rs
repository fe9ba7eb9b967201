//! Name-based loss lookup.
//!
//! Training configurations name their loss with a string. Lowercase names
//! resolve to a [`LossFunction`], called with default parameters and returning
//! one value per sample. Capitalized names resolve to a [`LossInstance`], a
//! default-configured wrapper whose `forward` returns the batch mean. Names of
//! the generic element losses (`binary_crossentropy`, `mse`, ...) resolve to
//! functions as well.

use burn::{
    nn::loss::Reduction,
    tensor::{backend::Backend, Tensor},
};

use crate::{
    binary_crossentropy,
    error::{LossError, LossResult},
    mean_absolute_error, mean_squared_error, BinaryFocalLoss, DiceLoss, GeneralizedDiceLoss,
    JaccardLoss, TverskyLoss,
};

const CLAMP_EPSILON: f64 = 1e-7;

/// Names resolving to raw loss functions.
const FUNCTIONS: [(&str, LossFunction); 10] = [
    ("dice", LossFunction::Dice),
    ("jaccard", LossFunction::Jaccard),
    ("tversky", LossFunction::Tversky),
    ("generalized_dice", LossFunction::GeneralizedDice),
    ("binary_focal", LossFunction::BinaryFocal),
    ("binary_crossentropy", LossFunction::BinaryCrossentropy),
    ("mean_squared_error", LossFunction::MeanSquaredError),
    ("mse", LossFunction::MeanSquaredError),
    ("mean_absolute_error", LossFunction::MeanAbsoluteError),
    ("mae", LossFunction::MeanAbsoluteError),
];

/// Names resolving to default-configured instances, keyed by the loss they wrap.
const INSTANCES: [(&str, LossFunction); 5] = [
    ("Dice", LossFunction::Dice),
    ("Jaccard", LossFunction::Jaccard),
    ("Tversky", LossFunction::Tversky),
    ("GeneralizedDice", LossFunction::GeneralizedDice),
    ("BinaryFocal", LossFunction::BinaryFocal),
];

fn unknown_loss(name: &str) -> LossError {
    let available = INSTANCES
        .iter()
        .chain(FUNCTIONS.iter())
        .map(|(name, _)| *name)
        .collect::<Vec<_>>()
        .join(", ");
    LossError::UnknownLoss {
        name: name.to_owned(),
        available,
    }
}

/// A loss function usable without prior configuration.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum LossFunction {
    /// [`dice`](crate::dice) over every axis but batch.
    Dice,
    /// [`jaccard`](crate::jaccard) over every axis but batch.
    Jaccard,
    /// [`tversky`](crate::tversky) with α = β = 0.5.
    Tversky,
    /// [`generalized_dice`](crate::generalized_dice) over the spatial axes.
    GeneralizedDice,
    /// [`binary_focal`](crate::binary_focal) with γ = 2 and no class balancing.
    BinaryFocal,
    /// [`binary_crossentropy`](crate::binary_crossentropy) over the last axis.
    BinaryCrossentropy,
    /// [`mean_squared_error`](crate::mean_squared_error) over the last axis.
    MeanSquaredError,
    /// [`mean_absolute_error`](crate::mean_absolute_error) over the last axis.
    MeanAbsoluteError,
}

impl LossFunction {
    /// Look up a function by its registered name.
    ///
    /// # Errors
    ///
    /// Returns [`LossError::UnknownLoss`] when no function has that name.
    pub fn from_name(name: &str) -> LossResult<Self> {
        FUNCTIONS
            .iter()
            .find(|(registered, _)| *registered == name)
            .map(|&(_, function)| function)
            .ok_or_else(|| unknown_loss(name))
    }

    /// Canonical registered name.
    pub const fn name(self) -> &'static str {
        match self {
            Self::Dice => "dice",
            Self::Jaccard => "jaccard",
            Self::Tversky => "tversky",
            Self::GeneralizedDice => "generalized_dice",
            Self::BinaryFocal => "binary_focal",
            Self::BinaryCrossentropy => "binary_crossentropy",
            Self::MeanSquaredError => "mean_squared_error",
            Self::MeanAbsoluteError => "mean_absolute_error",
        }
    }

    /// Evaluate the function with its default parameters.
    pub fn forward<B: Backend, const D: usize>(
        self,
        y_true: Tensor<B, D>,
        y_pred: Tensor<B, D>,
    ) -> Tensor<B, 1> {
        match self {
            Self::Dice => DiceLoss::new().forward_no_reduction(y_true, y_pred),
            Self::Jaccard => JaccardLoss::new().forward_no_reduction(y_true, y_pred),
            Self::Tversky => TverskyLoss::new().forward_no_reduction(y_true, y_pred),
            Self::GeneralizedDice => {
                GeneralizedDiceLoss::new().forward_no_reduction(y_true, y_pred)
            }
            Self::BinaryFocal => BinaryFocalLoss::new().forward_no_reduction(y_true, y_pred),
            Self::BinaryCrossentropy => binary_crossentropy(y_true, y_pred, CLAMP_EPSILON),
            Self::MeanSquaredError => mean_squared_error(y_true, y_pred),
            Self::MeanAbsoluteError => mean_absolute_error(y_true, y_pred),
        }
    }
}

/// A configured loss wrapper.
#[derive(Clone, Debug)]
pub enum LossInstance {
    /// Configured Dice loss.
    Dice(DiceLoss),
    /// Configured Jaccard loss.
    Jaccard(JaccardLoss),
    /// Configured Tversky loss.
    Tversky(TverskyLoss),
    /// Configured generalized Dice loss.
    GeneralizedDice(GeneralizedDiceLoss),
    /// Configured binary focal loss.
    BinaryFocal(BinaryFocalLoss),
}

impl LossInstance {
    /// Look up an instance by its registered name, with default configuration.
    ///
    /// # Errors
    ///
    /// Returns [`LossError::UnknownLoss`] when no instance has that name.
    pub fn from_name(name: &str) -> LossResult<Self> {
        INSTANCES
            .iter()
            .find(|(registered, _)| *registered == name)
            .and_then(|&(_, function)| Self::with_defaults(function))
            .ok_or_else(|| unknown_loss(name))
    }

    /// Default-configured wrapper around `function`, if it has one.
    pub fn with_defaults(function: LossFunction) -> Option<Self> {
        match function {
            LossFunction::Dice => Some(Self::Dice(DiceLoss::new())),
            LossFunction::Jaccard => Some(Self::Jaccard(JaccardLoss::new())),
            LossFunction::Tversky => Some(Self::Tversky(TverskyLoss::new())),
            LossFunction::GeneralizedDice => {
                Some(Self::GeneralizedDice(GeneralizedDiceLoss::new()))
            }
            LossFunction::BinaryFocal => Some(Self::BinaryFocal(BinaryFocalLoss::new())),
            LossFunction::BinaryCrossentropy
            | LossFunction::MeanSquaredError
            | LossFunction::MeanAbsoluteError => None,
        }
    }

    /// The function this instance wraps.
    pub const fn function(&self) -> LossFunction {
        match self {
            Self::Dice(_) => LossFunction::Dice,
            Self::Jaccard(_) => LossFunction::Jaccard,
            Self::Tversky(_) => LossFunction::Tversky,
            Self::GeneralizedDice(_) => LossFunction::GeneralizedDice,
            Self::BinaryFocal(_) => LossFunction::BinaryFocal,
        }
    }

    /// Evaluate the configured loss and average it over the batch.
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
    ) -> Tensor<B, 1> {
        match self {
            Self::Dice(loss) => loss.forward(y_true, y_pred, Reduction::Auto),
            Self::Jaccard(loss) => loss.forward(y_true, y_pred, Reduction::Auto),
            Self::Tversky(loss) => loss.forward(y_true, y_pred, Reduction::Auto),
            Self::GeneralizedDice(loss) => loss.forward(y_true, y_pred, Reduction::Auto),
            Self::BinaryFocal(loss) => loss.forward(y_true, y_pred, Reduction::Auto),
        }
    }
}

impl From<DiceLoss> for LossInstance {
    fn from(loss: DiceLoss) -> Self {
        Self::Dice(loss)
    }
}

impl From<JaccardLoss> for LossInstance {
    fn from(loss: JaccardLoss) -> Self {
        Self::Jaccard(loss)
    }
}

impl From<TverskyLoss> for LossInstance {
    fn from(loss: TverskyLoss) -> Self {
        Self::Tversky(loss)
    }
}

impl From<GeneralizedDiceLoss> for LossInstance {
    fn from(loss: GeneralizedDiceLoss) -> Self {
        Self::GeneralizedDice(loss)
    }
}

impl From<BinaryFocalLoss> for LossInstance {
    fn from(loss: BinaryFocalLoss) -> Self {
        Self::BinaryFocal(loss)
    }
}

/// Result of a registry lookup.
#[derive(Clone, Debug)]
pub enum Loss {
    /// A raw function returning one value per sample.
    Function(LossFunction),
    /// A configured wrapper returning the batch mean.
    Instance(LossInstance),
}

impl Loss {
    /// Evaluate the loss.
    pub fn forward<B: Backend, const D: usize>(
        &self,
        y_true: Tensor<B, D>,
        y_pred: Tensor<B, D>,
    ) -> Tensor<B, 1> {
        match self {
            Self::Function(function) => function.forward(y_true, y_pred),
            Self::Instance(instance) => instance.forward(y_true, y_pred),
        }
    }
}

/// Resolve a loss by name.
///
/// Names are case-sensitive. Capitalized names of the overlap family give an
/// instance, every other registered name gives a function.
///
/// # Errors
///
/// Returns [`LossError::UnknownLoss`] for unregistered names.
pub fn get(name: &str) -> LossResult<Loss> {
    let loss = match LossInstance::from_name(name) {
        Ok(instance) => Loss::Instance(instance),
        Err(_) => Loss::Function(LossFunction::from_name(name)?),
    };
    tracing::debug!(name, ?loss, "resolved loss");
    Ok(loss)
}

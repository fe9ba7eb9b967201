//! Error types for the nobrainer-loss crate.

use thiserror::Error;

/// Errors raised while resolving losses or their reduction axes.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LossError {
    /// No loss is registered under the requested name.
    #[error("unknown loss '{name}' - available losses: {available}")]
    UnknownLoss {
        /// The name that was looked up.
        name: String,
        /// Comma-separated list of registered names.
        available: String,
    },

    /// A reduction axis does not exist for the tensor rank.
    #[error("reduction axis {axis} is out of range for a tensor of rank {rank}")]
    AxisOutOfRange {
        /// The offending axis.
        axis: usize,
        /// Rank of the tensor being reduced.
        rank: usize,
    },

    /// The same axis was listed more than once.
    #[error("reduction axis {axis} is listed more than once")]
    DuplicateAxis {
        /// The repeated axis.
        axis: usize,
    },

    /// The tensor rank is too small for the requested axis selection.
    #[error("axis selection {variant} requires a tensor of rank >= {required}, got rank {rank}")]
    RankTooSmall {
        /// Name of the axis selection.
        variant: &'static str,
        /// Rank of the tensor being reduced.
        rank: usize,
        /// Minimum rank supported by the selection.
        required: usize,
    },
}

/// A specialized `Result` type for loss resolution.
pub type LossResult<T> = Result<T, LossError>;

//! Error types for the nimbus-noise crate.

use nimbus_cascade::CascadeError;

/// Error type for all fallible operations in the nimbus-noise crate.
#[derive(Debug, Clone, thiserror::Error)]
pub enum NoiseError {
    /// Returned when no input frames are supplied.
    #[error("no input frames supplied")]
    EmptyInput,

    /// Returned when input frames do not match the expected shape.
    #[error("shape mismatch: expected {expected:?}, got {got:?}")]
    ShapeMismatch {
        /// Expected spatial shape.
        expected: (usize, usize),
        /// Offending shape.
        got: (usize, usize),
    },

    /// Returned when an input frame contains NaN or infinite values.
    #[error("input frame {index} contains non-finite values")]
    NonFiniteData {
        /// Index of the offending frame.
        index: usize,
    },

    /// Returned when the power spectrum cannot be fitted.
    #[error("power-law fit failed: {reason}")]
    FitFailed {
        /// Description of the problem.
        reason: String,
    },

    /// Returned when a configuration value is invalid.
    #[error("invalid noise configuration: {reason}")]
    InvalidConfig {
        /// Description of the problem.
        reason: String,
    },

    /// Transform error from the cascade crate.
    #[error(transparent)]
    Cascade(#[from] CascadeError),
}

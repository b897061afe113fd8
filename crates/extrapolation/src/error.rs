//! Error types for the nimbus-extrapolation crate.

/// Error type for all fallible operations in the nimbus-extrapolation crate.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ExtrapolationError {
    /// Returned when the motion field is not shaped `(2, rows, cols)`.
    #[error("motion field must have shape (2, rows, cols), got {shape:?}")]
    InvalidMotionShape {
        /// Offending shape.
        shape: (usize, usize, usize),
    },

    /// Returned when the field, motion or displacement shapes disagree.
    #[error("shape mismatch: expected {expected:?}, got {got:?}")]
    ShapeMismatch {
        /// Spatial shape of the motion field.
        expected: (usize, usize),
        /// Offending shape.
        got: (usize, usize),
    },

    /// Returned when the motion field contains NaN or infinite values.
    #[error("motion field contains {count} non-finite values")]
    NonFiniteMotion {
        /// Number of offending values.
        count: usize,
    },

    /// Returned when lead times are negative, non-finite or decreasing.
    #[error("invalid lead times: {reason}")]
    InvalidTimesteps {
        /// Description of the problem.
        reason: String,
    },

    /// Returned when a configuration value is invalid.
    #[error("invalid extrapolation configuration: {reason}")]
    InvalidConfig {
        /// Description of the problem.
        reason: String,
    },
}

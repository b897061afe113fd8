//! Error types for the nimbus-cascade crate.

/// Error type for all fallible operations in the nimbus-cascade crate.
///
/// Covers shape validation, filter construction and decomposition
/// failures.
#[derive(Debug, Clone, thiserror::Error)]
pub enum CascadeError {
    /// Returned when an array does not match the shape the transform was
    /// planned for.
    #[error("shape mismatch: expected {expected:?}, got {got:?}")]
    ShapeMismatch {
        /// Shape the transform or filter was built for.
        expected: (usize, usize),
        /// Shape that was supplied.
        got: (usize, usize),
    },

    /// Returned when a field has zero rows or columns.
    #[error("field is empty: shape {shape:?}")]
    EmptyField {
        /// Offending shape.
        shape: (usize, usize),
    },

    /// Returned when the field to decompose contains non-finite values.
    #[error("input field contains non-finite values")]
    NonFiniteData,

    /// Returned when the requested number of cascade levels is unusable.
    #[error("invalid number of cascade levels {n_levels}: {reason}")]
    InvalidLevels {
        /// Requested number of levels.
        n_levels: usize,
        /// Why the level count was rejected.
        reason: String,
    },

    /// Returned when per-level inputs disagree in length.
    #[error("level count mismatch: expected {expected}, got {got}")]
    LevelCountMismatch {
        /// Number of levels expected.
        expected: usize,
        /// Number of levels supplied.
        got: usize,
    },

    /// Returned when a filter configuration value is invalid.
    #[error("invalid filter configuration: {reason}")]
    InvalidConfig {
        /// Description of the problem.
        reason: String,
    },
}

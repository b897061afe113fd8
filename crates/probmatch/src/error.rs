//! Error types for the nimbus-probmatch crate.

/// Error type for all fallible operations in the nimbus-probmatch crate.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ProbMatchError {
    /// Returned when the reference field has no finite values.
    #[error("reference field has no finite values")]
    EmptyReference,

    /// Returned when the conditional target mean is not finite.
    #[error("target mean must be finite, got {value}")]
    NonFiniteTarget {
        /// Offending value.
        value: f64,
    },
}

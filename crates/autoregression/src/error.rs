//! Error types for the nimbus-autoregression crate.

/// Error type for all fallible operations in the nimbus-autoregression crate.
#[derive(Debug, Clone, thiserror::Error)]
pub enum AutoregressionError {
    /// Returned when the AR order is zero.
    #[error("AR order must be at least 1, got {order}")]
    InvalidOrder {
        /// Requested order.
        order: usize,
    },

    /// Returned when fewer frames are supplied than the computation needs.
    #[error("insufficient frames: got {n}, need at least {min}")]
    InsufficientFrames {
        /// Number of frames provided.
        n: usize,
        /// Minimum number of frames required.
        min: usize,
    },

    /// Returned when the number of correlations or coefficients does not
    /// match the model order.
    #[error("coefficient count mismatch: expected {expected}, got {got}")]
    CoefficientCount {
        /// Expected length.
        expected: usize,
        /// Supplied length.
        got: usize,
    },

    /// Returned when frames or noise do not share one shape.
    #[error("shape mismatch: expected {expected:?}, got {got:?}")]
    ShapeMismatch {
        /// Shape of the first frame.
        expected: (usize, usize),
        /// Offending shape.
        got: (usize, usize),
    },

    /// Returned when an autocorrelation coefficient is NaN or infinite.
    #[error("autocorrelation at lag {lag} is not finite: {value}")]
    NonFiniteCorrelation {
        /// 1-based lag.
        lag: usize,
        /// Offending value.
        value: f64,
    },

    /// Returned when the Yule-Walker system has no unique solution.
    #[error("Yule-Walker system is singular")]
    Singular,

    /// Returned when the estimated AR polynomial has a root inside the unit
    /// circle. Roots on the circle are accepted.
    #[error("estimated AR({}) process is non-stationary: phi = {phi:?}", .phi.len())]
    NonStationary {
        /// Estimated lag coefficients.
        phi: Vec<f64>,
    },
}

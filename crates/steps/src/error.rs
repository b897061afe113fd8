//! Error types for the nimbus-steps crate.

use nimbus_autoregression::AutoregressionError;
use nimbus_cascade::CascadeError;
use nimbus_extrapolation::ExtrapolationError;
use nimbus_noise::NoiseError;
use nimbus_probmatch::ProbMatchError;

/// Error type for all fallible operations in the nimbus-steps crate.
///
/// Validation variants are returned before any numerical work starts.
#[derive(Debug, Clone, thiserror::Error)]
pub enum StepsError {
    /// Returned when fewer than `ar_order + 1` history frames are given.
    #[error("insufficient history: {n} frames, need at least {min}")]
    InsufficientHistory {
        /// Number of frames supplied.
        n: usize,
        /// Minimum number of frames required.
        min: usize,
    },

    /// Returned when the spatial shapes of history and motion differ.
    #[error("shape mismatch: expected {expected:?}, got {got:?}")]
    ShapeMismatch {
        /// Spatial shape of the history frames.
        expected: (usize, usize),
        /// Offending shape.
        got: (usize, usize),
    },

    /// Returned when the motion field does not have two components.
    #[error("motion field must have 2 components, got {components}")]
    MotionComponents {
        /// Number of components supplied.
        components: usize,
    },

    /// Returned when the frames have no pixels.
    #[error("fields are empty (shape {shape:?})")]
    EmptyField {
        /// Spatial shape.
        shape: (usize, usize),
    },

    /// Returned when the motion field contains NaN or infinite values.
    #[error("motion field contains {count} non-finite values")]
    NonFiniteMotion {
        /// Number of non-finite values.
        count: usize,
    },

    /// Returned when the requested output times are invalid.
    #[error("invalid timesteps: {reason}")]
    InvalidTimesteps {
        /// Description of the problem.
        reason: String,
    },

    /// Returned when an option needs the precipitation threshold.
    #[error("{option} requires a precipitation threshold")]
    MissingThreshold {
        /// The option that needs the threshold.
        option: &'static str,
    },

    /// Returned when an option needs the spatial resolution.
    #[error("{option} requires the spatial resolution (km per pixel)")]
    MissingResolution {
        /// The option that needs the resolution.
        option: &'static str,
    },

    /// Returned when an option needs the time step length.
    #[error("{option} requires the time step length")]
    MissingTimestep {
        /// The option that needs the time step.
        option: &'static str,
    },

    /// Returned when a configuration parameter is invalid.
    #[error("invalid configuration: {reason}")]
    InvalidConfig {
        /// Description of the problem.
        reason: String,
    },

    /// Returned when a history frame has no finite value after alignment.
    #[error("frame {index} has no finite values")]
    EmptyFrame {
        /// Index of the frame in the used history window.
        index: usize,
    },

    /// Returned when a worker pool cannot be built.
    #[error("failed to build worker pool: {reason}")]
    ThreadPool {
        /// Description of the failure.
        reason: String,
    },

    /// Wrapped error from the cascade crate.
    #[error(transparent)]
    Cascade(#[from] CascadeError),

    /// Wrapped error from the autoregression crate.
    #[error(transparent)]
    Autoregression(#[from] AutoregressionError),

    /// Wrapped error from the extrapolation crate.
    #[error(transparent)]
    Extrapolation(#[from] ExtrapolationError),

    /// Wrapped error from the noise crate.
    #[error(transparent)]
    Noise(#[from] NoiseError),

    /// Wrapped error from the probability matching crate.
    #[error(transparent)]
    ProbMatch(#[from] ProbMatchError),
}

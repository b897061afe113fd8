//! Method selection and options for noise generation.

use crate::error::NoiseError;

/// How the Fourier amplitude filter of the noise is obtained.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum NoiseMethod {
    /// Power-law fit to the radially averaged power spectrum.
    Parametric,
    /// Mean Fourier amplitude of the input frames (default).
    #[default]
    Nonparametric,
}

/// How the per-level noise standard deviation is corrected.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum NoiseStdAdjustment {
    /// Monte-Carlo estimate from the latest observation.
    Auto,
    /// Closed form `1 / (0.75 + 0.09 k)` for level `k = 1..=n`.
    Fixed,
}

/// Options for the spectral noise generators.
#[derive(Debug, Clone)]
pub struct NoiseConfig {
    /// Taper fraction of the Tukey window applied before transforming.
    tukey_alpha: f64,
}

impl Default for NoiseConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl NoiseConfig {
    /// Creates a configuration with a Tukey taper fraction of 0.2.
    pub fn new() -> Self {
        Self { tukey_alpha: 0.2 }
    }

    /// Sets the Tukey taper fraction (0 disables tapering).
    pub fn with_tukey_alpha(mut self, tukey_alpha: f64) -> Self {
        self.tukey_alpha = tukey_alpha;
        self
    }

    /// Returns the Tukey taper fraction.
    pub fn tukey_alpha(&self) -> f64 {
        self.tukey_alpha
    }

    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns [`NoiseError::InvalidConfig`] unless `0 <= tukey_alpha <= 1`.
    pub fn validate(&self) -> Result<(), NoiseError> {
        if !(0.0..=1.0).contains(&self.tukey_alpha) {
            return Err(NoiseError::InvalidConfig {
                reason: format!("tukey_alpha must be in [0, 1], got {}", self.tukey_alpha),
            });
        }
        Ok(())
    }
}

/// Closed-form noise standard-deviation correction for levels `1..=n_levels`.
pub fn fixed_noise_std_coeffs(n_levels: usize) -> Vec<f64> {
    (1..=n_levels)
        .map(|k| 1.0 / (0.75 + 0.09 * k as f64))
        .collect()
}

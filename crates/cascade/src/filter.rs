//! Bandpass filter banks for cascade decomposition.

use ndarray::Array2;

use crate::error::CascadeError;
use crate::fft::radial_wavenumbers;

/// Bandpass filter construction method.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum FilterMethod {
    /// Gaussian weights in log-wavenumber space (default).
    #[default]
    Gaussian,
    /// A single all-pass level.
    Uniform,
}

/// Options for the Gaussian filter bank.
#[derive(Debug, Clone)]
pub struct FilterConfig {
    /// Width of the Gaussian weight functions in log-wavenumber units.
    gauss_scale: f64,
    /// Put the zero-wavenumber component entirely into the first level.
    include_mean: bool,
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl FilterConfig {
    /// Creates a configuration with `gauss_scale = 0.5` and
    /// `include_mean = true`.
    pub fn new() -> Self {
        Self {
            gauss_scale: 0.5,
            include_mean: true,
        }
    }

    /// Sets the Gaussian width.
    pub fn with_gauss_scale(mut self, gauss_scale: f64) -> Self {
        self.gauss_scale = gauss_scale;
        self
    }

    /// Sets whether the mean is carried by the first level.
    pub fn with_include_mean(mut self, include_mean: bool) -> Self {
        self.include_mean = include_mean;
        self
    }

    /// Returns the Gaussian width.
    pub fn gauss_scale(&self) -> f64 {
        self.gauss_scale
    }

    /// Returns whether the mean is carried by the first level.
    pub fn include_mean(&self) -> bool {
        self.include_mean
    }

    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns [`CascadeError::InvalidConfig`] if `gauss_scale` is not finite
    /// and positive.
    pub fn validate(&self) -> Result<(), CascadeError> {
        if !self.gauss_scale.is_finite() || self.gauss_scale <= 0.0 {
            return Err(CascadeError::InvalidConfig {
                reason: format!(
                    "gauss_scale must be finite and > 0, got {}",
                    self.gauss_scale
                ),
            });
        }
        Ok(())
    }
}

/// A bank of 2-D Fourier-domain weights, one array per cascade level.
///
/// Weights are laid out in the unshifted FFT order and sum to one at every
/// wavenumber, so the levels of a decomposition add back up to the input.
#[derive(Debug, Clone)]
pub struct BandpassFilter {
    weights: Vec<Array2<f64>>,
    central_wavenumbers: Vec<f64>,
    shape: (usize, usize),
}

impl BandpassFilter {
    /// Returns the number of levels.
    pub fn n_levels(&self) -> usize {
        self.weights.len()
    }

    /// Returns the weights of level `k`.
    ///
    /// # Panics
    ///
    /// Panics if `k >= n_levels()`.
    pub fn weights(&self, k: usize) -> &Array2<f64> {
        &self.weights[k]
    }

    /// Returns the central wavenumber of each level.
    pub fn central_wavenumbers(&self) -> &[f64] {
        &self.central_wavenumbers
    }

    /// Returns the field shape the filter was built for.
    pub fn shape(&self) -> (usize, usize) {
        self.shape
    }
}

/// Builds a filter bank with the given method.
///
/// # Errors
///
/// Returns [`CascadeError::InvalidLevels`] if `n_levels` is unusable for the
/// method, [`CascadeError::EmptyField`] for a zero-sized shape, or
/// [`CascadeError::InvalidConfig`] for bad options.
pub fn build_filter(
    method: FilterMethod,
    shape: (usize, usize),
    n_levels: usize,
    config: &FilterConfig,
) -> Result<BandpassFilter, CascadeError> {
    match method {
        FilterMethod::Gaussian => filter_gaussian(shape, n_levels, config),
        FilterMethod::Uniform => {
            if n_levels != 1 {
                return Err(CascadeError::InvalidLevels {
                    n_levels,
                    reason: "the uniform filter has exactly one level".into(),
                });
            }
            filter_uniform(shape)
        }
    }
}

fn log_or_zero(x: f64) -> f64 {
    if x > 0.0 { x.ln() } else { 0.0 }
}

/// Gaussian bandpass filter bank with geometrically spaced central
/// wavenumbers.
///
/// With `L = max(rows, cols)` and `q = (L / 2)^(1 / n_levels)`, level `k`
/// (1-based) is centred at `0.5 * (q^(k-1) + q^k)`.
///
/// # Errors
///
/// Returns [`CascadeError::InvalidLevels`] if `n_levels` is zero,
/// [`CascadeError::EmptyField`] for a zero-sized shape, or
/// [`CascadeError::InvalidConfig`] if the configuration is invalid.
pub fn filter_gaussian(
    shape: (usize, usize),
    n_levels: usize,
    config: &FilterConfig,
) -> Result<BandpassFilter, CascadeError> {
    config.validate()?;
    let (h, w) = shape;
    if h == 0 || w == 0 {
        return Err(CascadeError::EmptyField { shape });
    }
    if n_levels == 0 {
        return Err(CascadeError::InvalidLevels {
            n_levels,
            reason: "must be at least 1".into(),
        });
    }

    let max_len = h.max(w) as f64;
    let q = (0.5 * max_len).powf(1.0 / n_levels as f64);
    let central_wavenumbers: Vec<f64> = (1..=n_levels)
        .map(|k| 0.5 * (q.powi(k as i32 - 1) + q.powi(k as i32)))
        .collect();

    let radius = radial_wavenumbers(shape);
    let two_s2 = 2.0 * config.gauss_scale * config.gauss_scale;
    let mut weights: Vec<Array2<f64>> = central_wavenumbers
        .iter()
        .map(|&rc| {
            let c = log_or_zero(rc);
            radius.mapv(|r| {
                let d = log_or_zero(r) - c;
                (-d * d / two_s2).exp()
            })
        })
        .collect();

    let mut total = Array2::<f64>::zeros(shape);
    for wk in &weights {
        total += wk;
    }
    for wk in &mut weights {
        ndarray::Zip::from(wk).and(&total).for_each(|v, &t| {
            if t > 0.0 {
                *v /= t;
            }
        });
    }

    if config.include_mean {
        for (k, wk) in weights.iter_mut().enumerate() {
            wk[[0, 0]] = if k == 0 { 1.0 } else { 0.0 };
        }
    }

    Ok(BandpassFilter {
        weights,
        central_wavenumbers,
        shape,
    })
}

/// Single-level all-pass filter.
///
/// # Errors
///
/// Returns [`CascadeError::EmptyField`] for a zero-sized shape.
pub fn filter_uniform(shape: (usize, usize)) -> Result<BandpassFilter, CascadeError> {
    if shape.0 == 0 || shape.1 == 0 {
        return Err(CascadeError::EmptyField { shape });
    }
    Ok(BandpassFilter {
        weights: vec![Array2::ones(shape)],
        central_wavenumbers: vec![1.0],
        shape,
    })
}

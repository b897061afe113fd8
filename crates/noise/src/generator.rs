//! Spectrally filtered Gaussian noise.

use ndarray::{Array2, Zip};
use nimbus_cascade::{Fft2, radial_wavenumbers};
use rand::Rng;
use rand_distr::StandardNormal;
use tracing::debug;

use crate::config::{NoiseConfig, NoiseMethod};
use crate::error::NoiseError;

/// 1-D Tukey (tapered cosine) window of length `n`.
fn tukey(n: usize, alpha: f64) -> Vec<f64> {
    if n < 2 || alpha <= 0.0 {
        return vec![1.0; n];
    }
    let half = alpha / 2.0;
    (0..n)
        .map(|i| {
            let x = i as f64 / (n - 1) as f64;
            if x < half {
                0.5 * (1.0 + (std::f64::consts::PI * (x / half - 1.0)).cos())
            } else if x > 1.0 - half {
                0.5 * (1.0 + (std::f64::consts::PI * ((x - 1.0) / half + 1.0)).cos())
            } else {
                1.0
            }
        })
        .collect()
}

/// Separable 2-D Tukey window.
pub(crate) fn tukey_2d(shape: (usize, usize), alpha: f64) -> Array2<f64> {
    let wy = tukey(shape.0, alpha);
    let wx = tukey(shape.1, alpha);
    Array2::from_shape_fn(shape, |(i, j)| wy[i] * wx[j])
}

/// Fourier amplitude of a mean-removed, tapered frame.
fn tapered_amplitude(
    frame: &Array2<f64>,
    window: &Array2<f64>,
    fft: &Fft2,
) -> Result<Array2<f64>, NoiseError> {
    let mean = frame.mean().unwrap_or(0.0);
    let tapered = Zip::from(frame)
        .and(window)
        .map_collect(|&v, &w| (v - mean) * w);
    Ok(fft.forward(&tapered)?.mapv(|c| c.norm()))
}

/// Least-squares slope and intercept of `y` against `x`.
fn linear_fit(x: &[f64], y: &[f64]) -> Option<(f64, f64)> {
    let n = x.len() as f64;
    if x.len() < 2 {
        return None;
    }
    let mx = x.iter().sum::<f64>() / n;
    let my = y.iter().sum::<f64>() / n;
    let sxx: f64 = x.iter().map(|v| (v - mx) * (v - mx)).sum();
    let sxy: f64 = x.iter().zip(y).map(|(a, b)| (a - mx) * (b - my)).sum();
    if sxx == 0.0 {
        return None;
    }
    let slope = sxy / sxx;
    Some((slope, my - slope * mx))
}

/// Radially averaged power spectrum for integer wavenumbers `1..=L/2`.
fn radial_psd(amplitude: &Array2<f64>) -> Vec<(f64, f64)> {
    let shape = amplitude.dim();
    let radius = radial_wavenumbers(shape);
    let max_k = shape.0.max(shape.1) / 2;
    let mut sums = vec![0.0; max_k + 1];
    let mut counts = vec![0usize; max_k + 1];
    Zip::from(&radius).and(amplitude).for_each(|&r, &a| {
        let k = r.round() as usize;
        if k <= max_k {
            sums[k] += a * a;
            counts[k] += 1;
        }
    });
    (1..=max_k)
        .filter(|&k| counts[k] > 0)
        .map(|k| (k as f64, sums[k] / counts[k] as f64))
        .collect()
}

/// A fitted noise generator producing zero-mean, unit-variance fields whose
/// Fourier amplitudes follow the fitted filter.
#[derive(Debug, Clone)]
pub struct NoiseGenerator {
    method: NoiseMethod,
    filter: Array2<f64>,
    beta: Option<f64>,
}

impl NoiseGenerator {
    /// Fits a generator to `frames` (oldest first; the parametric method
    /// uses only the latest frame).
    ///
    /// # Errors
    ///
    /// | Variant | Trigger |
    /// |---------|---------|
    /// | [`NoiseError::EmptyInput`] | `frames` is empty |
    /// | [`NoiseError::ShapeMismatch`] | a frame does not match `fft` |
    /// | [`NoiseError::NonFiniteData`] | a frame contains NaN or infinity |
    /// | [`NoiseError::FitFailed`] | the power spectrum has no usable bins |
    /// | [`NoiseError::InvalidConfig`] | `config` is invalid |
    pub fn initialize(
        method: NoiseMethod,
        frames: &[Array2<f64>],
        fft: &Fft2,
        config: &NoiseConfig,
    ) -> Result<Self, NoiseError> {
        config.validate()?;
        if frames.is_empty() {
            return Err(NoiseError::EmptyInput);
        }
        let shape = fft.shape();
        for (index, frame) in frames.iter().enumerate() {
            if frame.dim() != shape {
                return Err(NoiseError::ShapeMismatch {
                    expected: shape,
                    got: frame.dim(),
                });
            }
            if frame.iter().any(|v| !v.is_finite()) {
                return Err(NoiseError::NonFiniteData { index });
            }
        }
        let window = tukey_2d(shape, config.tukey_alpha());

        let (filter, beta) = match method {
            NoiseMethod::Nonparametric => {
                let mut acc = Array2::<f64>::zeros(shape);
                for frame in frames {
                    acc += &tapered_amplitude(frame, &window, fft)?;
                }
                acc /= frames.len() as f64;
                (acc, None)
            }
            NoiseMethod::Parametric => {
                let latest = &frames[frames.len() - 1];
                let amplitude = tapered_amplitude(latest, &window, fft)?;
                let (log_k, log_p): (Vec<f64>, Vec<f64>) = radial_psd(&amplitude)
                    .into_iter()
                    .filter(|&(_, p)| p > 0.0)
                    .map(|(k, p)| (k.ln(), p.ln()))
                    .unzip();
                let (beta, _) = linear_fit(&log_k, &log_p).ok_or_else(|| NoiseError::FitFailed {
                    reason: format!("{} usable spectral bins", log_k.len()),
                })?;
                let filter = radial_wavenumbers(shape)
                    .mapv(|k| if k > 0.0 { k.powf(beta / 2.0) } else { 0.0 });
                (filter, Some(beta))
            }
        };
        debug!(?method, ?beta, "initialized noise generator");
        Ok(Self {
            method,
            filter,
            beta,
        })
    }

    /// Returns the method used to fit the generator.
    pub fn method(&self) -> NoiseMethod {
        self.method
    }

    /// Returns the Fourier amplitude filter.
    pub fn filter(&self) -> &Array2<f64> {
        &self.filter
    }

    /// Returns the fitted spectral slope (parametric method only).
    pub fn beta(&self) -> Option<f64> {
        self.beta
    }

    /// Draws one noise field.
    ///
    /// White Gaussian noise is filtered in the Fourier domain and the result
    /// standardized to zero mean and unit (population) variance.
    ///
    /// # Errors
    ///
    /// Returns [`NoiseError::ShapeMismatch`] if `fft` was planned for a
    /// different shape than the generator.
    pub fn generate<R: Rng + ?Sized>(&self, rng: &mut R, fft: &Fft2) -> Result<Array2<f64>, NoiseError> {
        let shape = self.filter.dim();
        if fft.shape() != shape {
            return Err(NoiseError::ShapeMismatch {
                expected: shape,
                got: fft.shape(),
            });
        }
        let white = Array2::from_shape_simple_fn(shape, || rng.sample::<f64, _>(StandardNormal));
        let mut spectrum = fft.forward(&white)?;
        Zip::from(&mut spectrum)
            .and(&self.filter)
            .for_each(|c, &a| *c *= a);
        let mut noise = fft.inverse_real(&spectrum)?;

        let values: Vec<f64> = noise.iter().copied().collect();
        let (mu, sigma) = nimbus_stats::masked_mean_sd(&values, None);
        if sigma > 0.0 && sigma.is_finite() {
            noise.mapv_inplace(|v| (v - mu) / sigma);
        } else {
            noise.fill(0.0);
        }
        Ok(noise)
    }
}

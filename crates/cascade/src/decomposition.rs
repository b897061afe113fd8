//! FFT-based cascade decomposition and recomposition.

use ndarray::{Array2, Zip};
use tracing::warn;

use crate::domain::DomainValue;
use crate::error::CascadeError;
use crate::fft::Fft2;
use crate::filter::BandpassFilter;

/// Cascade decomposition method.
///
/// Only the FFT method is currently available; the enum keeps the
/// selection explicit in configuration.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum DecompositionMethod {
    /// Bandpass filtering in the 2-D Fourier domain (default).
    #[default]
    Fft,
}

/// Normalized cascade levels of a single field with the statistics needed
/// to recompose it.
///
/// Level `k` holds `(band_k - means[k]) / stds[k]` in the domain of `T`.
#[derive(Debug, Clone)]
pub struct Cascade<T> {
    levels: Vec<Array2<T>>,
    means: Vec<f64>,
    stds: Vec<f64>,
}

impl<T: DomainValue> Cascade<T> {
    /// Assembles a cascade from its parts.
    ///
    /// # Errors
    ///
    /// Returns [`CascadeError::LevelCountMismatch`] if the three vectors
    /// differ in length.
    pub fn from_parts(
        levels: Vec<Array2<T>>,
        means: Vec<f64>,
        stds: Vec<f64>,
    ) -> Result<Self, CascadeError> {
        for got in [means.len(), stds.len()] {
            if got != levels.len() {
                return Err(CascadeError::LevelCountMismatch {
                    expected: levels.len(),
                    got,
                });
            }
        }
        Ok(Self {
            levels,
            means,
            stds,
        })
    }

    /// Number of levels.
    pub fn n_levels(&self) -> usize {
        self.levels.len()
    }

    /// Normalized level values.
    pub fn levels(&self) -> &[Array2<T>] {
        &self.levels
    }

    /// Per-level means.
    pub fn means(&self) -> &[f64] {
        &self.means
    }

    /// Per-level standard deviations.
    pub fn stds(&self) -> &[f64] {
        &self.stds
    }

    /// Consumes the cascade, returning `(levels, means, stds)`.
    pub fn into_parts(self) -> (Vec<Array2<T>>, Vec<f64>, Vec<f64>) {
        (self.levels, self.means, self.stds)
    }

    /// Recomposes the cascade into a real field.
    ///
    /// # Errors
    ///
    /// See [`recompose`].
    pub fn recompose(&self, fft: &Fft2) -> Result<Array2<f64>, CascadeError> {
        recompose(&self.levels, &self.means, &self.stds, fft)
    }
}

fn masked_stats(level: &Array2<f64>, mask: Option<&Array2<bool>>) -> (f64, f64) {
    let values: Vec<f64> = level.iter().copied().collect();
    match mask {
        Some(m) => {
            let keep: Vec<bool> = m.iter().copied().collect();
            nimbus_stats::masked_mean_sd(&values, Some(&keep))
        }
        None => nimbus_stats::masked_mean_sd(&values, None),
    }
}

/// Decomposes `field` into the levels of `filter`.
///
/// Each band is obtained by weighting the field's spectrum and transforming
/// back. The band mean and population standard deviation are computed over
/// the pixels where `mask` is set (all pixels without a mask). A band with
/// zero or non-finite standard deviation is left unscaled (std 1).
///
/// An all-false mask falls back to unconditional statistics.
///
/// # Errors
///
/// Returns [`CascadeError::ShapeMismatch`] if the field, mask, filter and FFT
/// shapes disagree, or [`CascadeError::NonFiniteData`] if `field` contains
/// non-finite values.
pub fn decompose<T: DomainValue>(
    field: &Array2<f64>,
    filter: &BandpassFilter,
    mask: Option<&Array2<bool>>,
    fft: &Fft2,
) -> Result<Cascade<T>, CascadeError> {
    let expected = fft.shape();
    for got in [field.dim(), filter.shape()] {
        if got != expected {
            return Err(CascadeError::ShapeMismatch { expected, got });
        }
    }
    if let Some(m) = mask
        && m.dim() != expected
    {
        return Err(CascadeError::ShapeMismatch {
            expected,
            got: m.dim(),
        });
    }
    if field.iter().any(|v| !v.is_finite()) {
        return Err(CascadeError::NonFiniteData);
    }

    let mask = match mask {
        Some(m) if !m.iter().any(|&b| b) => {
            warn!("conditional mask selects no pixels, using unconditional statistics");
            None
        }
        other => other,
    };

    let spectrum = fft.forward(field)?;
    let n_levels = filter.n_levels();
    let mut levels = Vec::with_capacity(n_levels);
    let mut means = Vec::with_capacity(n_levels);
    let mut stds = Vec::with_capacity(n_levels);

    for k in 0..n_levels {
        let mut band_spec = spectrum.clone();
        Zip::from(&mut band_spec)
            .and(filter.weights(k))
            .for_each(|c, &w| *c *= w);
        let mut band = fft.inverse_real(&band_spec)?;

        let (mu, sigma) = masked_stats(&band, mask);
        let sigma = if sigma.is_finite() && sigma > 0.0 {
            sigma
        } else {
            1.0
        };
        band.mapv_inplace(|v| (v - mu) / sigma);

        levels.push(T::from_spatial(band, fft)?);
        means.push(mu);
        stds.push(sigma);
    }

    Ok(Cascade {
        levels,
        means,
        stds,
    })
}

/// Recomposes normalized levels into a real field:
/// `sum_k(levels[k] * stds[k] + means[k])`.
///
/// In the spectral domain the weighted spectra are summed first and a single
/// inverse transform is applied.
///
/// # Errors
///
/// Returns [`CascadeError::LevelCountMismatch`] if the inputs differ in
/// length or are empty, or [`CascadeError::ShapeMismatch`] if a level does
/// not match the FFT shape.
pub fn recompose<T: DomainValue>(
    levels: &[Array2<T>],
    means: &[f64],
    stds: &[f64],
    fft: &Fft2,
) -> Result<Array2<f64>, CascadeError> {
    if levels.is_empty() {
        return Err(CascadeError::LevelCountMismatch {
            expected: 1,
            got: 0,
        });
    }
    for got in [means.len(), stds.len()] {
        if got != levels.len() {
            return Err(CascadeError::LevelCountMismatch {
                expected: levels.len(),
                got,
            });
        }
    }

    let shape = fft.shape();
    let mut acc = Array2::from_elem(shape, T::zero());
    for (level, &sigma) in levels.iter().zip(stds) {
        if level.dim() != shape {
            return Err(CascadeError::ShapeMismatch {
                expected: shape,
                got: level.dim(),
            });
        }
        Zip::from(&mut acc)
            .and(level)
            .for_each(|a, &v| *a = *a + v * sigma);
    }
    let offset: f64 = means.iter().sum();
    T::finish(acc, offset, fft)
}

//! Spatial and spectral representations of cascade levels.

use std::fmt;
use std::ops::{Add, Mul};

use ndarray::Array2;
use num_complex::Complex64;

use crate::error::CascadeError;
use crate::fft::Fft2;

/// Domain in which cascade levels and noise are held between steps.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Domain {
    /// Real-valued arrays in physical space (default).
    #[default]
    Spatial,
    /// Unnormalized 2-D Fourier coefficients.
    Spectral,
}

/// Element type of a cascade level in a given [`Domain`].
///
/// Implemented for `f64` (spatial) and [`Complex64`] (spectral). The AR
/// recurrence and the recomposition sum are linear, so both can be written
/// once over this trait.
pub trait DomainValue:
    Copy + Send + Sync + fmt::Debug + 'static + Add<Output = Self> + Mul<f64, Output = Self>
{
    /// The domain this element type represents.
    const DOMAIN: Domain;

    /// Additive identity.
    fn zero() -> Self;

    /// Converts a real spatial array into this domain.
    ///
    /// # Errors
    ///
    /// Returns [`CascadeError::ShapeMismatch`] if `field` does not match the
    /// shape `fft` was planned for.
    fn from_spatial(field: Array2<f64>, fft: &Fft2) -> Result<Array2<Self>, CascadeError>;

    /// Converts an array in this domain back to a real spatial array.
    ///
    /// # Errors
    ///
    /// Returns [`CascadeError::ShapeMismatch`] on a shape mismatch.
    fn to_spatial(values: &Array2<Self>, fft: &Fft2) -> Result<Array2<f64>, CascadeError>;

    /// Adds a spatially constant `offset` to `acc` and returns the real
    /// field.
    ///
    /// # Errors
    ///
    /// Returns [`CascadeError::ShapeMismatch`] on a shape mismatch.
    fn finish(acc: Array2<Self>, offset: f64, fft: &Fft2) -> Result<Array2<f64>, CascadeError>;
}

impl DomainValue for f64 {
    const DOMAIN: Domain = Domain::Spatial;

    fn zero() -> Self {
        0.0
    }

    fn from_spatial(field: Array2<f64>, _fft: &Fft2) -> Result<Array2<Self>, CascadeError> {
        Ok(field)
    }

    fn to_spatial(values: &Array2<Self>, _fft: &Fft2) -> Result<Array2<f64>, CascadeError> {
        Ok(values.clone())
    }

    fn finish(mut acc: Array2<Self>, offset: f64, _fft: &Fft2) -> Result<Array2<f64>, CascadeError> {
        acc.mapv_inplace(|v| v + offset);
        Ok(acc)
    }
}

impl DomainValue for Complex64 {
    const DOMAIN: Domain = Domain::Spectral;

    fn zero() -> Self {
        Complex64::new(0.0, 0.0)
    }

    fn from_spatial(field: Array2<f64>, fft: &Fft2) -> Result<Array2<Self>, CascadeError> {
        fft.forward(&field)
    }

    fn to_spatial(values: &Array2<Self>, fft: &Fft2) -> Result<Array2<f64>, CascadeError> {
        fft.inverse_real(values)
    }

    fn finish(mut acc: Array2<Self>, offset: f64, fft: &Fft2) -> Result<Array2<f64>, CascadeError> {
        // A constant c has DC coefficient c * N in an unnormalized transform.
        if let Some(dc) = acc.get_mut([0, 0]) {
            *dc += Complex64::new(offset * fft.len() as f64, 0.0);
        }
        fft.inverse_real(&acc)
    }
}

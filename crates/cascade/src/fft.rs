//! Planned 2-D discrete Fourier transforms.
//!
//! Row and column transforms are planned once with `rustfft` and applied
//! separably. The forward transform is unnormalized; [`Fft2::inverse_real`]
//! divides by the number of pixels so that a forward/inverse pair is the
//! identity.

use std::fmt;
use std::sync::Arc;

use ndarray::Array2;
use num_complex::Complex64;
use rustfft::{Fft, FftPlanner};

use crate::error::CascadeError;

/// Reusable 2-D FFT plans for a fixed field shape.
///
/// Cheap to clone (plans are shared) and safe to use from several threads.
#[derive(Clone)]
pub struct Fft2 {
    shape: (usize, usize),
    row_forward: Arc<dyn Fft<f64>>,
    row_inverse: Arc<dyn Fft<f64>>,
    col_forward: Arc<dyn Fft<f64>>,
    col_inverse: Arc<dyn Fft<f64>>,
}

impl fmt::Debug for Fft2 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Fft2").field("shape", &self.shape).finish()
    }
}

impl Fft2 {
    /// Plans forward and inverse transforms for fields of `shape = (rows, cols)`.
    ///
    /// # Errors
    ///
    /// Returns [`CascadeError::EmptyField`] if either dimension is zero.
    pub fn new(shape: (usize, usize)) -> Result<Self, CascadeError> {
        let (h, w) = shape;
        if h == 0 || w == 0 {
            return Err(CascadeError::EmptyField { shape });
        }
        let mut planner = FftPlanner::new();
        Ok(Self {
            shape,
            row_forward: planner.plan_fft_forward(w),
            row_inverse: planner.plan_fft_inverse(w),
            col_forward: planner.plan_fft_forward(h),
            col_inverse: planner.plan_fft_inverse(h),
        })
    }

    /// Returns the planned `(rows, cols)` shape.
    pub fn shape(&self) -> (usize, usize) {
        self.shape
    }

    /// Number of pixels in the planned shape.
    pub fn len(&self) -> usize {
        self.shape.0 * self.shape.1
    }

    /// Always `false`; empty shapes are rejected at construction.
    pub fn is_empty(&self) -> bool {
        false
    }

    fn check_shape(&self, got: (usize, usize)) -> Result<(), CascadeError> {
        if got != self.shape {
            return Err(CascadeError::ShapeMismatch {
                expected: self.shape,
                got,
            });
        }
        Ok(())
    }

    /// Forward transform of a real field.
    ///
    /// # Errors
    ///
    /// Returns [`CascadeError::ShapeMismatch`] if `field` has the wrong shape.
    pub fn forward(&self, field: &Array2<f64>) -> Result<Array2<Complex64>, CascadeError> {
        self.check_shape(field.dim())?;
        let mut data = field.mapv(|v| Complex64::new(v, 0.0));
        self.apply(&mut data, &*self.row_forward, &*self.col_forward);
        Ok(data)
    }

    /// Inverse transform returning the (normalized) real part.
    ///
    /// # Errors
    ///
    /// Returns [`CascadeError::ShapeMismatch`] if `spectrum` has the wrong shape.
    pub fn inverse_real(&self, spectrum: &Array2<Complex64>) -> Result<Array2<f64>, CascadeError> {
        self.check_shape(spectrum.dim())?;
        let mut data = spectrum.clone();
        self.apply(&mut data, &*self.row_inverse, &*self.col_inverse);
        let norm = 1.0 / self.len() as f64;
        Ok(data.mapv(|c| c.re * norm))
    }

    fn apply(&self, data: &mut Array2<Complex64>, row: &dyn Fft<f64>, col: &dyn Fft<f64>) {
        let (h, w) = self.shape;

        let mut buf = vec![Complex64::new(0.0, 0.0); w];
        for mut r in data.rows_mut() {
            for (b, v) in buf.iter_mut().zip(r.iter()) {
                *b = *v;
            }
            row.process(&mut buf);
            for (v, b) in r.iter_mut().zip(buf.iter()) {
                *v = *b;
            }
        }

        let mut buf = vec![Complex64::new(0.0, 0.0); h];
        for mut c in data.columns_mut() {
            for (b, v) in buf.iter_mut().zip(c.iter()) {
                *b = *v;
            }
            col.process(&mut buf);
            for (v, b) in c.iter_mut().zip(buf.iter()) {
                *v = *b;
            }
        }
    }
}

/// Signed frequency index of DFT bin `i` for a transform of length `n`.
pub(crate) fn signed_frequency(i: usize, n: usize) -> f64 {
    if i <= n / 2 {
        i as f64
    } else {
        i as f64 - n as f64
    }
}

/// Radial wavenumber grid for `shape` in DFT index units, laid out in the
/// unshifted order produced by [`Fft2::forward`].
pub fn radial_wavenumbers(shape: (usize, usize)) -> Array2<f64> {
    let (h, w) = shape;
    Array2::from_shape_fn(shape, |(i, j)| {
        let ky = signed_frequency(i, h);
        let kx = signed_frequency(j, w);
        (kx * kx + ky * ky).sqrt()
    })
}

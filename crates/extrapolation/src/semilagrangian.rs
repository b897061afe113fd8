//! Backward semi-Lagrangian advection.

use ndarray::{Array2, Array3};
use tracing::debug;

use crate::error::ExtrapolationError;
use crate::extrapolator::{Extrapolation, Extrapolator, OutsideFill, check_inputs};
use crate::interp::{sample_clamped, sample_inside};

/// Options for [`SemiLagrangian`].
#[derive(Debug, Clone)]
pub struct SemiLagrangianConfig {
    /// Midpoint sub-steps per lead-time increment.
    n_iter: usize,
}

impl Default for SemiLagrangianConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl SemiLagrangianConfig {
    /// Creates a configuration with one sub-step per increment.
    pub fn new() -> Self {
        Self { n_iter: 1 }
    }

    /// Sets the number of sub-steps per increment.
    pub fn with_n_iter(mut self, n_iter: usize) -> Self {
        self.n_iter = n_iter;
        self
    }

    /// Returns the number of sub-steps per increment.
    pub fn n_iter(&self) -> usize {
        self.n_iter
    }

    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ExtrapolationError::InvalidConfig`] if `n_iter` is zero.
    pub fn validate(&self) -> Result<(), ExtrapolationError> {
        if self.n_iter == 0 {
            return Err(ExtrapolationError::InvalidConfig {
                reason: "n_iter must be at least 1".into(),
            });
        }
        Ok(())
    }
}

/// Semi-Lagrangian extrapolation with a cumulative displacement.
///
/// For every pixel `x` the displacement `D(x)` is the distance travelled by
/// the parcel that arrives at `x`; the advected field is the input sampled
/// at `x - D(x)`. Each lead-time increment `dt` is integrated in `n_iter`
/// midpoint sub-steps, sampling the motion field (edge-clamped, bilinear)
/// half a sub-step upstream.
#[derive(Debug, Clone)]
pub struct SemiLagrangian {
    config: SemiLagrangianConfig,
}

impl SemiLagrangian {
    /// Creates the scheme.
    ///
    /// # Errors
    ///
    /// Returns [`ExtrapolationError::InvalidConfig`] for an invalid
    /// configuration.
    pub fn new(config: SemiLagrangianConfig) -> Result<Self, ExtrapolationError> {
        config.validate()?;
        Ok(Self { config })
    }

    /// Returns the configuration.
    pub fn config(&self) -> &SemiLagrangianConfig {
        &self.config
    }

    fn advance(&self, motion: &Array3<f64>, displacement: &mut Array3<f64>, dt: f64) {
        let (_, h, w) = motion.dim();
        let n_iter = self.config.n_iter;
        let sub = dt / n_iter as f64;
        let u = motion.index_axis(ndarray::Axis(0), 0).to_owned();
        let v = motion.index_axis(ndarray::Axis(0), 1).to_owned();

        for i in 0..h {
            for j in 0..w {
                let mut inc_x = u[[i, j]] * sub;
                let mut inc_y = v[[i, j]] * sub;
                for _ in 0..n_iter {
                    let x = j as f64 - displacement[[0, i, j]] - inc_x / 2.0;
                    let y = i as f64 - displacement[[1, i, j]] - inc_y / 2.0;
                    inc_x = sample_clamped(&u, y, x) * sub;
                    inc_y = sample_clamped(&v, y, x) * sub;
                    displacement[[0, i, j]] += inc_x;
                    displacement[[1, i, j]] += inc_y;
                }
            }
        }
    }
}

/// Samples `field` at `x - displacement(x)` with `fill` outside the grid.
pub(crate) fn warp(field: &Array2<f64>, displacement: &Array3<f64>, fill: f64) -> Array2<f64> {
    Array2::from_shape_fn(field.dim(), |(i, j)| {
        let x = j as f64 - displacement[[0, i, j]];
        let y = i as f64 - displacement[[1, i, j]];
        sample_inside(field, y, x).unwrap_or(fill)
    })
}

impl Extrapolator for SemiLagrangian {
    fn extrapolate(
        &self,
        field: Option<&Array2<f64>>,
        motion: &Array3<f64>,
        lead_times: &[f64],
        outside: OutsideFill,
        displacement_prev: Option<&Array3<f64>>,
    ) -> Result<Extrapolation, ExtrapolationError> {
        let (h, w) = check_inputs(field, motion, lead_times, displacement_prev)?;
        let mut displacement = match displacement_prev {
            Some(d) => d.clone(),
            None => Array3::zeros((2, h, w)),
        };
        let fill = field.map(|f| outside.resolve(f)).unwrap_or(f64::NAN);

        let mut fields = Vec::with_capacity(if field.is_some() { lead_times.len() } else { 0 });
        let mut prev = 0.0;
        for &t in lead_times {
            let dt = t - prev;
            prev = t;
            if dt > 0.0 {
                self.advance(motion, &mut displacement, dt);
            }
            if let Some(f) = field {
                fields.push(warp(f, &displacement, fill));
            }
        }
        debug!(n_lead_times = lead_times.len(), "semi-Lagrangian extrapolation");
        Ok(Extrapolation::new(fields, displacement))
    }
}

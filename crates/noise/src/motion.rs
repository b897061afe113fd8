//! Motion-field perturbations.

use ndarray::{Array3, Axis, Zip};
use rand::Rng;
use rand_distr::Open01;

use crate::error::NoiseError;

/// Motion perturbation method.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum VelPertMethod {
    /// Parallel/perpendicular perturbations with power-law growth (default).
    #[default]
    Bps,
}

/// Amplitude parameters `[p0, p1, p2]` of `g(t) = p0 * t^p1 + p2` for the
/// components parallel and perpendicular to the motion.
#[derive(Debug, Clone)]
pub struct VelPertConfig {
    p_par: [f64; 3],
    p_perp: [f64; 3],
}

impl Default for VelPertConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl VelPertConfig {
    /// Creates a configuration with `p_par = [10.88, 0.23, -7.68]` and
    /// `p_perp = [5.76, 0.31, -2.72]`.
    pub fn new() -> Self {
        Self {
            p_par: [10.88, 0.23, -7.68],
            p_perp: [5.76, 0.31, -2.72],
        }
    }

    /// Sets the parallel-component parameters.
    pub fn with_p_par(mut self, p_par: [f64; 3]) -> Self {
        self.p_par = p_par;
        self
    }

    /// Sets the perpendicular-component parameters.
    pub fn with_p_perp(mut self, p_perp: [f64; 3]) -> Self {
        self.p_perp = p_perp;
        self
    }

    /// Returns the parallel-component parameters.
    pub fn p_par(&self) -> [f64; 3] {
        self.p_par
    }

    /// Returns the perpendicular-component parameters.
    pub fn p_perp(&self) -> [f64; 3] {
        self.p_perp
    }

    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns [`NoiseError::InvalidConfig`] if any parameter is non-finite.
    pub fn validate(&self) -> Result<(), NoiseError> {
        if self.p_par.iter().chain(&self.p_perp).any(|v| !v.is_finite()) {
            return Err(NoiseError::InvalidConfig {
                reason: format!(
                    "velocity perturbation parameters must be finite, got p_par={:?}, p_perp={:?}",
                    self.p_par, self.p_perp
                ),
            });
        }
        Ok(())
    }
}

/// Draws from a Laplace distribution with location 0 and scale `b` by
/// inverting its CDF.
fn sample_laplace<R: Rng + ?Sized>(rng: &mut R, b: f64) -> f64 {
    let u: f64 = rng.sample(Open01);
    if u < 0.5 {
        b * (2.0 * u).ln()
    } else {
        -b * (2.0 * (1.0 - u)).ln()
    }
}

/// A per-member motion perturbation with fixed random amplitudes.
#[derive(Debug, Clone)]
pub struct MotionPerturbator {
    eps_par: f64,
    eps_perp: f64,
    /// Unit motion vectors (zero where the motion vanishes).
    v_par: Array3<f64>,
    v_perp: Array3<f64>,
    /// Converts km/h to pixels per time step.
    vsf: f64,
    config: VelPertConfig,
}

impl MotionPerturbator {
    /// Draws the two perturbation amplitudes from `rng` and prepares unit
    /// vectors of `motion` (`(2, rows, cols)`).
    ///
    /// # Errors
    ///
    /// Returns [`NoiseError::InvalidConfig`] if `pixels_per_km` or
    /// `timestep` (minutes) is not positive, the parameters are invalid or
    /// `motion` does not have two components.
    pub fn new<R: Rng + ?Sized>(
        motion: &Array3<f64>,
        pixels_per_km: f64,
        timestep: f64,
        config: &VelPertConfig,
        rng: &mut R,
    ) -> Result<Self, NoiseError> {
        config.validate()?;
        if !(pixels_per_km > 0.0 && timestep > 0.0) {
            return Err(NoiseError::InvalidConfig {
                reason: format!(
                    "pixels_per_km and timestep must be > 0, got {pixels_per_km} and {timestep}"
                ),
            });
        }
        let (c, h, w) = motion.dim();
        if c != 2 {
            return Err(NoiseError::InvalidConfig {
                reason: format!("motion field must have 2 components, got {c}"),
            });
        }

        let b = 1.0 / std::f64::consts::SQRT_2;
        let eps_par = sample_laplace(rng, b);
        let eps_perp = sample_laplace(rng, b);

        let mut v_par = Array3::zeros((2, h, w));
        let u = motion.index_axis(Axis(0), 0);
        let v = motion.index_axis(Axis(0), 1);
        let (mut px, mut py) = v_par.multi_slice_mut((ndarray::s![0, .., ..], ndarray::s![1, .., ..]));
        Zip::from(&mut px)
            .and(&mut py)
            .and(&u)
            .and(&v)
            .for_each(|px, py, &u, &v| {
                let norm = (u * u + v * v).sqrt();
                if norm > 1e-12 {
                    *px = u / norm;
                    *py = v / norm;
                }
            });
        let mut v_perp = Array3::zeros((2, h, w));
        v_perp
            .index_axis_mut(Axis(0), 0)
            .assign(&v_par.index_axis(Axis(0), 1).mapv(|y| -y));
        v_perp
            .index_axis_mut(Axis(0), 1)
            .assign(&v_par.index_axis(Axis(0), 0));

        Ok(Self {
            eps_par,
            eps_perp,
            v_par,
            v_perp,
            vsf: 60.0 / (timestep * pixels_per_km),
            config: config.clone(),
        })
    }

    /// Returns the drawn `(parallel, perpendicular)` amplitudes.
    pub fn amplitudes(&self) -> (f64, f64) {
        (self.eps_par, self.eps_perp)
    }

    /// Perturbation to add to the motion field after `t` minutes of lead
    /// time, in pixels per time step.
    pub fn generate(&self, t: f64) -> Array3<f64> {
        let g = |p: [f64; 3]| p[0] * t.powf(p[1]) + p[2];
        let a_par = g(self.config.p_par) * self.eps_par / self.vsf;
        let a_perp = g(self.config.p_perp) * self.eps_perp / self.vsf;
        Zip::from(&self.v_par)
            .and(&self.v_perp)
            .map_collect(|&par, &perp| a_par * par + a_perp * perp)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn eastward(h: usize, w: usize) -> Array3<f64> {
        let mut m = Array3::zeros((2, h, w));
        m.index_axis_mut(Axis(0), 0).fill(2.0);
        m
    }

    #[test]
    fn perturbation_is_along_motion_axes() {
        let mut rng = StdRng::seed_from_u64(11);
        let p = MotionPerturbator::new(&eastward(4, 4), 1.0, 5.0, &VelPertConfig::new(), &mut rng)
            .unwrap();
        let (e_par, e_perp) = p.amplitudes();
        let t = 30.0;
        let pert = p.generate(t);
        let vsf = 60.0 / 5.0;
        let g_par = 10.88 * t.powf(0.23) - 7.68;
        let g_perp = 5.76 * t.powf(0.31) - 2.72;
        // Parallel is +x, perpendicular is +y for eastward motion.
        assert_relative_eq!(pert[[0, 1, 1]], g_par * e_par / vsf, epsilon = 1e-12);
        assert_relative_eq!(pert[[1, 1, 1]], g_perp * e_perp / vsf, epsilon = 1e-12);
    }

    #[test]
    fn zero_motion_gives_zero_perturbation() {
        let mut rng = StdRng::seed_from_u64(1);
        let p = MotionPerturbator::new(
            &Array3::zeros((2, 3, 3)),
            1.0,
            5.0,
            &VelPertConfig::new(),
            &mut rng,
        )
        .unwrap();
        assert!(p.generate(10.0).iter().all(|&v| v == 0.0));
    }

    #[test]
    fn laplace_draws_have_expected_spread() {
        let mut rng = StdRng::seed_from_u64(5);
        let b = 1.0 / std::f64::consts::SQRT_2;
        let draws: Vec<f64> = (0..20_000).map(|_| sample_laplace(&mut rng, b)).collect();
        let mean = draws.iter().sum::<f64>() / draws.len() as f64;
        let var = draws.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / draws.len() as f64;
        // Var = 2 b^2 = 1.
        assert!(mean.abs() < 0.05, "mean = {mean}");
        assert!((var - 1.0).abs() < 0.1, "var = {var}");
    }

    #[test]
    fn invalid_resolution_rejected() {
        let mut rng = StdRng::seed_from_u64(1);
        let err = MotionPerturbator::new(&eastward(2, 2), 0.0, 5.0, &VelPertConfig::new(), &mut rng)
            .unwrap_err();
        assert!(matches!(err, NoiseError::InvalidConfig { .. }));
    }
}

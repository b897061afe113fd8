//! State and time stepping of a single ensemble member.

use std::collections::VecDeque;

use ndarray::{Array2, Array3, Zip};
use nimbus_autoregression::iterate_ar;
use nimbus_cascade::{BandpassFilter, DomainValue, Fft2, decompose, recompose};
use nimbus_extrapolation::{Extrapolator, OutsideFill};
use nimbus_noise::{MotionPerturbator, NoiseGenerator};
use nimbus_probmatch::{match_conditional_mean, match_empirical_cdf};
use rand::rngs::StdRng;

use crate::error::StepsError;
use crate::mask::MaskEngine;
use crate::timesteps::blend_weight;

/// Probability matching with its reference data.
#[derive(Debug, Clone, Copy)]
pub(crate) enum Matching<'a> {
    /// Empirical CDF of the latest aligned observation.
    Cdf(&'a Array2<f64>),
    /// Conditional mean of the latest observation above the threshold.
    Mean { threshold: f64, target: f64 },
}

/// Read-only data shared by all members during one step.
pub(crate) struct StepContext<'a, T> {
    pub(crate) fft: &'a Fft2,
    pub(crate) filter: &'a BandpassFilter,
    /// AR coefficients per level, `[phi_1, ..., phi_p, phi_0]`.
    pub(crate) coefficients: &'a [Vec<f64>],
    pub(crate) noise: Option<&'a NoiseGenerator>,
    pub(crate) noise_std_coeffs: &'a [f64],
    /// Unperturbed trajectory that members follow when they have no
    /// stochastic forcing.
    pub(crate) companion: Option<&'a [VecDeque<Array2<T>>]>,
    /// Level statistics of the latest observation.
    pub(crate) means: &'a [f64],
    pub(crate) stds: &'a [f64],
    pub(crate) mask: Option<&'a MaskEngine>,
    pub(crate) matching: Option<Matching<'a>>,
    /// Pixels outside the radar domain.
    pub(crate) domain_mask: &'a Array2<bool>,
    pub(crate) extrapolator: &'a dyn Extrapolator,
    pub(crate) motion: &'a Array3<f64>,
    /// Length of a time step in minutes, for motion perturbations.
    pub(crate) timestep: f64,
}

/// Evolving state of one ensemble member.
#[derive(Debug)]
pub(crate) struct MemberState<T> {
    /// Last `p` normalized states per cascade level, oldest first.
    cascade: Vec<VecDeque<Array2<T>>>,
    rng: StdRng,
    vel_pert: Option<MotionPerturbator>,
    /// Incremental mask weights for the next step.
    mask: Option<Array2<f64>>,
    displacement: Option<Array3<f64>>,
    /// Field at the end of the previous step, before advection.
    prev_field: Array2<f64>,
    /// Time up to which the displacement has been advanced.
    t_prev: f64,
    /// Time elapsed since the analysis, for motion perturbations.
    t_total: f64,
}

impl<T: DomainValue> MemberState<T> {
    pub(crate) fn new(
        cascade: Vec<VecDeque<Array2<T>>>,
        rng: StdRng,
        vel_pert: Option<MotionPerturbator>,
        mask: Option<Array2<f64>>,
        initial_field: Array2<f64>,
    ) -> Self {
        Self {
            cascade,
            rng,
            vel_pert,
            mask,
            displacement: None,
            prev_field: initial_field,
            t_prev: 0.0,
            t_total: 0.0,
        }
    }

    /// Advances the member through step `step` and returns the advected
    /// fields at `subtimes`.
    pub(crate) fn advance(
        &mut self,
        ctx: &StepContext<'_, T>,
        step: usize,
        subtimes: &[f64],
    ) -> Result<Vec<Array2<f64>>, StepsError> {
        let noise = match ctx.noise {
            Some(generator) => {
                let eps = generator.generate(&mut self.rng, ctx.fft)?;
                let (levels, _, _) = decompose::<T>(&eps, ctx.filter, None, ctx.fft)?.into_parts();
                Some(
                    levels
                        .into_iter()
                        .zip(ctx.noise_std_coeffs)
                        .map(|(level, &c)| level.mapv(|v| v * c))
                        .collect::<Vec<_>>(),
                )
            }
            None => None,
        };

        let stochastic = noise.is_some() || self.vel_pert.is_some();
        for (k, states) in self.cascade.iter_mut().enumerate() {
            match (stochastic, ctx.companion) {
                (false, Some(companion)) => states.clone_from(&companion[k]),
                _ => {
                    let eps_k = noise.as_ref().map(|n| &n[k]);
                    iterate_ar(states, &ctx.coefficients[k], eps_k)?;
                }
            }
        }

        let latest: Vec<Array2<T>> = self
            .cascade
            .iter()
            .filter_map(|states| states.back().cloned())
            .collect();
        let mut field = recompose(&latest, ctx.means, ctx.stds, ctx.fft)?;

        if let Some(mask) = ctx.mask {
            mask.apply(&mut field, self.mask.as_ref());
        }
        field = match ctx.matching {
            Some(Matching::Cdf(reference)) => match_empirical_cdf(&field, reference)?,
            Some(Matching::Mean { threshold, target }) => {
                match_conditional_mean(&field, threshold, target)?
            }
            None => field,
        };
        if let Some(mask) = ctx.mask
            && let Some(next) = mask.next_member_mask(&field)
        {
            self.mask = Some(next);
        }
        Zip::from(&mut field)
            .and(ctx.domain_mask)
            .for_each(|v, &outside| {
                if outside {
                    *v = f64::NAN;
                }
            });

        let mut outputs = Vec::with_capacity(subtimes.len());
        for &t in subtimes {
            let w = blend_weight(step, t);
            let interpolated = if w < 1.0 {
                let mut blend = self.prev_field.mapv(|v| v * (1.0 - w));
                Zip::from(&mut blend).and(&field).for_each(|a, &b| *a += w * b);
                blend
            } else {
                field.clone()
            };
            let dt = t - self.t_prev;
            self.t_total += dt;
            let motion = self.motion_at(ctx);
            let (mut fields, displacement) = ctx
                .extrapolator
                .extrapolate(
                    Some(&interpolated),
                    &motion,
                    &[dt],
                    OutsideFill::Nan,
                    self.displacement.as_ref(),
                )?
                .into_parts();
            self.displacement = Some(displacement);
            outputs.push(fields.pop().unwrap_or(interpolated));
            self.t_prev = t;
        }

        if subtimes.is_empty() {
            let dt = step as f64 - self.t_prev;
            self.t_total += dt;
            let motion = self.motion_at(ctx);
            let (_, displacement) = ctx
                .extrapolator
                .extrapolate(
                    None,
                    &motion,
                    &[dt],
                    OutsideFill::Nan,
                    self.displacement.as_ref(),
                )?
                .into_parts();
            self.displacement = Some(displacement);
            self.t_prev = step as f64;
        }

        self.prev_field = field;
        Ok(outputs)
    }

    /// Motion field at the member's elapsed time, perturbed when motion
    /// perturbations are enabled.
    fn motion_at(&self, ctx: &StepContext<'_, T>) -> Array3<f64> {
        match &self.vel_pert {
            Some(p) => ctx.motion + &p.generate(self.t_total * ctx.timestep),
            None => ctx.motion.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nimbus_autoregression::ArSpec;
    use nimbus_cascade::{FilterConfig, filter_gaussian};
    use nimbus_extrapolation::{SemiLagrangian, SemiLagrangianConfig};
    use rand::SeedableRng;

    struct Fixture {
        fft: Fft2,
        filter: BandpassFilter,
        coefficients: Vec<Vec<f64>>,
        means: Vec<f64>,
        stds: Vec<f64>,
        domain: Array2<bool>,
        scheme: SemiLagrangian,
        motion: Array3<f64>,
        states: Vec<VecDeque<Array2<f64>>>,
        latest: Array2<f64>,
    }

    fn fixture() -> Fixture {
        let n = 16;
        let fft = Fft2::new((n, n)).unwrap();
        let filter = filter_gaussian((n, n), 3, &FilterConfig::new()).unwrap();
        let frames: Vec<Array2<f64>> = (0..3)
            .map(|t| {
                Array2::from_shape_fn((n, n), |(i, j)| {
                    ((i as f64 * 0.4 + t as f64 * 0.1).sin() + (j as f64 * 0.3).cos()).max(0.0)
                })
            })
            .collect();
        let cascades: Vec<_> = frames
            .iter()
            .map(|f| decompose::<f64>(f, &filter, None, &fft).unwrap())
            .collect();
        let fit = ArSpec::new(2).unwrap().fit(&[0.8, 0.5]).unwrap();
        let states = (0..3)
            .map(|k| cascades[1..].iter().map(|c| c.levels()[k].clone()).collect())
            .collect();
        Fixture {
            means: cascades[2].means().to_vec(),
            stds: cascades[2].stds().to_vec(),
            coefficients: vec![fit.coefficients().to_vec(); 3],
            fft,
            filter,
            domain: Array2::from_elem((n, n), false),
            scheme: SemiLagrangian::new(SemiLagrangianConfig::new()).unwrap(),
            motion: Array3::zeros((2, n, n)),
            states,
            latest: frames[2].clone(),
        }
    }

    fn context<'a>(
        f: &'a Fixture,
        companion: Option<&'a [VecDeque<Array2<f64>>]>,
    ) -> StepContext<'a, f64> {
        StepContext {
            fft: &f.fft,
            filter: &f.filter,
            coefficients: &f.coefficients,
            noise: None,
            noise_std_coeffs: &[1.0, 1.0, 1.0],
            companion,
            means: &f.means,
            stds: &f.stds,
            mask: None,
            matching: None,
            domain_mask: &f.domain,
            extrapolator: &f.scheme,
            motion: &f.motion,
            timestep: 5.0,
        }
    }

    fn member(f: &Fixture) -> MemberState<f64> {
        MemberState::new(
            f.states.clone(),
            StdRng::seed_from_u64(1),
            None,
            None,
            f.latest.clone(),
        )
    }

    #[test]
    fn deterministic_member_follows_companion() {
        let f = fixture();
        let mut companion = f.states.clone();
        for (k, states) in companion.iter_mut().enumerate() {
            iterate_ar(states, &f.coefficients[k], None).unwrap();
        }
        let ctx = context(&f, Some(&companion));
        let mut m = member(&f);
        let out = m.advance(&ctx, 1, &[1.0]).unwrap();

        let latest: Vec<_> = companion.iter().map(|s| s.back().unwrap().clone()).collect();
        let expected = recompose(&latest, &f.means, &f.stds, &f.fft).unwrap();
        for (a, b) in out[0].iter().zip(expected.iter()) {
            approx::assert_abs_diff_eq!(a, b, epsilon = 1e-9);
        }
    }

    #[test]
    fn fractional_output_blends_with_previous_field() {
        let f = fixture();
        let ctx = context(&f, None);
        let mut m = member(&f);
        let out = m.advance(&ctx, 1, &[0.25, 1.0]).unwrap();
        for ((&q, &end), &start) in out[0].iter().zip(out[1].iter()).zip(f.latest.iter()) {
            approx::assert_abs_diff_eq!(q, 0.75 * start + 0.25 * end, epsilon = 1e-9);
        }
    }

    #[test]
    fn empty_step_still_advances_time() {
        let f = fixture();
        let ctx = context(&f, None);
        let mut m = member(&f);
        assert!(m.advance(&ctx, 1, &[]).unwrap().is_empty());
        assert_eq!(m.t_prev, 1.0);
        assert!(m.displacement.is_some());
        let out = m.advance(&ctx, 2, &[2.0]).unwrap();
        assert_eq!(out.len(), 1);
        assert_eq!(m.t_total, 2.0);
    }

    #[test]
    fn domain_pixels_become_missing() {
        let mut f = fixture();
        f.domain[[3, 4]] = true;
        let ctx = context(&f, None);
        let mut m = member(&f);
        let out = m.advance(&ctx, 1, &[1.0]).unwrap();
        assert!(out[0][[3, 4]].is_nan());
        assert!(out[0][[8, 8]].is_finite());
    }
}

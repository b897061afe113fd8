//! Monte-Carlo estimate of per-level noise standard deviation corrections.

use ndarray::{Array2, Zip};
use nimbus_cascade::{BandpassFilter, Fft2, decompose};
use nimbus_noise::NoiseGenerator;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rayon::ThreadPool;
use rayon::prelude::*;
use tracing::{debug, warn};

use crate::error::StepsError;

/// Number of noise fields drawn by [`auto_noise_std_coeffs`].
pub const NOISE_ADJUST_TRIALS: usize = 20;

/// Upper bound (exclusive) of the seeds drawn along a seed chain.
pub(crate) const SEED_RANGE: u64 = 1_000_000_000;

/// Expands `seed` into `n` chained generators: each generator is seeded
/// with the current seed and then draws the next one.
pub(crate) fn seed_chain(seed: u64, n: usize) -> Vec<StdRng> {
    let mut seed = seed;
    (0..n)
        .map(|_| {
            let mut rng = StdRng::seed_from_u64(seed);
            seed = rng.random_range(0..SEED_RANGE);
            rng
        })
        .collect()
}

/// Estimates correction factors for the standard deviation of noise
/// cascades.
///
/// The wet pixels of `field` (at or above `threshold`) define a mask; all
/// other pixels are set to `fill`. Noise fields from `generator` are scaled
/// to the conditional mean and standard deviation of `field`, masked the
/// same way and decomposed with conditional statistics. The factor for
/// level `k` is the observed level std divided by the mean noise level std
/// over `n_trials` draws. A field without wet pixels gives unit factors.
///
/// Trials run on `pool`, each with its own generator from a seed chain
/// started at `seed`.
///
/// # Errors
///
/// Returns [`StepsError::Cascade`] or [`StepsError::Noise`] if a
/// decomposition or noise draw fails.
#[allow(clippy::too_many_arguments)]
#[tracing::instrument(skip(field, filter, generator, fft, pool))]
pub fn auto_noise_std_coeffs(
    field: &Array2<f64>,
    threshold: f64,
    fill: f64,
    filter: &BandpassFilter,
    generator: &NoiseGenerator,
    fft: &Fft2,
    n_trials: usize,
    seed: u64,
    pool: &ThreadPool,
) -> Result<Vec<f64>, StepsError> {
    let n_levels = filter.n_levels();
    let mask = field.mapv(|v| v >= threshold);
    if n_trials == 0 || !mask.iter().any(|&m| m) {
        warn!("no wet pixels for noise adjustment, using unit coefficients");
        return Ok(vec![1.0; n_levels]);
    }

    let mut observed = field.clone();
    Zip::from(&mut observed)
        .and(&mask)
        .for_each(|v, &wet| {
            if !wet || !v.is_finite() {
                *v = fill;
            }
        });
    let values: Vec<f64> = observed.iter().copied().collect();
    let keep: Vec<bool> = mask.iter().copied().collect();
    let (mu, sigma) = nimbus_stats::masked_mean_sd(&values, Some(&keep));
    observed.mapv_inplace(|v| v - mu);
    let obs_stds = decompose::<f64>(&observed, filter, Some(&mask), fft)?
        .stds()
        .to_vec();

    let rngs = seed_chain(seed, n_trials);
    let trial_stds: Vec<Vec<f64>> = pool.install(|| {
        rngs.into_par_iter()
            .map(|mut rng| -> Result<Vec<f64>, StepsError> {
                let mut noise = generator.generate(&mut rng, fft)?;
                Zip::from(&mut noise).and(&mask).for_each(|v, &wet| {
                    let scaled = if wet { *v * sigma + mu } else { fill };
                    *v = scaled - mu;
                });
                let cascade = decompose::<f64>(&noise, filter, Some(&mask), fft)?;
                Ok(cascade.stds().to_vec())
            })
            .collect::<Result<Vec<_>, _>>()
    })?;

    let coeffs: Vec<f64> = (0..n_levels)
        .map(|k| {
            let noise_std =
                trial_stds.iter().map(|s| s[k]).sum::<f64>() / trial_stds.len() as f64;
            obs_stds[k] / noise_std
        })
        .collect();
    debug!(?coeffs, "noise std adjustment");
    Ok(coeffs)
}

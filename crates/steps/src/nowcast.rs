//! Ensemble nowcast driver: initialization and the step loop.

use std::collections::VecDeque;
use std::time::Instant;

use ndarray::{Array2, Array3, Axis, s};
use nimbus_autoregression::{ArSpec, adjust_lag2_corrcoef, iterate_ar, temporal_autocorrelation};
use nimbus_cascade::{
    BandpassFilter, Cascade, Domain, DomainValue, Fft2, build_filter, decompose, recompose,
};
use nimbus_extrapolation::{Extrapolator, build_extrapolator};
use nimbus_noise::{
    MotionPerturbator, NoiseGenerator, NoiseStdAdjustment, fixed_noise_std_coeffs,
};
use nimbus_probmatch::ProbMatchingMethod;
use num_complex::Complex64;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;
use rayon::{ThreadPool, ThreadPoolBuilder};
use tracing::{debug, info, info_span, warn};

use crate::align::{align_history, persistent_wet_mask};
use crate::config::{MaskMethod, StepsConfig};
use crate::error::StepsError;
use crate::mask::{MaskEngine, structure_radius};
use crate::member::{Matching, MemberState, StepContext};
use crate::noise_adjust::{NOISE_ADJUST_TRIALS, SEED_RANGE, auto_noise_std_coeffs, seed_chain};
use crate::result::{Nowcast, NowcastTiming, StepFields, collect_step, stack_members};
use crate::timesteps::{Schedule, Timesteps};
use crate::validate::{domain_mask, validate_inputs};

/// Runs an ensemble nowcast.
///
/// `history` holds at least `ar_order + 1` frames with shape
/// `(frames, rows, cols)`, oldest first, already transformed to the
/// forecast variable (e.g. dBR). `motion` has shape `(2, rows, cols)` in
/// pixels per time step. Non-finite history pixels mark the outside of the
/// radar domain and are missing in every forecast.
///
/// # Errors
///
/// Returns a [`StepsError`] if the inputs or options are invalid (see
/// [`validate_inputs`]) or a numerical stage fails.
///
/// # Example
///
/// ```ignore
/// use nimbus_steps::{StepsConfig, Timesteps, forecast};
///
/// let config = StepsConfig::new()
///     .with_precip_thr(Some(-10.0))
///     .with_kmperpixel(Some(1.0))
///     .with_timestep(Some(5.0))
///     .with_seed(Some(42));
/// let nowcast = forecast(&history, &motion, &Timesteps::Count(12), &config)?;
/// ```
pub fn forecast(
    history: &Array3<f64>,
    motion: &Array3<f64>,
    timesteps: &Timesteps,
    config: &StepsConfig,
) -> Result<Nowcast, StepsError> {
    dispatch(history, motion, timesteps, config, None)
}

/// Runs an ensemble nowcast and hands the fields of every step that
/// produces output to `callback` as soon as they are computed.
///
/// # Errors
///
/// Same as [`forecast`].
pub fn forecast_with_callback<F>(
    history: &Array3<f64>,
    motion: &Array3<f64>,
    timesteps: &Timesteps,
    config: &StepsConfig,
    mut callback: F,
) -> Result<Nowcast, StepsError>
where
    F: FnMut(&StepFields),
{
    let callback: &mut dyn FnMut(&StepFields) = &mut callback;
    dispatch(history, motion, timesteps, config, Some(callback))
}

#[tracing::instrument(skip_all, fields(
    members = config.n_ens_members(),
    levels = config.n_cascade_levels(),
    domain = ?config.domain(),
))]
fn dispatch(
    history: &Array3<f64>,
    motion: &Array3<f64>,
    timesteps: &Timesteps,
    config: &StepsConfig,
    callback: Option<&mut dyn FnMut(&StepFields)>,
) -> Result<Nowcast, StepsError> {
    match config.domain() {
        Domain::Spatial => run::<f64>(history, motion, timesteps, config, callback),
        Domain::Spectral => run::<Complex64>(history, motion, timesteps, config, callback),
    }
}

fn build_pool(n_threads: usize) -> Result<ThreadPool, StepsError> {
    ThreadPoolBuilder::new()
        .num_threads(n_threads.max(1))
        .build()
        .map_err(|e| StepsError::ThreadPool {
            reason: e.to_string(),
        })
}

/// Everything computed before the first step.
struct Prepared<T> {
    schedule: Schedule,
    shape: (usize, usize),
    fft: Fft2,
    filter: BandpassFilter,
    extrapolator: Box<dyn Extrapolator>,
    domain_mask: Array2<bool>,
    latest: Array2<f64>,
    coefficients: Vec<Vec<f64>>,
    means: Vec<f64>,
    stds: Vec<f64>,
    noise: Option<NoiseGenerator>,
    noise_std_coeffs: Vec<f64>,
    /// Last `p` states per level of the latest observation.
    initial_states: Vec<VecDeque<Array2<T>>>,
    mask: Option<MaskEngine>,
    matching_target: Option<f64>,
    members: Vec<MemberState<T>>,
    ensemble_pool: ThreadPool,
}

fn log_options(config: &StepsConfig, seed: u64) {
    info!(
        extrapolation = ?config.extrap_method(),
        decomposition = ?config.decomp_method(),
        filter = ?config.bandpass_filter_method(),
        noise = ?config.noise_method(),
        noise_adjustment = ?config.noise_stddev_adj(),
        vel_pert = ?config.vel_pert_method(),
        conditional = config.conditional(),
        probmatching = ?config.probmatching_method(),
        mask = ?config.mask_method(),
        ar_order = config.ar_order(),
        workers = config.num_workers(),
        seed,
        "STEPS nowcast"
    );
}

/// Per-level AR coefficients from the temporal autocorrelations of the
/// aligned cascades.
fn fit_levels<T: DomainValue>(
    cascades: &[Cascade<T>],
    wet_mask: Option<&Array2<bool>>,
    order: usize,
    fft: &Fft2,
) -> Result<Vec<Vec<f64>>, StepsError> {
    let spec = ArSpec::new(order)?;
    let n_levels = cascades.first().map_or(0, Cascade::n_levels);
    (0..n_levels)
        .map(|k| -> Result<Vec<f64>, StepsError> {
            let frames = cascades
                .iter()
                .map(|c| T::to_spatial(&c.levels()[k], fft))
                .collect::<Result<Vec<_>, _>>()?;
            let mut gamma = temporal_autocorrelation(&frames, wet_mask)?;
            for (lag, g) in gamma.iter_mut().enumerate() {
                if !g.is_finite() {
                    warn!(level = k, lag = lag + 1, "undefined autocorrelation, using 0");
                    *g = 0.0;
                }
            }
            if order == 2 {
                gamma[1] = adjust_lag2_corrcoef(gamma[0], gamma[1]);
            }
            debug!(level = k, ?gamma, "temporal autocorrelation");
            let fit = spec.fit(&gamma)?;
            Ok(fit.coefficients().to_vec())
        })
        .collect()
}

fn prepare<T: DomainValue>(
    history: &Array3<f64>,
    motion: &Array3<f64>,
    timesteps: &Timesteps,
    config: &StepsConfig,
) -> Result<Prepared<T>, StepsError> {
    let schedule = validate_inputs(history, motion, timesteps, config)?;
    let seed = match config.seed() {
        Some(seed) => seed,
        None => StdRng::from_os_rng().random_range(0..SEED_RANGE),
    };
    log_options(config, seed);

    let p = config.ar_order();
    let n_frames = history.len_of(Axis(0));
    let window = history.slice(s![n_frames - p - 1.., .., ..]).to_owned();
    let (_, h, w) = window.dim();
    let shape = (h, w);
    let domain_mask = domain_mask(&window);
    let threshold = config.precip_thr();
    let wet_mask = match threshold {
        Some(thr) if config.conditional() => Some(persistent_wet_mask(&window, thr)),
        _ => None,
    };

    let extrapolator = build_extrapolator(config.extrap_method(), config.extrap_config())?;
    let align_pool = build_pool(config.num_workers().min(p))?;
    let frames = align_history(&window, motion, extrapolator.as_ref(), &align_pool)?;
    let latest = frames[p].clone();

    let fft = Fft2::new(shape)?;
    let filter = build_filter(
        config.bandpass_filter_method(),
        shape,
        config.n_cascade_levels(),
        config.filter_config(),
    )?;
    let n_levels = filter.n_levels();

    let noise = config
        .noise_method()
        .map(|method| NoiseGenerator::initialize(method, &frames, &fft, config.noise_config()))
        .transpose()?;

    let ensemble_pool = build_pool(config.num_workers().min(config.n_ens_members()))?;
    let mut chain = seed_chain(seed, 2 * config.n_ens_members() + 1);
    let adjust_seed = chain
        .pop()
        .map_or(seed, |mut rng| rng.random_range(0..SEED_RANGE));
    let noise_std_coeffs = match (&noise, config.noise_stddev_adj()) {
        (Some(generator), Some(NoiseStdAdjustment::Auto)) => {
            let fill = frames
                .iter()
                .flat_map(|f| f.iter().copied())
                .fold(f64::INFINITY, f64::min);
            auto_noise_std_coeffs(
                &latest,
                threshold.unwrap_or(f64::NEG_INFINITY),
                fill,
                &filter,
                generator,
                &fft,
                NOISE_ADJUST_TRIALS,
                adjust_seed,
                &ensemble_pool,
            )?
        }
        (Some(_), Some(NoiseStdAdjustment::Fixed)) => fixed_noise_std_coeffs(n_levels),
        _ => vec![1.0; n_levels],
    };

    let cascades = frames
        .iter()
        .map(|f| decompose::<T>(f, &filter, wet_mask.as_ref(), &fft))
        .collect::<Result<Vec<_>, _>>()?;
    let coefficients = fit_levels(&cascades, wet_mask.as_ref(), p, &fft)?;
    let means = cascades[p].means().to_vec();
    let stds = cascades[p].stds().to_vec();
    let initial_states: Vec<VecDeque<Array2<T>>> = (0..n_levels)
        .map(|k| cascades[1..].iter().map(|c| c.levels()[k].clone()).collect())
        .collect();
    drop(cascades);

    let mask = match (config.mask_method(), threshold) {
        (Some(method), Some(thr)) => {
            let radius = match (config.timestep(), config.kmperpixel()) {
                (Some(dt), Some(km)) => {
                    structure_radius(config.mask_config().mask_f(), dt, km)
                }
                _ => 1,
            };
            Some(MaskEngine::new(method, config.mask_config(), &latest, thr, radius))
        }
        _ => None,
    };

    let matching_target = match (config.probmatching_method(), threshold) {
        (Some(ProbMatchingMethod::Mean), Some(thr)) => {
            let wet: Vec<f64> = latest.iter().copied().filter(|&v| v >= thr).collect();
            if wet.is_empty() {
                warn!("latest observation has no pixel above the threshold, skipping mean matching");
                None
            } else {
                Some(nimbus_stats::mean(&wet))
            }
        }
        _ => None,
    };

    let members = chain
        .chunks_exact(2)
        .map(|pair| -> Result<MemberState<T>, StepsError> {
            let mut motion_rng = pair[1].clone();
            let scale = config.kmperpixel().zip(config.timestep());
            let vel_pert = match (config.vel_pert_method(), scale) {
                (Some(_), Some((km, dt))) => Some(MotionPerturbator::new(
                    motion,
                    1.0 / km,
                    dt,
                    config.vel_pert_config(),
                    &mut motion_rng,
                )?),
                _ => None,
            };
            Ok(MemberState::new(
                initial_states.clone(),
                pair[0].clone(),
                vel_pert,
                mask.as_ref().and_then(MaskEngine::initial_member_mask),
                latest.clone(),
            ))
        })
        .collect::<Result<Vec<_>, _>>()?;

    debug!(n_levels, ?noise_std_coeffs, "initialized");

    Ok(Prepared {
        schedule,
        shape,
        fft,
        filter,
        extrapolator,
        domain_mask,
        latest,
        coefficients,
        means,
        stds,
        noise,
        noise_std_coeffs,
        initial_states,
        mask,
        matching_target,
        members,
        ensemble_pool,
    })
}

fn run<T: DomainValue>(
    history: &Array3<f64>,
    motion: &Array3<f64>,
    timesteps: &Timesteps,
    config: &StepsConfig,
    mut callback: Option<&mut dyn FnMut(&StepFields)>,
) -> Result<Nowcast, StepsError> {
    let start = Instant::now();
    let Prepared {
        schedule,
        shape,
        fft,
        filter,
        extrapolator,
        domain_mask,
        latest,
        coefficients,
        means,
        stds,
        noise,
        noise_std_coeffs,
        initial_states,
        mut mask,
        matching_target,
        mut members,
        ensemble_pool,
    } = prepare::<T>(history, motion, timesteps, config)?;
    let init_time = start.elapsed();

    let sprog = config.mask_method() == Some(MaskMethod::Sprog);
    let mut companion = (noise.is_none() || sprog).then_some(initial_states);
    let matching = match config.probmatching_method() {
        Some(ProbMatchingMethod::Cdf) => Some(Matching::Cdf(&latest)),
        Some(ProbMatchingMethod::Mean) => match (config.precip_thr(), matching_target) {
            (Some(threshold), Some(target)) => Some(Matching::Mean { threshold, target }),
            _ => None,
        },
        None => None,
    };
    let timestep = config.timestep().unwrap_or(1.0);

    let mut store: Vec<Vec<Array2<f64>>> = vec![Vec::new(); members.len()];
    let loop_start = Instant::now();
    for step in 1..=schedule.n_steps() {
        let span = info_span!("step", step);
        let _enter = span.enter();
        let subtimes = schedule.subtimes(step);

        if let Some(states) = companion.as_mut() {
            for (k, level) in states.iter_mut().enumerate() {
                iterate_ar(level, &coefficients[k], None)?;
            }
            if sprog && let Some(engine) = mask.as_mut() {
                let latest_levels: Vec<Array2<T>> =
                    states.iter().filter_map(|l| l.back().cloned()).collect();
                let field = recompose(&latest_levels, &means, &stds, &fft)?;
                engine.update_from_companion(&field);
            }
        }

        let ctx = StepContext {
            fft: &fft,
            filter: &filter,
            coefficients: &coefficients,
            noise: noise.as_ref(),
            noise_std_coeffs: &noise_std_coeffs,
            companion: companion.as_deref(),
            means: &means,
            stds: &stds,
            mask: mask.as_ref(),
            matching,
            domain_mask: &domain_mask,
            extrapolator: extrapolator.as_ref(),
            motion,
            timestep,
        };
        let outputs: Vec<Vec<Array2<f64>>> = ensemble_pool.install(|| {
            members
                .par_iter_mut()
                .map(|member| member.advance(&ctx, step, subtimes))
                .collect::<Result<Vec<_>, _>>()
        })?;
        debug!(n_outputs = subtimes.len(), "step done");

        if subtimes.is_empty() {
            continue;
        }
        if let Some(cb) = callback.as_deref_mut() {
            let fields = stack_members(&outputs, shape);
            cb(&StepFields::new(step, subtimes.to_vec(), fields));
        }
        if config.return_output() {
            collect_step(&mut store, outputs);
        }
    }
    let loop_time = loop_start.elapsed();
    info!(
        init_ms = init_time.as_millis() as u64,
        loop_ms = loop_time.as_millis() as u64,
        "nowcast finished"
    );

    let ensemble = config
        .return_output()
        .then(|| stack_members(&store, shape));
    let timing = config
        .measure_time()
        .then(|| NowcastTiming::new(init_time, loop_time));
    Ok(Nowcast::new(ensemble, schedule.lead_times(), timing))
}

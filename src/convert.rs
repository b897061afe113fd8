//! Pure conversion functions: TOML config structs -> crate API config types.

use anyhow::{Result, bail};

use nimbus_steps::{
    DecompositionMethod, Domain, ExtrapolationMethod, FilterConfig, FilterMethod, MaskConfig,
    MaskMethod, NoiseConfig, NoiseMethod, NoiseStdAdjustment, ProbMatchingMethod,
    SemiLagrangianConfig, StepsConfig, Timesteps, VelPertConfig, VelPertMethod,
};

use crate::config::*;

/// Parses a noise generator name; `"none"` disables noise.
pub fn parse_noise_method(s: &str) -> Result<Option<NoiseMethod>> {
    match s.to_lowercase().as_str() {
        "nonparametric" => Ok(Some(NoiseMethod::Nonparametric)),
        "parametric" => Ok(Some(NoiseMethod::Parametric)),
        "none" => Ok(None),
        other => bail!("unknown noise method: {other:?}"),
    }
}

/// Parses a noise standard deviation adjustment name.
pub fn parse_noise_stddev_adj(s: &str) -> Result<Option<NoiseStdAdjustment>> {
    match s.to_lowercase().as_str() {
        "auto" => Ok(Some(NoiseStdAdjustment::Auto)),
        "fixed" => Ok(Some(NoiseStdAdjustment::Fixed)),
        "none" => Ok(None),
        other => bail!("unknown noise std adjustment: {other:?}"),
    }
}

/// Parses a motion perturbation method name.
pub fn parse_vel_pert_method(s: &str) -> Result<Option<VelPertMethod>> {
    match s.to_lowercase().as_str() {
        "bps" => Ok(Some(VelPertMethod::Bps)),
        "none" => Ok(None),
        other => bail!("unknown velocity perturbation method: {other:?}"),
    }
}

/// Parses a probability matching method name.
pub fn parse_probmatching_method(s: &str) -> Result<Option<ProbMatchingMethod>> {
    match s.to_lowercase().as_str() {
        "cdf" => Ok(Some(ProbMatchingMethod::Cdf)),
        "mean" => Ok(Some(ProbMatchingMethod::Mean)),
        "none" => Ok(None),
        other => bail!("unknown probability matching method: {other:?}"),
    }
}

/// Parses a precipitation mask method name.
pub fn parse_mask_method(s: &str) -> Result<Option<MaskMethod>> {
    match s.to_lowercase().as_str() {
        "obs" => Ok(Some(MaskMethod::Obs)),
        "sprog" => Ok(Some(MaskMethod::Sprog)),
        "incremental" => Ok(Some(MaskMethod::Incremental)),
        "none" => Ok(None),
        other => bail!("unknown mask method: {other:?}"),
    }
}

/// Parses the working domain of the cascade.
pub fn parse_domain(s: &str) -> Result<Domain> {
    match s.to_lowercase().as_str() {
        "spatial" => Ok(Domain::Spatial),
        "spectral" => Ok(Domain::Spectral),
        other => bail!("unknown domain: {other:?}"),
    }
}

/// Parses a cascade decomposition method name.
pub fn parse_decomp_method(s: &str) -> Result<DecompositionMethod> {
    match s.to_lowercase().as_str() {
        "fft" => Ok(DecompositionMethod::Fft),
        other => bail!("unknown decomposition method: {other:?}"),
    }
}

/// Parses a bandpass filter name.
pub fn parse_filter_method(s: &str) -> Result<FilterMethod> {
    match s.to_lowercase().as_str() {
        "gaussian" => Ok(FilterMethod::Gaussian),
        "uniform" => Ok(FilterMethod::Uniform),
        other => bail!("unknown bandpass filter: {other:?}"),
    }
}

/// Parses an advection scheme name.
pub fn parse_extrap_method(s: &str) -> Result<ExtrapolationMethod> {
    match s.to_lowercase().replace(['-', '_'], "").as_str() {
        "semilagrangian" => Ok(ExtrapolationMethod::SemiLagrangian),
        "eulerian" => Ok(ExtrapolationMethod::Eulerian),
        other => bail!("unknown extrapolation method: {other:?}"),
    }
}

/// Output times from the `[forecast]` table: explicit `lead_times` win over
/// the `timesteps` count.
pub fn build_timesteps(forecast: &ForecastToml) -> Timesteps {
    match &forecast.lead_times {
        Some(times) => Timesteps::List(times.clone()),
        None => Timesteps::Count(forecast.timesteps),
    }
}

/// Builds a [`StepsConfig`] from the TOML configuration.
///
/// An optional seed overrides the one from the file.
pub fn build_steps_config(config: &NimbusConfig, seed: Option<u64>) -> Result<StepsConfig> {
    let f = &config.forecast;

    let filter = FilterConfig::new()
        .with_gauss_scale(config.filter.gauss_scale)
        .with_include_mean(config.filter.include_mean);
    let mut vel_pert = VelPertConfig::new();
    if let Some(p) = config.vel_pert.p_par {
        vel_pert = vel_pert.with_p_par(p);
    }
    if let Some(p) = config.vel_pert.p_perp {
        vel_pert = vel_pert.with_p_perp(p);
    }
    let mask = MaskConfig::new()
        .with_mask_f(config.mask.mask_f)
        .with_mask_rim(config.mask.mask_rim);

    Ok(StepsConfig::new()
        .with_n_ens_members(f.n_ens_members)
        .with_n_cascade_levels(f.n_cascade_levels)
        .with_precip_thr(Some(f.precip_thr))
        .with_kmperpixel(Some(f.kmperpixel))
        .with_timestep(Some(f.timestep))
        .with_extrap_method(parse_extrap_method(&config.extrapolation.method)?)
        .with_extrap_config(SemiLagrangianConfig::new().with_n_iter(config.extrapolation.n_iter))
        .with_decomp_method(parse_decomp_method(&f.decomp_method)?)
        .with_bandpass_filter_method(parse_filter_method(&config.filter.method)?)
        .with_filter_config(filter)
        .with_noise_method(parse_noise_method(&f.noise_method)?)
        .with_noise_stddev_adj(parse_noise_stddev_adj(&f.noise_stddev_adj)?)
        .with_noise_config(NoiseConfig::new().with_tukey_alpha(config.noise.tukey_alpha))
        .with_ar_order(f.ar_order)
        .with_vel_pert_method(parse_vel_pert_method(&f.vel_pert_method)?)
        .with_vel_pert_config(vel_pert)
        .with_conditional(f.conditional)
        .with_probmatching_method(parse_probmatching_method(&f.probmatching_method)?)
        .with_mask_method(parse_mask_method(&f.mask_method)?)
        .with_mask_config(mask)
        .with_measure_time(f.measure_time)
        .with_seed(seed.or(config.seed))
        .with_num_workers(f.num_workers)
        .with_domain(parse_domain(&f.domain)?))
}

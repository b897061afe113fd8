//! Configuration for the ensemble nowcast.

use nimbus_cascade::{DecompositionMethod, Domain, FilterConfig, FilterMethod};
use nimbus_extrapolation::{ExtrapolationMethod, SemiLagrangianConfig};
use nimbus_noise::{NoiseConfig, NoiseMethod, NoiseStdAdjustment, VelPertConfig, VelPertMethod};
use nimbus_probmatch::ProbMatchingMethod;

use crate::error::StepsError;

/// Strategy for suppressing precipitation growth outside observed rain.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum MaskMethod {
    /// Static mask from the latest observation.
    Obs,
    /// Percentile mask of the unperturbed AR forecast, recomputed each step.
    Sprog,
    /// Per-member mask dilated from the previous forecast with a soft rim.
    Incremental,
}

/// Options of the incremental mask.
#[derive(Debug, Clone)]
pub struct MaskConfig {
    /// Growth factor of the buffer, in km per time step.
    mask_f: f64,
    /// Width in pixels of the soft rim around the buffered mask.
    mask_rim: usize,
}

impl Default for MaskConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl MaskConfig {
    /// Creates a configuration with `mask_f = 1.0` and `mask_rim = 10`.
    pub fn new() -> Self {
        Self {
            mask_f: 1.0,
            mask_rim: 10,
        }
    }

    /// Sets the buffer growth factor.
    pub fn with_mask_f(mut self, mask_f: f64) -> Self {
        self.mask_f = mask_f;
        self
    }

    /// Sets the rim width in pixels.
    pub fn with_mask_rim(mut self, mask_rim: usize) -> Self {
        self.mask_rim = mask_rim;
        self
    }

    /// Returns the buffer growth factor.
    pub fn mask_f(&self) -> f64 {
        self.mask_f
    }

    /// Returns the rim width in pixels.
    pub fn mask_rim(&self) -> usize {
        self.mask_rim
    }

    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns [`StepsError::InvalidConfig`] if `mask_f` is negative or not
    /// finite.
    pub fn validate(&self) -> Result<(), StepsError> {
        if !self.mask_f.is_finite() || self.mask_f < 0.0 {
            return Err(StepsError::InvalidConfig {
                reason: format!("mask_f must be finite and >= 0, got {}", self.mask_f),
            });
        }
        Ok(())
    }
}

/// Master configuration of the ensemble nowcast.
///
/// Disabled strategies are `None`.
#[derive(Debug, Clone)]
pub struct StepsConfig {
    n_ens_members: usize,
    n_cascade_levels: usize,
    /// Intensity threshold separating rain from no rain.
    precip_thr: Option<f64>,
    /// Spatial resolution in km per pixel.
    kmperpixel: Option<f64>,
    /// Length of one time step in minutes.
    timestep: Option<f64>,
    extrap_method: ExtrapolationMethod,
    extrap_config: SemiLagrangianConfig,
    decomp_method: DecompositionMethod,
    bandpass_filter_method: FilterMethod,
    filter_config: FilterConfig,
    noise_method: Option<NoiseMethod>,
    noise_stddev_adj: Option<NoiseStdAdjustment>,
    noise_config: NoiseConfig,
    ar_order: usize,
    vel_pert_method: Option<VelPertMethod>,
    vel_pert_config: VelPertConfig,
    /// Compute cascade and correlation statistics over wet pixels only.
    conditional: bool,
    probmatching_method: Option<ProbMatchingMethod>,
    mask_method: Option<MaskMethod>,
    mask_config: MaskConfig,
    /// Keep all outputs and return them as one array.
    return_output: bool,
    measure_time: bool,
    seed: Option<u64>,
    num_workers: usize,
    domain: Domain,
}

impl Default for StepsConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl StepsConfig {
    /// Creates the default configuration: 24 members, 6 levels, AR(2),
    /// non-parametric noise, BPS motion perturbation, CDF matching and the
    /// incremental mask.
    ///
    /// The defaults need a threshold, a resolution and a time step before
    /// they validate.
    pub fn new() -> Self {
        Self {
            n_ens_members: 24,
            n_cascade_levels: 6,
            precip_thr: None,
            kmperpixel: None,
            timestep: None,
            extrap_method: ExtrapolationMethod::SemiLagrangian,
            extrap_config: SemiLagrangianConfig::new(),
            decomp_method: DecompositionMethod::Fft,
            bandpass_filter_method: FilterMethod::Gaussian,
            filter_config: FilterConfig::new(),
            noise_method: Some(NoiseMethod::Nonparametric),
            noise_stddev_adj: None,
            noise_config: NoiseConfig::new(),
            ar_order: 2,
            vel_pert_method: Some(VelPertMethod::Bps),
            vel_pert_config: VelPertConfig::new(),
            conditional: false,
            probmatching_method: Some(ProbMatchingMethod::Cdf),
            mask_method: Some(MaskMethod::Incremental),
            mask_config: MaskConfig::new(),
            return_output: true,
            measure_time: false,
            seed: None,
            num_workers: 1,
            domain: Domain::Spatial,
        }
    }

    /// Sets the number of ensemble members.
    pub fn with_n_ens_members(mut self, n: usize) -> Self {
        self.n_ens_members = n;
        self
    }

    /// Sets the number of cascade levels.
    pub fn with_n_cascade_levels(mut self, n: usize) -> Self {
        self.n_cascade_levels = n;
        self
    }

    /// Sets the precipitation threshold.
    pub fn with_precip_thr(mut self, thr: Option<f64>) -> Self {
        self.precip_thr = thr;
        self
    }

    /// Sets the spatial resolution in km per pixel.
    pub fn with_kmperpixel(mut self, kmperpixel: Option<f64>) -> Self {
        self.kmperpixel = kmperpixel;
        self
    }

    /// Sets the time step length in minutes.
    pub fn with_timestep(mut self, timestep: Option<f64>) -> Self {
        self.timestep = timestep;
        self
    }

    /// Sets the extrapolation method.
    pub fn with_extrap_method(mut self, method: ExtrapolationMethod) -> Self {
        self.extrap_method = method;
        self
    }

    /// Sets the semi-Lagrangian options.
    pub fn with_extrap_config(mut self, config: SemiLagrangianConfig) -> Self {
        self.extrap_config = config;
        self
    }

    /// Sets the decomposition method.
    pub fn with_decomp_method(mut self, method: DecompositionMethod) -> Self {
        self.decomp_method = method;
        self
    }

    /// Sets the bandpass filter method.
    pub fn with_bandpass_filter_method(mut self, method: FilterMethod) -> Self {
        self.bandpass_filter_method = method;
        self
    }

    /// Sets the bandpass filter options.
    pub fn with_filter_config(mut self, config: FilterConfig) -> Self {
        self.filter_config = config;
        self
    }

    /// Sets the noise method (`None` disables precipitation noise).
    pub fn with_noise_method(mut self, method: Option<NoiseMethod>) -> Self {
        self.noise_method = method;
        self
    }

    /// Sets the noise standard deviation adjustment.
    pub fn with_noise_stddev_adj(mut self, adj: Option<NoiseStdAdjustment>) -> Self {
        self.noise_stddev_adj = adj;
        self
    }

    /// Sets the noise generator options.
    pub fn with_noise_config(mut self, config: NoiseConfig) -> Self {
        self.noise_config = config;
        self
    }

    /// Sets the order of the AR model.
    pub fn with_ar_order(mut self, order: usize) -> Self {
        self.ar_order = order;
        self
    }

    /// Sets the motion perturbation method (`None` disables it).
    pub fn with_vel_pert_method(mut self, method: Option<VelPertMethod>) -> Self {
        self.vel_pert_method = method;
        self
    }

    /// Sets the motion perturbation options.
    pub fn with_vel_pert_config(mut self, config: VelPertConfig) -> Self {
        self.vel_pert_config = config;
        self
    }

    /// Enables conditional (wet-pixel) statistics.
    pub fn with_conditional(mut self, conditional: bool) -> Self {
        self.conditional = conditional;
        self
    }

    /// Sets the probability matching method (`None` disables it).
    pub fn with_probmatching_method(mut self, method: Option<ProbMatchingMethod>) -> Self {
        self.probmatching_method = method;
        self
    }

    /// Sets the mask method (`None` disables masking).
    pub fn with_mask_method(mut self, method: Option<MaskMethod>) -> Self {
        self.mask_method = method;
        self
    }

    /// Sets the incremental mask options.
    pub fn with_mask_config(mut self, config: MaskConfig) -> Self {
        self.mask_config = config;
        self
    }

    /// Sets whether outputs are collected and returned.
    pub fn with_return_output(mut self, return_output: bool) -> Self {
        self.return_output = return_output;
        self
    }

    /// Sets whether initialization and main-loop durations are measured.
    pub fn with_measure_time(mut self, measure_time: bool) -> Self {
        self.measure_time = measure_time;
        self
    }

    /// Sets the random seed (`None` draws from the OS).
    pub fn with_seed(mut self, seed: Option<u64>) -> Self {
        self.seed = seed;
        self
    }

    /// Sets the number of worker threads.
    pub fn with_num_workers(mut self, n: usize) -> Self {
        self.num_workers = n;
        self
    }

    /// Sets the representation of cascade levels.
    pub fn with_domain(mut self, domain: Domain) -> Self {
        self.domain = domain;
        self
    }

    /// Returns the number of ensemble members.
    pub fn n_ens_members(&self) -> usize {
        self.n_ens_members
    }

    /// Returns the number of cascade levels.
    pub fn n_cascade_levels(&self) -> usize {
        self.n_cascade_levels
    }

    /// Returns the precipitation threshold.
    pub fn precip_thr(&self) -> Option<f64> {
        self.precip_thr
    }

    /// Returns the spatial resolution in km per pixel.
    pub fn kmperpixel(&self) -> Option<f64> {
        self.kmperpixel
    }

    /// Returns the time step length in minutes.
    pub fn timestep(&self) -> Option<f64> {
        self.timestep
    }

    /// Returns the extrapolation method.
    pub fn extrap_method(&self) -> ExtrapolationMethod {
        self.extrap_method
    }

    /// Returns the semi-Lagrangian options.
    pub fn extrap_config(&self) -> &SemiLagrangianConfig {
        &self.extrap_config
    }

    /// Returns the decomposition method.
    pub fn decomp_method(&self) -> DecompositionMethod {
        self.decomp_method
    }

    /// Returns the bandpass filter method.
    pub fn bandpass_filter_method(&self) -> FilterMethod {
        self.bandpass_filter_method
    }

    /// Returns the bandpass filter options.
    pub fn filter_config(&self) -> &FilterConfig {
        &self.filter_config
    }

    /// Returns the noise method.
    pub fn noise_method(&self) -> Option<NoiseMethod> {
        self.noise_method
    }

    /// Returns the noise standard deviation adjustment.
    pub fn noise_stddev_adj(&self) -> Option<NoiseStdAdjustment> {
        self.noise_stddev_adj
    }

    /// Returns the noise generator options.
    pub fn noise_config(&self) -> &NoiseConfig {
        &self.noise_config
    }

    /// Returns the AR order.
    pub fn ar_order(&self) -> usize {
        self.ar_order
    }

    /// Returns the motion perturbation method.
    pub fn vel_pert_method(&self) -> Option<VelPertMethod> {
        self.vel_pert_method
    }

    /// Returns the motion perturbation options.
    pub fn vel_pert_config(&self) -> &VelPertConfig {
        &self.vel_pert_config
    }

    /// Returns whether conditional statistics are used.
    pub fn conditional(&self) -> bool {
        self.conditional
    }

    /// Returns the probability matching method.
    pub fn probmatching_method(&self) -> Option<ProbMatchingMethod> {
        self.probmatching_method
    }

    /// Returns the mask method.
    pub fn mask_method(&self) -> Option<MaskMethod> {
        self.mask_method
    }

    /// Returns the incremental mask options.
    pub fn mask_config(&self) -> &MaskConfig {
        &self.mask_config
    }

    /// Returns whether outputs are returned.
    pub fn return_output(&self) -> bool {
        self.return_output
    }

    /// Returns whether durations are measured.
    pub fn measure_time(&self) -> bool {
        self.measure_time
    }

    /// Returns the random seed.
    pub fn seed(&self) -> Option<u64> {
        self.seed
    }

    /// Returns the number of worker threads.
    pub fn num_workers(&self) -> usize {
        self.num_workers
    }

    /// Returns the cascade domain.
    pub fn domain(&self) -> Domain {
        self.domain
    }

    /// Validates the option set, including options that require others.
    ///
    /// # Errors
    ///
    /// | Variant | Trigger |
    /// |---------|---------|
    /// | [`StepsError::InvalidConfig`] | a zero count, a non-finite threshold, a non-positive resolution or time step, mean matching without a mask, invalid nested options |
    /// | [`StepsError::MissingThreshold`] | conditional statistics, masking, mean matching or automatic noise adjustment without `precip_thr` |
    /// | [`StepsError::MissingResolution`] | motion perturbation or incremental mask without `kmperpixel` |
    /// | [`StepsError::MissingTimestep`] | motion perturbation or incremental mask without `timestep` |
    pub fn validate(&self) -> Result<(), StepsError> {
        for (value, name) in [
            (self.n_ens_members, "n_ens_members"),
            (self.n_cascade_levels, "n_cascade_levels"),
            (self.ar_order, "ar_order"),
            (self.num_workers, "num_workers"),
        ] {
            if value == 0 {
                return Err(StepsError::InvalidConfig {
                    reason: format!("{name} must be >= 1"),
                });
            }
        }
        if let Some(thr) = self.precip_thr
            && !thr.is_finite()
        {
            return Err(StepsError::InvalidConfig {
                reason: format!("precip_thr must be finite, got {thr}"),
            });
        }
        for (value, name) in [(self.kmperpixel, "kmperpixel"), (self.timestep, "timestep")] {
            if let Some(v) = value
                && !(v.is_finite() && v > 0.0)
            {
                return Err(StepsError::InvalidConfig {
                    reason: format!("{name} must be finite and > 0, got {v}"),
                });
            }
        }

        if self.precip_thr.is_none() {
            if self.conditional {
                return Err(StepsError::MissingThreshold {
                    option: "conditional statistics",
                });
            }
            if self.mask_method.is_some() {
                return Err(StepsError::MissingThreshold {
                    option: "precipitation masking",
                });
            }
            if self.probmatching_method == Some(ProbMatchingMethod::Mean) {
                return Err(StepsError::MissingThreshold {
                    option: "mean probability matching",
                });
            }
            if self.noise_method.is_some()
                && self.noise_stddev_adj == Some(NoiseStdAdjustment::Auto)
            {
                return Err(StepsError::MissingThreshold {
                    option: "automatic noise adjustment",
                });
            }
        }
        if self.probmatching_method == Some(ProbMatchingMethod::Mean) && self.mask_method.is_none()
        {
            return Err(StepsError::InvalidConfig {
                reason: "mean probability matching requires a mask method".to_string(),
            });
        }

        let incremental = self.mask_method == Some(MaskMethod::Incremental);
        let needs_scale = [
            (self.vel_pert_method.is_some(), "velocity perturbation"),
            (incremental, "incremental masking"),
        ];
        for (needed, option) in needs_scale {
            if !needed {
                continue;
            }
            if self.kmperpixel.is_none() {
                return Err(StepsError::MissingResolution { option });
            }
            if self.timestep.is_none() {
                return Err(StepsError::MissingTimestep { option });
            }
        }

        self.extrap_config.validate()?;
        self.filter_config.validate()?;
        self.noise_config.validate()?;
        self.vel_pert_config.validate()?;
        self.mask_config.validate()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn minimal() -> StepsConfig {
        StepsConfig::new()
            .with_precip_thr(Some(0.1))
            .with_kmperpixel(Some(1.0))
            .with_timestep(Some(5.0))
    }

    #[test]
    fn defaults_match_documentation() {
        let c = StepsConfig::new();
        assert_eq!(c.n_ens_members(), 24);
        assert_eq!(c.n_cascade_levels(), 6);
        assert_eq!(c.ar_order(), 2);
        assert_eq!(c.num_workers(), 1);
        assert_eq!(c.mask_method(), Some(MaskMethod::Incremental));
        assert_eq!(c.probmatching_method(), Some(ProbMatchingMethod::Cdf));
        assert_eq!(c.noise_method(), Some(NoiseMethod::Nonparametric));
        assert!(c.return_output());
        assert!(!c.conditional());
        assert_eq!(c.domain(), Domain::Spatial);
    }

    #[test]
    fn minimal_configuration_validates() {
        assert!(minimal().validate().is_ok());
    }

    #[test]
    fn defaults_need_threshold() {
        let err = StepsConfig::new().validate().unwrap_err();
        assert!(matches!(err, StepsError::MissingThreshold { .. }));
    }

    #[test]
    fn conditional_needs_threshold() {
        let c = StepsConfig::new()
            .with_mask_method(None)
            .with_vel_pert_method(None)
            .with_conditional(true);
        assert!(matches!(
            c.validate(),
            Err(StepsError::MissingThreshold {
                option: "conditional statistics"
            })
        ));
    }

    #[test]
    fn vel_pert_needs_resolution_and_timestep() {
        let c = minimal()
            .with_mask_method(Some(MaskMethod::Obs))
            .with_kmperpixel(None);
        assert!(matches!(
            c.validate(),
            Err(StepsError::MissingResolution { .. })
        ));
        let c = minimal()
            .with_mask_method(Some(MaskMethod::Obs))
            .with_timestep(None);
        assert!(matches!(c.validate(), Err(StepsError::MissingTimestep { .. })));
    }

    #[test]
    fn incremental_mask_needs_resolution() {
        let c = minimal().with_vel_pert_method(None).with_kmperpixel(None);
        assert!(matches!(
            c.validate(),
            Err(StepsError::MissingResolution {
                option: "incremental masking"
            })
        ));
    }

    #[test]
    fn mean_matching_needs_mask() {
        let c = minimal()
            .with_probmatching_method(Some(ProbMatchingMethod::Mean))
            .with_mask_method(None);
        assert!(matches!(c.validate(), Err(StepsError::InvalidConfig { .. })));
    }

    #[test]
    fn zero_members_rejected() {
        assert!(minimal().with_n_ens_members(0).validate().is_err());
        assert!(minimal().with_ar_order(0).validate().is_err());
        assert!(minimal().with_num_workers(0).validate().is_err());
    }

    #[test]
    fn nested_options_validated() {
        let c = minimal().with_mask_config(MaskConfig::new().with_mask_f(-1.0));
        assert!(c.validate().is_err());
        let c = minimal().with_noise_config(NoiseConfig::new().with_tukey_alpha(2.0));
        assert!(matches!(c.validate(), Err(StepsError::Noise(_))));
    }

    #[test]
    fn config_is_send_and_sync() {
        fn assert_impl<T: Send + Sync>() {}
        assert_impl::<StepsConfig>();
    }
}

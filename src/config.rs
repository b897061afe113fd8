use serde::Deserialize;

/// Top-level Nimbus configuration.
#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub struct NimbusConfig {
    /// Global RNG seed.
    #[serde(default)]
    pub seed: Option<u64>,

    /// Ensemble and method settings.
    #[serde(default)]
    pub forecast: ForecastToml,

    /// Bandpass filter settings.
    #[serde(default)]
    pub filter: FilterToml,

    /// Noise generator settings.
    #[serde(default)]
    pub noise: NoiseToml,

    /// Motion perturbation settings.
    #[serde(default)]
    pub vel_pert: VelPertToml,

    /// Incremental mask settings.
    #[serde(default)]
    pub mask: MaskToml,

    /// Advection settings.
    #[serde(default)]
    pub extrapolation: ExtrapolationToml,

    /// Synthetic scenario used when no input file is given.
    #[serde(default)]
    pub synthetic: SyntheticToml,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ForecastToml {
    #[serde(default = "default_n_ens_members")]
    pub n_ens_members: usize,
    #[serde(default = "default_n_cascade_levels")]
    pub n_cascade_levels: usize,
    /// Number of whole time steps to forecast; ignored when `lead_times`
    /// is set.
    #[serde(default = "default_timesteps")]
    pub timesteps: usize,
    /// Explicit, possibly fractional output times.
    #[serde(default)]
    pub lead_times: Option<Vec<f64>>,
    /// Rain/no-rain threshold in the units of the input (dBR).
    #[serde(default = "default_precip_thr")]
    pub precip_thr: f64,
    #[serde(default = "default_kmperpixel")]
    pub kmperpixel: f64,
    /// Time step length in minutes.
    #[serde(default = "default_timestep")]
    pub timestep: f64,
    #[serde(default = "default_ar_order")]
    pub ar_order: usize,
    #[serde(default = "default_decomp_method")]
    pub decomp_method: String,
    #[serde(default = "default_noise_method")]
    pub noise_method: String,
    #[serde(default = "default_none")]
    pub noise_stddev_adj: String,
    #[serde(default = "default_vel_pert_method")]
    pub vel_pert_method: String,
    #[serde(default)]
    pub conditional: bool,
    #[serde(default = "default_probmatching_method")]
    pub probmatching_method: String,
    #[serde(default = "default_mask_method")]
    pub mask_method: String,
    #[serde(default = "default_domain")]
    pub domain: String,
    #[serde(default = "default_num_workers")]
    pub num_workers: usize,
    #[serde(default)]
    pub measure_time: bool,
}

impl Default for ForecastToml {
    fn default() -> Self {
        Self {
            n_ens_members: default_n_ens_members(),
            n_cascade_levels: default_n_cascade_levels(),
            timesteps: default_timesteps(),
            lead_times: None,
            precip_thr: default_precip_thr(),
            kmperpixel: default_kmperpixel(),
            timestep: default_timestep(),
            ar_order: default_ar_order(),
            decomp_method: default_decomp_method(),
            noise_method: default_noise_method(),
            noise_stddev_adj: default_none(),
            vel_pert_method: default_vel_pert_method(),
            conditional: false,
            probmatching_method: default_probmatching_method(),
            mask_method: default_mask_method(),
            domain: default_domain(),
            num_workers: default_num_workers(),
            measure_time: false,
        }
    }
}

fn default_n_ens_members() -> usize {
    24
}
fn default_n_cascade_levels() -> usize {
    6
}
fn default_timesteps() -> usize {
    12
}
fn default_precip_thr() -> f64 {
    -10.0
}
fn default_kmperpixel() -> f64 {
    1.0
}
fn default_timestep() -> f64 {
    5.0
}
fn default_ar_order() -> usize {
    2
}
fn default_decomp_method() -> String {
    "fft".to_string()
}
fn default_noise_method() -> String {
    "nonparametric".to_string()
}
fn default_none() -> String {
    "none".to_string()
}
fn default_vel_pert_method() -> String {
    "bps".to_string()
}
fn default_probmatching_method() -> String {
    "cdf".to_string()
}
fn default_mask_method() -> String {
    "incremental".to_string()
}
fn default_domain() -> String {
    "spatial".to_string()
}
fn default_num_workers() -> usize {
    1
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FilterToml {
    #[serde(default = "default_filter_method")]
    pub method: String,
    #[serde(default = "default_gauss_scale")]
    pub gauss_scale: f64,
    #[serde(default = "default_true")]
    pub include_mean: bool,
}

impl Default for FilterToml {
    fn default() -> Self {
        Self {
            method: default_filter_method(),
            gauss_scale: default_gauss_scale(),
            include_mean: true,
        }
    }
}

fn default_filter_method() -> String {
    "gaussian".to_string()
}
fn default_gauss_scale() -> f64 {
    0.5
}
fn default_true() -> bool {
    true
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct NoiseToml {
    #[serde(default = "default_tukey_alpha")]
    pub tukey_alpha: f64,
}

impl Default for NoiseToml {
    fn default() -> Self {
        Self {
            tukey_alpha: default_tukey_alpha(),
        }
    }
}

fn default_tukey_alpha() -> f64 {
    0.2
}

#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub struct VelPertToml {
    /// `[p0, p1, p2]` for the component parallel to the motion.
    #[serde(default)]
    pub p_par: Option<[f64; 3]>,
    /// `[p0, p1, p2]` for the perpendicular component.
    #[serde(default)]
    pub p_perp: Option<[f64; 3]>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MaskToml {
    #[serde(default = "default_mask_f")]
    pub mask_f: f64,
    #[serde(default = "default_mask_rim")]
    pub mask_rim: usize,
}

impl Default for MaskToml {
    fn default() -> Self {
        Self {
            mask_f: default_mask_f(),
            mask_rim: default_mask_rim(),
        }
    }
}

fn default_mask_f() -> f64 {
    1.0
}
fn default_mask_rim() -> usize {
    10
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ExtrapolationToml {
    #[serde(default = "default_extrap_method")]
    pub method: String,
    #[serde(default = "default_n_iter")]
    pub n_iter: usize,
}

impl Default for ExtrapolationToml {
    fn default() -> Self {
        Self {
            method: default_extrap_method(),
            n_iter: default_n_iter(),
        }
    }
}

fn default_extrap_method() -> String {
    "semilagrangian".to_string()
}
fn default_n_iter() -> usize {
    1
}

/// An elliptic rain cell moving with constant velocity over a dry
/// background, in dBR.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SyntheticToml {
    #[serde(default = "default_size")]
    pub size: [usize; 2],
    #[serde(default = "default_n_frames")]
    pub n_frames: usize,
    /// Cell velocity `[u, v]` in pixels per time step.
    #[serde(default = "default_velocity")]
    pub velocity: [f64; 2],
    /// Peak intensity above the background.
    #[serde(default = "default_amplitude")]
    pub amplitude: f64,
    /// Gaussian radius of the cell in pixels.
    #[serde(default = "default_radius")]
    pub radius: f64,
    #[serde(default = "default_background")]
    pub background: f64,
    /// Standard deviation of the per-pixel measurement noise.
    #[serde(default = "default_noise_sd")]
    pub noise_sd: f64,
}

impl Default for SyntheticToml {
    fn default() -> Self {
        Self {
            size: default_size(),
            n_frames: default_n_frames(),
            velocity: default_velocity(),
            amplitude: default_amplitude(),
            radius: default_radius(),
            background: default_background(),
            noise_sd: default_noise_sd(),
        }
    }
}

fn default_size() -> [usize; 2] {
    [64, 64]
}
fn default_n_frames() -> usize {
    3
}
fn default_velocity() -> [f64; 2] {
    [1.0, 0.5]
}
fn default_amplitude() -> f64 {
    25.0
}
fn default_radius() -> f64 {
    8.0
}
fn default_background() -> f64 {
    -15.0
}
fn default_noise_sd() -> f64 {
    1.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_uses_defaults() {
        let config: NimbusConfig = toml::from_str("").unwrap();
        assert_eq!(config.forecast.n_ens_members, 24);
        assert_eq!(config.forecast.mask_method, "incremental");
        assert_eq!(config.mask.mask_rim, 10);
        assert_eq!(config.synthetic.size, [64, 64]);
        assert!(config.seed.is_none());
    }

    #[test]
    fn tables_are_read() {
        let text = r#"
            seed = 7

            [forecast]
            n_ens_members = 4
            lead_times = [0.5, 1.0]
            precip_thr = -10.0
            noise_stddev_adj = "auto"

            [vel_pert]
            p_par = [1.0, 0.5, 0.0]

            [extrapolation]
            method = "eulerian"
        "#;
        let config: NimbusConfig = toml::from_str(text).unwrap();
        assert_eq!(config.seed, Some(7));
        assert_eq!(config.forecast.n_ens_members, 4);
        assert_eq!(config.forecast.lead_times, Some(vec![0.5, 1.0]));
        assert_eq!(config.vel_pert.p_par, Some([1.0, 0.5, 0.0]));
        assert_eq!(config.extrapolation.method, "eulerian");
    }

    #[test]
    fn unknown_fields_rejected() {
        assert!(toml::from_str::<NimbusConfig>("[forecast]\nmembers = 3\n").is_err());
    }
}

//! # nimbus-steps
//!
//! Short-Term Ensemble Prediction System (STEPS) nowcasting of
//! precipitation fields.
//!
//! The latest radar frames are aligned along the motion field, split into
//! spatial-scale cascade levels and fitted with a per-level autoregressive
//! model. Each ensemble member then evolves its cascade with its own
//! spatially correlated noise, is recomposed, masked and probability
//! matched, and is finally advected to the requested lead times.
//!
//! ## Pipeline
//!
//! ```mermaid
//! graph TD
//!     A["validate_inputs(&history, &motion, &timesteps, &config)?"] --> B["align_history(...)?"]
//!     B --> C["decompose + temporal_autocorrelation + ArSpec::fit"]
//!     B --> D["NoiseGenerator::initialize(...)? / auto_noise_std_coeffs(...)?"]
//!     C --> E["per-member step loop (rayon)"]
//!     D --> E
//!     E -->|"iterate_ar, recompose, mask, probability matching"| F["advect to subtimes"]
//!     F --> G["Nowcast / StepFields callback"]
//! ```
//!
//! ## Options
//!
//! | Concern | Option | Choices |
//! |---------|--------|---------|
//! | Noise | [`StepsConfig::with_noise_method`] | nonparametric, parametric, none |
//! | Noise scaling | [`StepsConfig::with_noise_stddev_adj`] | auto, fixed, none |
//! | Motion perturbation | [`StepsConfig::with_vel_pert_method`] | bps, none |
//! | Masking | [`StepsConfig::with_mask_method`] | [`MaskMethod::Obs`], [`MaskMethod::Sprog`], [`MaskMethod::Incremental`], none |
//! | Probability matching | [`StepsConfig::with_probmatching_method`] | cdf, mean, none |
//! | Working domain | [`StepsConfig::with_domain`] | spatial, spectral |
//!
//! ## Reproducibility
//!
//! With a fixed seed the forecast is identical for any number of workers:
//! every member draws from its own generator and members never share
//! mutable state.
//!
//! ## Quick Start
//!
//! ```ignore
//! use nimbus_steps::{StepsConfig, Timesteps, forecast};
//!
//! let config = StepsConfig::new()
//!     .with_n_ens_members(20)
//!     .with_precip_thr(Some(-10.0))
//!     .with_kmperpixel(Some(1.0))
//!     .with_timestep(Some(5.0))
//!     .with_seed(Some(24));
//! let nowcast = forecast(&history, &motion, &Timesteps::Count(12), &config)?;
//! let ensemble = nowcast.ensemble(); // (members, lead times, rows, cols)
//! ```

mod align;
mod config;
mod error;
mod mask;
mod member;
mod noise_adjust;
mod nowcast;
mod result;
mod timesteps;
mod validate;

pub use align::align_history;
pub use config::{MaskConfig, MaskMethod, StepsConfig};
pub use error::StepsError;
pub use mask::{incremental_mask, percentile_mask, structure_radius};
pub use noise_adjust::{NOISE_ADJUST_TRIALS, auto_noise_std_coeffs};
pub use nowcast::{forecast, forecast_with_callback};
pub use result::{Nowcast, NowcastTiming, StepFields};
pub use timesteps::{Schedule, Timesteps};
pub use validate::validate_inputs;

pub use nimbus_cascade::{DecompositionMethod, Domain, FilterConfig, FilterMethod};
pub use nimbus_extrapolation::{ExtrapolationMethod, SemiLagrangianConfig};
pub use nimbus_noise::{NoiseConfig, NoiseMethod, NoiseStdAdjustment, VelPertConfig, VelPertMethod};
pub use nimbus_probmatch::ProbMatchingMethod;

//! # nimbus-noise
//!
//! Stochastic perturbations for ensemble nowcasting: spatially correlated
//! noise fields for the precipitation cascade and time-growing
//! perturbations of the motion field.
//!
//! ```mermaid
//! graph LR
//!     A["NoiseGenerator::initialize(method, &frames, &fft, &config)?"] --> B["NoiseGenerator"]
//!     B -->|".generate(&mut rng, &fft)?"| C["Array2 (zero mean, unit variance)"]
//!     D["MotionPerturbator::new(&motion, ppk, timestep, &config, &mut rng)?"] --> E["MotionPerturbator"]
//!     E -->|".generate(t_minutes)"| F["Array3 perturbation"]
//! ```
//!
//! | Method | Amplitude filter |
//! |--------|------------------|
//! | [`NoiseMethod::Nonparametric`] | mean Fourier amplitude of the input frames |
//! | [`NoiseMethod::Parametric`] | `k^(beta / 2)`, `beta` fitted to the radial power spectrum |

mod config;
mod error;
mod generator;
mod motion;

pub use config::{NoiseConfig, NoiseMethod, NoiseStdAdjustment, fixed_noise_std_coeffs};
pub use error::NoiseError;
pub use generator::NoiseGenerator;
pub use motion::{MotionPerturbator, VelPertConfig, VelPertMethod};

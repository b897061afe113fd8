//! # nimbus-cascade
//!
//! Spatial-scale decomposition of 2-D precipitation fields.
//!
//! A field is split into a fixed number of bandpass levels by weighting its
//! Fourier spectrum with a filter bank. Each level is normalized by its mean
//! and standard deviation so that a per-level stochastic model can work on
//! unit-variance values; recomposition undoes the normalization and sums the
//! levels back into a field.
//!
//! ## Pipeline
//!
//! ```mermaid
//! graph LR
//!     A["Fft2::new(shape)?"] --> D
//!     B["build_filter(method, shape, n, &config)?"] --> D
//!     F["Array2&lt;f64&gt;"] --> D["decompose::&lt;T&gt;(&field, &filter, mask, &fft)?"]
//!     D --> C["Cascade&lt;T&gt;"]
//!     C -->|"recompose(&fft)?"| F
//! ```
//!
//! ## Domains
//!
//! | `T` | [`Domain`] | Level storage |
//! |-----|------------|---------------|
//! | `f64` | [`Domain::Spatial`] | real arrays |
//! | `Complex64` | [`Domain::Spectral`] | unnormalized Fourier coefficients |
//!
//! ## Quick Start
//!
//! ```ignore
//! use nimbus_cascade::{Fft2, FilterConfig, FilterMethod, build_filter, decompose};
//!
//! let fft = Fft2::new(field.dim())?;
//! let filter = build_filter(FilterMethod::Gaussian, field.dim(), 6, &FilterConfig::new())?;
//! let cascade = decompose::<f64>(&field, &filter, None, &fft)?;
//! let back = cascade.recompose(&fft)?;
//! ```

mod decomposition;
mod domain;
mod error;
mod fft;
mod filter;

pub use decomposition::{Cascade, DecompositionMethod, decompose, recompose};
pub use domain::{Domain, DomainValue};
pub use error::CascadeError;
pub use fft::{Fft2, radial_wavenumbers};
pub use filter::{BandpassFilter, FilterConfig, FilterMethod, build_filter, filter_gaussian, filter_uniform};

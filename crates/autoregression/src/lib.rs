//! # nimbus-autoregression
//!
//! Autoregressive models for the temporal evolution of cascade levels.
//!
//! ## Workflow
//!
//! ```mermaid
//! graph LR
//!     A["temporal_autocorrelation(&frames, mask)?"] --> B["gamma"]
//!     B -->|"order 2"| C["adjust_lag2_corrcoef(g1, g2)"]
//!     C --> D
//!     B --> D["ArSpec::new(p)?.fit(&gamma)?"]
//!     D --> E["ArFit"]
//!     E -->|".coefficients()"| F["iterate_ar(&mut history, coeffs, noise)?"]
//! ```
//!
//! ## Glossary
//!
//! | Symbol | Accessor | Meaning |
//! |--------|----------|---------|
//! | gamma | [`ArFit::gamma()`] | lag-1..lag-p temporal autocorrelations |
//! | phi | [`ArFit::phi()`] | lag weights from the Yule-Walker equations |
//! | sigma | [`ArFit::innovation()`] | scale of the unit-variance innovation |

mod correlation;
mod error;
mod fit;
mod iterate;
mod small_linalg;
mod spec;

pub use correlation::{adjust_lag2_corrcoef, temporal_autocorrelation};
pub use error::AutoregressionError;
pub use fit::ArFit;
pub use iterate::iterate_ar;
pub use spec::ArSpec;

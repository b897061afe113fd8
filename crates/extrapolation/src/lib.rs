//! # nimbus-extrapolation
//!
//! Advection of precipitation fields along a motion field.
//!
//! ```mermaid
//! graph LR
//!     A["build_extrapolator(method, &config)?"] --> B["Box&lt;dyn Extrapolator&gt;"]
//!     B -->|".extrapolate(field, &motion, &lead_times, fill, prev)?"| C["Extrapolation"]
//!     C --> D[".fields()"]
//!     C -->|"next call"| E[".displacement()"]
//! ```
//!
//! Motion fields have shape `(2, rows, cols)` in pixels per unit lead
//! time; component 0 moves along columns and component 1 along rows.

mod error;
mod eulerian;
mod extrapolator;
mod interp;
mod semilagrangian;

pub use error::ExtrapolationError;
pub use eulerian::Eulerian;
pub use extrapolator::{Extrapolation, ExtrapolationMethod, Extrapolator, OutsideFill};
pub use semilagrangian::{SemiLagrangian, SemiLagrangianConfig};

/// Resolves an [`ExtrapolationMethod`] into a shareable scheme.
///
/// # Errors
///
/// Returns [`ExtrapolationError::InvalidConfig`] if `config` is invalid.
pub fn build_extrapolator(
    method: ExtrapolationMethod,
    config: &SemiLagrangianConfig,
) -> Result<Box<dyn Extrapolator>, ExtrapolationError> {
    Ok(match method {
        ExtrapolationMethod::SemiLagrangian => Box::new(SemiLagrangian::new(config.clone())?),
        ExtrapolationMethod::Eulerian => Box::new(Eulerian),
    })
}

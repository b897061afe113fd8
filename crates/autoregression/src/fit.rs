//! Fitted AR model.

use crate::spec::ArSpec;

/// A fitted AR(p) model produced by [`ArSpec::fit()`].
#[derive(Clone, Debug, PartialEq)]
pub struct ArFit {
    spec: ArSpec,
    gamma: Vec<f64>,
    coefficients: Vec<f64>,
}

impl ArFit {
    pub(crate) fn new(spec: ArSpec, gamma: Vec<f64>, coefficients: Vec<f64>) -> Self {
        Self {
            spec,
            gamma,
            coefficients,
        }
    }

    /// Returns the [`ArSpec`] that produced this fit.
    pub fn spec(&self) -> ArSpec {
        self.spec
    }

    /// Returns the AR order.
    pub fn order(&self) -> usize {
        self.spec.order()
    }

    /// Autocorrelations the model was fitted to.
    pub fn gamma(&self) -> &[f64] {
        &self.gamma
    }

    /// All `p + 1` coefficients: lag weights then innovation scale.
    pub fn coefficients(&self) -> &[f64] {
        &self.coefficients
    }

    /// The `p` lag weights.
    pub fn phi(&self) -> &[f64] {
        &self.coefficients[..self.order()]
    }

    /// The innovation (noise) scale.
    pub fn innovation(&self) -> f64 {
        self.coefficients[self.order()]
    }
}

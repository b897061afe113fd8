//! AR model specification (unfitted).

use tracing::{debug, warn};

use crate::error::AutoregressionError;
use crate::fit::ArFit;
use crate::small_linalg::{Stationarity, solve, stationarity};

/// An unfitted AR(p) model specification.
///
/// ```mermaid
/// graph LR
///     A["ArSpec::new(p)"] -->|".fit(&gamma)?"| B["ArFit"]
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ArSpec {
    order: usize,
}

impl ArSpec {
    /// Creates a new AR(`order`) specification.
    ///
    /// # Errors
    ///
    /// Returns [`AutoregressionError::InvalidOrder`] if `order` is zero.
    pub fn new(order: usize) -> Result<Self, AutoregressionError> {
        if order == 0 {
            return Err(AutoregressionError::InvalidOrder { order });
        }
        Ok(Self { order })
    }

    /// Returns the AR order.
    pub fn order(&self) -> usize {
        self.order
    }

    /// Estimates the AR parameters from lag-1..lag-p autocorrelations by
    /// solving the Yule-Walker equations.
    ///
    /// The returned fit holds `p + 1` coefficients: the `p` lag weights
    /// followed by the innovation scale `sqrt(1 - sum(gamma_i * phi_i))`
    /// (zero when the radicand is negative).
    ///
    /// A solution on the unit circle, such as `phi = [1]` from perfectly
    /// persistent fields, is accepted with a warning; its innovation is
    /// zero and the process continues as persistence.
    ///
    /// # Errors
    ///
    /// | Variant | Trigger |
    /// |---------|---------|
    /// | [`AutoregressionError::CoefficientCount`] | `gamma.len() != p` |
    /// | [`AutoregressionError::NonFiniteCorrelation`] | any `gamma` is NaN or infinite |
    /// | [`AutoregressionError::Singular`] | the Toeplitz system is singular |
    /// | [`AutoregressionError::NonStationary`] | the solution lies outside the unit circle |
    pub fn fit(&self, gamma: &[f64]) -> Result<ArFit, AutoregressionError> {
        let p = self.order;
        if gamma.len() != p {
            return Err(AutoregressionError::CoefficientCount {
                expected: p,
                got: gamma.len(),
            });
        }
        if let Some((i, &value)) = gamma.iter().enumerate().find(|(_, g)| !g.is_finite()) {
            return Err(AutoregressionError::NonFiniteCorrelation { lag: i + 1, value });
        }

        // Toeplitz matrix of autocorrelations, rho(0) = 1.
        let rho = |lag: usize| if lag == 0 { 1.0 } else { gamma[lag - 1] };
        let matrix: Vec<Vec<f64>> = (0..p)
            .map(|i| (0..p).map(|j| rho(i.abs_diff(j))).collect())
            .collect();
        let phi = solve(matrix, gamma.to_vec()).ok_or(AutoregressionError::Singular)?;

        match stationarity(&phi) {
            Stationarity::Stationary => {}
            Stationarity::UnitRoot => warn!(?phi, "AR process on the unit circle, no innovation"),
            Stationarity::Explosive => return Err(AutoregressionError::NonStationary { phi }),
        }

        let radicand = 1.0 - gamma.iter().zip(&phi).map(|(g, f)| g * f).sum::<f64>();
        let innovation = if radicand > 0.0 { radicand.sqrt() } else { 0.0 };
        debug!(?gamma, ?phi, innovation, "fitted AR model");

        let mut coefficients = phi;
        coefficients.push(innovation);
        Ok(ArFit::new(*self, gamma.to_vec(), coefficients))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn zero_order_rejected() {
        assert!(matches!(
            ArSpec::new(0),
            Err(AutoregressionError::InvalidOrder { order: 0 })
        ));
    }

    #[test]
    fn ar1_coefficient_equals_gamma() {
        let fit = ArSpec::new(1).unwrap().fit(&[0.8]).unwrap();
        assert_relative_eq!(fit.phi()[0], 0.8, epsilon = 1e-12);
        assert_relative_eq!(fit.innovation(), (1.0 - 0.64_f64).sqrt(), epsilon = 1e-12);
    }

    #[test]
    fn ar2_closed_form() {
        let (g1, g2) = (0.9_f64, 0.7_f64);
        let fit = ArSpec::new(2).unwrap().fit(&[g1, g2]).unwrap();
        let phi1 = g1 * (1.0 - g2) / (1.0 - g1 * g1);
        let phi2 = (g2 - g1 * g1) / (1.0 - g1 * g1);
        assert_relative_eq!(fit.phi()[0], phi1, epsilon = 1e-12);
        assert_relative_eq!(fit.phi()[1], phi2, epsilon = 1e-12);
        let c = 1.0 - g1 * phi1 - g2 * phi2;
        assert_relative_eq!(fit.innovation(), c.sqrt(), epsilon = 1e-12);
        assert_eq!(fit.coefficients().len(), 3);
    }

    #[test]
    fn wrong_gamma_length() {
        let err = ArSpec::new(2).unwrap().fit(&[0.5]).unwrap_err();
        assert!(matches!(
            err,
            AutoregressionError::CoefficientCount {
                expected: 2,
                got: 1
            }
        ));
    }

    #[test]
    fn nan_gamma_rejected() {
        let err = ArSpec::new(2).unwrap().fit(&[0.5, f64::NAN]).unwrap_err();
        assert!(matches!(
            err,
            AutoregressionError::NonFiniteCorrelation { lag: 2, .. }
        ));
    }

    #[test]
    fn unit_correlation_is_singular() {
        let err = ArSpec::new(2).unwrap().fit(&[1.0, 1.0]).unwrap_err();
        assert!(matches!(err, AutoregressionError::Singular));
    }

    #[test]
    fn unit_lag1_correlation_is_persistence() {
        let fit = ArSpec::new(1).unwrap().fit(&[1.0]).unwrap();
        assert_relative_eq!(fit.phi()[0], 1.0, epsilon = 1e-12);
        assert_eq!(fit.innovation(), 0.0);
    }

    #[test]
    fn inadmissible_lag2_is_non_stationary() {
        // Without the lag-2 adjustment this pair violates stationarity.
        let err = ArSpec::new(2).unwrap().fit(&[0.95, 0.2]).unwrap_err();
        assert!(matches!(err, AutoregressionError::NonStationary { .. }));
    }
}

//! One-step iteration of an AR(p) process on 2-D cascade levels.

use std::collections::VecDeque;

use ndarray::{Array2, Zip};
use nimbus_cascade::DomainValue;

use crate::error::AutoregressionError;

/// Advances an AR(p) process by one step in place.
///
/// `history` holds the last `p` states, oldest first. The new state
/// `sum_i(phi[i] * history[p - 1 - i]) + phi[p] * noise` is appended and the
/// oldest state dropped. Without `noise` the innovation term is omitted.
///
/// # Errors
///
/// Returns [`AutoregressionError::CoefficientCount`] if `coefficients` does
/// not hold `history.len() + 1` values, or
/// [`AutoregressionError::ShapeMismatch`] if `noise` or a state differs in
/// shape.
pub fn iterate_ar<T: DomainValue>(
    history: &mut VecDeque<Array2<T>>,
    coefficients: &[f64],
    noise: Option<&Array2<T>>,
) -> Result<(), AutoregressionError> {
    let p = history.len();
    if p == 0 {
        return Err(AutoregressionError::InsufficientFrames { n: 0, min: 1 });
    }
    if coefficients.len() != p + 1 {
        return Err(AutoregressionError::CoefficientCount {
            expected: p + 1,
            got: coefficients.len(),
        });
    }
    let expected = history[0].dim();
    let noise_dim = noise.map(|n| n.dim());
    for got in history.iter().map(|h| h.dim()).chain(noise_dim) {
        if got != expected {
            return Err(AutoregressionError::ShapeMismatch { expected, got });
        }
    }

    let mut next = Array2::from_elem(expected, T::zero());
    for (i, &phi) in coefficients[..p].iter().enumerate() {
        Zip::from(&mut next)
            .and(&history[p - 1 - i])
            .for_each(|x, &v| *x = *x + v * phi);
    }
    if let Some(eps) = noise {
        let scale = coefficients[p];
        Zip::from(&mut next)
            .and(eps)
            .for_each(|x, &e| *x = *x + e * scale);
    }

    history.pop_front();
    history.push_back(next);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use num_complex::Complex64;

    #[test]
    fn ar2_step_without_noise() {
        let mut history: VecDeque<Array2<f64>> =
            VecDeque::from(vec![Array2::from_elem((2, 2), 1.0), Array2::from_elem((2, 2), 2.0)]);
        iterate_ar(&mut history, &[0.5, 0.25, 0.9], None).unwrap();
        // 0.5 * 2.0 + 0.25 * 1.0
        assert_eq!(history.len(), 2);
        assert_relative_eq!(history[0][[0, 0]], 2.0);
        assert_relative_eq!(history[1][[1, 1]], 1.25);
    }

    #[test]
    fn noise_is_scaled_by_innovation() {
        let mut history: VecDeque<Array2<f64>> = VecDeque::from(vec![Array2::zeros((2, 3))]);
        let noise = Array2::from_elem((2, 3), 2.0);
        iterate_ar(&mut history, &[0.7, 0.5], Some(&noise)).unwrap();
        assert!(history[0].iter().all(|&v| (v - 1.0).abs() < 1e-15));
    }

    #[test]
    fn complex_values_iterate_linearly() {
        let mut history: VecDeque<Array2<Complex64>> =
            VecDeque::from(vec![Array2::from_elem((1, 2), Complex64::new(1.0, -2.0))]);
        iterate_ar(&mut history, &[0.5, 0.0], None).unwrap();
        assert_relative_eq!(history[0][[0, 1]].re, 0.5);
        assert_relative_eq!(history[0][[0, 1]].im, -1.0);
    }

    #[test]
    fn coefficient_count_checked() {
        let mut history: VecDeque<Array2<f64>> = VecDeque::from(vec![Array2::zeros((2, 2)); 2]);
        let err = iterate_ar(&mut history, &[0.5, 0.5], None).unwrap_err();
        assert!(matches!(
            err,
            AutoregressionError::CoefficientCount {
                expected: 3,
                got: 2
            }
        ));
    }

    #[test]
    fn noise_shape_checked() {
        let mut history: VecDeque<Array2<f64>> = VecDeque::from(vec![Array2::zeros((2, 2))]);
        let noise = Array2::zeros((3, 2));
        let err = iterate_ar(&mut history, &[0.5, 0.5], Some(&noise)).unwrap_err();
        assert!(matches!(err, AutoregressionError::ShapeMismatch { .. }));
    }
}

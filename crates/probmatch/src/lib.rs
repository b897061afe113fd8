//! # nimbus-probmatch
//!
//! Post-hoc rescaling of forecast fields so that their value distribution
//! matches an observation.
//!
//! | Method | Function | Effect |
//! |--------|----------|--------|
//! | [`ProbMatchingMethod::Cdf`] | [`match_empirical_cdf`] | rank-preserving replacement by reference order statistics |
//! | [`ProbMatchingMethod::Mean`] | [`match_conditional_mean`] | shift of wet pixels to a target conditional mean |
//!
//! Non-finite pixels pass through unchanged in both methods.

mod error;

pub use error::ProbMatchError;

use ndarray::Array2;
use tracing::debug;

/// Probability matching method.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ProbMatchingMethod {
    /// Empirical CDF matching against the latest observation.
    Cdf,
    /// Conditional mean matching of pixels at or above the threshold.
    Mean,
}

/// Replaces each finite pixel of `field` by the reference value of the same
/// rank.
///
/// Finite pixels are ranked by value (ties by position) and assigned the
/// type-7 quantile of the sorted finite reference values at
/// `rank / (n - 1)`, which is the reference order statistic itself when both
/// fields have the same number of finite pixels. Pixels equal to the field
/// minimum receive the reference minimum.
///
/// # Errors
///
/// Returns [`ProbMatchError::EmptyReference`] if `reference` has no finite
/// values.
pub fn match_empirical_cdf(
    field: &Array2<f64>,
    reference: &Array2<f64>,
) -> Result<Array2<f64>, ProbMatchError> {
    let target: Vec<f64> = reference.iter().copied().collect();
    let target = nimbus_stats::sorted_finite(&target);
    if target.is_empty() {
        return Err(ProbMatchError::EmptyReference);
    }

    let values: Vec<f64> = field.iter().copied().collect();
    let mut order: Vec<usize> = (0..values.len()).filter(|&i| values[i].is_finite()).collect();
    order.sort_by(|&a, &b| values[a].total_cmp(&values[b]).then(a.cmp(&b)));

    let mut out = values.clone();
    let n = order.len();
    if n == 0 {
        return Ok(field.clone());
    }
    for (rank, &idx) in order.iter().enumerate() {
        let p = if n > 1 {
            rank as f64 / (n - 1) as f64
        } else {
            0.5
        };
        out[idx] = nimbus_stats::quantile_type7(&target, p);
    }

    let field_min = values[order[0]];
    let target_min = target[0];
    for (o, &v) in out.iter_mut().zip(&values) {
        if v == field_min {
            *o = target_min;
        }
    }
    debug!(n_finite = n, n_reference = target.len(), "empirical CDF matching");
    Ok(Array2::from_shape_vec(field.dim(), out).unwrap_or_else(|_| field.clone()))
}

/// Shifts the pixels at or above `threshold` so that their mean equals
/// `target_mean`. Returns an unchanged copy when no pixel reaches the
/// threshold.
///
/// # Errors
///
/// Returns [`ProbMatchError::NonFiniteTarget`] if `target_mean` is not
/// finite.
pub fn match_conditional_mean(
    field: &Array2<f64>,
    threshold: f64,
    target_mean: f64,
) -> Result<Array2<f64>, ProbMatchError> {
    if !target_mean.is_finite() {
        return Err(ProbMatchError::NonFiniteTarget { value: target_mean });
    }
    let wet: Vec<f64> = field.iter().copied().filter(|&v| v >= threshold).collect();
    if wet.is_empty() {
        return Ok(field.clone());
    }
    let shift = target_mean - nimbus_stats::mean(&wet);
    Ok(field.mapv(|v| if v >= threshold { v + shift } else { v }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn cdf_equal_sizes_takes_reference_values() {
        let field = Array2::from_shape_vec((2, 2), vec![0.0, 3.0, 1.0, 2.0]).unwrap();
        let reference = Array2::from_shape_vec((2, 2), vec![10.0, 0.5, 7.0, 4.0]).unwrap();
        let out = match_empirical_cdf(&field, &reference).unwrap();
        assert_eq!(out.as_slice().unwrap(), &[0.5, 10.0, 4.0, 7.0]);
    }

    #[test]
    fn cdf_keeps_nan_pixels() {
        let field = Array2::from_shape_vec((1, 4), vec![f64::NAN, 2.0, 1.0, 5.0]).unwrap();
        let reference = Array2::from_shape_vec((1, 3), vec![1.0, 2.0, 3.0]).unwrap();
        let out = match_empirical_cdf(&field, &reference).unwrap();
        assert!(out[[0, 0]].is_nan());
        assert_eq!(out[[0, 2]], 1.0);
        assert_eq!(out[[0, 1]], 2.0);
        assert_eq!(out[[0, 3]], 3.0);
    }

    #[test]
    fn cdf_resamples_reference_of_different_size() {
        let field = Array2::from_shape_vec((1, 3), vec![5.0, 1.0, 3.0]).unwrap();
        let reference = Array2::from_shape_vec((1, 5), vec![0.0, 1.0, 2.0, 3.0, 4.0]).unwrap();
        let out = match_empirical_cdf(&field, &reference).unwrap();
        assert_eq!(out.as_slice().unwrap(), &[4.0, 0.0, 2.0]);
    }

    #[test]
    fn cdf_minimum_pixels_get_reference_minimum() {
        let field = Array2::from_shape_vec((1, 4), vec![0.0, 0.0, 0.0, 1.0]).unwrap();
        let reference = Array2::from_shape_vec((1, 4), vec![0.1, 0.2, 0.3, 0.4]).unwrap();
        let out = match_empirical_cdf(&field, &reference).unwrap();
        assert_eq!(out.as_slice().unwrap(), &[0.1, 0.1, 0.1, 0.4]);
    }

    #[test]
    fn cdf_empty_reference_rejected() {
        let field = Array2::zeros((2, 2));
        let reference = Array2::from_elem((2, 2), f64::NAN);
        assert!(matches!(
            match_empirical_cdf(&field, &reference),
            Err(ProbMatchError::EmptyReference)
        ));
    }

    #[test]
    fn mean_matching_shifts_wet_pixels() {
        let field = Array2::from_shape_vec((1, 4), vec![0.0, 1.0, 2.0, 3.0]).unwrap();
        let out = match_conditional_mean(&field, 1.0, 5.0).unwrap();
        assert_eq!(out[[0, 0]], 0.0);
        let wet_mean = (out[[0, 1]] + out[[0, 2]] + out[[0, 3]]) / 3.0;
        assert_relative_eq!(wet_mean, 5.0, epsilon = 1e-12);
    }

    #[test]
    fn mean_matching_noop_without_wet_pixels() {
        let field = Array2::from_elem((3, 3), 0.05);
        let out = match_conditional_mean(&field, 0.1, 2.0).unwrap();
        assert_eq!(out, field);
    }

    #[test]
    fn mean_matching_rejects_nan_target() {
        let field = Array2::from_elem((2, 2), 1.0);
        assert!(match_conditional_mean(&field, 0.1, f64::NAN).is_err());
    }
}

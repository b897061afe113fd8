//! Statistical helper functions shared by the nimbus nowcasting crates.
//!
//! All functions operate on flat `f64` slices so that they can be applied
//! to the contiguous storage of 2-D fields as well as to short series.

/// Arithmetic mean of a slice. Returns 0.0 if empty.
pub fn mean(data: &[f64]) -> f64 {
    if data.is_empty() {
        return 0.0;
    }
    let sum: f64 = data.iter().sum();
    sum / data.len() as f64
}

/// Mean and population standard deviation over the elements selected by
/// `mask` (all elements when `mask` is `None`).
///
/// Returns `(NaN, NaN)` when the selection is empty or when `mask` is given
/// with a length different from `data`.
pub fn masked_mean_sd(data: &[f64], mask: Option<&[bool]>) -> (f64, f64) {
    let (sum, count) = match mask {
        Some(m) if m.len() != data.len() => return (f64::NAN, f64::NAN),
        Some(m) => {
            data.iter()
                .zip(m)
                .filter(|&(_, &keep)| keep)
                .fold((0.0, 0usize), |(s, c), (&x, _)| (s + x, c + 1))
        }
        None => (data.iter().sum::<f64>(), data.len()),
    };
    if count == 0 {
        return (f64::NAN, f64::NAN);
    }
    let mu = sum / count as f64;

    let sq: f64 = match mask {
        Some(m) => data
            .iter()
            .zip(m)
            .filter(|&(_, &keep)| keep)
            .map(|(&x, _)| (x - mu) * (x - mu))
            .sum(),
        None => data.iter().map(|&x| (x - mu) * (x - mu)).sum(),
    };
    (mu, (sq / count as f64).sqrt())
}

/// Minimum over the finite elements of a slice, or `None` if there are none.
pub fn finite_min(data: &[f64]) -> Option<f64> {
    data.iter()
        .copied()
        .filter(|v| v.is_finite())
        .min_by(|a, b| a.total_cmp(b))
}

/// Maximum over the finite elements of a slice, or `None` if there are none.
pub fn finite_max(data: &[f64]) -> Option<f64> {
    data.iter()
        .copied()
        .filter(|v| v.is_finite())
        .max_by(|a, b| a.total_cmp(b))
}

/// Returns the finite elements of `data` sorted ascending.
pub fn sorted_finite(data: &[f64]) -> Vec<f64> {
    let mut sorted: Vec<f64> = data.iter().copied().filter(|v| v.is_finite()).collect();
    sorted.sort_by(|a, b| a.total_cmp(b));
    sorted
}

/// Type-7 quantile (linear interpolation between order statistics).
///
/// **Expects pre-sorted input** (caller's responsibility).
///
/// # Panics
///
/// Panics if `sorted` is empty.
pub fn quantile_type7(sorted: &[f64], p: f64) -> f64 {
    assert!(
        !sorted.is_empty(),
        "quantile_type7: input must not be empty"
    );
    let n = sorted.len();
    let h = (n - 1) as f64 * p;
    let lo = h.floor() as usize;
    let hi = (lo + 1).min(n - 1);
    sorted[lo] + (h - h.floor()) * (sorted[hi] - sorted[lo])
}

/// Pearson correlation coefficient.
///
/// Filters to indices where both `x[i]` and `y[i]` are finite and, when
/// `mask` is given, `mask[i]` is set.
/// Returns `None` if fewer than 3 pairs remain or if the denominator is zero
/// (constant input).
pub fn pearson_correlation(x: &[f64], y: &[f64], mask: Option<&[bool]>) -> Option<f64> {
    let pairs: Vec<(f64, f64)> = x
        .iter()
        .zip(y.iter())
        .enumerate()
        .filter(|&(i, (xi, yi))| {
            xi.is_finite() && yi.is_finite() && mask.is_none_or(|m| m[i])
        })
        .map(|(_, (xi, yi))| (*xi, *yi))
        .collect();

    if pairs.len() < 3 {
        return None;
    }

    let n = pairs.len() as f64;
    let mx: f64 = pairs.iter().map(|(xi, _)| xi).sum::<f64>() / n;
    let my: f64 = pairs.iter().map(|(_, yi)| yi).sum::<f64>() / n;

    let mut sum_xy = 0.0;
    let mut sum_xx = 0.0;
    let mut sum_yy = 0.0;
    for &(xi, yi) in &pairs {
        let dx = xi - mx;
        let dy = yi - my;
        sum_xy += dx * dy;
        sum_xx += dx * dx;
        sum_yy += dy * dy;
    }

    let denom = (sum_xx * sum_yy).sqrt();
    if denom == 0.0 {
        return None;
    }

    Some(sum_xy / denom)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_mean() {
        let data = [2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0];
        assert_relative_eq!(mean(&data), 5.0, epsilon = 1e-6);
    }

    #[test]
    fn test_mean_empty() {
        assert_eq!(mean(&[]), 0.0);
    }

    #[test]
    fn test_masked_mean_sd_all() {
        let data = [2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0];
        let (mu, sigma) = masked_mean_sd(&data, None);
        assert_relative_eq!(mu, 5.0, epsilon = 1e-12);
        assert_relative_eq!(sigma, 2.0, epsilon = 1e-12);
    }

    #[test]
    fn test_masked_mean_sd_subset() {
        let data = [1.0, 100.0, 3.0, -50.0];
        let mask = [true, false, true, false];
        let (mu, sigma) = masked_mean_sd(&data, Some(&mask));
        assert_relative_eq!(mu, 2.0, epsilon = 1e-12);
        assert_relative_eq!(sigma, 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_masked_mean_sd_empty_selection() {
        let (mu, sigma) = masked_mean_sd(&[1.0, 2.0], Some(&[false, false]));
        assert!(mu.is_nan());
        assert!(sigma.is_nan());
    }

    #[test]
    fn test_masked_mean_sd_length_mismatch() {
        let (mu, sd) = masked_mean_sd(&[1.0, 2.0, 3.0], Some(&[true, true]));
        assert!(mu.is_nan());
        assert!(sd.is_nan());
    }

    #[test]
    fn test_finite_min_max() {
        let data = [f64::NAN, 3.0, -1.5, f64::INFINITY, 2.0];
        assert_eq!(finite_min(&data), Some(-1.5));
        assert_eq!(finite_max(&data), Some(3.0));
        assert_eq!(finite_min(&[f64::NAN]), None);
    }

    #[test]
    fn test_sorted_finite() {
        let data = [3.0, f64::NAN, 1.0, 2.0];
        assert_eq!(sorted_finite(&data), vec![1.0, 2.0, 3.0]);
    }

    #[test]
    fn test_quantile_type7() {
        let sorted = [1.0, 2.0, 3.0, 4.0, 5.0];
        assert_relative_eq!(quantile_type7(&sorted, 0.25), 2.0, epsilon = 1e-6);
        assert_relative_eq!(quantile_type7(&sorted, 0.1), 1.4, epsilon = 1e-10);
        assert_relative_eq!(quantile_type7(&sorted, 1.0), 5.0, epsilon = 1e-10);
    }

    #[test]
    #[should_panic(expected = "quantile_type7: input must not be empty")]
    fn test_quantile_type7_empty_panics() {
        quantile_type7(&[], 0.5);
    }

    #[test]
    fn test_pearson_correlation_perfect() {
        let x = [1.0, 2.0, 3.0, 4.0, 5.0];
        let y = [2.0, 4.0, 6.0, 8.0, 10.0];
        let r = pearson_correlation(&x, &y, None);
        assert_relative_eq!(r.unwrap(), 1.0, epsilon = 1e-6);
    }

    #[test]
    fn test_pearson_correlation_insufficient() {
        let x = [1.0, 2.0];
        let y = [3.0, 4.0];
        assert!(pearson_correlation(&x, &y, None).is_none());
    }

    #[test]
    fn test_pearson_correlation_constant() {
        let x = [1.0, 1.0, 1.0, 1.0];
        let y = [3.0, 4.0, 5.0, 6.0];
        assert!(pearson_correlation(&x, &y, None).is_none());
    }

    #[test]
    fn test_pearson_correlation_with_nan() {
        let x = [1.0, f64::NAN, 3.0, 4.0, 5.0];
        let y = [2.0, 4.0, f64::NAN, 8.0, 10.0];
        // Finite pairs: (1,2), (4,8), (5,10): 3 pairs, perfect linear
        let r = pearson_correlation(&x, &y, None);
        assert_relative_eq!(r.unwrap(), 1.0, epsilon = 1e-6);
    }

    #[test]
    fn test_pearson_correlation_masked() {
        // The masked-out pair would break the linear relationship.
        let x = [1.0, 2.0, 3.0, 4.0, 5.0];
        let y = [-1.0, -2.0, 50.0, -4.0, -5.0];
        let mask = [true, true, false, true, true];
        let r = pearson_correlation(&x, &y, Some(&mask));
        assert_relative_eq!(r.unwrap(), -1.0, epsilon = 1e-12);
    }
}

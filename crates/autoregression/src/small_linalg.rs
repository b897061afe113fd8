//! Dense solver for the small Yule-Walker systems (order rarely exceeds 3).

/// Solves `a * x = b` by Gaussian elimination with partial pivoting.
///
/// `a` is row-major `n x n`. Returns `None` if the matrix is singular to
/// working precision.
pub(crate) fn solve(mut a: Vec<Vec<f64>>, mut b: Vec<f64>) -> Option<Vec<f64>> {
    let n = b.len();
    for col in 0..n {
        let pivot = (col..n).max_by(|&i, &j| a[i][col].abs().total_cmp(&a[j][col].abs()))?;
        if a[pivot][col].abs() < 1e-12 {
            return None;
        }
        a.swap(col, pivot);
        b.swap(col, pivot);

        for row in col + 1..n {
            let factor = a[row][col] / a[col][col];
            if factor == 0.0 {
                continue;
            }
            for k in col..n {
                a[row][k] -= factor * a[col][k];
            }
            b[row] -= factor * b[col];
        }
    }

    let mut x = vec![0.0; n];
    for row in (0..n).rev() {
        let tail: f64 = (row + 1..n).map(|k| a[row][k] * x[k]).sum();
        x[row] = (b[row] - tail) / a[row][row];
    }
    Some(x)
}

/// Position of an AR process relative to the stationarity region.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Stationarity {
    Stationary,
    /// A partial autocorrelation lies on the unit circle, e.g. `phi = [1]`
    /// from perfectly persistent input.
    UnitRoot,
    Explosive,
}

/// Slack for partial autocorrelations that reach the unit circle only
/// through rounding.
const UNIT_ROOT_TOL: f64 = 1e-9;

/// Reduces AR coefficients to partial autocorrelations (the inverse of the
/// Levinson-Durbin recursion) and classifies them against the unit circle.
pub(crate) fn stationarity(phi: &[f64]) -> Stationarity {
    let mut a = phi.to_vec();
    for k in (0..a.len()).rev() {
        let r = a[k];
        if !r.is_finite() || r.abs() > 1.0 + UNIT_ROOT_TOL {
            return Stationarity::Explosive;
        }
        if r.abs() >= 1.0 {
            return Stationarity::UnitRoot;
        }
        let denom = 1.0 - r * r;
        let prev: Vec<f64> = (0..k).map(|j| (a[j] + r * a[k - 1 - j]) / denom).collect();
        a.truncate(k);
        a.copy_from_slice(&prev);
    }
    Stationarity::Stationary
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn solves_two_by_two() {
        let a = vec![vec![2.0, 1.0], vec![1.0, 3.0]];
        let x = solve(a, vec![3.0, 5.0]).unwrap();
        assert_relative_eq!(x[0], 0.8, epsilon = 1e-12);
        assert_relative_eq!(x[1], 1.4, epsilon = 1e-12);
    }

    #[test]
    fn needs_pivoting() {
        let a = vec![vec![0.0, 1.0], vec![1.0, 0.0]];
        let x = solve(a, vec![2.0, 3.0]).unwrap();
        assert_eq!(x, vec![3.0, 2.0]);
    }

    #[test]
    fn singular_returns_none() {
        let a = vec![vec![1.0, 1.0], vec![1.0, 1.0]];
        assert!(solve(a, vec![1.0, 1.0]).is_none());
    }

    #[test]
    fn stationarity_order_one() {
        assert_eq!(stationarity(&[0.9]), Stationarity::Stationary);
        assert_eq!(stationarity(&[1.0]), Stationarity::UnitRoot);
        assert_eq!(stationarity(&[-1.0]), Stationarity::UnitRoot);
        assert_eq!(stationarity(&[1.0 + 1e-12]), Stationarity::UnitRoot);
        assert_eq!(stationarity(&[-1.2]), Stationarity::Explosive);
    }

    #[test]
    fn stationarity_order_two() {
        // Stationary triangle: |phi2| < 1, phi2 + phi1 < 1, phi2 - phi1 < 1.
        assert_eq!(stationarity(&[0.5, 0.3]), Stationarity::Stationary);
        assert_eq!(stationarity(&[1.6, -0.7]), Stationarity::Stationary);
        assert_eq!(stationarity(&[0.8, 0.3]), Stationarity::Explosive);
        assert_eq!(stationarity(&[0.1, -1.0]), Stationarity::UnitRoot);
    }

    #[test]
    fn nan_is_explosive() {
        assert_eq!(stationarity(&[f64::NAN, 0.1]), Stationarity::Explosive);
    }
}

//! Temporal autocorrelation of field sequences.

use ndarray::Array2;

use crate::error::AutoregressionError;

/// Lag-`l` temporal autocorrelation between the latest frame and each
/// earlier frame.
///
/// `frames` is ordered oldest first. Element `l - 1` of the result is the
/// Pearson correlation between the last frame and the frame `l` steps
/// before it, computed over the pixels where `mask` is set. A correlation
/// that cannot be computed (constant frames, fewer than three pixels) is
/// returned as NaN.
///
/// # Errors
///
/// Returns [`AutoregressionError::InsufficientFrames`] for fewer than two
/// frames, or [`AutoregressionError::ShapeMismatch`] if frames or mask
/// differ in shape.
pub fn temporal_autocorrelation(
    frames: &[Array2<f64>],
    mask: Option<&Array2<bool>>,
) -> Result<Vec<f64>, AutoregressionError> {
    let n = frames.len();
    if n < 2 {
        return Err(AutoregressionError::InsufficientFrames { n, min: 2 });
    }
    let expected = frames[0].dim();
    let mask_dim = mask.map(|m| m.dim());
    for got in frames.iter().map(|f| f.dim()).chain(mask_dim) {
        if got != expected {
            return Err(AutoregressionError::ShapeMismatch { expected, got });
        }
    }

    let keep: Option<Vec<bool>> = mask.map(|m| m.iter().copied().collect());
    let latest: Vec<f64> = frames[n - 1].iter().copied().collect();
    let gamma = (1..n)
        .map(|lag| {
            let earlier: Vec<f64> = frames[n - 1 - lag].iter().copied().collect();
            nimbus_stats::pearson_correlation(&latest, &earlier, keep.as_deref())
                .unwrap_or(f64::NAN)
        })
        .collect();
    Ok(gamma)
}

/// Adjusts the lag-2 autocorrelation so that the AR(2) process estimated
/// from `(gamma_1, gamma_2)` is stationary.
pub fn adjust_lag2_corrcoef(gamma_1: f64, gamma_2: f64) -> f64 {
    let g1_sq = gamma_1 * gamma_1;
    let gamma_2 = gamma_2.max(2.0 * g1_sq - 1.0);
    gamma_2.max((3.0 * g1_sq - 2.0 + 2.0 * (1.0 - g1_sq).powf(1.5)) / g1_sq)
}

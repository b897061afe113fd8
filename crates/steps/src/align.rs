//! Lagrangian alignment of the history frames.

use ndarray::{Array2, Array3, ArrayView2, Axis, Zip};
use nimbus_extrapolation::{Extrapolator, OutsideFill};
use rayon::ThreadPool;
use rayon::prelude::*;
use tracing::debug;

use crate::error::StepsError;

/// Advects every frame of `window` except the latest forward to the time of
/// the latest frame, then replaces the non-finite pixels of each frame by
/// that frame's own finite minimum.
///
/// `window` holds `p + 1` frames ordered oldest first; frame `i` is advected
/// by `p - i` time steps with pixels entering from outside the grid set to
/// the frame minimum. Frames are processed on `pool`.
///
/// # Errors
///
/// Returns [`StepsError::Extrapolation`] if advection fails, or
/// [`StepsError::EmptyFrame`] if a frame has no finite value left.
pub fn align_history(
    window: &Array3<f64>,
    motion: &Array3<f64>,
    extrapolator: &dyn Extrapolator,
    pool: &ThreadPool,
) -> Result<Vec<Array2<f64>>, StepsError> {
    let n = window.len_of(Axis(0));
    let p = n.saturating_sub(1);

    let mut frames: Vec<Array2<f64>> = pool.install(|| {
        (0..p)
            .into_par_iter()
            .map(|i| -> Result<Array2<f64>, StepsError> {
                let frame = window.index_axis(Axis(0), i).to_owned();
                let lead = (p - i) as f64;
                let (mut fields, _) = extrapolator
                    .extrapolate(Some(&frame), motion, &[lead], OutsideFill::Min, None)?
                    .into_parts();
                Ok(fields.pop().unwrap_or(frame))
            })
            .collect::<Result<Vec<_>, _>>()
    })?;
    if n > 0 {
        frames.push(window.index_axis(Axis(0), n - 1).to_owned());
    }

    for (index, frame) in frames.iter_mut().enumerate() {
        impute_frame_minimum(frame, index)?;
    }
    debug!(n_frames = frames.len(), "aligned history");
    Ok(frames)
}

/// Replaces non-finite pixels by the finite minimum of the same frame.
fn impute_frame_minimum(frame: &mut Array2<f64>, index: usize) -> Result<(), StepsError> {
    let values: Vec<f64> = frame.iter().copied().collect();
    let min = nimbus_stats::finite_min(&values).ok_or(StepsError::EmptyFrame { index })?;
    frame.mapv_inplace(|v| if v.is_finite() { v } else { min });
    Ok(())
}

/// Pixels at or above `threshold` in every frame of `window`.
///
/// Non-finite pixels never count as wet.
pub(crate) fn persistent_wet_mask(window: &Array3<f64>, threshold: f64) -> Array2<bool> {
    let (_, h, w) = window.dim();
    let mut mask = Array2::from_elem((h, w), true);
    for frame in window.axis_iter(Axis(0)) {
        Zip::from(&mut mask)
            .and(&frame)
            .for_each(|m, &v| *m &= v >= threshold);
    }
    mask
}

/// Fraction of pixels of `field` at or above `threshold`.
pub(crate) fn wet_area_ratio(field: ArrayView2<'_, f64>, threshold: f64) -> f64 {
    if field.is_empty() {
        return 0.0;
    }
    field.iter().filter(|&&v| v >= threshold).count() as f64 / field.len() as f64
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use nimbus_extrapolation::{SemiLagrangian, SemiLagrangianConfig};
    use rayon::ThreadPoolBuilder;

    fn pool(n: usize) -> ThreadPool {
        ThreadPoolBuilder::new().num_threads(n).build().unwrap()
    }

    fn eastward(h: usize, w: usize, u: f64) -> Array3<f64> {
        let mut m = Array3::zeros((2, h, w));
        m.index_axis_mut(Axis(0), 0).fill(u);
        m
    }

    fn moving_cell(n_frames: usize, h: usize, w: usize) -> Array3<f64> {
        Array3::from_shape_fn((n_frames, h, w), |(t, i, j)| {
            if i == 3 && j == 2 + t { 5.0 } else { 0.0 }
        })
    }

    #[test]
    fn frames_are_moved_onto_the_latest() {
        let window = moving_cell(3, 8, 10);
        let scheme = SemiLagrangian::new(SemiLagrangianConfig::new()).unwrap();
        let frames = align_history(&window, &eastward(8, 10, 1.0), &scheme, &pool(2)).unwrap();
        assert_eq!(frames.len(), 3);
        for f in &frames {
            assert_relative_eq!(f[[3, 4]], 5.0, epsilon = 1e-12);
        }
    }

    #[test]
    fn worker_count_does_not_change_result() {
        let window = moving_cell(4, 6, 12);
        let scheme = SemiLagrangian::new(SemiLagrangianConfig::new()).unwrap();
        let motion = eastward(6, 12, 1.0);
        let a = align_history(&window, &motion, &scheme, &pool(1)).unwrap();
        let b = align_history(&window, &motion, &scheme, &pool(3)).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn missing_pixels_take_frame_minimum() {
        let mut window = Array3::from_elem((2, 3, 3), 1.0);
        window[[1, 0, 0]] = f64::NAN;
        window[[1, 2, 2]] = 0.5;
        let scheme = SemiLagrangian::new(SemiLagrangianConfig::new()).unwrap();
        let frames = align_history(&window, &Array3::zeros((2, 3, 3)), &scheme, &pool(1)).unwrap();
        assert_eq!(frames[1][[0, 0]], 0.5);
        assert!(frames[0].iter().all(|&v| v == 1.0));
    }

    #[test]
    fn all_missing_frame_rejected() {
        let mut window = Array3::from_elem((2, 3, 3), 1.0);
        window.index_axis_mut(Axis(0), 1).fill(f64::NAN);
        let scheme = SemiLagrangian::new(SemiLagrangianConfig::new()).unwrap();
        let err = align_history(&window, &Array3::zeros((2, 3, 3)), &scheme, &pool(1)).unwrap_err();
        assert!(matches!(err, StepsError::EmptyFrame { index: 1 }));
    }

    #[test]
    fn wet_mask_requires_every_frame() {
        let mut window = Array3::from_elem((2, 2, 2), 1.0);
        window[[0, 0, 0]] = 0.0;
        window[[1, 1, 1]] = f64::NAN;
        let mask = persistent_wet_mask(&window, 0.5);
        assert!(!mask[[0, 0]] && !mask[[1, 1]]);
        assert!(mask[[0, 1]] && mask[[1, 0]]);
    }

    #[test]
    fn wet_area_ratio_counts_threshold_crossings() {
        let field = Array2::from_shape_vec((2, 2), vec![0.0, 0.1, 0.2, f64::NAN]).unwrap();
        assert_relative_eq!(wet_area_ratio(field.view(), 0.1), 0.5);
    }
}

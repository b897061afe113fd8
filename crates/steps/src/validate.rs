//! Input validation before any numerical work.

use ndarray::{Array2, Array3, Axis, Zip};

use crate::config::StepsConfig;
use crate::error::StepsError;
use crate::timesteps::{Schedule, Timesteps};

/// Checks the history, motion field, output times and options of a
/// forecast and returns the output schedule.
///
/// `history` has shape `(frames, rows, cols)` ordered oldest first and may
/// contain non-finite pixels; `motion` has shape `(2, rows, cols)` and must
/// be finite.
///
/// # Errors
///
/// | Variant | Trigger |
/// |---------|---------|
/// | [`StepsError::InsufficientHistory`] | fewer than `ar_order + 1` frames |
/// | [`StepsError::EmptyField`] | zero rows or columns |
/// | [`StepsError::MotionComponents`] | motion without exactly two components |
/// | [`StepsError::ShapeMismatch`] | motion and history grids differ |
/// | [`StepsError::NonFiniteMotion`] | NaN or infinity in the motion field |
/// | [`StepsError::InvalidTimesteps`] | empty, unsorted or non-positive times |
/// | others | see [`StepsConfig::validate`] |
pub fn validate_inputs(
    history: &Array3<f64>,
    motion: &Array3<f64>,
    timesteps: &Timesteps,
    config: &StepsConfig,
) -> Result<Schedule, StepsError> {
    config.validate()?;

    let (n, h, w) = history.dim();
    let min = config.ar_order() + 1;
    if n < min {
        return Err(StepsError::InsufficientHistory { n, min });
    }
    if h == 0 || w == 0 {
        return Err(StepsError::EmptyField { shape: (h, w) });
    }

    let (c, mh, mw) = motion.dim();
    if c != 2 {
        return Err(StepsError::MotionComponents { components: c });
    }
    if (mh, mw) != (h, w) {
        return Err(StepsError::ShapeMismatch {
            expected: (h, w),
            got: (mh, mw),
        });
    }
    let count = motion.iter().filter(|v| !v.is_finite()).count();
    if count > 0 {
        return Err(StepsError::NonFiniteMotion { count });
    }

    Schedule::new(timesteps)
}

/// Marks pixels that are non-finite in any frame of `history`.
pub(crate) fn domain_mask(history: &Array3<f64>) -> Array2<bool> {
    let (_, h, w) = history.dim();
    let mut mask = Array2::from_elem((h, w), false);
    for frame in history.axis_iter(Axis(0)) {
        Zip::from(&mut mask)
            .and(&frame)
            .for_each(|m, &v| *m |= !v.is_finite());
    }
    mask
}

//! The extrapolation interface shared by all advection schemes.

use std::fmt;

use ndarray::{Array2, Array3};

use crate::error::ExtrapolationError;

/// Value assigned to pixels whose trajectory leaves the grid.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub enum OutsideFill {
    /// Missing (`NaN`) (default).
    #[default]
    Nan,
    /// The finite minimum of the field being advected.
    Min,
    /// A fixed value.
    Value(f64),
}

impl OutsideFill {
    /// Resolves the fill value for `field`.
    pub fn resolve(&self, field: &Array2<f64>) -> f64 {
        match *self {
            Self::Nan => f64::NAN,
            Self::Min => field
                .iter()
                .copied()
                .filter(|v| v.is_finite())
                .min_by(|a, b| a.total_cmp(b))
                .unwrap_or(f64::NAN),
            Self::Value(v) => v,
        }
    }
}

/// Advection scheme selection.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum ExtrapolationMethod {
    /// Backward semi-Lagrangian advection (default).
    #[default]
    SemiLagrangian,
    /// Persistence: the field does not move.
    Eulerian,
}

/// Output of [`Extrapolator::extrapolate`].
#[derive(Debug, Clone)]
pub struct Extrapolation {
    fields: Vec<Array2<f64>>,
    displacement: Array3<f64>,
}

impl Extrapolation {
    pub(crate) fn new(fields: Vec<Array2<f64>>, displacement: Array3<f64>) -> Self {
        Self {
            fields,
            displacement,
        }
    }

    /// One advected field per requested lead time (empty when no input
    /// field was given).
    pub fn fields(&self) -> &[Array2<f64>] {
        &self.fields
    }

    /// Cumulative displacement `(2, rows, cols)` after the last lead time;
    /// component 0 is along columns (x), component 1 along rows (y).
    pub fn displacement(&self) -> &Array3<f64> {
        &self.displacement
    }

    /// Consumes the result, returning `(fields, displacement)`.
    pub fn into_parts(self) -> (Vec<Array2<f64>>, Array3<f64>) {
        (self.fields, self.displacement)
    }
}

/// An advection scheme.
///
/// `lead_times` are cumulative, relative to the state described by
/// `displacement_prev` (zero displacement when `None`), and must be finite,
/// non-negative and non-decreasing. The motion field is in pixels per unit
/// lead time with shape `(2, rows, cols)`.
pub trait Extrapolator: Send + Sync + fmt::Debug {
    /// Advects `field` (when given) to each lead time and returns the
    /// updated cumulative displacement.
    ///
    /// # Errors
    ///
    /// Returns an [`ExtrapolationError`] for inconsistent shapes, non-finite
    /// motion or invalid lead times.
    fn extrapolate(
        &self,
        field: Option<&Array2<f64>>,
        motion: &Array3<f64>,
        lead_times: &[f64],
        outside: OutsideFill,
        displacement_prev: Option<&Array3<f64>>,
    ) -> Result<Extrapolation, ExtrapolationError>;
}

/// Checks shapes, motion finiteness and lead times common to all schemes.
/// Returns the spatial shape.
pub(crate) fn check_inputs(
    field: Option<&Array2<f64>>,
    motion: &Array3<f64>,
    lead_times: &[f64],
    displacement_prev: Option<&Array3<f64>>,
) -> Result<(usize, usize), ExtrapolationError> {
    let (c, h, w) = motion.dim();
    if c != 2 || h == 0 || w == 0 {
        return Err(ExtrapolationError::InvalidMotionShape { shape: (c, h, w) });
    }
    if let Some(f) = field
        && f.dim() != (h, w)
    {
        return Err(ExtrapolationError::ShapeMismatch {
            expected: (h, w),
            got: f.dim(),
        });
    }
    if let Some(d) = displacement_prev
        && d.dim() != (2, h, w)
    {
        let (_, dh, dw) = d.dim();
        return Err(ExtrapolationError::ShapeMismatch {
            expected: (h, w),
            got: (dh, dw),
        });
    }
    let count = motion.iter().filter(|v| !v.is_finite()).count();
    if count > 0 {
        return Err(ExtrapolationError::NonFiniteMotion { count });
    }

    let mut prev = 0.0;
    for &t in lead_times {
        if !t.is_finite() || t < prev {
            return Err(ExtrapolationError::InvalidTimesteps {
                reason: format!(
                    "lead times must be finite, non-negative and non-decreasing, got {lead_times:?}"
                ),
            });
        }
        prev = t;
    }
    Ok((h, w))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn outside_fill_resolution() {
        let f = Array2::from_shape_vec((2, 2), vec![f64::NAN, 3.0, -1.0, 2.0]).unwrap();
        assert!(OutsideFill::Nan.resolve(&f).is_nan());
        assert_eq!(OutsideFill::Min.resolve(&f), -1.0);
        assert_eq!(OutsideFill::Value(7.5).resolve(&f), 7.5);
    }

    #[test]
    fn check_rejects_bad_motion_shape() {
        let motion = Array3::zeros((3, 4, 4));
        let err = check_inputs(None, &motion, &[1.0], None).unwrap_err();
        assert!(matches!(err, ExtrapolationError::InvalidMotionShape { .. }));
    }

    #[test]
    fn check_rejects_non_finite_motion() {
        let mut motion = Array3::zeros((2, 4, 4));
        motion[[1, 2, 2]] = f64::INFINITY;
        let err = check_inputs(None, &motion, &[1.0], None).unwrap_err();
        assert!(matches!(err, ExtrapolationError::NonFiniteMotion { count: 1 }));
    }

    #[test]
    fn check_rejects_decreasing_times() {
        let motion = Array3::zeros((2, 4, 4));
        let err = check_inputs(None, &motion, &[1.0, 0.5], None).unwrap_err();
        assert!(matches!(err, ExtrapolationError::InvalidTimesteps { .. }));
        let err = check_inputs(None, &motion, &[-1.0], None).unwrap_err();
        assert!(matches!(err, ExtrapolationError::InvalidTimesteps { .. }));
    }

    #[test]
    fn check_rejects_field_shape() {
        let motion = Array3::zeros((2, 4, 4));
        let field = Array2::zeros((4, 3));
        let err = check_inputs(Some(&field), &motion, &[1.0], None).unwrap_err();
        assert!(matches!(
            err,
            ExtrapolationError::ShapeMismatch { got: (4, 3), .. }
        ));
    }
}

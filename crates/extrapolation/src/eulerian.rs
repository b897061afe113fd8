//! Eulerian persistence.

use ndarray::{Array2, Array3};

use crate::error::ExtrapolationError;
use crate::extrapolator::{Extrapolation, Extrapolator, OutsideFill, check_inputs};

/// Persistence: every lead time is a copy of the input field and the
/// displacement never changes.
#[derive(Debug, Clone, Copy, Default)]
pub struct Eulerian;

impl Extrapolator for Eulerian {
    fn extrapolate(
        &self,
        field: Option<&Array2<f64>>,
        motion: &Array3<f64>,
        lead_times: &[f64],
        _outside: OutsideFill,
        displacement_prev: Option<&Array3<f64>>,
    ) -> Result<Extrapolation, ExtrapolationError> {
        let (h, w) = check_inputs(field, motion, lead_times, displacement_prev)?;
        let displacement = match displacement_prev {
            Some(d) => d.clone(),
            None => Array3::zeros((2, h, w)),
        };
        let fields = match field {
            Some(f) => vec![f.clone(); lead_times.len()],
            None => Vec::new(),
        };
        Ok(Extrapolation::new(fields, displacement))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn persistence_copies_field() {
        let field = Array2::from_shape_fn((3, 3), |(i, j)| (i + j) as f64);
        let mut motion = Array3::zeros((2, 3, 3));
        motion.fill(2.0);
        let out = Eulerian
            .extrapolate(Some(&field), &motion, &[1.0, 2.0, 3.0], OutsideFill::Nan, None)
            .unwrap();
        assert_eq!(out.fields().len(), 3);
        assert!(out.fields().iter().all(|f| *f == field));
        assert!(out.displacement().iter().all(|&d| d == 0.0));
    }

    #[test]
    fn still_validates_motion() {
        let mut motion = Array3::zeros((2, 3, 3));
        motion[[0, 0, 0]] = f64::NAN;
        assert!(Eulerian
            .extrapolate(None, &motion, &[1.0], OutsideFill::Nan, None)
            .is_err());
    }
}

//! Bilinear sampling of 2-D arrays at fractional coordinates.

use ndarray::Array2;

/// Samples `field` at `(y, x)` with the nearest edge value used outside the
/// grid.
pub(crate) fn sample_clamped(field: &Array2<f64>, y: f64, x: f64) -> f64 {
    let (h, w) = field.dim();
    let y = y.clamp(0.0, (h - 1) as f64);
    let x = x.clamp(0.0, (w - 1) as f64);
    bilinear(field, y, x)
}

/// Samples `field` at `(y, x)`, returning `None` outside the grid.
///
/// Only corners with positive weight contribute, so a non-finite neighbour
/// of an exact grid point does not leak into the sample. A non-finite corner
/// with positive weight yields a non-finite sample.
pub(crate) fn sample_inside(field: &Array2<f64>, y: f64, x: f64) -> Option<f64> {
    let (h, w) = field.dim();
    if !(y >= 0.0 && x >= 0.0 && y <= (h - 1) as f64 && x <= (w - 1) as f64) {
        return None;
    }
    Some(bilinear(field, y, x))
}

fn bilinear(field: &Array2<f64>, y: f64, x: f64) -> f64 {
    let (h, w) = field.dim();
    let y0 = (y.floor() as usize).min(h - 1);
    let x0 = (x.floor() as usize).min(w - 1);
    let fy = y - y0 as f64;
    let fx = x - x0 as f64;

    let corners = [
        (y0, x0, (1.0 - fy) * (1.0 - fx)),
        (y0, x0 + 1, (1.0 - fy) * fx),
        (y0 + 1, x0, fy * (1.0 - fx)),
        (y0 + 1, x0 + 1, fy * fx),
    ];
    corners
        .iter()
        .filter(|&&(_, _, wgt)| wgt > 0.0)
        .map(|&(i, j, wgt)| field[[i.min(h - 1), j.min(w - 1)]] * wgt)
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn grid() -> Array2<f64> {
        Array2::from_shape_fn((3, 4), |(i, j)| (10 * i + j) as f64)
    }

    #[test]
    fn exact_grid_points() {
        let f = grid();
        assert_eq!(sample_inside(&f, 2.0, 3.0), Some(23.0));
        assert_eq!(sample_inside(&f, 0.0, 0.0), Some(0.0));
    }

    #[test]
    fn linear_between_points() {
        let f = grid();
        assert_relative_eq!(sample_inside(&f, 0.5, 1.5).unwrap(), 6.5, epsilon = 1e-12);
    }

    #[test]
    fn outside_is_none() {
        let f = grid();
        assert_eq!(sample_inside(&f, -0.1, 1.0), None);
        assert_eq!(sample_inside(&f, 1.0, 3.01), None);
        assert_eq!(sample_inside(&f, f64::NAN, 1.0), None);
    }

    #[test]
    fn clamped_uses_edges() {
        let f = grid();
        assert_relative_eq!(sample_clamped(&f, -5.0, 1.0), 1.0);
        assert_relative_eq!(sample_clamped(&f, 10.0, 10.0), 23.0);
    }

    #[test]
    fn nan_neighbour_ignored_at_zero_weight() {
        let mut f = grid();
        f[[1, 2]] = f64::NAN;
        assert_eq!(sample_inside(&f, 1.0, 1.0), Some(11.0));
        assert!(sample_inside(&f, 1.0, 1.5).unwrap().is_nan());
    }
}

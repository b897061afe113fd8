//! Precipitation masks that keep the forecast from raining where the
//! observation is dry.

use ndarray::{Array2, ArrayView2, Zip};
use tracing::debug;

use crate::config::{MaskConfig, MaskMethod};

/// Radius of the diamond structuring element used to buffer incremental
/// masks.
///
/// The element spans `mask_f * timestep / kmperpixel` pixels; the radius is
/// half of that minus one, truncated, and at least 1.
pub fn structure_radius(mask_f: f64, timestep: f64, kmperpixel: f64) -> usize {
    let n = mask_f * timestep / kmperpixel;
    let r = ((n - 1.0) / 2.0).trunc();
    if r >= 1.0 { r as usize } else { 1 }
}

/// L1 (city-block) distance of every pixel to the nearest set pixel.
///
/// Pixels with no set pixel in the grid get `usize::MAX`.
fn city_block_distance(set: ArrayView2<'_, bool>) -> Array2<usize> {
    let (h, w) = set.dim();
    let mut d = set.mapv(|s| if s { 0 } else { usize::MAX });
    for i in 0..h {
        for j in 0..w {
            let mut v = d[[i, j]];
            if i > 0 {
                v = v.min(d[[i - 1, j]].saturating_add(1));
            }
            if j > 0 {
                v = v.min(d[[i, j - 1]].saturating_add(1));
            }
            d[[i, j]] = v;
        }
    }
    for i in (0..h).rev() {
        for j in (0..w).rev() {
            let mut v = d[[i, j]];
            if i + 1 < h {
                v = v.min(d[[i + 1, j]].saturating_add(1));
            }
            if j + 1 < w {
                v = v.min(d[[i, j + 1]].saturating_add(1));
            }
            d[[i, j]] = v;
        }
    }
    d
}

/// Buffers the binary mask `wet` by a diamond of `radius` pixels and adds a
/// soft rim of `rim` further one-pixel dilations.
///
/// The result is the sum of the buffered mask and its `rim` successive
/// dilations, normalized to a maximum of 1. An empty `wet` gives zeros.
pub fn incremental_mask(wet: ArrayView2<'_, bool>, radius: usize, rim: usize) -> Array2<f64> {
    let distance = city_block_distance(wet);
    let top = (rim + 1) as f64;
    let mut mask = distance.mapv(|d| {
        if d == usize::MAX {
            0.0
        } else {
            let beyond = d.saturating_sub(radius);
            (rim + 1).saturating_sub(beyond) as f64
        }
    });
    if mask.iter().any(|&v| v > 0.0) {
        mask.mapv_inplace(|v| v / top);
    }
    mask
}

/// Pixels of `field` at or above the value that leaves a fraction `war` of
/// the pixels wet.
///
/// The threshold is the sorted value whose exceedance fraction is closest
/// to `war`. When that value is tied with the next one, the threshold moves
/// past the tied run (if a larger value exists) so that a flat background
/// is not counted as wet.
pub fn percentile_mask(field: &Array2<f64>, war: f64) -> Array2<bool> {
    let values: Vec<f64> = field.iter().copied().collect();
    let sorted = nimbus_stats::sorted_finite(&values);
    let n = sorted.len();
    if n == 0 {
        return Array2::from_elem(field.dim(), false);
    }

    let exceedance = |i: usize| (n - i) as f64 / n as f64;
    let mut idx = 0;
    let mut best = f64::INFINITY;
    for i in 0..n {
        let diff = (exceedance(i) - war).abs();
        if diff < best {
            best = diff;
            idx = i;
        }
    }
    if idx + 1 < n && sorted[idx] == sorted[idx + 1] {
        let last = sorted.iter().rposition(|&v| v == sorted[idx]).unwrap_or(idx);
        idx = if last + 1 < n { last + 1 } else { last };
    }
    let thr = sorted[idx];
    field.mapv(|v| v >= thr)
}

/// The active masking strategy with its shared state.
#[derive(Debug, Clone)]
pub(crate) struct MaskEngine {
    method: MaskMethod,
    threshold: f64,
    /// Wet-area ratio of the latest observation.
    war: f64,
    radius: usize,
    rim: usize,
    /// Mask shared by all members (obs and sprog).
    shared: Array2<bool>,
}

impl MaskEngine {
    /// Initializes the strategy from the latest observation. `radius` is
    /// the buffer of the incremental strategy (see [`structure_radius`]).
    pub(crate) fn new(
        method: MaskMethod,
        config: &MaskConfig,
        latest: &Array2<f64>,
        threshold: f64,
        radius: usize,
    ) -> Self {
        let shared = latest.mapv(|v| v >= threshold);
        let war = crate::align::wet_area_ratio(latest.view(), threshold);
        debug!(?method, war, radius, rim = config.mask_rim(), "initialized mask");
        Self {
            method,
            threshold,
            war,
            radius,
            rim: config.mask_rim(),
            shared,
        }
    }

    /// Initial per-member mask (incremental strategy only).
    pub(crate) fn initial_member_mask(&self) -> Option<Array2<f64>> {
        match self.method {
            MaskMethod::Incremental => {
                Some(incremental_mask(self.shared.view(), self.radius, self.rim))
            }
            _ => None,
        }
    }

    /// Recomputes the shared mask from the unperturbed forecast (sprog
    /// strategy only).
    pub(crate) fn update_from_companion(&mut self, companion: &Array2<f64>) {
        if self.method == MaskMethod::Sprog {
            self.shared = percentile_mask(companion, self.war);
        }
    }

    /// Sets the masked-out pixels of `field` to its minimum.
    ///
    /// The incremental strategy blends towards the minimum with the weights
    /// of `member_mask`.
    pub(crate) fn apply(&self, field: &mut Array2<f64>, member_mask: Option<&Array2<f64>>) {
        let values: Vec<f64> = field.iter().copied().collect();
        let Some(r_min) = nimbus_stats::finite_min(&values) else {
            return;
        };
        match (self.method, member_mask) {
            (MaskMethod::Incremental, Some(weights)) => {
                Zip::from(field)
                    .and(weights)
                    .for_each(|v, &m| *v = r_min + (*v - r_min) * m);
            }
            (MaskMethod::Incremental, None) => {}
            (MaskMethod::Obs | MaskMethod::Sprog, _) => {
                Zip::from(field).and(&self.shared).for_each(|v, &keep| {
                    if !keep {
                        *v = r_min;
                    }
                });
            }
        }
    }

    /// Mask for the next step of a member, derived from its current
    /// forecast (incremental strategy only).
    pub(crate) fn next_member_mask(&self, field: &Array2<f64>) -> Option<Array2<f64>> {
        match self.method {
            MaskMethod::Incremental => {
                let wet = field.mapv(|v| v >= self.threshold);
                Some(incremental_mask(wet.view(), self.radius, self.rim))
            }
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn structure_radius_follows_growth_rate() {
        assert_eq!(structure_radius(1.0, 5.0, 1.0), 2);
        assert_eq!(structure_radius(1.0, 10.0, 1.0), 4);
        assert_eq!(structure_radius(1.0, 5.0, 2.0), 1);
        assert_eq!(structure_radius(0.0, 5.0, 1.0), 1);
    }

    #[test]
    fn distance_is_city_block() {
        let mut set = Array2::from_elem((5, 5), false);
        set[[2, 2]] = true;
        let d = city_block_distance(set.view());
        assert_eq!(d[[2, 2]], 0);
        assert_eq!(d[[0, 0]], 4);
        assert_eq!(d[[2, 4]], 2);
        assert_eq!(d[[1, 3]], 2);
    }

    #[test]
    fn incremental_mask_has_buffer_and_rim() {
        let mut wet = Array2::from_elem((1, 12), false);
        wet[[0, 0]] = true;
        let m = incremental_mask(wet.view(), 2, 3);
        // Buffer covers distances 0..=2, the rim decays over 3 pixels.
        assert_relative_eq!(m[[0, 0]], 1.0);
        assert_relative_eq!(m[[0, 2]], 1.0);
        assert_relative_eq!(m[[0, 3]], 0.75);
        assert_relative_eq!(m[[0, 4]], 0.5);
        assert_relative_eq!(m[[0, 5]], 0.25);
        assert_relative_eq!(m[[0, 6]], 0.0);
    }

    #[test]
    fn empty_incremental_mask_is_zero() {
        let wet = Array2::from_elem((4, 4), false);
        assert!(incremental_mask(wet.view(), 1, 5).iter().all(|&v| v == 0.0));
    }

    #[test]
    fn percentile_mask_preserves_wet_fraction() {
        let field = Array2::from_shape_fn((10, 10), |(i, j)| (i * 10 + j) as f64);
        let mask = percentile_mask(&field, 0.3);
        assert_eq!(mask.iter().filter(|&&m| m).count(), 30);
        assert!(mask[[9, 9]] && !mask[[0, 0]]);
    }

    #[test]
    fn percentile_mask_skips_flat_background() {
        let mut field = Array2::zeros((4, 4));
        field[[0, 0]] = 3.0;
        field[[1, 1]] = 2.0;
        // Closest exceedance to 0.5 falls inside the run of zeros.
        let mask = percentile_mask(&field, 0.5);
        assert_eq!(mask.iter().filter(|&&m| m).count(), 2);
    }

    #[test]
    fn obs_mask_clamps_to_minimum() {
        let latest = Array2::from_shape_vec((1, 4), vec![0.0, 1.0, 1.0, 0.0]).unwrap();
        let engine = MaskEngine::new(MaskMethod::Obs, &MaskConfig::new(), &latest, 0.5, 2);
        let mut field = Array2::from_shape_vec((1, 4), vec![2.0, 3.0, -1.0, 4.0]).unwrap();
        engine.apply(&mut field, None);
        assert_eq!(field.as_slice().unwrap(), &[-1.0, 3.0, -1.0, -1.0]);
    }

    #[test]
    fn incremental_mask_blends_towards_minimum() {
        let latest = Array2::zeros((1, 3));
        let engine =
            MaskEngine::new(MaskMethod::Incremental, &MaskConfig::new(), &latest, 0.5, 2);
        let weights = Array2::from_shape_vec((1, 3), vec![1.0, 0.5, 0.0]).unwrap();
        let mut field = Array2::from_shape_vec((1, 3), vec![4.0, 4.0, 4.0]).unwrap();
        field[[0, 2]] = 2.0;
        engine.apply(&mut field, Some(&weights));
        assert_eq!(field.as_slice().unwrap(), &[4.0, 3.0, 2.0]);
    }

    #[test]
    fn sprog_mask_follows_companion() {
        let latest = Array2::from_shape_vec((1, 4), vec![1.0, 1.0, 0.0, 0.0]).unwrap();
        let mut engine =
            MaskEngine::new(MaskMethod::Sprog, &MaskConfig::new(), &latest, 0.5, 2);
        let companion = Array2::from_shape_vec((1, 4), vec![0.1, 0.2, 0.9, 0.8]).unwrap();
        engine.update_from_companion(&companion);
        let mut field = Array2::from_elem((1, 4), 5.0);
        field[[0, 0]] = 0.0;
        engine.apply(&mut field, None);
        assert_eq!(field.as_slice().unwrap(), &[0.0, 0.0, 5.0, 5.0]);
    }

    #[test]
    fn only_incremental_keeps_member_masks() {
        let latest = Array2::from_elem((2, 2), 1.0);
        let obs = MaskEngine::new(MaskMethod::Obs, &MaskConfig::new(), &latest, 0.5, 2);
        assert!(obs.initial_member_mask().is_none());
        assert!(obs.next_member_mask(&latest).is_none());
        let inc =
            MaskEngine::new(MaskMethod::Incremental, &MaskConfig::new(), &latest, 0.5, 2);
        assert!(inc.initial_member_mask().is_some());
    }
}

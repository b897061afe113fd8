//! Output types of the ensemble nowcast.

use std::time::Duration;

use ndarray::{Array2, Array4, ArrayView3, Axis};

/// Wall-clock time spent in the two phases of a forecast.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NowcastTiming {
    init: Duration,
    main_loop: Duration,
}

impl NowcastTiming {
    pub(crate) fn new(init: Duration, main_loop: Duration) -> Self {
        Self { init, main_loop }
    }

    /// Returns the time spent before the first step.
    pub fn init(&self) -> Duration {
        self.init
    }

    /// Returns the time spent in the step loop.
    pub fn main_loop(&self) -> Duration {
        self.main_loop
    }
}

/// Result of an ensemble nowcast.
#[derive(Debug, Clone)]
pub struct Nowcast {
    ensemble: Option<Array4<f64>>,
    lead_times: Vec<f64>,
    timing: Option<NowcastTiming>,
}

impl Nowcast {
    pub(crate) fn new(
        ensemble: Option<Array4<f64>>,
        lead_times: Vec<f64>,
        timing: Option<NowcastTiming>,
    ) -> Self {
        Self {
            ensemble,
            lead_times,
            timing,
        }
    }

    /// Returns the forecast with shape `(members, lead times, rows, cols)`,
    /// or `None` when output collection was disabled.
    pub fn ensemble(&self) -> Option<&Array4<f64>> {
        self.ensemble.as_ref()
    }

    /// Consumes the result and returns the forecast array.
    pub fn into_ensemble(self) -> Option<Array4<f64>> {
        self.ensemble
    }

    /// Returns the output times in units of the time step.
    pub fn lead_times(&self) -> &[f64] {
        &self.lead_times
    }

    /// Returns the phase timings when timing was requested.
    pub fn timing(&self) -> Option<NowcastTiming> {
        self.timing
    }
}

/// Fields produced by one simulation step, passed to the step callback.
#[derive(Debug, Clone)]
pub struct StepFields {
    step: usize,
    lead_times: Vec<f64>,
    /// `(members, outputs, rows, cols)`.
    fields: Array4<f64>,
}

impl StepFields {
    pub(crate) fn new(step: usize, lead_times: Vec<f64>, fields: Array4<f64>) -> Self {
        Self {
            step,
            lead_times,
            fields,
        }
    }

    /// Returns the simulation step (1-based).
    pub fn step(&self) -> usize {
        self.step
    }

    /// Returns the output times emitted by this step.
    pub fn lead_times(&self) -> &[f64] {
        &self.lead_times
    }

    /// Returns the fields with shape `(members, outputs, rows, cols)`.
    pub fn fields(&self) -> &Array4<f64> {
        &self.fields
    }

    /// Returns the ensemble at the `k`-th output time of this step with
    /// shape `(members, rows, cols)`.
    ///
    /// # Panics
    ///
    /// Panics if `k` is not smaller than the number of output times.
    pub fn field(&self, k: usize) -> ArrayView3<'_, f64> {
        self.fields.index_axis(Axis(1), k)
    }
}

/// Stacks per-member output lists into `(members, outputs, rows, cols)`.
pub(crate) fn stack_members(members: &[Vec<Array2<f64>>], shape: (usize, usize)) -> Array4<f64> {
    let n_out = members.first().map_or(0, Vec::len);
    let mut out = Array4::zeros((members.len(), n_out, shape.0, shape.1));
    for (j, fields) in members.iter().enumerate() {
        for (k, field) in fields.iter().enumerate() {
            out.index_axis_mut(Axis(0), j)
                .index_axis_mut(Axis(0), k)
                .assign(field);
        }
    }
    out
}

/// Appends the outputs of one step to the per-member collections.
pub(crate) fn collect_step(store: &mut [Vec<Array2<f64>>], step_outputs: Vec<Vec<Array2<f64>>>) {
    for (member, outputs) in store.iter_mut().zip(step_outputs) {
        member.extend(outputs);
    }
}

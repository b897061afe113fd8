//! Mapping of requested output times onto simulation steps.

use crate::error::StepsError;

/// Upper bound on the number of simulation steps.
pub const MAX_STEPS: usize = 100_000;

/// Requested output times, in units of the time step.
#[derive(Debug, Clone, PartialEq)]
pub enum Timesteps {
    /// Outputs at `1, 2, ..., n`.
    Count(usize),
    /// Outputs at the given strictly ascending positive times, which may be
    /// fractional.
    List(Vec<f64>),
}

/// Output times binned by simulation step.
///
/// Step `s` (`1..=n_steps`) evolves the field from time `s - 1` to `s` and
/// emits every requested time in `(s - 1, s]`. Step 0 is the analysis time
/// and never produces output.
#[derive(Debug, Clone)]
pub struct Schedule {
    /// `bins[s - 1]` holds the output times of step `s`.
    bins: Vec<Vec<f64>>,
}

impl Schedule {
    /// Bins `timesteps` into simulation steps.
    ///
    /// # Errors
    ///
    /// Returns [`StepsError::InvalidTimesteps`] for a zero count, an empty
    /// list, a list that is not finite, positive and strictly ascending, or
    /// a schedule longer than [`MAX_STEPS`] steps.
    pub fn new(timesteps: &Timesteps) -> Result<Self, StepsError> {
        match timesteps {
            Timesteps::Count(0) => Err(StepsError::InvalidTimesteps {
                reason: "at least one output time is required".to_string(),
            }),
            Timesteps::Count(n) if *n > MAX_STEPS => Err(StepsError::InvalidTimesteps {
                reason: format!("{n} steps exceed the limit of {MAX_STEPS}"),
            }),
            Timesteps::Count(n) => Ok(Self {
                bins: (1..=*n).map(|s| vec![s as f64]).collect(),
            }),
            Timesteps::List(times) => {
                let Some(&last) = times.last() else {
                    return Err(StepsError::InvalidTimesteps {
                        reason: "at least one output time is required".to_string(),
                    });
                };
                let mut prev = 0.0;
                for &t in times {
                    if !t.is_finite() || t <= prev {
                        return Err(StepsError::InvalidTimesteps {
                            reason: format!(
                                "times must be finite, positive and strictly ascending, got {times:?}"
                            ),
                        });
                    }
                    prev = t;
                }
                if last.ceil() > MAX_STEPS as f64 {
                    return Err(StepsError::InvalidTimesteps {
                        reason: format!("last time {last} exceeds the limit of {MAX_STEPS} steps"),
                    });
                }
                let n_steps = last.ceil() as usize;
                let mut bins = vec![Vec::new(); n_steps];
                for &t in times {
                    bins[t.ceil() as usize - 1].push(t);
                }
                Ok(Self { bins })
            }
        }
    }

    /// Returns the number of simulation steps.
    pub fn n_steps(&self) -> usize {
        self.bins.len()
    }

    /// Returns the output times emitted by step `step` (`1..=n_steps`).
    ///
    /// # Panics
    ///
    /// Panics if `step` is 0 or greater than [`Schedule::n_steps`].
    pub fn subtimes(&self, step: usize) -> &[f64] {
        &self.bins[step - 1]
    }

    /// Returns all output times in order.
    pub fn lead_times(&self) -> Vec<f64> {
        self.bins.iter().flatten().copied().collect()
    }

    /// Returns the number of output times.
    pub fn n_outputs(&self) -> usize {
        self.bins.iter().map(Vec::len).sum()
    }
}

/// Weight of the field at the end of step `step` in the output at time `t`.
///
/// The output is `(1 - w) * previous + w * current`; `w = 1` at the step
/// boundary.
pub(crate) fn blend_weight(step: usize, t: f64) -> f64 {
    t - (step - 1) as f64
}

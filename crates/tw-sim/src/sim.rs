//! Simulation runner: drives a graph model through fixed time steps.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use chrono::{Duration, NaiveDateTime};
use tw_core::{Tolerances, ceil_within};
use tw_graph::{Model, SimPeriod, StepContext};

use crate::error::{SimError, SimResult};
use crate::history::History;

/// Lifecycle of a `Simulator`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SimState {
    #[default]
    Idle,
    Running,
    Done,
    Failed,
    Cancelled,
}

/// Options for simulation runs.
#[derive(Debug, Clone)]
pub struct SimOptions {
    /// Maximum number of steps (safety limit)
    pub max_steps: usize,
}

impl Default for SimOptions {
    fn default() -> Self {
        Self {
            max_steps: 10_000_000,
        }
    }
}

impl SimOptions {
    pub fn max_steps(mut self, max_steps: usize) -> Self {
        self.max_steps = max_steps;
        self
    }
}

/// Progress report emitted after every completed step.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SimProgress {
    /// Number of completed steps.
    pub step: usize,
    pub total_steps: usize,
    /// Simulated time of the completed step (seconds since start).
    pub time_s: f64,
}

impl SimProgress {
    pub fn fraction_complete(&self) -> f64 {
        if self.total_steps == 0 {
            1.0
        } else {
            self.step as f64 / self.total_steps as f64
        }
    }
}

/// Shared flag for stopping a run between steps.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    pub fn reset(&self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

/// Number of steps `k` with `k * step_size_s < duration_s`.
fn step_count(duration_s: f64, step_size_s: f64) -> usize {
    ceil_within(duration_s / step_size_s, Tolerances::default()) as usize
}

fn offset(start: NaiveDateTime, seconds: f64) -> NaiveDateTime {
    start + Duration::nanoseconds((seconds * 1e9).round() as i64)
}

/// Time-stepping driver.
///
/// The model's topology must not change while a run is in progress; the simulator
/// holds `&mut Model` for the whole run.
#[derive(Debug, Default)]
pub struct Simulator {
    state: SimState,
    options: SimOptions,
    cancel: CancelToken,
    history: Option<History>,
}

impl Simulator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_options(options: SimOptions) -> Self {
        Self {
            options,
            ..Self::default()
        }
    }

    /// Share an externally created cancellation flag.
    pub fn with_cancel_token(mut self, token: CancelToken) -> Self {
        self.cancel = token;
        self
    }

    pub fn state(&self) -> SimState {
        self.state
    }

    pub fn options(&self) -> &SimOptions {
        &self.options
    }

    /// A handle that stops the current or next run between steps once cancelled.
    ///
    /// A run that stops on cancellation clears the flag, so the following run starts fresh.
    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    /// History of the last run. Partial after a step failure, absent after cancellation.
    pub fn history(&self) -> Option<&History> {
        self.history.as_ref()
    }

    pub fn take_history(&mut self) -> Option<History> {
        self.history.take()
    }

    /// Run `model` from `start` while `time < end`, in steps of `step_size_s` seconds.
    pub fn simulate(
        &mut self,
        model: &mut Model,
        step_size_s: f64,
        start: NaiveDateTime,
        end: NaiveDateTime,
    ) -> SimResult<&History> {
        self.simulate_with_progress(model, step_size_s, start, end, None)
    }

    /// Like `simulate`, reporting progress after every step.
    pub fn simulate_with_progress(
        &mut self,
        model: &mut Model,
        step_size_s: f64,
        start: NaiveDateTime,
        end: NaiveDateTime,
        mut progress_cb: Option<&mut dyn FnMut(SimProgress)>,
    ) -> SimResult<&History> {
        self.history = None;
        match self.run(model, step_size_s, start, end, &mut progress_cb) {
            Ok(()) => {
                self.state = SimState::Done;
                self.history.as_ref().ok_or(SimError::InvalidArg {
                    what: "run finished without history",
                })
            }
            Err(err) => {
                self.state = match err {
                    SimError::Cancelled { .. } => {
                        self.history = None;
                        self.cancel.reset();
                        SimState::Cancelled
                    }
                    _ => SimState::Failed,
                };
                tracing::warn!(model = model.id(), error = %err, "simulation stopped");
                Err(err)
            }
        }
    }

    fn run(
        &mut self,
        model: &mut Model,
        step_size_s: f64,
        start: NaiveDateTime,
        end: NaiveDateTime,
        progress_cb: &mut Option<&mut dyn FnMut(SimProgress)>,
    ) -> SimResult<()> {
        if !step_size_s.is_finite() || step_size_s <= 0.0 {
            return Err(SimError::InvalidArg {
                what: "step size must be positive and finite",
            });
        }
        if end <= start {
            return Err(SimError::InvalidArg {
                what: "end time must be after start time",
            });
        }
        let duration_s = (end - start)
            .to_std()
            .map_err(|_| SimError::InvalidArg {
                what: "end time must be after start time",
            })?
            .as_secs_f64();
        let total_steps = step_count(duration_s, step_size_s);
        if total_steps > self.options.max_steps {
            return Err(SimError::TooManySteps {
                steps: total_steps,
                max_steps: self.options.max_steps,
            });
        }

        let order = model.compute_execution_order()?.clone();
        self.state = SimState::Running;
        tracing::info!(
            model = model.id(),
            components = order.len(),
            steps = total_steps,
            step_size_s,
            "simulation started"
        );

        let period = SimPeriod {
            start,
            end,
            step_size_s,
        };
        let mut history = History::with_capacity(total_steps);
        for &pos in order.positions() {
            let Some(comp) = model.component_at_mut(pos) else {
                continue;
            };
            comp.initialize(&period).map_err(|source| SimError::Initialize {
                component: comp.id().clone(),
                source,
            })?;
            if comp.save_history() {
                history.track(comp.id(), comp.input(), comp.output());
            }
        }
        self.history = Some(history);

        for step in 0..total_steps {
            if self.cancel.is_cancelled() {
                tracing::info!(model = model.id(), step, "simulation cancelled");
                return Err(SimError::Cancelled { step });
            }

            let second_time = step as f64 * step_size_s;
            let ctx = StepContext {
                step,
                second_time,
                date_time: offset(start, second_time),
                step_size_s,
            };
            let history = self.history.get_or_insert_with(History::default);
            history.push_time(second_time, ctx.date_time);

            for &pos in order.positions() {
                let stepped = model
                    .resolve_inputs(pos, order.bindings(pos))
                    .and_then(|()| match model.component_at_mut(pos) {
                        Some(comp) => comp.do_step(&ctx),
                        None => Ok(()),
                    });
                let Some(comp) = model.component_at(pos) else {
                    continue;
                };
                if let Err(source) = stepped {
                    history.time_s.pop();
                    history.date_time.pop();
                    history.align();
                    return Err(SimError::Step {
                        component: comp.id().clone(),
                        time_s: second_time,
                        source,
                    });
                }
                if comp.save_history() {
                    history.push(comp.id(), comp.input(), comp.output());
                }
            }

            if let Some(cb) = progress_cb.as_deref_mut() {
                cb(SimProgress {
                    step: step + 1,
                    total_steps,
                    time_s: second_time,
                });
            }
        }

        tracing::info!(model = model.id(), steps = total_steps, "simulation finished");
        Ok(())
    }
}

/// Run `model` once with default options.
pub fn simulate(
    model: &mut Model,
    step_size_s: f64,
    start: NaiveDateTime,
    end: NaiveDateTime,
) -> SimResult<History> {
    let mut sim = Simulator::new();
    sim.simulate(model, step_size_s, start, end)?;
    sim.take_history().ok_or(SimError::InvalidArg {
        what: "run finished without history",
    })
}

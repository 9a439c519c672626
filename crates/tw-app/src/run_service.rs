//! Compile and simulate a project in one call.

use std::time::Instant;

use chrono::NaiveDateTime;
use tw_project::Project;
use tw_semantic::MatchReport;
use tw_sim::{CancelToken, History, SimOptions, Simulator};

use crate::error::{AppError, AppResult};
use crate::progress::{RunProgressEvent, RunStage};
use crate::project_service::compile_model;

/// Values overriding the project's `simulation` section.
#[derive(Debug, Clone, Default)]
pub struct RunOverrides {
    pub step_size_s: Option<f64>,
    pub start: Option<NaiveDateTime>,
    pub end: Option<NaiveDateTime>,
    pub max_steps: Option<usize>,
}

/// Timing summary for a completed run.
#[derive(Debug, Clone, Default)]
pub struct RunTimingSummary {
    pub compile_time_s: f64,
    pub simulate_time_s: f64,
    pub total_time_s: f64,
    pub steps: usize,
}

/// Response from a run execution.
#[derive(Debug, Clone)]
pub struct RunResponse {
    pub model_id: String,
    /// Component ids in execution order.
    pub order: Vec<String>,
    pub report: Option<MatchReport>,
    pub history: History,
    pub timing: RunTimingSummary,
}

fn emit_progress(
    progress_cb: &mut Option<&mut dyn FnMut(RunProgressEvent)>,
    stage: RunStage,
    started: Instant,
    message: Option<String>,
) {
    if let Some(cb) = progress_cb.as_deref_mut() {
        cb(RunProgressEvent::stage(
            stage,
            started.elapsed().as_secs_f64(),
            message,
        ));
    }
}

pub fn run(project: &Project, overrides: &RunOverrides) -> AppResult<RunResponse> {
    run_with_progress(project, overrides, None, None)
}

/// Compile and simulate `project`, streaming progress events. The run stops between
/// steps once `cancel` is cancelled.
pub fn run_with_progress(
    project: &Project,
    overrides: &RunOverrides,
    mut progress_cb: Option<&mut dyn FnMut(RunProgressEvent)>,
    cancel: Option<CancelToken>,
) -> AppResult<RunResponse> {
    let started = Instant::now();
    let sim_def = project.simulation.as_ref();
    let step_size_s = overrides
        .step_size_s
        .or(sim_def.map(|s| s.step_size_s))
        .ok_or_else(|| AppError::InvalidInput("no step size given".to_string()))?;
    let start = overrides
        .start
        .or(sim_def.map(|s| s.start))
        .ok_or_else(|| AppError::InvalidInput("no start time given".to_string()))?;
    let end = overrides
        .end
        .or(sim_def.map(|s| s.end))
        .ok_or_else(|| AppError::InvalidInput("no end time given".to_string()))?;

    emit_progress(&mut progress_cb, RunStage::CompilingModel, started, None);
    let mut compiled = compile_model(project)?;
    let compile_time_s = started.elapsed().as_secs_f64();

    emit_progress(&mut progress_cb, RunStage::ComputingOrder, started, None);
    let order: Vec<String> = compiled
        .model
        .compute_execution_order()?
        .ids()
        .iter()
        .map(|id| id.to_string())
        .collect();

    emit_progress(
        &mut progress_cb,
        RunStage::Simulating,
        started,
        Some(format!("{} components", order.len())),
    );
    let mut options = SimOptions::default();
    if let Some(max_steps) = overrides.max_steps {
        options = options.max_steps(max_steps);
    }
    let mut sim = Simulator::with_options(options);
    if let Some(token) = cancel {
        sim = sim.with_cancel_token(token);
    }

    let sim_started = Instant::now();
    let mut forward = |p: tw_sim::SimProgress| {
        if let Some(cb) = progress_cb.as_deref_mut() {
            cb(RunProgressEvent {
                stage: RunStage::Simulating,
                elapsed_wall_s: started.elapsed().as_secs_f64(),
                message: None,
                sim: Some(p),
            });
        }
    };
    sim.simulate_with_progress(&mut compiled.model, step_size_s, start, end, Some(&mut forward))?;
    let simulate_time_s = sim_started.elapsed().as_secs_f64();
    let history = sim
        .take_history()
        .ok_or_else(|| AppError::Simulation("run produced no history".to_string()))?;

    emit_progress(&mut progress_cb, RunStage::Completed, started, None);
    let timing = RunTimingSummary {
        compile_time_s,
        simulate_time_s,
        total_time_s: started.elapsed().as_secs_f64(),
        steps: history.len(),
    };
    tracing::info!(
        model = compiled.model.id(),
        steps = timing.steps,
        total_time_s = timing.total_time_s,
        "run completed"
    );

    Ok(RunResponse {
        model_id: compiled.model.id().to_string(),
        order,
        report: compiled.report,
        history,
        timing,
    })
}

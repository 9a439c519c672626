//! Error types for simulation runs.

use thiserror::Error;
use tw_core::ComponentId;
use tw_graph::{ComponentError, GraphError};

/// Errors encountered while driving a model through time.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SimError {
    #[error("Invalid argument: {what}")]
    InvalidArg { what: &'static str },

    /// The model could not be scheduled.
    #[error(transparent)]
    Graph(#[from] GraphError),

    #[error("Component '{component}' failed to initialize: {source}")]
    Initialize {
        component: ComponentId,
        source: ComponentError,
    },

    /// A component failed during `do_step`; the run stops at that step.
    #[error("Component '{component}' failed at t = {time_s} s: {source}")]
    Step {
        component: ComponentId,
        time_s: f64,
        source: ComponentError,
    },

    #[error("Simulation cancelled before step {step}")]
    Cancelled { step: usize },

    #[error("Run needs {steps} steps, limit is {max_steps}")]
    TooManySteps { steps: usize, max_steps: usize },
}

pub type SimResult<T> = Result<T, SimError>;

impl SimError {
    /// Component responsible for the failure, if any.
    pub fn component(&self) -> Option<&ComponentId> {
        match self {
            SimError::Initialize { component, .. } | SimError::Step { component, .. } => {
                Some(component)
            }
            _ => None,
        }
    }
}

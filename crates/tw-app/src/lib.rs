//! Shared application service layer for twinflow.
//!
//! Frontends go through this crate to load and validate projects, compile them into
//! graph models (including semantic auto-wiring), run simulations and export histories.

pub mod error;
pub mod export;
pub mod progress;
pub mod project_service;
pub mod run_service;

// Re-export key types for convenience
pub use error::{AppError, AppResult};
pub use export::{history_csv, write_history};
pub use progress::{RunProgressEvent, RunStage};
pub use project_service::{
    CompiledModel, ComponentSummary, compile_model, execution_order, list_components,
    load_project, save_project, semantic_graph, validate_project,
};
pub use run_service::{RunOverrides, RunResponse, RunTimingSummary, run, run_with_progress};

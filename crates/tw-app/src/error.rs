//! Error types for the tw-app service layer.

use std::path::PathBuf;

/// Application error type that wraps errors from the backend crates and gives
/// frontends a single error to report.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Project error: {0}")]
    Project(String),

    #[error("Failed to read project file: {path}")]
    ProjectFileRead {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Project validation failed: {0}")]
    Validation(String),

    #[error("Model compilation failed: {0}")]
    Compile(String),

    #[error("Pattern matching failed: {0}")]
    Match(String),

    #[error("Simulation error: {0}")]
    Simulation(String),

    #[error("Component not found in history: {0}")]
    ComponentNotFound(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for tw-app operations.
pub type AppResult<T> = Result<T, AppError>;

impl From<tw_project::ProjectError> for AppError {
    fn from(err: tw_project::ProjectError) -> Self {
        match err {
            tw_project::ProjectError::Validation(v) => AppError::Validation(v.to_string()),
            other => AppError::Project(other.to_string()),
        }
    }
}

impl From<tw_project::ValidationError> for AppError {
    fn from(err: tw_project::ValidationError) -> Self {
        AppError::Validation(err.to_string())
    }
}

impl From<tw_graph::GraphError> for AppError {
    fn from(err: tw_graph::GraphError) -> Self {
        AppError::Compile(err.to_string())
    }
}

impl From<tw_semantic::SemanticError> for AppError {
    fn from(err: tw_semantic::SemanticError) -> Self {
        AppError::Compile(err.to_string())
    }
}

impl From<tw_semantic::MatchError> for AppError {
    fn from(err: tw_semantic::MatchError) -> Self {
        AppError::Match(err.to_string())
    }
}

impl From<tw_semantic::PatternError> for AppError {
    fn from(err: tw_semantic::PatternError) -> Self {
        AppError::Match(err.to_string())
    }
}

impl From<tw_sim::SimError> for AppError {
    fn from(err: tw_sim::SimError) -> Self {
        AppError::Simulation(err.to_string())
    }
}

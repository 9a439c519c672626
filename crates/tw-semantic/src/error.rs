//! Error types for semantic graphs, signature patterns and matching.

use thiserror::Error;
use tw_graph::{ComponentError, GraphError};

pub type SemanticResult<T> = Result<T, SemanticError>;
pub type PatternResult<T> = Result<T, PatternError>;
pub type MatchResult<T> = Result<T, MatchError>;

/// Errors building a semantic graph.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum SemanticError {
    #[error("Semantic node '{name}' already exists")]
    DuplicateNode { name: String },

    #[error("Semantic node not found: {name}")]
    UnknownNode { name: String },
}

/// A malformed signature pattern, reported at registration time.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum PatternError {
    #[error("Pattern for '{pattern}' declares no modeled node")]
    NoModeledNode { pattern: String },

    #[error("Pattern for '{pattern}' references unknown template node {node}")]
    UnknownTemplateNode { pattern: String, node: usize },

    #[error("Pattern for '{pattern}': template node {node} is not connected to the modeled node")]
    Disconnected { pattern: String, node: usize },

    #[error("Pattern for '{pattern}': multiple-match node {node} must be a leaf with one edge")]
    MultipleMatchesNotLeaf { pattern: String, node: usize },

    #[error("Pattern for '{pattern}': multiple-match node {node} cannot be modeled")]
    MultipleMatchesModeled { pattern: String, node: usize },

    #[error("Pattern for '{pattern}' declares input '{port}' twice")]
    DuplicateInput { pattern: String, port: String },
}

/// Failures of matching and auto-wiring.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum MatchError {
    #[error(transparent)]
    Semantic(#[from] SemanticError),

    #[error(transparent)]
    Pattern(#[from] PatternError),

    /// Strict mode only: nodes an anchor accepts that no pattern could model.
    #[error("Unmodeled semantic nodes: {}", .nodes.join(", "))]
    Unmodeled { nodes: Vec<String> },

    /// Strict mode only: a declared input whose source node has no component.
    #[error("Input '{port}' of '{component}' needs semantic node '{node}', which is not modeled")]
    UnresolvedInput {
        component: String,
        port: String,
        node: String,
    },

    #[error("Component '{component}' has no output port to supply '{port}'")]
    NoOutputPort { component: String, port: String },

    #[error("Cannot build {component_type} for '{node}': {source}")]
    Factory {
        component_type: String,
        node: String,
        source: ComponentError,
    },

    #[error(transparent)]
    Graph(#[from] GraphError),
}

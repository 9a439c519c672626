//! Graph-specific error types.

use thiserror::Error;
use tw_core::{ComponentId, ConnectionId, PortType, TwError};

pub type GraphResult<T> = Result<T, GraphError>;
pub type ComponentResult<T> = Result<T, ComponentError>;

/// Model construction and scheduling errors.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum GraphError {
    /// An invalid connection request or registry operation.
    #[error("Structural error: {0}")]
    Structural(#[from] StructuralError),

    /// Feedback among components that are not exempt.
    ///
    /// Each entry lists the members of one strongly connected component.
    #[error("Cycle detected among components: {}", format_cycles(.cycles))]
    Cycle { cycles: Vec<Vec<ComponentId>> },

    /// Lookup of an unknown component or connection.
    #[error("{what} not found: {id}")]
    NotFound { what: &'static str, id: String },
}

impl GraphError {
    pub(crate) fn component_not_found(id: &str) -> Self {
        GraphError::NotFound {
            what: "Component",
            id: id.to_string(),
        }
    }

    /// Every component named by a cycle error, in report order.
    pub fn cycle_members(&self) -> Vec<&ComponentId> {
        match self {
            GraphError::Cycle { cycles } => cycles.iter().flatten().collect(),
            _ => Vec::new(),
        }
    }
}

fn format_cycles(cycles: &[Vec<ComponentId>]) -> String {
    cycles
        .iter()
        .map(|cycle| {
            let names: Vec<&str> = cycle.iter().map(|id| id.as_str()).collect();
            format!("[{}]", names.join(" -> "))
        })
        .collect::<Vec<_>>()
        .join(", ")
}

/// Which side of a component a port lives on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PortDirection {
    Input,
    Output,
}

impl std::fmt::Display for PortDirection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PortDirection::Input => f.write_str("input"),
            PortDirection::Output => f.write_str("output"),
        }
    }
}

#[derive(Debug, Error, Clone, PartialEq)]
pub enum StructuralError {
    #[error("Component '{id}' already exists")]
    DuplicateComponent { id: ComponentId },

    #[error("Component '{component}' has no {direction} port '{port}'")]
    UnknownPort {
        component: ComponentId,
        port: String,
        direction: PortDirection,
    },

    #[error(
        "Cannot connect {sender}.{sender_port} ({sender_type:?}) to {receiver}.{receiver_port} ({receiver_type:?})"
    )]
    IncompatiblePorts {
        sender: ComponentId,
        sender_port: String,
        sender_type: PortType,
        receiver: ComponentId,
        receiver_port: String,
        receiver_type: PortType,
    },

    #[error(
        "Input port {component}.{port} is already bound by connection {existing} and does not aggregate"
    )]
    PortAlreadyBound {
        component: ComponentId,
        port: String,
        existing: ConnectionId,
    },

    #[error("Invalid sub-system link {parent} -> {child}: {reason}")]
    InvalidHierarchy {
        parent: ComponentId,
        child: ComponentId,
        reason: &'static str,
    },
}

/// Failures raised by a component while initializing or stepping.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ComponentError {
    #[error("Required input '{port}' is undefined")]
    MissingInput { port: String },

    #[error("Port '{port}' is not declared")]
    UnknownPort { port: String },

    #[error("Invalid value on port '{port}': {what}")]
    InvalidValue { port: String, what: String },

    #[error("Invalid parameter: {what}")]
    InvalidParameter { what: &'static str },

    #[error(transparent)]
    Value(#[from] TwError),

    /// Failure reported by an external engine the component delegates to.
    #[error("External engine error: {message}")]
    External { message: String },
}

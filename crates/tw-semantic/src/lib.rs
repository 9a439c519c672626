//! tw-semantic: semantic building graphs and the structural pattern matcher.
//!
//! A `SemanticGraph` describes the building (nodes with classes, predicate edges). A
//! `PatternCatalog` lists component types with the `SignaturePattern`s they model.
//! `auto_wire` matches the two and populates a `tw_graph::Model`.

pub mod catalog;
pub mod error;
pub mod graph;
pub mod matcher;
pub mod pattern;
pub mod wire;

pub use petgraph::Direction;

pub use catalog::{CatalogEntry, Factory, PatternCatalog};
pub use error::{
    MatchError, MatchResult, PatternError, PatternResult, SemanticError, SemanticResult,
};
pub use graph::{ClassHierarchy, SemanticGraph, SemanticNode, SemanticNodeId};
pub use matcher::{Match, MatchMode, MatchOutcome, Matcher};
pub use pattern::{EdgeKind, InputRequirement, SignaturePattern, TemplateEdge, TemplateNode, TemplateNodeId};
pub use wire::{MatchReport, MatchedComponent, UnresolvedInput, auto_wire, component_id_for};

//! Project schema definitions.

use std::collections::BTreeMap;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use tw_components::ComponentConfig;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Project {
    pub version: u32,
    pub name: String,
    #[serde(default)]
    pub components: Vec<ComponentDef>,
    #[serde(default)]
    pub connections: Vec<ConnectionDef>,
    #[serde(default)]
    pub cycle_policy: CyclePolicyDef,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub semantic: Option<SemanticDef>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub simulation: Option<SimulationDef>,
}

impl Project {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            version: crate::LATEST_VERSION,
            name: name.into(),
            components: Vec::new(),
            connections: Vec::new(),
            cycle_policy: CyclePolicyDef::default(),
            semantic: None,
            simulation: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ComponentDef {
    pub id: String,
    pub kind: ComponentConfig,
    #[serde(default = "default_true")]
    pub save_history: bool,
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ConnectionDef {
    pub from: String,
    pub from_port: String,
    pub to: String,
    pub to_port: String,
    /// Allowed to close a cycle; the receiver reads the previous step's value.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub feedback: bool,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum CyclePolicyDef {
    #[default]
    ExplicitOnly,
    ControllerInputs,
}

/// Semantic building description matched against the default pattern catalog.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct SemanticDef {
    /// Start from the stock class hierarchy before adding `classes`.
    #[serde(default = "default_true")]
    pub default_classes: bool,
    #[serde(default)]
    pub classes: Vec<ClassDef>,
    #[serde(default)]
    pub nodes: Vec<SemanticNodeDef>,
    #[serde(default)]
    pub triples: Vec<TripleDef>,
    /// Fail on unmodeled nodes and unresolved inputs instead of skipping them.
    #[serde(default)]
    pub strict: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ClassDef {
    pub name: String,
    #[serde(default)]
    pub parents: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SemanticNodeDef {
    pub name: String,
    pub class: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub properties: BTreeMap<String, f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TripleDef {
    pub subject: String,
    pub predicate: String,
    pub object: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SimulationDef {
    pub step_size_s: f64,
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
}

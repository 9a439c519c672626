//! Project loading, validation and compilation into a graph model.

use std::path::Path;

use tw_components::{default_catalog, default_classes};
use tw_graph::{CyclePolicy, Model};
use tw_project::{CyclePolicyDef, Project, SemanticDef};
use tw_semantic::{ClassHierarchy, MatchMode, MatchReport, SemanticGraph, SemanticNode, auto_wire};

use crate::error::{AppError, AppResult};

/// A model ready to simulate, plus what semantic matching contributed to it.
#[derive(Debug)]
pub struct CompiledModel {
    pub model: Model,
    pub report: Option<MatchReport>,
}

/// One line of a model listing.
#[derive(Debug, Clone, PartialEq)]
pub struct ComponentSummary {
    pub id: String,
    pub kind: String,
    pub role: String,
    pub inputs: usize,
    pub outputs: usize,
}

fn is_json(path: &Path) -> bool {
    path.extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("json"))
}

/// Load a project from a YAML file, or JSON when the extension says so.
pub fn load_project(path: &Path) -> AppResult<Project> {
    let content = std::fs::read_to_string(path).map_err(|e| AppError::ProjectFileRead {
        path: path.to_path_buf(),
        source: e,
    })?;

    let project: Project = if is_json(path) {
        serde_json::from_str(&content)
            .map_err(|e| AppError::Project(format!("Failed to parse project JSON: {}", e)))?
    } else {
        serde_yaml::from_str(&content)
            .map_err(|e| AppError::Project(format!("Failed to parse project YAML: {}", e)))?
    };

    Ok(project)
}

pub fn save_project(path: &Path, project: &Project) -> AppResult<()> {
    if is_json(path) {
        tw_project::save_json(path, project)?;
    } else {
        tw_project::save_yaml(path, project)?;
    }
    Ok(())
}

pub fn validate_project(project: &Project) -> AppResult<()> {
    tw_project::validate_project(project)?;
    Ok(())
}

pub fn cycle_policy(def: CyclePolicyDef) -> CyclePolicy {
    match def {
        CyclePolicyDef::ExplicitOnly => CyclePolicy::ExplicitOnly,
        CyclePolicyDef::ControllerInputs => CyclePolicy::ControllerInputs,
    }
}

/// Build the semantic graph described by a project.
pub fn semantic_graph(def: &SemanticDef) -> AppResult<SemanticGraph> {
    let mut classes = if def.default_classes {
        default_classes()
    } else {
        ClassHierarchy::new()
    };
    for class in &def.classes {
        classes.add(class.name.as_str(), class.parents.iter().map(String::as_str));
    }

    let mut graph = SemanticGraph::with_classes(classes);
    for node in &def.nodes {
        let mut semantic = SemanticNode::new(node.name.as_str(), node.class.as_str());
        semantic.properties = node.properties.clone();
        graph.insert(semantic)?;
    }
    for t in &def.triples {
        graph.add_triple(&t.subject, &t.predicate, &t.object)?;
    }
    Ok(graph)
}

/// Compile a project: explicit components, then components discovered from the
/// semantic description, then explicit connections (which may reference either).
pub fn compile_model(project: &Project) -> AppResult<CompiledModel> {
    validate_project(project)?;
    let mut model = Model::new(project.name.as_str()).with_cycle_policy(cycle_policy(project.cycle_policy));

    for def in &project.components {
        let behavior = def
            .kind
            .build()
            .map_err(|e| AppError::Compile(format!("component '{}': {}", def.id, e)))?;
        model.add_component(def.id.as_str(), behavior)?;
        model.get_component_mut(&def.id)?.set_save_history(def.save_history);
    }

    let report = match &project.semantic {
        Some(def) => {
            let graph = semantic_graph(def)?;
            let catalog = default_catalog()?;
            let mode = if def.strict {
                MatchMode::Strict
            } else {
                MatchMode::Lenient
            };
            Some(auto_wire(&mut model, &graph, &catalog, mode)?)
        }
        None => None,
    };

    for conn in &project.connections {
        if conn.feedback {
            model.add_feedback_connection(&conn.from, &conn.to, &conn.from_port, &conn.to_port)?;
        } else {
            model.add_connection(&conn.from, &conn.to, &conn.from_port, &conn.to_port)?;
        }
    }

    tracing::info!(
        model = model.id(),
        components = model.components().len(),
        connections = model.connections().len(),
        "compiled project"
    );
    Ok(CompiledModel { model, report })
}

/// Components of a model in insertion order.
pub fn list_components(model: &Model) -> Vec<ComponentSummary> {
    model
        .components()
        .iter()
        .map(|c| ComponentSummary {
            id: c.id().to_string(),
            kind: c.kind().to_string(),
            role: format!("{:?}", c.role()),
            inputs: c.spec().inputs.len(),
            outputs: c.spec().outputs.len(),
        })
        .collect()
}

/// Execution order of a compiled project, as component ids.
pub fn execution_order(model: &mut Model) -> AppResult<Vec<String>> {
    let order = model.compute_execution_order()?;
    Ok(order.ids().iter().map(|id| id.to_string()).collect())
}

//! Instantiating and wiring matched components into a graph model.

use std::collections::{HashMap, HashSet};

use tw_core::{ComponentId, ConnectionId};
use tw_graph::Model;

use crate::catalog::PatternCatalog;
use crate::error::{MatchError, MatchResult};
use crate::graph::{SemanticGraph, SemanticNodeId};
use crate::matcher::{Match, MatchMode, Matcher};

/// A component created from a match.
#[derive(Debug, Clone, PartialEq)]
pub struct MatchedComponent {
    pub id: ComponentId,
    pub component_type: String,
    /// Semantic node the pattern anchored on.
    pub node: String,
    /// Every semantic node the component models, anchor first.
    pub modeled: Vec<String>,
}

/// A declared input left unwired in lenient mode.
#[derive(Debug, Clone, PartialEq)]
pub struct UnresolvedInput {
    pub component: ComponentId,
    pub port: String,
    /// Source semantic node without a modeling component.
    pub node: String,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct MatchReport {
    pub components: Vec<MatchedComponent>,
    pub connections: Vec<ConnectionId>,
    pub unmodeled: Vec<String>,
    pub unresolved: Vec<UnresolvedInput>,
}

/// Turn a semantic node name into a component id.
pub fn component_id_for(name: &str) -> String {
    let id: String = name
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '_' || c == '-' { c } else { '_' })
        .collect();
    if id.is_empty() { "node".to_string() } else { id }
}

/// Match `graph` against `catalog`, add one component per match to `model`, then wire
/// every declared input from the component modeling its source node.
///
/// In strict mode nothing is added to the model unless every input can be wired. On any
/// error the components added so far are removed again, so the model is left unchanged.
pub fn auto_wire(
    model: &mut Model,
    graph: &SemanticGraph,
    catalog: &PatternCatalog,
    mode: MatchMode,
) -> MatchResult<MatchReport> {
    let outcome = Matcher::new(catalog).mode(mode).run(graph)?;
    let entries = catalog.entries();

    if mode == MatchMode::Strict {
        let modeled: HashSet<SemanticNodeId> =
            outcome.matches.iter().flat_map(|m| modeled_nodes(catalog, m)).collect();
        for m in &outcome.matches {
            for input in entries[m.entry].patterns[m.pattern].inputs() {
                if let Some(&missing) = m.bound(input.node).iter().find(|n| !modeled.contains(*n)) {
                    return Err(MatchError::UnresolvedInput {
                        component: component_id_for(&graph.node(m.anchor).name),
                        port: input.port.clone(),
                        node: graph.node(missing).name.clone(),
                    });
                }
            }
        }
    }

    let mut report = MatchReport {
        unmodeled: outcome
            .unmodeled
            .iter()
            .map(|&n| graph.node(n).name.clone())
            .collect(),
        ..MatchReport::default()
    };

    let mut added = Vec::with_capacity(outcome.matches.len());
    let built = instantiate(model, graph, catalog, &outcome.matches, &mut added, &mut report);
    if let Err(err) = built {
        // Leave the model as it was: removing a component drops its connections too.
        for id in added.iter().rev() {
            model.remove_component(id.as_str())?;
        }
        tracing::warn!(error = %err, rolled_back = added.len(), "auto-wiring failed");
        return Err(err);
    }

    tracing::info!(
        components = report.components.len(),
        connections = report.connections.len(),
        unmodeled = report.unmodeled.len(),
        unresolved = report.unresolved.len(),
        "auto-wiring finished"
    );
    Ok(report)
}

/// Add one component per match, then connect the declared inputs. Every component
/// added to `model` is pushed onto `added` as soon as it exists.
fn instantiate(
    model: &mut Model,
    graph: &SemanticGraph,
    catalog: &PatternCatalog,
    matches: &[Match],
    added: &mut Vec<ComponentId>,
    report: &mut MatchReport,
) -> MatchResult<()> {
    let entries = catalog.entries();
    let mut modeled_by: HashMap<SemanticNodeId, ComponentId> = HashMap::new();
    for m in matches {
        let entry = &entries[m.entry];
        let node = graph.node(m.anchor);
        let behavior = entry.build(node).map_err(|source| MatchError::Factory {
            component_type: entry.component_type.clone(),
            node: node.name.clone(),
            source,
        })?;
        let id = model.add_component_preferring(&component_id_for(&node.name), behavior);
        added.push(id.clone());
        tracing::debug!(component = %id, component_type = %entry.component_type, "instantiated from match");

        let modeled = modeled_nodes(catalog, m);
        for &n in &modeled {
            modeled_by.insert(n, id.clone());
        }
        report.components.push(MatchedComponent {
            id,
            component_type: entry.component_type.clone(),
            node: node.name.clone(),
            modeled: modeled.iter().map(|&n| graph.node(n).name.clone()).collect(),
        });
    }

    for (m, receiver) in matches.iter().zip(added.iter()) {
        for input in entries[m.entry].patterns[m.pattern].inputs() {
            for &source in m.bound(input.node) {
                let Some(sender) = modeled_by.get(&source) else {
                    let node = graph.node(source).name.clone();
                    tracing::warn!(component = %receiver, port = %input.port, %node, "input left unwired");
                    report.unresolved.push(UnresolvedInput {
                        component: receiver.clone(),
                        port: input.port.clone(),
                        node,
                    });
                    continue;
                };
                let sender_port = match &input.source_port {
                    Some(port) => port.clone(),
                    None => model
                        .get_component(sender.as_str())?
                        .spec()
                        .outputs
                        .first()
                        .map(|o| o.name.clone())
                        .ok_or_else(|| MatchError::NoOutputPort {
                            component: sender.to_string(),
                            port: input.port.clone(),
                        })?,
                };
                let conn = model.add_connection(sender.as_str(), receiver.as_str(), &sender_port, &input.port)?;
                report.connections.push(conn);
            }
        }
    }
    Ok(())
}

/// Semantic nodes bound to the modeled template nodes of `m`.
fn modeled_nodes(catalog: &PatternCatalog, m: &Match) -> Vec<SemanticNodeId> {
    catalog.entries()[m.entry].patterns[m.pattern]
        .modeled()
        .iter()
        .flat_map(|&t| m.bound(t).iter().copied())
        .collect()
}

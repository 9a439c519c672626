//! Attributed semantic graph describing a building.
//!
//! Nodes carry a class label (e.g. `Sensor`, `Damper`, `Space`) and numeric properties;
//! edges carry a predicate (e.g. `observes`, `isPropertyOf`, `hasProfile`). The graph is
//! built once by a loader and only read by the matcher.

use std::collections::{BTreeMap, HashMap, HashSet, VecDeque};

use petgraph::Direction;
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::EdgeRef;

use crate::error::{SemanticError, SemanticResult};

pub type SemanticNodeId = NodeIndex;

/// Subclass relation between semantic classes.
///
/// `is_a` is reflexive and transitive; unknown classes only match themselves.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ClassHierarchy {
    parents: BTreeMap<String, Vec<String>>,
}

impl ClassHierarchy {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare `class` as a direct subclass of every entry in `parents`.
    pub fn add<I, S>(&mut self, class: impl Into<String>, parents: I) -> &mut Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let entry = self.parents.entry(class.into()).or_default();
        for parent in parents {
            let parent = parent.into();
            if !entry.contains(&parent) {
                entry.push(parent);
            }
        }
        self
    }

    pub fn is_a(&self, class: &str, ancestor: &str) -> bool {
        if class == ancestor {
            return true;
        }
        let mut seen: HashSet<&str> = HashSet::new();
        let mut queue: VecDeque<&str> = VecDeque::from([class]);
        while let Some(current) = queue.pop_front() {
            let Some(parents) = self.parents.get(current) else {
                continue;
            };
            for parent in parents {
                if parent == ancestor {
                    return true;
                }
                if seen.insert(parent.as_str()) {
                    queue.push_back(parent.as_str());
                }
            }
        }
        false
    }

    /// Direct parents of every declared class.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.parents.iter().map(|(c, p)| (c.as_str(), p.as_slice()))
    }
}

/// One individual of the building description.
#[derive(Debug, Clone, PartialEq)]
pub struct SemanticNode {
    pub name: String,
    pub class: String,
    /// Numeric attributes handed to component factories (e.g. nominal airflow).
    pub properties: BTreeMap<String, f64>,
}

impl SemanticNode {
    pub fn new(name: impl Into<String>, class: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            class: class.into(),
            properties: BTreeMap::new(),
        }
    }

    pub fn property(&self, key: &str) -> Option<f64> {
        self.properties.get(key).copied()
    }
}

/// Directed graph of semantic nodes connected by predicates.
///
/// Node iteration follows insertion order; neighbour queries are sorted by insertion
/// order as well, so every traversal is deterministic.
#[derive(Debug, Clone, Default)]
pub struct SemanticGraph {
    graph: DiGraph<SemanticNode, String>,
    by_name: HashMap<String, SemanticNodeId>,
    classes: ClassHierarchy,
}

impl SemanticGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_classes(classes: ClassHierarchy) -> Self {
        Self {
            classes,
            ..Self::default()
        }
    }

    pub fn classes(&self) -> &ClassHierarchy {
        &self.classes
    }

    pub fn classes_mut(&mut self) -> &mut ClassHierarchy {
        &mut self.classes
    }

    pub fn add_node(
        &mut self,
        name: impl Into<String>,
        class: impl Into<String>,
    ) -> SemanticResult<SemanticNodeId> {
        self.insert(SemanticNode::new(name, class))
    }

    pub fn insert(&mut self, node: SemanticNode) -> SemanticResult<SemanticNodeId> {
        if self.by_name.contains_key(&node.name) {
            return Err(SemanticError::DuplicateNode { name: node.name });
        }
        let name = node.name.clone();
        let ix = self.graph.add_node(node);
        self.by_name.insert(name, ix);
        Ok(ix)
    }

    pub fn set_property(&mut self, name: &str, key: impl Into<String>, value: f64) -> SemanticResult<()> {
        let ix = self.require(name)?;
        self.graph[ix].properties.insert(key.into(), value);
        Ok(())
    }

    /// Add the triple `subject --predicate--> object`. Duplicate triples are ignored.
    pub fn add_triple(&mut self, subject: &str, predicate: &str, object: &str) -> SemanticResult<()> {
        let s = self.require(subject)?;
        let o = self.require(object)?;
        let exists = self
            .graph
            .edges_connecting(s, o)
            .any(|e| e.weight() == predicate);
        if !exists {
            self.graph.add_edge(s, o, predicate.to_string());
        }
        Ok(())
    }

    fn require(&self, name: &str) -> SemanticResult<SemanticNodeId> {
        self.node_by_name(name).ok_or_else(|| SemanticError::UnknownNode {
            name: name.to_string(),
        })
    }

    pub fn node_by_name(&self, name: &str) -> Option<SemanticNodeId> {
        self.by_name.get(name).copied()
    }

    pub fn node(&self, id: SemanticNodeId) -> &SemanticNode {
        &self.graph[id]
    }

    /// Node ids in insertion order.
    pub fn node_ids(&self) -> impl Iterator<Item = SemanticNodeId> + '_ {
        self.graph.node_indices()
    }

    pub fn nodes(&self) -> impl Iterator<Item = &SemanticNode> {
        self.graph.node_weights()
    }

    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn triple_count(&self) -> usize {
        self.graph.edge_count()
    }

    /// All triples as `(subject, predicate, object)` names, in insertion order.
    pub fn triples(&self) -> impl Iterator<Item = (&str, &str, &str)> {
        self.graph.edge_references().map(|e| {
            (
                self.graph[e.source()].name.as_str(),
                e.weight().as_str(),
                self.graph[e.target()].name.as_str(),
            )
        })
    }

    /// Whether `class` is-a `ancestor` under this graph's hierarchy.
    pub fn is_a(&self, class: &str, ancestor: &str) -> bool {
        self.classes.is_a(class, ancestor)
    }

    /// Nodes reached by one `predicate` hop from `node` in `direction`, sorted.
    pub fn neighbors(&self, node: SemanticNodeId, predicate: &str, direction: Direction) -> Vec<SemanticNodeId> {
        let mut out: Vec<SemanticNodeId> = self
            .graph
            .edges_directed(node, direction)
            .filter(|e| e.weight() == predicate)
            .map(|e| match direction {
                Direction::Outgoing => e.target(),
                Direction::Incoming => e.source(),
            })
            .collect();
        out.sort_unstable();
        out.dedup();
        out
    }

    /// Objects `o` with `node --predicate--> o`.
    pub fn objects(&self, node: SemanticNodeId, predicate: &str) -> Vec<SemanticNodeId> {
        self.neighbors(node, predicate, Direction::Outgoing)
    }

    /// Subjects `s` with `s --predicate--> node`.
    pub fn subjects(&self, node: SemanticNodeId, predicate: &str) -> Vec<SemanticNodeId> {
        self.neighbors(node, predicate, Direction::Incoming)
    }

    /// Nodes reachable through 1..=max_depth hops of `predicate`, sorted.
    pub fn reachable(
        &self,
        node: SemanticNodeId,
        predicate: &str,
        direction: Direction,
        max_depth: usize,
    ) -> Vec<SemanticNodeId> {
        let mut visited: HashSet<SemanticNodeId> = HashSet::from([node]);
        let mut frontier = vec![node];
        let mut out = Vec::new();
        for _ in 0..max_depth {
            let mut next = Vec::new();
            for current in frontier {
                for n in self.neighbors(current, predicate, direction) {
                    if visited.insert(n) {
                        out.push(n);
                        next.push(n);
                    }
                }
            }
            if next.is_empty() {
                break;
            }
            frontier = next;
        }
        out.sort_unstable();
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn building() -> SemanticGraph {
        let mut g = SemanticGraph::new();
        g.classes_mut()
            .add("SetpointController", ["Controller"])
            .add("Controller", ["Device"])
            .add("Damper", ["Device"]);
        g.add_node("space", "Space").unwrap();
        g.add_node("co2", "Co2").unwrap();
        g.add_node("sensor", "Sensor").unwrap();
        g.add_node("ctrl", "SetpointController").unwrap();
        g.add_triple("co2", "isPropertyOf", "space").unwrap();
        g.add_triple("sensor", "observes", "co2").unwrap();
        g.add_triple("ctrl", "observes", "co2").unwrap();
        g
    }

    #[test]
    fn class_hierarchy_is_transitive() {
        let g = building();
        assert!(g.is_a("SetpointController", "Controller"));
        assert!(g.is_a("SetpointController", "Device"));
        assert!(g.is_a("Space", "Space"));
        assert!(!g.is_a("Damper", "Controller"));
    }

    #[test]
    fn hierarchy_tolerates_loops() {
        let mut h = ClassHierarchy::new();
        h.add("A", ["B"]).add("B", ["A"]);
        assert!(h.is_a("A", "B"));
        assert!(!h.is_a("A", "C"));
    }

    #[test]
    fn duplicate_names_are_rejected() {
        let mut g = building();
        assert_eq!(
            g.add_node("space", "Space"),
            Err(SemanticError::DuplicateNode { name: "space".into() })
        );
    }

    #[test]
    fn triples_need_known_nodes() {
        let mut g = building();
        assert!(matches!(
            g.add_triple("ghost", "observes", "co2"),
            Err(SemanticError::UnknownNode { .. })
        ));
    }

    #[test]
    fn subjects_and_objects_follow_direction() {
        let g = building();
        let co2 = g.node_by_name("co2").unwrap();
        let observers: Vec<&str> = g
            .subjects(co2, "observes")
            .into_iter()
            .map(|n| g.node(n).name.as_str())
            .collect();
        assert_eq!(observers, ["sensor", "ctrl"]);
        let space = g.node_by_name("space").unwrap();
        assert_eq!(g.objects(co2, "isPropertyOf"), vec![space]);
        assert!(g.objects(co2, "observes").is_empty());
    }

    #[test]
    fn reachable_is_depth_bounded() {
        let mut g = SemanticGraph::new();
        for name in ["a", "b", "c", "d"] {
            g.add_node(name, "Duct").unwrap();
        }
        g.add_triple("a", "feeds", "b").unwrap();
        g.add_triple("b", "feeds", "c").unwrap();
        g.add_triple("c", "feeds", "d").unwrap();
        g.add_triple("d", "feeds", "a").unwrap();

        let a = g.node_by_name("a").unwrap();
        let names = |ids: Vec<SemanticNodeId>| -> Vec<String> {
            ids.into_iter().map(|n| g.node(n).name.clone()).collect()
        };
        assert_eq!(names(g.reachable(a, "feeds", Direction::Outgoing, 2)), ["b", "c"]);
        assert_eq!(names(g.reachable(a, "feeds", Direction::Outgoing, 10)), ["b", "c", "d"]);
    }
}

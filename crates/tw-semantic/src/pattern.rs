//! Signature patterns: small templates describing which semantic structure a
//! component type models and where its inputs come from.

use std::collections::HashSet;

use crate::error::{PatternError, PatternResult};
use crate::graph::ClassHierarchy;

/// Index of a template node inside its pattern.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TemplateNodeId(pub usize);

/// A template node: matches any semantic node whose class is-a one of `classes`.
///
/// An empty class list leaves the node unconstrained.
#[derive(Debug, Clone, PartialEq)]
pub struct TemplateNode {
    pub classes: Vec<String>,
}

impl TemplateNode {
    pub fn accepts(&self, class: &str, hierarchy: &ClassHierarchy) -> bool {
        self.classes.is_empty() || self.classes.iter().any(|c| hierarchy.is_a(class, c))
    }
}

/// How a template edge may be satisfied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EdgeKind {
    /// The predicate directly links the two nodes.
    Exact,
    /// A chain of 1..=`max_depth` hops of the predicate, intermediates of any class.
    IgnoreIntermediateNodes { max_depth: usize },
    /// Every direct neighbour satisfying the far node's classes is bound (at least one).
    MultipleMatches,
}

/// `subject --predicate--> object` constraint between two template nodes.
#[derive(Debug, Clone, PartialEq)]
pub struct TemplateEdge {
    pub subject: TemplateNodeId,
    pub predicate: String,
    pub object: TemplateNodeId,
    pub kind: EdgeKind,
}

impl TemplateEdge {
    pub fn exact(subject: TemplateNodeId, predicate: impl Into<String>, object: TemplateNodeId) -> Self {
        Self {
            subject,
            predicate: predicate.into(),
            object,
            kind: EdgeKind::Exact,
        }
    }

    pub fn through(
        subject: TemplateNodeId,
        predicate: impl Into<String>,
        object: TemplateNodeId,
        max_depth: usize,
    ) -> Self {
        Self {
            subject,
            predicate: predicate.into(),
            object,
            kind: EdgeKind::IgnoreIntermediateNodes { max_depth },
        }
    }

    pub fn multiple(subject: TemplateNodeId, predicate: impl Into<String>, object: TemplateNodeId) -> Self {
        Self {
            subject,
            predicate: predicate.into(),
            object,
            kind: EdgeKind::MultipleMatches,
        }
    }

    pub fn touches(&self, node: TemplateNodeId) -> bool {
        self.subject == node || self.object == node
    }
}

/// Declared input of the instantiated component.
#[derive(Debug, Clone, PartialEq)]
pub struct InputRequirement {
    /// Input port on the new component.
    pub port: String,
    /// Template node whose modeling component supplies the value.
    pub node: TemplateNodeId,
    /// Output port of the supplier; its first declared output when absent.
    pub source_port: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SignaturePattern {
    owned_by: String,
    priority: i32,
    nodes: Vec<TemplateNode>,
    edges: Vec<TemplateEdge>,
    modeled: Vec<TemplateNodeId>,
    inputs: Vec<InputRequirement>,
}

impl SignaturePattern {
    /// Start a pattern for the component type `owned_by`.
    pub fn new(owned_by: impl Into<String>) -> Self {
        Self {
            owned_by: owned_by.into(),
            priority: 0,
            nodes: Vec::new(),
            edges: Vec::new(),
            modeled: Vec::new(),
            inputs: Vec::new(),
        }
    }

    /// Higher priorities are tried first.
    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    pub fn add_node<I, S>(&mut self, classes: I) -> TemplateNodeId
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.nodes.push(TemplateNode {
            classes: classes.into_iter().map(Into::into).collect(),
        });
        TemplateNodeId(self.nodes.len() - 1)
    }

    pub fn add_edge(&mut self, edge: TemplateEdge) -> &mut Self {
        self.edges.push(edge);
        self
    }

    /// Mark a node as backing data of the component. The first one is the anchor.
    pub fn add_modeled_node(&mut self, node: TemplateNodeId) -> &mut Self {
        if !self.modeled.contains(&node) {
            self.modeled.push(node);
        }
        self
    }

    pub fn add_input(
        &mut self,
        port: impl Into<String>,
        node: TemplateNodeId,
        source_port: Option<&str>,
    ) -> &mut Self {
        self.inputs.push(InputRequirement {
            port: port.into(),
            node,
            source_port: source_port.map(str::to_string),
        });
        self
    }

    pub fn owned_by(&self) -> &str {
        &self.owned_by
    }

    pub fn priority(&self) -> i32 {
        self.priority
    }

    pub fn nodes(&self) -> &[TemplateNode] {
        &self.nodes
    }

    pub fn node(&self, id: TemplateNodeId) -> Option<&TemplateNode> {
        self.nodes.get(id.0)
    }

    pub fn edges(&self) -> &[TemplateEdge] {
        &self.edges
    }

    pub fn modeled(&self) -> &[TemplateNodeId] {
        &self.modeled
    }

    pub fn is_modeled(&self, node: TemplateNodeId) -> bool {
        self.modeled.contains(&node)
    }

    pub fn inputs(&self) -> &[InputRequirement] {
        &self.inputs
    }

    /// The node a match starts from.
    pub fn anchor(&self) -> Option<TemplateNodeId> {
        self.modeled.first().copied()
    }

    fn known(&self, node: TemplateNodeId) -> PatternResult<()> {
        if node.0 < self.nodes.len() {
            Ok(())
        } else {
            Err(PatternError::UnknownTemplateNode {
                pattern: self.owned_by.clone(),
                node: node.0,
            })
        }
    }

    /// Check the pattern is well formed.
    pub fn validate(&self) -> PatternResult<()> {
        let anchor = self.anchor().ok_or_else(|| PatternError::NoModeledNode {
            pattern: self.owned_by.clone(),
        })?;
        for &node in &self.modeled {
            self.known(node)?;
        }
        for edge in &self.edges {
            self.known(edge.subject)?;
            self.known(edge.object)?;
        }

        let mut ports = HashSet::new();
        for input in &self.inputs {
            self.known(input.node)?;
            if !ports.insert(input.port.as_str()) {
                return Err(PatternError::DuplicateInput {
                    pattern: self.owned_by.clone(),
                    port: input.port.clone(),
                });
            }
        }

        for edge in self.edges.iter().filter(|e| e.kind == EdgeKind::MultipleMatches) {
            let target = edge.object;
            let degree = self.edges.iter().filter(|e| e.touches(target)).count();
            if degree != 1 || edge.subject == target {
                return Err(PatternError::MultipleMatchesNotLeaf {
                    pattern: self.owned_by.clone(),
                    node: target.0,
                });
            }
            if self.is_modeled(target) {
                return Err(PatternError::MultipleMatchesModeled {
                    pattern: self.owned_by.clone(),
                    node: target.0,
                });
            }
        }

        let (_, reached) = self.plan_from(anchor);
        if let Some(node) = reached.iter().position(|r| !r) {
            return Err(PatternError::Disconnected {
                pattern: self.owned_by.clone(),
                node,
            });
        }
        Ok(())
    }

    /// Edge visiting order for a search starting at `anchor`: each edge touches a node
    /// already reached. Returns the order and which nodes were reached.
    pub(crate) fn plan_from(&self, anchor: TemplateNodeId) -> (Vec<usize>, Vec<bool>) {
        let mut reached = vec![false; self.nodes.len()];
        if let Some(r) = reached.get_mut(anchor.0) {
            *r = true;
        }
        let mut placed = vec![false; self.edges.len()];
        let mut plan = Vec::with_capacity(self.edges.len());
        loop {
            let mut progress = false;
            for (i, edge) in self.edges.iter().enumerate() {
                if placed[i] || !(reached[edge.subject.0] || reached[edge.object.0]) {
                    continue;
                }
                placed[i] = true;
                reached[edge.subject.0] = true;
                reached[edge.object.0] = true;
                plan.push(i);
                progress = true;
            }
            if !progress {
                break;
            }
        }
        (plan, reached)
    }
}

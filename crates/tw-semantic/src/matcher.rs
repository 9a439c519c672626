//! Constrained subgraph search of signature patterns over a semantic graph.
//!
//! Semantic nodes are scanned in insertion order. For each unconsumed node, candidate
//! patterns are tried from highest to lowest priority (declaration order on ties); the
//! first complete binding wins and consumes its modeled nodes. The search itself is a
//! depth-first backtracking walk over the pattern's edges, outward from the anchor.

use std::collections::HashSet;

use petgraph::Direction;

use crate::catalog::PatternCatalog;
use crate::error::{MatchError, MatchResult};
use crate::graph::{SemanticGraph, SemanticNodeId};
use crate::pattern::{EdgeKind, SignaturePattern, TemplateEdge, TemplateNodeId};

/// What to do with semantic nodes no pattern could model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MatchMode {
    /// Unmodeled nodes and unresolved inputs are errors.
    Strict,
    /// Unmodeled nodes and unresolved inputs are reported and skipped.
    #[default]
    Lenient,
}

/// One successful pattern binding.
#[derive(Debug, Clone, PartialEq)]
pub struct Match {
    pub component_type: String,
    /// Index of the catalog entry.
    pub entry: usize,
    /// Index of the pattern within the entry.
    pub pattern: usize,
    /// Semantic node bound to the pattern's anchor.
    pub anchor: SemanticNodeId,
    /// Semantic nodes bound to each template node, indexed by `TemplateNodeId`.
    pub binding: Vec<Vec<SemanticNodeId>>,
}

impl Match {
    pub fn bound(&self, node: TemplateNodeId) -> &[SemanticNodeId] {
        self.binding.get(node.0).map_or(&[], Vec::as_slice)
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct MatchOutcome {
    pub matches: Vec<Match>,
    /// Nodes some anchor accepts but no pattern matched, in insertion order.
    pub unmodeled: Vec<SemanticNodeId>,
}

#[derive(Debug, Clone, Copy)]
struct Candidate {
    entry: usize,
    pattern: usize,
    priority: i32,
}

/// Runs a catalog's patterns against semantic graphs.
#[derive(Debug, Clone, Copy)]
pub struct Matcher<'c> {
    catalog: &'c PatternCatalog,
    mode: MatchMode,
}

impl<'c> Matcher<'c> {
    pub fn new(catalog: &'c PatternCatalog) -> Self {
        Self {
            catalog,
            mode: MatchMode::default(),
        }
    }

    pub fn mode(mut self, mode: MatchMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn match_mode(&self) -> MatchMode {
        self.mode
    }

    fn candidates(&self) -> Vec<Candidate> {
        let mut candidates: Vec<Candidate> = self
            .catalog
            .entries()
            .iter()
            .enumerate()
            .flat_map(|(entry, e)| {
                e.patterns.iter().enumerate().map(move |(pattern, p)| Candidate {
                    entry,
                    pattern,
                    priority: p.priority(),
                })
            })
            .collect();
        // Stable: equal priorities keep declaration order.
        candidates.sort_by_key(|c| std::cmp::Reverse(c.priority));
        candidates
    }

    fn pattern(&self, candidate: &Candidate) -> &'c SignaturePattern {
        &self.catalog.entries()[candidate.entry].patterns[candidate.pattern]
    }

    fn anchor_accepts(&self, pattern: &SignaturePattern, graph: &SemanticGraph, node: SemanticNodeId) -> bool {
        pattern
            .anchor()
            .and_then(|a| pattern.node(a))
            .is_some_and(|t| t.accepts(&graph.node(node).class, graph.classes()))
    }

    pub fn run(&self, graph: &SemanticGraph) -> MatchResult<MatchOutcome> {
        let candidates = self.candidates();
        let mut consumed: HashSet<SemanticNodeId> = HashSet::new();
        let mut matches = Vec::new();

        for node in graph.node_ids() {
            if consumed.contains(&node) {
                continue;
            }
            for candidate in &candidates {
                let pattern = self.pattern(candidate);
                if !self.anchor_accepts(pattern, graph, node) {
                    continue;
                }
                let Some(anchor) = pattern.anchor() else {
                    continue;
                };
                tracing::debug!(
                    node = %graph.node(node).name,
                    component_type = pattern.owned_by(),
                    priority = candidate.priority,
                    "trying pattern"
                );
                let Some(binding) = Search::new(graph, pattern, &consumed).run(anchor, node) else {
                    continue;
                };
                for &modeled in pattern.modeled() {
                    consumed.extend(binding[modeled.0].iter().copied());
                }
                let component_type = self.catalog.entries()[candidate.entry].component_type.clone();
                tracing::debug!(node = %graph.node(node).name, %component_type, "matched");
                matches.push(Match {
                    component_type,
                    entry: candidate.entry,
                    pattern: candidate.pattern,
                    anchor: node,
                    binding,
                });
                break;
            }
        }

        let unmodeled: Vec<SemanticNodeId> = graph
            .node_ids()
            .filter(|n| !consumed.contains(n))
            .filter(|&n| {
                candidates
                    .iter()
                    .any(|c| self.anchor_accepts(self.pattern(c), graph, n))
            })
            .collect();

        if !unmodeled.is_empty() {
            let nodes: Vec<String> = unmodeled.iter().map(|&n| graph.node(n).name.clone()).collect();
            tracing::warn!(count = nodes.len(), nodes = ?nodes, "semantic nodes left unmodeled");
            if self.mode == MatchMode::Strict {
                return Err(MatchError::Unmodeled { nodes });
            }
        }

        Ok(MatchOutcome { matches, unmodeled })
    }
}

/// Nodes satisfying `edge` when walked from `from` in `direction`.
fn follow(graph: &SemanticGraph, from: SemanticNodeId, edge: &TemplateEdge, direction: Direction) -> Vec<SemanticNodeId> {
    match edge.kind {
        EdgeKind::Exact | EdgeKind::MultipleMatches => graph.neighbors(from, &edge.predicate, direction),
        EdgeKind::IgnoreIntermediateNodes { max_depth } => {
            graph.reachable(from, &edge.predicate, direction, max_depth)
        }
    }
}

/// Backtracking state of one anchored search.
struct Search<'a> {
    graph: &'a SemanticGraph,
    pattern: &'a SignaturePattern,
    consumed: &'a HashSet<SemanticNodeId>,
    plan: Vec<usize>,
    binding: Vec<Vec<SemanticNodeId>>,
    used: HashSet<SemanticNodeId>,
}

impl<'a> Search<'a> {
    fn new(
        graph: &'a SemanticGraph,
        pattern: &'a SignaturePattern,
        consumed: &'a HashSet<SemanticNodeId>,
    ) -> Self {
        Self {
            graph,
            pattern,
            consumed,
            plan: Vec::new(),
            binding: vec![Vec::new(); pattern.nodes().len()],
            used: HashSet::new(),
        }
    }

    fn run(mut self, anchor: TemplateNodeId, node: SemanticNodeId) -> Option<Vec<Vec<SemanticNodeId>>> {
        if !self.admissible(anchor, node) {
            return None;
        }
        self.plan = self.pattern.plan_from(anchor).0;
        self.bind(anchor, vec![node]);
        self.extend(0).then_some(self.binding)
    }

    /// A semantic node may bind a template node when its class fits, it is not bound
    /// elsewhere in this search, and, for modeled nodes, no earlier match consumed it.
    fn admissible(&self, template: TemplateNodeId, node: SemanticNodeId) -> bool {
        let Some(t) = self.pattern.node(template) else {
            return false;
        };
        !self.used.contains(&node)
            && t.accepts(&self.graph.node(node).class, self.graph.classes())
            && !(self.pattern.is_modeled(template) && self.consumed.contains(&node))
    }

    fn bind(&mut self, template: TemplateNodeId, nodes: Vec<SemanticNodeId>) {
        self.used.extend(nodes.iter().copied());
        self.binding[template.0] = nodes;
    }

    fn unbind(&mut self, template: TemplateNodeId) {
        for node in std::mem::take(&mut self.binding[template.0]) {
            self.used.remove(&node);
        }
    }

    fn extend(&mut self, step: usize) -> bool {
        let pattern = self.pattern;
        let Some(&edge_ix) = self.plan.get(step) else {
            return true;
        };
        let edge = &pattern.edges()[edge_ix];
        let subject_bound = !self.binding[edge.subject.0].is_empty();
        let object_bound = !self.binding[edge.object.0].is_empty();

        match (subject_bound, object_bound) {
            (true, true) => {
                let objects = &self.binding[edge.object.0];
                let holds = self.binding[edge.subject.0].iter().all(|&s| {
                    let reach = follow(self.graph, s, edge, Direction::Outgoing);
                    objects.iter().all(|o| reach.contains(o))
                });
                holds && self.extend(step + 1)
            }
            (true, false) => self.extend_free(step, edge, edge.subject, edge.object, Direction::Outgoing),
            (false, true) => self.extend_free(step, edge, edge.object, edge.subject, Direction::Incoming),
            (false, false) => false,
        }
    }

    fn extend_free(
        &mut self,
        step: usize,
        edge: &'a TemplateEdge,
        known: TemplateNodeId,
        free: TemplateNodeId,
        direction: Direction,
    ) -> bool {
        let mut candidates: Vec<SemanticNodeId> = Vec::new();
        for &from in &self.binding[known.0] {
            for node in follow(self.graph, from, edge, direction) {
                if !candidates.contains(&node) && self.admissible(free, node) {
                    candidates.push(node);
                }
            }
        }
        candidates.sort_unstable();

        if edge.kind == EdgeKind::MultipleMatches {
            if candidates.is_empty() {
                return false;
            }
            self.bind(free, candidates);
            if self.extend(step + 1) {
                return true;
            }
            self.unbind(free);
            return false;
        }

        for node in candidates {
            self.bind(free, vec![node]);
            if self.extend(step + 1) {
                return true;
            }
            self.unbind(free);
        }
        false
    }
}

//! Execution order computation.
//!
//! Kahn's algorithm over the sender → receiver dependency graph. The ready set is a
//! min-heap on insertion position so ties always resolve the same way. Whatever cannot
//! be scheduled is split into strongly connected components to name the cycles.

use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashMap, HashSet};

use petgraph::algo::tarjan_scc;
use petgraph::graph::{DiGraph, NodeIndex};
use tw_core::{ComponentId, ConnectionId};

use crate::component::{Component, ComponentRole};
use crate::connection::{Aggregation, Connection};
use crate::error::{GraphError, GraphResult};
use crate::model::CyclePolicy;

/// Senders feeding one input port, resolved to component positions.
#[derive(Debug, Clone, PartialEq)]
pub struct InputBinding {
    pub port: String,
    /// (position of the sender in the model, sender output port), in connection order.
    pub sources: Vec<(usize, String)>,
    pub aggregation: Option<Aggregation>,
}

/// Cached per-step schedule of a model.
#[derive(Debug, Clone, PartialEq)]
pub struct ExecutionOrder {
    ids: Vec<ComponentId>,
    positions: Vec<usize>,
    bindings: Vec<Vec<InputBinding>>,
    exempted: Vec<ConnectionId>,
}

impl ExecutionOrder {
    /// Component ids in execution order.
    pub fn ids(&self) -> &[ComponentId] {
        &self.ids
    }

    /// Model positions in execution order.
    pub fn positions(&self) -> &[usize] {
        &self.positions
    }

    /// Input bindings of the component at model position `position`.
    pub fn bindings(&self, position: usize) -> &[InputBinding] {
        self.bindings.get(position).map_or(&[], Vec::as_slice)
    }

    /// Connections that were left out of dependency analysis (feedback edges).
    pub fn exempted(&self) -> &[ConnectionId] {
        &self.exempted
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Index of `id` in the execution order.
    pub fn rank_of(&self, id: &str) -> Option<usize> {
        self.ids.iter().position(|c| c.as_str() == id)
    }
}

/// A dependency edge between model positions, tagged with its connection.
#[derive(Debug, Clone, Copy)]
struct Dep {
    from: usize,
    to: usize,
    conn: ConnectionId,
}

pub(crate) fn compute(
    components: &[Component],
    connections: &[Connection],
    index: &HashMap<ComponentId, usize>,
    policy: CyclePolicy,
) -> GraphResult<ExecutionOrder> {
    let n = components.len();

    let mut exempted: Vec<ConnectionId> = Vec::new();
    let mut deps: Vec<Dep> = Vec::with_capacity(connections.len());
    for conn in connections {
        let (Some(&from), Some(&to)) = (index.get(&conn.sender), index.get(&conn.receiver)) else {
            return Err(GraphError::NotFound {
                what: "Connection endpoint",
                id: conn.id.to_string(),
            });
        };
        if conn.feedback {
            exempted.push(conn.id);
        } else {
            deps.push(Dep {
                from,
                to,
                conn: conn.id,
            });
        }
    }

    if policy == CyclePolicy::ControllerInputs {
        let cut = controller_feedback(components, n, &deps);
        if !cut.is_empty() {
            deps.retain(|d| !cut.contains(&d.conn));
            exempted.extend(cut);
        }
    }

    let mut in_degree = vec![0usize; n];
    let mut successors: Vec<Vec<usize>> = vec![Vec::new(); n];
    for dep in &deps {
        in_degree[dep.to] += 1;
        successors[dep.from].push(dep.to);
    }

    let mut ready: BinaryHeap<Reverse<usize>> = (0..n)
        .filter(|&i| in_degree[i] == 0)
        .map(Reverse)
        .collect();

    let mut positions = Vec::with_capacity(n);
    while let Some(Reverse(pos)) = ready.pop() {
        positions.push(pos);
        for &next in &successors[pos] {
            in_degree[next] -= 1;
            if in_degree[next] == 0 {
                ready.push(Reverse(next));
            }
        }
    }

    if positions.len() != n {
        let scheduled: HashSet<usize> = positions.iter().copied().collect();
        let cycles = name_cycles(components, n, &deps, &scheduled);
        tracing::debug!(cycles = cycles.len(), "execution order rejected");
        return Err(GraphError::Cycle { cycles });
    }

    let bindings = components
        .iter()
        .map(|comp| bindings_for(comp, connections, index))
        .collect();

    tracing::debug!(
        components = n,
        connections = connections.len(),
        exempted = exempted.len(),
        "computed execution order"
    );

    Ok(ExecutionOrder {
        ids: positions.iter().map(|&p| components[p].id().clone()).collect(),
        positions,
        bindings,
        exempted,
    })
}

fn dependency_graph(n: usize, deps: &[Dep], keep: impl Fn(usize) -> bool) -> DiGraph<usize, ConnectionId> {
    let mut graph = DiGraph::with_capacity(n, deps.len());
    let nodes: Vec<NodeIndex> = (0..n).map(|i| graph.add_node(i)).collect();
    for dep in deps.iter().filter(|d| keep(d.from) && keep(d.to)) {
        graph.add_edge(nodes[dep.from], nodes[dep.to], dep.conn);
    }
    graph
}

/// Strongly connected components that actually contain a cycle, members sorted by
/// position, components sorted by their first member.
fn cyclic_sccs(graph: &DiGraph<usize, ConnectionId>) -> Vec<Vec<usize>> {
    let mut sccs: Vec<Vec<usize>> = tarjan_scc(graph)
        .into_iter()
        .filter(|scc| scc.len() > 1 || graph.contains_edge(scc[0], scc[0]))
        .map(|scc| {
            let mut members: Vec<usize> = scc.into_iter().map(|ix| graph[ix]).collect();
            members.sort_unstable();
            members
        })
        .collect();
    sccs.sort();
    sccs
}

/// Edges into controllers that sit on a cycle; cutting them is the controller exemption.
fn controller_feedback(components: &[Component], n: usize, deps: &[Dep]) -> Vec<ConnectionId> {
    let graph = dependency_graph(n, deps, |_| true);
    let mut cut = Vec::new();
    for scc in cyclic_sccs(&graph) {
        let members: HashSet<usize> = scc.iter().copied().collect();
        for dep in deps {
            if members.contains(&dep.from)
                && members.contains(&dep.to)
                && components[dep.to].role() == ComponentRole::Controller
            {
                cut.push(dep.conn);
            }
        }
    }
    cut
}

fn name_cycles(
    components: &[Component],
    n: usize,
    deps: &[Dep],
    scheduled: &HashSet<usize>,
) -> Vec<Vec<ComponentId>> {
    let graph = dependency_graph(n, deps, |i| !scheduled.contains(&i));
    cyclic_sccs(&graph)
        .into_iter()
        .map(|scc| scc.into_iter().map(|p| components[p].id().clone()).collect())
        .collect()
}

fn bindings_for(
    comp: &Component,
    connections: &[Connection],
    index: &HashMap<ComponentId, usize>,
) -> Vec<InputBinding> {
    comp.spec()
        .inputs
        .iter()
        .map(|input| InputBinding {
            port: input.name.clone(),
            sources: connections
                .iter()
                .filter(|c| &c.receiver == comp.id() && c.receiver_port == input.name)
                .filter_map(|c| index.get(&c.sender).map(|&p| (p, c.sender_port.clone())))
                .collect(),
            aggregation: input.aggregation,
        })
        .collect()
}

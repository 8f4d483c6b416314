/*
 * Call Graph
 *
 * Directed multigraph over callable declarations. One edge per
 * (caller, callee, call site); a virtual call site contributes one edge
 * per dispatch target.
 */

use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::EdgeRef;
use petgraph::Direction;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use crate::shared::models::{CallSiteId, CallableId, NodeId};

/// Edge label: the call site and the caller's call node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CallEdge {
    pub call_site: CallSiteId,
    pub call_node: NodeId,
}

#[derive(Debug, Clone, Default)]
pub struct CallGraph {
    graph: DiGraph<CallableId, CallEdge>,
    index: FxHashMap<CallableId, NodeIndex>,
    targets: FxHashMap<CallSiteId, Vec<CallableId>>,
    /// Targets resolved but left out because they could not be analyzed
    excluded: FxHashMap<CallSiteId, Vec<CallableId>>,
}

impl CallGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_vertex(&mut self, callable: CallableId) {
        self.vertex(callable);
    }

    fn vertex(&mut self, callable: CallableId) -> NodeIndex {
        let graph = &mut self.graph;
        *self
            .index
            .entry(callable)
            .or_insert_with(|| graph.add_node(callable))
    }

    /// Add `caller -> callee` for `edge`; duplicates are ignored
    pub fn add_edge(&mut self, caller: CallableId, callee: CallableId, edge: CallEdge) -> bool {
        if self.contains_edge(caller, callee, edge.call_site) {
            return false;
        }
        let a = self.vertex(caller);
        let b = self.vertex(callee);
        self.graph.add_edge(a, b, edge);
        self.targets.entry(edge.call_site).or_default().push(callee);
        true
    }

    /// Record that `call_site` could reach `callee`, which has no vertex
    pub fn mark_excluded(&mut self, call_site: CallSiteId, callee: CallableId) {
        let dropped = self.excluded.entry(call_site).or_default();
        if !dropped.contains(&callee) {
            dropped.push(callee);
        }
    }

    /// Targets of `call_site` that were resolved and then excluded
    pub fn excluded_targets_of(&self, call_site: CallSiteId) -> &[CallableId] {
        self.excluded
            .get(&call_site)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn contains_vertex(&self, callable: CallableId) -> bool {
        self.index.contains_key(&callable)
    }

    pub fn contains_edge(&self, caller: CallableId, callee: CallableId, call_site: CallSiteId) -> bool {
        let (Some(&a), Some(&b)) = (self.index.get(&caller), self.index.get(&callee)) else {
            return false;
        };
        self.graph
            .edges_connecting(a, b)
            .any(|e| e.weight().call_site == call_site)
    }

    /// Vertices in insertion order
    pub fn vertices(&self) -> impl Iterator<Item = CallableId> + '_ {
        self.graph.node_weights().copied()
    }

    /// `(caller, callee, edge)` in insertion order
    pub fn edges(&self) -> impl Iterator<Item = (CallableId, CallableId, &CallEdge)> + '_ {
        self.graph
            .edge_references()
            .map(move |e| (self.graph[e.source()], self.graph[e.target()], e.weight()))
    }

    /// Resolved targets of one call site
    pub fn targets_of(&self, call_site: CallSiteId) -> &[CallableId] {
        self.targets
            .get(&call_site)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn callees_of(&self, caller: CallableId) -> Vec<CallableId> {
        self.neighbors(caller, Direction::Outgoing)
    }

    pub fn callers_of(&self, callee: CallableId) -> Vec<CallableId> {
        self.neighbors(callee, Direction::Incoming)
    }

    fn neighbors(&self, c: CallableId, dir: Direction) -> Vec<CallableId> {
        let Some(&idx) = self.index.get(&c) else {
            return Vec::new();
        };
        let mut out: Vec<CallableId> = self
            .graph
            .neighbors_directed(idx, dir)
            .map(|n| self.graph[n])
            .collect();
        out.sort();
        out.dedup();
        out
    }

    pub fn vertex_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    pub fn to_dto(&self) -> CallGraphDto {
        CallGraphDto {
            vertices: self.vertices().collect(),
            edges: self
                .edges()
                .map(|(caller, callee, e)| CallEdgeDto {
                    caller,
                    callee,
                    call_site: e.call_site,
                    call_node: e.call_node,
                })
                .collect(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CallEdgeDto {
    pub caller: CallableId,
    pub callee: CallableId,
    pub call_site: CallSiteId,
    pub call_node: NodeId,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CallGraphDto {
    pub vertices: Vec<CallableId>,
    pub edges: Vec<CallEdgeDto>,
}

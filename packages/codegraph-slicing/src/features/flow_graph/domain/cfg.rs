/*
 * Control Flow Graph of one callable
 *
 * Invariants (checked by `infrastructure::validation`):
 * - exactly one entry, with no incoming edges
 * - every node reachable from entry
 * - exit reachable from every node, except inside flagged non-terminating loops
 */

use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::EdgeRef;
use petgraph::Direction;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use crate::shared::models::{
    CallSite, CallSiteId, CallableId, FlowEdge, Node, NodeId, OutputSlot, SyntaxId,
};

/// Nodes synthesized around one call site
#[derive(Debug, Clone)]
pub struct CallSiteNodes {
    pub site: CallSite,
    pub call_node: NodeId,
    /// Positional, one per argument
    pub actual_ins: Vec<NodeId>,
    pub actual_outs: Vec<(OutputSlot, NodeId)>,
}

impl CallSiteNodes {
    pub fn actual_out(&self, slot: OutputSlot) -> Option<NodeId> {
        self.actual_outs
            .iter()
            .find(|(s, _)| *s == slot)
            .map(|(_, id)| *id)
    }
}

/// Formal parameter nodes of a callable
#[derive(Debug, Clone, Default)]
pub struct Formals {
    /// Positional, one per parameter
    pub ins: Vec<NodeId>,
    pub outs: Vec<(OutputSlot, NodeId)>,
}

#[derive(Debug, Clone)]
pub struct ControlFlowGraph {
    callable: CallableId,
    graph: DiGraph<Node, FlowEdge>,
    index: FxHashMap<NodeId, NodeIndex>,
    entry: NodeIndex,
    exit: NodeIndex,
    /// First node of the exit sequence (first formal-out, or exit)
    exit_head: NodeIndex,
    pub formals: Formals,
    pub call_sites: Vec<CallSiteNodes>,
    /// Headers of loops with no path to exit
    pub non_terminating: Vec<NodeId>,
    /// Statements never materialized because no path reaches them
    pub unreachable: Vec<SyntaxId>,
}

impl ControlFlowGraph {
    /// Graph holding only `entry` and `exit`, not yet connected
    pub fn new(callable: CallableId, entry: Node, exit: Node) -> Self {
        let mut graph = DiGraph::new();
        let mut index = FxHashMap::default();
        let entry_id = entry.id;
        let exit_id = exit.id;
        let entry = graph.add_node(entry);
        let exit = graph.add_node(exit);
        index.insert(entry_id, entry);
        index.insert(exit_id, exit);

        Self {
            callable,
            graph,
            index,
            entry,
            exit,
            exit_head: exit,
            formals: Formals::default(),
            call_sites: Vec::new(),
            non_terminating: Vec::new(),
            unreachable: Vec::new(),
        }
    }

    pub fn callable(&self) -> CallableId {
        self.callable
    }

    pub fn add_node(&mut self, node: Node) -> NodeId {
        let id = node.id;
        let idx = self.graph.add_node(node);
        self.index.insert(id, idx);
        id
    }

    /// Connect two nodes already in the graph; unknown ids are ignored
    pub fn add_edge(&mut self, from: NodeId, to: NodeId, edge: FlowEdge) {
        if let (Some(&a), Some(&b)) = (self.index.get(&from), self.index.get(&to)) {
            self.graph.add_edge(a, b, edge);
        }
    }

    pub(crate) fn set_exit_head(&mut self, id: NodeId) {
        if let Some(&idx) = self.index.get(&id) {
            self.exit_head = idx;
        }
    }

    pub fn entry(&self) -> &Node {
        &self.graph[self.entry]
    }

    pub fn exit(&self) -> &Node {
        &self.graph[self.exit]
    }

    pub fn exit_head(&self) -> &Node {
        &self.graph[self.exit_head]
    }

    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.index.get(&id).map(|&idx| &self.graph[idx])
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.index.contains_key(&id)
    }

    /// Nodes in creation order
    pub fn nodes(&self) -> impl Iterator<Item = &Node> + '_ {
        self.graph.node_weights()
    }

    /// `(from, to, edge)` triples in creation order
    pub fn edges(&self) -> impl Iterator<Item = (NodeId, NodeId, &FlowEdge)> + '_ {
        self.graph.edge_references().map(move |e| {
            (
                self.graph[e.source()].id,
                self.graph[e.target()].id,
                e.weight(),
            )
        })
    }

    pub fn successors(&self, id: NodeId) -> Vec<NodeId> {
        self.neighbors(id, Direction::Outgoing)
    }

    pub fn predecessors(&self, id: NodeId) -> Vec<NodeId> {
        self.neighbors(id, Direction::Incoming)
    }

    fn neighbors(&self, id: NodeId, dir: Direction) -> Vec<NodeId> {
        match self.index.get(&id) {
            Some(&idx) => {
                let mut out: Vec<NodeId> = self
                    .graph
                    .neighbors_directed(idx, dir)
                    .map(|n| self.graph[n].id)
                    .collect();
                out.sort();
                out.dedup();
                out
            }
            None => Vec::new(),
        }
    }

    /// Edges leaving `id` with their labels, in insertion order
    pub fn out_edges(&self, id: NodeId) -> Vec<(NodeId, &FlowEdge)> {
        let Some(&idx) = self.index.get(&id) else {
            return Vec::new();
        };
        let mut edges: Vec<_> = self
            .graph
            .edges_directed(idx, Direction::Outgoing)
            .collect();
        edges.sort_by_key(|e| e.id().index());
        edges
            .into_iter()
            .map(|e| (self.graph[e.target()].id, e.weight()))
            .collect()
    }

    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    /// Node created `offset` positions after the graph's first node
    pub(crate) fn node_at(&self, offset: usize) -> Option<NodeId> {
        self.graph.node_weight(NodeIndex::new(offset)).map(|n| n.id)
    }

    pub fn call_site(&self, call_site: CallSiteId) -> Option<&CallSiteNodes> {
        self.call_sites.iter().find(|c| c.site.id == call_site)
    }

    /// Node for a source statement
    pub fn node_for_syntax(&self, syntax: SyntaxId) -> Option<&Node> {
        self.nodes().find(|n| n.syntax == Some(syntax))
    }

    pub(crate) fn graph(&self) -> &DiGraph<Node, FlowEdge> {
        &self.graph
    }

    pub(crate) fn entry_index(&self) -> NodeIndex {
        self.entry
    }

    pub(crate) fn exit_index(&self) -> NodeIndex {
        self.exit
    }

    pub(crate) fn exit_head_index(&self) -> NodeIndex {
        self.exit_head
    }

    pub(crate) fn index_of(&self, id: NodeId) -> Option<NodeIndex> {
        self.index.get(&id).copied()
    }

    pub fn to_dto(&self) -> CfgDto {
        CfgDto {
            callable: self.callable,
            entry: self.entry().id,
            exit: self.exit().id,
            nodes: self
                .nodes()
                .map(|n| CfgNodeDto {
                    id: n.id,
                    kind: n.kind.as_str().to_string(),
                    label: n.short_label(),
                })
                .collect(),
            edges: self
                .edges()
                .map(|(from, to, e)| CfgEdgeDto {
                    from,
                    to,
                    label: e.display_label(),
                })
                .collect(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CfgNodeDto {
    pub id: NodeId,
    pub kind: String,
    pub label: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CfgEdgeDto {
    pub from: NodeId,
    pub to: NodeId,
    pub label: String,
}

/// Export form for external renderers
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CfgDto {
    pub callable: CallableId,
    pub entry: NodeId,
    pub exit: NodeId,
    pub nodes: Vec<CfgNodeDto>,
    pub edges: Vec<CfgEdgeDto>,
}

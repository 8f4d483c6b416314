/*
 * PDG (Program Dependence Graph) Module
 *
 * PDG = CFG nodes + control dependence + data dependence, for one callable.
 * Immutable once assembled; the SDG copies it and adds interprocedural
 * edges.
 */

use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::EdgeRef;
use petgraph::Direction;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use crate::features::control_dependence::ControlDependence;
use crate::features::data_flow::DataDependence;
use crate::features::flow_graph::domain::{CallSiteNodes, ControlFlowGraph, Formals};
use crate::shared::models::{CallableId, Dependence, Node, NodeId};

/// Program Dependence Graph of one callable
#[derive(Debug, Clone)]
pub struct ProgramDependenceGraph {
    callable: CallableId,
    graph: DiGraph<Node, Dependence>,
    index: FxHashMap<NodeId, NodeIndex>,
    entry: NodeId,
    exit: NodeId,
    formals: Formals,
    call_sites: Vec<CallSiteNodes>,
}

// Serialized through the DTO
impl Serialize for ProgramDependenceGraph {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        self.to_dto().serialize(serializer)
    }
}

impl ProgramDependenceGraph {
    /// Union a CFG's nodes with its control and data dependences
    pub fn assemble(
        cfg: &ControlFlowGraph,
        control: &[ControlDependence],
        data: &[DataDependence],
    ) -> Self {
        let mut graph = DiGraph::with_capacity(cfg.node_count(), control.len() + data.len());
        let mut index = FxHashMap::default();
        for node in cfg.nodes() {
            let idx = graph.add_node(node.clone());
            index.insert(node.id, idx);
        }

        let mut pdg = Self {
            callable: cfg.callable(),
            graph,
            index,
            entry: cfg.entry().id,
            exit: cfg.exit().id,
            formals: cfg.formals.clone(),
            call_sites: cfg.call_sites.clone(),
        };

        for cd in control {
            pdg.add_edge(cd.controller, cd.dependent, Dependence::Control);
        }
        for dd in data {
            pdg.add_edge(dd.from, dd.to, Dependence::data(dd.variable.as_str()));
        }
        pdg
    }

    fn add_edge(&mut self, from: NodeId, to: NodeId, dependence: Dependence) {
        if let (Some(&a), Some(&b)) = (self.index.get(&from), self.index.get(&to)) {
            self.graph.add_edge(a, b, dependence);
        }
    }

    pub fn callable(&self) -> CallableId {
        self.callable
    }

    pub fn entry(&self) -> NodeId {
        self.entry
    }

    pub fn exit(&self) -> NodeId {
        self.exit
    }

    pub fn formals(&self) -> &Formals {
        &self.formals
    }

    pub fn call_sites(&self) -> &[CallSiteNodes] {
        &self.call_sites
    }

    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.index.get(&id).map(|&idx| &self.graph[idx])
    }

    pub fn contains_node(&self, id: NodeId) -> bool {
        self.index.contains_key(&id)
    }

    /// Nodes in CFG creation order
    pub fn nodes(&self) -> impl Iterator<Item = &Node> + '_ {
        self.graph.node_weights()
    }

    /// `(from, to, dependence)`: control edges first, then data edges
    pub fn edges(&self) -> impl Iterator<Item = (NodeId, NodeId, &Dependence)> + '_ {
        self.graph.edge_references().map(move |e| {
            (
                self.graph[e.source()].id,
                self.graph[e.target()].id,
                e.weight(),
            )
        })
    }

    /// Incoming edges (what `id` depends on)
    pub fn dependencies(&self, id: NodeId) -> Vec<(NodeId, &Dependence)> {
        self.adjacent(id, Direction::Incoming)
    }

    /// Outgoing edges (what depends on `id`)
    pub fn dependents(&self, id: NodeId) -> Vec<(NodeId, &Dependence)> {
        self.adjacent(id, Direction::Outgoing)
    }

    fn adjacent(&self, id: NodeId, dir: Direction) -> Vec<(NodeId, &Dependence)> {
        let Some(&idx) = self.index.get(&id) else {
            return Vec::new();
        };
        let mut edges: Vec<_> = self.graph.edges_directed(idx, dir).collect();
        edges.sort_by_key(|e| e.id().index());
        edges
            .into_iter()
            .map(|e| {
                let other = if dir == Direction::Incoming {
                    e.source()
                } else {
                    e.target()
                };
                (self.graph[other].id, e.weight())
            })
            .collect()
    }

    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    pub fn stats(&self) -> PdgStats {
        let mut control_edges = 0;
        let mut data_edges = 0;
        for dep in self.graph.edge_weights() {
            match dep {
                Dependence::Control => control_edges += 1,
                Dependence::Data { .. } => data_edges += 1,
                _ => {}
            }
        }
        PdgStats {
            node_count: self.graph.node_count(),
            edge_count: self.graph.edge_count(),
            control_edges,
            data_edges,
        }
    }

    pub fn to_dto(&self) -> PdgDto {
        PdgDto {
            callable: self.callable,
            entry: self.entry,
            nodes: self
                .nodes()
                .map(|n| PdgNodeDto {
                    id: n.id,
                    kind: n.kind.as_str().to_string(),
                    label: n.short_label(),
                    defs: n.defs.clone(),
                    uses: n.uses.clone(),
                })
                .collect(),
            edges: self
                .edges()
                .map(|(from, to, dep)| PdgEdgeDto {
                    from,
                    to,
                    label: dep.to_string(),
                })
                .collect(),
        }
    }
}

/// PDG Statistics
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PdgStats {
    pub node_count: usize,
    pub edge_count: usize,
    pub control_edges: usize,
    pub data_edges: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PdgNodeDto {
    pub id: NodeId,
    pub kind: String,
    pub label: String,
    pub defs: Vec<String>,
    pub uses: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PdgEdgeDto {
    pub from: NodeId,
    pub to: NodeId,
    pub label: String,
}

/// Serializable DTO for ProgramDependenceGraph
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PdgDto {
    pub callable: CallableId,
    pub entry: NodeId,
    pub nodes: Vec<PdgNodeDto>,
    pub edges: Vec<PdgEdgeDto>,
}

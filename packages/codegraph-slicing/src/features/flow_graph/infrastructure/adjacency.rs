//! Index-based adjacency view of a CFG
//!
//! Flagged non-terminating loop headers get a pseudo edge to the exit
//! sequence, so every node of a well-formed CFG can reach exit here.

use fixedbitset::FixedBitSet;
use petgraph::visit::EdgeRef;

use crate::features::flow_graph::domain::ControlFlowGraph;
use crate::shared::models::NodeId;

#[derive(Debug, Clone)]
pub(crate) struct Adjacency {
    pub succs: Vec<Vec<usize>>,
    pub preds: Vec<Vec<usize>>,
    pub ids: Vec<NodeId>,
    pub entry: usize,
    pub exit: usize,
}

impl Adjacency {
    pub fn from_cfg(cfg: &ControlFlowGraph) -> Self {
        let graph = cfg.graph();
        let n = graph.node_count();
        let mut adj = Self {
            succs: vec![Vec::new(); n],
            preds: vec![Vec::new(); n],
            ids: graph.node_weights().map(|node| node.id).collect(),
            entry: cfg.entry_index().index(),
            exit: cfg.exit_index().index(),
        };

        for edge in graph.edge_references() {
            adj.add_edge(edge.source().index(), edge.target().index());
        }

        let exit_head = cfg.exit_head_index().index();
        for header in &cfg.non_terminating {
            if let Some(idx) = cfg.index_of(*header) {
                adj.add_edge(idx.index(), exit_head);
            }
        }
        adj
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    /// Add `a -> b` unless already present
    pub fn add_edge(&mut self, a: usize, b: usize) {
        if !self.succs[a].contains(&b) {
            self.succs[a].push(b);
            self.preds[b].push(a);
        }
    }

    /// Nodes reachable from `start`, following edges forward or backward
    pub fn reachable(&self, start: usize, forward: bool) -> FixedBitSet {
        let mut seen = FixedBitSet::with_capacity(self.len());
        let mut stack = vec![start];
        seen.insert(start);

        while let Some(v) = stack.pop() {
            let next = if forward { &self.succs[v] } else { &self.preds[v] };
            for &w in next {
                if !seen.put(w) {
                    stack.push(w);
                }
            }
        }
        seen
    }
}

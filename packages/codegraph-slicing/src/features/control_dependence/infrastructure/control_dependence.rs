//! Control-dependence edges of one CFG
//!
//! For every CFG edge A -> B where B does not post-dominate A, the nodes on
//! the post-dominator tree path from B up to (excluding) ipdom(A) are
//! control dependent on A. An extra entry -> exit edge makes entry the
//! controller of every always-executed node.

use rustc_hash::FxHashSet;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::errors::{Result, SlicingError};
use crate::features::control_dependence::infrastructure::post_dominator::PostDominatorTree;
use crate::features::flow_graph::domain::ControlFlowGraph;
use crate::features::flow_graph::infrastructure::adjacency::Adjacency;
use crate::shared::models::NodeId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ControlDependence {
    pub controller: NodeId,
    pub dependent: NodeId,
}

/// Compute control dependences, one per (controller, dependent) pair
pub fn analyze(cfg: &ControlFlowGraph) -> Result<Vec<ControlDependence>> {
    let callable = cfg.callable();
    let mut adj = Adjacency::from_cfg(cfg);
    adj.add_edge(adj.entry, adj.exit);
    let pdt = PostDominatorTree::compute(&adj);

    if let Some(v) = (0..adj.len()).find(|&v| v != adj.exit && pdt.ipdom(v).is_none()) {
        return Err(SlicingError::structural(
            callable,
            format!("node {} has no post-dominator", adj.ids[v]),
        ));
    }

    let mut seen = FxHashSet::default();
    let mut pairs = Vec::new();
    for a in 0..adj.len() {
        if adj.succs[a].len() < 2 {
            continue;
        }
        let stop = pdt.ipdom(a);
        for &b in &adj.succs[a] {
            let mut runner = Some(b);
            while let Some(r) = runner {
                if Some(r) == stop || r == adj.exit {
                    break;
                }
                if seen.insert((a, r)) {
                    pairs.push((a, r));
                }
                runner = pdt.ipdom(r);
            }
        }
    }

    let flagged: FxHashSet<NodeId> = cfg.non_terminating.iter().copied().collect();
    let mut edges = Vec::with_capacity(pairs.len());
    for (a, b) in pairs {
        let controller = adj.ids[a];
        let is_root = a == adj.entry;
        if !is_root && cfg.successors(controller).len() < 2 && !flagged.contains(&controller) {
            return Err(SlicingError::structural(
                callable,
                format!("control dependence source {} is not a branch", controller),
            ));
        }
        edges.push(ControlDependence {
            controller,
            dependent: adj.ids[b],
        });
    }

    debug!(callable = %callable, edges = edges.len(), "control dependence computed");
    Ok(edges)
}

//! Structural checks on a built CFG
//!
//! A failure here means the builder produced a malformed graph.

use petgraph::Direction;

use crate::errors::{Result, SlicingError};
use crate::features::flow_graph::domain::ControlFlowGraph;
use crate::features::flow_graph::infrastructure::adjacency::Adjacency;

/// Entry has no predecessors, every node is reachable from entry, and
/// every node reaches exit (flagged non-terminating loops count as reaching it).
pub fn check_structure(cfg: &ControlFlowGraph) -> Result<()> {
    let callable = cfg.callable();
    let graph = cfg.graph();

    if graph
        .neighbors_directed(cfg.entry_index(), Direction::Incoming)
        .next()
        .is_some()
    {
        return Err(SlicingError::structural(callable, "entry node has predecessors"));
    }

    let adjacency = Adjacency::from_cfg(cfg);
    let from_entry = adjacency.reachable(adjacency.entry, true);
    if !from_entry.contains(adjacency.exit) {
        return Err(SlicingError::structural(callable, "exit not reachable from entry"));
    }
    if let Some(v) = (0..adjacency.len()).find(|&v| !from_entry.contains(v)) {
        return Err(SlicingError::structural(
            callable,
            format!("node {} not reachable from entry", adjacency.ids[v]),
        ));
    }

    let to_exit = adjacency.reachable(adjacency.exit, false);
    if let Some(v) = (0..adjacency.len()).find(|&v| !to_exit.contains(v)) {
        return Err(SlicingError::structural(
            callable,
            format!("node {} cannot reach exit and is not in a flagged loop", adjacency.ids[v]),
        ));
    }

    Ok(())
}

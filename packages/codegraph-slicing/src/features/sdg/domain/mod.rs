//! SDG bookkeeping types, statistics and export DTO

use serde::{Deserialize, Serialize};

use crate::shared::models::{CallSiteId, CallableId, NodeId, OutputSlot};

/// Interface nodes of one callable inside the SDG
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Procedure {
    pub callable: CallableId,
    pub entry: NodeId,
    pub exit: NodeId,
    pub has_body: bool,
    /// Positional
    pub formal_ins: Vec<NodeId>,
    pub formal_outs: Vec<(OutputSlot, NodeId)>,
}

impl Procedure {
    pub fn formal_out(&self, slot: OutputSlot) -> Option<NodeId> {
        self.formal_outs
            .iter()
            .find(|(s, _)| *s == slot)
            .map(|(_, id)| *id)
    }

    pub fn formal_position(&self, node: NodeId) -> Option<usize> {
        self.formal_ins.iter().position(|&n| n == node)
    }
}

/// One call site with its resolved targets
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallSiteRecord {
    pub call_site: CallSiteId,
    pub caller: CallableId,
    pub call_node: NodeId,
    /// Positional
    pub actual_ins: Vec<NodeId>,
    pub actual_outs: Vec<(OutputSlot, NodeId)>,
    pub targets: Vec<CallableId>,
    /// Resolved targets dropped from the call graph after failing analysis
    pub excluded_targets: Vec<CallableId>,
    /// No target has a body to descend into, or some target was excluded
    pub opaque: bool,
}

impl CallSiteRecord {
    pub fn actual_out(&self, slot: OutputSlot) -> Option<NodeId> {
        self.actual_outs
            .iter()
            .find(|(s, _)| *s == slot)
            .map(|(_, id)| *id)
    }
}

/// Outcome of the summary-edge fixed point
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SummaryStats {
    /// Rounds run, including the final one that added nothing
    pub rounds: usize,
    pub edges_added: usize,
    /// Conservative edges at calls with no analyzable target
    pub opaque_edges: usize,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SdgStats {
    pub procedures: usize,
    pub call_sites: usize,
    pub nodes: usize,
    pub control_edges: usize,
    pub data_edges: usize,
    pub call_edges: usize,
    pub param_in_edges: usize,
    pub param_out_edges: usize,
    pub summary_edges: usize,
}

impl SdgStats {
    pub fn total_edges(&self) -> usize {
        self.control_edges
            + self.data_edges
            + self.call_edges
            + self.param_in_edges
            + self.param_out_edges
            + self.summary_edges
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SdgNodeDto {
    pub id: NodeId,
    pub callable: CallableId,
    pub kind: String,
    pub label: String,
    pub line: Option<u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SdgEdgeDto {
    pub from: NodeId,
    pub to: NodeId,
    pub kind: String,
    pub label: String,
}

/// Export form for external renderers
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SdgDto {
    pub nodes: Vec<SdgNodeDto>,
    pub edges: Vec<SdgEdgeDto>,
    pub stats: SdgStats,
}

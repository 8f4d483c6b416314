//! Pipeline result

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;

use crate::config::SlicingConfig;
use crate::errors::Result;
use crate::features::call_graph::CallGraph;
use crate::features::flow_graph::ControlFlowGraph;
use crate::features::pdg::ProgramDependenceGraph;
use crate::features::sdg::{SdgStats, SummaryStats, SystemDependenceGraph};
use crate::features::slicing::{ProgramSlicer, Slice, SlicingCriterion};
use crate::features::type_hierarchy::TypeHierarchyIndex;
use crate::shared::models::CallableId;

/// A callable left out of the call graph and SDG
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallableFailure {
    pub callable: CallableId,
    pub error: String,
}

/// Timing of one run
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PipelineStats {
    /// In execution order
    pub stage_durations: Vec<(String, Duration)>,
    pub total_duration: Duration,
    pub callables: usize,
    pub callables_failed: usize,
}

impl PipelineStats {
    pub fn record_stage(&mut self, stage: &str, duration: Duration) {
        self.stage_durations.push((stage.to_string(), duration));
    }

    pub fn stage_duration(&self, stage: &str) -> Option<Duration> {
        self.stage_durations
            .iter()
            .find(|(name, _)| name == stage)
            .map(|(_, d)| *d)
    }
}

/// Serializable overview of a run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportSummary {
    pub callables: usize,
    pub failures: Vec<CallableFailure>,
    pub call_graph_edges: usize,
    pub sdg: SdgStats,
    pub summary: SummaryStats,
}

/// Everything one analysis run produced.
///
/// The SDG is read-only from here on; slicers borrow it.
#[derive(Debug)]
pub struct AnalysisReport {
    pub hierarchy: TypeHierarchyIndex,
    pub cfgs: BTreeMap<CallableId, ControlFlowGraph>,
    pub pdgs: BTreeMap<CallableId, ProgramDependenceGraph>,
    pub call_graph: CallGraph,
    pub sdg: SystemDependenceGraph,
    /// Empty unless the run was configured with `fail_fast = false`
    pub failures: Vec<CallableFailure>,
    pub stats: PipelineStats,
    pub(crate) slicing: SlicingConfig,
}

impl AnalysisReport {
    /// Slicer over this run's SDG with the run's slicing configuration
    pub fn slicer(&self) -> Result<ProgramSlicer<'_>> {
        ProgramSlicer::new(&self.sdg, self.slicing.clone())
    }

    /// One-off slice in the configured direction
    pub fn slice(&self, criterion: &SlicingCriterion) -> Result<Slice> {
        self.slicer()?.slice(criterion)
    }

    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }

    pub fn summary(&self) -> ReportSummary {
        ReportSummary {
            callables: self.stats.callables,
            failures: self.failures.clone(),
            call_graph_edges: self.call_graph.edge_count(),
            sdg: self.sdg.stats(),
            summary: self.sdg.summary_stats(),
        }
    }
}

//! Slicing pipeline orchestrator
//!
//! ```text
//! ┌───────────────────────────────────────────────────────────────┐
//! │                   SlicingPipeline::run()                      │
//! ├───────────────────────────────────────────────────────────────┤
//! │  1. Type hierarchy index (whole program, then frozen)         │
//! │  2. Per callable, in parallel:                                │
//! │       CFG → structural check → control / data dependence      │
//! │  3. Call graph (call sites resolved against the CFGs)         │
//! │  4. PDG assembly, in parallel                                 │
//! │  5. SDG: interprocedural edges + summary fixed point          │
//! └───────────────────────────────────────────────────────────────┘
//! ```
//!
//! Every stage ends at a join; nothing from stage N+1 reads a
//! half-built result of stage N.

use rayon::prelude::*;
use std::collections::BTreeMap;
use std::time::Instant;
use tracing::{debug, info, warn};

use crate::config::{ConfigValidator, PipelineConfig};
use crate::errors::Result;
use crate::features::call_graph::CallGraphBuilder;
use crate::features::control_dependence::{self, ControlDependence};
use crate::features::data_flow::{self, DataDependence};
use crate::features::flow_graph::{check_structure, CfgBuilder, ControlFlowGraph};
use crate::features::pdg::ProgramDependenceGraph;
use crate::features::sdg::SdgBuilder;
use crate::features::type_hierarchy::TypeHierarchyIndex;
use crate::pipeline::report::{AnalysisReport, CallableFailure, PipelineStats};
use crate::shared::models::{CallableDecl, CallableId, Program};
use crate::shared::utils::NodeIdGenerator;

/// Intraprocedural results of one callable
struct LocalAnalysis {
    cfg: ControlFlowGraph,
    control: Vec<ControlDependence>,
    data: Vec<DataDependence>,
}

pub struct SlicingPipeline {
    config: PipelineConfig,
}

impl SlicingPipeline {
    pub fn new(config: PipelineConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Parse a JSON program model and analyze it
    pub fn run_json(&self, json: &str) -> Result<AnalysisReport> {
        let program = Program::from_json(json)?;
        self.run(&program)
    }

    /// Analyze `program` on a dedicated worker pool
    pub fn run(&self, program: &Program) -> Result<AnalysisReport> {
        ConfigValidator::validate(&self.config)?;

        let parallel = &self.config.parallel;
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(parallel.effective_workers())
            .stack_size(parallel.stack_size_mb * 1024 * 1024)
            .thread_name(|i| format!("codegraph-slicing-worker-{}", i))
            .build()?;

        pool.install(|| self.run_stages(program))
    }

    fn run_stages(&self, program: &Program) -> Result<AnalysisReport> {
        let total_start = Instant::now();
        let mut stats = PipelineStats {
            callables: program.callables.len(),
            ..PipelineStats::default()
        };

        // Stage 1: type hierarchy
        let start = Instant::now();
        let hierarchy = TypeHierarchyIndex::build(program)?;
        stats.record_stage("type_hierarchy", start.elapsed());
        info!(
            types = hierarchy.type_count(),
            callables = program.callables.len(),
            "type hierarchy ready"
        );

        // Stage 2: per-callable CFG and dependences
        let start = Instant::now();
        let ids = NodeIdGenerator::new();
        let cfg_builder = CfgBuilder::new(&ids, &hierarchy);
        let outcomes: Vec<(CallableId, Result<LocalAnalysis>)> = program
            .callables
            .par_iter()
            .map(|decl| (decl.id, analyze_callable(&cfg_builder, decl)))
            .collect();

        let mut locals = BTreeMap::new();
        let mut failures = Vec::new();
        for (callable, outcome) in outcomes {
            match outcome {
                Ok(local) => {
                    locals.insert(callable, local);
                }
                Err(e) if self.config.fail_fast => return Err(e),
                Err(e) => {
                    warn!(callable = %callable, error = %e, "callable excluded from analysis");
                    failures.push(CallableFailure {
                        callable,
                        error: e.to_string(),
                    });
                }
            }
        }
        stats.callables_failed = failures.len();
        stats.record_stage("intraprocedural", start.elapsed());
        info!(
            analyzed = locals.len(),
            failed = failures.len(),
            nodes = ids.issued(),
            "intraprocedural analysis done"
        );

        // Stage 3: call graph
        let start = Instant::now();
        let call_graph = CallGraphBuilder::new(&hierarchy)
            .exclude(failures.iter().map(|f| f.callable))
            .build(locals.values().map(|l| &l.cfg))?;
        stats.record_stage("call_graph", start.elapsed());
        info!(
            vertices = call_graph.vertex_count(),
            edges = call_graph.edge_count(),
            "call graph ready"
        );

        // Stage 4: PDGs
        let start = Instant::now();
        let pdgs: BTreeMap<CallableId, ProgramDependenceGraph> = locals
            .par_iter()
            .map(|(&callable, local)| {
                (
                    callable,
                    ProgramDependenceGraph::assemble(&local.cfg, &local.control, &local.data),
                )
            })
            .collect();
        stats.record_stage("pdg", start.elapsed());

        // Stage 5: SDG
        let start = Instant::now();
        let sdg = SdgBuilder::new(&self.config.sdg).build(&pdgs, &call_graph, &hierarchy)?;
        stats.record_stage("sdg", start.elapsed());
        let sdg_stats = sdg.stats();
        info!(
            nodes = sdg_stats.nodes,
            edges = sdg_stats.total_edges(),
            summary_edges = sdg_stats.summary_edges,
            rounds = sdg.summary_stats().rounds,
            "SDG ready"
        );

        stats.total_duration = total_start.elapsed();
        let cfgs = locals.into_iter().map(|(id, local)| (id, local.cfg)).collect();
        Ok(AnalysisReport {
            hierarchy,
            cfgs,
            pdgs,
            call_graph,
            sdg,
            failures,
            stats,
            slicing: self.config.slicing.clone(),
        })
    }
}

fn analyze_callable(builder: &CfgBuilder<'_>, decl: &CallableDecl) -> Result<LocalAnalysis> {
    let cfg = builder.build(decl)?;
    check_structure(&cfg)?;
    let control = control_dependence::analyze(&cfg)?;
    let data = data_flow::analyze(&cfg);
    debug!(
        callable = %decl.id,
        nodes = cfg.node_count(),
        control = control.len(),
        data = data.len(),
        "callable analyzed"
    );
    Ok(LocalAnalysis { cfg, control, data })
}

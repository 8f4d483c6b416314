//! Sequential SDG assembly for unit tests

use std::collections::BTreeMap;

use crate::config::SdgConfig;
use crate::errors::Result;
use crate::features::call_graph::CallGraphBuilder;
use crate::features::flow_graph::CfgBuilder;
use crate::features::pdg::ProgramDependenceGraph;
use crate::features::sdg::infrastructure::sdg::{SdgBuilder, SystemDependenceGraph};
use crate::features::type_hierarchy::TypeHierarchyIndex;
use crate::features::{control_dependence, data_flow};
use crate::shared::models::Program;
use crate::shared::utils::NodeIdGenerator;

pub(crate) fn assemble(program: &Program, config: &SdgConfig) -> Result<SystemDependenceGraph> {
    let hierarchy = TypeHierarchyIndex::build(program)?;
    let ids = NodeIdGenerator::new();
    let builder = CfgBuilder::new(&ids, &hierarchy);

    let mut cfgs = Vec::new();
    let mut pdgs = BTreeMap::new();
    for decl in &program.callables {
        let cfg = builder.build(decl)?;
        let cd = control_dependence::analyze(&cfg)?;
        let dd = data_flow::analyze(&cfg);
        pdgs.insert(decl.id, ProgramDependenceGraph::assemble(&cfg, &cd, &dd));
        cfgs.push(cfg);
    }
    let call_graph = CallGraphBuilder::new(&hierarchy).build(&cfgs)?;
    SdgBuilder::new(config).build(&pdgs, &call_graph, &hierarchy)
}

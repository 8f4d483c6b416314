//! Pipeline stages, one feature per stage
//!
//! Type hierarchy → CFG → control / data dependence → call graph → PDG → SDG → slicer.

pub mod call_graph;
pub mod control_dependence;
pub mod data_flow;
pub mod flow_graph;
pub mod pdg;
pub mod sdg;
pub mod slicing;
pub mod type_hierarchy;

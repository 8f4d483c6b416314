//! Control-flow graphs, one per callable

pub mod domain;
pub mod infrastructure;

pub use domain::{CallSiteNodes, ControlFlowGraph, Formals};
pub use infrastructure::cfg_builder::CfgBuilder;
pub use infrastructure::validation::check_structure;

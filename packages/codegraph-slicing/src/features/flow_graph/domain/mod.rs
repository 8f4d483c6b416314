pub mod cfg;

pub use cfg::{CallSiteNodes, CfgDto, ControlFlowGraph, Formals};

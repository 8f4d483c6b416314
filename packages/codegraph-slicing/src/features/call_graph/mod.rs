//! Whole-program call graph with polymorphic call resolution

pub mod domain;
pub mod infrastructure;

pub use domain::{CallEdge, CallGraph, CallGraphDto};
pub use infrastructure::builder::CallGraphBuilder;

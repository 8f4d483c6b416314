//! Per-callable Program Dependence Graphs

pub mod infrastructure;

pub use infrastructure::pdg::{PdgDto, PdgStats, ProgramDependenceGraph};

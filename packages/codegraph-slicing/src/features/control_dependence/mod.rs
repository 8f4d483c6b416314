//! Control dependence via post-dominance (Ferrante, Ottenstein, Warren 1987)

pub mod infrastructure;

pub use infrastructure::control_dependence::{analyze, ControlDependence};
pub use infrastructure::post_dominator::PostDominatorTree;

//! Data dependence via reaching definitions

pub mod domain;
pub mod infrastructure;

pub use domain::DataDependence;
pub use infrastructure::reaching_definitions::{analyze, ReachingDefinitions};

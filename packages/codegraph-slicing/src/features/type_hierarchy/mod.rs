//! Type Hierarchy Index
//!
//! Built once from the program's type and callable declarations, then
//! read-only for the rest of the run.

pub mod infrastructure;
pub mod ports;

pub use infrastructure::index::{DeclarationInfo, ExceptionMatch, TypeHierarchyIndex};
pub use ports::TypeHierarchy;

//! System Dependence Graph: all PDGs plus interprocedural edges

pub mod domain;
pub mod infrastructure;

pub use domain::{CallSiteRecord, Procedure, SdgDto, SdgStats, SummaryStats};
pub use infrastructure::sdg::{SdgBuilder, SystemDependenceGraph};
pub use infrastructure::summary::{add_opaque_summaries, compute_summary_edges};

//! End-to-end analysis: program model in, SDG and slicer out

pub mod orchestrator;
pub mod report;

pub use orchestrator::SlicingPipeline;
pub use report::{AnalysisReport, CallableFailure, PipelineStats, ReportSummary};

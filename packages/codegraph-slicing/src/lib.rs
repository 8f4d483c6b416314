/*
 * Codegraph Slicing - Interprocedural Program Slicing
 *
 * Feature-First Architecture:
 * - shared/      : Program model, analysis nodes and edges, id generation
 * - features/    : One vertical slice per stage
 *                  (type hierarchy → cfg → control / data dependence →
 *                   call graph → pdg → sdg → slicing)
 * - pipeline/    : Orchestration on a dedicated Rayon pool
 * - config/      : Presets, stage configs, YAML
 *
 * The front-end hands over a resolved program model; no parsing happens here.
 */

#![allow(clippy::module_inception)] // features::sdg::infrastructure::sdg
#![allow(clippy::new_without_default)] // Builders take their collaborators

// ═══════════════════════════════════════════════════════════════════════════
// Module Exports
// ═══════════════════════════════════════════════════════════════════════════

pub mod config;
pub mod errors;
pub mod features;
pub mod pipeline;
pub mod shared;

pub use config::{PipelineConfig, Preset};
pub use errors::{ResolutionError, Result, SlicingError};
pub use features::sdg::SystemDependenceGraph;
pub use features::slicing::{
    ProgramSlicer, Slice, SliceDirection, SliceStrategy, SlicerPort, SlicingCriterion,
};
pub use pipeline::{AnalysisReport, SlicingPipeline};
pub use shared::models::{NodeId, Program};

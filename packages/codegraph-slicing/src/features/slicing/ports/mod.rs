//! Slicing Ports
//!
//! Implementation: see `infrastructure/slicer.rs`

use crate::errors::Result;
use crate::features::slicing::domain::{Slice, SlicingCriterion};

// ═══════════════════════════════════════════════════════════════════════════
// Slicer Port - Primary Interface
// ═══════════════════════════════════════════════════════════════════════════

/// Slicing queries over a read-only dependence graph.
///
/// Implementors take `&self` so that one slicer can serve concurrent queries.
pub trait SlicerPort: Send + Sync {
    /// Nodes that may influence the criterion
    fn backward_slice(&self, criterion: &SlicingCriterion) -> Result<Slice>;

    /// Nodes the criterion may influence
    fn forward_slice(&self, criterion: &SlicingCriterion) -> Result<Slice>;

    /// Backward slice over data dependences only.
    ///
    /// Based on Sridharan et al. "Thin Slicing" (PLDI 2007)
    fn thin_slice(&self, criterion: &SlicingCriterion) -> Result<Slice>;

    /// Nodes on dependence paths from `source` to `target`.
    ///
    /// Based on Jackson & Rollins "Chopping" (FSE 1994)
    fn chop(&self, source: &SlicingCriterion, target: &SlicingCriterion) -> Result<Slice>;
}

//! Program slicing over the System Dependence Graph

pub mod domain;
pub mod infrastructure;
pub mod ports;

pub use domain::{
    CriterionLocation, Slice, SliceDirection, SliceDto, SliceEdge, SliceStrategy,
    SlicingCriterion,
};
pub use infrastructure::slicer::{ProgramSlicer, SlicerStats};
pub use ports::SlicerPort;

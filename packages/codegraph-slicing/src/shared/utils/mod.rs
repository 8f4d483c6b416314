//! Shared utilities

pub mod id_generator;
pub mod program_builder;

pub use id_generator::NodeIdGenerator;
pub use program_builder::ProgramBuilder;

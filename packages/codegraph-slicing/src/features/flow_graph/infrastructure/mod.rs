pub(crate) mod adjacency;
pub mod cfg_builder;
pub mod validation;

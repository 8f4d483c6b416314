//! Configuration system
//!
//! Three levels, same as the rest of codegraph:
//! - a [`Preset`] for the common cases,
//! - per-stage overrides through builder closures,
//! - a versioned YAML document for complete control.
//!
//! ```rust,ignore
//! use codegraph_slicing::config::{PipelineConfig, Preset};
//!
//! let config = PipelineConfig::preset(Preset::Balanced)
//!     .slicing(|c| c.include_control(false))
//!     .build()?;
//! ```

pub mod error;
pub mod io;
pub mod pipeline_config;
pub mod preset;
pub mod stage_configs;
pub mod validation;

pub use error::{ConfigError, ConfigResult};
pub use pipeline_config::PipelineConfig;
pub use preset::Preset;
pub use stage_configs::{ParallelConfig, SdgConfig, SlicingConfig};
pub use validation::{ConfigValidator, Validatable};

//! Configuration validation

use super::error::{ConfigError, ConfigResult};
use super::pipeline_config::PipelineConfig;
use super::stage_configs::{ParallelConfig, SdgConfig, SlicingConfig};
use crate::features::slicing::domain::SliceStrategy;

// ═══════════════════════════════════════════════════════════════════════════
// Validatable Trait
// ═══════════════════════════════════════════════════════════════════════════

/// Trait for validatable configuration objects
pub trait Validatable {
    /// Returns `Ok(())` if valid, `Err(ConfigError)` with details if invalid.
    fn validate(&self) -> ConfigResult<()>;

    /// Get the configuration name for error messages
    fn config_name(&self) -> &'static str {
        "Config"
    }
}

impl Validatable for ParallelConfig {
    fn validate(&self) -> ConfigResult<()> {
        ParallelConfig::validate(self)
    }

    fn config_name(&self) -> &'static str {
        "ParallelConfig"
    }
}

impl Validatable for SdgConfig {
    fn validate(&self) -> ConfigResult<()> {
        SdgConfig::validate(self)
    }

    fn config_name(&self) -> &'static str {
        "SdgConfig"
    }
}

impl Validatable for SlicingConfig {
    fn validate(&self) -> ConfigResult<()> {
        SlicingConfig::validate(self)
    }

    fn config_name(&self) -> &'static str {
        "SlicingConfig"
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// Cross-stage validation
// ═══════════════════════════════════════════════════════════════════════════

/// Validates each stage, then the combinations between stages
pub struct ConfigValidator;

impl ConfigValidator {
    pub fn validate(config: &PipelineConfig) -> ConfigResult<()> {
        let stages: [&dyn Validatable; 3] = [&config.parallel, &config.sdg, &config.slicing];
        for stage in stages {
            stage.validate()?;
        }
        Self::validate_cross_stage(config)
    }

    fn validate_cross_stage(config: &PipelineConfig) -> ConfigResult<()> {
        if config.slicing.strategy == SliceStrategy::TwoPhase && !config.sdg.summary_edges {
            return Err(ConfigError::conflict(
                "slicing.strategy = two_phase but sdg.summary_edges = false",
                "enable sdg.summary_edges or use the closure strategy",
            ));
        }
        Ok(())
    }
}

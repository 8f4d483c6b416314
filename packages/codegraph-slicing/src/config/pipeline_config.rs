//! Pipeline configuration
//!
//! Preset-based defaults with per-stage overrides, from code or YAML.

use serde::{Deserialize, Serialize};
use std::path::Path;

use super::error::{ConfigError, ConfigResult};
use super::io::{ConfigFileV1, ConfigOverrides, SUPPORTED_VERSIONS};
use super::preset::Preset;
use super::stage_configs::{ParallelConfig, SdgConfig, SlicingConfig};
use super::validation::ConfigValidator;

/// Complete configuration for one analysis run
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub preset: Preset,
    pub parallel: ParallelConfig,
    pub sdg: SdgConfig,
    pub slicing: SlicingConfig,
    /// Abort the run on the first per-callable failure
    pub fail_fast: bool,
}

impl PipelineConfig {
    /// Start from a preset
    pub fn preset(preset: Preset) -> Self {
        Self {
            preset,
            parallel: ParallelConfig::from_preset(preset),
            sdg: SdgConfig::from_preset(preset),
            slicing: SlicingConfig::from_preset(preset),
            fail_fast: true,
        }
    }

    /// Override parallel settings
    pub fn parallel(mut self, f: impl FnOnce(ParallelConfig) -> ParallelConfig) -> Self {
        self.parallel = f(self.parallel);
        self
    }

    /// Override SDG settings
    pub fn sdg(mut self, f: impl FnOnce(SdgConfig) -> SdgConfig) -> Self {
        self.sdg = f(self.sdg);
        self
    }

    /// Override slicing settings
    pub fn slicing(mut self, f: impl FnOnce(SlicingConfig) -> SlicingConfig) -> Self {
        self.slicing = f(self.slicing);
        self
    }

    pub fn fail_fast(mut self, v: bool) -> Self {
        self.fail_fast = v;
        self
    }

    /// Validate and return the configuration
    pub fn build(self) -> ConfigResult<Self> {
        self.validate()?;
        Ok(self)
    }

    pub fn validate(&self) -> ConfigResult<()> {
        ConfigValidator::validate(self)
    }

    fn apply_overrides(mut self, overrides: ConfigOverrides) -> Self {
        if let Some(parallel) = overrides.parallel {
            self.parallel = parallel;
        }
        if let Some(sdg) = overrides.sdg {
            self.sdg = sdg;
        }
        if let Some(slicing) = overrides.slicing {
            self.slicing = slicing;
        }
        if let Some(fail_fast) = overrides.fail_fast {
            self.fail_fast = fail_fast;
        }
        self
    }

    /// Load from a YAML v1 document
    pub fn from_yaml_str(yaml: &str) -> ConfigResult<Self> {
        let file: ConfigFileV1 = serde_yaml::from_str(yaml)?;
        if !SUPPORTED_VERSIONS.contains(&file.version) {
            return Err(ConfigError::UnsupportedVersion {
                found: file.version,
                supported: SUPPORTED_VERSIONS.to_vec(),
            });
        }

        let preset = Preset::parse(&file.preset)?;
        let config = Self::preset(preset).apply_overrides(file.overrides.unwrap_or_default());
        config.build()
    }

    /// Load from a YAML v1 file
    pub fn from_yaml_file(path: impl AsRef<Path>) -> ConfigResult<Self> {
        let yaml = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&yaml)
    }

    /// Export as a YAML v1 document with every stage spelled out
    pub fn to_yaml_string(&self) -> ConfigResult<String> {
        let file = ConfigFileV1 {
            version: 1,
            preset: self.preset.as_str().to_string(),
            overrides: Some(ConfigOverrides {
                parallel: Some(self.parallel.clone()),
                sdg: Some(self.sdg.clone()),
                slicing: Some(self.slicing.clone()),
                fail_fast: Some(self.fail_fast),
            }),
        };
        Ok(serde_yaml::to_string(&file)?)
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self::preset(Preset::Balanced)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::slicing::domain::{SliceDirection, SliceStrategy};

    #[test]
    fn test_builder_overrides() {
        let config = PipelineConfig::preset(Preset::Fast)
            .slicing(|c| c.include_control(false).direction(SliceDirection::Forward))
            .parallel(|c| c.num_workers(2))
            .build()
            .unwrap();

        assert!(!config.slicing.include_control);
        assert_eq!(config.slicing.direction, SliceDirection::Forward);
        assert_eq!(config.parallel.num_workers, 2);
        assert!(!config.sdg.summary_edges);
    }

    #[test]
    fn test_build_rejects_invalid() {
        let result = PipelineConfig::default()
            .sdg(|c| c.max_summary_rounds(0))
            .build();
        assert!(result.is_err());
    }

    #[test]
    fn test_from_yaml() {
        let yaml = r#"
version: 1
preset: thorough
overrides:
  slicing:
    strategy: closure
    include_control: false
  fail_fast: false
"#;
        let config = PipelineConfig::from_yaml_str(yaml).unwrap();
        assert_eq!(config.preset, Preset::Thorough);
        assert_eq!(config.slicing.strategy, SliceStrategy::Closure);
        assert!(!config.slicing.include_control);
        assert!(!config.fail_fast);
        assert_eq!(config.sdg.max_summary_rounds, 10_000);
    }

    #[test]
    fn test_unsupported_version() {
        let result = PipelineConfig::from_yaml_str("version: 2\n");
        assert!(matches!(result, Err(ConfigError::UnsupportedVersion { found: 2, .. })));
    }

    #[test]
    fn test_yaml_roundtrip() {
        let config = PipelineConfig::preset(Preset::Thorough).fail_fast(false);
        let yaml = config.to_yaml_string().unwrap();
        let loaded = PipelineConfig::from_yaml_str(&yaml).unwrap();
        assert_eq!(loaded.slicing.strategy, SliceStrategy::TwoPhase);
        assert_eq!(loaded.sdg.max_summary_rounds, config.sdg.max_summary_rounds);
        assert!(!loaded.fail_fast);
    }
}

//! Stage-specific configurations
//!
//! Each stage config is `#[serde(default)]`, so partial YAML overrides only
//! need to name the fields they change.

use serde::{Deserialize, Serialize};

use super::error::{ConfigError, ConfigResult};
use super::preset::Preset;
use crate::features::slicing::domain::{SliceDirection, SliceStrategy};

// ============================================================================
// Parallel Processing Configuration
// ============================================================================

/// Worker pool used for per-callable analysis and summary rounds
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ParallelConfig {
    /// Number of workers (0=auto, 1..=256)
    pub num_workers: usize,

    /// Enable Rayon parallel iterator (false = one worker)
    pub enable_rayon: bool,

    /// Thread stack size in MB (1..=64)
    pub stack_size_mb: usize,
}

impl ParallelConfig {
    /// Validate configuration
    pub fn validate(&self) -> ConfigResult<()> {
        if self.num_workers > 256 {
            return Err(ConfigError::range_with_hint(
                "num_workers",
                self.num_workers,
                0,
                256,
                "Number of workers must be reasonable (0=auto)",
            ));
        }

        if self.stack_size_mb < 1 || self.stack_size_mb > 64 {
            return Err(ConfigError::range_with_hint(
                "stack_size_mb",
                self.stack_size_mb,
                1,
                64,
                "Stack size must be reasonable",
            ));
        }

        Ok(())
    }

    /// Worker count after resolving `0` to the number of CPUs
    pub fn effective_workers(&self) -> usize {
        if !self.enable_rayon {
            1
        } else if self.num_workers == 0 {
            num_cpus::get()
        } else {
            self.num_workers
        }
    }

    /// Get preset configuration
    pub fn from_preset(preset: Preset) -> Self {
        match preset {
            Preset::Fast | Preset::Balanced => Self {
                num_workers: 0,
                enable_rayon: true,
                stack_size_mb: 8,
            },
            Preset::Thorough => Self {
                num_workers: 0,
                enable_rayon: true,
                stack_size_mb: 16,
            },
        }
    }

    /// Builder: Set num_workers
    pub fn num_workers(mut self, v: usize) -> Self {
        self.num_workers = v;
        self
    }

    /// Builder: Set enable_rayon
    pub fn enable_rayon(mut self, v: bool) -> Self {
        self.enable_rayon = v;
        self
    }

    /// Builder: Set stack_size_mb
    pub fn stack_size_mb(mut self, v: usize) -> Self {
        self.stack_size_mb = v;
        self
    }
}

impl Default for ParallelConfig {
    fn default() -> Self {
        Self::from_preset(Preset::Balanced)
    }
}

// ============================================================================
// SDG Configuration
// ============================================================================

/// System Dependence Graph assembly
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SdgConfig {
    /// Compute summary edges at call sites (default: true)
    pub summary_edges: bool,

    /// Round cap for the summary-edge fixed point (1..=100000)
    pub max_summary_rounds: usize,
}

impl SdgConfig {
    /// Validate configuration
    pub fn validate(&self) -> ConfigResult<()> {
        if self.max_summary_rounds == 0 || self.max_summary_rounds > 100_000 {
            return Err(ConfigError::range_with_hint(
                "max_summary_rounds",
                self.max_summary_rounds,
                1,
                100_000,
                "Summary fixed point needs at least one round",
            ));
        }
        Ok(())
    }

    /// Get preset configuration
    pub fn from_preset(preset: Preset) -> Self {
        match preset {
            Preset::Fast => Self {
                summary_edges: false,
                max_summary_rounds: 1_000,
            },
            Preset::Balanced => Self {
                summary_edges: true,
                max_summary_rounds: 1_000,
            },
            Preset::Thorough => Self {
                summary_edges: true,
                max_summary_rounds: 10_000,
            },
        }
    }

    /// Builder: Set summary_edges
    pub fn summary_edges(mut self, v: bool) -> Self {
        self.summary_edges = v;
        self
    }

    /// Builder: Set max_summary_rounds
    pub fn max_summary_rounds(mut self, v: usize) -> Self {
        self.max_summary_rounds = v;
        self
    }
}

impl Default for SdgConfig {
    fn default() -> Self {
        Self::from_preset(Preset::Balanced)
    }
}

// ============================================================================
// Slicing Configuration
// ============================================================================

/// Slicer traversal settings
///
/// Reference: Horwitz, Reps, Binkley, "Interprocedural Slicing Using
/// Dependence Graphs", TOPLAS 1990
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SlicingConfig {
    /// Backward (what influences the criterion) or forward (what it influences)
    pub direction: SliceDirection,

    /// Plain closure or two-phase context-sensitive traversal
    pub strategy: SliceStrategy,

    /// Include control dependencies (false = Thin Slicing)
    pub include_control: bool,

    /// Follow summary edges during traversal
    pub use_summary_edges: bool,

    /// LRU cache capacity (0 = disabled)
    pub cache_capacity: usize,
}

impl SlicingConfig {
    /// Validate configuration
    pub fn validate(&self) -> ConfigResult<()> {
        if self.cache_capacity > 100_000 {
            return Err(ConfigError::range_with_hint(
                "cache_capacity",
                self.cache_capacity,
                0,
                100_000,
                "Slice cache must be reasonable (0=disabled)",
            ));
        }

        if self.strategy == SliceStrategy::TwoPhase && !self.use_summary_edges {
            return Err(ConfigError::conflict(
                "two-phase slicing cannot step over calls without summary edges",
                "set slicing.use_summary_edges = true or slicing.strategy = closure",
            ));
        }

        Ok(())
    }

    /// Get preset configuration
    pub fn from_preset(preset: Preset) -> Self {
        match preset {
            Preset::Fast => Self {
                direction: SliceDirection::Backward,
                strategy: SliceStrategy::Closure,
                include_control: true,
                use_summary_edges: false,
                cache_capacity: 0,
            },
            Preset::Balanced => Self {
                direction: SliceDirection::Backward,
                strategy: SliceStrategy::Closure,
                include_control: true,
                use_summary_edges: true,
                cache_capacity: 256,
            },
            Preset::Thorough => Self {
                direction: SliceDirection::Backward,
                strategy: SliceStrategy::TwoPhase,
                include_control: true,
                use_summary_edges: true,
                cache_capacity: 1024,
            },
        }
    }

    /// Builder: Set direction
    pub fn direction(mut self, v: SliceDirection) -> Self {
        self.direction = v;
        self
    }

    /// Builder: Set strategy
    pub fn strategy(mut self, v: SliceStrategy) -> Self {
        self.strategy = v;
        self
    }

    /// Builder: Set include_control
    pub fn include_control(mut self, v: bool) -> Self {
        self.include_control = v;
        self
    }

    /// Builder: Set use_summary_edges
    pub fn use_summary_edges(mut self, v: bool) -> Self {
        self.use_summary_edges = v;
        self
    }

    /// Builder: Set cache_capacity
    pub fn cache_capacity(mut self, v: usize) -> Self {
        self.cache_capacity = v;
        self
    }
}

impl Default for SlicingConfig {
    fn default() -> Self {
        Self::from_preset(Preset::Balanced)
    }
}

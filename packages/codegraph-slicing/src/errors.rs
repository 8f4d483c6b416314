//! Error types for codegraph-slicing
//!
//! Every stage of the pipeline returns [`SlicingError`]. None of them is
//! downgraded into a partial slice.

use thiserror::Error;

use crate::config::ConfigError;
use crate::shared::models::{CallSiteId, CallableId, TypeId};

/// Failure to resolve a call, callable or type against the front-end's model
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResolutionError {
    /// Virtual call whose receiver type has no declaration of the signature
    #[error("call site {call_site} ({signature}) resolves to no dispatch target")]
    NoDispatchTarget {
        call_site: CallSiteId,
        signature: String,
    },

    /// A call graph edge references a call site missing from its caller's graph
    #[error("call site {call_site} not found in callable {callable}")]
    CallNodeNotFound {
        call_site: CallSiteId,
        callable: CallableId,
    },

    #[error("unknown callable {0}")]
    UnknownCallable(CallableId),

    #[error("unknown type {0}")]
    UnknownType(TypeId),
}

/// Main error type for slicing operations
#[derive(Debug, Error)]
pub enum SlicingError {
    /// Call or declaration resolution error
    #[error("Resolution error: {0}")]
    Resolution(#[from] ResolutionError),

    /// Builder defect: the CFG or its control dependence is malformed
    #[error("Structural invariant violated in callable {callable}: {message}")]
    StructuralInvariant {
        callable: CallableId,
        message: String,
    },

    /// Summary-edge fixed point did not converge within the round cap
    #[error("Summary-edge fixed point did not converge after {rounds} rounds")]
    FixedPointNontermination { rounds: usize },

    /// Criterion does not resolve to a node of the SDG
    #[error("Slicing criterion not found: {0}")]
    CriterionNotFound(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Malformed program input
    #[error("Input error: {0}")]
    Input(#[from] serde_json::Error),

    /// Worker pool could not be created
    #[error("Thread pool error: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
}

impl SlicingError {
    /// Create a structural invariant error
    pub fn structural(callable: CallableId, message: impl Into<String>) -> Self {
        SlicingError::StructuralInvariant {
            callable,
            message: message.into(),
        }
    }

    /// Create a criterion-not-found error
    pub fn criterion(msg: impl Into<String>) -> Self {
        SlicingError::CriterionNotFound(msg.into())
    }
}

/// Result type alias for slicing operations
pub type Result<T> = std::result::Result<T, SlicingError>;

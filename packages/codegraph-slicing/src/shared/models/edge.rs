//! Edge labels for control-flow and dependence graphs
//!
//! Each graph stores one of these enums as its petgraph edge weight;
//! algorithms filter edges by matching on the variant.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::node::OutputSlot;
use super::program::CallSiteId;

/// Control-flow edge kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FlowKind {
    Unconditional,
    TrueBranch,
    FalseBranch,
    Exceptional,
    LoopBack,
}

impl FlowKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            FlowKind::Unconditional => "unconditional",
            FlowKind::TrueBranch => "true",
            FlowKind::FalseBranch => "false",
            FlowKind::Exceptional => "exception",
            FlowKind::LoopBack => "loop_back",
        }
    }
}

/// Control-flow edge weight
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FlowEdge {
    pub kind: FlowKind,
    /// Case label for switch edges, exception type for exceptional edges
    pub label: Option<String>,
}

impl FlowEdge {
    pub fn new(kind: FlowKind) -> Self {
        Self { kind, label: None }
    }

    pub fn labeled(kind: FlowKind, label: impl Into<String>) -> Self {
        Self {
            kind,
            label: Some(label.into()),
        }
    }

    pub fn display_label(&self) -> String {
        match &self.label {
            Some(label) => format!("{}:{}", self.kind.as_str(), label),
            None => self.kind.as_str().to_string(),
        }
    }
}

/// Dependence edge weight used by PDG and SDG
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Dependence {
    /// Source decides whether the target executes
    Control,
    /// Definition at source reaches the use at target
    Data { variable: String },
    /// Call node to callee entry
    Call { call_site: CallSiteId },
    /// Actual-in to formal-in
    ParameterIn { position: usize },
    /// Formal-out to actual-out
    ParameterOut { slot: OutputSlot },
    /// Actual-in to actual-out across a call
    Summary { call_site: CallSiteId },
}

impl Dependence {
    pub fn data(variable: impl Into<String>) -> Self {
        Dependence::Data {
            variable: variable.into(),
        }
    }

    /// Edges whose endpoints belong to the same callable
    pub fn is_intraprocedural(&self) -> bool {
        matches!(
            self,
            Dependence::Control | Dependence::Data { .. } | Dependence::Summary { .. }
        )
    }

    pub fn variable(&self) -> Option<&str> {
        match self {
            Dependence::Data { variable } => Some(variable),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Dependence::Control => "control",
            Dependence::Data { .. } => "data",
            Dependence::Call { .. } => "call",
            Dependence::ParameterIn { .. } => "param_in",
            Dependence::ParameterOut { .. } => "param_out",
            Dependence::Summary { .. } => "summary",
        }
    }
}

impl fmt::Display for Dependence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Dependence::Control => write!(f, "control"),
            Dependence::Data { variable } => write!(f, "data:{}", variable),
            Dependence::Call { call_site } => write!(f, "call:{}", call_site),
            Dependence::ParameterIn { position } => write!(f, "param_in:{}", position),
            Dependence::ParameterOut { slot } => write!(f, "param_out:{}", slot),
            Dependence::Summary { call_site } => write!(f, "summary:{}", call_site),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dependence_labels() {
        assert_eq!(Dependence::data("x").to_string(), "data:x");
        assert_eq!(
            Dependence::ParameterOut { slot: OutputSlot::Return }.to_string(),
            "param_out:ret"
        );
        assert_eq!(Dependence::data("x").variable(), Some("x"));
        assert_eq!(Dependence::Control.variable(), None);
    }

    #[test]
    fn test_intraprocedural_kinds() {
        assert!(Dependence::Control.is_intraprocedural());
        assert!(Dependence::Summary { call_site: CallSiteId(1) }.is_intraprocedural());
        assert!(!Dependence::ParameterIn { position: 0 }.is_intraprocedural());
        assert!(!Dependence::Call { call_site: CallSiteId(1) }.is_intraprocedural());
    }

    #[test]
    fn test_flow_edge_label() {
        assert_eq!(FlowEdge::labeled(FlowKind::TrueBranch, "3").display_label(), "true:3");
        assert_eq!(FlowEdge::new(FlowKind::LoopBack).display_label(), "loop_back");
    }
}

//! Slicing domain types: criteria, directions and slices

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

use crate::features::sdg::infrastructure::sdg::SystemDependenceGraph;
use crate::shared::models::{Dependence, NodeId, SyntaxId};

/// Traversal direction
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SliceDirection {
    /// Everything that may influence the criterion
    #[default]
    Backward,
    /// Everything the criterion may influence
    Forward,
}

/// How interprocedural edges are followed
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SliceStrategy {
    /// Plain reachability over every admissible edge
    #[default]
    Closure,
    /// Horwitz-Reps-Binkley two-phase traversal; respects calling context
    TwoPhase,
}

/// Where a criterion points
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CriterionLocation {
    Node { id: NodeId },
    Syntax { id: SyntaxId },
    /// Node whose span starts on this source line
    Line { line: u32 },
}

/// Program point plus optional variable
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SlicingCriterion {
    pub location: CriterionLocation,
    #[serde(default)]
    pub variable: Option<String>,
}

impl SlicingCriterion {
    pub fn node(id: NodeId) -> Self {
        Self {
            location: CriterionLocation::Node { id },
            variable: None,
        }
    }

    pub fn syntax(id: SyntaxId) -> Self {
        Self {
            location: CriterionLocation::Syntax { id },
            variable: None,
        }
    }

    pub fn line(line: u32) -> Self {
        Self {
            location: CriterionLocation::Line { line },
            variable: None,
        }
    }

    pub fn with_variable(mut self, variable: impl Into<String>) -> Self {
        self.variable = Some(variable.into());
        self
    }
}

impl fmt::Display for SlicingCriterion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.location {
            CriterionLocation::Node { id } => write!(f, "node {}", id)?,
            CriterionLocation::Syntax { id } => write!(f, "syntax {}", id)?,
            CriterionLocation::Line { line } => write!(f, "line {}", line)?,
        }
        if let Some(v) = &self.variable {
            write!(f, " / {}", v)?;
        }
        Ok(())
    }
}

/// Edge of the SDG with both endpoints in a slice
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SliceEdge {
    pub from: NodeId,
    pub to: NodeId,
    pub dependence: Dependence,
}

/// Result of one slicing query
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Slice {
    criterion: SlicingCriterion,
    criterion_node: NodeId,
    direction: SliceDirection,
    nodes: BTreeSet<NodeId>,
    edges: Vec<SliceEdge>,
    program_points: BTreeSet<SyntaxId>,
}

impl Slice {
    pub(crate) fn new(
        criterion: SlicingCriterion,
        criterion_node: NodeId,
        direction: SliceDirection,
        nodes: BTreeSet<NodeId>,
        edges: Vec<SliceEdge>,
        program_points: BTreeSet<SyntaxId>,
    ) -> Self {
        Self {
            criterion,
            criterion_node,
            direction,
            nodes,
            edges,
            program_points,
        }
    }

    pub fn criterion(&self) -> &SlicingCriterion {
        &self.criterion
    }

    pub fn criterion_node(&self) -> NodeId {
        self.criterion_node
    }

    pub fn direction(&self) -> SliceDirection {
        self.direction
    }

    /// Every reached node, synthetic entry and parameter nodes included
    pub fn nodes(&self) -> &BTreeSet<NodeId> {
        &self.nodes
    }

    /// Induced edges, in SDG edge order
    pub fn edges(&self) -> &[SliceEdge] {
        &self.edges
    }

    /// Source statements in the slice
    pub fn program_points(&self) -> &BTreeSet<SyntaxId> {
        &self.program_points
    }

    pub fn contains(&self, node: NodeId) -> bool {
        self.nodes.contains(&node)
    }

    pub fn is_criterion(&self, node: NodeId) -> bool {
        node == self.criterion_node
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Display form for external renderers
    pub fn to_dto(&self, sdg: &SystemDependenceGraph) -> SliceDto {
        let nodes = self
            .nodes
            .iter()
            .filter_map(|id| sdg.node(*id))
            .map(|n| SliceNodeDto {
                id: n.id,
                kind: n.kind.as_str().to_string(),
                label: n.short_label(),
                syntax: n.syntax,
                line: n.span.map(|s| s.start_line),
                is_criterion: self.is_criterion(n.id),
            })
            .collect();

        let edges = self
            .edges
            .iter()
            .map(|e| SliceEdgeDto {
                from: e.from,
                to: e.to,
                label: e.dependence.to_string(),
            })
            .collect();

        SliceDto {
            criterion: self.criterion.clone(),
            direction: self.direction,
            nodes,
            edges,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SliceNodeDto {
    pub id: NodeId,
    pub kind: String,
    pub label: String,
    pub syntax: Option<SyntaxId>,
    pub line: Option<u32>,
    pub is_criterion: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SliceEdgeDto {
    pub from: NodeId,
    pub to: NodeId,
    pub label: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SliceDto {
    pub criterion: SlicingCriterion,
    pub direction: SliceDirection,
    pub nodes: Vec<SliceNodeDto>,
    pub edges: Vec<SliceEdgeDto>,
}

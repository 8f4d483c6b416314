//! Analysis nodes shared by CFG, PDG and SDG

use serde::{Deserialize, Serialize};
use std::fmt;
use std::hash::{Hash, Hasher};

use super::program::{CallSiteId, CallableId, SyntaxId};
use super::span::Span;

/// Process-unique node identity, issued by `NodeIdGenerator`
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(pub u32);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "n{}", self.0)
    }
}

/// Value leaving a callable: its return value or a by-reference parameter
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutputSlot {
    Return,
    Param(usize),
}

impl fmt::Display for OutputSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutputSlot::Return => write!(f, "ret"),
            OutputSlot::Param(i) => write!(f, "arg{}", i),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum NodeKind {
    Entry,
    Exit,
    Statement,
    /// Condition of `if`/loops and `switch` selectors
    Predicate,
    CaseLabel,
    Catch,
    Break,
    Continue,
    Return,
    Throw,
    FormalIn { position: usize },
    FormalOut { slot: OutputSlot },
    Call { call_site: CallSiteId },
    ActualIn { call_site: CallSiteId, position: usize },
    ActualOut { call_site: CallSiteId, slot: OutputSlot },
}

impl NodeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            NodeKind::Entry => "entry",
            NodeKind::Exit => "exit",
            NodeKind::Statement => "statement",
            NodeKind::Predicate => "predicate",
            NodeKind::CaseLabel => "case",
            NodeKind::Catch => "catch",
            NodeKind::Break => "break",
            NodeKind::Continue => "continue",
            NodeKind::Return => "return",
            NodeKind::Throw => "throw",
            NodeKind::FormalIn { .. } => "formal_in",
            NodeKind::FormalOut { .. } => "formal_out",
            NodeKind::Call { .. } => "call",
            NodeKind::ActualIn { .. } => "actual_in",
            NodeKind::ActualOut { .. } => "actual_out",
        }
    }

    /// Parameter and call nodes synthesized around calls and callables
    pub fn is_parameter(&self) -> bool {
        matches!(
            self,
            NodeKind::FormalIn { .. }
                | NodeKind::FormalOut { .. }
                | NodeKind::ActualIn { .. }
                | NodeKind::ActualOut { .. }
        )
    }
}

/// Short labels are cut to this many characters
const SHORT_LABEL_LEN: usize = 32;

/// A program point of one callable.
///
/// Equality and hashing use the id only: two structurally identical
/// statements are still distinct vertices.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Node {
    pub id: NodeId,
    pub callable: CallableId,
    pub kind: NodeKind,
    pub text: String,
    pub syntax: Option<SyntaxId>,
    pub span: Option<Span>,
    pub defs: Vec<String>,
    pub uses: Vec<String>,
    /// Call sites evaluated as part of this node
    pub calls: Vec<CallSiteId>,
}

impl Node {
    pub fn new(id: NodeId, callable: CallableId, kind: NodeKind, text: impl Into<String>) -> Self {
        Self {
            id,
            callable,
            kind,
            text: text.into(),
            syntax: None,
            span: None,
            defs: Vec::new(),
            uses: Vec::new(),
            calls: Vec::new(),
        }
    }

    pub fn defines(&self, var: &str) -> bool {
        self.defs.iter().any(|d| d == var)
    }

    pub fn reads(&self, var: &str) -> bool {
        self.uses.iter().any(|u| u == var)
    }

    /// True for the call node of `call_site` and for the statement evaluating it
    pub fn contains_call(&self, call_site: CallSiteId) -> bool {
        match self.kind {
            NodeKind::Call { call_site: c } => c == call_site,
            _ => self.calls.contains(&call_site),
        }
    }

    pub fn short_label(&self) -> String {
        if self.text.chars().count() <= SHORT_LABEL_LEN {
            return self.text.clone();
        }
        let cut: String = self.text.chars().take(SHORT_LABEL_LEN - 3).collect();
        format!("{}...", cut)
    }

    pub fn long_label(&self) -> String {
        match self.span {
            Some(span) => format!("{} [{}] {} @{}", self.id, self.kind.as_str(), self.text, span),
            None => format!("{} [{}] {}", self.id, self.kind.as_str(), self.text),
        }
    }
}

impl PartialEq for Node {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Node {}

impl Hash for Node {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

//! Shared domain models

pub mod edge;
pub mod node;
pub mod program;
pub mod span;

pub use edge::{Dependence, FlowEdge, FlowKind};
pub use node::{Node, NodeId, NodeKind, OutputSlot};
pub use program::{
    result_var, Argument, CallSite, CallSiteId, CallTarget, CallableDecl, CallableId, CallableKind,
    CatchClause, Dispatch, Effects, Param, ParamPassing, Program, Receiver, Signature, Stmt,
    StmtKind, SwitchCase, SyntaxId, TypeDecl, TypeId, RETURN_VAR,
};
pub use span::Span;

//! Front-end program model
//!
//! The slicer does not parse source text. A front-end supplies a resolved
//! program: types with their supertypes, callables with structured bodies,
//! and per-statement read/write sets with call targets already resolved.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::span::Span;
use crate::errors::Result;

macro_rules! id_newtype {
    ($(#[$meta:meta])* $name:ident, $prefix:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub u32);

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!($prefix, "{}"), self.0)
            }
        }
    };
}

id_newtype!(
    /// Declared type (class or interface)
    TypeId,
    "t"
);
id_newtype!(
    /// Method, constructor or initializer declaration
    CallableId,
    "m"
);
id_newtype!(
    /// Call expression, unique across the program
    CallSiteId,
    "c"
);
id_newtype!(
    /// Source identity of a statement, catch clause or case label
    SyntaxId,
    "s"
);

/// Name plus parameter types; overriding declarations share a signature
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Signature {
    pub name: String,
    #[serde(default)]
    pub param_types: Vec<String>,
}

impl Signature {
    pub fn new(name: impl Into<String>, param_types: Vec<String>) -> Self {
        Self {
            name: name.into(),
            param_types,
        }
    }
}

impl fmt::Display for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({})", self.name, self.param_types.join(", "))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TypeDecl {
    pub id: TypeId,
    pub name: String,
    #[serde(default)]
    pub supertypes: Vec<TypeId>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CallableKind {
    Method,
    Constructor,
    /// Field or static initializer with a synthesized body
    Initializer,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParamPassing {
    #[default]
    ByValue,
    /// Callee writes are visible to the caller's argument variable
    ByReference,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Param {
    pub name: String,
    #[serde(default)]
    pub passing: ParamPassing,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CallableDecl {
    pub id: CallableId,
    pub name: String,
    pub kind: CallableKind,
    pub owner: TypeId,
    pub signature: Signature,
    #[serde(default)]
    pub is_static: bool,
    #[serde(default)]
    pub params: Vec<Param>,
    #[serde(default)]
    pub returns_value: bool,
    /// `None` for abstract and native declarations
    #[serde(default)]
    pub body: Option<Vec<Stmt>>,
    #[serde(default)]
    pub span: Option<Span>,
}

impl CallableDecl {
    pub fn has_body(&self) -> bool {
        self.body.is_some()
    }
}

/// Resolved reads, writes, calls and raised exceptions of one node
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Effects {
    #[serde(default)]
    pub defs: Vec<String>,
    #[serde(default)]
    pub uses: Vec<String>,
    #[serde(default)]
    pub calls: Vec<CallSite>,
    /// Exception types this construct may raise itself
    #[serde(default)]
    pub throws: Vec<String>,
}

impl Effects {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn def(mut self, var: impl Into<String>) -> Self {
        self.defs.push(var.into());
        self
    }

    pub fn uses<I, S>(mut self, vars: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.uses.extend(vars.into_iter().map(Into::into));
        self
    }

    pub fn call(mut self, site: CallSite) -> Self {
        self.calls.push(site);
        self
    }

    pub fn throws(mut self, exception_type: impl Into<String>) -> Self {
        self.throws.push(exception_type.into());
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CallTarget {
    /// Statically resolved declaration; virtual dispatch starts from it
    Declared { callable: CallableId },
    /// Library code without a declaration in the program
    External { name: String },
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Dispatch {
    #[default]
    Static,
    Virtual { receiver: Receiver },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Receiver {
    /// `m()` inside an instance method
    Implicit,
    /// `this.m()` or `Outer.this.m()`
    This {
        #[serde(default)]
        qualifier: Option<TypeId>,
    },
    /// `expr.m()` where `expr` has the given static type
    Expr { static_type: TypeId },
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Argument {
    pub text: String,
    #[serde(default)]
    pub uses: Vec<String>,
    /// Nested calls evaluated while computing this argument
    #[serde(default)]
    pub calls: Vec<CallSite>,
    /// Set when the argument is a plain variable (may be written back by reference)
    #[serde(default)]
    pub var: Option<String>,
}

impl Argument {
    /// Argument that is a plain variable reference
    pub fn var(name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            text: name.clone(),
            uses: vec![name.clone()],
            calls: Vec::new(),
            var: Some(name),
        }
    }

    /// Arbitrary argument expression reading `uses`
    pub fn expr<I, S>(text: impl Into<String>, uses: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            text: text.into(),
            uses: uses.into_iter().map(Into::into).collect(),
            calls: Vec::new(),
            var: None,
        }
    }

    /// Argument whose value is the result of another call
    pub fn nested(site: CallSite) -> Self {
        Self {
            text: site.text.clone(),
            uses: Vec::new(),
            calls: vec![site],
            var: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallSite {
    pub id: CallSiteId,
    pub text: String,
    pub target: CallTarget,
    #[serde(default)]
    pub dispatch: Dispatch,
    #[serde(default)]
    pub args: Vec<Argument>,
    /// Whether the call's value flows into the enclosing construct
    #[serde(default)]
    pub result_used: bool,
    #[serde(default)]
    pub throws: Vec<String>,
}

impl CallSite {
    /// Variable the enclosing node reads to observe this call's result
    pub fn result_var(&self) -> String {
        result_var(self.id)
    }

    pub fn declared_target(&self) -> Option<CallableId> {
        match &self.target {
            CallTarget::Declared { callable } => Some(*callable),
            CallTarget::External { .. } => None,
        }
    }
}

/// Synthetic variable holding the result of call `id`
pub fn result_var(id: CallSiteId) -> String {
    format!("$call{}", id.0)
}

/// Synthetic variable written by `return expr`
pub const RETURN_VAR: &str = "$ret";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Stmt {
    pub id: SyntaxId,
    pub text: String,
    #[serde(default)]
    pub span: Option<Span>,
    pub kind: StmtKind,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StmtKind {
    Simple {
        effects: Effects,
    },
    If {
        cond: Effects,
        then_branch: Vec<Stmt>,
        #[serde(default)]
        else_branch: Vec<Stmt>,
    },
    While {
        cond: Effects,
        body: Vec<Stmt>,
    },
    DoWhile {
        body: Vec<Stmt>,
        cond: Effects,
    },
    For {
        #[serde(default)]
        init: Vec<Stmt>,
        #[serde(default)]
        cond: Option<Effects>,
        #[serde(default)]
        update: Vec<Stmt>,
        body: Vec<Stmt>,
    },
    ForEach {
        var: String,
        iterable: Effects,
        body: Vec<Stmt>,
    },
    Switch {
        selector: Effects,
        cases: Vec<SwitchCase>,
    },
    Break,
    Continue,
    Return {
        #[serde(default)]
        value: Option<Effects>,
    },
    Throw {
        exception_type: String,
        value: Effects,
    },
    Try {
        body: Vec<Stmt>,
        #[serde(default)]
        catches: Vec<CatchClause>,
        #[serde(default)]
        finally: Option<Vec<Stmt>>,
    },
    Block {
        body: Vec<Stmt>,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SwitchCase {
    pub id: SyntaxId,
    /// `None` is the `default` label
    #[serde(default)]
    pub label: Option<String>,
    #[serde(default)]
    pub body: Vec<Stmt>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatchClause {
    pub id: SyntaxId,
    /// `None` catches everything
    #[serde(default)]
    pub exception_type: Option<String>,
    pub var: String,
    #[serde(default)]
    pub body: Vec<Stmt>,
}

/// Resolved whole program as handed over by the front-end
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Program {
    #[serde(default)]
    pub types: Vec<TypeDecl>,
    #[serde(default)]
    pub callables: Vec<CallableDecl>,
}

impl Program {
    /// Parse a program from its JSON form
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn callable(&self, id: CallableId) -> Option<&CallableDecl> {
        self.callables.iter().find(|c| c.id == id)
    }

    pub fn type_decl(&self, id: TypeId) -> Option<&TypeDecl> {
        self.types.iter().find(|t| t.id == id)
    }
}

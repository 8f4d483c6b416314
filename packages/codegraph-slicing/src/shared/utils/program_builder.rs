//! Fluent construction of [`Program`] values
//!
//! Front-ends that already hold a resolved AST and tests both use this to
//! avoid hand-numbering syntax, call-site and declaration ids. Every
//! statement gets the next source line, in construction order.

use crate::shared::models::{
    Argument, CallSite, CallSiteId, CallTarget, CallableDecl, CallableId, CallableKind,
    CatchClause, Dispatch, Effects, Param, ParamPassing, Program, Receiver, Signature, Span, Stmt,
    StmtKind, SwitchCase, SyntaxId, TypeDecl, TypeId,
};

/// Parameter type recorded in builder signatures
const PARAM_TYPE: &str = "Object";

#[derive(Debug, Default)]
pub struct ProgramBuilder {
    program: Program,
    next_type: u32,
    next_callable: u32,
    next_syntax: u32,
    next_call: u32,
    next_line: u32,
}

impl ProgramBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Declarations
    // ═══════════════════════════════════════════════════════════════════════

    /// Declare a type with the given direct supertypes
    pub fn class(&mut self, name: &str, supertypes: &[TypeId]) -> TypeId {
        let id = TypeId(self.next_type);
        self.next_type += 1;
        self.program.types.push(TypeDecl {
            id,
            name: name.to_string(),
            supertypes: supertypes.to_vec(),
        });
        id
    }

    /// Declare an instance method without a body
    pub fn method(&mut self, owner: TypeId, name: &str, params: &[&str]) -> CallableId {
        self.declare(owner, name, CallableKind::Method, false, params)
    }

    pub fn static_method(&mut self, owner: TypeId, name: &str, params: &[&str]) -> CallableId {
        self.declare(owner, name, CallableKind::Method, true, params)
    }

    pub fn constructor(&mut self, owner: TypeId, params: &[&str]) -> CallableId {
        self.declare(owner, "<init>", CallableKind::Constructor, false, params)
    }

    /// Field or static initializer; give it a single-statement body
    pub fn initializer(&mut self, owner: TypeId, is_static: bool) -> CallableId {
        let name = if is_static { "<clinit>" } else { "<finit>" };
        self.declare(owner, name, CallableKind::Initializer, is_static, &[])
    }

    fn declare(
        &mut self,
        owner: TypeId,
        name: &str,
        kind: CallableKind,
        is_static: bool,
        params: &[&str],
    ) -> CallableId {
        let id = CallableId(self.next_callable);
        self.next_callable += 1;
        self.program.callables.push(CallableDecl {
            id,
            name: name.to_string(),
            kind,
            owner,
            signature: Signature::new(name, vec![PARAM_TYPE.to_string(); params.len()]),
            is_static,
            params: params
                .iter()
                .map(|p| Param {
                    name: p.to_string(),
                    passing: ParamPassing::ByValue,
                })
                .collect(),
            returns_value: false,
            body: None,
            span: None,
        });
        id
    }

    fn decl_mut(&mut self, callable: CallableId) -> &mut CallableDecl {
        // Ids are only issued by `declare`, so the lookup cannot miss
        let index = callable.0 as usize;
        &mut self.program.callables[index]
    }

    pub fn returns_value(&mut self, callable: CallableId) -> &mut Self {
        self.decl_mut(callable).returns_value = true;
        self
    }

    pub fn by_reference(&mut self, callable: CallableId, position: usize) -> &mut Self {
        if let Some(param) = self.decl_mut(callable).params.get_mut(position) {
            param.passing = ParamPassing::ByReference;
        }
        self
    }

    pub fn body(&mut self, callable: CallableId, stmts: Vec<Stmt>) -> &mut Self {
        self.decl_mut(callable).body = Some(stmts);
        self
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Statements
    // ═══════════════════════════════════════════════════════════════════════

    fn next_syntax(&mut self) -> SyntaxId {
        let id = SyntaxId(self.next_syntax);
        self.next_syntax += 1;
        id
    }

    pub fn stmt(&mut self, text: &str, kind: StmtKind) -> Stmt {
        self.next_line += 1;
        Stmt {
            id: self.next_syntax(),
            text: text.to_string(),
            span: Some(Span::line(self.next_line)),
            kind,
        }
    }

    pub fn simple(&mut self, text: &str, effects: Effects) -> Stmt {
        self.stmt(text, StmtKind::Simple { effects })
    }

    /// `def = f(uses)` without calls
    pub fn assign(&mut self, text: &str, def: &str, uses: &[&str]) -> Stmt {
        self.simple(text, Effects::new().def(def).uses(uses.iter().copied()))
    }

    pub fn if_else(
        &mut self,
        text: &str,
        cond: Effects,
        then_branch: Vec<Stmt>,
        else_branch: Vec<Stmt>,
    ) -> Stmt {
        self.stmt(
            text,
            StmtKind::If {
                cond,
                then_branch,
                else_branch,
            },
        )
    }

    pub fn while_loop(&mut self, text: &str, cond: Effects, body: Vec<Stmt>) -> Stmt {
        self.stmt(text, StmtKind::While { cond, body })
    }

    pub fn ret(&mut self, text: &str, value: Option<Effects>) -> Stmt {
        self.stmt(text, StmtKind::Return { value })
    }

    pub fn case(&mut self, label: Option<&str>, body: Vec<Stmt>) -> SwitchCase {
        SwitchCase {
            id: self.next_syntax(),
            label: label.map(str::to_string),
            body,
        }
    }

    pub fn catch(&mut self, exception_type: Option<&str>, var: &str, body: Vec<Stmt>) -> CatchClause {
        CatchClause {
            id: self.next_syntax(),
            exception_type: exception_type.map(str::to_string),
            var: var.to_string(),
            body,
        }
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Calls
    // ═══════════════════════════════════════════════════════════════════════

    fn next_call(&mut self) -> CallSiteId {
        let id = CallSiteId(self.next_call);
        self.next_call += 1;
        id
    }

    /// Statically dispatched call whose result is used
    pub fn call(&mut self, text: &str, target: CallableId, args: Vec<Argument>) -> CallSite {
        CallSite {
            id: self.next_call(),
            text: text.to_string(),
            target: CallTarget::Declared { callable: target },
            dispatch: Dispatch::Static,
            args,
            result_used: true,
            throws: Vec::new(),
        }
    }

    pub fn virtual_call(
        &mut self,
        text: &str,
        target: CallableId,
        receiver: Receiver,
        args: Vec<Argument>,
    ) -> CallSite {
        let mut site = self.call(text, target, args);
        site.dispatch = Dispatch::Virtual { receiver };
        site
    }

    /// Call into code without a declaration in the program
    pub fn external_call(&mut self, text: &str, name: &str, args: Vec<Argument>) -> CallSite {
        CallSite {
            id: self.next_call(),
            text: text.to_string(),
            target: CallTarget::External {
                name: name.to_string(),
            },
            dispatch: Dispatch::Static,
            args,
            result_used: true,
            throws: Vec::new(),
        }
    }

    pub fn build(self) -> Program {
        self.program
    }
}

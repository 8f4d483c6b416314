//! CFG construction from structured statement bodies
//!
//! Lowering keeps a frontier of dangling edges (`pending`) that the next
//! emitted node absorbs. Abrupt transfers are routed through a scope stack
//! of enclosing loops, switches and try statements.
//!
//! Node layout:
//! - `entry -> formal-in* -> body -> formal-out* -> exit`
//! - a call lowers to `actual-in* -> call -> actual-out*` ahead of the node
//!   that evaluates it
//! - returns and uncaught exceptions jump to the first node after the body

use std::mem;

use tracing::{debug, warn};

use crate::errors::{Result, SlicingError};
use crate::features::flow_graph::domain::{CallSiteNodes, ControlFlowGraph};
use crate::features::flow_graph::infrastructure::adjacency::Adjacency;
use crate::features::type_hierarchy::{ExceptionMatch, TypeHierarchyIndex};
use crate::shared::models::{
    CallSite, CallableDecl, CallableId, CatchClause, Effects, FlowEdge, FlowKind, Node, NodeId,
    NodeKind, OutputSlot, ParamPassing, Stmt, StmtKind, SwitchCase, RETURN_VAR,
};
use crate::shared::utils::NodeIdGenerator;

/// Builds one [`ControlFlowGraph`] per callable.
///
/// Stateless between calls; safe to share across worker threads.
pub struct CfgBuilder<'a> {
    ids: &'a NodeIdGenerator,
    hierarchy: &'a TypeHierarchyIndex,
}

impl<'a> CfgBuilder<'a> {
    pub fn new(ids: &'a NodeIdGenerator, hierarchy: &'a TypeHierarchyIndex) -> Self {
        Self { ids, hierarchy }
    }

    pub fn build(&self, decl: &CallableDecl) -> Result<ControlFlowGraph> {
        let mut entry = Node::new(
            self.ids.next_id(),
            decl.id,
            NodeKind::Entry,
            format!("enter {}", decl.signature),
        );
        entry.span = decl.span;
        let exit = Node::new(
            self.ids.next_id(),
            decl.id,
            NodeKind::Exit,
            format!("exit {}", decl.name),
        );
        let entry_id = entry.id;
        let exit_id = exit.id;
        let mut cfg = ControlFlowGraph::new(decl.id, entry, exit);

        let Some(body) = &decl.body else {
            cfg.add_edge(entry_id, exit_id, FlowEdge::new(FlowKind::Unconditional));
            return Ok(cfg);
        };

        let mut lowering = Lowering {
            ids: self.ids,
            hierarchy: self.hierarchy,
            callable: decl.id,
            cfg,
            pending: vec![Pending::new(entry_id, FlowKind::Unconditional)],
            scopes: Vec::new(),
            returns: Vec::new(),
            loop_candidates: Vec::new(),
        };

        lowering.lower_formal_ins(decl);
        lowering.lower_block(body)?;
        let cfg = lowering.finish(decl, exit_id);

        debug!(
            callable = %decl.id,
            nodes = cfg.node_count(),
            edges = cfg.edge_count(),
            unreachable = cfg.unreachable.len(),
            "CFG built"
        );
        Ok(cfg)
    }
}

/// Dangling edge waiting for its target
#[derive(Debug, Clone)]
struct Pending {
    from: NodeId,
    edge: FlowEdge,
}

impl Pending {
    fn new(from: NodeId, kind: FlowKind) -> Self {
        Self {
            from,
            edge: FlowEdge::new(kind),
        }
    }

    fn labeled(from: NodeId, kind: FlowKind, label: &str) -> Self {
        Self {
            from,
            edge: FlowEdge::labeled(kind, label),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Escape {
    Break,
    Continue,
    Return,
    Throw(String),
}

impl Escape {
    fn edge(&self) -> FlowEdge {
        match self {
            Escape::Break | Escape::Continue | Escape::Return => {
                FlowEdge::new(FlowKind::Unconditional)
            }
            Escape::Throw(ty) => FlowEdge::labeled(FlowKind::Exceptional, ty.as_str()),
        }
    }
}

#[derive(Debug)]
struct Handler {
    exception_type: Option<String>,
    incoming: Vec<Pending>,
}

#[derive(Debug)]
struct TryScope {
    handlers: Vec<Handler>,
    in_handlers: bool,
    has_finally: bool,
    /// Transfers that must run the finally body first
    escapes: Vec<(Pending, Escape)>,
}

#[derive(Debug)]
enum Scope {
    Loop {
        breaks: Vec<Pending>,
        continues: Vec<Pending>,
    },
    Switch {
        breaks: Vec<Pending>,
    },
    Try(TryScope),
}

struct Lowering<'a> {
    ids: &'a NodeIdGenerator,
    hierarchy: &'a TypeHierarchyIndex,
    callable: CallableId,
    cfg: ControlFlowGraph,
    pending: Vec<Pending>,
    scopes: Vec<Scope>,
    /// Edges into the exit sequence
    returns: Vec<Pending>,
    /// `for (;;)` headers without a break
    loop_candidates: Vec<NodeId>,
}

impl<'a> Lowering<'a> {
    // ═══════════════════════════════════════════════════════════════════════
    // Node emission
    // ═══════════════════════════════════════════════════════════════════════

    fn node(&self, kind: NodeKind, text: impl Into<String>) -> Node {
        Node::new(self.ids.next_id(), self.callable, kind, text)
    }

    fn stmt_node(&self, kind: NodeKind, stmt: &Stmt) -> Node {
        let mut node = self.node(kind, stmt.text.as_str());
        node.syntax = Some(stmt.id);
        node.span = stmt.span;
        node
    }

    /// Add `node`, connect the frontier to it, and make it the new frontier
    fn place(&mut self, node: Node) -> NodeId {
        let id = self.cfg.add_node(node);
        for p in mem::take(&mut self.pending) {
            self.cfg.add_edge(p.from, id, p.edge);
        }
        self.pending.push(Pending::new(id, FlowKind::Unconditional));
        id
    }

    /// Place `node` after lowering the calls it evaluates.
    ///
    /// Returns the first node emitted (the construct's entry point) and the node itself.
    fn place_with_effects(&mut self, mut node: Node, effects: &Effects) -> Result<(NodeId, NodeId)> {
        let first = self.cfg.node_count();
        node.defs.extend(effects.defs.iter().cloned());
        node.uses.extend(effects.uses.iter().cloned());
        for call in &effects.calls {
            node.calls.push(call.id);
            if let Some(var) = self.lower_call(call)? {
                node.uses.push(var);
            }
        }

        let id = self.place(node);
        let head = self.cfg.node_at(first).unwrap_or(id);
        for ty in &effects.throws {
            self.raise(id, ty)?;
        }
        Ok((head, id))
    }

    fn raise(&mut self, from: NodeId, exception_type: &str) -> Result<()> {
        let escape = Escape::Throw(exception_type.to_string());
        let pending = Pending {
            from,
            edge: escape.edge(),
        };
        self.route(pending, escape)
    }

    /// Send an abrupt transfer to its target in the enclosing scopes
    fn route(&mut self, pending: Pending, escape: Escape) -> Result<()> {
        let hierarchy = self.hierarchy;

        for scope in self.scopes.iter_mut().rev() {
            match scope {
                Scope::Loop { breaks, continues } => match escape {
                    Escape::Break => {
                        breaks.push(pending);
                        return Ok(());
                    }
                    Escape::Continue => {
                        continues.push(pending);
                        return Ok(());
                    }
                    _ => {}
                },
                Scope::Switch { breaks } => {
                    if escape == Escape::Break {
                        breaks.push(pending);
                        return Ok(());
                    }
                }
                Scope::Try(t) => {
                    if let Escape::Throw(ty) = &escape {
                        if !t.in_handlers {
                            for handler in t.handlers.iter_mut() {
                                match hierarchy.exception_match(ty, handler.exception_type.as_deref()) {
                                    ExceptionMatch::Definite => {
                                        handler.incoming.push(pending);
                                        return Ok(());
                                    }
                                    ExceptionMatch::Possible => handler.incoming.push(pending.clone()),
                                    ExceptionMatch::None => {}
                                }
                            }
                        }
                    }
                    if t.has_finally {
                        t.escapes.push((pending, escape));
                        return Ok(());
                    }
                }
            }
        }

        match escape {
            Escape::Return | Escape::Throw(_) => {
                self.returns.push(pending);
                Ok(())
            }
            Escape::Break | Escape::Continue => Err(SlicingError::structural(
                self.callable,
                format!("{:?} at {} has no enclosing loop or switch", escape, pending.from),
            )),
        }
    }

    /// Close a loop: frontier edges become back edges to `head`
    ///
    /// `continue` stays Unconditional until it lands here, so one that flows
    /// forward into an update or a do-while condition is not a back edge.
    fn close_loop(&mut self, tails: Vec<Pending>, head: NodeId) {
        for p in tails {
            let edge = if p.edge.kind == FlowKind::Unconditional {
                FlowEdge::new(FlowKind::LoopBack)
            } else {
                p.edge
            };
            self.cfg.add_edge(p.from, head, edge);
        }
    }

    fn replace_pending(&mut self, from: NodeId, kind: FlowKind) {
        self.pending = vec![Pending::new(from, kind)];
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Parameters and calls
    // ═══════════════════════════════════════════════════════════════════════

    fn lower_formal_ins(&mut self, decl: &CallableDecl) {
        for (position, param) in decl.params.iter().enumerate() {
            let mut node = self.node(NodeKind::FormalIn { position }, format!("in {}", param.name));
            node.defs.push(param.name.clone());
            let id = self.place(node);
            self.cfg.formals.ins.push(id);
        }
    }

    /// Lower one call; returns the variable holding its result, if used
    fn lower_call(&mut self, site: &CallSite) -> Result<Option<String>> {
        let passing: Vec<ParamPassing> = site
            .declared_target()
            .and_then(|t| self.hierarchy.declaration(t))
            .map(|d| d.passing.clone())
            .unwrap_or_default();

        let mut actual_ins = Vec::with_capacity(site.args.len());
        for (position, arg) in site.args.iter().enumerate() {
            let mut node = self.node(
                NodeKind::ActualIn {
                    call_site: site.id,
                    position,
                },
                arg.text.as_str(),
            );
            node.uses = arg.uses.clone();
            for inner in &arg.calls {
                node.calls.push(inner.id);
                if let Some(var) = self.lower_call(inner)? {
                    node.uses.push(var);
                }
            }
            actual_ins.push(self.place(node));
        }

        let call_node = self.place(self.node(NodeKind::Call { call_site: site.id }, site.text.as_str()));
        for ty in &site.throws {
            self.raise(call_node, ty)?;
        }

        let mut actual_outs = Vec::new();
        let result = if site.result_used {
            let var = site.result_var();
            let mut node = self.node(
                NodeKind::ActualOut {
                    call_site: site.id,
                    slot: OutputSlot::Return,
                },
                format!("{} <- {}", var, site.text),
            );
            node.defs.push(var.clone());
            actual_outs.push((OutputSlot::Return, self.place(node)));
            Some(var)
        } else {
            None
        };

        for (position, arg) in site.args.iter().enumerate() {
            let Some(var) = &arg.var else { continue };
            if passing.get(position) != Some(&ParamPassing::ByReference) {
                continue;
            }
            let slot = OutputSlot::Param(position);
            let mut node = self.node(
                NodeKind::ActualOut {
                    call_site: site.id,
                    slot,
                },
                format!("{} <- {}", var, site.text),
            );
            node.defs.push(var.clone());
            actual_outs.push((slot, self.place(node)));
        }

        self.cfg.call_sites.push(CallSiteNodes {
            site: site.clone(),
            call_node,
            actual_ins,
            actual_outs,
        });
        Ok(result)
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Statements
    // ═══════════════════════════════════════════════════════════════════════

    fn lower_block(&mut self, stmts: &[Stmt]) -> Result<()> {
        for stmt in stmts {
            self.lower_stmt(stmt)?;
        }
        Ok(())
    }

    fn lower_stmt(&mut self, stmt: &Stmt) -> Result<()> {
        if self.pending.is_empty() {
            debug!(callable = %self.callable, syntax = %stmt.id, "skipping unreachable statement");
            self.cfg.unreachable.push(stmt.id);
            return Ok(());
        }

        match &stmt.kind {
            StmtKind::Simple { effects } => {
                let node = self.stmt_node(NodeKind::Statement, stmt);
                self.place_with_effects(node, effects)?;
            }
            StmtKind::If {
                cond,
                then_branch,
                else_branch,
            } => {
                let (_, pred) = self.place_with_effects(self.stmt_node(NodeKind::Predicate, stmt), cond)?;
                self.replace_pending(pred, FlowKind::TrueBranch);
                self.lower_block(then_branch)?;
                let after_then = mem::take(&mut self.pending);
                self.replace_pending(pred, FlowKind::FalseBranch);
                self.lower_block(else_branch)?;
                self.pending.extend(after_then);
            }
            StmtKind::While { cond, body } => {
                let (head, pred) = self.place_with_effects(self.stmt_node(NodeKind::Predicate, stmt), cond)?;
                self.lower_loop_body(pred, head, FlowKind::TrueBranch, body, &[])?;
                self.pending.push(Pending::new(pred, FlowKind::FalseBranch));
            }
            StmtKind::ForEach {
                var,
                iterable,
                body,
            } => {
                let mut header = self.stmt_node(NodeKind::Predicate, stmt);
                header.defs.push(var.clone());
                let (head, pred) = self.place_with_effects(header, iterable)?;
                self.lower_loop_body(pred, head, FlowKind::TrueBranch, body, &[])?;
                self.pending.push(Pending::new(pred, FlowKind::FalseBranch));
            }
            StmtKind::DoWhile { body, cond } => self.lower_do_while(stmt, body, cond)?,
            StmtKind::For {
                init,
                cond,
                update,
                body,
            } => self.lower_for(stmt, init, cond.as_ref(), update, body)?,
            StmtKind::Switch { selector, cases } => self.lower_switch(stmt, selector, cases)?,
            StmtKind::Break => {
                let id = self.place(self.stmt_node(NodeKind::Break, stmt));
                self.pending.clear();
                self.route(Pending::new(id, FlowKind::Unconditional), Escape::Break)?;
            }
            StmtKind::Continue => {
                let id = self.place(self.stmt_node(NodeKind::Continue, stmt));
                self.pending.clear();
                self.route(Pending::new(id, FlowKind::Unconditional), Escape::Continue)?;
            }
            StmtKind::Return { value } => {
                let mut node = self.stmt_node(NodeKind::Return, stmt);
                let id = match value {
                    Some(effects) => {
                        node.defs.push(RETURN_VAR.to_string());
                        self.place_with_effects(node, effects)?.1
                    }
                    None => self.place(node),
                };
                self.pending.clear();
                self.route(Pending::new(id, FlowKind::Unconditional), Escape::Return)?;
            }
            StmtKind::Throw {
                exception_type,
                value,
            } => {
                let (_, id) = self.place_with_effects(self.stmt_node(NodeKind::Throw, stmt), value)?;
                self.pending.clear();
                self.raise(id, exception_type)?;
            }
            StmtKind::Try {
                body,
                catches,
                finally,
            } => self.lower_try(body, catches, finally.as_deref())?,
            StmtKind::Block { body } => self.lower_block(body)?,
        }
        Ok(())
    }

    /// Lower a loop body entered from `pred`, then close it back to `head`.
    ///
    /// `update` runs after the body and after `continue`.
    fn lower_loop_body(
        &mut self,
        pred: NodeId,
        head: NodeId,
        enter: FlowKind,
        body: &[Stmt],
        update: &[Stmt],
    ) -> Result<Vec<Pending>> {
        self.replace_pending(pred, enter);
        self.scopes.push(Scope::Loop {
            breaks: Vec::new(),
            continues: Vec::new(),
        });
        self.lower_block(body)?;
        let (breaks, continues) = self.pop_loop()?;

        self.pending.extend(continues);
        if !update.is_empty() && !self.pending.is_empty() {
            self.lower_block(update)?;
        }
        let tails = mem::take(&mut self.pending);
        self.close_loop(tails, head);
        self.pending = breaks.clone();
        Ok(breaks)
    }

    fn pop_loop(&mut self) -> Result<(Vec<Pending>, Vec<Pending>)> {
        match self.scopes.pop() {
            Some(Scope::Loop { breaks, continues }) => Ok((breaks, continues)),
            _ => Err(SlicingError::structural(self.callable, "loop scope mismatch")),
        }
    }

    fn lower_do_while(&mut self, stmt: &Stmt, body: &[Stmt], cond: &Effects) -> Result<()> {
        let first = self.cfg.node_count();
        self.scopes.push(Scope::Loop {
            breaks: Vec::new(),
            continues: Vec::new(),
        });
        self.lower_block(body)?;
        let (breaks, continues) = self.pop_loop()?;
        let body_head = if self.cfg.node_count() > first {
            self.cfg.node_at(first)
        } else {
            None
        };

        self.pending.extend(continues);
        if self.pending.is_empty() {
            debug!(callable = %self.callable, syntax = %stmt.id, "do-while condition unreachable");
            self.cfg.unreachable.push(stmt.id);
            self.pending = breaks;
            return Ok(());
        }

        let (cond_head, pred) = self.place_with_effects(self.stmt_node(NodeKind::Predicate, stmt), cond)?;
        let target = body_head.unwrap_or(cond_head);
        self.cfg.add_edge(pred, target, FlowEdge::new(FlowKind::LoopBack));
        self.replace_pending(pred, FlowKind::FalseBranch);
        self.pending.extend(breaks);
        Ok(())
    }

    fn lower_for(
        &mut self,
        stmt: &Stmt,
        init: &[Stmt],
        cond: Option<&Effects>,
        update: &[Stmt],
        body: &[Stmt],
    ) -> Result<()> {
        self.lower_block(init)?;
        if self.pending.is_empty() {
            return Ok(());
        }

        match cond {
            Some(cond) => {
                let (head, pred) = self.place_with_effects(self.stmt_node(NodeKind::Predicate, stmt), cond)?;
                self.lower_loop_body(pred, head, FlowKind::TrueBranch, body, update)?;
                self.pending.push(Pending::new(pred, FlowKind::FalseBranch));
            }
            None => {
                let header = self.place(self.stmt_node(NodeKind::Predicate, stmt));
                let breaks =
                    self.lower_loop_body(header, header, FlowKind::Unconditional, body, update)?;
                if breaks.is_empty() {
                    self.loop_candidates.push(header);
                }
            }
        }
        Ok(())
    }

    fn lower_switch(&mut self, stmt: &Stmt, selector: &Effects, cases: &[SwitchCase]) -> Result<()> {
        let (_, sel) = self.place_with_effects(self.stmt_node(NodeKind::Predicate, stmt), selector)?;
        let has_default = cases.iter().any(|c| c.label.is_none());

        self.scopes.push(Scope::Switch { breaks: Vec::new() });
        let mut fallthrough = Vec::new();
        for case in cases {
            let label = case.label.as_deref().unwrap_or("default");
            self.pending = fallthrough;
            self.pending
                .push(Pending::labeled(sel, FlowKind::TrueBranch, label));

            let text = match &case.label {
                Some(l) => format!("case {}:", l),
                None => "default:".to_string(),
            };
            let mut node = self.node(NodeKind::CaseLabel, text);
            node.syntax = Some(case.id);
            node.span = stmt.span;
            self.place(node);
            self.lower_block(&case.body)?;
            fallthrough = mem::take(&mut self.pending);
        }

        let breaks = match self.scopes.pop() {
            Some(Scope::Switch { breaks }) => breaks,
            _ => return Err(SlicingError::structural(self.callable, "switch scope mismatch")),
        };
        self.pending = fallthrough;
        self.pending.extend(breaks);
        if !has_default {
            self.pending
                .push(Pending::labeled(sel, FlowKind::FalseBranch, "default"));
        }
        Ok(())
    }

    fn lower_try(
        &mut self,
        body: &[Stmt],
        catches: &[CatchClause],
        finally: Option<&[Stmt]>,
    ) -> Result<()> {
        self.scopes.push(Scope::Try(TryScope {
            handlers: catches
                .iter()
                .map(|c| Handler {
                    exception_type: c.exception_type.clone(),
                    incoming: Vec::new(),
                })
                .collect(),
            in_handlers: false,
            has_finally: finally.is_some(),
            escapes: Vec::new(),
        }));

        self.lower_block(body)?;
        let mut normal = mem::take(&mut self.pending);

        let handlers = match self.scopes.last_mut() {
            Some(Scope::Try(t)) => {
                t.in_handlers = true;
                mem::take(&mut t.handlers)
            }
            _ => return Err(SlicingError::structural(self.callable, "try scope mismatch")),
        };

        for (clause, handler) in catches.iter().zip(handlers) {
            if handler.incoming.is_empty() {
                debug!(callable = %self.callable, syntax = %clause.id, "catch clause never entered");
                self.cfg.unreachable.push(clause.id);
                continue;
            }
            self.pending = handler.incoming;
            let text = match &clause.exception_type {
                Some(ty) => format!("catch ({} {})", ty, clause.var),
                None => format!("catch ({})", clause.var),
            };
            let mut node = self.node(NodeKind::Catch, text);
            node.syntax = Some(clause.id);
            node.defs.push(clause.var.clone());
            self.place(node);
            self.lower_block(&clause.body)?;
            normal.extend(mem::take(&mut self.pending));
        }

        let scope = match self.scopes.pop() {
            Some(Scope::Try(t)) => t,
            _ => return Err(SlicingError::structural(self.callable, "try scope mismatch")),
        };

        let Some(finally) = finally else {
            self.pending = normal;
            return Ok(());
        };

        let first = self.cfg.node_count();
        let completes_normally = !normal.is_empty();
        self.pending = normal;
        self.pending
            .extend(scope.escapes.iter().map(|(p, _)| p.clone()));
        self.lower_block(finally)?;

        if self.cfg.node_count() == first {
            // Empty finally: each transfer continues from where it started
            self.pending.retain(|p| {
                !scope
                    .escapes
                    .iter()
                    .any(|(e, _)| e.from == p.from && e.edge == p.edge)
            });
            for (pending, escape) in scope.escapes {
                self.route(pending, escape)?;
            }
            return Ok(());
        }

        let tails = mem::take(&mut self.pending);
        if completes_normally {
            self.pending = tails.clone();
        }

        let mut kinds: Vec<Escape> = Vec::new();
        for (_, escape) in scope.escapes {
            if !kinds.contains(&escape) {
                kinds.push(escape);
            }
        }
        for escape in kinds {
            for tail in &tails {
                let mut pending = tail.clone();
                if let Escape::Throw(_) = escape {
                    pending.edge = escape.edge();
                }
                self.route(pending, escape.clone())?;
            }
        }
        Ok(())
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Exit sequence
    // ═══════════════════════════════════════════════════════════════════════

    fn finish(mut self, decl: &CallableDecl, exit: NodeId) -> ControlFlowGraph {
        self.pending.extend(mem::take(&mut self.returns));

        let mut head = None;
        if decl.returns_value {
            let mut node = self.node(
                NodeKind::FormalOut {
                    slot: OutputSlot::Return,
                },
                "out return",
            );
            node.uses.push(RETURN_VAR.to_string());
            let id = self.place(node);
            self.cfg.formals.outs.push((OutputSlot::Return, id));
            head.get_or_insert(id);
        }
        for (position, param) in decl.params.iter().enumerate() {
            if param.passing != ParamPassing::ByReference {
                continue;
            }
            let slot = OutputSlot::Param(position);
            let mut node = self.node(NodeKind::FormalOut { slot }, format!("out {}", param.name));
            node.uses.push(param.name.clone());
            let id = self.place(node);
            self.cfg.formals.outs.push((slot, id));
            head.get_or_insert(id);
        }

        for p in mem::take(&mut self.pending) {
            self.cfg.add_edge(p.from, exit, p.edge);
        }
        if let Some(head) = head {
            self.cfg.set_exit_head(head);
        }

        // Only loops that really cannot reach the exit sequence are flagged
        let adjacency = Adjacency::from_cfg(&self.cfg);
        let reaches_exit = adjacency.reachable(adjacency.exit, false);
        for header in self.loop_candidates {
            let reaches = self
                .cfg
                .index_of(header)
                .map(|idx| reaches_exit.contains(idx.index()))
                .unwrap_or(true);
            if !reaches {
                warn!(callable = %self.callable, header = %header, "non-terminating loop flagged");
                self.cfg.non_terminating.push(header);
            }
        }
        self.cfg
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared::models::{Argument, Receiver, SyntaxId};
    use crate::shared::utils::ProgramBuilder;

    fn build(b: ProgramBuilder, callable: CallableId) -> Result<ControlFlowGraph> {
        let program = b.build();
        let hierarchy = TypeHierarchyIndex::build(&program).unwrap();
        let ids = NodeIdGenerator::new();
        let decl = program.callable(callable).unwrap();
        CfgBuilder::new(&ids, &hierarchy).build(decl)
    }

    fn at(cfg: &ControlFlowGraph, syntax: SyntaxId) -> NodeId {
        cfg.node_for_syntax(syntax).unwrap().id
    }

    fn edge_kinds(cfg: &ControlFlowGraph, from: NodeId, to: NodeId) -> Vec<FlowKind> {
        cfg.out_edges(from)
            .into_iter()
            .filter(|(t, _)| *t == to)
            .map(|(_, e)| e.kind)
            .collect()
    }

    #[test]
    fn test_sequence() {
        let mut b = ProgramBuilder::new();
        let t = b.class("Main", &[]);
        let m = b.static_method(t, "main", &[]);
        let s1 = b.assign("x = 1", "x", &[]);
        let s2 = b.assign("y = x + 1", "y", &["x"]);
        let (id1, id2) = (s1.id, s2.id);
        b.body(m, vec![s1, s2]);

        let cfg = build(b, m).unwrap();
        let (n1, n2) = (at(&cfg, id1), at(&cfg, id2));
        assert_eq!(cfg.node_count(), 4);
        assert_eq!(cfg.successors(cfg.entry().id), vec![n1]);
        assert_eq!(cfg.successors(n1), vec![n2]);
        assert_eq!(cfg.successors(n2), vec![cfg.exit().id]);
        assert!(cfg.predecessors(cfg.entry().id).is_empty());
    }

    #[test]
    fn test_bodiless_callable() {
        let mut b = ProgramBuilder::new();
        let t = b.class("Shape", &[]);
        let m = b.method(t, "area", &["scale"]);

        let cfg = build(b, m).unwrap();
        assert_eq!(cfg.node_count(), 2);
        assert_eq!(cfg.successors(cfg.entry().id), vec![cfg.exit().id]);
        assert!(cfg.formals.ins.is_empty());
    }

    #[test]
    fn test_if_else_branches_converge() {
        let mut b = ProgramBuilder::new();
        let t = b.class("Main", &[]);
        let m = b.static_method(t, "main", &["c"]);
        let a1 = b.assign("a = 1", "a", &[]);
        let a2 = b.assign("a = 2", "a", &[]);
        let (id1, id2) = (a1.id, a2.id);
        let cond = b.if_else("if (c)", Effects::new().uses(["c"]), vec![a1], vec![a2]);
        let cond_id = cond.id;
        let use_a = b.simple("use(a)", Effects::new().uses(["a"]));
        let use_id = use_a.id;
        b.body(m, vec![cond, use_a]);

        let cfg = build(b, m).unwrap();
        let pred = at(&cfg, cond_id);
        assert_eq!(edge_kinds(&cfg, pred, at(&cfg, id1)), vec![FlowKind::TrueBranch]);
        assert_eq!(edge_kinds(&cfg, pred, at(&cfg, id2)), vec![FlowKind::FalseBranch]);
        assert_eq!(
            cfg.predecessors(at(&cfg, use_id)),
            vec![at(&cfg, id1), at(&cfg, id2)]
        );
    }

    #[test]
    fn test_if_without_else_falls_through() {
        let mut b = ProgramBuilder::new();
        let t = b.class("Main", &[]);
        let m = b.static_method(t, "main", &["c"]);
        let a1 = b.assign("a = 1", "a", &[]);
        let cond = b.if_else("if (c)", Effects::new().uses(["c"]), vec![a1], vec![]);
        let cond_id = cond.id;
        let after = b.assign("b = a", "b", &["a"]);
        let after_id = after.id;
        b.body(m, vec![cond, after]);

        let cfg = build(b, m).unwrap();
        assert_eq!(
            edge_kinds(&cfg, at(&cfg, cond_id), at(&cfg, after_id)),
            vec![FlowKind::FalseBranch]
        );
    }

    #[test]
    fn test_while_back_edge() {
        let mut b = ProgramBuilder::new();
        let t = b.class("Main", &[]);
        let m = b.static_method(t, "main", &["n"]);
        let body = b.assign("i = i + 1", "i", &["i"]);
        let body_id = body.id;
        let w = b.while_loop("while (i < n)", Effects::new().uses(["i", "n"]), vec![body]);
        let w_id = w.id;
        b.body(m, vec![w]);

        let cfg = build(b, m).unwrap();
        let head = at(&cfg, w_id);
        let inc = at(&cfg, body_id);
        assert_eq!(edge_kinds(&cfg, head, inc), vec![FlowKind::TrueBranch]);
        assert_eq!(edge_kinds(&cfg, inc, head), vec![FlowKind::LoopBack]);
        assert_eq!(
            edge_kinds(&cfg, head, cfg.exit().id),
            vec![FlowKind::FalseBranch]
        );
    }

    #[test]
    fn test_break_and_continue() {
        let mut b = ProgramBuilder::new();
        let t = b.class("Main", &[]);
        let m = b.static_method(t, "main", &[]);
        let brk = b.stmt("break", StmtKind::Break);
        let cont = b.stmt("continue", StmtKind::Continue);
        let (brk_id, cont_id) = (brk.id, cont.id);
        let inner = b.if_else("if (p)", Effects::new().uses(["p"]), vec![brk], vec![cont]);
        let w = b.while_loop("while (q)", Effects::new().uses(["q"]), vec![inner]);
        let w_id = w.id;
        let after = b.assign("done = 1", "done", &[]);
        let after_id = after.id;
        b.body(m, vec![w, after]);

        let cfg = build(b, m).unwrap();
        assert_eq!(cfg.successors(at(&cfg, brk_id)), vec![at(&cfg, after_id)]);
        assert_eq!(
            edge_kinds(&cfg, at(&cfg, cont_id), at(&cfg, w_id)),
            vec![FlowKind::LoopBack]
        );
    }

    #[test]
    fn test_do_while_continue_flows_forward_to_condition() {
        let mut b = ProgramBuilder::new();
        let t = b.class("Main", &[]);
        let m = b.static_method(t, "main", &[]);
        let cont = b.stmt("continue", StmtKind::Continue);
        let cont_id = cont.id;
        let skip = b.if_else("if (p)", Effects::new().uses(["p"]), vec![cont], vec![]);
        let skip_id = skip.id;
        let inc = b.assign("n = n + 1", "n", &["n"]);
        let inc_id = inc.id;
        let dw = b.stmt(
            "do { ... } while (n < 10)",
            StmtKind::DoWhile {
                body: vec![skip, inc],
                cond: Effects::new().uses(["n"]),
            },
        );
        let dw_id = dw.id;
        b.body(m, vec![dw]);

        let cfg = build(b, m).unwrap();
        let cond = at(&cfg, dw_id);
        assert_eq!(
            edge_kinds(&cfg, at(&cfg, cont_id), cond),
            vec![FlowKind::Unconditional]
        );
        assert_eq!(
            edge_kinds(&cfg, at(&cfg, inc_id), cond),
            vec![FlowKind::Unconditional]
        );
        assert_eq!(
            edge_kinds(&cfg, cond, at(&cfg, skip_id)),
            vec![FlowKind::LoopBack]
        );
    }

    #[test]
    fn test_for_continue_runs_update_before_back_edge() {
        let mut b = ProgramBuilder::new();
        let t = b.class("Main", &[]);
        let m = b.static_method(t, "main", &["n"]);
        let init = b.assign("i = 0", "i", &[]);
        let cont = b.stmt("continue", StmtKind::Continue);
        let cont_id = cont.id;
        let skip = b.if_else("if (p)", Effects::new().uses(["p"]), vec![cont], vec![]);
        let update = b.assign("i = i + 1", "i", &["i"]);
        let update_id = update.id;
        let for_stmt = b.stmt(
            "for (i = 0; i < n; i = i + 1)",
            StmtKind::For {
                init: vec![init],
                cond: Some(Effects::new().uses(["i", "n"])),
                update: vec![update],
                body: vec![skip],
            },
        );
        let for_id = for_stmt.id;
        b.body(m, vec![for_stmt]);

        let cfg = build(b, m).unwrap();
        let upd = at(&cfg, update_id);
        assert_eq!(
            edge_kinds(&cfg, at(&cfg, cont_id), upd),
            vec![FlowKind::Unconditional]
        );
        assert_eq!(
            edge_kinds(&cfg, upd, at(&cfg, for_id)),
            vec![FlowKind::LoopBack]
        );
    }

    #[test]
    fn test_break_outside_loop_is_structural_error() {
        let mut b = ProgramBuilder::new();
        let t = b.class("Main", &[]);
        let m = b.static_method(t, "main", &[]);
        let brk = b.stmt("break", StmtKind::Break);
        b.body(m, vec![brk]);

        let err = build(b, m).unwrap_err();
        assert!(matches!(err, SlicingError::StructuralInvariant { .. }));
    }

    #[test]
    fn test_switch_without_default_bypasses() {
        let mut b = ProgramBuilder::new();
        let t = b.class("Main", &[]);
        let m = b.static_method(t, "main", &["k"]);
        let s1 = b.assign("a = 1", "a", &[]);
        let s2 = b.assign("a = 2", "a", &[]);
        let brk = b.stmt("break", StmtKind::Break);
        let (s1_id, s2_id) = (s1.id, s2.id);
        let c1 = b.case(Some("1"), vec![s1]);
        let c2 = b.case(Some("2"), vec![s2, brk]);
        let (c1_id, c2_id) = (c1.id, c2.id);
        let sw = b.stmt(
            "switch (k)",
            StmtKind::Switch {
                selector: Effects::new().uses(["k"]),
                cases: vec![c1, c2],
            },
        );
        let sw_id = sw.id;
        let after = b.assign("b = a", "b", &["a"]);
        let after_id = after.id;
        b.body(m, vec![sw, after]);

        let cfg = build(b, m).unwrap();
        let sel = at(&cfg, sw_id);
        let labels: Vec<String> = cfg
            .out_edges(sel)
            .into_iter()
            .map(|(_, e)| e.display_label())
            .collect();
        assert_eq!(labels, vec!["true:1", "true:2", "false:default"]);

        // fallthrough from case 1 into case 2's label
        assert_eq!(cfg.successors(at(&cfg, s1_id)), vec![at(&cfg, c2_id)]);
        assert_eq!(cfg.successors(at(&cfg, c1_id)), vec![at(&cfg, s1_id)]);
        assert!(cfg.predecessors(at(&cfg, after_id)).contains(&sel));
        assert!(cfg.successors(at(&cfg, s2_id)).iter().all(|n| cfg.node(*n).unwrap().kind == NodeKind::Break));
    }

    #[test]
    fn test_statements_after_return_are_unreachable() {
        let mut b = ProgramBuilder::new();
        let t = b.class("Main", &[]);
        let m = b.static_method(t, "f", &[]);
        b.returns_value(m);
        let ret = b.ret("return 1", Some(Effects::new()));
        let dead = b.assign("x = 2", "x", &[]);
        let dead_id = dead.id;
        b.body(m, vec![ret, dead]);

        let cfg = build(b, m).unwrap();
        assert_eq!(cfg.unreachable, vec![dead_id]);
        assert!(cfg.node_for_syntax(dead_id).is_none());
        assert_eq!(cfg.formals.outs.len(), 1);
        assert_eq!(cfg.exit_head().kind, NodeKind::FormalOut { slot: OutputSlot::Return });
    }

    #[test]
    fn test_throw_routes_to_matching_catch() {
        let mut b = ProgramBuilder::new();
        let exc = b.class("Exception", &[]);
        let io = b.class("IOException", &[exc]);
        let _ = io;
        let t = b.class("Main", &[]);
        let m = b.static_method(t, "main", &[]);
        let throw = b.stmt(
            "throw new IOException()",
            StmtKind::Throw {
                exception_type: "IOException".to_string(),
                value: Effects::new(),
            },
        );
        let throw_id = throw.id;
        let handler_body = b.assign("log = e", "log", &["e"]);
        let catch = b.catch(Some("Exception"), "e", vec![handler_body]);
        let catch_id = catch.id;
        let try_stmt = b.stmt(
            "try",
            StmtKind::Try {
                body: vec![throw],
                catches: vec![catch],
                finally: None,
            },
        );
        b.body(m, vec![try_stmt]);

        let cfg = build(b, m).unwrap();
        let out = cfg.out_edges(at(&cfg, throw_id));
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].0, at(&cfg, catch_id));
        assert_eq!(out[0].1.kind, FlowKind::Exceptional);
        assert_eq!(out[0].1.label.as_deref(), Some("IOException"));
    }

    #[test]
    fn test_uncaught_throw_reaches_exit() {
        let mut b = ProgramBuilder::new();
        let t = b.class("Main", &[]);
        let m = b.static_method(t, "main", &[]);
        let throw = b.stmt(
            "throw new Error()",
            StmtKind::Throw {
                exception_type: "Error".to_string(),
                value: Effects::new(),
            },
        );
        let throw_id = throw.id;
        b.body(m, vec![throw]);

        let cfg = build(b, m).unwrap();
        assert_eq!(
            edge_kinds(&cfg, at(&cfg, throw_id), cfg.exit().id),
            vec![FlowKind::Exceptional]
        );
    }

    #[test]
    fn test_return_passes_through_finally() {
        let mut b = ProgramBuilder::new();
        let t = b.class("Main", &[]);
        let m = b.static_method(t, "main", &[]);
        let ret = b.ret("return", None);
        let ret_id = ret.id;
        let cleanup = b.assign("closed = 1", "closed", &[]);
        let cleanup_id = cleanup.id;
        let try_stmt = b.stmt(
            "try",
            StmtKind::Try {
                body: vec![ret],
                catches: vec![],
                finally: Some(vec![cleanup]),
            },
        );
        let after = b.assign("x = 1", "x", &[]);
        let after_id = after.id;
        b.body(m, vec![try_stmt, after]);

        let cfg = build(b, m).unwrap();
        assert_eq!(cfg.successors(at(&cfg, ret_id)), vec![at(&cfg, cleanup_id)]);
        assert_eq!(cfg.successors(at(&cfg, cleanup_id)), vec![cfg.exit().id]);
        assert_eq!(cfg.unreachable, vec![after_id]);
    }

    #[test]
    fn test_call_lowering() {
        let mut b = ProgramBuilder::new();
        let t = b.class("Main", &[]);
        let f = b.static_method(t, "f", &["p"]);
        b.returns_value(f);
        let m = b.static_method(t, "main", &["x"]);
        let site = b.call("f(x)", f, vec![Argument::var("x")]);
        let site_id = site.id;
        let stmt = b.simple("r = f(x)", Effects::new().def("r").call(site));
        let stmt_id = stmt.id;
        b.body(m, vec![stmt]);

        let cfg = build(b, m).unwrap();
        let nodes = cfg.call_site(site_id).unwrap();
        assert_eq!(nodes.actual_ins.len(), 1);
        assert_eq!(cfg.formals.ins.len(), 1);
        assert_eq!(cfg.successors(cfg.formals.ins[0]), vec![nodes.actual_ins[0]]);
        assert_eq!(cfg.successors(nodes.actual_ins[0]), vec![nodes.call_node]);
        let out = nodes.actual_out(OutputSlot::Return).unwrap();
        assert_eq!(cfg.successors(nodes.call_node), vec![out]);
        assert_eq!(cfg.successors(out), vec![at(&cfg, stmt_id)]);

        let stmt_node = cfg.node(at(&cfg, stmt_id)).unwrap();
        assert!(stmt_node.contains_call(site_id));
        assert!(stmt_node.reads(&crate::shared::models::result_var(site_id)));
    }

    #[test]
    fn test_by_reference_argument_gets_actual_out() {
        let mut b = ProgramBuilder::new();
        let t = b.class("Main", &[]);
        let swap = b.static_method(t, "fill", &["buf"]);
        b.by_reference(swap, 0);
        let m = b.static_method(t, "main", &[]);
        let mut site = b.call("fill(buf)", swap, vec![Argument::var("buf")]);
        site.result_used = false;
        let site_id = site.id;
        let stmt = b.simple("fill(buf)", Effects::new().call(site));
        b.body(m, vec![stmt]);

        let cfg = build(b, m).unwrap();
        let nodes = cfg.call_site(site_id).unwrap();
        let out = nodes.actual_out(OutputSlot::Param(0)).unwrap();
        assert!(cfg.node(out).unwrap().defines("buf"));
        assert!(nodes.actual_out(OutputSlot::Return).is_none());
    }

    #[test]
    fn test_virtual_call_in_condition_is_loop_head() {
        let mut b = ProgramBuilder::new();
        let t = b.class("Iter", &[]);
        let has_next = b.method(t, "hasNext", &[]);
        let m = b.method(t, "drain", &[]);
        let site = b.virtual_call("hasNext()", has_next, Receiver::Implicit, vec![]);
        let site_id = site.id;
        let body = b.assign("n = n + 1", "n", &["n"]);
        let body_id = body.id;
        let w = b.while_loop("while (hasNext())", Effects::new().call(site), vec![body]);
        b.body(m, vec![w]);

        let cfg = build(b, m).unwrap();
        let call_node = cfg.call_site(site_id).unwrap().call_node;
        assert_eq!(
            edge_kinds(&cfg, at(&cfg, body_id), call_node),
            vec![FlowKind::LoopBack]
        );
    }

    #[test]
    fn test_infinite_for_is_flagged() {
        let mut b = ProgramBuilder::new();
        let t = b.class("Main", &[]);
        let m = b.static_method(t, "serve", &[]);
        let body = b.assign("n = n + 1", "n", &["n"]);
        let for_stmt = b.stmt(
            "for (;;)",
            StmtKind::For {
                init: vec![],
                cond: None,
                update: vec![],
                body: vec![body],
            },
        );
        let for_id = for_stmt.id;
        b.body(m, vec![for_stmt]);

        let cfg = build(b, m).unwrap();
        assert_eq!(cfg.non_terminating, vec![at(&cfg, for_id)]);
        assert!(cfg.predecessors(cfg.exit().id).is_empty());
    }

    #[test]
    fn test_infinite_for_with_return_not_flagged() {
        let mut b = ProgramBuilder::new();
        let t = b.class("Main", &[]);
        let m = b.static_method(t, "poll", &[]);
        let ret = b.ret("return", None);
        let check = b.if_else("if (ready)", Effects::new().uses(["ready"]), vec![ret], vec![]);
        let for_stmt = b.stmt(
            "for (;;)",
            StmtKind::For {
                init: vec![],
                cond: None,
                update: vec![],
                body: vec![check],
            },
        );
        b.body(m, vec![for_stmt]);

        let cfg = build(b, m).unwrap();
        assert!(cfg.non_terminating.is_empty());
    }
}

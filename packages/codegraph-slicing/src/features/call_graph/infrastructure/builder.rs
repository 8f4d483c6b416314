//! Call graph construction
//!
//! Resolution policy:
//! - static dispatch, static methods, constructors and initializers: the
//!   declared target only
//! - virtual dispatch: every declaration found for the signature from each
//!   subtype of the receiver's static type; inherited declarations collapse
//!   into the ancestor's edge
//!
//! Call sites are resolved per caller in parallel; edges are inserted by a
//! single writer afterwards so the graph is identical across runs.

use rayon::prelude::*;
use rustc_hash::FxHashSet;
use tracing::{debug, warn};

use crate::errors::{ResolutionError, Result};
use crate::features::call_graph::domain::{CallEdge, CallGraph};
use crate::features::flow_graph::domain::ControlFlowGraph;
use crate::features::type_hierarchy::{DeclarationInfo, TypeHierarchy, TypeHierarchyIndex};
use crate::shared::models::{CallSite, CallTarget, CallableId, Dispatch, Receiver, TypeId};

type ResolvedEdge = (CallableId, CallableId, CallEdge);

pub struct CallGraphBuilder<'a> {
    hierarchy: &'a TypeHierarchyIndex,
    excluded: FxHashSet<CallableId>,
}

impl<'a> CallGraphBuilder<'a> {
    pub fn new(hierarchy: &'a TypeHierarchyIndex) -> Self {
        Self {
            hierarchy,
            excluded: FxHashSet::default(),
        }
    }

    /// Leave these callables (and every edge into them) out of the graph
    pub fn exclude(mut self, callables: impl IntoIterator<Item = CallableId>) -> Self {
        self.excluded.extend(callables);
        self
    }

    pub fn build<'c, I>(&self, cfgs: I) -> Result<CallGraph>
    where
        I: IntoIterator<Item = &'c ControlFlowGraph>,
    {
        let cfgs: Vec<&ControlFlowGraph> = cfgs.into_iter().collect();
        let resolved: Vec<Vec<ResolvedEdge>> = cfgs
            .par_iter()
            .map(|cfg| self.resolve_cfg(cfg))
            .collect::<Result<_>>()?;

        let mut graph = CallGraph::new();
        for decl in self.hierarchy.declarations() {
            if !self.excluded.contains(&decl.id) {
                graph.add_vertex(decl.id);
            }
        }
        for (caller, callee, edge) in resolved.into_iter().flatten() {
            if self.excluded.contains(&callee) {
                warn!(caller = %caller, callee = %callee, call_site = %edge.call_site, "call into excluded callable dropped");
                graph.mark_excluded(edge.call_site, callee);
                continue;
            }
            graph.add_edge(caller, callee, edge);
        }

        debug!(
            vertices = graph.vertex_count(),
            edges = graph.edge_count(),
            "call graph built"
        );
        Ok(graph)
    }

    fn resolve_cfg(&self, cfg: &ControlFlowGraph) -> Result<Vec<ResolvedEdge>> {
        let caller = self
            .hierarchy
            .declaration(cfg.callable())
            .ok_or(ResolutionError::UnknownCallable(cfg.callable()))?;

        let mut edges = Vec::new();
        for nodes in &cfg.call_sites {
            let edge = CallEdge {
                call_site: nodes.site.id,
                call_node: nodes.call_node,
            };
            for callee in self.resolve(caller, &nodes.site)? {
                edges.push((caller.id, callee, edge));
            }
        }
        Ok(edges)
    }

    /// Possible targets of `site` when executed inside `caller`.
    ///
    /// External targets resolve to nothing. A virtual call with no target
    /// is a [`ResolutionError::NoDispatchTarget`].
    pub fn resolve(&self, caller: &DeclarationInfo, site: &CallSite) -> Result<Vec<CallableId>> {
        let declared = match &site.target {
            CallTarget::External { .. } => return Ok(Vec::new()),
            CallTarget::Declared { callable } => *callable,
        };
        let callee = self
            .hierarchy
            .declaration(declared)
            .ok_or(ResolutionError::UnknownCallable(declared))?;

        let receiver = match &site.dispatch {
            Dispatch::Virtual { receiver } if callee.is_dispatched() => receiver,
            _ => return Ok(vec![declared]),
        };

        let root = self.dispatch_root(caller, callee, receiver);
        if self.hierarchy.type_name(root).is_none() {
            return Err(ResolutionError::UnknownType(root).into());
        }

        let mut targets = Vec::new();
        for t in self.hierarchy.subtypes_of(root) {
            if let Some(m) = self.hierarchy.find_method(t, &callee.signature) {
                if !targets.contains(&m) {
                    targets.push(m);
                }
            }
        }

        if targets.is_empty() {
            return Err(ResolutionError::NoDispatchTarget {
                call_site: site.id,
                signature: callee.signature.to_string(),
            }
            .into());
        }
        targets.sort();
        Ok(targets)
    }

    /// Static type the runtime receiver is known to conform to
    fn dispatch_root(&self, caller: &DeclarationInfo, callee: &DeclarationInfo, receiver: &Receiver) -> TypeId {
        match receiver {
            Receiver::Expr { static_type } => *static_type,
            Receiver::This {
                qualifier: Some(q),
            } => *q,
            Receiver::Implicit | Receiver::This { qualifier: None } => {
                // an implicit call from an unrelated (e.g. nested) type targets the declaring type
                if self.hierarchy.is_subtype(caller.owner, callee.owner) {
                    caller.owner
                } else {
                    callee.owner
                }
            }
        }
    }
}

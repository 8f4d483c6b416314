/*
 * System Dependence Graph
 *
 * Union of every PDG plus, per call graph edge (call site -> callee):
 * - call edge: call node -> callee entry
 * - parameter-in: actual-in(i) -> formal-in(i), positional; arity
 *   mismatches across dispatch targets are skipped
 * - parameter-out: formal-out(slot) -> actual-out(slot)
 * and summary edges actual-in -> actual-out (see `summary`).
 *
 * Read-only once built; slicers share it by reference.
 */

use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::EdgeRef;
use petgraph::Direction;
use rustc_hash::FxHashMap;
use std::collections::BTreeMap;
use tracing::debug;

use crate::config::SdgConfig;
use crate::errors::{ResolutionError, Result};
use crate::features::call_graph::CallGraph;
use crate::features::pdg::ProgramDependenceGraph;
use crate::features::sdg::domain::{
    CallSiteRecord, Procedure, SdgDto, SdgEdgeDto, SdgNodeDto, SdgStats, SummaryStats,
};
use crate::features::sdg::infrastructure::summary::{add_opaque_summaries, compute_summary_edges};
use crate::features::type_hierarchy::TypeHierarchyIndex;
use crate::shared::models::{CallSiteId, CallableId, Dependence, Node, NodeId, SyntaxId};

#[derive(Debug, Clone, Default)]
pub struct SystemDependenceGraph {
    graph: DiGraph<Node, Dependence>,
    index: FxHashMap<NodeId, NodeIndex>,
    by_syntax: FxHashMap<SyntaxId, NodeId>,
    procedures: BTreeMap<CallableId, Procedure>,
    call_sites: BTreeMap<CallSiteId, CallSiteRecord>,
    summary_stats: SummaryStats,
}

impl SystemDependenceGraph {
    // ═══════════════════════════════════════════════════════════════════════
    // Queries
    // ═══════════════════════════════════════════════════════════════════════

    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.index.get(&id).map(|&idx| &self.graph[idx])
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.index.contains_key(&id)
    }

    /// Nodes grouped by callable, in callable id order
    pub fn nodes(&self) -> impl Iterator<Item = &Node> + '_ {
        self.graph.node_weights()
    }

    /// `(from, to, dependence)` in insertion order
    pub fn edges(&self) -> impl Iterator<Item = (NodeId, NodeId, &Dependence)> + '_ {
        self.graph.edge_references().map(move |e| {
            (
                self.graph[e.source()].id,
                self.graph[e.target()].id,
                e.weight(),
            )
        })
    }

    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    /// Edges into `id` as `(source, dependence)`
    pub fn incoming(&self, id: NodeId) -> Vec<(NodeId, &Dependence)> {
        self.adjacent(id, Direction::Incoming)
    }

    /// Edges out of `id` as `(target, dependence)`
    pub fn outgoing(&self, id: NodeId) -> Vec<(NodeId, &Dependence)> {
        self.adjacent(id, Direction::Outgoing)
    }

    fn adjacent(&self, id: NodeId, dir: Direction) -> Vec<(NodeId, &Dependence)> {
        let Some(&idx) = self.index.get(&id) else {
            return Vec::new();
        };
        let mut edges: Vec<_> = self.graph.edges_directed(idx, dir).collect();
        edges.sort_by_key(|e| e.id().index());
        edges
            .into_iter()
            .map(|e| {
                let other = match dir {
                    Direction::Incoming => e.source(),
                    Direction::Outgoing => e.target(),
                };
                (self.graph[other].id, e.weight())
            })
            .collect()
    }

    pub fn has_edge(&self, from: NodeId, to: NodeId, dependence: &Dependence) -> bool {
        let (Some(&a), Some(&b)) = (self.index.get(&from), self.index.get(&to)) else {
            return false;
        };
        self.graph
            .edges_connecting(a, b)
            .any(|e| e.weight() == dependence)
    }

    /// Node created for a source statement, case label or catch clause
    pub fn node_for_syntax(&self, syntax: SyntaxId) -> Option<NodeId> {
        self.by_syntax.get(&syntax).copied()
    }

    /// Syntax-backed nodes whose span starts on `line`
    pub fn nodes_on_line(&self, line: u32) -> Vec<NodeId> {
        let mut out: Vec<NodeId> = self
            .nodes()
            .filter(|n| n.syntax.is_some())
            .filter(|n| n.span.map(|s| s.start_line == line).unwrap_or(false))
            .map(|n| n.id)
            .collect();
        out.sort();
        out
    }

    pub fn procedure(&self, callable: CallableId) -> Option<&Procedure> {
        self.procedures.get(&callable)
    }

    pub fn procedures(&self) -> impl Iterator<Item = &Procedure> + '_ {
        self.procedures.values()
    }

    pub fn call_site(&self, call_site: CallSiteId) -> Option<&CallSiteRecord> {
        self.call_sites.get(&call_site)
    }

    pub fn call_sites(&self) -> impl Iterator<Item = &CallSiteRecord> + '_ {
        self.call_sites.values()
    }

    /// `(actual-in, actual-out, call site)` for every summary edge
    pub fn summary_edges(&self) -> Vec<(NodeId, NodeId, CallSiteId)> {
        self.edges()
            .filter_map(|(from, to, dep)| match dep {
                Dependence::Summary { call_site } => Some((from, to, *call_site)),
                _ => None,
            })
            .collect()
    }

    pub fn summary_stats(&self) -> SummaryStats {
        self.summary_stats
    }

    pub fn stats(&self) -> SdgStats {
        let mut stats = SdgStats {
            procedures: self.procedures.len(),
            call_sites: self.call_sites.len(),
            nodes: self.graph.node_count(),
            ..SdgStats::default()
        };
        for dep in self.graph.edge_weights() {
            match dep {
                Dependence::Control => stats.control_edges += 1,
                Dependence::Data { .. } => stats.data_edges += 1,
                Dependence::Call { .. } => stats.call_edges += 1,
                Dependence::ParameterIn { .. } => stats.param_in_edges += 1,
                Dependence::ParameterOut { .. } => stats.param_out_edges += 1,
                Dependence::Summary { .. } => stats.summary_edges += 1,
            }
        }
        stats
    }

    pub fn to_dto(&self) -> SdgDto {
        SdgDto {
            nodes: self
                .nodes()
                .map(|n| SdgNodeDto {
                    id: n.id,
                    callable: n.callable,
                    kind: n.kind.as_str().to_string(),
                    label: n.short_label(),
                    line: n.span.map(|s| s.start_line),
                })
                .collect(),
            edges: self
                .edges()
                .map(|(from, to, dep)| SdgEdgeDto {
                    from,
                    to,
                    kind: dep.as_str().to_string(),
                    label: dep.to_string(),
                })
                .collect(),
            stats: self.stats(),
        }
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Mutation (construction and summary computation only)
    // ═══════════════════════════════════════════════════════════════════════

    fn insert_node(&mut self, node: Node) {
        let id = node.id;
        if let Some(syntax) = node.syntax {
            self.by_syntax.insert(syntax, id);
        }
        let idx = self.graph.add_node(node);
        self.index.insert(id, idx);
    }

    fn add_edge(&mut self, from: NodeId, to: NodeId, dependence: Dependence) {
        if let (Some(&a), Some(&b)) = (self.index.get(&from), self.index.get(&to)) {
            self.graph.add_edge(a, b, dependence);
        }
    }

    /// Add a summary edge unless already present
    pub(crate) fn add_summary_edge(&mut self, from: NodeId, to: NodeId, call_site: CallSiteId) -> bool {
        let dep = Dependence::Summary { call_site };
        if self.has_edge(from, to, &dep) {
            return false;
        }
        self.add_edge(from, to, dep);
        true
    }

    /// Drop the fixed-point summary edges; returns how many
    ///
    /// Edges at opaque sites stay, since nothing recomputes them.
    pub fn clear_summary_edges(&mut self) -> usize {
        let sites = &self.call_sites;
        let before = self.graph.edge_count();
        self.graph.retain_edges(|g, e| match g.edge_weight(e) {
            Some(Dependence::Summary { call_site }) => {
                sites.get(call_site).is_some_and(|r| r.opaque)
            }
            _ => true,
        });
        self.summary_stats = SummaryStats {
            opaque_edges: self.summary_stats.opaque_edges,
            ..SummaryStats::default()
        };
        before - self.graph.edge_count()
    }

    pub(crate) fn set_summary_stats(&mut self, stats: SummaryStats) {
        self.summary_stats = stats;
    }

    pub(crate) fn graph(&self) -> &DiGraph<Node, Dependence> {
        &self.graph
    }

    pub(crate) fn index_of(&self, id: NodeId) -> Option<NodeIndex> {
        self.index.get(&id).copied()
    }
}

/// Assembles the SDG from per-callable PDGs and the call graph
pub struct SdgBuilder<'a> {
    config: &'a SdgConfig,
}

impl<'a> SdgBuilder<'a> {
    pub fn new(config: &'a SdgConfig) -> Self {
        Self { config }
    }

    pub fn build(
        &self,
        pdgs: &BTreeMap<CallableId, ProgramDependenceGraph>,
        call_graph: &CallGraph,
        hierarchy: &TypeHierarchyIndex,
    ) -> Result<SystemDependenceGraph> {
        let mut sdg = SystemDependenceGraph::default();

        for pdg in pdgs.values() {
            let callable = pdg.callable();
            let decl = hierarchy
                .declaration(callable)
                .ok_or(ResolutionError::UnknownCallable(callable))?;
            for node in pdg.nodes() {
                sdg.insert_node(node.clone());
            }
            for (from, to, dep) in pdg.edges() {
                sdg.add_edge(from, to, dep.clone());
            }
            sdg.procedures.insert(
                callable,
                Procedure {
                    callable,
                    entry: pdg.entry(),
                    exit: pdg.exit(),
                    has_body: decl.has_body,
                    formal_ins: pdg.formals().ins.clone(),
                    formal_outs: pdg.formals().outs.clone(),
                },
            );
        }

        for pdg in pdgs.values() {
            for nodes in pdg.call_sites() {
                let targets = call_graph.targets_of(nodes.site.id).to_vec();
                let excluded_targets = call_graph.excluded_targets_of(nodes.site.id).to_vec();
                let opaque = !excluded_targets.is_empty()
                    || !targets.iter().any(|t| {
                        sdg.procedures
                            .get(t)
                            .map(|p| p.has_body)
                            .unwrap_or(false)
                    });
                sdg.call_sites.insert(
                    nodes.site.id,
                    CallSiteRecord {
                        call_site: nodes.site.id,
                        caller: pdg.callable(),
                        call_node: nodes.call_node,
                        actual_ins: nodes.actual_ins.clone(),
                        actual_outs: nodes.actual_outs.clone(),
                        targets,
                        excluded_targets,
                        opaque,
                    },
                );
            }
        }

        for (caller, callee, edge) in call_graph.edges() {
            let record = sdg
                .call_sites
                .get(&edge.call_site)
                .filter(|r| r.caller == caller && r.call_node == edge.call_node)
                .cloned()
                .ok_or(ResolutionError::CallNodeNotFound {
                    call_site: edge.call_site,
                    callable: caller,
                })?;
            let procedure = sdg
                .procedures
                .get(&callee)
                .cloned()
                .ok_or(ResolutionError::UnknownCallable(callee))?;

            sdg.add_edge(
                record.call_node,
                procedure.entry,
                Dependence::Call {
                    call_site: edge.call_site,
                },
            );
            for (position, (&actual, &formal)) in record
                .actual_ins
                .iter()
                .zip(&procedure.formal_ins)
                .enumerate()
            {
                sdg.add_edge(actual, formal, Dependence::ParameterIn { position });
            }
            for &(slot, actual_out) in &record.actual_outs {
                if let Some(formal_out) = procedure.formal_out(slot) {
                    sdg.add_edge(formal_out, actual_out, Dependence::ParameterOut { slot });
                }
            }
        }

        // Opaque sites are summarized under every config
        let mut summary = SummaryStats {
            opaque_edges: add_opaque_summaries(&mut sdg),
            ..SummaryStats::default()
        };
        if self.config.summary_edges {
            let computed = compute_summary_edges(&mut sdg, self.config.max_summary_rounds)?;
            summary.rounds = computed.rounds;
            summary.edges_added = computed.edges_added;
        }
        sdg.set_summary_stats(summary);

        debug!(
            procedures = sdg.procedures.len(),
            nodes = sdg.node_count(),
            edges = sdg.edge_count(),
            summary_edges = summary.edges_added + summary.opaque_edges,
            "SDG assembled"
        );
        Ok(sdg)
    }
}

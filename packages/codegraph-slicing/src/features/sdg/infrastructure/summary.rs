//! Summary edges
//!
//! A summary edge `actual-in(i) -> actual-out(o)` at a call site records
//! that the callee's formal-out `o` transitively depends on formal-in `i`
//! through intraprocedural and summary edges. Computed as a least fixed
//! point in rounds:
//!
//! 1. every dirty callable with a body is analyzed in parallel: a backward
//!    walk from each formal-out collects the formal-ins it reaches
//! 2. a single writer installs the resulting edges at every call site that
//!    targets the callable; callers that gained an edge are dirty next round
//!
//! The edge set only grows, so the iteration terminates; the round cap turns
//! a runaway into [`SlicingError::FixedPointNontermination`].

use fixedbitset::FixedBitSet;
use petgraph::visit::EdgeRef;
use petgraph::Direction;
use rayon::prelude::*;
use std::collections::{BTreeMap, BTreeSet};
use tracing::debug;

use crate::errors::{Result, SlicingError};
use crate::features::sdg::domain::{Procedure, SummaryStats};
use crate::features::sdg::infrastructure::sdg::SystemDependenceGraph;
use crate::shared::models::{CallSiteId, CallableId, NodeId, OutputSlot};

/// `(formal-in position, formal-out slot)` pairs of one callable
type Transmission = Vec<(usize, OutputSlot)>;

/// Run the fixed point to completion; returns the work done
pub fn compute_summary_edges(sdg: &mut SystemDependenceGraph, max_rounds: usize) -> Result<SummaryStats> {
    let mut sites_by_target: BTreeMap<CallableId, Vec<CallSiteId>> = BTreeMap::new();
    for record in sdg.call_sites() {
        for &target in &record.targets {
            sites_by_target.entry(target).or_default().push(record.call_site);
        }
    }

    let mut dirty: BTreeSet<CallableId> = sdg
        .procedures()
        .filter(|p| p.has_body)
        .map(|p| p.callable)
        .collect();
    let mut stats = SummaryStats::default();

    for round in 1..=max_rounds {
        stats.rounds = round;
        // callables nobody calls cannot contribute edges
        let work: Vec<CallableId> = std::mem::take(&mut dirty)
            .into_iter()
            .filter(|c| sites_by_target.contains_key(c))
            .collect();

        let graph: &SystemDependenceGraph = sdg;
        let transmissions: Vec<(CallableId, Transmission)> = work
            .par_iter()
            .filter_map(|&c| graph.procedure(c).map(|p| (c, transmission(graph, p))))
            .collect();

        let mut added = 0;
        for (callee, pairs) in transmissions {
            if pairs.is_empty() {
                continue;
            }
            let sites = sites_by_target.get(&callee).map(Vec::as_slice).unwrap_or(&[]);
            for &site in sites {
                let Some(record) = sdg.call_site(site) else {
                    continue;
                };
                let caller = record.caller;
                let edges: Vec<(NodeId, NodeId)> = pairs
                    .iter()
                    .filter_map(|&(position, slot)| {
                        Some((*record.actual_ins.get(position)?, record.actual_out(slot)?))
                    })
                    .collect();
                for (from, to) in edges {
                    if sdg.add_summary_edge(from, to, site) {
                        added += 1;
                        dirty.insert(caller);
                    }
                }
            }
        }

        stats.edges_added += added;
        debug!(round, analyzed = work.len(), added, "summary round");
        if added == 0 {
            return Ok(stats);
        }
    }

    Err(SlicingError::FixedPointNontermination { rounds: max_rounds })
}

/// Which formal-ins each formal-out of `procedure` depends on
fn transmission(sdg: &SystemDependenceGraph, procedure: &Procedure) -> Transmission {
    let graph = sdg.graph();
    let mut pairs = Vec::new();

    for &(slot, formal_out) in &procedure.formal_outs {
        let Some(start) = sdg.index_of(formal_out) else {
            continue;
        };
        let mut seen = FixedBitSet::with_capacity(graph.node_count());
        seen.insert(start.index());
        let mut stack = vec![start];
        while let Some(v) = stack.pop() {
            for e in graph.edges_directed(v, Direction::Incoming) {
                if !e.weight().is_intraprocedural() {
                    continue;
                }
                let u = e.source();
                if !seen.put(u.index()) {
                    stack.push(u);
                }
            }
        }

        for (position, &formal_in) in procedure.formal_ins.iter().enumerate() {
            let reached = sdg
                .index_of(formal_in)
                .map(|idx| seen.contains(idx.index()))
                .unwrap_or(false);
            if reached {
                pairs.push((position, slot));
            }
        }
    }
    pairs
}

/// All-in to all-out summaries at call sites with no analyzable target
pub fn add_opaque_summaries(sdg: &mut SystemDependenceGraph) -> usize {
    let pending: Vec<(NodeId, NodeId, CallSiteId)> = sdg
        .call_sites()
        .filter(|r| r.opaque)
        .flat_map(|r| {
            r.actual_ins.iter().flat_map(move |&from| {
                r.actual_outs
                    .iter()
                    .map(move |&(_, to)| (from, to, r.call_site))
            })
        })
        .collect();

    pending
        .into_iter()
        .filter(|&(from, to, site)| sdg.add_summary_edge(from, to, site))
        .count()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SdgConfig;
    use crate::features::sdg::infrastructure::testing::assemble;
    use crate::shared::models::{Argument, Effects, Program};
    use crate::shared::utils::ProgramBuilder;
    use pretty_assertions::assert_eq;

    /// main: r = g(x)   g(q): t = f(q); return t   f(p): return p
    fn chain() -> (Program, CallSiteId, CallSiteId) {
        let mut b = ProgramBuilder::new();
        let t = b.class("Main", &[]);
        let f = b.static_method(t, "f", &["p"]);
        b.returns_value(f);
        let ret = b.ret("return p", Some(Effects::new().uses(["p"])));
        b.body(f, vec![ret]);

        let g = b.static_method(t, "g", &["q"]);
        b.returns_value(g);
        let inner = b.call("f(q)", f, vec![Argument::var("q")]);
        let inner_id = inner.id;
        let s1 = b.simple("t = f(q)", Effects::new().def("t").call(inner));
        let s2 = b.ret("return t", Some(Effects::new().uses(["t"])));
        b.body(g, vec![s1, s2]);

        let main = b.static_method(t, "main", &[]);
        let x = b.assign("x = 1", "x", &[]);
        let outer = b.call("g(x)", g, vec![Argument::var("x")]);
        let outer_id = outer.id;
        let r = b.simple("r = g(x)", Effects::new().def("r").call(outer));
        b.body(main, vec![x, r]);
        (b.build(), inner_id, outer_id)
    }

    fn sorted_summaries(sdg: &SystemDependenceGraph) -> Vec<(NodeId, NodeId, CallSiteId)> {
        let mut edges = sdg.summary_edges();
        edges.sort();
        edges
    }

    #[test]
    fn test_summary_propagates_through_chain() {
        let (program, inner, outer) = chain();
        let sdg = assemble(&program, &SdgConfig::default()).unwrap();

        let sites: Vec<CallSiteId> = sorted_summaries(&sdg).iter().map(|e| e.2).collect();
        assert_eq!(sites, vec![inner, outer]);
        let stats = sdg.summary_stats();
        assert_eq!(stats.edges_added, 2);
        // f's edge in round 1, g's in round 2, nothing new in round 3
        assert_eq!(stats.rounds, 3);
    }

    #[test]
    fn test_round_cap() {
        let (program, ..) = chain();
        let err = assemble(&program, &SdgConfig::default().max_summary_rounds(2)).unwrap_err();
        assert!(matches!(err, SlicingError::FixedPointNontermination { rounds: 2 }));
    }

    #[test]
    fn test_recompute_is_idempotent() {
        let (program, ..) = chain();
        let mut sdg = assemble(&program, &SdgConfig::default()).unwrap();
        let before = sorted_summaries(&sdg);

        let again = compute_summary_edges(&mut sdg, 10).unwrap();
        assert_eq!(again.edges_added, 0);
        assert_eq!(again.rounds, 1);

        assert_eq!(sdg.clear_summary_edges(), 2);
        assert!(sdg.summary_edges().is_empty());
        let fresh = compute_summary_edges(&mut sdg, 10).unwrap();
        assert_eq!(fresh.edges_added, 2);
        assert_eq!(sorted_summaries(&sdg), before);
    }

    #[test]
    fn test_recursion_terminates() {
        // f(n): if (n) { r = f(n) } else { r = n }; return r
        let mut b = ProgramBuilder::new();
        let t = b.class("Main", &[]);
        let f = b.static_method(t, "f", &["n"]);
        b.returns_value(f);
        let site = b.call("f(n)", f, vec![Argument::var("n")]);
        let site_id = site.id;
        let rec = b.simple("r = f(n)", Effects::new().def("r").call(site));
        let base = b.assign("r = n", "r", &["n"]);
        let cond = b.if_else("if (n)", Effects::new().uses(["n"]), vec![rec], vec![base]);
        let ret = b.ret("return r", Some(Effects::new().uses(["r"])));
        b.body(f, vec![cond, ret]);

        let sdg = assemble(&b.build(), &SdgConfig::default()).unwrap();
        let summaries = sdg.summary_edges();
        assert_eq!(summaries.len(), 1);
        assert_eq!(summaries[0].2, site_id);
        assert_eq!(sdg.summary_stats().rounds, 2);
    }

    #[test]
    fn test_unrelated_output_gets_no_summary() {
        // f(p): return 0
        let mut b = ProgramBuilder::new();
        let t = b.class("Main", &[]);
        let f = b.static_method(t, "f", &["p"]);
        b.returns_value(f);
        let ret = b.ret("return 0", Some(Effects::new()));
        b.body(f, vec![ret]);
        let main = b.static_method(t, "main", &[]);
        let site = b.call("f(x)", f, vec![Argument::var("x")]);
        let s = b.simple("r = f(x)", Effects::new().def("r").call(site));
        b.body(main, vec![s]);

        let sdg = assemble(&b.build(), &SdgConfig::default()).unwrap();
        assert!(sdg.summary_edges().is_empty());
        assert_eq!(sdg.summary_stats().rounds, 1);
    }
}

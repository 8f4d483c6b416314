/*
 * Reaching Definitions
 *
 * Forward may-analysis over one CFG:
 *   IN[n]  = ∪ OUT[p] for p in preds(n)
 *   OUT[n] = GEN[n] ∪ (IN[n] − KILL[n])
 *
 * Definitions are numbered once per (node, variable) and every set is a
 * FixedBitSet over that numbering. The lattice is finite and the transfer
 * functions are monotone, so the worklist drains.
 */

use fixedbitset::FixedBitSet;
use petgraph::graph::NodeIndex;
use petgraph::Direction;
use rustc_hash::FxHashMap;
use std::collections::VecDeque;
use tracing::debug;

use crate::features::data_flow::domain::DataDependence;
use crate::features::flow_graph::domain::ControlFlowGraph;
use crate::shared::models::NodeId;

#[derive(Debug, Clone)]
struct Definition {
    node: NodeId,
    variable: String,
}

/// Fixed-point solution for one CFG
#[derive(Debug, Clone)]
pub struct ReachingDefinitions {
    defs: Vec<Definition>,
    by_var: FxHashMap<String, Vec<usize>>,
    index: FxHashMap<NodeId, usize>,
    reach_in: Vec<FixedBitSet>,
    iterations: usize,
}

impl ReachingDefinitions {
    pub fn compute(cfg: &ControlFlowGraph) -> Self {
        let graph = cfg.graph();
        let n = graph.node_count();

        let mut defs: Vec<Definition> = Vec::new();
        let mut by_var: FxHashMap<String, Vec<usize>> = FxHashMap::default();
        let mut defined_at: Vec<Vec<usize>> = vec![Vec::new(); n];
        let mut index = FxHashMap::default();

        for idx in graph.node_indices() {
            let node = &graph[idx];
            index.insert(node.id, idx.index());
            for var in &node.defs {
                if defined_at[idx.index()]
                    .iter()
                    .any(|&d: &usize| defs[d].variable == *var)
                {
                    continue;
                }
                let d = defs.len();
                defs.push(Definition {
                    node: node.id,
                    variable: var.clone(),
                });
                by_var.entry(var.clone()).or_default().push(d);
                defined_at[idx.index()].push(d);
            }
        }

        let m = defs.len();
        let mut gen = vec![FixedBitSet::with_capacity(m); n];
        let mut kill = vec![FixedBitSet::with_capacity(m); n];
        for (v, ds) in defined_at.iter().enumerate() {
            for &d in ds {
                gen[v].insert(d);
                if let Some(all) = by_var.get(&defs[d].variable) {
                    for &k in all {
                        kill[v].insert(k);
                    }
                }
            }
        }

        let mut reach_in = vec![FixedBitSet::with_capacity(m); n];
        let mut reach_out = gen.clone();
        let mut queued = FixedBitSet::with_capacity(n);
        queued.insert_range(..);
        let mut worklist: VecDeque<usize> = (0..n).collect();
        let mut iterations = 0;

        while let Some(v) = worklist.pop_front() {
            queued.set(v, false);
            iterations += 1;

            let idx = NodeIndex::new(v);
            let mut input = FixedBitSet::with_capacity(m);
            for p in graph.neighbors_directed(idx, Direction::Incoming) {
                input.union_with(&reach_out[p.index()]);
            }

            let mut output = input.clone();
            output.difference_with(&kill[v]);
            output.union_with(&gen[v]);
            reach_in[v] = input;

            if output != reach_out[v] {
                reach_out[v] = output;
                for s in graph.neighbors_directed(idx, Direction::Outgoing) {
                    if !queued.put(s.index()) {
                        worklist.push_back(s.index());
                    }
                }
            }
        }

        debug!(
            callable = %cfg.callable(),
            definitions = m,
            iterations,
            "reaching definitions converged"
        );

        Self {
            defs,
            by_var,
            index,
            reach_in,
            iterations,
        }
    }

    /// Definitions reaching the entry of `node`, as `(defining node, variable)`
    pub fn reaching(&self, node: NodeId) -> Vec<(NodeId, &str)> {
        let Some(&v) = self.index.get(&node) else {
            return Vec::new();
        };
        self.reach_in[v]
            .ones()
            .map(|d| (self.defs[d].node, self.defs[d].variable.as_str()))
            .collect()
    }

    /// Worklist pops until convergence
    pub fn iterations(&self) -> usize {
        self.iterations
    }

    /// Def-use edges, ordered by use node, then variable, then definition
    pub fn dependences(&self, cfg: &ControlFlowGraph) -> Vec<DataDependence> {
        let mut edges = Vec::new();
        for node in cfg.nodes() {
            let Some(&v) = self.index.get(&node.id) else {
                continue;
            };
            let mut seen: Vec<&str> = Vec::with_capacity(node.uses.len());
            for var in &node.uses {
                if seen.contains(&var.as_str()) {
                    continue;
                }
                seen.push(var);
                let Some(candidates) = self.by_var.get(var) else {
                    continue;
                };
                for &d in candidates {
                    if self.reach_in[v].contains(d) {
                        edges.push(DataDependence {
                            from: self.defs[d].node,
                            to: node.id,
                            variable: var.clone(),
                        });
                    }
                }
            }
        }
        edges
    }
}

/// Data-dependence edges of one CFG
pub fn analyze(cfg: &ControlFlowGraph) -> Vec<DataDependence> {
    ReachingDefinitions::compute(cfg).dependences(cfg)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::flow_graph::CfgBuilder;
    use crate::features::type_hierarchy::TypeHierarchyIndex;
    use crate::shared::models::{result_var, Argument, CallableId, Effects, SyntaxId};
    use crate::shared::utils::{NodeIdGenerator, ProgramBuilder};

    fn cfg_of(b: ProgramBuilder, callable: CallableId) -> ControlFlowGraph {
        let program = b.build();
        let hierarchy = TypeHierarchyIndex::build(&program).unwrap();
        let ids = NodeIdGenerator::new();
        CfgBuilder::new(&ids, &hierarchy)
            .build(program.callable(callable).unwrap())
            .unwrap()
    }

    fn at(cfg: &ControlFlowGraph, syntax: SyntaxId) -> NodeId {
        cfg.node_for_syntax(syntax).unwrap().id
    }

    fn sources(edges: &[DataDependence], to: NodeId, var: &str) -> Vec<NodeId> {
        let mut out: Vec<NodeId> = edges
            .iter()
            .filter(|e| e.to == to && e.variable == var)
            .map(|e| e.from)
            .collect();
        out.sort();
        out
    }

    #[test]
    fn test_def_use_in_sequence() {
        let mut b = ProgramBuilder::new();
        let t = b.class("Main", &[]);
        let m = b.static_method(t, "main", &[]);
        let s1 = b.assign("x = 1", "x", &[]);
        let s2 = b.assign("y = x + 1", "y", &["x"]);
        let (id1, id2) = (s1.id, s2.id);
        b.body(m, vec![s1, s2]);

        let cfg = cfg_of(b, m);
        let edges = analyze(&cfg);
        assert_eq!(
            edges,
            vec![DataDependence {
                from: at(&cfg, id1),
                to: at(&cfg, id2),
                variable: "x".to_string(),
            }]
        );
    }

    #[test]
    fn test_redefinition_kills() {
        let mut b = ProgramBuilder::new();
        let t = b.class("Main", &[]);
        let m = b.static_method(t, "main", &[]);
        let s1 = b.assign("x = 1", "x", &[]);
        let s2 = b.assign("x = 2", "x", &[]);
        let s3 = b.assign("y = x", "y", &["x"]);
        let (id2, id3) = (s2.id, s3.id);
        b.body(m, vec![s1, s2, s3]);

        let cfg = cfg_of(b, m);
        let edges = analyze(&cfg);
        assert_eq!(sources(&edges, at(&cfg, id3), "x"), vec![at(&cfg, id2)]);
    }

    #[test]
    fn test_both_branches_reach_join() {
        let mut b = ProgramBuilder::new();
        let t = b.class("Main", &[]);
        let m = b.static_method(t, "main", &[]);
        let a1 = b.assign("a = 1", "a", &[]);
        let a2 = b.assign("a = 2", "a", &[]);
        let (id1, id2) = (a1.id, a2.id);
        let cond = b.if_else("if (c)", Effects::new().uses(["c"]), vec![a1], vec![a2]);
        let use_a = b.simple("use(a)", Effects::new().uses(["a"]));
        let use_id = use_a.id;
        b.body(m, vec![cond, use_a]);

        let cfg = cfg_of(b, m);
        let edges = analyze(&cfg);
        let mut expected = vec![at(&cfg, id1), at(&cfg, id2)];
        expected.sort();
        assert_eq!(sources(&edges, at(&cfg, use_id), "a"), expected);
        assert_eq!(edges.len(), 2);
    }

    #[test]
    fn test_loop_carried_definition() {
        let mut b = ProgramBuilder::new();
        let t = b.class("Main", &[]);
        let m = b.static_method(t, "main", &[]);
        let init = b.assign("i = 0", "i", &[]);
        let inc = b.assign("i = i + 1", "i", &["i"]);
        let (init_id, inc_id) = (init.id, inc.id);
        let w = b.while_loop("while (i < 10)", Effects::new().uses(["i"]), vec![inc]);
        let w_id = w.id;
        let after = b.simple("print(i)", Effects::new().uses(["i"]));
        let after_id = after.id;
        b.body(m, vec![init, w, after]);

        let cfg = cfg_of(b, m);
        let rd = ReachingDefinitions::compute(&cfg);
        let edges = rd.dependences(&cfg);
        let mut both = vec![at(&cfg, init_id), at(&cfg, inc_id)];
        both.sort();
        assert_eq!(sources(&edges, at(&cfg, w_id), "i"), both);
        assert_eq!(sources(&edges, at(&cfg, inc_id), "i"), both);
        assert_eq!(sources(&edges, at(&cfg, after_id), "i"), both);
        assert!(rd.iterations() > cfg.node_count());
    }

    #[test]
    fn test_parameters_and_return_value() {
        let mut b = ProgramBuilder::new();
        let t = b.class("Main", &[]);
        let f = b.static_method(t, "f", &["p"]);
        b.returns_value(f);
        let s = b.assign("q = p * 2", "q", &["p"]);
        let r = b.ret("return q", Some(Effects::new().uses(["q"])));
        let (s_id, r_id) = (s.id, r.id);
        b.body(f, vec![s, r]);

        let cfg = cfg_of(b, f);
        let edges = analyze(&cfg);
        let formal_in = cfg.formals.ins[0];
        let formal_out = cfg.formals.outs[0].1;
        assert_eq!(sources(&edges, at(&cfg, s_id), "p"), vec![formal_in]);
        assert_eq!(sources(&edges, at(&cfg, r_id), "q"), vec![at(&cfg, s_id)]);
        assert_eq!(sources(&edges, formal_out, "$ret"), vec![at(&cfg, r_id)]);
    }

    #[test]
    fn test_call_result_flows_into_statement() {
        let mut b = ProgramBuilder::new();
        let t = b.class("Main", &[]);
        let f = b.static_method(t, "f", &["p"]);
        b.returns_value(f);
        let m = b.static_method(t, "main", &[]);
        let x = b.assign("x = 1", "x", &[]);
        let x_id = x.id;
        let site = b.call("f(x)", f, vec![Argument::var("x")]);
        let site_id = site.id;
        let r = b.simple("r = f(x)", Effects::new().def("r").call(site));
        let r_id = r.id;
        b.body(m, vec![x, r]);

        let cfg = cfg_of(b, m);
        let edges = analyze(&cfg);
        let nodes = cfg.call_site(site_id).unwrap();
        let actual_out = nodes.actual_out(crate::shared::models::OutputSlot::Return).unwrap();
        assert_eq!(sources(&edges, nodes.actual_ins[0], "x"), vec![at(&cfg, x_id)]);
        assert_eq!(
            sources(&edges, at(&cfg, r_id), &result_var(site_id)),
            vec![actual_out]
        );
    }

    #[test]
    fn test_reaching_query() {
        let mut b = ProgramBuilder::new();
        let t = b.class("Main", &[]);
        let m = b.static_method(t, "main", &[]);
        let s1 = b.assign("x = 1", "x", &[]);
        let s2 = b.assign("y = 2", "y", &[]);
        let (id1, id2) = (s1.id, s2.id);
        b.body(m, vec![s1, s2]);

        let cfg = cfg_of(b, m);
        let rd = ReachingDefinitions::compute(&cfg);
        assert_eq!(rd.reaching(at(&cfg, id2)), vec![(at(&cfg, id1), "x")]);
        assert_eq!(rd.reaching(cfg.exit().id).len(), 2);
        assert!(rd.reaching(NodeId(9999)).is_empty());
    }
}

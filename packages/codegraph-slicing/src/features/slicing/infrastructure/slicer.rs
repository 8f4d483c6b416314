/*
 * Program Slicer Module
 *
 * Graph reachability over the SDG with memoization.
 *
 * Strategies:
 * - Closure: marked-set BFS over every admissible edge
 * - TwoPhase (Horwitz, Reps, Binkley 1990): phase 1 never descends into
 *   callees, phase 2 re-seeds from every phase-1 node and never ascends to
 *   callers; summary edges carry the effect of skipped calls
 *
 * The SDG is only read. Each query allocates its own visited set, so a
 * slicer can be shared between threads; the LRU cache sits behind a mutex.
 */

use lru::LruCache;
use parking_lot::Mutex;
use fixedbitset::FixedBitSet;
use petgraph::graph::NodeIndex;
use petgraph::visit::EdgeRef;
use petgraph::Direction;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, VecDeque};
use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::debug;

use crate::config::SlicingConfig;
use crate::errors::{Result, SlicingError};
use crate::features::sdg::SystemDependenceGraph;
use crate::features::slicing::domain::{
    CriterionLocation, Slice, SliceDirection, SliceEdge, SliceStrategy, SlicingCriterion,
};
use crate::features::slicing::ports::SlicerPort;
use crate::shared::models::{Dependence, NodeId, SyntaxId};

/// Cache key: everything that changes the answer for a fixed SDG and config
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum QueryKey {
    Slice {
        criterion: SlicingCriterion,
        direction: SliceDirection,
        include_control: bool,
    },
    Chop {
        source: SlicingCriterion,
        target: SlicingCriterion,
    },
}

#[derive(Debug, Clone, Copy)]
struct Traversal {
    direction: SliceDirection,
    include_control: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Full,
    Ascend,
    Descend,
}

/// Only data edges carrying `variable` are followed out of `node`
#[derive(Debug, Clone, Copy)]
struct VariableFilter<'v> {
    node: NodeIndex,
    variable: &'v str,
}

/// Slicer counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlicerStats {
    pub queries: u64,
    pub cache_hits: u64,
    pub cache_misses: u64,
    pub cached: usize,
    pub capacity: usize,
}

pub struct ProgramSlicer<'g> {
    sdg: &'g SystemDependenceGraph,
    config: SlicingConfig,
    /// `None` when `cache_capacity` is 0
    cache: Option<Mutex<LruCache<QueryKey, Slice>>>,
    queries: AtomicU64,
    hits: AtomicU64,
}

impl<'g> ProgramSlicer<'g> {
    pub fn new(sdg: &'g SystemDependenceGraph, config: SlicingConfig) -> Result<Self> {
        config.validate()?;
        let cache = NonZeroUsize::new(config.cache_capacity).map(|cap| Mutex::new(LruCache::new(cap)));
        Ok(Self {
            sdg,
            config,
            cache,
            queries: AtomicU64::new(0),
            hits: AtomicU64::new(0),
        })
    }

    pub fn sdg(&self) -> &'g SystemDependenceGraph {
        self.sdg
    }

    pub fn config(&self) -> &SlicingConfig {
        &self.config
    }

    /// Slice in the configured direction
    pub fn slice(&self, criterion: &SlicingCriterion) -> Result<Slice> {
        match self.config.direction {
            SliceDirection::Backward => self.backward_slice(criterion),
            SliceDirection::Forward => self.forward_slice(criterion),
        }
    }

    /// Resolve a criterion to exactly one SDG node
    pub fn resolve(&self, criterion: &SlicingCriterion) -> Result<NodeId> {
        match &criterion.location {
            CriterionLocation::Node { id } => {
                if self.sdg.contains(*id) {
                    Ok(*id)
                } else {
                    Err(SlicingError::criterion(format!("node {} is not in the SDG", id)))
                }
            }
            CriterionLocation::Syntax { id } => self.sdg.node_for_syntax(*id).ok_or_else(|| {
                SlicingError::criterion(format!("syntax element {} has no node", id))
            }),
            CriterionLocation::Line { line } => self.resolve_line(*line, criterion.variable.as_deref()),
        }
    }

    fn resolve_line(&self, line: u32, variable: Option<&str>) -> Result<NodeId> {
        let mut candidates = self.sdg.nodes_on_line(line);
        // a variable can pick one node out of several sharing the line
        if candidates.len() > 1 {
            if let Some(v) = variable {
                candidates.retain(|id| {
                    self.sdg
                        .node(*id)
                        .map(|n| n.reads(v) || n.defines(v))
                        .unwrap_or(false)
                });
            }
        }
        match candidates.as_slice() {
            [one] => Ok(*one),
            [] => Err(SlicingError::criterion(format!("no node on line {}", line))),
            many => Err(SlicingError::criterion(format!(
                "line {} is ambiguous ({} nodes)",
                line,
                many.len()
            ))),
        }
    }

    pub fn stats(&self) -> SlicerStats {
        let queries = self.queries.load(Ordering::Relaxed);
        let cache_hits = self.hits.load(Ordering::Relaxed);
        let (cached, capacity) = self
            .cache
            .as_ref()
            .map(|c| {
                let c = c.lock();
                (c.len(), c.cap().get())
            })
            .unwrap_or((0, 0));
        SlicerStats {
            queries,
            cache_hits,
            cache_misses: queries - cache_hits,
            cached,
            capacity,
        }
    }

    /// Drop every memoized slice; returns how many there were
    pub fn clear_cache(&self) -> usize {
        match &self.cache {
            Some(cache) => {
                let mut cache = cache.lock();
                let count = cache.len();
                cache.clear();
                count
            }
            None => 0,
        }
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Query execution
    // ═══════════════════════════════════════════════════════════════════════

    fn memoized(&self, key: QueryKey, compute: impl FnOnce() -> Result<Slice>) -> Result<Slice> {
        self.queries.fetch_add(1, Ordering::Relaxed);
        if let Some(cache) = &self.cache {
            if let Some(hit) = cache.lock().get(&key).cloned() {
                self.hits.fetch_add(1, Ordering::Relaxed);
                return Ok(hit);
            }
        }
        let slice = compute()?;
        if let Some(cache) = &self.cache {
            cache.lock().put(key, slice.clone());
        }
        Ok(slice)
    }

    fn run_slice(&self, criterion: &SlicingCriterion, traversal: Traversal) -> Result<Slice> {
        let key = QueryKey::Slice {
            criterion: criterion.clone(),
            direction: traversal.direction,
            include_control: traversal.include_control,
        };
        self.memoized(key, || {
            let node = self.resolve(criterion)?;
            let visited = self.reach_from(node, criterion, traversal)?;
            let slice = self.assemble(criterion, node, traversal.direction, &visited);
            debug!(criterion = %criterion, nodes = slice.len(), "slice computed");
            Ok(slice)
        })
    }

    fn run_chop(&self, source: &SlicingCriterion, target: &SlicingCriterion) -> Result<Slice> {
        let key = QueryKey::Chop {
            source: source.clone(),
            target: target.clone(),
        };
        self.memoized(key, || {
            let from = self.resolve(source)?;
            let to = self.resolve(target)?;
            let mut backward = self.reach_from(
                to,
                target,
                Traversal {
                    direction: SliceDirection::Backward,
                    include_control: self.config.include_control,
                },
            )?;
            let forward = self.reach_from(
                from,
                source,
                Traversal {
                    direction: SliceDirection::Forward,
                    include_control: self.config.include_control,
                },
            )?;
            backward.intersect_with(&forward);
            let slice = self.assemble(target, to, SliceDirection::Backward, &backward);
            debug!(source = %source, target = %target, nodes = slice.len(), "chop computed");
            Ok(slice)
        })
    }

    /// Visited set of one traversal from `node`, per the configured strategy
    fn reach_from(
        &self,
        node: NodeId,
        criterion: &SlicingCriterion,
        traversal: Traversal,
    ) -> Result<FixedBitSet> {
        let start = self
            .sdg
            .index_of(node)
            .ok_or_else(|| SlicingError::criterion(format!("node {} is not in the SDG", node)))?;
        let filter = self.variable_filter(start, node, criterion, traversal.direction)?;

        let mut visited = FixedBitSet::with_capacity(self.sdg.node_count());
        visited.insert(start.index());
        match self.config.strategy {
            SliceStrategy::Closure => {
                self.traverse(&[start], traversal, Phase::Full, filter, &mut visited);
            }
            SliceStrategy::TwoPhase => {
                self.traverse(&[start], traversal, Phase::Ascend, filter, &mut visited);
                let seeds: Vec<NodeIndex> = visited.ones().map(NodeIndex::new).collect();
                self.traverse(&seeds, traversal, Phase::Descend, filter, &mut visited);
            }
        }
        Ok(visited)
    }

    /// Filter for the criterion's variable, if it restricts anything
    fn variable_filter<'c>(
        &self,
        start: NodeIndex,
        node: NodeId,
        criterion: &'c SlicingCriterion,
        direction: SliceDirection,
    ) -> Result<Option<VariableFilter<'c>>> {
        let Some(variable) = criterion.variable.as_deref() else {
            return Ok(None);
        };
        let n = &self.sdg.graph()[start];
        let (reads, defines) = (n.reads(variable), n.defines(variable));
        if !reads && !defines {
            return Err(SlicingError::criterion(format!(
                "variable {} is neither read nor written at {}",
                variable, node
            )));
        }
        let restricts = match direction {
            SliceDirection::Backward => reads,
            SliceDirection::Forward => defines,
        };
        Ok(restricts.then_some(VariableFilter {
            node: start,
            variable,
        }))
    }

    fn traverse(
        &self,
        seeds: &[NodeIndex],
        traversal: Traversal,
        phase: Phase,
        filter: Option<VariableFilter<'_>>,
        visited: &mut FixedBitSet,
    ) {
        let graph = self.sdg.graph();
        let dir = match traversal.direction {
            SliceDirection::Backward => Direction::Incoming,
            SliceDirection::Forward => Direction::Outgoing,
        };

        let mut queue: VecDeque<NodeIndex> = seeds.iter().copied().collect();
        while let Some(v) = queue.pop_front() {
            for e in graph.edges_directed(v, dir) {
                let dep = e.weight();
                if !self.admissible(dep, traversal, phase) {
                    continue;
                }
                if let Some(f) = filter {
                    if f.node == v && dep.variable().map(|var| var != f.variable).unwrap_or(false) {
                        continue;
                    }
                }
                let u = match dir {
                    Direction::Incoming => e.source(),
                    Direction::Outgoing => e.target(),
                };
                if !visited.put(u.index()) {
                    queue.push_back(u);
                }
            }
        }
    }

    fn admissible(&self, dep: &Dependence, traversal: Traversal, phase: Phase) -> bool {
        match dep {
            Dependence::Control => traversal.include_control,
            Dependence::Data { .. } => true,
            Dependence::Call { .. } => {
                traversal.include_control && !blocked(dep, traversal.direction, phase)
            }
            Dependence::ParameterIn { .. } | Dependence::ParameterOut { .. } => {
                !blocked(dep, traversal.direction, phase)
            }
            Dependence::Summary { call_site } => {
                self.config.use_summary_edges
                    || self
                        .sdg
                        .call_site(*call_site)
                        .map(|r| r.opaque)
                        .unwrap_or(false)
            }
        }
    }

    fn assemble(
        &self,
        criterion: &SlicingCriterion,
        node: NodeId,
        direction: SliceDirection,
        visited: &FixedBitSet,
    ) -> Slice {
        let graph = self.sdg.graph();
        let mut nodes = BTreeSet::new();
        let mut program_points: BTreeSet<SyntaxId> = BTreeSet::new();
        for i in visited.ones() {
            let n = &graph[NodeIndex::new(i)];
            nodes.insert(n.id);
            if let Some(s) = n.syntax {
                program_points.insert(s);
            }
        }
        let edges = graph
            .edge_references()
            .filter(|e| visited.contains(e.source().index()) && visited.contains(e.target().index()))
            .map(|e| SliceEdge {
                from: graph[e.source()].id,
                to: graph[e.target()].id,
                dependence: e.weight().clone(),
            })
            .collect();
        Slice::new(criterion.clone(), node, direction, nodes, edges, program_points)
    }
}

/// Whether `phase` forbids crossing `dep` in `direction`
fn blocked(dep: &Dependence, direction: SliceDirection, phase: Phase) -> bool {
    // crossing the edge moves from a caller into a callee
    let descends = match (direction, dep) {
        (SliceDirection::Backward, Dependence::ParameterOut { .. }) => true,
        (SliceDirection::Backward, Dependence::ParameterIn { .. } | Dependence::Call { .. }) => false,
        (SliceDirection::Forward, Dependence::ParameterIn { .. } | Dependence::Call { .. }) => true,
        (SliceDirection::Forward, Dependence::ParameterOut { .. }) => false,
        _ => return false,
    };
    match phase {
        Phase::Full => false,
        Phase::Ascend => descends,
        Phase::Descend => !descends,
    }
}

impl SlicerPort for ProgramSlicer<'_> {
    fn backward_slice(&self, criterion: &SlicingCriterion) -> Result<Slice> {
        self.run_slice(
            criterion,
            Traversal {
                direction: SliceDirection::Backward,
                include_control: self.config.include_control,
            },
        )
    }

    fn forward_slice(&self, criterion: &SlicingCriterion) -> Result<Slice> {
        self.run_slice(
            criterion,
            Traversal {
                direction: SliceDirection::Forward,
                include_control: self.config.include_control,
            },
        )
    }

    fn thin_slice(&self, criterion: &SlicingCriterion) -> Result<Slice> {
        self.run_slice(
            criterion,
            Traversal {
                direction: SliceDirection::Backward,
                include_control: false,
            },
        )
    }

    fn chop(&self, source: &SlicingCriterion, target: &SlicingCriterion) -> Result<Slice> {
        self.run_chop(source, target)
    }
}

//! Post-dominator tree
//!
//! Cooper, Harvey, Kennedy, "A Simple, Fast Dominance Algorithm" (2001),
//! run on the reversed CFG with exit as the root.

use fixedbitset::FixedBitSet;

use crate::features::flow_graph::infrastructure::adjacency::Adjacency;

#[derive(Debug, Clone)]
pub struct PostDominatorTree {
    ipdom: Vec<Option<usize>>,
    root: usize,
}

impl PostDominatorTree {
    pub(crate) fn compute(adj: &Adjacency) -> Self {
        let n = adj.len();
        let root = adj.exit;

        // Reverse postorder of the reversed graph
        let mut visited = FixedBitSet::with_capacity(n);
        let mut postorder = Vec::with_capacity(n);
        let mut stack = vec![(root, 0usize)];
        visited.insert(root);
        while let Some(&(v, i)) = stack.last() {
            if i < adj.preds[v].len() {
                if let Some(top) = stack.last_mut() {
                    top.1 += 1;
                }
                let w = adj.preds[v][i];
                if !visited.put(w) {
                    stack.push((w, 0));
                }
            } else {
                stack.pop();
                postorder.push(v);
            }
        }
        let rpo: Vec<usize> = postorder.into_iter().rev().collect();
        let mut order = vec![usize::MAX; n];
        for (i, &v) in rpo.iter().enumerate() {
            order[v] = i;
        }

        let mut idom: Vec<Option<usize>> = vec![None; n];
        idom[root] = Some(root);

        let mut changed = true;
        while changed {
            changed = false;
            for &b in rpo.iter().skip(1) {
                let mut new_idom = None;
                for &p in &adj.succs[b] {
                    if idom[p].is_none() {
                        continue;
                    }
                    new_idom = Some(match new_idom {
                        None => p,
                        Some(current) => intersect(&idom, &order, root, p, current),
                    });
                }
                if new_idom.is_some() && new_idom != idom[b] {
                    idom[b] = new_idom;
                    changed = true;
                }
            }
        }

        idom[root] = None;
        Self { ipdom: idom, root }
    }

    /// Immediate post-dominator; `None` for the root and for nodes that cannot reach it
    pub fn ipdom(&self, v: usize) -> Option<usize> {
        self.ipdom.get(v).copied().flatten()
    }

    pub fn root(&self) -> usize {
        self.root
    }

    /// Every path from `b` to exit passes through `a` (reflexive)
    pub fn post_dominates(&self, a: usize, b: usize) -> bool {
        let mut current = b;
        loop {
            if current == a {
                return true;
            }
            match self.ipdom(current) {
                Some(next) => current = next,
                None => return false,
            }
        }
    }
}

fn intersect(idom: &[Option<usize>], order: &[usize], root: usize, mut a: usize, mut b: usize) -> usize {
    while a != b {
        while order[a] > order[b] {
            a = match idom[a] {
                Some(x) => x,
                None => return root,
            };
        }
        while order[b] > order[a] {
            b = match idom[b] {
                Some(x) => x,
                None => return root,
            };
        }
    }
    a
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared::models::NodeId;

    fn adjacency(n: usize, entry: usize, exit: usize, edges: &[(usize, usize)]) -> Adjacency {
        let mut adj = Adjacency {
            succs: vec![Vec::new(); n],
            preds: vec![Vec::new(); n],
            ids: (0..n as u32).map(NodeId).collect(),
            entry,
            exit,
        };
        for &(a, b) in edges {
            adj.add_edge(a, b);
        }
        adj
    }

    #[test]
    fn test_diamond() {
        // 0 -> 2 -> {3, 4} -> 5 -> 1
        let adj = adjacency(6, 0, 1, &[(0, 2), (2, 3), (2, 4), (3, 5), (4, 5), (5, 1)]);
        let pdt = PostDominatorTree::compute(&adj);
        assert_eq!(pdt.ipdom(2), Some(5));
        assert_eq!(pdt.ipdom(3), Some(5));
        assert_eq!(pdt.ipdom(4), Some(5));
        assert_eq!(pdt.ipdom(5), Some(1));
        assert_eq!(pdt.ipdom(1), None);
        assert!(pdt.post_dominates(5, 0));
        assert!(!pdt.post_dominates(3, 2));
    }

    #[test]
    fn test_loop() {
        // 0 -> 2 <-> 3, 2 -> 1
        let adj = adjacency(4, 0, 1, &[(0, 2), (2, 3), (3, 2), (2, 1)]);
        let pdt = PostDominatorTree::compute(&adj);
        assert_eq!(pdt.ipdom(3), Some(2));
        assert_eq!(pdt.ipdom(2), Some(1));
        assert!(pdt.post_dominates(2, 3));
    }

    #[test]
    fn test_early_exit_branch() {
        // 0 -> 2 -> {1, 3}, 3 -> 1
        let adj = adjacency(4, 0, 1, &[(0, 2), (2, 1), (2, 3), (3, 1)]);
        let pdt = PostDominatorTree::compute(&adj);
        assert_eq!(pdt.ipdom(2), Some(1));
        assert_eq!(pdt.ipdom(3), Some(1));
        assert!(!pdt.post_dominates(3, 2));
    }

    #[test]
    fn test_node_that_cannot_reach_exit() {
        let adj = adjacency(3, 0, 1, &[(0, 1), (0, 2)]);
        let pdt = PostDominatorTree::compute(&adj);
        assert_eq!(pdt.ipdom(2), None);
        assert_eq!(pdt.ipdom(0), Some(1));
    }
}

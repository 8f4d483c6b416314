//! Node id generation
//!
//! One generator is created per analysis run and passed by reference into
//! every CFG builder, so ids stay unique across callables built in parallel.

use std::sync::atomic::{AtomicU32, Ordering};

use crate::shared::models::NodeId;

/// Monotonic node id source shared by all builders of one run
#[derive(Debug, Default)]
pub struct NodeIdGenerator {
    next: AtomicU32,
}

impl NodeIdGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Issue the next id
    pub fn next_id(&self) -> NodeId {
        NodeId(self.next.fetch_add(1, Ordering::Relaxed))
    }

    /// Number of ids issued so far
    pub fn issued(&self) -> u32 {
        self.next.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rayon::prelude::*;
    use std::collections::HashSet;

    #[test]
    fn test_monotonic() {
        let ids = NodeIdGenerator::new();
        assert_eq!(ids.next_id(), NodeId(0));
        assert_eq!(ids.next_id(), NodeId(1));
        assert_eq!(ids.issued(), 2);
    }

    #[test]
    fn test_unique_across_threads() {
        let ids = NodeIdGenerator::new();
        let issued: Vec<NodeId> = (0..1000).into_par_iter().map(|_| ids.next_id()).collect();
        let unique: HashSet<NodeId> = issued.into_iter().collect();
        assert_eq!(unique.len(), 1000);
    }
}

//! Domain assertions for slices and dependence graphs

use codegraph_slicing::shared::models::{Dependence, NodeId, SyntaxId};
use codegraph_slicing::{Slice, SystemDependenceGraph};

/// Assert the slice's source statements, in syntax order
pub fn assert_program_points(slice: &Slice, expected: &[SyntaxId]) {
    let actual: Vec<SyntaxId> = slice.program_points().iter().copied().collect();
    let mut expected = expected.to_vec();
    expected.sort();
    assert_eq!(
        actual, expected,
        "slice for {} has unexpected program points",
        slice.criterion()
    );
}

/// Assert that `from -> to` carries `dependence`
pub fn assert_edge(sdg: &SystemDependenceGraph, from: NodeId, to: NodeId, dependence: &Dependence) {
    assert!(
        sdg.has_edge(from, to, dependence),
        "expected {} -> {} ({}), outgoing edges of {}: {:?}",
        from,
        to,
        dependence,
        from,
        sdg.outgoing(from)
    );
}

/// Assert every slice edge has both endpoints inside the slice
pub fn assert_edges_closed(slice: &Slice) {
    for e in slice.edges() {
        assert!(
            slice.contains(e.from) && slice.contains(e.to),
            "edge {} -> {} leaves the slice",
            e.from,
            e.to
        );
    }
}

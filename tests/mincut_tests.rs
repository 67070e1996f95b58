//! Cross-checks the public min-cut API against hand-computed graphs,
//! independent of the internal `src/mincut.rs` unit tests.

use admission_core::mincut::{star_min_cut, stoer_wagner, DenseGraph};

#[test]
fn square_graph_min_cut_matches_hand_calculation() {
    // 4-cycle with one light edge: cutting the light edge plus its opposite
    // heavy edge is never better than isolating the lightest pair of edges
    // incident to a single vertex.
    let graph = DenseGraph::from_edges(
        4,
        &[(0, 1, 2.0), (1, 2, 2.0), (2, 3, 2.0), (3, 0, 2.0), (0, 2, 0.5)],
    );
    // Any single vertex cut: 0 -> edges to 1,3,2 = 2+2+0.5 = 4.5; 1 -> edges
    // to 0,2 = 2+2 = 4.0 (lightest). Global min cut is 4.0.
    assert_eq!(stoer_wagner(&graph), 4.0);
}

#[test]
fn star_graph_min_cut_is_the_weakest_leaf() {
    let leaves = vec![1.2, 0.3, 0.9, 0.75];
    let graph = DenseGraph::star(&leaves);
    assert_eq!(stoer_wagner(&graph), 0.3);
    assert_eq!(star_min_cut(&leaves), 0.3);
}

#[test]
fn empty_and_singleton_graphs_have_infinite_cut() {
    assert_eq!(stoer_wagner(&DenseGraph::new(0)), f64::INFINITY);
    assert_eq!(stoer_wagner(&DenseGraph::new(1)), f64::INFINITY);
}

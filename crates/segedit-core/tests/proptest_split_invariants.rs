//! Property-based invariant tests for split partitions.
//!
//! For any connectivity graph and any anchor/seed pair inside the group,
//! `ConnectivityGraph::compute_split` must:
//!
//! 1. Cover every member exactly once (`include ∪ exclude == members`,
//!    `include ∩ exclude == ∅`)
//! 2. Keep the anchor on the include side and the seed on the exclude side
//! 3. Be deterministic for a fixed graph

use proptest::prelude::*;
use segedit_core::{ConnectivityGraph, SegmentId};

// ── Strategies ──────────────────────────────────────────────────────────

const NODES: u64 = 24;

fn edge_strategy() -> impl Strategy<Value = Vec<(u64, u64)>> {
    prop::collection::vec((0u64..NODES, 0u64..NODES), 0..60)
}

fn graph_from(edges: &[(u64, u64)]) -> ConnectivityGraph {
    let mut graph = ConnectivityGraph::new();
    for raw in 0..NODES {
        graph.add_node(SegmentId(raw));
    }
    for &(a, b) in edges {
        graph.add_edge(SegmentId(a), SegmentId(b));
    }
    graph
}

fn members() -> Vec<SegmentId> {
    (0..NODES).map(SegmentId).collect()
}

proptest! {
    #[test]
    fn split_partitions_members_exactly(
        edges in edge_strategy(),
        anchor in 0u64..NODES,
        seed in 0u64..NODES,
    ) {
        prop_assume!(anchor != seed);
        let graph = graph_from(&edges);
        let members = members();
        let split = graph
            .compute_split(SegmentId(anchor), SegmentId(seed), &members)
            .expect("anchor and seed are distinct members");

        prop_assert_eq!(split.validate(&members), Ok(()));
        prop_assert_eq!(split.include.len() + split.exclude.len(), members.len());
    }

    #[test]
    fn anchor_included_seed_excluded(
        edges in edge_strategy(),
        anchor in 0u64..NODES,
        seed in 0u64..NODES,
    ) {
        prop_assume!(anchor != seed);
        let graph = graph_from(&edges);
        let split = graph
            .compute_split(SegmentId(anchor), SegmentId(seed), &members())
            .expect("anchor and seed are distinct members");
        prop_assert!(split.include.contains(&SegmentId(anchor)));
        prop_assert!(split.exclude.contains(&SegmentId(seed)));
    }

    #[test]
    fn split_is_deterministic(
        edges in edge_strategy(),
        anchor in 0u64..NODES,
        seed in 0u64..NODES,
    ) {
        let graph = graph_from(&edges);
        let first = graph.compute_split(SegmentId(anchor), SegmentId(seed), &members());
        let second = graph.compute_split(SegmentId(anchor), SegmentId(seed), &members());
        prop_assert_eq!(first, second);
    }
}

#![forbid(unsafe_code)]

//! Split partitions of a merged group.
//!
//! A split divides the base segments of one root into an `include` side that
//! keeps the current root and an `exclude` side that receives a new root.
//! The cut itself is computed by whatever backs the segmentation graph;
//! [`SplitResult::validate`] checks that a computed cut is a partition.
//!
//! [`ConnectivityGraph`] is an in-memory adjacency graph over base segments
//! that computes cuts by growing two regions breadth-first, one from the
//! anchor and one from the seed. Every member reached first from the seed
//! lands on the `exclude` side; ties and unreachable members stay with the
//! anchor.
//!
//! # Invariants
//!
//! 1. `include ∪ exclude` equals the member set passed in.
//! 2. `include ∩ exclude = ∅`.
//! 3. The anchor is always included and the seed always excluded.
//! 4. Output is sorted and deterministic for a fixed graph.

use std::collections::{BTreeMap, BTreeSet, VecDeque};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::id::SegmentId;

/// Bipartition of the base segments of one root.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SplitResult {
    /// Base ids that keep the current root.
    pub include: Vec<SegmentId>,
    /// Base ids that move to a new root.
    pub exclude: Vec<SegmentId>,
}

/// Why a [`SplitResult`] is not a partition of the expected members.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum SplitPartitionError {
    #[error("segment {0} appears on both sides of the split")]
    Overlap(SegmentId),
    #[error("segment {0} is missing from the split")]
    Missing(SegmentId),
    #[error("segment {0} does not belong to the split group")]
    Unexpected(SegmentId),
    #[error("split leaves one side empty")]
    EmptySide,
}

impl SplitResult {
    #[must_use]
    pub fn new(include: Vec<SegmentId>, exclude: Vec<SegmentId>) -> Self {
        Self { include, exclude }
    }

    /// Check that `include` and `exclude` partition exactly `members`.
    pub fn validate(&self, members: &[SegmentId]) -> Result<(), SplitPartitionError> {
        if self.include.is_empty() || self.exclude.is_empty() {
            return Err(SplitPartitionError::EmptySide);
        }
        let expected: BTreeSet<SegmentId> = members.iter().copied().collect();
        let mut seen = BTreeSet::new();
        for &id in self.include.iter().chain(&self.exclude) {
            if !expected.contains(&id) {
                return Err(SplitPartitionError::Unexpected(id));
            }
            if !seen.insert(id) {
                return Err(SplitPartitionError::Overlap(id));
            }
        }
        if let Some(&missing) = expected.difference(&seen).next() {
            return Err(SplitPartitionError::Missing(missing));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Side {
    Include,
    Exclude,
}

/// Undirected adjacency graph over base segments.
#[derive(Debug, Clone, Default)]
pub struct ConnectivityGraph {
    adjacency: BTreeMap<SegmentId, BTreeSet<SegmentId>>,
}

impl ConnectivityGraph {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a node without edges.
    pub fn add_node(&mut self, id: SegmentId) {
        self.adjacency.entry(id).or_default();
    }

    /// Add an undirected edge; both endpoints become nodes.
    pub fn add_edge(&mut self, a: SegmentId, b: SegmentId) {
        if a == b {
            self.add_node(a);
            return;
        }
        self.adjacency.entry(a).or_default().insert(b);
        self.adjacency.entry(b).or_default().insert(a);
    }

    /// Remove an undirected edge. Returns `true` if it existed.
    pub fn remove_edge(&mut self, a: SegmentId, b: SegmentId) -> bool {
        let removed = self.adjacency.get_mut(&a).is_some_and(|n| n.remove(&b));
        if let Some(neighbors) = self.adjacency.get_mut(&b) {
            neighbors.remove(&a);
        }
        removed
    }

    #[must_use]
    pub fn contains(&self, id: SegmentId) -> bool {
        self.adjacency.contains_key(&id)
    }

    #[must_use]
    pub fn has_edge(&self, a: SegmentId, b: SegmentId) -> bool {
        self.adjacency.get(&a).is_some_and(|n| n.contains(&b))
    }

    pub fn neighbors(&self, id: SegmentId) -> impl Iterator<Item = SegmentId> + '_ {
        self.adjacency.get(&id).into_iter().flatten().copied()
    }

    #[must_use]
    pub fn node_count(&self) -> usize {
        self.adjacency.len()
    }

    /// Partition `members` between `anchor` and `seed`.
    ///
    /// Returns `None` when `anchor == seed` or when either is not a member.
    #[must_use]
    pub fn compute_split(
        &self,
        anchor: SegmentId,
        seed: SegmentId,
        members: &[SegmentId],
    ) -> Option<SplitResult> {
        let member_set: BTreeSet<SegmentId> = members.iter().copied().collect();
        if anchor == seed || !member_set.contains(&anchor) || !member_set.contains(&seed) {
            return None;
        }

        let mut assigned: BTreeMap<SegmentId, Side> = BTreeMap::new();
        let mut queue = VecDeque::new();
        assigned.insert(anchor, Side::Include);
        assigned.insert(seed, Side::Exclude);
        queue.push_back(anchor);
        queue.push_back(seed);

        while let Some(node) = queue.pop_front() {
            let side = assigned[&node];
            for next in self.neighbors(node) {
                if member_set.contains(&next) && !assigned.contains_key(&next) {
                    assigned.insert(next, side);
                    queue.push_back(next);
                }
            }
        }

        let mut result = SplitResult::default();
        for id in member_set {
            match assigned.get(&id) {
                Some(Side::Exclude) => result.exclude.push(id),
                Some(Side::Include) | None => result.include.push(id),
            }
        }
        Some(result)
    }

    /// Remove every edge crossing the partition. Returns the number removed.
    pub fn cut(&mut self, split: &SplitResult) -> usize {
        let exclude: BTreeSet<SegmentId> = split.exclude.iter().copied().collect();
        let mut removed = 0;
        for &id in &split.include {
            let crossing: Vec<SegmentId> = self
                .neighbors(id)
                .filter(|neighbor| exclude.contains(neighbor))
                .collect();
            for neighbor in crossing {
                if self.remove_edge(id, neighbor) {
                    removed += 1;
                }
            }
        }
        removed
    }
}

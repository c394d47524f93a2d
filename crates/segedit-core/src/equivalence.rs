#![forbid(unsafe_code)]

//! Segment equivalence store (disjoint sets over segment ids).
//!
//! # Design
//!
//! Every id that belongs to a non-trivial group stores its representative
//! directly, so [`EquivalenceStore::get`] is a single hash lookup and never
//! walks a parent chain. [`EquivalenceStore::link`] pays for that: it moves
//! the smaller group into the larger one and rewrites the representative of
//! the moved members (or of every member when the representative changes).
//!
//! # Invariants
//!
//! 1. `get(get(x)) == get(x)` for every `x`.
//! 2. After `link(a, b)`, `get(a) == get(b)`.
//! 3. `link(a, b)` on already-linked ids changes nothing and returns `false`.
//! 4. The representative of a group is its maximum (or minimum) member, as
//!    selected by [`RepresentativePolicy`], unless the group was formed by
//!    [`EquivalenceStore::link_to_root`], which pins the representative.
//! 5. Ids never linked are singletons and resolve to themselves.

use ahash::AHashMap;

use crate::id::SegmentId;

/// Which member of a group is its representative.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RepresentativePolicy {
    /// Largest id represents the group (graph roots sort above base ids).
    #[default]
    Max,
    /// Smallest id represents the group.
    Min,
}

impl RepresentativePolicy {
    #[inline]
    fn pick(self, a: SegmentId, b: SegmentId) -> SegmentId {
        match self {
            Self::Max => a.max(b),
            Self::Min => a.min(b),
        }
    }
}

/// Mapping from segment ids to the representative of their merged group.
#[derive(Debug, Clone, Default)]
pub struct EquivalenceStore {
    policy: RepresentativePolicy,
    /// Member → representative, for members of non-singleton groups.
    roots: AHashMap<SegmentId, SegmentId>,
    /// Representative → members (representative included).
    groups: AHashMap<SegmentId, Vec<SegmentId>>,
}

impl EquivalenceStore {
    /// Empty store using [`RepresentativePolicy::Max`].
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Empty store with an explicit representative policy.
    #[must_use]
    pub fn with_policy(policy: RepresentativePolicy) -> Self {
        Self {
            policy,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn policy(&self) -> RepresentativePolicy {
        self.policy
    }

    /// Representative of the group containing `id`.
    #[inline]
    #[must_use]
    pub fn get(&self, id: SegmentId) -> SegmentId {
        self.roots.get(&id).copied().unwrap_or(id)
    }

    /// Whether `a` and `b` belong to the same group.
    #[must_use]
    pub fn is_linked(&self, a: SegmentId, b: SegmentId) -> bool {
        self.get(a) == self.get(b)
    }

    /// Union the groups containing `a` and `b`.
    ///
    /// Returns `true` if two distinct groups were merged.
    pub fn link(&mut self, a: SegmentId, b: SegmentId) -> bool {
        let root_a = self.get(a);
        let root_b = self.get(b);
        if root_a == root_b {
            return false;
        }
        let representative = self.policy.pick(root_a, root_b);
        self.union(root_a, root_b, representative);
        true
    }

    /// Move the group containing `id` into the group of `root`, keeping the
    /// current representative of `root` whatever the policy.
    ///
    /// Returns `true` if two distinct groups were merged.
    pub fn link_to_root(&mut self, id: SegmentId, root: SegmentId) -> bool {
        let root_a = self.get(id);
        let representative = self.get(root);
        if root_a == representative {
            return false;
        }
        self.union(root_a, representative, representative);
        true
    }

    fn union(&mut self, root_a: SegmentId, root_b: SegmentId, representative: SegmentId) {
        let group_a = self.groups.remove(&root_a).unwrap_or_else(|| vec![root_a]);
        let group_b = self.groups.remove(&root_b).unwrap_or_else(|| vec![root_b]);

        let ((mut large, large_root), small) = if group_a.len() >= group_b.len() {
            ((group_a, root_a), group_b)
        } else {
            ((group_b, root_b), group_a)
        };

        if large_root == representative {
            for &member in &small {
                self.roots.insert(member, representative);
            }
            large.extend(small);
        } else {
            large.extend(small);
            for &member in &large {
                self.roots.insert(member, representative);
            }
        }
        self.groups.insert(representative, large);
    }

    /// All members of the group containing `id`, sorted ascending.
    #[must_use]
    pub fn members(&self, id: SegmentId) -> Vec<SegmentId> {
        let root = self.get(id);
        let mut members = self
            .groups
            .get(&root)
            .cloned()
            .unwrap_or_else(|| vec![root]);
        members.sort_unstable();
        members
    }

    /// Dissolve the group containing `id` into singletons.
    ///
    /// Returns the former members, sorted ascending.
    pub fn remove_group(&mut self, id: SegmentId) -> Vec<SegmentId> {
        let root = self.get(id);
        let mut members = self.groups.remove(&root).unwrap_or_else(|| vec![root]);
        for member in &members {
            self.roots.remove(member);
        }
        members.sort_unstable();
        members
    }

    /// Remove every group.
    pub fn clear(&mut self) {
        self.roots.clear();
        self.groups.clear();
    }

    /// Number of ids that belong to a non-singleton group.
    #[must_use]
    pub fn len(&self) -> usize {
        self.roots.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.roots.is_empty()
    }

    /// Number of non-singleton groups.
    #[must_use]
    pub fn group_count(&self) -> usize {
        self.groups.len()
    }

    /// Iterate `(member, representative)` pairs in unspecified order.
    pub fn iter(&self) -> impl Iterator<Item = (SegmentId, SegmentId)> + '_ {
        self.roots.iter().map(|(&member, &root)| (member, root))
    }
}

#![forbid(unsafe_code)]

//! Set of root segments a view displays.

use ahash::AHashSet;

use crate::id::SegmentId;

/// Unordered set of visible root ids.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VisibleSegmentSet {
    roots: AHashSet<SegmentId>,
}

impl VisibleSegmentSet {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a root. Returns `true` if it was not already visible.
    pub fn insert(&mut self, root: SegmentId) -> bool {
        self.roots.insert(root)
    }

    /// Remove a root. Returns `true` if it was visible.
    pub fn remove(&mut self, root: SegmentId) -> bool {
        self.roots.remove(&root)
    }

    #[must_use]
    pub fn contains(&self, root: SegmentId) -> bool {
        self.roots.contains(&root)
    }

    pub fn clear(&mut self) {
        self.roots.clear();
    }

    /// Replace the contents with `roots`.
    pub fn replace_with(&mut self, roots: impl IntoIterator<Item = SegmentId>) {
        self.roots.clear();
        self.roots.extend(roots);
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.roots.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.roots.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = SegmentId> + '_ {
        self.roots.iter().copied()
    }

    /// Contents sorted ascending (stable output for status text and tests).
    #[must_use]
    pub fn sorted(&self) -> Vec<SegmentId> {
        let mut roots: Vec<_> = self.roots.iter().copied().collect();
        roots.sort_unstable();
        roots
    }
}

impl Extend<SegmentId> for VisibleSegmentSet {
    fn extend<I: IntoIterator<Item = SegmentId>>(&mut self, iter: I) {
        self.roots.extend(iter);
    }
}

impl FromIterator<SegmentId> for VisibleSegmentSet {
    fn from_iter<I: IntoIterator<Item = SegmentId>>(iter: I) -> Self {
        Self {
            roots: iter.into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_remove_contains() {
        let mut set = VisibleSegmentSet::new();
        assert!(set.insert(SegmentId(3)));
        assert!(!set.insert(SegmentId(3)));
        assert!(set.contains(SegmentId(3)));
        assert!(set.remove(SegmentId(3)));
        assert!(!set.remove(SegmentId(3)));
        assert!(set.is_empty());
    }

    #[test]
    fn replace_with_discards_previous_contents() {
        let mut set: VisibleSegmentSet = [SegmentId(1), SegmentId(2)].into_iter().collect();
        set.replace_with([SegmentId(9), SegmentId(4)]);
        assert_eq!(set.sorted(), vec![SegmentId(4), SegmentId(9)]);
    }
}

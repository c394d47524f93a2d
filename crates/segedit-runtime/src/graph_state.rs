#![forbid(unsafe_code)]

//! Permanent and temporary segmentation state of one layer.
//!
//! Every layer keeps two equivalence stores and two visible-segment sets.
//! The permanent pair reflects committed edits. The temporary pair holds a
//! tool's preview and is only authoritative while the matching overlay
//! switch is on. Reads name the instance they want through an
//! [`OverlaySelection`], usually the one returned by
//! [`SegmentationGraphState::selection`].
//!
//! # Invariants
//!
//! 1. Exactly one instance of each container is authoritative per read.
//! 2. After [`reset_temporary_visible_segments_state`] both switches are off
//!    and both temporary containers are empty.
//! 3. No `RefCell` borrow is held while an observable or signal fires.
//!
//! [`reset_temporary_visible_segments_state`]: SegmentationGraphState::reset_temporary_visible_segments_state

use std::cell::RefCell;

use segedit_core::{
    EquivalenceStore, RepresentativePolicy, SegmentId, SplitResult, UNKNOWN_NEW_SEGMENT_ID,
    VisibleSegmentSet,
};
use tracing::trace;

use crate::reactive::{Observable, Signal};

/// Which instance of a container a read consults.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum OverlaySource {
    #[default]
    Permanent,
    Temporary,
}

impl OverlaySource {
    #[must_use]
    pub const fn from_flag(use_temporary: bool) -> Self {
        if use_temporary {
            Self::Temporary
        } else {
            Self::Permanent
        }
    }
}

/// Per-read choice of authoritative containers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct OverlaySelection {
    pub visible: OverlaySource,
    pub equivalences: OverlaySource,
}

impl OverlaySelection {
    /// Committed state only, ignoring any preview.
    pub const PERMANENT: Self = Self {
        visible: OverlaySource::Permanent,
        equivalences: OverlaySource::Permanent,
    };
}

pub struct SegmentationGraphState {
    permanent_equivalences: RefCell<EquivalenceStore>,
    temporary_equivalences: RefCell<EquivalenceStore>,
    permanent_visible: RefCell<VisibleSegmentSet>,
    temporary_visible: RefCell<VisibleSegmentSet>,
    use_temporary_visible_segments: Observable<bool>,
    use_temporary_segment_equivalences: Observable<bool>,
    permanent_changed: Signal<()>,
    temporary_changed: Signal<()>,
}

impl std::fmt::Debug for SegmentationGraphState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SegmentationGraphState")
            .field("selection", &self.selection())
            .field("permanent_groups", &self.permanent_equivalences.borrow().group_count())
            .field("permanent_visible", &self.permanent_visible.borrow().len())
            .field("temporary_visible", &self.temporary_visible.borrow().len())
            .finish_non_exhaustive()
    }
}

impl Default for SegmentationGraphState {
    fn default() -> Self {
        Self::new()
    }
}

impl SegmentationGraphState {
    #[must_use]
    pub fn new() -> Self {
        Self::with_policy(RepresentativePolicy::default())
    }

    #[must_use]
    pub fn with_policy(policy: RepresentativePolicy) -> Self {
        Self {
            permanent_equivalences: RefCell::new(EquivalenceStore::with_policy(policy)),
            temporary_equivalences: RefCell::new(EquivalenceStore::with_policy(policy)),
            permanent_visible: RefCell::default(),
            temporary_visible: RefCell::default(),
            use_temporary_visible_segments: Observable::new(false),
            use_temporary_segment_equivalences: Observable::new(false),
            permanent_changed: Signal::new(),
            temporary_changed: Signal::new(),
        }
    }

    /// Switch selecting the temporary visible set.
    #[must_use]
    pub fn use_temporary_visible_segments(&self) -> &Observable<bool> {
        &self.use_temporary_visible_segments
    }

    /// Switch selecting the temporary equivalence store.
    #[must_use]
    pub fn use_temporary_segment_equivalences(&self) -> &Observable<bool> {
        &self.use_temporary_segment_equivalences
    }

    /// Fires after any committed equivalence or visibility change.
    #[must_use]
    pub fn permanent_changed(&self) -> &Signal<()> {
        &self.permanent_changed
    }

    /// Fires after the preview is staged or reset.
    #[must_use]
    pub fn temporary_changed(&self) -> &Signal<()> {
        &self.temporary_changed
    }

    /// Selection implied by the current overlay switches.
    #[must_use]
    pub fn selection(&self) -> OverlaySelection {
        OverlaySelection {
            visible: OverlaySource::from_flag(self.use_temporary_visible_segments.get()),
            equivalences: OverlaySource::from_flag(self.use_temporary_segment_equivalences.get()),
        }
    }

    // ── Reads ───────────────────────────────────────────────────────────

    #[must_use]
    pub fn resolve(&self, id: SegmentId, selection: OverlaySelection) -> SegmentId {
        self.equivalences(selection.equivalences).borrow().get(id)
    }

    #[must_use]
    pub fn is_visible(&self, root: SegmentId, selection: OverlaySelection) -> bool {
        self.visible(selection.visible).borrow().contains(root)
    }

    /// Visible roots, sorted.
    #[must_use]
    pub fn visible_roots(&self, selection: OverlaySelection) -> Vec<SegmentId> {
        self.visible(selection.visible).borrow().sorted()
    }

    /// Every id in the group of `id`, sorted.
    #[must_use]
    pub fn members(&self, id: SegmentId, selection: OverlaySelection) -> Vec<SegmentId> {
        self.equivalences(selection.equivalences).borrow().members(id)
    }

    /// Run `f` against one equivalence store without cloning it.
    pub fn with_equivalences<R>(
        &self,
        source: OverlaySource,
        f: impl FnOnce(&EquivalenceStore) -> R,
    ) -> R {
        f(&self.equivalences(source).borrow())
    }

    // ── Permanent writes ────────────────────────────────────────────────

    /// Link two ids in the permanent store.
    pub fn link(&self, a: SegmentId, b: SegmentId) -> bool {
        let changed = self.permanent_equivalences.borrow_mut().link(a, b);
        if changed {
            self.permanent_changed.notify();
        }
        changed
    }

    /// Add a root to the permanent visible set.
    pub fn add_visible(&self, root: SegmentId) -> bool {
        let changed = self.permanent_visible.borrow_mut().insert(root);
        if changed {
            self.permanent_changed.notify();
        }
        changed
    }

    pub fn remove_visible(&self, root: SegmentId) -> bool {
        let changed = self.permanent_visible.borrow_mut().remove(root);
        if changed {
            self.permanent_changed.notify();
        }
        changed
    }

    /// Apply a batch of committed edits, then notify once.
    pub fn edit_permanent<R>(
        &self,
        f: impl FnOnce(&mut EquivalenceStore, &mut VisibleSegmentSet) -> R,
    ) -> R {
        let result = {
            let mut equivalences = self.permanent_equivalences.borrow_mut();
            let mut visible = self.permanent_visible.borrow_mut();
            f(&mut equivalences, &mut visible)
        };
        self.permanent_changed.notify();
        result
    }

    // ── Temporary overlay ───────────────────────────────────────────────

    /// Show exactly `roots` while keeping committed equivalences.
    pub fn stage_visible_preview(&self, roots: impl IntoIterator<Item = SegmentId>) {
        self.temporary_equivalences.borrow_mut().clear();
        self.temporary_visible.borrow_mut().replace_with(roots);
        self.use_temporary_segment_equivalences.set(false);
        self.use_temporary_visible_segments.set(true);
        trace!(
            roots = ?self.temporary_visible.borrow().sorted(),
            "staged visible preview"
        );
        self.temporary_changed.notify();
    }

    /// Preview a split of the group rooted at `anchor_root`.
    ///
    /// Included ids stay with the anchor's root; excluded ids join
    /// [`UNKNOWN_NEW_SEGMENT_ID`]. Both resulting roots are shown.
    pub fn stage_split_preview(&self, anchor_root: SegmentId, split: &SplitResult) {
        let shown = {
            let mut equivalences = self.temporary_equivalences.borrow_mut();
            equivalences.clear();
            for &id in &split.include {
                equivalences.link_to_root(id, anchor_root);
            }
            for &id in &split.exclude {
                equivalences.link_to_root(id, UNKNOWN_NEW_SEGMENT_ID);
            }
            [
                equivalences.get(anchor_root),
                equivalences.get(UNKNOWN_NEW_SEGMENT_ID),
            ]
        };
        self.temporary_visible.borrow_mut().replace_with(shown);
        self.use_temporary_segment_equivalences.set(true);
        self.use_temporary_visible_segments.set(true);
        trace!(
            include = split.include.len(),
            exclude = split.exclude.len(),
            "staged split preview"
        );
        self.temporary_changed.notify();
    }

    /// Turn both switches off and empty both temporary containers.
    ///
    /// Returns `false` without notifying anyone when already reset.
    pub fn reset_temporary_visible_segments_state(&self) -> bool {
        if self.is_temporary_reset() {
            return false;
        }
        self.temporary_equivalences.borrow_mut().clear();
        self.temporary_visible.borrow_mut().clear();
        self.use_temporary_segment_equivalences.set(false);
        self.use_temporary_visible_segments.set(false);
        trace!("reset temporary overlay");
        self.temporary_changed.notify();
        true
    }

    /// Both switches off and both temporary containers empty.
    #[must_use]
    pub fn is_temporary_reset(&self) -> bool {
        !self.use_temporary_visible_segments.get()
            && !self.use_temporary_segment_equivalences.get()
            && self.temporary_equivalences.borrow().is_empty()
            && self.temporary_visible.borrow().is_empty()
    }

    fn equivalences(&self, source: OverlaySource) -> &RefCell<EquivalenceStore> {
        match source {
            OverlaySource::Permanent => &self.permanent_equivalences,
            OverlaySource::Temporary => &self.temporary_equivalences,
        }
    }

    fn visible(&self, source: OverlaySource) -> &RefCell<VisibleSegmentSet> {
        match source {
            OverlaySource::Permanent => &self.permanent_visible,
            OverlaySource::Temporary => &self.temporary_visible,
        }
    }
}

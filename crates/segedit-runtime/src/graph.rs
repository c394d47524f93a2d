#![forbid(unsafe_code)]

//! Backend that commits merges and splits.
//!
//! Tools talk to the segmentation graph through [`GraphConnection`]. Commits
//! are asynchronous and return a [`LocalBoxFuture`]; split previews are
//! synchronous. [`MemoryGraphConnection`] keeps the whole graph in process and
//! applies commits directly to a layer's permanent state.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use futures_util::FutureExt;
use futures_util::future::LocalBoxFuture;
use segedit_core::{ConnectivityGraph, SegmentId, SplitResult};
use tracing::{debug, info};

use crate::error::CommitError;
use crate::graph_state::{OverlaySelection, SegmentationGraphState};

/// Pending result of a merge or split request.
pub type CommitFuture = LocalBoxFuture<'static, Result<(), CommitError>>;

pub trait GraphConnection {
    /// Whether commits can currently be issued.
    fn is_connected(&self) -> bool {
        true
    }

    /// Merge the groups of two base segments.
    fn merge(&self, anchor: SegmentId, other: SegmentId) -> CommitFuture;

    /// Split the group of `anchor` so that `seed` ends up in a new group.
    fn split(&self, anchor: SegmentId, seed: SegmentId) -> CommitFuture;

    /// Partition the group shared by `anchor` and `seed`, without committing.
    fn compute_split(&self, anchor: SegmentId, seed: SegmentId) -> Option<SplitResult>;
}

struct MemoryGraph {
    state: Rc<SegmentationGraphState>,
    edges: RefCell<ConnectivityGraph>,
    next_root: Cell<u64>,
    connected: Cell<bool>,
    rejection: RefCell<Option<String>>,
}

impl MemoryGraph {
    /// Base segments of the committed group containing `id`.
    fn base_members(&self, id: SegmentId) -> Vec<SegmentId> {
        let edges = self.edges.borrow();
        self.state
            .members(id, OverlaySelection::PERMANENT)
            .into_iter()
            .filter(|member| edges.contains(*member))
            .collect()
    }

    fn check(&self) -> Result<(), CommitError> {
        if !self.connected.get() {
            return Err(CommitError::Disconnected);
        }
        match self.rejection.borrow_mut().take() {
            Some(reason) => Err(CommitError::Rejected(reason)),
            None => Ok(()),
        }
    }

    fn compute_split(&self, anchor: SegmentId, seed: SegmentId) -> Option<SplitResult> {
        let root = self.state.resolve(anchor, OverlaySelection::PERMANENT);
        if self.state.resolve(seed, OverlaySelection::PERMANENT) != root {
            return None;
        }
        let members = self.base_members(anchor);
        self.edges.borrow().compute_split(anchor, seed, &members)
    }

    fn merge(&self, anchor: SegmentId, other: SegmentId) -> Result<(), CommitError> {
        self.check()?;
        let permanent = OverlaySelection::PERMANENT;
        let anchor_root = self.state.resolve(anchor, permanent);
        let other_root = self.state.resolve(other, permanent);
        if anchor_root == other_root {
            return Err(CommitError::Rejected(format!(
                "segments {anchor} and {other} are already merged"
            )));
        }

        self.edges.borrow_mut().add_edge(anchor, other);
        let root = self.state.edit_permanent(|equivalences, visible| {
            equivalences.link(anchor, other);
            let root = equivalences.get(anchor);
            let was_visible = visible.remove(anchor_root) | visible.remove(other_root);
            if was_visible {
                visible.insert(root);
            }
            root
        });
        info!(%anchor, %other, %root, "merged segments");
        Ok(())
    }

    fn split(&self, anchor: SegmentId, seed: SegmentId) -> Result<(), CommitError> {
        self.check()?;
        let split = self
            .compute_split(anchor, seed)
            .ok_or_else(|| CommitError::Rejected(format!("no split separates {anchor} from {seed}")))?;
        let members = self.base_members(anchor);
        split
            .validate(&members)
            .map_err(|err| CommitError::Rejected(err.to_string()))?;

        let old_root = self.state.resolve(anchor, OverlaySelection::PERMANENT);
        let new_root = SegmentId(self.next_root.get());
        self.next_root.set(new_root.0 + 1);

        let cut = self.edges.borrow_mut().cut(&split);
        self.state.edit_permanent(|equivalences, visible| {
            equivalences.remove_group(old_root);
            for &id in &split.include {
                equivalences.link(id, old_root);
            }
            for &id in &split.exclude {
                equivalences.link(id, new_root);
            }
            if visible.contains(old_root) {
                visible.insert(new_root);
            }
        });
        info!(%anchor, %seed, %old_root, %new_root, cut, "split segment");
        Ok(())
    }
}

/// In-process graph backend bound to one layer's permanent state.
///
/// Roots it allocates for split-off groups count up from `first_new_root`,
/// which must sort above every base id so the default representative policy
/// keeps roots representative.
#[derive(Clone)]
pub struct MemoryGraphConnection {
    inner: Rc<MemoryGraph>,
}

impl std::fmt::Debug for MemoryGraphConnection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryGraphConnection")
            .field("nodes", &self.inner.edges.borrow().node_count())
            .field("connected", &self.inner.connected.get())
            .finish()
    }
}

impl MemoryGraphConnection {
    pub const DEFAULT_FIRST_NEW_ROOT: u64 = 1 << 40;

    #[must_use]
    pub fn new(state: Rc<SegmentationGraphState>) -> Self {
        Self::with_first_new_root(state, Self::DEFAULT_FIRST_NEW_ROOT)
    }

    #[must_use]
    pub fn with_first_new_root(state: Rc<SegmentationGraphState>, first_new_root: u64) -> Self {
        Self {
            inner: Rc::new(MemoryGraph {
                state,
                edges: RefCell::default(),
                next_root: Cell::new(first_new_root),
                connected: Cell::new(true),
                rejection: RefCell::new(None),
            }),
        }
    }

    /// Register base segment `base` as a member of `root`.
    pub fn add_supervoxel(&self, base: SegmentId, root: SegmentId) {
        self.inner.edges.borrow_mut().add_node(base);
        self.inner.state.link(base, root);
    }

    /// Connect two base segments.
    pub fn add_edge(&self, a: SegmentId, b: SegmentId) {
        self.inner.edges.borrow_mut().add_edge(a, b);
    }

    pub fn set_connected(&self, connected: bool) {
        self.inner.connected.set(connected);
    }

    /// Make the next commit fail with `reason`.
    pub fn reject_next(&self, reason: impl Into<String>) {
        *self.inner.rejection.borrow_mut() = Some(reason.into());
    }

    #[must_use]
    pub fn has_edge(&self, a: SegmentId, b: SegmentId) -> bool {
        self.inner.edges.borrow().has_edge(a, b)
    }
}

impl GraphConnection for MemoryGraphConnection {
    fn is_connected(&self) -> bool {
        self.inner.connected.get()
    }

    fn merge(&self, anchor: SegmentId, other: SegmentId) -> CommitFuture {
        let graph = Rc::clone(&self.inner);
        async move {
            debug!(%anchor, %other, "merge requested");
            graph.merge(anchor, other)
        }
        .boxed_local()
    }

    fn split(&self, anchor: SegmentId, seed: SegmentId) -> CommitFuture {
        let graph = Rc::clone(&self.inner);
        async move {
            debug!(%anchor, %seed, "split requested");
            graph.split(anchor, seed)
        }
        .boxed_local()
    }

    fn compute_split(&self, anchor: SegmentId, seed: SegmentId) -> Option<SplitResult> {
        self.inner.compute_split(anchor, seed)
    }
}

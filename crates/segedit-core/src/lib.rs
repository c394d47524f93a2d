#![forbid(unsafe_code)]

//! Core: segment ids, equivalence stores, visibility sets, and input events.
//!
//! # Role in segedit
//! `segedit-core` is the data layer. It owns the union structure that maps
//! base segments to the root of their merged group, the set of roots that a
//! view displays, and the partition contract used to preview splits. None of
//! these types know about tools, reactive cells, or scheduling.
//!
//! # Primary responsibilities
//! - **SegmentId**: opaque 64-bit ids plus the layout that tells base ids
//!   apart from graph roots.
//! - **EquivalenceStore**: constant-time `get`, idempotent `link`.
//! - **VisibleSegmentSet**: the roots a view renders.
//! - **SplitResult / ConnectivityGraph**: include/exclude partitions of a
//!   merged group.
//! - **Event**: canonical key, mouse, and focus events consumed by the
//!   tool binder.
//!
//! # How it fits in the system
//! `segedit-runtime` wraps these structures in layer state with permanent and
//! temporary instances, and drives them from tools. The facade crate
//! (`segedit`) re-exports both.

pub mod equivalence;
pub mod event;
pub mod id;
pub mod split;
pub mod visible;

pub use equivalence::{EquivalenceStore, RepresentativePolicy};
pub use event::{Event, KeyCode, KeyEvent, KeyEventKind, Modifiers, MouseButton, MouseEvent, MouseEventKind};
pub use id::{SegmentId, SegmentIdLayout, UNKNOWN_NEW_SEGMENT_ID};
pub use split::{ConnectivityGraph, SplitPartitionError, SplitResult};
pub use visible::VisibleSegmentSet;

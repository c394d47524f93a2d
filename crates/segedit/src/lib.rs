#![forbid(unsafe_code)]

//! segedit public facade crate.
//!
//! This crate provides the stable surface for hosts embedding segment
//! editing. It re-exports the common types of `segedit-core` and
//! `segedit-runtime`, adds a [`Session`] that wires a binder, registry, and
//! frame scheduler together, and offers a lightweight prelude.

pub mod error;
#[cfg(feature = "logging")]
pub mod logging;
pub mod session;

// --- Core re-exports -------------------------------------------------------

pub use segedit_core::{
    ConnectivityGraph, EquivalenceStore, Event, KeyCode, KeyEvent, KeyEventKind, Modifiers,
    MouseButton, MouseEvent, MouseEventKind, RepresentativePolicy, SegmentId, SegmentIdLayout,
    SplitPartitionError, SplitResult, UNKNOWN_NEW_SEGMENT_ID, VisibleSegmentSet,
};

// --- Runtime re-exports ----------------------------------------------------

pub use segedit_runtime::{
    ActivationContext, BinderResponse, CommitError, CommitOutcome, CommitTask, EditToolState,
    FrameScheduler, GraphConnection, InputEventMap, LayerHandle, LayerToolBinder,
    MERGE_SEGMENTS_TOOL_ID, MemoryGraphConnection, MergeSegmentsTool, Observable,
    OverlaySelection, OverlaySource, SPLIT_SEGMENTS_TOOL_ID, SegmentationGraphState,
    SegmentationLayer, Signal, SplitSegmentsTool, Subscription, Tool, ToolAction, ToolBinder,
    ToolConfig, ToolError, ToolRegistry, ToolStatus,
};

// --- Facade ----------------------------------------------------------------

pub use error::{Error, Recovery, Result};
pub use session::{FrameReport, Session};

// --- Prelude ---------------------------------------------------------------

pub mod prelude {
    pub use crate::{
        BinderResponse, CommitOutcome, Error, Event, GraphConnection, LayerHandle,
        LayerToolBinder, MemoryGraphConnection, MergeSegmentsTool, MouseButton, Result, SegmentId,
        Session, SplitSegmentsTool, Tool, ToolAction, ToolConfig,
    };

    pub use crate::{core, runtime};
}

pub use segedit_core as core;
pub use segedit_runtime as runtime;

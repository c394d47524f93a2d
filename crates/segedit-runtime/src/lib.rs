#![forbid(unsafe_code)]

//! Runtime: reactive layer state, segment edit tools, and key binders.
//!
//! # Role in segedit
//! `segedit-runtime` drives the data structures of `segedit-core` from user
//! input. It owns each layer's permanent and temporary segmentation state,
//! the tools that preview and commit merges and splits, and the binder that
//! activates tools while their key is held.
//!
//! # Primary responsibilities
//! - **Reactive cells**: [`Observable`] values and [`Signal`] events with
//!   RAII [`Subscription`] guards.
//! - **Frame scheduling**: [`FrameScheduler`] coalesces recomputes to one
//!   per frame.
//! - **Activation contexts**: scoped ownership of a tool session's resources.
//! - **Layer state**: [`SegmentationLayer`] with its
//!   [`SegmentationGraphState`] overlay and [`GraphConnection`] backend.
//! - **Tools**: [`MergeSegmentsTool`], [`SplitSegmentsTool`], the
//!   [`ToolRegistry`], and the [`ToolBinder`] / [`LayerToolBinder`] pair.
//!
//! # How it fits in the system
//! The host feeds input through [`ToolBinder::handle_event`], calls
//! [`FrameScheduler::run_frame`] and [`ToolBinder::tick`] once per frame,
//! and awaits the [`CommitTask`] a trigger returns. The `segedit` facade
//! re-exports this crate together with `segedit-core`.

pub mod activation;
pub mod config;
pub mod error;
pub mod graph;
pub mod graph_state;
pub mod layer;
pub mod reactive;
pub mod scheduler;
pub mod status;
pub mod tool;

pub use activation::ActivationContext;
pub use config::ToolConfig;
pub use error::{CommitError, Result, ToolError};
pub use graph::{CommitFuture, GraphConnection, MemoryGraphConnection};
pub use graph_state::{OverlaySelection, OverlaySource, SegmentationGraphState};
pub use layer::{LayerHandle, SegmentationLayer};
pub use reactive::{Observable, Signal, Subscription};
pub use scheduler::{FrameDebouncer, FrameKey, FrameScheduler};
pub use status::{StatusMessage, StatusMessages, ToolStatus};
pub use tool::{
    AnchorState, BinderResponse, CommitOutcome, CommitTask, EditToolState, InputEventMap,
    LayerBindings, LayerToolBinder, MERGE_SEGMENTS_TOOL_ID, MergeSegmentsTool, MergeToolState,
    SPLIT_SEGMENTS_TOOL_ID, SegmentRef, SplitSegmentsTool, TimedEvent, Tool, ToolAction,
    ToolBinder, ToolFactory, ToolRegistry, ValidatedSegment,
};

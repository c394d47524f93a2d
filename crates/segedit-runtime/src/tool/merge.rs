#![forbid(unsafe_code)]

//! Tool that merges the hovered segment into a pinned anchor.
//!
//! The merge is committed between two base segments: the base segment of
//! the anchor's group the pointer last crossed (closest to where the user
//! wants the join) and the hovered base segment of the other group. While
//! active the tool previews both groups alone in the temporary visible set.

use std::rc::Rc;

use segedit_core::SegmentId;
use serde_json::{Map, Value};
use tracing::debug;

use super::anchor::{AnchorState, EditCore, EditRequest, EditToolState, SegmentRef, ValidatedSegment};
use super::commit::{CommitGuard, CommitKind, CommitTask, commit_task};
use super::{InputEventMap, Tool, ToolAction, anchor};
use crate::activation::ActivationContext;
use crate::error::ToolError;
use crate::layer::LayerHandle;
use crate::reactive::{Observable, Signal};
use crate::status::ToolStatus;

pub const MERGE_SEGMENTS_TOOL_ID: &str = "mergeSegments";

/// Cycle of the merge tool.
pub type MergeToolState = EditToolState;

const HEADER: &str = "Merge segments";
const SELECT_ANCHOR: &str = "Select anchor segment for merge";
const ANCHOR_NOT_VISIBLE: &str = "Anchor segment must be in visible set";
const HOVER_WITHIN_ANCHOR: &str =
    "Hover over base segment within anchor segment that is closest to merge location";
const HOVER_OTHER: &str = "Hover over segment to merge";

pub struct MergeSegmentsTool {
    core: EditCore,
    input_map: InputEventMap,
}

impl MergeSegmentsTool {
    #[must_use]
    pub fn new(layer: LayerHandle) -> Self {
        let tool = Self {
            core: EditCore::new(layer),
            input_map: InputEventMap::segment_edit(),
        };
        tool.refresh_status();
        tool
    }

    /// Restore from the options of a serialized `{type, ...}` object.
    pub fn from_options(layer: LayerHandle, options: &Map<String, Value>) -> Result<Self, ToolError> {
        let anchor = anchor::parse_anchor(options)?;
        let tool = Self::new(layer);
        if anchor.is_some() {
            tool.core.anchor.anchor.set(anchor);
            tool.refresh_status();
        }
        Ok(tool)
    }

    #[must_use]
    pub fn anchor_state(&self) -> &AnchorState {
        &self.core.anchor
    }

    /// Reactive copy of [`Tool::status`].
    #[must_use]
    pub fn status_cell(&self) -> &Observable<ToolStatus> {
        &self.core.status
    }

    #[must_use]
    pub fn state(&self) -> MergeToolState {
        self.core.state()
    }

    /// Pin the hovered base segment as the anchor.
    pub fn set_anchor(&self) -> bool {
        self.core.set_anchor(true)
    }

    #[must_use]
    pub fn validated_anchor(&self) -> ValidatedSegment {
        validate(&self.core).anchor
    }

    #[must_use]
    pub fn validated_other(&self) -> ValidatedSegment {
        validate(&self.core).other
    }

    fn refresh_status(&self) {
        self.core.publish_status(status_for(&validate(&self.core)));
    }
}

fn validate(core: &EditCore) -> EditRequest {
    let anchor = core
        .visible_anchor(SELECT_ANCHOR, ANCHOR_NOT_VISIBLE)
        .and_then(|(_, root)| {
            match core.anchor.last_anchor_base_segment.get() {
                Some(base) if core.resolve(base) == root => Ok(SegmentRef { base, root }),
                _ => Err(HOVER_WITHIN_ANCHOR),
            }
        });
    let other = match core.layer.hovered_base_segment().get() {
        None => Err(HOVER_OTHER),
        Some(base) => {
            let root = core.resolve(base);
            match anchor {
                Ok(anchor) if anchor.root == root => Err(HOVER_OTHER),
                _ => Ok(SegmentRef { base, root }),
            }
        }
    };
    EditRequest { anchor, other }
}

fn status_for(request: &EditRequest) -> ToolStatus {
    ToolStatus::new(
        HEADER,
        anchor::describe_request(request, |other| format!("merge with {other}")),
    )
}

fn recompute(core: &EditCore) {
    let request = validate(core);
    let graph = core.layer.graph();
    match request.anchor {
        Ok(anchor) => {
            let other_root = request.other.ok().map(|other| other.root);
            graph.stage_visible_preview(std::iter::once(anchor.root).chain(other_root));
        }
        Err(reason) => {
            debug!(reason, "merge anchor invalid; resetting preview");
            graph.reset_temporary_visible_segments_state();
        }
    }
    core.previewing.set(request.both().is_some());
    core.publish_status(status_for(&request));
}

/// Record the hovered segment when it lies in the anchor's group.
fn track_anchor_base(core: &EditCore, hovered: Option<SegmentId>) {
    let (Some(hovered), Some(anchor)) = (hovered, core.anchor.anchor.get()) else {
        return;
    };
    if core.resolve(hovered) == core.resolve(anchor) {
        core.anchor.last_anchor_base_segment.set(Some(hovered));
    }
}

impl Tool for MergeSegmentsTool {
    fn tool_type(&self) -> &'static str {
        MERGE_SEGMENTS_TOOL_ID
    }

    fn layer(&self) -> &LayerHandle {
        &self.core.layer
    }

    fn activate(&self, cx: &mut ActivationContext) {
        let core = &self.core;
        track_anchor_base(core, core.layer.hovered_base_segment().get());
        core.start_session(cx, MERGE_SEGMENTS_TOOL_ID, recompute);

        let tracker = core.clone();
        cx.register_subscription(
            core.layer
                .hovered_base_segment()
                .subscribe(move |hovered| track_anchor_base(&tracker, *hovered)),
        );

        // A new anchor keeps the tracked base only if the pointer is already inside it.
        let tracker = core.clone();
        cx.register_subscription(core.anchor.anchor.subscribe(move |anchor| {
            let hovered = tracker.layer.hovered_base_segment().get();
            let inside = match (hovered, *anchor) {
                (Some(hovered), Some(anchor)) => tracker.resolve(hovered) == tracker.resolve(anchor),
                _ => false,
            };
            tracker
                .anchor
                .last_anchor_base_segment
                .set(if inside { hovered } else { None });
        }));
    }

    fn deactivate(&self) {
        self.core.end_session();
        self.refresh_status();
    }

    fn is_active(&self) -> bool {
        self.core.active.get()
    }

    fn trigger(&self) -> Option<CommitTask> {
        if self.core.committing.get() {
            debug!("merge already committing; trigger ignored");
            return None;
        }
        let layer = &self.core.layer;
        let Some(connection) = layer.connection().filter(|c| c.is_connected()) else {
            debug!(layer = %layer.name(), "merge ignored: graph not connected");
            return None;
        };
        let request = validate(&self.core);
        let Some((anchor, other)) = request.both() else {
            if let Some(reason) = request.error() {
                layer.show_status(reason);
            }
            return None;
        };
        let guard = CommitGuard::new(&self.core.committing, &self.core.changed);
        let pending = connection.merge(anchor.base, other.base);
        Some(commit_task(
            CommitKind::Merge,
            Rc::clone(layer),
            anchor.base,
            other.base,
            pending,
            guard,
        ))
    }

    fn perform(&self, action: ToolAction) -> Option<CommitTask> {
        match action {
            ToolAction::Trigger => self.trigger(),
            ToolAction::SetAnchor => {
                self.set_anchor();
                None
            }
        }
    }

    fn describe(&self) -> String {
        match self.core.anchor.anchor.get() {
            Some(anchor) => format!("merge segments (anchor {anchor})"),
            None => "merge segments".to_owned(),
        }
    }

    fn to_json(&self) -> Value {
        anchor::anchor_json(MERGE_SEGMENTS_TOOL_ID, self.core.anchor.anchor.get())
    }

    fn status(&self) -> ToolStatus {
        self.core.status.get()
    }

    fn changed(&self) -> &Signal<()> {
        &self.core.changed
    }

    fn input_event_map(&self) -> Option<&InputEventMap> {
        Some(&self.input_map)
    }
}

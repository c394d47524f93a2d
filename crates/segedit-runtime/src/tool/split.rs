#![forbid(unsafe_code)]

//! Tool that splits a seed segment away from a pinned anchor.
//!
//! Both anchor and seed are base segments of the same group. The preview
//! shows the group as it would look after the split: the anchor's side
//! keeps the current root, the seed's side resolves to
//! [`UNKNOWN_NEW_SEGMENT_ID`](segedit_core::UNKNOWN_NEW_SEGMENT_ID) until
//! the backend allocates a real root.

use std::rc::Rc;

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

pub const SPLIT_SEGMENTS_TOOL_ID: &str = "splitSegments";

const HEADER: &str = "Split segment";
const SELECT_ANCHOR: &str = "Select anchor segment for split";
const ANCHOR_NOT_VISIBLE: &str = "Anchor segment must be in visible set";
const HOVER_SEED: &str = "Hover over base segment to seed split";

pub struct SplitSegmentsTool {
    core: EditCore,
    input_map: InputEventMap,
}

impl SplitSegmentsTool {
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

    #[must_use]
    pub fn status_cell(&self) -> &Observable<ToolStatus> {
        &self.core.status
    }

    #[must_use]
    pub fn state(&self) -> EditToolState {
        self.core.state()
    }

    pub fn set_anchor(&self) -> bool {
        self.core.set_anchor(false)
    }

    #[must_use]
    pub fn validated_anchor(&self) -> ValidatedSegment {
        validate(&self.core).anchor
    }

    #[must_use]
    pub fn validated_seed(&self) -> ValidatedSegment {
        validate(&self.core).other
    }

    fn refresh_status(&self) {
        self.core.publish_status(status_for(&validate(&self.core)));
    }
}

fn validate(core: &EditCore) -> EditRequest {
    let anchor = core
        .visible_anchor(SELECT_ANCHOR, ANCHOR_NOT_VISIBLE)
        .map(|(base, root)| SegmentRef { base, root });
    let seed = match (anchor, core.layer.hovered_base_segment().get()) {
        (Ok(anchor), Some(base)) if base != anchor.base && core.resolve(base) == anchor.root => {
            Ok(SegmentRef {
                base,
                root: anchor.root,
            })
        }
        _ => Err(HOVER_SEED),
    };
    EditRequest {
        anchor,
        other: seed,
    }
}

fn status_for(request: &EditRequest) -> ToolStatus {
    ToolStatus::new(
        HEADER,
        anchor::describe_request(request, |seed| format!("split at {}", seed.base)),
    )
}

fn recompute(core: &EditCore) {
    let request = validate(core);
    let graph = core.layer.graph();
    let mut previewing = false;
    match request.anchor {
        Ok(anchor) => {
            let split = request.other.ok().and_then(|seed| {
                core.layer
                    .connection()
                    .and_then(|connection| connection.compute_split(anchor.base, seed.base))
            });
            match split {
                Some(split) => {
                    graph.stage_split_preview(anchor.root, &split);
                    previewing = true;
                }
                None => graph.stage_visible_preview([anchor.root]),
            }
        }
        Err(reason) => {
            debug!(reason, "split anchor invalid; resetting preview");
            graph.reset_temporary_visible_segments_state();
        }
    }
    core.previewing.set(previewing);
    core.publish_status(status_for(&request));
}

impl Tool for SplitSegmentsTool {
    fn tool_type(&self) -> &'static str {
        SPLIT_SEGMENTS_TOOL_ID
    }

    fn layer(&self) -> &LayerHandle {
        &self.core.layer
    }

    fn activate(&self, cx: &mut ActivationContext) {
        self.core.start_session(cx, SPLIT_SEGMENTS_TOOL_ID, recompute);
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
            debug!("split already committing; trigger ignored");
            return None;
        }
        let layer = &self.core.layer;
        let Some(connection) = layer.connection().filter(|c| c.is_connected()) else {
            debug!(layer = %layer.name(), "split ignored: graph not connected");
            return None;
        };
        let request = validate(&self.core);
        let Some((anchor, seed)) = request.both() else {
            if let Some(reason) = request.error() {
                layer.show_status(reason);
            }
            return None;
        };
        let guard = CommitGuard::new(&self.core.committing, &self.core.changed);
        let pending = connection.split(anchor.base, seed.base);
        Some(commit_task(
            CommitKind::Split,
            Rc::clone(layer),
            anchor.base,
            seed.base,
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
            Some(anchor) => format!("split segments (anchor {anchor})"),
            None => "split segments".to_owned(),
        }
    }

    fn to_json(&self) -> Value {
        anchor::anchor_json(SPLIT_SEGMENTS_TOOL_ID, self.core.anchor.anchor.get())
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::MemoryGraphConnection;
    use crate::layer::SegmentationLayer;
    use segedit_core::SegmentId;

    fn id(raw: u64) -> SegmentId {
        SegmentId(raw)
    }

    fn layer() -> LayerHandle {
        let layer = SegmentationLayer::new("seg").into_handle();
        let graph = MemoryGraphConnection::new(Rc::clone(layer.graph()));
        for base in [10, 11, 15, 16] {
            graph.add_supervoxel(id(base), id(100));
        }
        graph.add_supervoxel(id(20), id(200));
        graph.add_edge(id(10), id(11));
        graph.add_edge(id(11), id(15));
        graph.add_edge(id(15), id(16));
        layer.set_connection(Some(Rc::new(graph)));
        layer
    }

    #[test]
    fn seed_must_share_anchor_group_and_differ() {
        let layer = layer();
        let tool = SplitSegmentsTool::new(Rc::clone(&layer));
        assert_eq!(tool.validated_anchor(), Err(SELECT_ANCHOR));
        assert_eq!(tool.validated_seed(), Err(HOVER_SEED));

        layer.set_hovered(Some(id(10)));
        assert!(tool.set_anchor());
        assert_eq!(tool.validated_seed(), Err(HOVER_SEED));

        layer.set_hovered(Some(id(20)));
        assert_eq!(tool.validated_seed(), Err(HOVER_SEED));

        layer.set_hovered(Some(id(15)));
        assert_eq!(
            tool.validated_seed(),
            Ok(SegmentRef {
                base: id(15),
                root: id(100)
            })
        );
    }

    #[test]
    fn hidden_anchor_is_rejected() {
        let layer = layer();
        let tool = SplitSegmentsTool::new(Rc::clone(&layer));
        tool.anchor_state().anchor.set(Some(id(10)));
        assert_eq!(tool.validated_anchor(), Err(ANCHOR_NOT_VISIBLE));
    }

    #[test]
    fn restores_anchor_from_options() {
        let layer = layer();
        let mut options = Map::new();
        options.insert("anchor".into(), Value::String("10".into()));
        let tool = SplitSegmentsTool::from_options(Rc::clone(&layer), &options).unwrap();
        assert_eq!(tool.anchor_state().anchor.get(), Some(id(10)));
        assert_eq!(tool.state(), EditToolState::AnchorSet);
        assert_eq!(tool.status().body, ANCHOR_NOT_VISIBLE);
    }
}

#![forbid(unsafe_code)]

//! Anchor state and session plumbing shared by the segment edit tools.
//!
//! Both edit tools pin an anchor segment, validate it against the
//! committed state, and recompute a preview whenever the hovered segment,
//! the anchor, or the committed graph changes. Recomputes go through a
//! [`FrameDebouncer`] so pointer motion costs at most one recompute per
//! frame.

use std::cell::Cell;
use std::fmt;
use std::rc::Rc;

use segedit_core::SegmentId;
use serde_json::{Map, Value};
use tracing::{debug, debug_span};

use crate::activation::ActivationContext;
use crate::error::ToolError;
use crate::graph_state::OverlaySelection;
use crate::layer::LayerHandle;
use crate::reactive::{Observable, Signal};
use crate::scheduler::FrameDebouncer;
use crate::status::ToolStatus;

/// A base segment together with the root it resolves to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SegmentRef {
    pub base: SegmentId,
    pub root: SegmentId,
}

impl fmt::Display for SegmentRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (root {})", self.base, self.root)
    }
}

/// A segment that passed validation, or the reason it did not.
pub type ValidatedSegment = Result<SegmentRef, &'static str>;

/// Anchor and the other side of a candidate edit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct EditRequest {
    pub anchor: ValidatedSegment,
    pub other: ValidatedSegment,
}

impl EditRequest {
    pub fn error(&self) -> Option<&'static str> {
        self.anchor.err().or(self.other.err())
    }

    pub fn both(&self) -> Option<(SegmentRef, SegmentRef)> {
        Some((self.anchor.ok()?, self.other.ok()?))
    }
}

/// Where an edit tool is in its cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum EditToolState {
    /// No anchor pinned.
    #[default]
    Idle,
    /// Anchor pinned but no complete edit to preview.
    AnchorSet,
    /// A complete edit is previewed in the temporary overlay.
    Previewing,
    /// A commit is in flight.
    Committing,
}

/// The pinned anchor and, for merges, the base segment of the anchor's
/// group most recently seen under the pointer.
#[derive(Debug, Clone, Default)]
pub struct AnchorState {
    pub anchor: Observable<Option<SegmentId>>,
    pub last_anchor_base_segment: Observable<Option<SegmentId>>,
}

/// State shared between an edit tool and the callbacks of its session.
#[derive(Clone)]
pub(crate) struct EditCore {
    pub layer: LayerHandle,
    pub anchor: AnchorState,
    pub status: Observable<ToolStatus>,
    pub changed: Signal<()>,
    pub committing: Rc<Cell<bool>>,
    pub active: Rc<Cell<bool>>,
    pub previewing: Rc<Cell<bool>>,
}

impl EditCore {
    pub fn new(layer: LayerHandle) -> Self {
        Self {
            layer,
            anchor: AnchorState::default(),
            status: Observable::default(),
            changed: Signal::new(),
            committing: Rc::new(Cell::new(false)),
            active: Rc::new(Cell::new(false)),
            previewing: Rc::new(Cell::new(false)),
        }
    }

    pub fn resolve(&self, id: SegmentId) -> SegmentId {
        self.layer.graph().resolve(id, OverlaySelection::PERMANENT)
    }

    /// Anchor is defined and its root is in the committed visible set.
    pub fn visible_anchor(
        &self,
        missing: &'static str,
        hidden: &'static str,
    ) -> Result<(SegmentId, SegmentId), &'static str> {
        let anchor = self.anchor.anchor.get().ok_or(missing)?;
        let root = self.resolve(anchor);
        if self
            .layer
            .graph()
            .is_visible(root, OverlaySelection::PERMANENT)
        {
            Ok((anchor, root))
        } else {
            Err(hidden)
        }
    }

    pub fn state(&self) -> EditToolState {
        if self.committing.get() {
            EditToolState::Committing
        } else if self.anchor.anchor.with(Option::is_none) {
            EditToolState::Idle
        } else if self.active.get() && self.previewing.get() {
            EditToolState::Previewing
        } else {
            EditToolState::AnchorSet
        }
    }

    /// Publish a new status, notifying `changed` when it differs.
    pub fn publish_status(&self, status: ToolStatus) {
        if self.status.set(status) {
            self.changed.notify();
        }
    }

    /// Pin the hovered base segment as the anchor.
    ///
    /// Its root joins the committed visible set. With `track_base` the
    /// hovered segment also becomes the last anchor base segment.
    pub fn set_anchor(&self, track_base: bool) -> bool {
        let Some(hovered) = self.layer.hovered_base_segment().get() else {
            debug!("set anchor ignored: nothing hovered");
            return false;
        };
        if !self.layer.id_layout().is_base(hovered) {
            debug!(segment = %hovered, "set anchor ignored: not a base segment");
            return false;
        }
        let root = self.resolve(hovered);
        self.layer.graph().add_visible(root);
        let replaced = self.anchor.anchor.set(Some(hovered));
        if track_base {
            self.anchor.last_anchor_base_segment.set(Some(hovered));
        }
        if replaced {
            debug!(anchor = %hovered, %root, "anchor set");
            self.changed.notify();
        }
        replaced
    }

    /// Wire a session: overlay reset on dispose, recompute on every
    /// relevant change, and one recompute right away.
    pub fn start_session(&self, cx: &mut ActivationContext, tool: &'static str, recompute: fn(&EditCore)) {
        self.active.set(true);

        // First in, last out: the overlay reset runs after every listener is gone.
        let layer = Rc::clone(&self.layer);
        let active = Rc::clone(&self.active);
        let previewing = Rc::clone(&self.previewing);
        cx.register_disposer(move || {
            active.set(false);
            previewing.set(false);
            layer.graph().reset_temporary_visible_segments_state();
        });

        let debouncer = Rc::new(FrameDebouncer::new(self.layer.scheduler()));
        let schedule: Rc<dyn Fn()> = {
            let core = self.clone();
            let debouncer = Rc::downgrade(&debouncer);
            Rc::new(move || {
                if let Some(debouncer) = debouncer.upgrade() {
                    let core = core.clone();
                    debouncer.schedule(move || run_recompute(&core, tool, recompute));
                }
            })
        };

        let on_change = Rc::clone(&schedule);
        cx.register_subscription(self.layer.hovered_base_segment().subscribe(move |_| on_change()));
        let on_change = Rc::clone(&schedule);
        cx.register_subscription(self.anchor.anchor.subscribe(move |_| on_change()));
        let on_change = Rc::clone(&schedule);
        cx.register_subscription(
            self.anchor
                .last_anchor_base_segment
                .subscribe(move |_| on_change()),
        );
        let on_change = Rc::clone(&schedule);
        cx.register_subscription(
            self.layer
                .graph()
                .permanent_changed()
                .subscribe(move |_| on_change()),
        );
        cx.hold(debouncer);

        run_recompute(self, tool, recompute);
    }

    pub fn end_session(&self) {
        self.active.set(false);
        self.previewing.set(false);
    }
}

fn run_recompute(core: &EditCore, tool: &'static str, recompute: fn(&EditCore)) {
    if !core.active.get() {
        return;
    }
    let _span = debug_span!("segedit.tool.recompute", tool, layer = %core.layer.name()).entered();
    recompute(core);
}

/// Render the status body for a request.
pub(crate) fn describe_request(request: &EditRequest, verb: impl Fn(&SegmentRef) -> String) -> String {
    match (&request.anchor, &request.other) {
        (Err(reason), _) => (*reason).to_string(),
        (Ok(anchor), Err(reason)) => format!("anchor {anchor}: {reason}"),
        (Ok(anchor), Ok(other)) => format!("anchor {anchor} → {}", verb(other)),
    }
}

/// Serialize a tool as its bare tag, or `{type, anchor}` with an anchor.
pub(crate) fn anchor_json(tag: &str, anchor: Option<SegmentId>) -> Value {
    match anchor {
        None => Value::String(tag.to_owned()),
        Some(anchor) => {
            let mut map = Map::new();
            map.insert("type".to_owned(), Value::String(tag.to_owned()));
            map.insert("anchor".to_owned(), Value::String(anchor.to_string()));
            Value::Object(map)
        }
    }
}

/// Read an optional `anchor` field: a decimal string or a non-negative integer.
pub(crate) fn parse_anchor(options: &Map<String, Value>) -> Result<Option<SegmentId>, ToolError> {
    match options.get("anchor") {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(raw)) => raw
            .parse::<SegmentId>()
            .map(Some)
            .map_err(|_| ToolError::InvalidSegmentId { value: raw.clone() }),
        Some(Value::Number(number)) => number
            .as_u64()
            .map(|raw| Some(SegmentId(raw)))
            .ok_or_else(|| ToolError::InvalidSegmentId {
                value: number.to_string(),
            }),
        Some(other) => Err(ToolError::InvalidSegmentId {
            value: other.to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn options(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            _ => Map::new(),
        }
    }

    #[test]
    fn anchor_json_round_trips_through_parse() {
        assert_eq!(anchor_json("mergeSegments", None), json!("mergeSegments"));
        let value = anchor_json("splitSegments", Some(SegmentId(42)));
        assert_eq!(value, json!({"type": "splitSegments", "anchor": "42"}));
        assert_eq!(parse_anchor(&options(value)), Ok(Some(SegmentId(42))));
    }

    #[test]
    fn parse_anchor_rejects_garbage() {
        assert_eq!(parse_anchor(&options(json!({}))), Ok(None));
        assert_eq!(parse_anchor(&options(json!({"anchor": 7}))), Ok(Some(SegmentId(7))));
        assert_eq!(
            parse_anchor(&options(json!({"anchor": "x"}))),
            Err(ToolError::InvalidSegmentId { value: "x".into() })
        );
        assert!(parse_anchor(&options(json!({"anchor": -1}))).is_err());
        assert!(parse_anchor(&options(json!({"anchor": [1]}))).is_err());
    }

    #[test]
    fn request_error_prefers_anchor() {
        let anchor_ref = SegmentRef {
            base: SegmentId(10),
            root: SegmentId(100),
        };
        let request = EditRequest {
            anchor: Err("no anchor"),
            other: Err("no other"),
        };
        assert_eq!(request.error(), Some("no anchor"));
        let request = EditRequest {
            anchor: Ok(anchor_ref),
            other: Err("no other"),
        };
        assert_eq!(request.error(), Some("no other"));
        assert_eq!(
            describe_request(&request, |o| o.to_string()),
            "anchor 10 (root 100): no other"
        );
    }
}
